use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use picam_motion_common::config::FtpConfig;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::debug;

use super::{DeliveryError, Uploader, CONNECT_TIMEOUT, IO_TIMEOUT};

/// Uploads captures to an FTP server, one connection per file.
///
/// The control connection is bounded by [`CONNECT_TIMEOUT`] to connect and
/// [`IO_TIMEOUT`] per read or write, so a stalled server fails the upload
/// instead of holding a blocking-pool thread.
pub struct FtpUploader {
    config: FtpConfig,
    io_timeout: Duration,
}

impl FtpUploader {
    pub fn new(config: FtpConfig) -> Self {
        Self {
            config,
            io_timeout: IO_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }
}

impl Uploader for FtpUploader {
    async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), DeliveryError> {
        let config = self.config.clone();
        let io_timeout = self.io_timeout;
        let local: PathBuf = local_path.to_path_buf();
        let remote = remote_name.to_string();

        let bytes =
            tokio::task::spawn_blocking(move || store_file(&config, io_timeout, &local, &remote))
            .await
            .map_err(|e| DeliveryError::Join(e.to_string()))??;

        debug!(
            host = self.config.host,
            remote_dir = self.config.remote_dir,
            remote_name,
            bytes,
            "FTP upload complete"
        );
        Ok(())
    }
}

fn store_file(
    config: &FtpConfig,
    io_timeout: Duration,
    local: &Path,
    remote: &str,
) -> Result<u64, DeliveryError> {
    let mut file = std::fs::File::open(local)
        .map_err(|e| DeliveryError::ReadFile(local.display().to_string(), e))?;

    let ftp_err = |e: suppaftp::FtpError| DeliveryError::Ftp(e.to_string());

    // Timeouts go on the socket before the greeting is read.
    let control = connect_control(config, io_timeout)?;
    let mut ftp = FtpStream::connect_with_stream(control).map_err(ftp_err)?;
    ftp.login(config.username.as_str(), config.password.as_str())
        .map_err(ftp_err)?;
    ftp.cwd(config.remote_dir.as_str()).map_err(ftp_err)?;
    ftp.transfer_type(FileType::Binary).map_err(ftp_err)?;
    let bytes = ftp.put_file(remote, &mut file).map_err(ftp_err)?;
    // The file is stored; a failed QUIT is not worth reporting.
    let _ = ftp.quit();
    Ok(bytes)
}

/// Open the control connection, trying each resolved address in turn.
fn connect_control(config: &FtpConfig, io_timeout: Duration) -> Result<TcpStream, DeliveryError> {
    let io_err = |e: std::io::Error| DeliveryError::Ftp(e.to_string());

    let mut last_err = None;
    for addr in (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(io_err)?
    {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_read_timeout(Some(io_timeout)).map_err(io_err)?;
                stream.set_write_timeout(Some(io_timeout)).map_err(io_err)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => io_err(e),
        None => DeliveryError::Ftp(format!("{} resolved to no addresses", config.host)),
    })
}
