use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use picam_motion_common::config::CameraConfig;
use picam_motion_common::frame::{Frame, FrameError};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::storage::temp_path_for;

/// Source of low-resolution scan frames.
pub trait FrameSource: Send {
    fn capture_frame(&mut self) -> impl Future<Output = Result<Frame, CameraError>> + Send;
}

/// Writer of full-resolution stills.
pub trait ImageCapture: Send {
    fn capture_image(&mut self, path: &Path)
        -> impl Future<Output = Result<(), CameraError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("failed to spawn {command}: {reason}")]
    Spawn { command: String, reason: String },
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("failed to finalize image {path}: {reason}")]
    Finalize { path: String, reason: String },
}

/// Raspberry Pi camera driven through the `rpicam-still` CLI.
///
/// Every shot runs its own process, which opens the sensor, lets exposure and
/// white balance converge, captures, and releases the sensor on exit. The
/// child is killed if the capture future is dropped, so an interrupted
/// pipeline never leaves the sensor held.
pub struct RpiCamera {
    config: CameraConfig,
}

impl RpiCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Command line for one shot written to `output` (`-` for stdout).
    ///
    /// `--exposure normal` is rpicam's automatic exposure mode and
    /// `--awb auto` its automatic white balance; `-t` is how long both get
    /// to converge before the shot.
    fn args(&self, width: u32, height: u32, settle_ms: u64, output: &str) -> Vec<String> {
        let mut args = vec![
            "--width".to_string(),
            width.to_string(),
            "--height".to_string(),
            height.to_string(),
            "--encoding".to_string(),
            "jpg".to_string(),
            "--exposure".to_string(),
            "normal".to_string(),
            "--awb".to_string(),
            "auto".to_string(),
            "-t".to_string(),
            settle_ms.max(1).to_string(),
            "-o".to_string(),
            output.to_string(),
        ];
        if self.config.vflip {
            args.push("--vflip".to_string());
        }
        if self.config.hflip {
            args.push("--hflip".to_string());
        }
        if !self.config.preview {
            args.push("--nopreview".to_string());
        }
        args
    }

    /// Run the still-capture CLI once and return its stdout.
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, CameraError> {
        let command = self.config.command.clone();
        debug!(command, ?args, "running camera command");

        let output = Command::new(&command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CameraError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CameraError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl FrameSource for RpiCamera {
    async fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let (width, height) = (self.config.stream_width, self.config.stream_height);
        let jpeg = self.run(self.args(width, height, 1, "-")).await?;
        let frame = Frame::decode(&jpeg, width, height)?;
        debug!(width, height, bytes = jpeg.len(), "captured stream frame");
        Ok(frame)
    }
}

impl ImageCapture for RpiCamera {
    async fn capture_image(&mut self, path: &Path) -> Result<(), CameraError> {
        let temp: PathBuf = temp_path_for(path);
        let args = self.args(
            self.config.image_width,
            self.config.image_height,
            self.config.settle_ms,
            &temp.to_string_lossy(),
        );

        if let Err(e) = self.run(args).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp, path).await {
            if let Err(rm) = tokio::fs::remove_file(&temp).await {
                warn!(path = temp.display().to_string(), error = %rm, "failed to remove partial image");
            }
            return Err(CameraError::Finalize {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }

        info!(
            width = self.config.image_width,
            height = self.config.image_height,
            path = path.display().to_string(),
            "saved full-resolution image"
        );
        Ok(())
    }
}
