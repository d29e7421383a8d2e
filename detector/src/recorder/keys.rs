use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSION: &str = ".jpg";

/// How capture files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// `<prefix><counter>.jpg`
    Numeric,
    /// `<prefix>YYYYMMDD-HHMMSS.jpg`, one-second resolution.
    Timestamp,
}

impl NamingMode {
    pub fn from_numbering(numbering: bool) -> Self {
        if numbering {
            Self::Numeric
        } else {
            Self::Timestamp
        }
    }
}

/// What identifies a capture: a sequence number or a wall-clock time.
#[derive(Debug, Clone, Copy)]
pub enum CaptureId {
    Sequence(u64),
    Timestamp(DateTime<Local>),
}

/// A capture's file on disk. The file itself is the only record kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    pub path: PathBuf,
    pub sequence_number: Option<u64>,
    pub timestamp: Option<DateTime<Local>>,
}

impl CaptureRecord {
    /// Bare file name, used as the remote name on upload.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Computes output paths inside the image directory.
///
/// Two timestamp-mode names computed within the same second are identical
/// and the second capture overwrites the first.
#[derive(Debug, Clone)]
pub struct CaptureNamer {
    dir: PathBuf,
    prefix: String,
    mode: NamingMode,
}

impl CaptureNamer {
    pub fn new(dir: &Path, prefix: &str, mode: NamingMode) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            mode,
        }
    }

    pub fn mode(&self) -> NamingMode {
        self.mode
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name_for(&self, id: CaptureId) -> CaptureRecord {
        match id {
            CaptureId::Sequence(n) => CaptureRecord {
                path: self
                    .dir
                    .join(format!("{}{n}{IMAGE_EXTENSION}", self.prefix)),
                sequence_number: Some(n),
                timestamp: None,
            },
            CaptureId::Timestamp(ts) => CaptureRecord {
                path: self.dir.join(format!(
                    "{}{}{IMAGE_EXTENSION}",
                    self.prefix,
                    ts.format("%Y%m%d-%H%M%S")
                )),
                sequence_number: None,
                timestamp: Some(ts),
            },
        }
    }
}
