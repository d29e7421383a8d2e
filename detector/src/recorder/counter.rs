use std::path::Path;
use std::time::SystemTime;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CounterRecoveryError {
    #[error("could not list {0}: {1}")]
    ListDir(String, std::io::Error),
    #[error("no files matching {prefix}*{extension}")]
    NoMatches { prefix: String, extension: String },
    #[error("file name {file_name} has non-numeric counter {suffix:?}")]
    NotNumeric { file_name: String, suffix: String },
    #[error("file name {file_name} holds the largest counter, no number left after it")]
    Exhausted { file_name: String },
}

#[derive(Debug, thiserror::Error)]
#[error("image counter exhausted at {0}")]
pub struct CounterExhausted(pub u64);

/// Recover the next image number from the files already in `dir`.
///
/// Picks the most recently created `prefix*extension` file, parses the part
/// between prefix and extension and returns it plus one. Any failure falls
/// back to `start` with a warning. A fallback may restart numbering below
/// existing files, which will then be overwritten.
pub fn recover_next_counter(dir: &Path, prefix: &str, extension: &str, start: u64) -> u64 {
    match try_recover_next_counter(dir, prefix, extension) {
        Ok(next) => {
            info!(dir = dir.display().to_string(), next, "recovered image counter");
            next
        }
        Err(e) => {
            warn!(
                error = %e,
                start,
                "image counter recovery failed, numbering from configured start"
            );
            start
        }
    }
}

pub fn try_recover_next_counter(
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> Result<u64, CounterRecoveryError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CounterRecoveryError::ListDir(dir.display().to_string(), e))?;

    // (recency, parsed counter, file name); the parsed counter breaks ties
    // between files created within the filesystem's timestamp granularity.
    let mut newest: Option<(SystemTime, Option<u64>, String)> = None;

    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(suffix) = counter_suffix(&file_name, prefix, extension) else {
            continue;
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let created = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let parsed = suffix.parse::<u64>().ok();

        let candidate = (created, parsed, file_name);
        if newest
            .as_ref()
            .map_or(true, |best| (candidate.0, candidate.1) > (best.0, best.1))
        {
            newest = Some(candidate);
        }
    }

    let (_, _, file_name) = newest.ok_or_else(|| CounterRecoveryError::NoMatches {
        prefix: prefix.to_string(),
        extension: extension.to_string(),
    })?;

    let suffix = counter_suffix(&file_name, prefix, extension).unwrap_or_default();
    let last = suffix
        .parse::<u64>()
        .map_err(|_| CounterRecoveryError::NotNumeric {
            file_name: file_name.clone(),
            suffix: suffix.to_string(),
        })?;
    last.checked_add(1)
        .ok_or(CounterRecoveryError::Exhausted { file_name })
}

fn counter_suffix<'a>(file_name: &'a str, prefix: &str, extension: &str) -> Option<&'a str> {
    file_name
        .strip_prefix(prefix)?
        .strip_suffix(extension)
}

/// In-memory image counter, owned by the pipeline for the process lifetime.
#[derive(Debug)]
pub struct ImageSequencer {
    next: u64,
}

impl ImageSequencer {
    pub fn new(next: u64) -> Self {
        Self { next }
    }

    /// Number the next capture will use.
    pub fn current(&self) -> u64 {
        self.next
    }

    /// Move to the next number. Fails, leaving the counter unchanged, when
    /// the current number is the last one representable.
    pub fn advance(&mut self) -> Result<(), CounterExhausted> {
        self.next = self.next.checked_add(1).ok_or(CounterExhausted(self.next))?;
        Ok(())
    }
}
