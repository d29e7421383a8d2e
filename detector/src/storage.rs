use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Create the image directory if it does not exist yet.
pub fn ensure_image_dir(path: &Path) -> Result<(), StorageError> {
    if path.is_dir() {
        debug!(path = path.display().to_string(), "image directory exists");
        return Ok(());
    }
    info!(path = path.display().to_string(), "creating image storage directory");
    std::fs::create_dir_all(path)
        .map_err(|e| StorageError::CreateDir(path.display().to_string(), e))
}

/// Hidden sibling of `path` that a capture is written to before being
/// renamed into place, e.g. `images/mo-12.jpg` -> `images/.mo-12.jpg.part`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.part"))
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not create image directory {0}: {1}")]
    CreateDir(String, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/images");
        ensure_image_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_image_dir(&nested).unwrap();
    }

    #[test]
    fn file_in_the_way_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("images");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(matches!(
            ensure_image_dir(&blocker),
            Err(StorageError::CreateDir(..))
        ));
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/srv/images/mo-12.jpg"));
        assert_eq!(temp, PathBuf::from("/srv/images/.mo-12.jpg.part"));
    }
}
