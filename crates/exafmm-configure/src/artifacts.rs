//! Filesystem writes for generated artifacts.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigureError, Result};

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| ConfigureError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Create or overwrite `path` with `contents`.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| ConfigureError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.h");
        write_artifact(&path, "first").unwrap();
        write_artifact(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn write_into_missing_dir_names_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing/out.h");
        let err = write_artifact(&path, "x").unwrap_err();
        assert!(matches!(err, ConfigureError::Write { .. }));
        assert!(err.to_string().contains("missing/out.h"));
    }

    #[test]
    fn ensure_dir_over_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("conf");
        std::fs::write(&file, "").unwrap();
        let err = ensure_dir(&file.join("sub")).unwrap_err();
        assert!(matches!(err, ConfigureError::CreateDir { .. }));
    }
}
