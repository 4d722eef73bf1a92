//! Whole-file atomic replacement.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("writing temporary file for {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("replacing {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

/// Directory holding `path`; a bare file name lives in the working directory.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replace `path` with `bytes`.
///
/// The bytes go to a temporary file in the same directory, are flushed to
/// disk, then renamed over the target. On any failure the previous contents
/// of `path` are left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AtomicWriteError> {
    let write_err = |source| AtomicWriteError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(parent_dir(path)).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    tmp.persist(path).map_err(|e| AtomicWriteError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("table.csv");

        let err = write_atomic(&path, b"rows").unwrap_err();

        assert!(matches!(err, AtomicWriteError::Write { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn bare_file_name_resolves_to_working_directory() {
        assert_eq!(parent_dir(Path::new("table.csv")), Path::new("."));
        assert_eq!(parent_dir(Path::new("data/table.csv")), Path::new("data"));
    }
}
