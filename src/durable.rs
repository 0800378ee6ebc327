//! Durable file primitives shared by the index and the manifest
//!
//! Metadata files are replaced atomically:
//! 1. Write to `<name>.tmp`
//! 2. fsync the temp file
//! 3. Rename over the final path (atomic on POSIX)
//! 4. fsync the parent directory so the rename itself is durable

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crash_point::{maybe_crash, points};
use crate::errors::{StoreError, StoreResult};

/// Returns the temp path used while atomically replacing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// fsync a directory so that entries created or renamed in it survive a crash.
pub fn fsync_dir(path: &Path) -> StoreResult<()> {
    let dir = File::open(path).map_err(|e| StoreError::io_at("open directory", path, e))?;
    dir.sync_all()
        .map_err(|e| StoreError::io_at("fsync directory", path, e))
}

/// Replaces `path` with `contents` atomically.
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let temp_path = temp_path_for(path);

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StoreError::io_at("create", &temp_path, e))?;

        file.write_all(contents)
            .map_err(|e| StoreError::io_at("write", &temp_path, e))?;

        file.sync_all()
            .map_err(|e| StoreError::io_at("fsync", &temp_path, e))?;
    }

    maybe_crash(points::META_BEFORE_RENAME);

    std::fs::rename(&temp_path, path).map_err(|e| {
        StoreError::io(
            format!(
                "rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            e,
        )
    })?;

    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }

    maybe_crash(points::META_AFTER_RENAME);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_sits_next_to_target() {
        let p = Path::new("/data/store/index.json");
        assert_eq!(temp_path_for(p), PathBuf::from("/data/store/index.json.tmp"));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        write_file_atomic(&path, b"first").unwrap();
        write_file_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_fsync_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let result = fsync_dir(&dir.path().join("missing"));
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }
}
