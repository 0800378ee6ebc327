//! Store directory layout
//!
//! ```text
//! <store>/
//!   index.json        shard index, rewritten atomically
//!   store.json        manifest, written on the first non-empty append
//!   slice-0.shard     shard 0
//!   slice-1.shard     shard 1
//!   ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::durable::fsync_dir;
use crate::errors::{StoreError, StoreResult};
use crate::shard::ShardFile;

pub const INDEX_FILE_NAME: &str = "index.json";
pub const MANIFEST_FILE_NAME: &str = "store.json";
pub const SHARD_FILE_PREFIX: &str = "slice-";
pub const SHARD_FILE_EXTENSION: &str = "shard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    pub fn shard_path(&self, shard_id: u64) -> PathBuf {
        self.root.join(shard_file_name(shard_id))
    }

    pub fn shard(&self, shard_id: u64) -> ShardFile {
        ShardFile::new(shard_id, self.shard_path(shard_id))
    }

    /// Ids of every shard file present in the directory, ascending.
    pub fn shard_ids_on_disk(&self) -> StoreResult<Vec<u64>> {
        let mut ids = Vec::new();
        for name in self.entry_names()? {
            if let Some(id) = parse_shard_file_name(&name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Prepares an empty store directory, destroying any store already there.
    ///
    /// Returns `true` if an existing store was removed.
    ///
    /// # Errors
    ///
    /// `NotAStore` if the path is a file, or a directory holding anything
    /// other than store files. Nothing is removed in that case.
    pub fn reset(&self) -> StoreResult<bool> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .map_err(|e| StoreError::io_at("create store directory", &self.root, e))?;
            if let Some(parent) = self.root.parent().filter(|p| !p.as_os_str().is_empty()) {
                fsync_dir(parent)?;
            }
            return Ok(false);
        }
        if !self.root.is_dir() {
            return Err(StoreError::NotAStore(self.root.clone()));
        }

        let names = self.entry_names()?;
        if names.iter().any(|name| !is_store_file_name(name)) {
            return Err(StoreError::NotAStore(self.root.clone()));
        }

        for name in &names {
            let path = self.root.join(name);
            fs::remove_file(&path).map_err(|e| StoreError::io_at("remove", &path, e))?;
        }
        fsync_dir(&self.root)?;

        Ok(!names.is_empty())
    }

    fn entry_names(&self) -> StoreResult<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| StoreError::io_at("list store directory", &self.root, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| StoreError::io_at("list store directory", &self.root, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

pub fn shard_file_name(shard_id: u64) -> String {
    format!("{}{}.{}", SHARD_FILE_PREFIX, shard_id, SHARD_FILE_EXTENSION)
}

/// Parses `slice-<id>.shard` back into `<id>`.
pub fn parse_shard_file_name(name: &str) -> Option<u64> {
    let stem = name
        .strip_prefix(SHARD_FILE_PREFIX)?
        .strip_suffix(SHARD_FILE_EXTENSION)?
        .strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn is_store_file_name(name: &str) -> bool {
    let base = name.strip_suffix(".tmp").unwrap_or(name);
    base == INDEX_FILE_NAME || base == MANIFEST_FILE_NAME || parse_shard_file_name(name).is_some()
}
