//!
//! stowage storage module
//! ----------------------
//! Sandboxed per-user file store. Every login owns one flat directory under
//! the configured root; every operation resolves its target through a single
//! confine step that sanitizes the name, strips directory components, and
//! requires the resolved absolute path to stay inside the owning directory.
//! No call site builds a target path by hand.
//!
//! The store is a cloneable handle around the root folder. File operations
//! are not serialized against each other: concurrent writes or deletes on
//! the same name are last-writer-wins, and there is no file-locking layer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

mod io;
mod paths;

pub use paths::{sanitize_login, ConfinedPath};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("empty or traversal filename")]
    InvalidName,
    #[error("path escapes the user directory")]
    Denied,
    #[error("no such file")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Metadata for one stored file as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    /// Local-time stamp formatted day-month-year hour-minute-second.
    pub modified: String,
}

/// Per-user sandboxed file store rooted at one folder.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new FileStore rooted at the given filesystem path.
    /// The directory is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).ok();
        Ok(Self { root })
    }

    /// Return the configured root folder for this store.
    pub fn root_path(&self) -> &PathBuf {
        &self.root
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
