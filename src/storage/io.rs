use std::fs;
use std::io::ErrorKind;

use chrono::{DateTime, Local};
use tracing::debug;

use super::{FileInfo, FileStore, StorageError};

const MODIFIED_FORMAT: &str = "%d-%m-%Y %H-%M-%S";

impl FileStore {
    /// List regular files directly inside the login's directory, creating it
    /// lazily (an absent directory is an empty listing). Hidden entries and
    /// anything that is not a plain file are skipped; no recursion.
    pub fn list(&self, login: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.user_dir(login)?;
        fs::create_dir_all(&dir)?;
        let mut out: Vec<String> = Vec::new();
        for ent in fs::read_dir(&dir)? {
            let ent = ent?;
            if !ent.file_type()?.is_file() {
                continue;
            }
            let name = ent.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            out.push(name);
        }
        out.sort();
        Ok(out)
    }

    /// Metadata for one file, or None if it does not exist.
    pub fn stat(&self, login: &str, filename: &str) -> Result<Option<FileInfo>, StorageError> {
        let target = self.confine(login, filename)?;
        let meta = match fs::metadata(target.as_path()) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = DateTime::<Local>::from(meta.modified()?)
            .format(MODIFIED_FORMAT)
            .to_string();
        Ok(Some(FileInfo { name: target.name().to_string(), size: meta.len(), modified }))
    }

    /// Store bytes under the login's directory, creating it if missing and
    /// overwriting any existing file of the same name. A failed write may
    /// leave a truncated file behind; there is no atomic rename step.
    pub fn write(&self, login: &str, filename: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.confine(login, filename)?;
        fs::create_dir_all(target.user_dir())?;
        fs::write(target.as_path(), bytes)?;
        debug!(target: "stowage::storage", "write login='{}' file='{}' bytes={}", login, target.name(), bytes.len());
        Ok(())
    }

    /// Remove the file if present.
    pub fn delete(&self, login: &str, filename: &str) -> Result<(), StorageError> {
        let target = self.confine(login, filename)?;
        match fs::remove_file(target.as_path()) {
            Ok(()) => {
                debug!(target: "stowage::storage", "delete login='{}' file='{}'", login, target.name());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Open a file for download. Returns the read handle together with the
    /// sanitized bare name to suggest to the client.
    pub fn open(&self, login: &str, filename: &str) -> Result<(fs::File, String), StorageError> {
        let target = self.confine(login, filename)?;
        match fs::File::open(target.as_path()) {
            Ok(f) => Ok((f, target.name().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
