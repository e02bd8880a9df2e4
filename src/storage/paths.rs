use std::fs;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use unicode_normalization::UnicodeNormalization;

use super::{FileStore, StorageError};

/// Strip every character that is not ASCII-alphanumeric, '_' or '-'.
/// Applied to logins before they become directory names. The login is
/// already validated by registration, but this is an independent second
/// containment layer in case the login rules ever loosen.
pub fn sanitize_login(login: &str) -> String {
    login
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Validate a client-supplied filename and reduce it to a bare name:
/// - NFC-normalize the UTF-8 string
/// - reject empty input and anything containing a parent-directory marker
///   (`..` anywhere, which also catches encoded forms like `..%2f..` that
///   survive basename stripping)
/// - discard any directory component, honoring both separators
/// - reject if nothing remains
/// All rejections happen before any filesystem touch.
pub(crate) fn clean_filename(raw: &str) -> Result<String, StorageError> {
    if raw.is_empty() || raw.contains("..") {
        return Err(StorageError::InvalidName);
    }
    let normalized: String = raw.nfc().collect();
    let unixy = normalized.replace('\\', "/");
    let base = unixy.rsplit('/').next().unwrap_or("");
    if base.is_empty() {
        return Err(StorageError::InvalidName);
    }
    Ok(base.to_string())
}

/// A resolved absolute path proven to live inside one user's directory.
/// The only way to obtain one is `FileStore::confine`.
#[derive(Debug, Clone)]
pub struct ConfinedPath {
    dir: PathBuf,
    path: PathBuf,
    name: String,
}

impl ConfinedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn user_dir(&self) -> &Path {
        &self.dir
    }

    /// The sanitized bare filename, also used as the suggested download name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FileStore {
    /// Absolute directory owned by the login. Not created here; operations
    /// that need it create it lazily.
    pub(crate) fn user_dir(&self, login: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(sanitize_login(login));
        Ok(dir.absolutize()?.to_path_buf())
    }

    /// sanitize -> basename -> join -> absolutize -> prefix check, as one
    /// step shared by every file operation.
    pub(crate) fn confine(&self, login: &str, raw_name: &str) -> Result<ConfinedPath, StorageError> {
        let name = clean_filename(raw_name)?;
        let dir = self.user_dir(login)?;
        let abs = dir.join(&name).absolutize()?.to_path_buf();
        // The owning directory must be a strict prefix of the resolved path.
        // Failing this is access-denied, not not-found: the target never
        // even reaches an existence check.
        if abs == dir || !abs.starts_with(&dir) {
            return Err(StorageError::Denied);
        }
        // Symlinked targets are denied rather than followed.
        if fs::symlink_metadata(&abs).map(|m| m.file_type().is_symlink()).unwrap_or(false) {
            return Err(StorageError::Denied);
        }
        Ok(ConfinedPath { dir, path: abs, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_login_keeps_safe_chars() {
        assert_eq!(sanitize_login("alice"), "alice");
        assert_eq!(sanitize_login("a_b-9"), "a_b-9");
        assert_eq!(sanitize_login("../evil"), "evil");
        assert_eq!(sanitize_login("user name!"), "username");
        assert_eq!(sanitize_login("приветvasya"), "vasya");
    }

    #[test]
    fn clean_filename_rejects_traversal() {
        assert!(clean_filename("").is_err());
        assert!(clean_filename("..").is_err());
        assert!(clean_filename("../../etc/passwd").is_err());
        assert!(clean_filename("..%2f..%2fsecret").is_err());
        assert!(clean_filename("trailing/").is_err());
        assert!(clean_filename("\\\\share\\..\\x").is_err());
    }

    #[test]
    fn clean_filename_discards_directory_components() {
        assert_eq!(clean_filename("a.txt").unwrap(), "a.txt");
        assert_eq!(clean_filename("dir/inner.txt").unwrap(), "inner.txt");
        assert_eq!(clean_filename("dir\\inner.txt").unwrap(), "inner.txt");
    }

    #[test]
    fn confine_accepts_plain_names_and_rejects_escapes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("files")).unwrap();
        let ok = store.confine("alice", "report.pdf").unwrap();
        assert_eq!(ok.name(), "report.pdf");
        assert!(ok.as_path().starts_with(ok.user_dir()));
        assert!(matches!(store.confine("alice", "../../x"), Err(StorageError::InvalidName)));
        assert!(matches!(store.confine("alice", ""), Err(StorageError::InvalidName)));
    }
}
