//!
//! stowage catalog module
//! ----------------------
//! SQLite-backed catalog holding the two durable tables of the service: the
//! `users` table (login -> password, uniqueness enforced by the primary key)
//! and the `sessions` table (session_id -> login + expiry). Expiry values are
//! epoch milliseconds. Both tables are owned by a single connection guarded
//! by a mutex; every mutation is a single statement or a single transaction,
//! so uniqueness and expiry checks are evaluated against committed state.
//!
//! The public API centers around the `Catalog` type, wrapped in a
//! thread-safe `SharedCatalog` (`Arc<Mutex<Catalog>>`) elsewhere in the
//! codebase.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

mod sessions;
mod users;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("login is already registered")]
    AlreadyExists,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    login TEXT PRIMARY KEY,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    login TEXT NOT NULL,
    expires INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_login ON sessions(login);
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires);
CREATE INDEX IF NOT EXISTS idx_users_login_password ON users(login, password);
"#;

/// Durable auth catalog over one SQLite database file.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open (or create) the catalog database at the given path and ensure
    /// tables and indexes exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        debug!(target: "stowage::catalog", "catalog ready at '{}'", path.as_ref().display());
        Ok(Self { conn })
    }
}

#[derive(Clone)]
pub struct SharedCatalog(pub Arc<Mutex<Catalog>>);

impl SharedCatalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        Ok(Self(Arc::new(Mutex::new(Catalog::open(path)?))))
    }
}
