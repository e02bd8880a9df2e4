use rusqlite::params;

use super::{Catalog, CatalogError};

impl Catalog {
    /// Insert a new user row. Uniqueness is enforced by the primary key at
    /// insert time, not by a separate existence check, so two concurrent
    /// registrations of the same login cannot both succeed.
    pub fn insert_user(&self, login: &str, password: &str) -> Result<(), CatalogError> {
        match self.conn.execute(
            "INSERT INTO users (login, password) VALUES (?1, ?2)",
            params![login, password],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                Err(CatalogError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True iff a row exists with exactly this login and password.
    /// Passwords are compared as opaque strings; unknown login and wrong
    /// password are indistinguishable to the caller.
    pub fn verify_user(&self, login: &str, password: &str) -> Result<bool, CatalogError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM users WHERE login = ?1 AND password = ?2",
        )?;
        Ok(stmt.exists(params![login, password])?)
    }
}
