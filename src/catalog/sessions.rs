use rusqlite::{params, OptionalExtension};

use super::{Catalog, CatalogError};

impl Catalog {
    /// Upsert a session row.
    pub fn put_session(&self, session_id: &str, login: &str, expires_ms: i64) -> Result<(), CatalogError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions (session_id, login, expires) VALUES (?1, ?2, ?3)",
            params![session_id, login, expires_ms],
        )?;
        Ok(())
    }

    /// Atomically drop every session for the login and insert the new one.
    /// The delete and insert run in a single transaction, so no interleaving
    /// can observe two live sessions for one login.
    pub fn replace_sessions(&mut self, login: &str, session_id: &str, expires_ms: i64) -> Result<(), CatalogError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE login = ?1", params![login])?;
        tx.execute(
            "INSERT INTO sessions (session_id, login, expires) VALUES (?1, ?2, ?3)",
            params![session_id, login, expires_ms],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Resolve a token to its owning login, only while unexpired. The expiry
    /// predicate lives inside the statement; expired and unknown tokens both
    /// come back as None.
    pub fn get_session_login(&self, session_id: &str, now_ms: i64) -> Result<Option<String>, CatalogError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT login FROM sessions WHERE session_id = ?1 AND expires > ?2",
        )?;
        Ok(stmt
            .query_row(params![session_id, now_ms], |row| row.get(0))
            .optional()?)
    }

    /// Raw row lookup without the expiry predicate. An expired row may still
    /// be physically present until swept.
    pub fn get_session(&self, session_id: &str) -> Result<Option<(String, i64)>, CatalogError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT login, expires FROM sessions WHERE session_id = ?1",
        )?;
        Ok(stmt
            .query_row(params![session_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?)
    }

    /// Delete one session. Returns true if a row existed.
    pub fn delete_session(&self, session_id: &str) -> Result<bool, CatalogError> {
        let n = self.conn.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;
        Ok(n > 0)
    }

    /// Delete every session belonging to the login. Returns removed count.
    pub fn delete_sessions_for_login(&self, login: &str) -> Result<usize, CatalogError> {
        Ok(self.conn.execute("DELETE FROM sessions WHERE login = ?1", params![login])?)
    }

    /// Bulk-remove rows whose expiry has passed. Returns removed count.
    pub fn delete_expired_sessions(&self, now_ms: i64) -> Result<usize, CatalogError> {
        Ok(self.conn.execute("DELETE FROM sessions WHERE expires < ?1", params![now_ms])?)
    }
}
