use std::time::Duration;

use base64::Engine;
use chrono::Utc;

use crate::catalog::{CatalogError, SharedCatalog};
use crate::tprintln;

pub type SessionToken = String;

/// A live session as handed back to the gateway after register/login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub login: String,
    pub expires_ms: i64,
}

/// Outcome of `invalidate`: logout is idempotent and the absent case is a
/// soft status, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutStatus {
    Removed,
    NotFound,
}

fn gen_token() -> String {
    // 128-bit random token base64url without padding
    let mut buf = [0u8; 16];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Session lifecycle over the durable catalog: one active session per login,
/// fixed validity from creation, lazy eviction of expired rows.
#[derive(Clone)]
pub struct SessionManager {
    catalog: SharedCatalog,
    pub ttl: Duration,
}

impl SessionManager {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self { catalog, ttl: Duration::from_secs(30 * 60) }
    }

    pub fn with_ttl(catalog: SharedCatalog, ttl: Duration) -> Self {
        Self { catalog, ttl }
    }

    /// Issue a fresh token for the login and atomically evict any prior
    /// session rows for it. A second login silently invalidates the first.
    pub fn create_session(&self, login: &str) -> Result<Session, CatalogError> {
        let token = gen_token();
        let expires_ms = now_ms() + self.ttl.as_millis() as i64;
        self.catalog.0.lock().replace_sessions(login, &token, expires_ms)?;
        tprintln!("session.create login={} ttl_secs={}", login, self.ttl.as_secs());
        Ok(Session { token, login: login.to_string(), expires_ms })
    }

    /// Resolve a token to its owning login while `expires > now`. Validity is
    /// re-evaluated on every call and never extended by use; expired and
    /// unknown tokens are indistinguishable.
    pub fn validate(&self, token: &str) -> Result<Option<String>, CatalogError> {
        self.catalog.0.lock().get_session_login(token, now_ms())
    }

    /// Delete the session if present.
    pub fn invalidate(&self, token: &str) -> Result<LogoutStatus, CatalogError> {
        let removed = self.catalog.0.lock().delete_session(token)?;
        Ok(if removed { LogoutStatus::Removed } else { LogoutStatus::NotFound })
    }

    /// Bulk-remove expired rows. Invoked by the gateway on every inbound
    /// request, which bounds staleness of the session table to one request.
    pub fn sweep_expired(&self) -> Result<usize, CatalogError> {
        self.catalog.0.lock().delete_expired_sessions(now_ms())
    }
}
