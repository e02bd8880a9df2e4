use crate::catalog::SharedCatalog;
use crate::error::{AppError, AppResult};
use crate::tprintln;

use super::session::{Session, SessionManager};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

pub trait AuthProvider: Send + Sync {
    fn register(&self, req: &LoginRequest) -> AppResult<Session>;
    fn login(&self, req: &LoginRequest) -> AppResult<Session>;
}

#[derive(Clone)]
pub struct LocalAuthProvider {
    catalog: SharedCatalog,
    pub sm: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(catalog: SharedCatalog, sm: SessionManager) -> Self {
        Self { catalog, sm }
    }
}

impl AuthProvider for LocalAuthProvider {
    /// Create the user row (uniqueness enforced at insert time), then issue
    /// the initial session.
    fn register(&self, req: &LoginRequest) -> AppResult<Session> {
        self.catalog.0.lock().insert_user(&req.login, &req.password)?;
        let session = self.sm.create_session(&req.login)?;
        tprintln!("auth.register login={}", req.login);
        Ok(session)
    }

    /// Verify credentials with plain equality, then rotate the session.
    /// Unknown login and wrong password produce the same rejection.
    fn login(&self, req: &LoginRequest) -> AppResult<Session> {
        let ok = self.catalog.0.lock().verify_user(&req.login, &req.password)?;
        if !ok {
            return Err(AppError::auth("invalid_credentials", "unknown login or wrong password"));
        }
        let session = self.sm.create_session(&req.login)?;
        tprintln!("auth.login login={}", req.login);
        Ok(session)
    }
}
