use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Failures of the auth core. Negative results such as a wrong password or a
/// stale reset token are outcomes, not errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Only raised by `generate`, which promises a record.
    #[error("user record not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
