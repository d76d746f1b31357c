use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use tracing::{debug, error, instrument};

use crate::{
    auth::{
        dto::PublicUser,
        password::{hash_password, verify_password},
        repo_types::UserRecord,
    },
    error::{AuthError, AuthResult},
    store::AuthStore,
};

lazy_static! {
    /// Verified against when the account does not exist, so unknown and
    /// known emails cost the same argon2 work.
    static ref DUMMY_HASH: Option<String> = hash_password("passgate-unknown-account").ok();
}

fn verify_against_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Result of checking a username/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    Matched { user_id: String, user: UserRecord },
    NoMatch,
}

/// Capability the session layer needs from a credential backend.
#[async_trait]
pub trait CredentialValidation: Send + Sync {
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<CredentialOutcome>;

    /// Rehydrate a user from an identity previously handed out by
    /// `validate_credentials`.
    async fn generate(&self, unique_id: &str) -> AuthResult<UserRecord>;
}

/// Validates credentials against an [`AuthStore`].
#[derive(Clone)]
pub struct CredentialValidator {
    store: Arc<dyn AuthStore>,
}

impl CredentialValidator {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialValidation for CredentialValidator {
    #[instrument(skip_all)]
    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<CredentialOutcome> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Ok(CredentialOutcome::NoMatch);
        }

        let user = match self.store.find_user_by_email(username).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                debug!("no account for login attempt");
                verify_against_dummy(password);
                return Ok(CredentialOutcome::NoMatch);
            }
            Err(e) => {
                error!(error = %e, "error trying to validate credentials");
                return Err(e.into());
            }
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.udid, "password mismatch");
            return Ok(CredentialOutcome::NoMatch);
        }

        Ok(CredentialOutcome::Matched {
            user_id: user.udid.clone(),
            user,
        })
    }

    #[instrument(skip(self))]
    async fn generate(&self, unique_id: &str) -> AuthResult<UserRecord> {
        self.store
            .find_user(unique_id)
            .await?
            .ok_or(AuthError::NotFound)
    }
}

/// Strip everything a client must not see from a user record.
pub fn sanitize_for_client(user: &UserRecord) -> PublicUser {
    PublicUser {
        id: user.udid.clone(),
        email: user.email_addr.clone(),
        created_at: user.created_at,
    }
}
