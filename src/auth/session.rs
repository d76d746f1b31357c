//! Session layer composed over a [`CredentialValidation`] capability.
//!
//! Login validates credentials and mints a signed session token whose
//! subject is the user's udid. Resuming verifies the token and rehydrates
//! the user through the validator's `generate`.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, instrument};

use crate::{
    auth::{
        claims::Claims,
        dto::PublicUser,
        repo_types::UserRecord,
        validator::{sanitize_for_client, CredentialOutcome, CredentialValidation},
    },
    config::JwtConfig,
    error::{AuthError, AuthResult},
};

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl SessionKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs((config.ttl_minutes.max(1) as u64) * 60),
        }
    }

    pub fn sign(&self, user_id: &str) -> jsonwebtoken::errors::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Established session handed back to a caller after login.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user: PublicUser,
}

#[derive(Clone)]
pub struct SessionCore {
    validator: Arc<dyn CredentialValidation>,
    keys: SessionKeys,
}

impl SessionCore {
    pub fn new(validator: Arc<dyn CredentialValidation>, keys: SessionKeys) -> Self {
        Self { validator, keys }
    }

    /// `Ok(None)` when the credentials do not match.
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Option<Session>> {
        let CredentialOutcome::Matched { user_id, user } =
            self.validator.validate_credentials(username, password).await?
        else {
            return Ok(None);
        };
        let access_token = self.keys.sign(&user_id)?;
        info!(user_id = %user_id, "session started");
        Ok(Some(Session {
            access_token,
            user: sanitize_for_client(&user),
        }))
    }

    /// `Ok(None)` for an invalid or expired token, or a user that no longer
    /// exists.
    pub async fn resume(&self, token: &str) -> AuthResult<Option<UserRecord>> {
        let claims = match self.keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "session token rejected");
                return Ok(None);
            }
        };
        match self.validator.generate(&claims.sub).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validator::tests::seeded_user;
    use crate::auth::validator::CredentialValidator;
    use crate::store::InMemoryStore;

    fn jwt(issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: "same-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        }
    }

    fn core() -> SessionCore {
        let store = InMemoryStore::with_users([seeded_user("u1", "a@example.com", "secret")]);
        let validator = Arc::new(CredentialValidator::new(Arc::new(store)));
        SessionCore::new(validator, SessionKeys::from_config(&jwt("iss", "aud")))
    }

    #[tokio::test]
    async fn login_then_resume() {
        let core = core();
        let session = core
            .login("a@example.com", "secret")
            .await
            .unwrap()
            .expect("credentials match");
        assert_eq!(session.user.id, "u1");

        let user = core.resume(&session.access_token).await.unwrap().unwrap();
        assert_eq!(user.udid, "u1");
    }

    #[tokio::test]
    async fn bad_credentials_start_no_session() {
        assert!(core().login("a@example.com", "wrong").await.unwrap().is_none());
        assert!(core().login("", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resume_rejects_foreign_and_garbage_tokens() {
        let core = core();
        assert!(core.resume("not-a-token").await.unwrap().is_none());

        let other = SessionKeys::from_config(&jwt("other-iss", "other-aud"));
        let foreign = other.sign("u1").unwrap();
        assert!(core.resume(&foreign).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resume_for_vanished_user_is_none() {
        let core = core();
        let token = core.keys.sign("ghost").unwrap();
        assert!(core.resume(&token).await.unwrap().is_none());
    }
}
