//! Single-use password reset tokens, at most one outstanding per user.
//!
//! Per-user state is derived from the stored [`ResetRequest`] row and
//! evaluated as a [`ResetState`], so the redeem guards can be checked without
//! touching the store.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use constant_time_eq::constant_time_eq;
use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        password::hash_password,
        repo_types::{ResetRequest, UNSENT_MAIL_LOG},
    },
    error::AuthResult,
    store::AuthStore,
};

/// 256 random bits, base64url without padding (43 chars).
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetState {
    NoPendingRequest,
    PendingRequest {
        token: String,
        issued_at: OffsetDateTime,
    },
}

/// What a redeem attempt may do given the current [`ResetState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<'a> {
    NothingPending,
    WrongToken,
    Stale,
    Verify,
    Consume { new_password: &'a str },
}

impl From<Option<ResetRequest>> for ResetState {
    fn from(row: Option<ResetRequest>) -> Self {
        match row {
            Some(row) => ResetState::PendingRequest {
                token: row.request,
                issued_at: row.sent_at,
            },
            None => ResetState::NoPendingRequest,
        }
    }
}

impl ResetState {
    /// Decide the transition for a redeem attempt.
    ///
    /// `new_password` is trimmed; blank counts as absent and only verifies
    /// the token. The token comparison runs in constant time.
    pub fn guard<'a>(
        &self,
        provided: &str,
        new_password: Option<&'a str>,
        now: OffsetDateTime,
        max_age: Option<Duration>,
    ) -> Transition<'a> {
        let ResetState::PendingRequest { token, issued_at } = self else {
            return Transition::NothingPending;
        };
        if token.len() != provided.len() || !constant_time_eq(token.as_bytes(), provided.as_bytes())
        {
            return Transition::WrongToken;
        }
        if max_age.is_some_and(|age| now - *issued_at > age) {
            return Transition::Stale;
        }
        match new_password.map(str::trim).filter(|p| !p.is_empty()) {
            Some(new_password) => Transition::Consume { new_password },
            None => Transition::Verify,
        }
    }
}

/// Token handed back by [`ResetTokenManager::issue`].
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub token: String,
    pub sent_at: OffsetDateTime,
    /// Whether an earlier outstanding request was overwritten.
    pub superseded: bool,
}

/// Outcome of [`ResetTokenManager::redeem`]. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// No request pending for the user, or the user record is gone.
    NotFound,
    TokenMismatch,
    /// Token matched but is older than the configured max age.
    Expired,
    /// Token matched; nothing was changed or consumed.
    Confirmed,
    /// Password replaced and token consumed.
    Redeemed,
}

#[derive(Clone)]
pub struct ResetTokenManager {
    store: Arc<dyn AuthStore>,
    max_age: Option<Duration>,
}

impl ResetTokenManager {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self {
            store,
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Issue a fresh token for `user_id`, replacing any outstanding one.
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: &str) -> AuthResult<IssuedReset> {
        let previous = self.store.find_reset_request(user_id).await.map_err(|e| {
            warn!(error = %e, "unable to read password reset request");
            e
        })?;
        if let Some(prev) = &previous {
            info!(previous_sent_at = %prev.sent_at, "invalidating previous reset request");
        }

        let request = ResetRequest {
            user_record: user_id.to_string(),
            request: generate_reset_token(),
            mail_log: UNSENT_MAIL_LOG.to_string(),
            sent_at: OffsetDateTime::now_utc(),
        };
        self.store.save_reset_request(&request).await.map_err(|e| {
            warn!(error = %e, "unable to save password reset request");
            e
        })?;

        info!("password reset request issued");
        Ok(IssuedReset {
            token: request.request,
            sent_at: request.sent_at,
            superseded: previous.is_some(),
        })
    }

    /// Record what the delivery step did with the token. Returns `false`
    /// when the request was redeemed or superseded in the meantime.
    #[instrument(skip(self, token, mail_log))]
    pub async fn record_delivery(
        &self,
        user_id: &str,
        token: &str,
        mail_log: &str,
    ) -> AuthResult<bool> {
        let updated = self
            .store
            .record_reset_delivery(user_id, token, mail_log)
            .await?;
        if !updated {
            debug!("reset request changed before delivery was recorded");
        }
        Ok(updated)
    }

    /// Check `provided` against the outstanding token and, when
    /// `new_password` is non-blank, replace the password and consume it.
    #[instrument(skip(self, provided, new_password))]
    pub async fn redeem(
        &self,
        user_id: &str,
        provided: &str,
        new_password: Option<&str>,
    ) -> AuthResult<RedeemOutcome> {
        let row = self.store.find_reset_request(user_id).await.map_err(|e| {
            warn!(error = %e, "unable to read password reset request");
            e
        })?;

        let state = ResetState::from(row);
        let new_password =
            match state.guard(provided, new_password, OffsetDateTime::now_utc(), self.max_age) {
                Transition::Consume { new_password } => new_password,
                Transition::NothingPending => {
                    info!("no previous password reset found");
                    return Ok(RedeemOutcome::NotFound);
                }
                Transition::WrongToken => {
                    info!("bad password reset token presented");
                    return Ok(RedeemOutcome::TokenMismatch);
                }
                Transition::Stale => {
                    info!("expired password reset token presented");
                    return Ok(RedeemOutcome::Expired);
                }
                Transition::Verify => return Ok(RedeemOutcome::Confirmed),
            };

        let Some(mut user) = self.store.find_user(user_id).await? else {
            warn!("reset request points at a missing user");
            return Ok(RedeemOutcome::NotFound);
        };
        user.password_hash = hash_password(new_password)?;

        if !self.store.complete_password_reset(&user, provided).await? {
            info!("reset request superseded before it could be consumed");
            return Ok(RedeemOutcome::TokenMismatch);
        }

        info!("password reset redeemed");
        Ok(RedeemOutcome::Redeemed)
    }
}
