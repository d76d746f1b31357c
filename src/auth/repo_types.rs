use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Placeholder written to `mail_log` when a reset request is issued.
pub const UNSENT_MAIL_LOG: &str = "reset link not emailed";

/// User account as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub udid: String,               // opaque primary key
    pub email_addr: String,         // login lookup key
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 PHC string, never exposed in JSON
    pub created_at: OffsetDateTime, // creation timestamp
}

impl UserRecord {
    /// Build a fresh record with a generated udid.
    pub fn new(email_addr: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            udid: Uuid::new_v4().to_string(),
            email_addr: email_addr.into(),
            password_hash: password_hash.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Outstanding password reset grant, at most one per user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResetRequest {
    pub user_record: String,     // owning user's udid, primary key
    pub request: String,         // single-use token
    pub mail_log: String,        // what was communicated, diagnostic only
    pub sent_at: OffsetDateTime, // issuance time
}
