use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: PublicUser,
}

/// Client-facing view of a user. Has no password field by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Request body to start a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetIssueRequest {
    pub email: String,
}

/// Request body to check or redeem a reset token.
#[derive(Debug, Deserialize)]
pub struct ResetConfirmRequest {
    pub user_id: String,
    pub token: String,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetStatus {
    Confirmed,
    Redeemed,
}

#[derive(Debug, Serialize)]
pub struct ResetConfirmResponse {
    pub status: ResetStatus,
}
