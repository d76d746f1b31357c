use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};

use super::repo_types::UserRecord;
use crate::state::AppState;

/// Resumes the caller's session from a Bearer token.
pub struct CurrentUser(pub UserRecord);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        match state.sessions.resume(token).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                warn!("invalid or expired session token");
                Err((StatusCode::UNAUTHORIZED, "invalid or expired token".into()))
            }
            Err(e) => {
                error!(error = %e, "session resume failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "session lookup failed".into()))
            }
        }
    }
}
