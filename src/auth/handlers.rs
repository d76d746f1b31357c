use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, ResetConfirmRequest, ResetConfirmResponse,
            ResetIssueRequest, ResetStatus,
        },
        extractors::CurrentUser,
        reset::RedeemOutcome,
        validator::sanitize_for_client,
    },
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/password-reset", post(request_reset))
        .route("/auth/password-reset/confirm", post(confirm_reset))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    match state.sessions.login(&payload.email, &payload.password).await {
        Ok(Some(session)) => {
            info!(user_id = %session.user.id, "user logged in");
            Ok(Json(AuthResponse {
                access_token: session.access_token,
                user: session.user,
            }))
        }
        Ok(None) => {
            warn!("login rejected");
            Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()))
        }
        Err(e) => {
            error!(error = %e, "login failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Always 202 for a well-formed email so callers cannot enumerate accounts.
#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetIssueRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        warn!("invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match state.store.find_user_by_email(email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            debug!("password reset for unknown email");
            return Ok(StatusCode::ACCEPTED);
        }
        Err(e) => {
            error!(error = %e, "find_user_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let issued = match state.resets.issue(&user.udid).await {
        Ok(i) => i,
        Err(e) => {
            error!(error = %e, user_id = %user.udid, "issue reset failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    if issued.superseded {
        debug!(user_id = %user.udid, "earlier reset request replaced");
    }

    // A failed delivery leaves the token valid; the user can ask again.
    match state.notifier.deliver(&user, &issued.token).await {
        Ok(note) => {
            if let Err(e) = state
                .resets
                .record_delivery(&user.udid, &issued.token, &note)
                .await
            {
                warn!(error = %e, user_id = %user.udid, "could not record reset delivery");
            }
        }
        Err(e) => error!(error = %e, user_id = %user.udid, "reset delivery failed"),
    }

    Ok(StatusCode::ACCEPTED)
}

#[instrument(skip(state, payload))]
pub async fn confirm_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetConfirmRequest>,
) -> Result<Json<ResetConfirmResponse>, (StatusCode, String)> {
    let outcome = state
        .resets
        .redeem(
            payload.user_id.trim(),
            payload.token.trim(),
            payload.new_password.as_deref(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "redeem reset failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let status = match outcome {
        RedeemOutcome::Confirmed => ResetStatus::Confirmed,
        RedeemOutcome::Redeemed => ResetStatus::Redeemed,
        RedeemOutcome::NotFound | RedeemOutcome::TokenMismatch | RedeemOutcome::Expired => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Invalid or expired reset request".into(),
            ));
        }
    };
    Ok(Json(ResetConfirmResponse { status }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(sanitize_for_client(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validator::tests::seeded_user;
    use crate::store::{AuthStore, InMemoryStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(store: &InMemoryStore) -> Router {
        crate::app::build_app(AppState::fake(store.clone()))
    }

    fn seeded() -> InMemoryStore {
        InMemoryStore::with_users([seeded_user("u1", "a@example.com", "secret")])
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("a@example.com"));
        assert!(!is_valid_email("a@example"));
        assert!(!is_valid_email("not an email"));
    }

    #[tokio::test]
    async fn login_and_me() {
        let store = seeded();
        let res = app(&store)
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"email": " a@example.com ", "password": "secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["user"]["id"], "u1");
        assert!(body["user"].get("password_hash").is_none());
        let token = body["access_token"].as_str().unwrap().to_string();

        let res = app(&store)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["email"], "a@example.com");
    }

    #[tokio::test]
    async fn login_with_bad_password_is_unauthorized() {
        let res = app(&seeded())
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"email": "a@example.com", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reset_request_does_not_reveal_accounts() {
        let store = seeded();
        for email in ["a@example.com", "nobody@example.com"] {
            let res = app(&store)
                .oneshot(post_json("/api/v1/auth/password-reset", json!({ "email": email })))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::ACCEPTED);
        }
        let row = store.find_reset_request("u1").await.unwrap().unwrap();
        assert_eq!(row.mail_log, "reset link logged, no email sent");

        let res = app(&store)
            .oneshot(post_json("/api/v1/auth/password-reset", json!({"email": "bogus"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn confirm_check_then_redeem() {
        let store = seeded();
        let state = AppState::fake(store.clone());
        let issued = state.resets.issue("u1").await.unwrap();

        let res = app(&store)
            .oneshot(post_json(
                "/api/v1/auth/password-reset/confirm",
                json!({"user_id": "u1", "token": &issued.token}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "confirmed");

        let res = app(&store)
            .oneshot(post_json(
                "/api/v1/auth/password-reset/confirm",
                json!({"user_id": "u1", "token": "garbage", "new_password": "newpass"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app(&store)
            .oneshot(post_json(
                "/api/v1/auth/password-reset/confirm",
                json!({"user_id": "u1", "token": &issued.token, "new_password": "newpass"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "redeemed");

        let res = app(&store)
            .oneshot(post_json(
                "/api/v1/auth/login",
                json!({"email": "a@example.com", "password": "newpass"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
