use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod handlers;
pub(crate) mod extractors;
pub mod notify;
pub mod password;
pub mod repo_types;
pub mod reset;
pub mod session;
pub mod validator;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
