//! Persistence seam for user records and reset requests.
//!
//! Lookups that find nothing return `Ok(None)`. An `Err` always means the
//! backing store could not complete the read or write.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::repo_types::{ResetRequest, UserRecord};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Find a user by primary key.
    async fn find_user(&self, udid: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Find a user by exact email address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_reset_request(&self, user: &str) -> Result<Option<ResetRequest>, StoreError>;

    /// Insert or replace the reset request keyed by `user_record`.
    async fn save_reset_request(&self, request: &ResetRequest) -> Result<(), StoreError>;

    /// Set `mail_log` on the row for `user` only while it still holds `token`.
    ///
    /// Never inserts. Returns whether a row was updated.
    async fn record_reset_delivery(
        &self,
        user: &str,
        token: &str,
        mail_log: &str,
    ) -> Result<bool, StoreError>;

    /// Persist `user` and delete its reset request as one all-or-nothing unit.
    ///
    /// The delete only matches a row for `user.udid` still holding `token`.
    /// When that row is gone or carries another token nothing is written and
    /// `Ok(false)` is returned.
    async fn complete_password_reset(
        &self,
        user: &UserRecord,
        token: &str,
    ) -> Result<bool, StoreError>;
}
