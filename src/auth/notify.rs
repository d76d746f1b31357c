use async_trait::async_trait;
use tracing::info;

use crate::{auth::repo_types::UserRecord, config::ResetConfig};

/// Delivers a freshly issued reset token to its owner.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Returns a note for the request's mail log.
    async fn deliver(&self, user: &UserRecord, token: &str) -> anyhow::Result<String>;
}

/// Logs the reset link instead of sending mail. Meant for local setups.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    url_prefix: String,
    page: String,
}

impl LogNotifier {
    pub fn new(config: &ResetConfig) -> Self {
        Self {
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            page: config.page.trim_start_matches('/').to_string(),
        }
    }

    pub fn reset_link(&self, user_id: &str, token: &str) -> String {
        format!("{}/{}/{}/{}", self.url_prefix, user_id, token, self.page)
    }
}

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn deliver(&self, user: &UserRecord, token: &str) -> anyhow::Result<String> {
        let link = self.reset_link(&user.udid, token);
        info!(user_id = %user.udid, %link, "email delivery disabled; reset link logged");
        Ok("reset link logged, no email sent".to_string())
    }
}
