use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::{AuthStore, StoreError};
use crate::auth::repo_types::{ResetRequest, UserRecord};

/// Postgres-backed store, see `migrations/` for the schema.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn find_user(&self, udid: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT udid, email_addr, password_hash, created_at
            FROM users
            WHERE udid = $1
            "#,
        )
        .bind(udid)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT udid, email_addr, password_hash, created_at
            FROM users
            WHERE email_addr = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_reset_request(&self, user: &str) -> Result<Option<ResetRequest>, StoreError> {
        let row = sqlx::query_as::<_, ResetRequest>(
            r#"
            SELECT user_record, request, mail_log, sent_at
              FROM password_reset_requests
             WHERE user_record = $1
            "#,
        )
        .bind(user)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn save_reset_request(&self, request: &ResetRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_requests (user_record, request, mail_log, sent_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_record) DO UPDATE
               SET request = EXCLUDED.request,
                   mail_log = EXCLUDED.mail_log,
                   sent_at = EXCLUDED.sent_at
            "#,
        )
        .bind(&request.user_record)
        .bind(&request.request)
        .bind(&request.mail_log)
        .bind(request.sent_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn record_reset_delivery(
        &self,
        user: &str,
        token: &str,
        mail_log: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE password_reset_requests
               SET mail_log = $3
             WHERE user_record = $1 AND request = $2
            "#,
        )
        .bind(user)
        .bind(token)
        .bind(mail_log)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, fields(user_id = %user.udid))]
    async fn complete_password_reset(
        &self,
        user: &UserRecord,
        token: &str,
    ) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM password_reset_requests
             WHERE user_record = $1 AND request = $2
            "#,
        )
        .bind(&user.udid)
        .bind(token)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            debug!("reset row changed underneath redeem; rolling back");
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET password_hash = $2 WHERE udid = $1")
            .bind(&user.udid)
            .bind(&user.password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
