//! In-memory store for tests and local runs. Contents are lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AuthStore, StoreError};
use crate::auth::repo_types::{ResetRequest, UserRecord};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    resets: HashMap<String, ResetRequest>,
}

/// Both tables live behind one lock so `complete_password_reset` is atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with the given users.
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write();
            for user in users {
                tables.users.insert(user.udid.clone(), user);
            }
        }
        store
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn find_user(&self, udid: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.read().users.get(udid).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .values()
            .find(|u| u.email_addr == email)
            .cloned())
    }

    async fn find_reset_request(&self, user: &str) -> Result<Option<ResetRequest>, StoreError> {
        Ok(self.tables.read().resets.get(user).cloned())
    }

    async fn save_reset_request(&self, request: &ResetRequest) -> Result<(), StoreError> {
        self.tables
            .write()
            .resets
            .insert(request.user_record.clone(), request.clone());
        Ok(())
    }

    async fn record_reset_delivery(
        &self,
        user: &str,
        token: &str,
        mail_log: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables.resets.get_mut(user) {
            Some(row) if row.request == token => {
                row.mail_log = mail_log.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_password_reset(
        &self,
        user: &UserRecord,
        token: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let still_pending = tables
            .resets
            .get(&user.udid)
            .is_some_and(|row| row.request == token);
        if !still_pending {
            return Ok(false);
        }
        tables.resets.remove(&user.udid);
        tables.users.insert(user.udid.clone(), user.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn reset_for(user: &str, token: &str) -> ResetRequest {
        ResetRequest {
            user_record: user.into(),
            request: token.into(),
            mail_log: String::new(),
            sent_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn save_reset_request_overwrites_previous_row() {
        let store = InMemoryStore::new();
        store.save_reset_request(&reset_for("u1", "first")).await.unwrap();
        store.save_reset_request(&reset_for("u1", "second")).await.unwrap();

        let row = store.find_reset_request("u1").await.unwrap().unwrap();
        assert_eq!(row.request, "second");
    }

    #[tokio::test]
    async fn complete_password_reset_refuses_superseded_token() {
        let mut user = UserRecord::new("a@example.com", "old-hash");
        user.udid = "u1".into();
        let store = InMemoryStore::with_users([user.clone()]);
        store.save_reset_request(&reset_for("u1", "fresh")).await.unwrap();

        user.password_hash = "new-hash".into();
        let applied = store
            .complete_password_reset(&user, "stale")
            .await
            .unwrap();

        assert!(!applied);
        let stored = store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "old-hash");
        assert!(store.find_reset_request("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn complete_password_reset_updates_user_and_drops_row() {
        let mut user = UserRecord::new("a@example.com", "old-hash");
        user.udid = "u1".into();
        let store = InMemoryStore::with_users([user.clone()]);
        store.save_reset_request(&reset_for("u1", "tok")).await.unwrap();

        user.password_hash = "new-hash".into();
        assert!(store.complete_password_reset(&user, "tok").await.unwrap());

        let stored = store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(store.find_reset_request("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_reset_delivery_never_recreates_a_row() {
        let store = InMemoryStore::new();
        store.save_reset_request(&reset_for("u1", "tok")).await.unwrap();

        assert!(!store.record_reset_delivery("u1", "other", "note").await.unwrap());
        assert!(store.record_reset_delivery("u1", "tok", "note").await.unwrap());
        assert_eq!(
            store.find_reset_request("u1").await.unwrap().unwrap().mail_log,
            "note"
        );

        store.tables.write().resets.remove("u1");
        assert!(!store.record_reset_delivery("u1", "tok", "late").await.unwrap());
        assert!(store.find_reset_request("u1").await.unwrap().is_none());
    }
}
