//! Background user upsert.
//!
//! Runs after the webhook response has been produced. Every failure ends
//! here: it is logged and reported as an [`UpsertOutcome`], never returned to
//! a caller and never retried.

use crate::models::user::NewUser;
use crate::store::{StoreError, StoreHandle, UserRepository};

/// How a background upsert ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new record was stored.
    Created,
    /// A record for the subject already existed; nothing was changed.
    AlreadyExists,
    /// The store was not connected; the event was dropped.
    StoreUnavailable,
    /// The store returned an error; the event was dropped.
    Failed,
}

/// Insert `user` unless a record for its subject id already exists.
pub async fn upsert_if_absent(store: &StoreHandle, user: NewUser) -> UpsertOutcome {
    tracing::info!(
        clerk_user_id = %user.clerk_user_id,
        first_name = %user.first_name,
        last_name = %user.last_name,
        "Attempting to save user"
    );

    let Some(repository) = store.get() else {
        tracing::error!(clerk_user_id = %user.clerk_user_id, "Database is not connected");
        return UpsertOutcome::StoreUnavailable;
    };

    match try_upsert(repository.as_ref(), &user).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(clerk_user_id = %user.clerk_user_id, error = %e, "Error saving user");
            UpsertOutcome::Failed
        }
    }
}

async fn try_upsert(
    repository: &dyn UserRepository,
    user: &NewUser,
) -> Result<UpsertOutcome, StoreError> {
    if let Some(existing) = repository.find_by_clerk_id(&user.clerk_user_id).await? {
        tracing::info!(
            clerk_user_id = %existing.clerk_user_id,
            record_id = %existing.id,
            "User already exists"
        );
        return Ok(UpsertOutcome::AlreadyExists);
    }

    if repository.insert_if_absent(user).await? {
        tracing::info!(clerk_user_id = %user.clerk_user_id, "User successfully saved to database");
        Ok(UpsertOutcome::Created)
    } else {
        // Another delivery inserted the same subject between our check and insert.
        tracing::info!(
            clerk_user_id = %user.clerk_user_id,
            "User was stored by a concurrent delivery"
        );
        Ok(UpsertOutcome::AlreadyExists)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::models::user::UserRecord;
    use crate::store::SqliteUserStore;

    fn sqlite_handle() -> StoreHandle {
        StoreHandle::ready(Arc::new(SqliteUserStore::open(":memory:").unwrap()))
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl UserRepository for BrokenStore {
        async fn find_by_clerk_id(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Database("disk I/O error".to_string()))
        }

        async fn insert_if_absent(&self, _: &NewUser) -> Result<bool, StoreError> {
            Err(StoreError::Database("disk I/O error".to_string()))
        }

        async fn count_users(&self) -> Result<u64, StoreError> {
            Err(StoreError::Database("disk I/O error".to_string()))
        }
    }

    /// Store that never finds a record, as if the existence check raced
    /// with another delivery.
    struct RacingStore(SqliteUserStore);

    #[async_trait]
    impl UserRepository for RacingStore {
        async fn find_by_clerk_id(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(None)
        }

        async fn insert_if_absent(&self, user: &NewUser) -> Result<bool, StoreError> {
            self.0.insert_if_absent(user).await
        }

        async fn count_users(&self) -> Result<u64, StoreError> {
            self.0.count_users().await
        }
    }

    #[tokio::test]
    async fn test_creates_new_user() {
        let store = sqlite_handle();
        let user = NewUser::from_event_fields("u_1", Some("Ada"), Some("Lovelace"));

        assert_eq!(upsert_if_absent(&store, user).await, UpsertOutcome::Created);

        let record = store.get().unwrap().find_by_clerk_id("u_1").await.unwrap().unwrap();
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "Lovelace");
    }

    #[tokio::test]
    async fn test_existing_user_is_left_untouched() {
        let store = sqlite_handle();
        let first = NewUser::from_event_fields("u_1", Some("Ada"), Some("Lovelace"));
        let second = NewUser::from_event_fields("u_1", Some("Augusta"), None);

        assert_eq!(upsert_if_absent(&store, first).await, UpsertOutcome::Created);
        assert_eq!(upsert_if_absent(&store, second).await, UpsertOutcome::AlreadyExists);

        let repository = store.get().unwrap();
        assert_eq!(repository.count_users().await.unwrap(), 1);
        let record = repository.find_by_clerk_id("u_1").await.unwrap().unwrap();
        assert_eq!(record.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_disconnected_store_drops_event() {
        let store = StoreHandle::disconnected();
        let user = NewUser::from_event_fields("u_1", None, None);

        assert_eq!(upsert_if_absent(&store, user).await, UpsertOutcome::StoreUnavailable);
    }

    #[tokio::test]
    async fn test_store_errors_are_swallowed() {
        let store = StoreHandle::ready(Arc::new(BrokenStore));
        let user = NewUser::from_event_fields("u_1", None, None);

        assert_eq!(upsert_if_absent(&store, user).await, UpsertOutcome::Failed);
    }

    #[tokio::test]
    async fn test_lost_race_does_not_duplicate() {
        let inner = SqliteUserStore::open(":memory:").unwrap();
        let store = StoreHandle::ready(Arc::new(RacingStore(inner)));
        let user = NewUser::from_event_fields("u_1", Some("Ada"), None);

        assert_eq!(upsert_if_absent(&store, user.clone()).await, UpsertOutcome::Created);
        assert_eq!(upsert_if_absent(&store, user).await, UpsertOutcome::AlreadyExists);
        assert_eq!(store.get().unwrap().count_users().await.unwrap(), 1);
    }
}
