use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::models::user::{NewUser, UserRecord};
use crate::store::{SqliteUserStore, StoreError, UserRepository};

/// In-memory store whose inserts wait until [`GatedStore::release`] is called.
pub struct GatedStore {
    inner: SqliteUserStore,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteUserStore::open(":memory:").unwrap(),
            gate: Semaphore::new(0),
        }
    }

    /// Let `n` pending or future inserts proceed.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

impl Default for GatedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for GatedStore {
    async fn find_by_clerk_id(
        &self,
        clerk_user_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.inner.find_by_clerk_id(clerk_user_id).await
    }

    async fn insert_if_absent(&self, user: &NewUser) -> Result<bool, StoreError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        permit.forget();
        self.inner.insert_if_absent(user).await
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        self.inner.count_users().await
    }
}
