//! User persistence.
//!
//! The service talks to storage through the [`UserRepository`] trait. A
//! [`StoreHandle`] is created once at startup and shared by every request;
//! it is either ready (holding a repository) or disconnected, and never closed.

mod sqlite;

pub use sqlite::SqliteUserStore;

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::models::user::{NewUser, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Minimal repository over user records keyed by the provider's subject id.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a record by the identity provider's subject id.
    async fn find_by_clerk_id(&self, clerk_user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a record unless one with the same subject id exists.
    ///
    /// Returns `false` when the uniqueness constraint rejected the insert.
    async fn insert_if_absent(&self, user: &NewUser) -> Result<bool, StoreError>;

    async fn count_users(&self) -> Result<u64, StoreError>;
}

/// Shared, injectable handle to the user store.
#[derive(Clone, Default)]
pub struct StoreHandle {
    repository: Arc<OnceLock<Arc<dyn UserRepository>>>,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl StoreHandle {
    /// A handle with no store behind it.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A handle that is ready with the given repository.
    pub fn ready(repository: Arc<dyn UserRepository>) -> Self {
        let handle = Self::default();
        handle.attach(repository);
        handle
    }

    /// Open the SQLite store at `database_url`.
    ///
    /// Connection failures are logged and yield a disconnected handle; the
    /// service keeps serving and the upsert task reports the store as
    /// unavailable.
    pub fn connect(database_url: Option<&str>) -> Self {
        let Some(url) = database_url.filter(|url| !url.trim().is_empty()) else {
            tracing::warn!("No database URL configured, user records will not be stored");
            return Self::disconnected();
        };

        match SqliteUserStore::open(url) {
            Ok(store) => {
                tracing::info!("Connected to DB");
                Self::ready(Arc::new(store))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to database");
                Self::disconnected()
            }
        }
    }

    /// Attach a repository to a disconnected handle. Returns `false` if one
    /// was already attached.
    pub fn attach(&self, repository: Arc<dyn UserRepository>) -> bool {
        self.repository.set(repository).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.repository.get().is_some()
    }

    pub fn get(&self) -> Option<Arc<dyn UserRepository>> {
        self.repository.get().cloned()
    }
}
