use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{StoreError, UserRepository};
use crate::models::user::{NewUser, UserRecord};

const MEMORY_DATABASE: &str = ":memory:";

/// SQLite-backed user store.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url).trim();
        // SQLite treats an empty path as a private temporary database.
        if path.is_empty() {
            return Err(StoreError::Database("empty database path".to_string()));
        }

        let conn = if path == MEMORY_DATABASE {
            Connection::open_in_memory()
        } else {
            // Create parent directories if needed
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
            Connection::open(path)
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                clerk_user_id TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!("User store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn find_by_clerk_id(
        &self,
        clerk_user_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;

        let row: Option<(String, String, String, String, String)> = conn
            .query_row(
                "SELECT id, clerk_user_id, first_name, last_name, created_at
                 FROM users WHERE clerk_user_id = ?1",
                params![clerk_user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some((id, clerk_user_id, first_name, last_name, created_at)) = row else {
            return Ok(None);
        };

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                StoreError::Database(format!("Invalid created_at for user {}: {}", id, e))
            })?;

        Ok(Some(UserRecord {
            id,
            clerk_user_id,
            first_name,
            last_name,
            created_at,
        }))
    }

    async fn insert_if_absent(&self, user: &NewUser) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;

        let inserted = conn
            .execute(
                "INSERT INTO users (id, clerk_user_id, first_name, last_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(clerk_user_id) DO NOTHING",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    user.clerk_user_id,
                    user.first_name,
                    user.last_name,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(clerk_user_id = %user.clerk_user_id, inserted, "Insert user");
        Ok(inserted == 1)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError::Database(e.to_string()))?;

        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))
            .map(|count| count as u64)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = SqliteUserStore::open(":memory:").unwrap();
        let user = NewUser::from_event_fields("u_1", Some("Ada"), Some("Lovelace"));

        assert!(store.insert_if_absent(&user).await.unwrap());

        let record = store.find_by_clerk_id("u_1").await.unwrap().unwrap();
        assert_eq!(record.clerk_user_id, "u_1");
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "Lovelace");
        assert!(!record.id.is_empty());
    }

    #[tokio::test]
    async fn test_find_missing() {
        let store = SqliteUserStore::open("sqlite::memory:").unwrap();
        assert!(store.find_by_clerk_id("nobody").await.unwrap().is_none());
        assert_eq!(store.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_ignored() {
        let store = SqliteUserStore::open(":memory:").unwrap();
        let first = NewUser::from_event_fields("u_1", Some("Ada"), Some("Lovelace"));
        let second = NewUser::from_event_fields("u_1", Some("Grace"), Some("Hopper"));

        assert!(store.insert_if_absent(&first).await.unwrap());
        assert!(!store.insert_if_absent(&second).await.unwrap());

        assert_eq!(store.count_users().await.unwrap(), 1);
        let record = store.find_by_clerk_id("u_1").await.unwrap().unwrap();
        assert_eq!(record.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_corrupt_created_at_is_an_error() {
        let store = SqliteUserStore::open(":memory:").unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO users (id, clerk_user_id, first_name, last_name, created_at)
                 VALUES ('r_1', 'u_1', 'Ada', 'Lovelace', 'yesterday')",
                [],
            )
            .unwrap();

        let err = store.find_by_clerk_id("u_1").await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(matches!(SqliteUserStore::open(""), Err(StoreError::Database(_))));
        assert!(matches!(SqliteUserStore::open("sqlite:"), Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_records_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.db");
        let url = format!("sqlite:{}", path.display());

        {
            let store = SqliteUserStore::open(&url).unwrap();
            let user = NewUser::from_event_fields("u_1", None, None);
            store.insert_if_absent(&user).await.unwrap();
        }

        let store = SqliteUserStore::open(&url).unwrap();
        let record = store.find_by_clerk_id("u_1").await.unwrap().unwrap();
        assert_eq!(record.first_name, "Unknown");
        assert_eq!(store.count_users().await.unwrap(), 1);
    }
}
