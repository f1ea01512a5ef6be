//! SQLite storage for accounts, sessions and snapshots.

mod migrations;

use std::path::Path;
use std::sync::Arc;

use plotline_core::Snapshot;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tokio::sync::Mutex;

use crate::error::AppError;

pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

/// Shared handle; every statement runs under one connection lock.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            let conn = Connection::open(Path::new(path))?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(journal_mode = %mode, "Opened server database at {}", path);
            conn
        };
        Self::initialize(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(mut conn: Connection) -> Result<Self, AppError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<UserRecord, AppError> {
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, email, password_hash, now],
        );

        match inserted {
            Ok(_) => Ok(UserRecord {
                id: id.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(AppError::conflict("An account with this email already exists"))
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE email = ?1",
                params![email],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    pub async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, AppError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE id = ?1",
                params![id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    pub async fn create_session(
        &self,
        session_id: &str,
        user_id: &str,
        created_at: i64,
        expires_at: i64,
    ) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, user_id, created_at, expires_at],
        )?;
        Ok(())
    }

    pub async fn session_active(
        &self,
        session_id: &str,
        user_id: &str,
        now: i64,
    ) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let found = conn
            .query_row(
                "SELECT 1 FROM sessions
                 WHERE id = ?1 AND user_id = ?2 AND revoked_at IS NULL AND expires_at > ?3",
                params![session_id, user_id, now],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Returns false when the session was already revoked or never existed.
    pub async fn revoke_session(&self, session_id: &str, now: i64) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE sessions SET revoked_at = ?2 WHERE id = ?1 AND revoked_at IS NULL",
            params![session_id, now],
        )?;
        Ok(changed > 0)
    }

    pub async fn prune_expired_sessions(&self, now: i64) -> Result<usize, AppError> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1 OR revoked_at IS NOT NULL",
            params![now],
        )?;
        Ok(removed)
    }

    pub async fn load_snapshot(&self, user_id: &str) -> Result<Snapshot, AppError> {
        let conn = self.conn.lock().await;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM snapshots WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        match data {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Snapshot::default()),
        }
    }

    pub async fn save_snapshot(
        &self,
        user_id: &str,
        snapshot: &Snapshot,
        now: i64,
    ) -> Result<(), AppError> {
        let data = serde_json::to_string(snapshot)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO snapshots (user_id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![user_id, data, now],
        )?;
        Ok(())
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use plotline_core::models::Story;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn user(db: &Database, email: &str) -> UserRecord {
        db.create_user(&uuid::Uuid::now_v7().to_string(), email, "hash", 1)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_regardless_of_case() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "writer@example.com").await;

        let err = db
            .create_user("other", "Writer@Example.com", "hash", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_snapshot_loads_as_empty() {
        let db = Database::open_in_memory().unwrap();
        let account = user(&db, "writer@example.com").await;

        assert!(db.load_snapshot(&account.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saving_twice_keeps_the_latest_copy() {
        let db = Database::open_in_memory().unwrap();
        let account = user(&db, "writer@example.com").await;
        let snapshot = Snapshot {
            stories: vec![Story::new("Draft")],
            ..Snapshot::default()
        };

        db.save_snapshot(&account.id, &Snapshot::default(), 1)
            .await
            .unwrap();
        db.save_snapshot(&account.id, &snapshot, 2).await.unwrap();
        db.save_snapshot(&account.id, &snapshot, 3).await.unwrap();

        assert_eq!(db.load_snapshot(&account.id).await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn revoked_and_expired_sessions_are_inactive() {
        let db = Database::open_in_memory().unwrap();
        let account = user(&db, "writer@example.com").await;
        db.create_session("s1", &account.id, 10, 100).await.unwrap();
        db.create_session("s2", &account.id, 10, 50).await.unwrap();

        assert!(db.session_active("s1", &account.id, 20).await.unwrap());
        assert!(!db.session_active("s1", "someone-else", 20).await.unwrap());
        assert!(!db.session_active("s2", &account.id, 60).await.unwrap());

        assert!(db.revoke_session("s1", 30).await.unwrap());
        assert!(!db.revoke_session("s1", 31).await.unwrap());
        assert!(!db.session_active("s1", &account.id, 40).await.unwrap());

        assert_eq!(db.prune_expired_sessions(60).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.db");
        let path = path.to_str().unwrap();

        let id = {
            let db = Database::open(path).unwrap();
            user(&db, "writer@example.com").await.id
        };

        let reopened = Database::open(path).unwrap();
        let found = reopened
            .find_user_by_email("WRITER@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
    }
}
