//! Storage for registered profiles.
//!
//! The conversation logic only sees the [`UserStore`] trait. Two backends are
//! provided: [`SqliteStore`] (file-backed, survives restarts) and
//! [`MemoryStore`] (lost on restart, handy for tests and throwaway runs).

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::desk::profile::UserProfile;

/// Errors from the backing medium.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Keyed profile storage. Last write wins per `user_id`.
pub trait UserStore: Send + Sync {
    /// True iff a committed profile exists for `user_id`.
    fn exists(&self, user_id: i64) -> Result<bool, StoreError>;

    fn get(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError>;

    /// Insert or fully replace the profile keyed on `profile.user_id`.
    fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError>;
}

/// SQLite-backed store, one row per registered user.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        info!("Opened user store at {:?} ({} profiles)", path, store.count()?);
        Ok(store)
    }

    /// In-memory SQLite database, same schema.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                full_name TEXT NOT NULL,
                faculty TEXT NOT NULL,
                "group" TEXT NOT NULL,
                phone TEXT NOT NULL
            );
        "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Number of stored profiles.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl UserStore for SqliteStore {
    fn exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let found = conn
            .query_row("SELECT 1 FROM users WHERE user_id = ?1", params![user_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let profile = conn
            .query_row(
                r#"SELECT user_id, full_name, faculty, "group", phone FROM users WHERE user_id = ?1"#,
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        user_id: row.get(0)?,
                        full_name: row.get(1)?,
                        faculty: row.get(2)?,
                        group: row.get(3)?,
                        phone: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            r#"INSERT OR REPLACE INTO users (user_id, full_name, faculty, "group", phone)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                profile.user_id,
                profile.full_name,
                profile.faculty,
                profile.group,
                profile.phone
            ],
        )?;
        Ok(())
    }
}

/// Process-local store. Everything is gone after a restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.contains_key(&user_id))
    }

    fn get(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(&user_id).cloned())
    }

    fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        users.insert(profile.user_id, profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(user_id: i64, faculty: &str, group: &str, phone: &str) -> UserProfile {
        UserProfile {
            user_id,
            full_name: "Ali Valiyev".to_string(),
            faculty: faculty.to_string(),
            group: group.to_string(),
            phone: phone.to_string(),
        }
    }

    fn check_contract(store: &dyn UserStore) {
        assert!(!store.exists(42).unwrap());
        assert_eq!(store.get(42).unwrap(), None);

        let first = profile(42, "Iqtisodiyot", "204-19", "+998901234567");
        store.upsert(&first).unwrap();
        assert!(store.exists(42).unwrap());
        assert_eq!(store.get(42).unwrap(), Some(first));

        // Full overwrite, no merge with the previous row.
        let second = profile(42, "Turizm", "101-22", "+998935550000");
        store.upsert(&second).unwrap();
        assert_eq!(store.get(42).unwrap(), Some(second));

        assert!(!store.exists(43).unwrap());
    }

    #[test]
    fn test_memory_store_contract() {
        check_contract(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store_contract() {
        check_contract(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(&profile(7, "Menejment", "310-21", "+998711112233")).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let loaded = store.get(7).unwrap().expect("profile should persist");
        assert_eq!(loaded.faculty, "Menejment");
        assert_eq!(loaded.group, "310-21");
    }

    #[test]
    fn test_sqlite_store_keeps_text_verbatim() {
        let store = SqliteStore::open_in_memory().unwrap();
        let odd = profile(9, "TDIU-PDU qo'shma ta'lim fakulteti", "'; DROP TABLE users; --", "+1");
        store.upsert(&odd).unwrap();
        assert_eq!(store.get(9).unwrap(), Some(odd));
    }
}
