//! SQLite implementation of the store traits.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking. Pointer records are swapped
//! with a conditional `UPDATE`, so several processes sharing one database
//! file still serialize their appends.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use namelink_core::{normalize_key, now_secs, Address, Cid, NameIndex, Profile};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContentStore, PointerStore, SwapResult, Versioned};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {}", e)))?
    }
}

fn now() -> i64 {
    now_secs() as i64
}

fn row_to_index(document: String) -> Result<NameIndex> {
    Ok(NameIndex::from_json(&document)?)
}

fn read_index(conn: &Connection, owner: &str, namespace: &str) -> Result<Option<NameIndex>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM name_indexes WHERE owner = ?1 AND namespace = ?2",
            params![owner, namespace],
            |row| row.get(0),
        )
        .optional()?;
    document.map(row_to_index).transpose()
}

fn read_profile(conn: &Connection, owner: &str) -> Result<Option<Versioned<Profile>>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT revision, document FROM profiles WHERE owner = ?1",
            params![owner],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(revision, document)| {
        let revision = u64::try_from(revision)
            .map_err(|_| StoreError::InvalidData(format!("negative revision {}", revision)))?;
        Ok(Versioned {
            value: Profile::from_json(&document)?,
            revision,
        })
    })
    .transpose()
}

fn to_sql_revision(revision: u64) -> Result<i64> {
    i64::try_from(revision)
        .map_err(|_| StoreError::InvalidData(format!("revision {} out of range", revision)))
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn put(&self, bytes: Bytes) -> Result<Cid> {
        let cid = Cid::for_bytes(&bytes);
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blobs (cid, bytes, stored_at) VALUES (?1, ?2, ?3)",
                params![cid.to_string(), bytes.as_ref(), now()],
            )?;
            Ok(cid)
        })
        .await
    }

    async fn get(&self, cid: &Cid) -> Result<Bytes> {
        let cid = *cid;
        self.blocking(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT bytes FROM blobs WHERE cid = ?1",
                    params![cid.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            bytes
                .map(Bytes::from)
                .ok_or_else(|| StoreError::NotFound(cid.to_string()))
        })
        .await
    }

    async fn has(&self, cid: &Cid) -> Result<bool> {
        let cid = *cid;
        self.blocking(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM blobs WHERE cid = ?1",
                    params![cid.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}

#[async_trait]
impl PointerStore for SqliteStore {
    async fn load_index(&self, owner: &Address, namespace: &str) -> Result<Option<NameIndex>> {
        let owner = owner.to_hex();
        let namespace = normalize_key(namespace);
        self.blocking(move |conn| read_index(conn, &owner, &namespace))
            .await
    }

    async fn swap_index(
        &self,
        owner: &Address,
        namespace: &str,
        expected_head: Option<&Cid>,
        next: &NameIndex,
    ) -> Result<SwapResult<NameIndex>> {
        let owner = owner.to_hex();
        let namespace = normalize_key(namespace);
        let expected = expected_head.map(Cid::to_string);
        let head = next.head.to_string();
        let document = next.to_json()?;

        self.blocking(move |conn| {
            let changed = match &expected {
                Some(expected) => conn.execute(
                    "UPDATE name_indexes SET head = ?1, document = ?2, updated_at = ?3
                     WHERE owner = ?4 AND namespace = ?5 AND head IS ?6",
                    params![head, document, now(), owner, namespace, expected],
                )?,
                None => conn.execute(
                    "INSERT OR IGNORE INTO name_indexes
                        (owner, namespace, head, document, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![owner, namespace, head, document, now()],
                )?,
            };

            if changed == 1 {
                Ok(SwapResult::Swapped)
            } else {
                Ok(SwapResult::Conflict {
                    current: read_index(conn, &owner, &namespace)?,
                })
            }
        })
        .await
    }

    async fn list_namespaces(&self, owner: &Address) -> Result<Vec<String>> {
        let owner = owner.to_hex();
        self.blocking(move |conn| {
            let mut stmt = conn
                .prepare("SELECT namespace FROM name_indexes WHERE owner = ?1 ORDER BY namespace")?;
            let namespaces = stmt
                .query_map(params![owner], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(namespaces)
        })
        .await
    }

    async fn load_profile(&self, owner: &Address) -> Result<Option<Versioned<Profile>>> {
        let owner = owner.to_hex();
        self.blocking(move |conn| read_profile(conn, &owner)).await
    }

    async fn swap_profile(
        &self,
        owner: &Address,
        expected_revision: Option<u64>,
        next: &Profile,
    ) -> Result<SwapResult<Versioned<Profile>>> {
        let owner = owner.to_hex();
        let document = next.to_json()?;
        let expected = expected_revision.map(to_sql_revision).transpose()?;
        let revision = to_sql_revision(expected_revision.map_or(1, |r| r + 1))?;

        self.blocking(move |conn| {
            let changed = match expected {
                Some(expected) => conn.execute(
                    "UPDATE profiles SET revision = ?1, document = ?2, updated_at = ?3
                     WHERE owner = ?4 AND revision = ?5",
                    params![revision, document, now(), owner, expected],
                )?,
                None => conn.execute(
                    "INSERT OR IGNORE INTO profiles (owner, revision, document, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![owner, revision, document, now()],
                )?,
            };

            if changed == 1 {
                Ok(SwapResult::Swapped)
            } else {
                Ok(SwapResult::Conflict {
                    current: read_profile(conn, &owner)?,
                })
            }
        })
        .await
    }
}
