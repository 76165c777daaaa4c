//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, namelink_core::now_secs() as i64],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated store schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Content-addressed blobs (chunks and anything else put by callers)
        CREATE TABLE blobs (
            cid TEXT PRIMARY KEY,             -- CIDv0 text of sha2-256(bytes)
            bytes BLOB NOT NULL,
            stored_at INTEGER NOT NULL        -- unix seconds
        );

        -- One mutable index record per (owner, namespace)
        CREATE TABLE name_indexes (
            owner TEXT NOT NULL,              -- lower-case 0x address
            namespace TEXT NOT NULL,          -- normalized namespace key
            head TEXT NOT NULL,               -- CID of the newest chunk, compared on swap
            document TEXT NOT NULL,           -- NameIndex JSON
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (owner, namespace)
        );

        -- One mutable profile per owner
        CREATE TABLE profiles (
            owner TEXT PRIMARY KEY,
            revision INTEGER NOT NULL,        -- compared on swap, starts at 1
            document TEXT NOT NULL,           -- Profile JSON
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}
