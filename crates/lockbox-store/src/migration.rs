//! SQLite schema.
//!
//! Migrations are numbered SQL batches applied in order inside one
//! transaction. `schema_migrations` records every version applied.

use lockbox_core::now_millis;
use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};

/// Highest version this build knows how to apply.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

const MIGRATIONS: &[&str] = &[
    // v1: logs, high-water marks, replay cache
    r#"
    CREATE TABLE entries (
        path TEXT NOT NULL,
        idx INTEGER NOT NULL,           -- assigned from log_heads.high_water
        ts INTEGER NOT NULL,            -- store clock at append (Unix ms)
        data BLOB NOT NULL,
        PRIMARY KEY (path, idx)
    ) WITHOUT ROWID;

    -- Last index ever assigned per path; survives replace and delete
    CREATE TABLE log_heads (
        path TEXT PRIMARY KEY,
        high_water INTEGER NOT NULL
    );

    -- Consumed nonces and other expiring keys
    CREATE TABLE replay_cache (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires_at INTEGER              -- Unix ms, NULL = never
    );

    CREATE INDEX idx_replay_cache_expires ON replay_cache(expires_at);
    "#,
];

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )?;

    let applied: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    if applied > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema v{} is newer than this build (v{})",
            applied, CURRENT_VERSION
        )));
    }
    if applied == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in (1..).zip(MIGRATIONS).skip(applied as usize) {
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, now_millis()],
        )?;
        tracing::debug!(version, "applied schema migration");
    }
    tx.commit()?;
    Ok(())
}
