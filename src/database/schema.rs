//! Speech cache schema, versioned through SQLite's `user_version` pragma.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::Connection;

/// Schema version written by this build
pub const SCHEMA_VERSION: i32 = 1;

const SPEECH_CACHE_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS speech_cache (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cache_key TEXT NOT NULL UNIQUE,
        voice TEXT NOT NULL,
        text_preview TEXT NOT NULL,
        text_length INTEGER NOT NULL,
        audio BLOB NOT NULL,
        byte_size INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        last_used_at TEXT NOT NULL,
        hit_count INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_speech_cache_created ON speech_cache(created_at);
"#;

/// Bring a freshly opened database up to `SCHEMA_VERSION`
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read speech cache schema version")?;

    if version > SCHEMA_VERSION {
        bail!(
            "Speech cache schema v{} is newer than this build supports (v{})",
            version,
            SCHEMA_VERSION
        );
    }
    if version == SCHEMA_VERSION {
        debug!("Speech cache schema is up to date (v{})", version);
        return Ok(());
    }

    info!("Creating speech cache schema v{}", SCHEMA_VERSION);
    // In-memory databases keep their own journal mode
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(&format!("{}\nPRAGMA user_version = {};", SPEECH_CACHE_V1, SCHEMA_VERSION))
        .context("Failed to create speech cache schema")?;
    Ok(())
}
