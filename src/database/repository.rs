/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for the speech chunk cache,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::connection::DatabaseConnection;
use super::models::{AudioCacheRecord, timestamp_now};

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Cache Operations
    // =========================================================================

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get a cached audio chunk
    pub async fn get_cached_audio(&self, cache_key: &str) -> Result<Option<Vec<u8>>> {
        let cache_key = cache_key.to_string();
        let now = timestamp_now();

        self.db
            .execute_async(move |conn| {
                let result: Option<(i64, Vec<u8>)> = conn
                    .query_row(
                        "SELECT id, audio FROM speech_cache WHERE cache_key = ?1",
                        [&cache_key],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                if let Some((id, audio)) = result {
                    conn.execute(
                        "UPDATE speech_cache SET hit_count = hit_count + 1, last_used_at = ?1 WHERE id = ?2",
                        params![now, id],
                    )?;
                    debug!("Speech cache hit for {}", &cache_key[..cache_key.len().min(12)]);
                    Ok(Some(audio))
                } else {
                    Ok(None)
                }
            })
            .await
    }

    /// Store an audio chunk in the cache
    pub async fn cache_audio(&self, record: &AudioCacheRecord) -> Result<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO speech_cache (
                        cache_key, voice, text_preview, text_length, audio,
                        byte_size, created_at, last_used_at, hit_count
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)
                    ON CONFLICT(cache_key)
                    DO UPDATE SET last_used_at = excluded.last_used_at
                    "#,
                    params![
                        record.cache_key,
                        record.voice,
                        record.text_preview,
                        record.text_length,
                        record.audio,
                        record.audio.len() as i64,
                        record.created_at,
                        record.hit_count,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get cache statistics
    pub async fn get_cache_stats(&self) -> Result<CacheStats> {
        self.db
            .execute_async(|conn| {
                let (total_entries, total_hits, total_bytes): (i64, i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(hit_count), 0), COALESCE(SUM(byte_size), 0) FROM speech_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;

                Ok(CacheStats {
                    total_entries,
                    total_hits,
                    total_bytes,
                })
            })
            .await
    }

    /// Clear the speech cache
    pub async fn clear_cache(&self) -> Result<i64> {
        self.db
            .execute_async(|conn| {
                let deleted = conn.execute("DELETE FROM speech_cache", [])?;
                Ok(deleted as i64)
            })
            .await
    }

    /// Delete chunks created more than `days` days ago
    pub async fn purge_older_than(&self, days: i64) -> Result<i64> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(days))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM speech_cache WHERE created_at < ?1", [cutoff])?;
                Ok(deleted as i64)
            })
            .await
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache entries
    pub total_entries: i64,
    /// Total number of cache hits
    pub total_hits: i64,
    /// Total size of cached audio in bytes
    pub total_bytes: i64,
}
