/*!
 * Database module for persistent storage.
 *
 * This module provides SQLite-based persistence for the speech chunk cache:
 * synthesized audio keyed by the digest of voice and text, with hit counts
 * and age-based purging.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::AudioCacheRecord;
pub use repository::{CacheStats, Repository};
