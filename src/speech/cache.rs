/*!
 * Audio chunk caching.
 *
 * Synthesized chunks are cached by the digest of voice and text, so a chunk
 * that has been spoken once is never sent to the provider again. Cache
 * failures are logged and treated as misses; they never fail an export.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{AudioCacheRecord, Repository};

/// Cache key for a chunk spoken with a voice
pub fn cache_key(voice: &str, text: &str) -> String {
    // NUL cannot appear in a voice name, so ("ab", "c") and ("a", "bc") differ
    Repository::hash_text(&format!("{}\0{}", voice, text))
}

/// Store of synthesized audio chunks
#[async_trait]
pub trait AudioCache: Send + Sync {
    /// Cached audio for `key`, if any
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Remember `audio` for `key`
    async fn put(&self, key: &str, voice: &str, text: &str, audio: &[u8]);
}

/// SQLite-backed cache shared by every run on this machine
#[derive(Debug, Clone)]
pub struct SqliteAudioCache {
    repository: Repository,
}

impl SqliteAudioCache {
    /// Wrap a repository
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

#[async_trait]
impl AudioCache for SqliteAudioCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.repository.get_cached_audio(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Speech cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &str, voice: &str, text: &str, audio: &[u8]) {
        let record = AudioCacheRecord::new(key.to_string(), voice, text, audio.to_vec());
        if let Err(e) = self.repository.cache_audio(&record).await {
            warn!("Speech cache write failed: {}", e);
        }
    }
}

/// In-process cache, used when persistence is disabled and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryAudioCache {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryAudioCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached chunks
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AudioCache for MemoryAudioCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    async fn put(&self, key: &str, voice: &str, _text: &str, audio: &[u8]) {
        debug!("Caching {} audio bytes for voice {}", audio.len(), voice);
        self.entries.write().insert(key.to_string(), audio.to_vec());
    }
}
