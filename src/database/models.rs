/*!
 * Database model types.
 */

use chrono::{SecondsFormat, Utc};

/// Longest text excerpt stored alongside a cached chunk
const PREVIEW_CHARS: usize = 80;

/// A synthesized audio chunk stored in the speech cache
#[derive(Debug, Clone)]
pub struct AudioCacheRecord {
    /// Database ID
    pub id: i64,
    /// SHA256 digest of (voice, text)
    pub cache_key: String,
    /// Voice the chunk was synthesized with
    pub voice: String,
    /// Start of the chunk text, for inspection
    pub text_preview: String,
    /// Length of the chunk text in characters
    pub text_length: i64,
    /// Encoded audio
    pub audio: Vec<u8>,
    /// Creation timestamp (RFC 3339, UTC)
    pub created_at: String,
    /// Number of cache hits
    pub hit_count: i64,
}

impl AudioCacheRecord {
    /// Create a new record for a freshly synthesized chunk
    pub fn new(cache_key: String, voice: &str, text: &str, audio: Vec<u8>) -> Self {
        Self {
            id: 0, // Will be assigned by database
            cache_key,
            voice: voice.to_string(),
            text_preview: text.chars().take(PREVIEW_CHARS).collect(),
            text_length: text.chars().count() as i64,
            audio,
            created_at: timestamp_now(),
            hit_count: 0,
        }
    }
}

/// Fixed-width UTC timestamp, so stored values compare correctly as text
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
