/*!
 * Document-to-audio synthesis.
 *
 * Segments are chunked and spoken strictly in document order. Each chunk is
 * looked up in the audio cache first. The encoded chunks are concatenated
 * byte for byte; every chunk after the first loses its leading ID3v2 tag so
 * players see a single stream.
 */

use bytes::BytesMut;
use log::{debug, info};
use std::sync::Arc;

use super::cache::{AudioCache, cache_key};
use super::chunker::chunk_text;
use super::segments::plan_segments;
use crate::document::Node;
use crate::errors::SpeechError;
use crate::front_matter::FrontMatter;
use crate::providers::SpeechProvider;

/// Default per-request character budget
pub const DEFAULT_CHUNK_CHARS: usize = 4000;

/// Speech synthesizer with a provider and a chunk cache
#[derive(Clone)]
pub struct SpeechSynthesizer {
    /// Text-to-speech backend
    provider: Arc<dyn SpeechProvider>,
    /// Chunk cache
    cache: Arc<dyn AudioCache>,
    /// Voice used when the document names none
    default_voice: String,
    /// Maximum characters per provider call
    chunk_chars: usize,
}

impl std::fmt::Debug for SpeechSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSynthesizer")
            .field("provider", &self.provider.name())
            .field("default_voice", &self.default_voice)
            .field("chunk_chars", &self.chunk_chars)
            .finish()
    }
}

impl SpeechSynthesizer {
    /// Create a synthesizer with the default chunk budget
    pub fn new(provider: Arc<dyn SpeechProvider>, cache: Arc<dyn AudioCache>, default_voice: impl Into<String>) -> Self {
        Self {
            provider,
            cache,
            default_voice: default_voice.into(),
            chunk_chars: DEFAULT_CHUNK_CHARS,
        }
    }

    /// Override the per-request character budget
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Voice used when the document names none
    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Synthesize the whole document into one audio stream
    pub async fn synthesize(&self, tree: &Node, config: &FrontMatter, request_id: &str) -> Result<Vec<u8>, SpeechError> {
        let segments = plan_segments(tree, config, &self.default_voice)?;
        if segments.is_empty() {
            return Err(SpeechError::NoContent);
        }

        let mut audio = BytesMut::new();
        let mut chunk_count = 0;

        for segment in &segments {
            for chunk in chunk_text(&segment.text, self.chunk_chars) {
                let bytes = self.synthesize_chunk(&chunk, &segment.voice, request_id).await?;
                if chunk_count == 0 {
                    audio.extend_from_slice(&bytes);
                } else {
                    audio.extend_from_slice(strip_id3v2(&bytes));
                }
                chunk_count += 1;
            }
        }

        if chunk_count == 0 {
            return Err(SpeechError::NoContent);
        }

        info!(
            "[{}] Synthesized {} segment(s) in {} chunk(s), {} bytes",
            request_id,
            segments.len(),
            chunk_count,
            audio.len()
        );
        Ok(audio.to_vec())
    }

    async fn synthesize_chunk(&self, text: &str, voice: &str, request_id: &str) -> Result<Vec<u8>, SpeechError> {
        let key = cache_key(voice, text);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("[{}] Speech cache hit for {} chars with voice {}", request_id, text.chars().count(), voice);
            return Ok(cached);
        }

        debug!("[{}] Speech cache miss, calling {}", request_id, self.provider.name());
        let audio = self.provider.synthesize(text, voice).await?;
        self.cache.put(&key, voice, text, &audio).await;
        Ok(audio)
    }
}

/// Drop a leading ID3v2 tag, if the bytes start with a complete one
pub fn strip_id3v2(bytes: &[u8]) -> &[u8] {
    if bytes.len() < 10 || &bytes[..3] != b"ID3" {
        return bytes;
    }

    // Tag size is a 28-bit syncsafe integer
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7f));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    let total = 10 + size + footer;

    if total <= bytes.len() { &bytes[total..] } else { bytes }
}
