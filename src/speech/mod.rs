/*!
 * Speech synthesis subsystem.
 *
 * Turns a document tree into one audio track:
 * - `segments`: prose extraction and `[speaker: NAME]` segmentation
 * - `chunker`: splitting long text under the provider's character budget
 * - `cache`: per-chunk audio cache keyed by voice and text
 * - `synthesizer`: sequential synthesis and lossless concatenation
 */

pub mod cache;
pub mod chunker;
pub mod segments;
pub mod synthesizer;

pub use cache::{AudioCache, MemoryAudioCache, SqliteAudioCache, cache_key};
pub use chunker::chunk_text;
pub use segments::{SpeakerSegment, VoiceSegment, plan_segments};
pub use synthesizer::{DEFAULT_CHUNK_CHARS, SpeechSynthesizer, strip_id3v2};
