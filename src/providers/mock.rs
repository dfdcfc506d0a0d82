/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockChatProvider::replying(text)` - Always answers with the same text
 * - `MockChatProvider::scripted(answers)` - Answers from a queue, one per call
 * - `MockChatProvider::intermittent(n)` - Fails every Nth request
 * - `MockChatProvider::failing()` - Always answers HTTP 500
 * - `MockChatProvider::missing_credentials()` - Fails the credential check
 * - `MockSpeechProvider` - Records every synthesis call and returns fake audio
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ChatMessage, ChatProvider, SpeechProvider};
use crate::errors::ProviderError;

/// Behavior mode for the mock chat provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always answers with the given text
    Replying(String),
    /// Answers from a queue; the last answer repeats once the queue drains
    Scripted,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize, reply: String },
    /// Always answers with a 500 API error
    Failing,
    /// Reports missing credentials
    MissingCredentials,
}

/// Chat provider that answers without a network; clones share their counters
/// so a test can hand one clone to the controller and inspect the other.
#[derive(Debug)]
pub struct MockChatProvider {
    behavior: MockBehavior,
    script: Arc<Mutex<VecDeque<String>>>,
    /// Repeated once `script` drains
    last_answer: Arc<Mutex<Option<String>>>,
    request_count: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockChatProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            last_answer: Arc::new(Mutex::new(None)),
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::new(MockBehavior::Replying(reply.into()))
    }

    /// Answer from `answers` in order
    pub fn scripted<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new(MockBehavior::Scripted);
        provider.script.lock().extend(answers.into_iter().map(Into::into));
        provider
    }

    /// Fail every `fail_every`th request, answer `reply` otherwise
    pub fn intermittent(fail_every: usize, reply: impl Into<String>) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
            reply: reply.into(),
        })
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Fail the credential check
    pub fn missing_credentials() -> Self {
        Self::new(MockBehavior::MissingCredentials)
    }

    /// Number of completion calls made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Conversations received so far
    pub fn received(&self) -> Vec<Vec<ChatMessage>> {
        self.received.lock().clone()
    }

    /// Build an operation batch answer from `(type, parameters)` pairs
    pub fn operations_reply(operations: &[(&str, serde_json::Value)]) -> String {
        let operations: Vec<serde_json::Value> = operations
            .iter()
            .map(|(op_type, parameters)| {
                serde_json::json!({ "type": op_type, "parameters": parameters })
            })
            .collect();
        serde_json::json!({ "operations": operations }).to_string()
    }
}

impl Clone for MockChatProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            script: Arc::clone(&self.script),
            last_answer: Arc::clone(&self.last_answer),
            request_count: Arc::clone(&self.request_count),
            received: Arc::clone(&self.received),
        }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn ensure_credentials(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::MissingCredentials => Err(ProviderError::AuthenticationError(
                "Mock API key is not configured".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(messages.to_vec());

        match &self.behavior {
            MockBehavior::Replying(reply) => Ok(reply.clone()),

            MockBehavior::Scripted => {
                let next = self.script.lock().pop_front();
                match next {
                    Some(answer) => {
                        *self.last_answer.lock() = Some(answer.clone());
                        Ok(answer)
                    }
                    None => self.last_answer.lock().clone().ok_or_else(|| {
                        ProviderError::RequestFailed("Mock script is empty".to_string())
                    }),
                }
            }

            MockBehavior::Intermittent { fail_every, reply } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(reply.clone())
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::MissingCredentials => Err(ProviderError::AuthenticationError(
                "Mock API key is not configured".to_string(),
            )),
        }
    }
}

/// One recorded synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCall {
    /// Text sent to the provider
    pub text: String,
    /// Voice requested
    pub voice: String,
}

/// Mock speech provider that records calls and returns deterministic audio
#[derive(Debug, Clone, Default)]
pub struct MockSpeechProvider {
    /// Calls received, in order
    calls: Arc<Mutex<Vec<SpeechCall>>>,
    /// Prefix every answer with an ID3v2 tag
    with_id3: bool,
    /// Always fail
    failing: bool,
}

impl MockSpeechProvider {
    /// Create a provider that answers every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose answers start with an ID3v2 tag
    pub fn with_id3_tags() -> Self {
        Self {
            with_id3: true,
            ..Self::default()
        }
    }

    /// Create a provider that always fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<SpeechCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Fake audio payload for a chunk, without any tag
    pub fn audio_for(text: &str, voice: &str) -> Vec<u8> {
        format!("<{}:{}>", voice, text).into_bytes()
    }

    /// A minimal ID3v2 tag with a 4 byte body
    pub fn id3_tag() -> Vec<u8> {
        let mut tag = b"ID3".to_vec();
        tag.extend_from_slice(&[4, 0, 0, 0, 0, 0, 4]);
        tag.extend_from_slice(b"TAGS");
        tag
    }
}

#[async_trait]
impl SpeechProvider for MockSpeechProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ProviderError> {
        self.calls.lock().push(SpeechCall {
            text: text.to_string(),
            voice: voice.to_string(),
        });

        if self.failing {
            return Err(ProviderError::ApiError {
                message: "Simulated speech failure".to_string(),
                status_code: 500,
            });
        }

        let mut audio = if self.with_id3 { Self::id3_tag() } else { Vec::new() };
        audio.extend(Self::audio_for(text, voice));
        Ok(audio)
    }
}
