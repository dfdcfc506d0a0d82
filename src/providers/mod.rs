/*!
 * Provider implementations for the external language and speech services.
 *
 * This module contains client implementations for:
 * - OpenAI: chat completions and text-to-speech
 * - Anthropic: chat through the messages API
 * - Ollama: local chat server
 * - Mock: scripted providers used by the test suite
 */

use async_trait::async_trait;
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// System instruction message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Common trait for chat completion providers
///
/// Implementations turn a role-tagged conversation into free-form text.
#[async_trait]
pub trait ChatProvider: Send + Sync + Debug {
    /// Short provider identifier used in logs
    fn name(&self) -> &str;

    /// Model the provider sends requests to
    fn model(&self) -> &str;

    /// Fail fast when the provider needs credentials it does not have
    fn ensure_credentials(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Complete a conversation
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}

/// Common trait for text-to-speech providers
#[async_trait]
pub trait SpeechProvider: Send + Sync + Debug {
    /// Short provider identifier used in logs
    fn name(&self) -> &str;

    /// Synthesize `text` with `voice`, returning encoded audio bytes
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Retry settings shared by the HTTP providers
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Base backoff time in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based), with up to 25% jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16));
        let jitter = if base >= 4 {
            rand::rng().random_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts
    pub async fn run<T, F, Fut>(&self, provider: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} request failed: {} - attempt {}/{}",
                        provider,
                        e,
                        attempt,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Whether another attempt could succeed
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded(_) => true,
        ProviderError::ApiError { status_code, .. } => *status_code >= 500,
        _ => false,
    }
}

/// Map a failed HTTP response to a typed provider error
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());

    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(format!("{}: {}", provider, message)),
        429 => ProviderError::RateLimitExceeded(format!("{}: {}", provider, message)),
        code => ProviderError::ApiError {
            status_code: code,
            message: format!("{}: {}", provider, message),
        },
    }
}

/// Map a transport failure to a typed provider error
pub(crate) fn error_from_transport(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        ProviderError::ConnectionError(format!("Failed to send request to {}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, error))
    }
}

/// Join an endpoint base and a path without doubling slashes
pub(crate) fn join_url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
}
