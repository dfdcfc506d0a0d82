/*!
 * OpenAI client for chat completions and text-to-speech.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    ChatMessage, ChatProvider, RetryPolicy, SpeechProvider, error_from_response, error_from_transport,
    join_url,
};
use crate::errors::ProviderError;

/// Default public API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// OpenAI client for interacting with the OpenAI API
#[derive(Debug, Clone)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
    /// Chat model
    model: String,
    /// Speech model
    speech_model: String,
    /// Maximum number of tokens to generate
    max_tokens: u32,
    /// Temperature for generation
    temperature: f32,
    /// Retry settings
    retry: RetryPolicy,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// The model to use
    model: &'a str,
    /// The conversation
    messages: &'a [ChatMessage],
    /// Maximum number of tokens to generate
    max_tokens: u32,
    /// Temperature for generation
    temperature: f32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated choices
    pub choices: Vec<ChatChoice>,
}

/// One generated choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatMessage,
}

/// Speech synthesis request
#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    /// The model to use
    model: &'a str,
    /// Text to speak
    input: &'a str,
    /// Voice name
    voice: &'a str,
    /// Output encoding
    response_format: &'a str,
}

impl OpenAI {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_timeout(api_key, endpoint, Duration::from_secs(120))
    }

    /// Create a new OpenAI client with an explicit request timeout
    pub fn with_timeout(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint
            },
            model: "gpt-4o".to_string(),
            speech_model: "tts-1".to_string(),
            max_tokens: 500,
            temperature: 0.0,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the chat model
    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.model = model;
        }
        self
    }

    /// Set the speech model
    pub fn speech_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() {
            self.speech_model = model;
        }
        self
    }

    /// Set the maximum number of tokens to generate
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn require_key(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::AuthenticationError(
                "OpenAI API key is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn send_chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(join_url(&self.endpoint, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| error_from_transport("OpenAI", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("OpenAI", response).await);
        }

        let body = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse OpenAI response: {}", e)))?;

        Self::extract_text_from_response(&body)
            .ok_or_else(|| ProviderError::ParseError("OpenAI response contained no choices".to_string()))
    }

    async fn send_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, ProviderError> {
        let request = SpeechRequest {
            model: &self.speech_model,
            input: text,
            voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(join_url(&self.endpoint, "audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| error_from_transport("OpenAI", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("OpenAI", response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to read audio body: {}", e)))?;
        Ok(bytes.to_vec())
    }

    /// Extract text from a chat completion response
    pub fn extract_text_from_response(response: &ChatCompletionResponse) -> Option<String> {
        response.choices.first().map(|c| c.message.content.clone())
    }
}

#[async_trait]
impl ChatProvider for OpenAI {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn ensure_credentials(&self) -> Result<(), ProviderError> {
        self.require_key()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.require_key()?;
        debug!("OpenAI chat request: model={}, messages={}", self.model, messages.len());
        self.retry.run("OpenAI", || self.send_chat(messages)).await
    }
}

#[async_trait]
impl SpeechProvider for OpenAI {
    fn name(&self) -> &str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ProviderError> {
        self.require_key()?;
        debug!("OpenAI speech request: voice={}, chars={}", voice, text.chars().count());
        self.retry.run("OpenAI", || self.send_speech(text, voice)).await
    }
}
