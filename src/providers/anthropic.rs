use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatMessage, ChatProvider, RetryPolicy, error_from_response, error_from_transport, join_url};
use crate::errors::ProviderError;

/// Default public API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// Chat client for the Messages API
#[derive(Debug, Clone)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    /// Base URL, `DEFAULT_ENDPOINT` when configured empty
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    retry: RetryPolicy,
}

/// Body of `POST /v1/messages`
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    /// Instructions lifted out of the conversation; the API rejects a `system` role message
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

/// One user or assistant turn
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Reply envelope; only the content blocks are read
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContent>,
}

/// Content block. Non-text blocks (tool use, thinking) carry no `text`.
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Build a request from a role-tagged conversation.
    /// System messages move into the dedicated `system` field.
    pub fn from_messages(model: &str, max_tokens: u32, temperature: f32, messages: &[ChatMessage]) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();

        Self {
            model: model.to_string(),
            messages: messages
                .iter()
                .filter(|m| m.role != "system")
                .map(|m| AnthropicMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            temperature: Some(temperature),
            max_tokens,
        }
    }
}

impl Anthropic {
    /// Client with a 120s timeout and a 500 token reply budget
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: if endpoint.is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint
            },
            model: model.into(),
            max_tokens: 500,
            temperature: 0.0,
            retry: RetryPolicy::default(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Rebuilds the HTTP client; the other builder setters only swap a field.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder().timeout(timeout).build().unwrap_or_default();
        self
    }

    async fn send(&self, request: &AnthropicRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(join_url(&self.endpoint, "v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(request)
            .send()
            .await
            .map_err(|e| error_from_transport("Anthropic", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("Anthropic", response).await);
        }

        let body = response
            .json::<AnthropicResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Anthropic API response: {}", e)))?;

        Ok(Self::reply_text(&body))
    }

    /// Concatenated text blocks of a reply
    pub fn reply_text(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.block_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl ChatProvider for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn ensure_credentials(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::AuthenticationError(
                "Anthropic API key is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.ensure_credentials()?;
        let request = AnthropicRequest::from_messages(&self.model, self.max_tokens, self.temperature, messages);
        debug!("Anthropic request: model={}, messages={}", self.model, request.messages.len());
        self.retry.run("Anthropic", || self.send(&request)).await
    }
}
