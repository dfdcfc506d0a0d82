use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatMessage, ChatProvider, RetryPolicy, error_from_response, error_from_transport, join_url};
use crate::errors::ProviderError;

/// Default local server
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Chat client for a local or remote Ollama server
#[derive(Debug, Clone)]
pub struct Ollama {
    base_url: String,
    client: Client,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

/// `options` object of `/api/chat`
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Reply token limit; unset lets the model decide
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Body of `POST /api/chat`. Messages are forwarded as-is since Ollama
/// accepts the same role tags as the pipeline.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Always false; a streamed answer is still tolerated by `parse_chat_body`
    stream: bool,
}

/// One reply object, or one line of a streamed reply
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
}

/// Build a base URL from a host that may or may not carry a scheme and port
pub fn base_url_for(host: &str, port: u16) -> String {
    match host.split_once("://") {
        Some((scheme, rest)) if rest.contains(':') => format!("{}://{}", scheme, rest),
        Some((scheme, rest)) => format!("{}://{}:{}", scheme, rest.trim_end_matches('/'), port),
        None => format!("http://{}:{}", host, port),
    }
}

impl Ollama {
    /// Client for a full base URL such as `http://gpu.box:11434`
    pub fn from_url(url: impl Into<String>, model: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            base_url: if url.is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                url
            },
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            model: model.into(),
            temperature: 0.0,
            retry: RetryPolicy::default(),
        }
    }

    pub fn new(host: &str, port: u16, model: impl Into<String>) -> Self {
        Self::from_url(base_url_for(host, port), model)
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_default();
        self
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            options: Some(GenerationOptions {
                temperature: Some(self.temperature),
                num_predict: None,
            }),
            stream: false,
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| error_from_transport("Ollama", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("Ollama", response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to get response text from Ollama API: {}", e)))?;

        Self::parse_chat_body(&text)
    }

    /// Parse a chat body, accepting a single object or a JSONL stream
    pub fn parse_chat_body(body: &str) -> Result<String, ProviderError> {
        if let Ok(response) = serde_json::from_str::<ChatResponse>(body) {
            return Ok(response.message.content);
        }

        // A server that ignores `stream: false` answers with one object per line
        let mut content = String::new();
        let mut parsed_any = false;
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<ChatResponse>(line) {
                Ok(part) => {
                    parsed_any = true;
                    content.push_str(&part.message.content);
                }
                Err(e) => {
                    error!(
                        "Failed to parse Ollama API response line: {}. Raw (first 200 chars): {}",
                        e,
                        line.chars().take(200).collect::<String>()
                    );
                }
            }
        }

        if parsed_any {
            Ok(content)
        } else {
            Err(ProviderError::ParseError(
                "Ollama response contains invalid JSON".to_string(),
            ))
        }
    }
}

#[async_trait]
impl ChatProvider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        debug!("Ollama chat request: model={}, url={}", self.model, self.base_url);
        self.retry.run("Ollama", || self.send(messages)).await
    }
}
