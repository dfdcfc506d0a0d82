/*!
 * Cached access to the chat provider.
 *
 * Requests are keyed by a digest of everything that determines the answer:
 * the system instructions, the prompt and the model. Only successful
 * completions are stored.
 */

use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use super::cache::CompletionCache;
use super::prompts::SYSTEM_PROMPT;
use crate::database::Repository;
use crate::errors::ProviderError;
use crate::providers::{ChatMessage, ChatProvider};

static OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(json|markdown|javascript)?[ \t]*\r?\n(?:(.*?)\r?\n)?```\s*$").unwrap());

/// Unwrap an answer the model put inside one outer code fence.
///
/// Fences inside the answer are content and stay. A fence without a language
/// only counts as a wrapper when no other fence line sits inside it.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(captures) = OUTER_FENCE.captures(trimmed) else {
        return trimmed.to_string();
    };
    let inner = captures.get(2).map_or("", |m| m.as_str());
    if captures.get(1).is_none() && inner.lines().any(|line| line.trim_start().starts_with("```")) {
        return trimmed.to_string();
    }
    inner.trim().to_string()
}

/// Chat provider fronted by a shared completion cache
#[derive(Debug, Clone)]
pub struct CompletionService {
    provider: Arc<dyn ChatProvider>,
    cache: CompletionCache,
    system_prompt: String,
}

impl CompletionService {
    /// Create a service using the default system instructions
    pub fn new(provider: Arc<dyn ChatProvider>, cache: CompletionCache) -> Self {
        Self {
            provider,
            cache,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the system instructions sent with every prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// The shared cache
    pub fn cache(&self) -> &CompletionCache {
        &self.cache
    }

    /// The underlying provider
    pub fn provider(&self) -> &dyn ChatProvider {
        self.provider.as_ref()
    }

    /// Cache key for a prompt under the current system instructions and model
    pub fn cache_key(&self, prompt: &str) -> String {
        let payload = serde_json::json!({
            "system": self.system_prompt,
            "prompt": prompt,
            "model": self.provider.model(),
        });
        Repository::hash_text(&payload.to_string())
    }

    /// Completion for `prompt`, served from the cache when possible
    pub async fn get_or_compute(&self, prompt: &str, request_id: &str) -> Result<String, ProviderError> {
        self.provider.ensure_credentials()?;

        let key = self.cache_key(prompt);
        if let Some(cached) = self.cache.get(&key) {
            info!("[{}] Completion cache hit", request_id);
            return Ok(cached);
        }

        debug!(
            "[{}] Completion cache miss, calling {} ({})",
            request_id,
            self.provider.name(),
            self.provider.model()
        );
        let messages = [ChatMessage::system(self.system_prompt.clone()), ChatMessage::user(prompt)];
        let completion = self.provider.complete(&messages).await?;

        self.cache.set(&key, &completion);
        info!("[{}] Received completion ({} chars)", request_id, completion.len());
        Ok(completion)
    }
}
