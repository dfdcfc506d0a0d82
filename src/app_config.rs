use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Contents of `mdcraft.json`. Every section is optional in the file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Instruction-interpretation provider settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Speech synthesis settings
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Completion cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Maximum number of documents processed at once in project runs
    #[serde(default = "default_concurrent_files")]
    pub concurrent_files: usize,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Chat provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatProviderKind {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ChatProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }

    // @returns: Environment variable holding the API key, if the provider needs one
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama => None,
        }
    }
}

impl std::fmt::Display for ChatProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ChatProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Chat provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: ChatProviderKind,

    /// Model name; empty selects the provider default
    #[serde(default)]
    pub model: String,

    /// API key; empty falls back to the provider's environment variable
    #[serde(default)]
    pub api_key: String,

    /// Service URL; empty selects the provider default
    #[serde(default)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of tokens in an answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatProviderKind::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ChatConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        match self.provider {
            ChatProviderKind::OpenAI => default_openai_model(),
            ChatProviderKind::Anthropic => default_anthropic_model(),
            ChatProviderKind::Ollama => default_ollama_model(),
        }
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider {
            ChatProviderKind::OpenAI => crate::providers::openai::DEFAULT_ENDPOINT.to_string(),
            ChatProviderKind::Anthropic => crate::providers::anthropic::DEFAULT_ENDPOINT.to_string(),
            ChatProviderKind::Ollama => crate::providers::ollama::DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Get the API key, from the file or the provider's environment variable
    pub fn get_api_key(&self) -> String {
        let from_env = self
            .provider
            .api_key_env_var()
            .and_then(|name| std::env::var(name).ok());
        resolve_api_key(&self.api_key, from_env)
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// API key; empty falls back to `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: String,

    /// Service URL; empty selects the public OpenAI API
    #[serde(default)]
    pub endpoint: String,

    /// Speech model name
    #[serde(default = "default_speech_model")]
    pub model: String,

    /// Voice used when the document does not pick one
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Maximum characters per synthesis request
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Audio cache database; unset selects the per-user data directory
    #[serde(default)]
    pub cache_path: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            model: default_speech_model(),
            default_voice: default_voice(),
            chunk_chars: default_chunk_chars(),
            cache_path: None,
        }
    }
}

impl SpeechConfig {
    /// Get the API key, from the file or `OPENAI_API_KEY`
    pub fn get_api_key(&self) -> String {
        resolve_api_key(&self.api_key, std::env::var("OPENAI_API_KEY").ok())
    }

    /// Get the endpoint, defaulting to the public API
    pub fn get_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            crate::providers::openai::DEFAULT_ENDPOINT.to_string()
        } else {
            self.endpoint.clone()
        }
    }
}

/// Completion cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached completions
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Lifetime of a cached completion in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn resolve_api_key(configured: &str, from_env: Option<String>) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    from_env.unwrap_or_default()
}

fn default_concurrent_files() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_chunk_chars() -> usize {
    crate::speech::DEFAULT_CHUNK_CHARS
}

fn default_cache_capacity() -> usize {
    crate::completion::cache::DEFAULT_CAPACITY
}

fn default_cache_ttl_secs() -> u64 {
    crate::completion::cache::DEFAULT_TTL.as_secs()
}

impl Config {
    /// Load the configuration from `path`, writing a default one if the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [("chat", &self.chat.endpoint), ("speech", &self.speech.endpoint)] {
            if !endpoint.is_empty() {
                Url::parse(endpoint).with_context(|| format!("Invalid {} endpoint: {}", name, endpoint))?;
            }
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", self.chat.temperature));
        }
        if self.chat.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }
        if self.speech.chunk_chars == 0 {
            return Err(anyhow!("Speech chunk_chars must be greater than zero"));
        }
        if self.speech.default_voice.trim().is_empty() {
            return Err(anyhow!("Speech default_voice must not be empty"));
        }
        if self.cache.capacity == 0 {
            return Err(anyhow!("Completion cache capacity must be greater than zero"));
        }
        if self.concurrent_files == 0 {
            return Err(anyhow!("concurrent_files must be greater than zero"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chat: ChatConfig::default(),
            speech: SpeechConfig::default(),
            cache: CacheConfig::default(),
            concurrent_files: default_concurrent_files(),
            log_level: LogLevel::default(),
        }
    }
}
