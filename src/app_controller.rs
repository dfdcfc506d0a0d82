use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app_config::{ChatProviderKind, Config};
use crate::completion::{CommandMode, CompletionCache, CompletionCacheStats, CompletionService, build_prompt, strip_code_fences};
use crate::database::{CacheStats, DatabaseConnection, Repository};
use crate::document::{parse, serialize};
use crate::errors::CommandError;
use crate::file_utils::FileManager;
use crate::front_matter::{self, FrontMatter};
use crate::operations::generate_toc::generate_toc;
use crate::operations::heading_numbering::add_heading_numbering;
use crate::operations::{ArtifactKind, OperationBatch, OperationEngine, OperationFailure};
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::{ChatProvider, RetryPolicy, SpeechProvider};
use crate::row_markers::{attach_row_markers, lift_row_markers, strip_row_markers};
use crate::speech::{SpeechSynthesizer, SqliteAudioCache};

// @module: Application controller for document commands

/// New request identifier for log correlation
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Result of running one command against one document
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// Document text before the command
    pub original_content: String,
    /// Document text after the command, front matter included
    pub modified_content: String,
    /// How the command was interpreted
    pub mode: CommandMode,
    /// Names of the operations that ran, in order
    pub operations_applied: Vec<String>,
    /// Operation names the engine did not recognize
    pub unknown_operations: Vec<String>,
    /// Operations whose handler failed
    pub failures: Vec<OperationFailure>,
    /// Exported files, by kind
    #[serde(skip)]
    pub artifacts: HashMap<ArtifactKind, Vec<u8>>,
}

impl CommandResult {
    /// Whether the document text changed
    pub fn is_modified(&self) -> bool {
        self.original_content != self.modified_content
    }
}

/// What happened to one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Document path
    pub path: PathBuf,
    /// Whether the document text changed
    pub modified: bool,
    /// Whether the changes were written back
    pub written: bool,
    /// Artifact files written next to the document
    pub artifacts: Vec<PathBuf>,
    /// Operations whose handler failed
    pub failures: Vec<OperationFailure>,
}

/// Aggregate of a project-wide command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectReport {
    /// Files the command completed on
    pub processed: Vec<FileReport>,
    /// Files the command failed on, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Cached instruction interpretation
    completion: CompletionService,
    // @field: Operation engine with speech support
    engine: OperationEngine,
    // @field: Persistent audio chunk cache
    repository: Repository,
}

impl Controller {
    // @method: Create a controller with providers built from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let chat = Self::build_chat_provider(&config);

        let retry = Self::retry_policy(&config);
        let speech: Arc<dyn SpeechProvider> = Arc::new(
            OpenAI::with_timeout(
                config.speech.get_api_key(),
                config.speech.get_endpoint(),
                Duration::from_secs(config.chat.timeout_secs),
            )
            .speech_model(config.speech.model.clone())
            .retry(retry),
        );

        let connection = match &config.speech.cache_path {
            Some(path) => DatabaseConnection::new(path),
            None => DatabaseConnection::new_default(),
        }
        .context("Failed to open the speech cache database")?;

        Ok(Self::with_providers(config, chat, speech, Repository::new(connection)))
    }

    // @method: Create a controller around explicit providers and cache storage
    pub fn with_providers(
        config: Config,
        chat: Arc<dyn ChatProvider>,
        speech: Arc<dyn SpeechProvider>,
        repository: Repository,
    ) -> Self {
        let cache = CompletionCache::new(config.cache.capacity, Duration::from_secs(config.cache.ttl_secs));
        let completion = CompletionService::new(chat, cache);

        let synthesizer = SpeechSynthesizer::new(
            speech,
            Arc::new(SqliteAudioCache::new(repository.clone())),
            config.speech.default_voice.clone(),
        )
        .with_chunk_chars(config.speech.chunk_chars);

        Self {
            config,
            completion,
            engine: OperationEngine::with_synthesizer(Arc::new(synthesizer)),
            repository,
        }
    }

    fn retry_policy(config: &Config) -> RetryPolicy {
        RetryPolicy {
            max_retries: config.chat.retry_count,
            backoff_base_ms: config.chat.retry_backoff_ms,
        }
    }

    fn build_chat_provider(config: &Config) -> Arc<dyn ChatProvider> {
        let chat = &config.chat;
        let retry = Self::retry_policy(config);
        let timeout = Duration::from_secs(chat.timeout_secs);

        match chat.provider {
            ChatProviderKind::OpenAI => Arc::new(
                OpenAI::with_timeout(chat.get_api_key(), chat.get_endpoint(), timeout)
                    .model_name(chat.get_model())
                    .max_tokens(chat.max_tokens)
                    .temperature(chat.temperature)
                    .retry(retry),
            ),
            ChatProviderKind::Anthropic => Arc::new(
                Anthropic::new(chat.get_api_key(), chat.get_endpoint(), chat.get_model())
                    .max_tokens(chat.max_tokens)
                    .temperature(chat.temperature)
                    .retry(retry)
                    .timeout(timeout),
            ),
            ChatProviderKind::Ollama => Arc::new(
                Ollama::from_url(chat.get_endpoint(), chat.get_model())
                    .temperature(chat.temperature)
                    .retry(retry)
                    .timeout(timeout),
            ),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a natural-language command against a document's text
    pub async fn apply_command(
        &self,
        content: &str,
        command: &str,
        mode: CommandMode,
        request_id: &str,
    ) -> Result<CommandResult, CommandError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let decoded = front_matter::decode_lenient(content);
        info!(
            "[{}] Running {} command ({} chars, {} config key(s))",
            request_id,
            mode,
            decoded.body.len(),
            decoded.config.values().len()
        );

        let mut result = CommandResult {
            original_content: content.to_string(),
            modified_content: content.to_string(),
            mode,
            operations_applied: Vec::new(),
            unknown_operations: Vec::new(),
            failures: Vec::new(),
            artifacts: HashMap::new(),
        };

        let new_body = match mode {
            CommandMode::Operations => {
                let annotated = attach_row_markers(&decoded.body);
                let prompt = build_prompt(mode, command, &annotated);
                let completion = self.completion.get_or_compute(&prompt, request_id).await?;
                let batch = OperationBatch::parse(&strip_code_fences(&completion))?;
                debug!("[{}] Model proposed {} operation(s)", request_id, batch.operations.len());

                let mut tree = parse(&decoded.body);
                lift_row_markers(&mut tree);
                let outcome = self
                    .engine
                    .apply_operations(&mut tree, &batch.operations, &decoded.config, request_id)
                    .await;
                strip_row_markers(&mut tree);

                result.operations_applied = outcome.applied.iter().map(|kind| kind.name().to_string()).collect();
                result.unknown_operations = outcome.unknown;
                result.failures = outcome.failures;
                result.artifacts = outcome.artifacts;

                if result.operations_applied.iter().all(|name| is_export_name(name)) {
                    None
                } else {
                    Some(serialize(&tree))
                }
            }
            CommandMode::FreeForm => {
                let prompt = build_prompt(mode, command, &decoded.body);
                let completion = self.completion.get_or_compute(&prompt, request_id).await?;
                let body = strip_code_fences(&completion);
                if body.is_empty() {
                    return Err(CommandError::InvalidBatch("empty document returned".to_string()));
                }
                Some(format!("{}\n", body))
            }
        };

        if let Some(body) = new_body {
            result.modified_content = reattach(&decoded.config, &body, content);
        }

        info!(
            "[{}] Command finished: {} applied, {} unknown, {} failed, {} artifact(s)",
            request_id,
            result.operations_applied.len(),
            result.unknown_operations.len(),
            result.failures.len(),
            result.artifacts.len()
        );
        Ok(result)
    }

    /// Run a command on a file, write the result and any artifacts next to it
    pub async fn apply_command_to_file(
        &self,
        path: &Path,
        command: &str,
        mode: CommandMode,
        dry_run: bool,
    ) -> Result<FileReport> {
        let request_id = new_request_id();
        let content = FileManager::read_to_string(path)?;

        let result = self
            .apply_command(&content, command, mode, &request_id)
            .await
            .with_context(|| format!("Command failed for {}", path.display()))?;

        let modified = result.is_modified();
        let mut report = FileReport {
            path: path.to_path_buf(),
            modified,
            written: false,
            artifacts: Vec::new(),
            failures: result.failures.clone(),
        };

        if dry_run {
            info!("[{}] Dry run, nothing written for {}", request_id, path.display());
            return Ok(report);
        }

        if modified {
            FileManager::write_to_file(path, &result.modified_content)?;
            report.written = true;
            info!("[{}] Updated {}", request_id, path.display());
        }

        let mut artifacts: Vec<_> = result.artifacts.iter().collect();
        artifacts.sort_by_key(|(kind, _)| kind.key());
        for (kind, bytes) in artifacts {
            let artifact_path = FileManager::artifact_path(path, kind.extension());
            FileManager::write_bytes(&artifact_path, bytes)?;
            info!("[{}] Wrote {} ({} bytes)", request_id, artifact_path.display(), bytes.len());
            report.artifacts.push(artifact_path);
        }

        Ok(report)
    }

    /// Run a command on every Markdown file under `dir`
    pub async fn apply_command_to_project(
        &self,
        dir: &Path,
        command: &str,
        mode: CommandMode,
        dry_run: bool,
    ) -> Result<ProjectReport> {
        if !FileManager::dir_exists(dir) {
            return Err(anyhow!("Project directory does not exist: {:?}", dir));
        }

        let files = FileManager::find_markdown_files(dir)?;
        if files.is_empty() {
            warn!("No Markdown files found in {}", dir.display());
            return Ok(ProjectReport::default());
        }

        let start_time = std::time::Instant::now();
        let progress = ProgressBar::new(files.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));
        progress.set_message("Processing files");

        let results: Vec<(PathBuf, Result<FileReport>)> = stream::iter(files)
            .map(|file| {
                let progress = progress.clone();
                async move {
                    let outcome = self.apply_command_to_file(&file, command, mode, dry_run).await;
                    progress.inc(1);
                    (file, outcome)
                }
            })
            .buffer_unordered(self.config.concurrent_files.max(1))
            .collect()
            .await;

        progress.finish_with_message("Project processing complete");

        let mut report = ProjectReport::default();
        for (file, outcome) in results {
            match outcome {
                Ok(file_report) => report.processed.push(file_report),
                Err(e) => {
                    error!("Error processing file {}: {:#}", file.display(), e);
                    report.failed.push((file, format!("{:#}", e)));
                }
            }
        }
        report.processed.sort_by(|a, b| a.path.cmp(&b.path));
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));

        let summary = format!(
            "Project processing completed: {} processed, {} errors in {:.1}s",
            report.processed.len(),
            report.failed.len(),
            start_time.elapsed().as_secs_f64()
        );
        info!("{}", summary);

        if !report.failed.is_empty() && !dry_run {
            let log_path = dir.join("mdcraft.issues.log");
            let mut lines = vec![summary];
            lines.extend(report.failed.iter().map(|(file, reason)| format!("{}: {}", file.display(), reason)));
            if let Err(e) = FileManager::append_to_log_file(&log_path, &lines.join("\n")) {
                warn!("Failed to write project log: {}", e);
            }
        }

        Ok(report)
    }

    /// Apply the front-matter driven template steps without calling the model
    pub fn process_template(&self, content: &str, request_id: &str) -> String {
        let decoded = front_matter::decode_lenient(content);
        let (toc, numbering) = (decoded.config.toc(), decoded.config.numbering());
        if !toc && !numbering {
            debug!("[{}] Template has neither toc nor numbering enabled", request_id);
            return content.to_string();
        }

        // Numbers first, so the table of contents links to the numbered anchors
        let mut tree = parse(&decoded.body);
        if numbering {
            let numbered = add_heading_numbering(&mut tree);
            debug!("[{}] Numbered {} heading(s)", request_id, numbered);
        }
        if toc {
            let entries = generate_toc(&mut tree);
            debug!("[{}] Table of contents lists {} heading(s)", request_id, entries);
        }

        reattach(&decoded.config, &serialize(&tree), content)
    }

    /// Process a template file in place
    pub fn process_template_file(&self, path: &Path, dry_run: bool) -> Result<bool> {
        let request_id = new_request_id();
        let content = FileManager::read_to_string(path)?;
        let processed = self.process_template(&content, &request_id);

        let modified = processed != content;
        if modified && !dry_run {
            FileManager::write_to_file(path, &processed)?;
            info!("[{}] Updated template {}", request_id, path.display());
        }
        Ok(modified)
    }

    /// Completion cache counters for this process
    pub fn completion_cache_stats(&self) -> CompletionCacheStats {
        self.completion.cache().stats()
    }

    /// Persistent speech cache statistics
    pub async fn speech_cache_stats(&self) -> Result<CacheStats> {
        self.repository.get_cache_stats().await
    }

    /// Drop every cached audio chunk
    pub async fn clear_speech_cache(&self) -> Result<i64> {
        let removed = self.repository.clear_cache().await?;
        if removed > 0 {
            self.repository.connection().vacuum().await?;
        }
        info!("Removed {} cached audio chunk(s)", removed);
        Ok(removed)
    }

    /// Drop audio chunks not used for `days` days
    pub async fn purge_speech_cache(&self, days: i64) -> Result<i64> {
        let removed = self.repository.purge_older_than(days).await?;
        if removed > 0 {
            self.repository.connection().vacuum().await?;
        }
        info!("Purged {} cached audio chunk(s) older than {} day(s)", removed, days);
        Ok(removed)
    }
}

fn is_export_name(name: &str) -> bool {
    crate::operations::OperationKind::from_name(name).is_some_and(|kind| kind.is_export())
}

fn reattach(config: &FrontMatter, body: &str, original: &str) -> String {
    match front_matter::encode(config, body) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to re-encode front matter, keeping the original document: {}", e);
            original.to_string()
        }
    }
}
