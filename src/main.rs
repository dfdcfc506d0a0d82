// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;

use mdcraft::app_config::{ChatProviderKind, Config, LogLevel};
use mdcraft::app_controller::{Controller, FileReport};
use mdcraft::completion::CommandMode;
use mdcraft::errors::AppError;

/// CLI Wrapper for ChatProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    OpenAI,
    Anthropic,
    Ollama,
}

impl From<CliProvider> for ChatProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::OpenAI => ChatProviderKind::OpenAI,
            CliProvider::Anthropic => ChatProviderKind::Anthropic,
            CliProvider::Ollama => ChatProviderKind::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for CommandMode to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Operations,
    FreeForm,
}

impl From<CliMode> for CommandMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Operations => CommandMode::Operations,
            CliMode::FreeForm => CommandMode::FreeForm,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a natural-language command to a document or every document in a directory
    Apply {
        /// Markdown file or project directory
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// The instruction, e.g. "Emphasize the word 'important'"
        #[arg(short, long)]
        command: String,

        /// How the instruction is interpreted
        #[arg(long, value_enum, default_value = "operations")]
        mode: CliMode,
    },

    /// Apply table of contents and heading numbering as configured in the front matter
    Template {
        /// Markdown file or project directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Inspect or maintain the speech cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completions for mdcraft
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show entry count, hits and size
    Stats,
    /// Remove every cached audio chunk
    Clear,
    /// Remove chunks not used for a number of days
    Purge {
        /// Age threshold in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

/// mdcraft - natural-language editing for Markdown documents
///
/// Sends an instruction and the document to a language model, applies the
/// returned operations to the document tree and writes the result back,
/// together with any exported .docx / .mp3 files.
#[derive(Parser, Debug)]
#[command(name = "mdcraft")]
#[command(version)]
#[command(about = "Restructure and restyle Markdown documents with AI")]
#[command(long_about = "mdcraft applies natural-language commands to Markdown documents.

EXAMPLES:
    mdcraft apply notes.md -c \"Change the heading 'Intro' to 'Overview'\"
    mdcraft apply docs/ -c \"Add heading numbers\"        # Every .md file in docs/
    mdcraft apply notes.md -c \"Export to mp3\" --dry-run  # Show what would change
    mdcraft apply notes.md -c \"Make it shorter\" --mode free-form
    mdcraft template notes.md                            # Apply toc/numbering front matter
    mdcraft cache purge --days 7
    mdcraft completions bash > mdcraft.bash

CONFIGURATION:
    Configuration is stored in mdcraft.json by default. If the file doesn't
    exist, a default one is created. API keys may also be provided through
    OPENAI_API_KEY and ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, global = true, default_value = "mdcraft.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Chat provider to use
    #[arg(short, long, global = true, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Do not write any file
    #[arg(long, global = true)]
    dry_run: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The effective level is adjusted through set_max_level once the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: CommandLineOptions) -> Result<(), AppError> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "mdcraft", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Apply { path, command, mode } => {
            let mode: CommandMode = mode.into();
            if path.is_file() {
                let report = controller.apply_command_to_file(&path, &command, mode, dry_run).await?;
                print_file_report(&report);
            } else if path.is_dir() {
                let report = controller.apply_command_to_project(&path, &command, mode, dry_run).await?;
                report.processed.iter().for_each(print_file_report);
                if !report.failed.is_empty() {
                    return Err(AppError::Unknown(format!("{} file(s) failed", report.failed.len())));
                }
            } else {
                return Err(AppError::File(format!("Input path does not exist: {:?}", path)));
            }
        }
        Commands::Template { path } => {
            let files = if path.is_dir() {
                mdcraft::file_utils::FileManager::find_markdown_files(&path)?
            } else if path.is_file() {
                vec![path.clone()]
            } else {
                return Err(AppError::File(format!("Input path does not exist: {:?}", path)));
            };
            for file in files {
                let modified = controller.process_template_file(&file, dry_run)?;
                info!("{}: {}", file.display(), if modified { "updated" } else { "unchanged" });
            }
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                let stats = controller.speech_cache_stats().await?;
                info!(
                    "Speech cache: {} chunk(s), {} hit(s), {} bytes",
                    stats.total_entries, stats.total_hits, stats.total_bytes
                );
            }
            CacheAction::Clear => {
                controller.clear_speech_cache().await?;
            }
            CacheAction::Purge { days } => {
                if days < 0 {
                    return Err(AppError::Unknown("--days must not be negative".to_string()));
                }
                controller.purge_speech_cache(days).await?;
            }
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config)?;

    if let Some(provider) = &cli.provider {
        config.chat.provider = provider.clone().into();
    }
    if let Some(model) = &cli.model {
        config.chat.model = model.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    info!("Using {} ({})", config.chat.provider.display_name(), config.chat.get_model());
    Ok(config)
}

fn print_file_report(report: &FileReport) {
    let status = match (report.modified, report.written) {
        (true, true) => "updated",
        (true, false) => "would change",
        (false, _) => "unchanged",
    };
    info!("{}: {}", report.path.display(), status);
    for artifact in &report.artifacts {
        info!("  wrote {}", artifact.display());
    }
    for failure in &report.failures {
        warn!("  operation #{} {} failed: {}", failure.index + 1, failure.operation, failure.message);
    }
}
