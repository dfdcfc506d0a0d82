/*!
 * Error types for the mdcraft application.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication, including a missing API key
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors raised while decoding the configuration prologue of a document
#[derive(Error, Debug)]
pub enum FrontMatterError {
    /// The prologue was found but is not valid YAML
    #[error("Invalid YAML front matter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// The prologue parsed, but not to a key/value mapping
    #[error("Front matter must be a key/value mapping, found {0}")]
    NotAMapping(String),
}

/// Errors raised by a single operation handler
#[derive(Error, Debug)]
pub enum OperationError {
    /// Parameters were missing or had the wrong shape
    #[error("Invalid parameters for '{operation}': {message}")]
    InvalidParameters {
        /// Operation type name
        operation: String,
        /// Description of the problem
        message: String,
    },

    /// The document export failed
    #[error("Document export failed: {0}")]
    Export(String),

    /// The audio export failed
    #[error("Audio export failed: {0}")]
    Speech(#[from] SpeechError),

    /// The operation needs a collaborator the engine was built without
    #[error("Operation '{0}' is not available in this engine")]
    Unavailable(String),
}

/// Errors raised by the speech synthesis subsystem
#[derive(Error, Debug)]
pub enum SpeechError {
    /// A tagged speaker has no entry in the speaker map
    #[error("No TTS voice found for speaker: {0}")]
    UnknownSpeaker(String),

    /// The speaker map in the front matter is malformed
    #[error("Invalid speaker map: {0}")]
    InvalidSpeakerMap(String),

    /// There is nothing to synthesize
    #[error("Document has no speakable text")]
    NoContent,

    /// The external synthesis call failed
    #[error("Synthesis provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors that fail a whole command request
#[derive(Error, Debug)]
pub enum CommandError {
    /// The interpretation result was not a valid operation batch
    #[error("Invalid response format from AI service: {0}")]
    InvalidBatch(String),

    /// The instruction-interpretation call failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The command text was empty
    #[error("Command must not be empty")]
    EmptyCommand,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a command request
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Error from speech synthesis
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
