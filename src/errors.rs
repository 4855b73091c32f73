/*!
 * Error types for the ibut application.
 *
 * The alignment engine itself has no error type: generation failures travel
 * through it as marker text. These types cover the layers around it
 * (provider transports, language resolution, batch files, configuration),
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

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but produced no text
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Server-side (5xx) failures, connection problems and rate limits are
    /// transient; client errors and authentication failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::ParseError(_) | Self::AuthenticationError(_) | Self::EmptyResponse => false,
        }
    }

    /// Map an HTTP status and body to the matching error variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while resolving language codes and directions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    /// The code is not a known ISO 639-1/639-2 code
    #[error("Invalid language code: {0}")]
    InvalidCode(String),

    /// The direction string is not of the form `src-tgt`
    #[error("Malformed language direction '{0}', expected e.g. 'zh-en'")]
    MalformedDirection(String),
}

/// Errors raised by the batch driver
#[derive(Error, Debug)]
pub enum BatchError {
    /// Reading the input or writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized
    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord {
        /// 1-based line number in the input
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Parallel references only pair with line input
    #[error("A reference file can only be used with line input, not JSONL")]
    ReferenceWithJsonl,
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

    /// Error resolving languages
    #[error("Language error: {0}")]
    Language(#[from] LanguageError),

    /// Error from batch processing
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
