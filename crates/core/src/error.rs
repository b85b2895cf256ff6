//! Error types for the Tasksmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Tasksmith operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- History errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Library errors ---
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    // --- Runner errors ---
    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Invalid unit name '{0}': no filesystem-safe characters left")]
    InvalidName(String),

    #[error("Unit not found: {0}")]
    NotFound(String),

    #[error("Malformed metadata for {stem}: {reason}")]
    MalformedMetadata { stem: String, reason: String },

    #[error("I/O failure on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Partial removal of {stem}: {reason}")]
    PartialRemoval { stem: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    #[error("source is empty")]
    EmptySource,

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("entry point `{0}` is not defined")]
    MissingEntryPoint(String),

    #[error("failed to load unit: {0}")]
    Load(String),

    #[error("execution error: {0}")]
    Invocation(String),

    #[error("unit did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("failed to start interpreter `{interpreter}`: {reason}")]
    Spawn { interpreter: String, reason: String },
}
