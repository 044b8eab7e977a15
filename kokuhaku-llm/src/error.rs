//! Provider error types.

use thiserror::Error;

/// Errors a chat provider can report.
///
/// The orchestrator never lets these escape a turn; any of them turns the
/// turn into a fallback reply.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed or the backend answered with an error status.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the JSON shape the backend promises.
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// No backend is reachable or configured.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("All LLM retry attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error text from the final attempt.
        last_error: String,
    },

    /// Client was configured with unusable values.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ProviderError>;
