//! Error types for the kokuhaku core library.

use thiserror::Error;

/// Top-level error type for all core operations.
///
/// Malformed emotion tags in model output are deliberately absent from this
/// enum: the interpreter ignores them instead of failing.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A difficulty name that does not map to any roster entry.
    #[error("Unknown difficulty: '{0}' (expected easy, medium or hard)")]
    UnknownDifficulty(String),

    /// A character profile that violates its invariants.
    #[error("Invalid character profile '{name}': {reason}")]
    InvalidProfile {
        /// Name of the offending character.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
