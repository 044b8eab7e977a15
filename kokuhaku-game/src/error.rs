//! Error types for the orchestration layer.

use thiserror::Error;

use kokuhaku_core::CoreError;

use crate::session::Phase;

/// Errors a [`crate::GameSession`] can return to its caller.
///
/// Provider failures are absent on purpose: a failed model call becomes a
/// fallback reply inside the turn.
#[derive(Error, Debug)]
pub enum GameError {
    /// The operation is not allowed in the session's current phase.
    #[error("Cannot {operation} while the session is {phase}")]
    InvalidState {
        /// What was attempted.
        operation: &'static str,
        /// Phase the session was in.
        phase: Phase,
    },

    /// Roster lookup or configuration failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, GameError>;
