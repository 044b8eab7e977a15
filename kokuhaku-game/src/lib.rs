//! # kokuhaku-game — Orchestration for kokuhaku
//!
//! Wires the pure pieces of `kokuhaku-core` and a `kokuhaku-llm` chat
//! provider into a playable game:
//!
//! ```text
//! user text ─▶ topic + repetition ─▶ prompt ─▶ ChatProvider
//!                                                  │
//!   TurnOutcome ◀─ events ◀─ ledger ◀─ apply ◀─ interpret
//! ```
//!
//! ## Modules
//!
//! - `session` — [`GameSession`], the per-user turn state machine
//! - `registry` — [`SessionRegistry`], user id → session with idle eviction
//! - `events` — one-shot milestone events
//! - `fallback` — canned replies for provider failures and confessions
//! - `telemetry` — tracing subscriber setup

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod events;
pub mod fallback;
pub mod registry;
pub mod session;
pub mod telemetry;

pub use error::{GameError, Result};
pub use events::SpecialEvent;
pub use registry::{SessionRegistry, SessionSlot};
pub use session::{GameProgress, GameSession, Outcome, Phase, SessionSnapshot, TurnOutcome};
pub use telemetry::init_tracing;
