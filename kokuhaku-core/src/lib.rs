//! # Kokuhaku Core Library
//!
//! Game-agnostic conversational state machine for a confession game: a user
//! chats with a scripted character whose feelings evolve turn by turn, until
//! a confession either lands or fails.
//!
//! Every character keeps a five-axis [`EmotionVector`]:
//!
//! - **Mood** — momentary feeling, the only signed axis
//! - **Trust** — how much the user is believed
//! - **Tension** — nervousness; too much blocks a confession
//! - **Affection** — romantic fondness, what a confession is judged on
//! - **Interest** — curiosity about the user
//!
//! Each turn combines two influences into one [`EmotionDelta`]: keyword
//! reactions to the user's words ([`topic`]) and tags the language model
//! embeds in its reply ([`interpret`]). The [`emotion`] engine applies the
//! merged delta through the character's temperament and derives a
//! [`RelationshipStage`].
//!
//! ## Purity
//!
//! Nothing in this crate performs I/O apart from loading configuration
//! files. Randomness is always drawn from a caller-supplied `rand::Rng`, so
//! every operation is reproducible under a seeded generator.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod character;
pub mod config;
pub mod emotion;
pub mod error;
pub mod interpret;
pub mod ledger;
pub mod prompt;
pub mod repetition;
pub mod topic;
pub mod types;

pub use character::{CharacterProfile, EmotionalProfile, Roster, TopicReaction, TopicRouting};
pub use config::GameConfig;
pub use error::{CoreError, Result};
pub use interpret::Interpretation;
pub use ledger::{ConversationEntry, ConversationLedger, ConversationStats, FlowAnalysis};
pub use prompt::PromptContext;
pub use repetition::Repetition;
pub use topic::{TopicCatalogue, TopicScore};
pub use types::{Axis, Difficulty, EmotionDelta, EmotionVector, RelationshipStage};
