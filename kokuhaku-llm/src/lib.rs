//! # kokuhaku-llm — LLM Abstraction Layer for kokuhaku
//!
//! The game talks to language models through one narrow contract,
//! [`ChatProvider`]: send a list of role-tagged messages, get text back.
//! This crate defines that contract and ships an HTTP implementation for:
//!   - **Ollama** (local, `/api/chat`)
//!   - **OpenAI-compatible APIs** (`/v1/chat/completions`)
//!
//! All calls go through [`LlmClient`], which provides:
//!   - Per-request timeouts
//!   - Bounded retries on transport errors, 429 and 5xx
//!   - A `None` backend for running without any model

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::ProviderError;
pub use provider::ChatProvider;
pub use types::{ChatMessage, ChatOptions, ChatResponse, ChatRole, TokenUsage};
