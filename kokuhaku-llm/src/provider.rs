//! The chat provider contract the game consumes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatMessage, ChatOptions, ChatResponse};

/// Anything that can turn a list of chat messages into a completion.
///
/// Implemented by [`crate::LlmClient`] for real backends and by scripted
/// providers in tests.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Run one chat completion.
    ///
    /// # Errors
    /// Returns a [`crate::ProviderError`] on transport, authentication, rate-limit,
    /// or decoding failures.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse>;
}
