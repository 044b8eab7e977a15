//! Message and response types shared by every chat backend.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the conversation.
    System,
    /// The human side.
    User,
    /// The model side.
    Assistant,
}

impl ChatRole {
    /// Wire name used by OpenAI-compatible and Ollama APIs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Generation options for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 1000,
        }
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// A chat completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated text; the only field the game reads.
    pub content: String,
    /// Token accounting, when the backend reports it.
    pub usage: Option<TokenUsage>,
    /// Which model answered.
    pub model: String,
    /// Round-trip latency in milliseconds.
    pub latency_ms: u64,
}

impl ChatResponse {
    /// A response carrying only text.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(ChatMessage::system("設定").role, ChatRole::System);
        assert_eq!(ChatMessage::user("こんにちは").role, ChatRole::User);
    }

    #[test]
    fn roles_serialize_to_wire_names() {
        let json = serde_json::to_string(&ChatMessage::user("やあ")).expect("serialize");
        assert_eq!(json, r#"{"role":"user","content":"やあ"}"#);
        let role: ChatRole = serde_json::from_str(r#""assistant""#).expect("deserialize");
        assert_eq!(role.as_str(), "assistant");
    }
}
