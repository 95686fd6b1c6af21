//! Generation port: LLM-backed answer synthesis.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System-level instructions.
    System,
    /// The end user.
    User,
    /// The model's own prior turns.
    Assistant,
}

impl ChatRole {
    /// Wire-format role string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One message in a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: ChatRole,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// One generation call.
///
/// Sampling parameters are explicit here: adapters must not substitute
/// their own defaults.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System-level instructions sent ahead of the conversation.
    pub system_prompt: String,
    /// Conversation history ending with the augmented user prompt.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// A provider that produces an answer from a prompt and conversation
/// history.
///
/// The query use case owns prompt construction, including the delimiting
/// of retrieved context as labeled data blocks; adapters only transport
/// the request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Return the identifier of the underlying generation model.
    fn model_name(&self) -> &str;
}
