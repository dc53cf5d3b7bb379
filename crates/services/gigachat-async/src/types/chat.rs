//! Types for the `/chat/completions` endpoint (non-streaming)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions that steer the assistant
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a message with the given role
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

const fn default_temperature() -> f32 {
    crate::config::DEFAULT_TEMPERATURE
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Streaming is not supported; always `false`
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Creates a request with the default temperature and no token limit
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            stream: false,
        }
    }

    /// Set the sampling temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token limit
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// One candidate completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    /// Generated message
    pub message: ChatMessage,
    /// Why generation stopped (`"stop"`, `"length"`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Position of this choice
    pub index: u32,
}

/// Token accounting for a completion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u64,
    /// Tokens generated
    pub completion_tokens: u64,
    /// Sum of the two
    pub total_tokens: u64,
}

/// Response from `POST /chat/completions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// Candidate completions
    pub choices: Vec<Choice>,
    /// Creation time (epoch seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    /// Model that produced the response
    pub model: String,
    /// Token accounting, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Text of the first choice, if any
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
