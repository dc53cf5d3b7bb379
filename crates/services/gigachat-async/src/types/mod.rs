//! Request and response types for the GigaChat API

/// OAuth token exchange types
pub mod auth;
/// Chat completion types
pub mod chat;
/// Model listing types
pub mod models;

pub use auth::TokenResponse;
pub use chat::{ChatMessage, ChatRequest, ChatResponse, Choice, Role, Usage};
pub use models::{Model, ModelsListResponse};
