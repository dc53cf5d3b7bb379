//! API resource implementations for the GigaChat client

/// Chat completions API resource
pub mod chat;
/// Models API resource
pub mod models;

pub use chat::Chat;
pub use models::Models;
