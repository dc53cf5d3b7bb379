#![warn(missing_docs)]

//! # `gigachat-async`
//!
//! Async GigaChat API client with a cached, self-refreshing bearer credential.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gigachat_async::prelude::*;
//!
//! # async fn example() -> Result<(), gigachat_async::GigaChatError> {
//! let client = Client::with_config(GigaChatConfig::new().with_credentials("base64-secret"))?;
//!
//! let response = client
//!     .send_message(vec![ChatMessage::user("Hello!")], Some(256))
//!     .await?;
//! println!("{}", response.first_content().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! ## Authentication
//!
//! The pre-shared secret is exchanged for a bearer token on first use. The token
//! is cached until shortly before it expires; concurrent callers share a single
//! refresh. A 401 from the API invalidates the token and the request is retried
//! exactly once.

/// Token exchange against the OAuth endpoint
pub mod auth;
/// HTTP client implementation
pub mod client;
/// Configuration types for the client
pub mod config;
/// Error types
pub mod error;
/// API resource implementations
pub mod resources;
/// Optional transient retry policy
pub mod retry;
/// Test support utilities (for use in tests)
#[doc(hidden)]
pub mod test_support;
/// Cached credential with single-flight refresh
pub mod token_cache;
/// Request/response exchange abstraction
pub mod transport;
/// Request and response types
pub mod types;

pub use crate::auth::{Authenticator, TokenSource};
pub use crate::client::Client;
pub use crate::config::{GigaChatConfig, TlsVerification};
pub use crate::error::GigaChatError;
pub use crate::token_cache::{CacheStatus, Credential, TokenCache};
pub use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::{Client, GigaChatConfig, GigaChatError};
}
