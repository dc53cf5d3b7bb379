use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when using the GigaChat client
///
/// The error is `Clone` so one failed credential refresh can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum GigaChatError {
    /// No response was obtained: connect failure, timeout, TLS failure, or a
    /// broken body stream
    #[error("Transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// The authorization endpoint, or a bearer-protected endpoint, rejected
    /// the credential
    #[error("Authorization rejected (HTTP {status}): {body}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The API rejected the request for a reason other than authorization
    #[error("API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// A successful response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid configuration (e.g., missing credentials)
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GigaChatError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(Arc::new(e))
    }
}

impl GigaChatError {
    /// Returns the HTTP status code, if the error came from a response
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(_) | Self::Parse(_) | Self::Config(_) => None,
        }
    }

    /// True when the credential was rejected ("session expired, please retry")
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// True when no response was obtained ("check your connection")
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Determines if this error is worth retrying under a transient retry policy
    ///
    /// Retryable errors include rate limits (429), timeouts (408), conflicts
    /// (409), server errors (5xx), and connect/timeout transport failures.
    /// Authorization failures are never retryable here.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => crate::retry::is_retryable_status(*status),
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Auth { .. } | Self::Parse(_) | Self::Config(_) => false,
        }
    }
}

/// Maps a serde deserialization error to a `GigaChatError` with context
#[must_use]
pub fn map_deser(e: &serde_json::Error, body: &[u8]) -> GigaChatError {
    let snippet = String::from_utf8_lossy(&body[..body.len().min(400)]).to_string();
    GigaChatError::Parse(format!("{e}: {snippet}"))
}

/// Classifies a non-success response from a bearer-protected or auth endpoint
#[must_use]
pub fn auth_error(status: StatusCode, body: &[u8]) -> GigaChatError {
    GigaChatError::Auth {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

/// Classifies a non-success, non-authorization response
#[must_use]
pub fn api_error(status: StatusCode, body: &[u8]) -> GigaChatError {
    GigaChatError::Api {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
