//! Types for the OAuth token endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GigaChatError;

/// Success body of the OAuth token exchange
///
/// `expires_at` is an absolute instant in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Bearer token value
    #[serde(alias = "accessToken")]
    pub access_token: String,
    /// Expiry, epoch milliseconds
    #[serde(alias = "expiresAt")]
    pub expires_at: i64,
}

impl TokenResponse {
    /// Normalizes `expires_at` to a UTC instant
    ///
    /// # Errors
    ///
    /// Returns [`GigaChatError::Parse`] if the timestamp is out of range.
    pub fn expiry(&self) -> Result<DateTime<Utc>, GigaChatError> {
        DateTime::from_timestamp_millis(self.expires_at).ok_or_else(|| {
            GigaChatError::Parse(format!("expires_at out of range: {}", self.expires_at))
        })
    }
}
