//! OAuth token exchange.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::config::GigaChatConfig;
use crate::error::{self, GigaChatError};
use crate::token_cache::Credential;
use crate::transport::{HttpRequest, Transport};
use crate::types::auth::TokenResponse;

/// Header carrying the per-request correlation id (sent as `RqUID`; names are
/// case-insensitive and `HeaderName` requires lowercase)
pub const HDR_RQUID: &str = "rquid";

/// Something that can produce a fresh [`Credential`]
///
/// Implemented by [`Authenticator`]; [`TokenCache`](crate::TokenCache) is
/// generic over it.
pub trait TokenSource: Send + Sync + 'static {
    /// Performs one credential acquisition
    fn fetch(&self) -> impl Future<Output = Result<Credential, GigaChatError>> + Send;
}

/// Exchanges the pre-shared secret for a bearer token
///
/// Each [`fetch`](TokenSource::fetch) is exactly one request against the
/// configured OAuth endpoint. It does not cache anything.
pub struct Authenticator<T: Transport> {
    transport: Arc<T>,
    auth_url: String,
    scope: String,
    secret: SecretString,
}

impl<T: Transport> std::fmt::Debug for Authenticator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("auth_url", &self.auth_url)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Authenticator<T> {
    /// Creates an authenticator from the config's endpoint, scope and secret
    ///
    /// # Errors
    ///
    /// Returns [`GigaChatError::Config`] if no secret is configured.
    pub fn new(transport: Arc<T>, config: &GigaChatConfig) -> Result<Self, GigaChatError> {
        let secret = config.require_credentials()?;
        Ok(Self {
            transport,
            auth_url: config.auth_url().to_owned(),
            scope: config.scope().to_owned(),
            secret: SecretString::from(secret.to_owned()),
        })
    }

    fn build_request(&self) -> Result<HttpRequest, GigaChatError> {
        let mut headers = HeaderMap::new();
        let basic = HeaderValue::from_str(&format!("Basic {}", self.secret.expose_secret()))
            .map_err(|_| GigaChatError::Config("Invalid Authorization header value".into()))?;
        headers.insert(AUTHORIZATION, basic);
        headers.insert(
            HDR_RQUID,
            HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
                .map_err(|_| GigaChatError::Config("Invalid RqUID header value".into()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let body = serde_urlencoded::to_string([("scope", self.scope.as_str())])
            .map_err(|e| GigaChatError::Config(format!("Invalid scope: {e}")))?;

        Ok(HttpRequest {
            method: Method::POST,
            url: self.auth_url.clone(),
            headers,
            body: Bytes::from(body),
        })
    }

    async fn exchange(&self) -> Result<Credential, GigaChatError> {
        let request = self.build_request()?;
        tracing::debug!(url = %self.auth_url, "requesting access token");

        let response = self.transport.issue(request).await?;
        if !response.status.is_success() {
            tracing::warn!(status = response.status.as_u16(), "token exchange rejected");
            return Err(error::auth_error(response.status, &response.body));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| error::map_deser(&e, &response.body))?;
        let expires_at = token.expiry()?;

        tracing::info!(%expires_at, "obtained access token");
        Ok(Credential::new(token.access_token, expires_at))
    }
}

impl<T: Transport> TokenSource for Authenticator<T> {
    async fn fetch(&self) -> Result<Credential, GigaChatError> {
        self.exchange().await
    }
}
