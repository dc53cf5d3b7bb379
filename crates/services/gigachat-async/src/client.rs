use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::auth::Authenticator;
use crate::config::GigaChatConfig;
use crate::error::{self, GigaChatError};
use crate::token_cache::{Credential, TokenCache};
use crate::transport::{HttpRequest, HttpTransport, Transport};
use crate::types::chat::{ChatMessage, ChatRequest, ChatResponse};

/// Header carrying a per-request correlation id on API calls
pub const HDR_X_REQUEST_ID: &str = "x-request-id";

/// Outcome of one authorized exchange
enum Attempt {
    Success(Bytes),
    Unauthorized(GigaChatError),
}

/// GigaChat API client
///
/// Owns the credential cache: clones share it, so a process needs only one
/// client. Every request goes through the same policy: get a valid bearer
/// token, send, and on HTTP 401 invalidate the token and try exactly once more.
pub struct Client<T: Transport = HttpTransport> {
    transport: Arc<T>,
    tokens: Arc<TokenCache<Authenticator<T>>>,
    config: Arc<GigaChatConfig>,
    transient_retry: Option<ExponentialBuilder>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            tokens: Arc::clone(&self.tokens),
            config: Arc::clone(&self.config),
            transient_retry: self.transient_retry,
        }
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("transient_retry", &self.transient_retry.is_some())
            .finish_non_exhaustive()
    }
}

impl Client<HttpTransport> {
    /// Creates a new client with default configuration
    ///
    /// Uses environment variables, see [`GigaChatConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns [`GigaChatError::Config`] if credentials are missing or the
    /// HTTP client cannot be built.
    pub fn new() -> Result<Self, GigaChatError> {
        Self::with_config(GigaChatConfig::new())
    }

    /// Creates a new client with the given configuration and a reqwest transport
    ///
    /// # Errors
    ///
    /// Returns [`GigaChatError::Config`] if credentials are missing or the
    /// HTTP client cannot be built.
    pub fn with_config(config: GigaChatConfig) -> Result<Self, GigaChatError> {
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a new client that sends everything through `transport`
    ///
    /// # Errors
    ///
    /// Returns [`GigaChatError::Config`] if credentials are missing.
    pub fn with_transport(config: GigaChatConfig, transport: T) -> Result<Self, GigaChatError> {
        let transport = Arc::new(transport);
        let authenticator = Authenticator::new(Arc::clone(&transport), &config)?;
        let tokens = TokenCache::new(authenticator, config.token_safety_margin());
        Ok(Self {
            transport,
            tokens: Arc::new(tokens),
            config: Arc::new(config),
            transient_retry: None,
        })
    }

    /// Retries transient failures (408, 409, 429, 5xx, connect and timeout
    /// errors) with the given backoff
    ///
    /// Off by default. The single refresh-and-retry after a 401 is spent once
    /// per call, across all backoff attempts; authorization failures are never
    /// retried by this layer.
    #[must_use]
    pub const fn with_transient_retry(mut self, backoff: ExponentialBuilder) -> Self {
        self.transient_retry = Some(backoff);
        self
    }

    /// Returns a reference to the client's configuration
    #[must_use]
    pub fn config(&self) -> &GigaChatConfig {
        &self.config
    }

    /// Returns the credential cache shared by this client and its clones
    #[must_use]
    pub fn tokens(&self) -> &TokenCache<Authenticator<T>> {
        &self.tokens
    }

    /// Sends a conversation and returns the model's reply
    ///
    /// Model and temperature come from the configuration.
    ///
    /// # Errors
    ///
    /// - [`GigaChatError::Auth`] if no credential can be obtained, or the
    ///   chat endpoint answers 401 twice
    /// - [`GigaChatError::Api`] for any other non-success status
    /// - [`GigaChatError::Transport`] if no response was obtained
    /// - [`GigaChatError::Parse`] if the success body is malformed
    pub async fn send_message(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> Result<ChatResponse, GigaChatError> {
        let req = ChatRequest::new(self.config.model(), messages)
            .with_temperature(self.config.temperature())
            .with_max_tokens(max_tokens);
        self.chat().create(req).await
    }

    pub(crate) async fn get<O: DeserializeOwned>(&self, path: &str) -> Result<O, GigaChatError> {
        let url = self.config.url(path);
        let mk = |credential: &Credential| {
            Self::authorized_request(Method::GET, &url, credential, None)
        };
        self.execute(mk).await
    }

    pub(crate) async fn post<I, O>(&self, path: &str, body: &I) -> Result<O, GigaChatError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        let url = self.config.url(path);
        let body = Bytes::from(
            serde_json::to_vec(body).map_err(|e| GigaChatError::Parse(e.to_string()))?,
        );
        let mk = |credential: &Credential| {
            Self::authorized_request(Method::POST, &url, credential, Some(body.clone()))
        };
        self.execute(mk).await
    }

    fn authorized_request(
        method: Method,
        url: &str,
        credential: &Credential,
        body: Option<Bytes>,
    ) -> Result<HttpRequest, GigaChatError> {
        let mut headers = HeaderMap::new();

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credential.token()))
            .map_err(|_| GigaChatError::Parse("access token is not a valid header value".into()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HDR_X_REQUEST_ID,
            HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
                .map_err(|_| GigaChatError::Config("Invalid request id header value".into()))?,
        );
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(HttpRequest {
            method,
            url: url.to_owned(),
            headers,
            body: body.unwrap_or_default(),
        })
    }

    async fn execute<O, M>(&self, mk: M) -> Result<O, GigaChatError>
    where
        O: DeserializeOwned,
        M: Fn(&Credential) -> Result<HttpRequest, GigaChatError> + Sync,
    {
        // One refresh-and-retry per call, shared by every transient retry
        let refreshed = AtomicBool::new(false);
        let bytes = match self.transient_retry {
            None => self.execute_authorized(&mk, &refreshed).await?,
            Some(backoff) => {
                (|| self.execute_authorized(&mk, &refreshed))
                    .retry(backoff)
                    .when(GigaChatError::is_retryable)
                    .notify(|err: &GigaChatError, dur: std::time::Duration| {
                        tracing::warn!(error = %err, delay = ?dur, "transient failure, retrying");
                    })
                    .await?
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| error::map_deser(&e, &bytes))
    }

    /// Sends until success, a non-401 failure, or a 401 after the refresh was spent
    async fn execute_authorized<M>(
        &self,
        mk: &M,
        refreshed: &AtomicBool,
    ) -> Result<Bytes, GigaChatError>
    where
        M: Fn(&Credential) -> Result<HttpRequest, GigaChatError> + Sync,
    {
        loop {
            match self.attempt(mk).await? {
                Attempt::Success(body) => return Ok(body),
                Attempt::Unauthorized(err) => {
                    self.tokens.invalidate();
                    if refreshed.swap(true, Ordering::SeqCst) {
                        return Err(err);
                    }
                    tracing::warn!("access token rejected; refreshing and retrying once");
                }
            }
        }
    }

    async fn attempt<M>(&self, mk: &M) -> Result<Attempt, GigaChatError>
    where
        M: Fn(&Credential) -> Result<HttpRequest, GigaChatError> + Sync,
    {
        let credential = self.tokens.get_valid_token().await?;
        let request = mk(&credential)?;
        tracing::debug!(method = %request.method, url = %request.url, "dispatching request");

        let response = self.transport.issue(request).await?;
        let status = response.status;
        if status.is_success() {
            return Ok(Attempt::Success(response.body));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthorized(error::auth_error(
                status,
                &response.body,
            )));
        }
        Err(error::api_error(status, &response.body))
    }
}
