use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};

use crate::error::GigaChatError;

/// Default OAuth endpoint that issues access tokens
pub const GIGACHAT_DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
/// Default GigaChat API base URL
pub const GIGACHAT_DEFAULT_BASE: &str = "https://gigachat.devices.sberbank.ru/api/v1";
/// Default token scope (personal API access)
pub const GIGACHAT_DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";
/// Default chat model
pub const GIGACHAT_DEFAULT_MODEL: &str = "GigaChat";
/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default margin subtracted from a credential's expiry before it is considered stale
pub const DEFAULT_TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(5);

/// How server certificates are verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVerification {
    /// Full certificate chain and hostname validation
    #[default]
    Full,
    /// Accept any certificate and hostname. Only exists with the
    /// `danger-dev-tls` feature; never use against production endpoints.
    #[cfg(feature = "danger-dev-tls")]
    DangerAcceptInvalidCerts,
}

/// Configuration for the GigaChat client
///
/// Built once and handed to [`Client::with_config`](crate::Client::with_config);
/// it is not mutated afterwards. Debug output redacts `credentials` via
/// [`SecretString`].
#[derive(Clone, Debug)]
pub struct GigaChatConfig {
    auth_url: String,
    api_base: String,
    credentials: Option<SecretString>,
    scope: String,
    model: String,
    temperature: f32,
    token_safety_margin: Duration,
    connect_timeout: Duration,
    request_timeout: Duration,
    tls: TlsVerification,
    root_certificates: Vec<Vec<u8>>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            auth_url: env_nonempty("GIGACHAT_AUTH_URL")
                .unwrap_or_else(|| GIGACHAT_DEFAULT_AUTH_URL.into()),
            api_base: env_nonempty("GIGACHAT_BASE_URL")
                .unwrap_or_else(|| GIGACHAT_DEFAULT_BASE.into()),
            credentials: env_nonempty("GIGACHAT_CREDENTIALS").map(SecretString::from),
            scope: env_nonempty("GIGACHAT_SCOPE").unwrap_or_else(|| GIGACHAT_DEFAULT_SCOPE.into()),
            model: env_nonempty("GIGACHAT_MODEL").unwrap_or_else(|| GIGACHAT_DEFAULT_MODEL.into()),
            temperature: DEFAULT_TEMPERATURE,
            token_safety_margin: DEFAULT_TOKEN_SAFETY_MARGIN,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            tls: TlsVerification::Full,
            root_certificates: Vec::new(),
        }
    }
}

impl GigaChatConfig {
    /// Creates a new configuration with default settings
    ///
    /// Attempts to read from environment variables:
    /// - `GIGACHAT_CREDENTIALS` for the pre-shared Basic authorization secret
    /// - `GIGACHAT_SCOPE` for the requested token scope (defaults to `GIGACHAT_API_PERS`)
    /// - `GIGACHAT_MODEL` for the chat model (defaults to `GigaChat`)
    /// - `GIGACHAT_BASE_URL` for a custom API base URL
    /// - `GIGACHAT_AUTH_URL` for a custom OAuth endpoint
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the OAuth endpoint URL
    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the pre-shared Basic authorization secret (already base64-encoded)
    #[must_use]
    pub fn with_credentials(mut self, secret: impl Into<String>) -> Self {
        self.credentials = Some(SecretString::from(secret.into()));
        self
    }

    /// Derives the Basic authorization secret from a client id and client secret
    #[must_use]
    pub fn with_client_credentials(self, client_id: &str, client_secret: &str) -> Self {
        let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
        self.with_credentials(encoded)
    }

    /// Sets the requested token scope
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the chat model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature used by [`Client::send_message`](crate::Client::send_message)
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets how long before expiry a cached credential is treated as stale
    #[must_use]
    pub const fn with_token_safety_margin(mut self, margin: Duration) -> Self {
        self.token_safety_margin = margin;
        self
    }

    /// Sets the connect timeout for every exchange
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the upper bound on a full request/response exchange
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the certificate verification mode
    #[must_use]
    pub const fn with_tls_verification(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Trusts an additional PEM-encoded root certificate (e.g. a private CA)
    #[must_use]
    pub fn with_root_certificate_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.root_certificates.push(pem.into());
        self
    }

    /// Returns the configured API base URL
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns the configured OAuth endpoint URL
    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Returns the requested token scope
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the chat model
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the sampling temperature
    #[must_use]
    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the credential safety margin
    #[must_use]
    pub const fn token_safety_margin(&self) -> Duration {
        self.token_safety_margin
    }

    /// Returns the connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the full-exchange timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the certificate verification mode
    #[must_use]
    pub const fn tls_verification(&self) -> TlsVerification {
        self.tls
    }

    /// Returns the extra PEM root certificates
    #[must_use]
    pub fn root_certificates(&self) -> &[Vec<u8>] {
        &self.root_certificates
    }

    /// Returns the trimmed Basic authorization secret, if one is configured
    pub(crate) fn credentials(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .map(|s| s.expose_secret().trim())
            .filter(|s| !s.is_empty())
    }

    /// Joins the API base with an endpoint path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    pub(crate) fn require_credentials(&self) -> Result<&str, GigaChatError> {
        self.credentials().ok_or_else(|| {
            GigaChatError::Config(
                "Missing GigaChat credentials: set GIGACHAT_CREDENTIALS environment variable"
                    .into(),
            )
        })
    }

    /// Validates that authentication credentials are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the Basic authorization secret is missing or blank.
    pub fn validate(&self) -> Result<(), GigaChatError> {
        self.require_credentials().map(|_| ())
    }
}
