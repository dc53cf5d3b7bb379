//! Request/response exchange used by the authenticator and the chat client.
//!
//! [`Transport`] is the seam between this crate and the network. The default
//! implementation, [`HttpTransport`], wraps a `reqwest::Client`; tests and
//! embedders can supply their own.

use std::future::Future;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::config::{GigaChatConfig, TlsVerification};
use crate::error::GigaChatError;

/// A fully-built outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body (may be empty)
    pub body: Bytes,
}

impl HttpRequest {
    /// Creates a request with no headers and an empty body
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// A response whose body has been read to completion
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

/// Performs a single request/response exchange
///
/// Implementations must return `Err(GigaChatError::Transport(..))` when no
/// complete response was obtained, and `Ok` for every response that was,
/// whatever its status code.
pub trait Transport: Send + Sync + 'static {
    /// Issues the request and reads the whole response
    fn issue(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, GigaChatError>> + Send;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport honouring the config's timeouts and TLS settings
    ///
    /// # Errors
    ///
    /// Returns [`GigaChatError::Config`] if a root certificate cannot be parsed
    /// or the underlying client cannot be built.
    pub fn from_config(config: &GigaChatConfig) -> Result<Self, GigaChatError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .use_rustls_tls();

        for pem in config.root_certificates() {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| GigaChatError::Config(format!("Invalid root certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        match config.tls_verification() {
            TlsVerification::Full => {}
            #[cfg(feature = "danger-dev-tls")]
            TlsVerification::DangerAcceptInvalidCerts => {
                tracing::warn!(
                    "TLS certificate and hostname validation is DISABLED (danger-dev-tls)"
                );
                builder = builder
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true);
            }
        }

        let http = builder
            .build()
            .map_err(|e| GigaChatError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wraps an existing `reqwest::Client` as-is
    #[must_use]
    pub const fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn issue(&self, request: HttpRequest) -> Result<HttpResponse, GigaChatError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    #[serial(env)]
    async fn issues_request_and_reads_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("x-test", "1"))
            .and(body_string("ping"))
            .respond_with(ResponseTemplate::new(418).set_body_string("pong"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::from_config(&GigaChatConfig::new()).unwrap();
        let mut req = HttpRequest::new(Method::POST, format!("{}/echo", server.uri()));
        req.headers.insert("x-test", "1".parse().unwrap());
        req.body = Bytes::from_static(b"ping");

        let resp = transport.issue(req).await.unwrap();
        assert_eq!(resp.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(&resp.body[..], b"pong");
    }

    #[tokio::test]
    #[serial(env)]
    async fn connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let transport = HttpTransport::from_config(&GigaChatConfig::new()).unwrap();
        let req = HttpRequest::new(Method::GET, format!("http://{addr}/"));

        let err = transport.issue(req).await.unwrap_err();
        assert!(err.is_transport());
    }
}
