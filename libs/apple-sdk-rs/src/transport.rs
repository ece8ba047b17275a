//! HTTP transport port and the default reqwest adapter.
//!
//! Clients never talk to `reqwest` directly. They hand an [`HttpRequest`] to
//! an [`HttpTransport`], so tests can swap in an in-memory fake and callers
//! can bring their own client.

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

/// An outgoing request, fully built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP verb, e.g. `"POST"`
    pub method: &'static str,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn post(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: "POST",
            url,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one request and returns the response, whatever its status.
///
/// Non-2xx statuses are not errors at this layer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(feature = "client")]
pub use reqwest_transport::*;

#[cfg(feature = "client")]
mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Client;

    use super::{HttpRequest, HttpResponse, HttpTransport};
    use crate::error::TransportError;

    /// Default connect timeout (TCP handshake + TLS).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Default request timeout (total request/response time).
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build an HTTP client with default timeouts.
    pub fn try_build_client() -> Result<Client, reqwest::Error> {
        try_build_client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an HTTP client with the default connect timeout and an explicit
    /// request timeout.
    pub fn try_build_client_with_timeout(request_timeout: Duration) -> Result<Client, reqwest::Error> {
        Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
    }

    /// [`HttpTransport`] backed by a shared `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self, TransportError> {
            Ok(Self::with_client(try_build_client()?))
        }

        pub fn with_timeout(request_timeout: Duration) -> Result<Self, TransportError> {
            Ok(Self::with_client(try_build_client_with_timeout(
                request_timeout,
            )?))
        }

        /// Use a caller-configured client. Its timeouts are kept as is.
        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let method = reqwest::Method::from_bytes(request.method.as_bytes())
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let mut builder = self.client.request(method, request.url);
            for (name, value) in request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.body(request.body).send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();

            Ok(HttpResponse { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let url = Url::parse("https://appleid.apple.com/auth/token").unwrap();
        let request = HttpRequest::post(url.clone(), b"a=b".to_vec())
            .header("content-type", "application/x-www-form-urlencoded")
            .header("accept", "application/json");

        assert_eq!(request.method, "POST");
        assert_eq!(request.url, url);
        assert_eq!(request.body, b"a=b");
        assert_eq!(
            request.header_value("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.header_value("user-agent"), None);
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_build_client_with_defaults() {
        assert!(try_build_client().is_ok());
        assert!(ReqwestTransport::with_timeout(std::time::Duration::from_secs(3)).is_ok());
    }
}
