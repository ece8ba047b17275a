use apple_types::{ClaimsError, CredentialError, OAuthError};
use thiserror::Error;

/// SDK-specific errors.
#[derive(Debug, Error)]
pub enum AppleError {
    /// The client secret could not be generated
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Apple's token endpoint rejected the request
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// The identity token could not be decoded.
    ///
    /// Never returned by the clients, which hand back the token response
    /// undecoded. Lets callers use `?` on [`TokenResponse`](apple_types::TokenResponse)
    /// claim accessors inside functions returning `AppleError`.
    #[error(transparent)]
    Claims(#[from] ClaimsError),

    /// `verifyReceipt` answered with an HTTP 5xx status
    #[error("appStore server error")]
    AppStoreServer,

    /// The request did not complete
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response body was not the expected JSON
    #[error("Malformed response body: {0}")]
    MalformedResponseBody(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by an [`HttpTransport`](crate::HttpTransport) or the request context.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network error (only with `client` feature)
    #[cfg(feature = "client")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request could not be built or sent
    #[error("Request error: {0}")]
    Request(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,
}
