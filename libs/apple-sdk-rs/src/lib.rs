//! Rust SDK for Sign in with Apple and App Store receipt verification.
//!
//! # Features
//!
//! - **Token exchange** - Validate authorization codes and refresh tokens against
//!   Apple's token endpoint, with a freshly signed ES256 client secret per call
//! - **Identity claims** - Read the user out of the returned identity token
//! - **Receipt verification** - Verify App Store receipts, falling back to the
//!   sandbox when Apple reports a sandbox receipt
//!
//! Every network call runs under a [`RequestContext`] carrying an optional
//! deadline and cancellation handle.
//!
//! # Example
//!
//! ```rust,ignore
//! use apple_sdk::{AppleConfig, AuthClient, ReceiptClient, RequestContext};
//!
//! let config = AppleConfig::from_env()?;
//! let ctx = RequestContext::with_timeout(std::time::Duration::from_secs(15));
//!
//! let auth = AuthClient::from_config(&config)?;
//! let tokens = auth.validate_code(&ctx, "c1234...").await?;
//! println!("User ID: {}", tokens.unique_id()?);
//!
//! let receipts = ReceiptClient::from_config(&config)?;
//! let response = receipts.verify(&ctx, &config.iap_request("MIIT...")).await?;
//! if let Some(err) = response.status_error() {
//!     println!("Receipt rejected: {err}");
//! }
//! ```

mod auth;
mod config;
mod context;
mod error;
mod receipt;
mod transport;

#[cfg(test)]
mod test_utils;

pub use auth::{AuthClient, TOKEN_URL, USER_AGENT};
pub use config::AppleConfig;
pub use context::{CancelHandle, RequestContext};
pub use error::{AppleError, TransportError};
pub use receipt::{PRODUCTION_URL, ReceiptClient, SANDBOX_URL};
pub use transport::{HttpRequest, HttpResponse, HttpTransport};

#[cfg(feature = "client")]
pub use transport::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, ReqwestTransport, try_build_client,
    try_build_client_with_timeout,
};

// Re-export shared types for convenience
pub use apple_types::{
    AppleUser, ClaimsError, ClaimsSource, CredentialError, IapRequest, IapResponse,
    IdentityClaims, InApp, OAuthError, PendingRenewalInfo, RealUserStatus, Receipt,
    ReceiptStatusError, SecretRequest, TokenResponse, UnverifiedClaims,
};
