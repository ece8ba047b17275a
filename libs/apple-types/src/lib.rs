//! Shared types and crypto primitives for Sign in with Apple and App Store receipts.
//!
//! This crate provides:
//! - Client secret generation (ES256 JWT signed with a `.p8` key)
//! - Identity token claims decoding (`IdentityClaims`, `AppleUser`)
//! - Token endpoint and `verifyReceipt` wire types
//! - Error taxonomies for OAuth error codes and receipt status codes

mod claims;
mod crypto;
mod errors;
mod receipt;
mod responses;

pub use claims::{
    AppleUser, ClaimsSource, ClientSecretClaims, IdentityClaims, RealUserStatus, UnverifiedClaims,
};
pub use crypto::{AUDIENCE, CLIENT_SECRET_TTL, SecretRequest, decode_claims, decode_pem_block};
pub use errors::{ClaimsError, CredentialError, OAuthError, ReceiptStatusError};
pub use receipt::{
    CancellationDate, ExpiresDate, GracePeriodDate, IapRequest, IapResponse, InApp,
    OriginalPurchaseDate, PendingRenewalInfo, PreorderDate, PurchaseDate, Receipt,
    ReceiptCreationDate, RequestDate,
};
pub use responses::{ErrorResponse, TokenResponse};
