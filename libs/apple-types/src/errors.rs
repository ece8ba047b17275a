use thiserror::Error;

/// Error codes returned in the `error` field by Apple's token endpoint.
///
/// See <https://developer.apple.com/documentation/sign_in_with_apple/errorresponse>.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    #[error(
        "The request is malformed, typically because it is missing a parameter, contains an unsupported parameter, includes multiple credentials, or uses more than one mechanism for authenticating the client."
    )]
    InvalidRequest,

    #[error(
        "The client authentication failed, typically due to a mismatched or invalid client identifier, invalid client secret (expired token, malformed claims, or invalid signature), or mismatched or invalid redirect URI."
    )]
    InvalidClient,

    #[error(
        "The authorization grant or refresh token is invalid, typically due to a mismatched or invalid client identifier, invalid code (expired or previously used authorization code), or invalid refresh token."
    )]
    InvalidGrant,

    #[error("The client is not authorized to use this authorization grant type.")]
    UnauthorizedClient,

    #[error("The authenticated client is not authorized to use this grant type.")]
    UnsupportedGrantType,

    #[error("The requested scope is invalid.")]
    InvalidScope,

    /// An error string outside the documented set, kept verbatim.
    #[error("Unrecognized error: {0}")]
    Unrecognized(String),
}

impl OAuthError {
    /// Maps the raw `error` string of a token endpoint response.
    pub fn from_code(code: &str) -> Self {
        match code {
            "invalid_request" => Self::InvalidRequest,
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            "unauthorized_client" => Self::UnauthorizedClient,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "invalid_scope" => Self::InvalidScope,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::Unrecognized(code) => code,
        }
    }
}

/// Semantic meaning of a nonzero `status` in a `verifyReceipt` response.
///
/// See <https://developer.apple.com/documentation/appstorereceipts/status>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiptStatusError {
    #[error("the App Store could not read the JSON object you provided")]
    InvalidJson,

    #[error("the data in the receipt-data property was malformed or missing")]
    InvalidReceiptData,

    #[error("the receipt could not be authenticated")]
    ReceiptUnauthenticated,

    #[error(
        "the shared secret you provided does not match the shared secret on file for your account"
    )]
    InvalidSharedSecret,

    #[error("the receipt server is not currently available")]
    ServerUnavailable,

    #[error("subscription has expired")]
    SubscriptionExpired,

    #[error(
        "this receipt is from the test environment, but it was sent to the production environment for verification. Send it to the test environment instead"
    )]
    ReceiptIsForTest,

    #[error(
        "this receipt is from the production environment, but it was sent to the test environment for verification. Send it to the production environment instead"
    )]
    ReceiptIsForProduction,

    #[error("internal data access error")]
    InternalDataAccess,

    #[error(
        "this receipt could not be authorized. Treat this the same as if a purchase was never made"
    )]
    ReceiptUnauthorized,

    #[error("an unknown error occurred (status {0})")]
    Unknown(i32),
}

impl ReceiptStatusError {
    /// Status `0` means the receipt is valid.
    pub const OK: i32 = 0;

    /// Status returned by production for a sandbox receipt.
    pub const SANDBOX_RECEIPT: i32 = 21007;

    /// Classifies a receipt status. Returns `None` for [`Self::OK`].
    pub fn from_status(status: i32) -> Option<Self> {
        let err = match status {
            Self::OK => return None,
            21000 => Self::InvalidJson,
            21002 => Self::InvalidReceiptData,
            21003 => Self::ReceiptUnauthenticated,
            21004 => Self::InvalidSharedSecret,
            21005 => Self::ServerUnavailable,
            21006 => Self::SubscriptionExpired,
            Self::SANDBOX_RECEIPT => Self::ReceiptIsForTest,
            21008 => Self::ReceiptIsForProduction,
            21009 | 21100..=21199 => Self::InternalDataAccess,
            21010 => Self::ReceiptUnauthorized,
            other => Self::Unknown(other),
        };
        Some(err)
    }
}

/// Client secret generation errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The private key is not a PEM-wrapped PKCS#8 P-256 key.
    #[error("{0}")]
    InvalidKeyMaterial(String),

    #[error("{0}")]
    SigningFailure(#[source] jsonwebtoken::errors::Error),
}

impl CredentialError {
    pub const EMPTY_PEM_BLOCK: &'static str = "pem block is empty after decoding";

    pub(crate) fn empty_pem_block() -> Self {
        Self::InvalidKeyMaterial(Self::EMPTY_PEM_BLOCK.to_string())
    }
}

/// Identity token decoding errors.
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Malformed identity token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),

    #[error("Missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("Claim {claim} is not {expected}")]
    TypeMismatch {
        claim: &'static str,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_messages() {
        assert_eq!(
            OAuthError::from_code("invalid_scope").to_string(),
            "The requested scope is invalid."
        );
        assert_eq!(
            OAuthError::from_code("unauthorized_client").to_string(),
            "The client is not authorized to use this authorization grant type."
        );
    }

    #[test]
    fn test_oauth_error_codes_roundtrip() {
        for code in [
            "invalid_request",
            "invalid_client",
            "invalid_grant",
            "unauthorized_client",
            "unsupported_grant_type",
            "invalid_scope",
        ] {
            let err = OAuthError::from_code(code);
            assert!(!matches!(err, OAuthError::Unrecognized(_)));
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_oauth_error_unrecognized() {
        let err = OAuthError::from_code("server_on_fire");
        assert_eq!(err, OAuthError::Unrecognized("server_on_fire".into()));
        assert_eq!(err.to_string(), "Unrecognized error: server_on_fire");
    }

    #[test]
    fn test_receipt_status_ok() {
        assert_eq!(ReceiptStatusError::from_status(0), None);
    }

    #[test]
    fn test_receipt_status_documented_codes() {
        use ReceiptStatusError::*;

        let cases = [
            (21000, InvalidJson),
            (21002, InvalidReceiptData),
            (21003, ReceiptUnauthenticated),
            (21004, InvalidSharedSecret),
            (21005, ServerUnavailable),
            (21006, SubscriptionExpired),
            (21007, ReceiptIsForTest),
            (21008, ReceiptIsForProduction),
            (21009, InternalDataAccess),
            (21010, ReceiptUnauthorized),
        ];

        for (status, expected) in cases {
            assert_eq!(ReceiptStatusError::from_status(status), Some(expected));
        }
    }

    #[test]
    fn test_receipt_status_internal_range() {
        for status in [21100, 21150, 21199] {
            assert_eq!(
                ReceiptStatusError::from_status(status),
                Some(ReceiptStatusError::InternalDataAccess)
            );
        }
        assert_eq!(
            ReceiptStatusError::from_status(21200),
            Some(ReceiptStatusError::Unknown(21200))
        );
    }

    #[test]
    fn test_receipt_status_unknown() {
        assert_eq!(
            ReceiptStatusError::from_status(99999),
            Some(ReceiptStatusError::Unknown(99999))
        );
        assert_eq!(
            ReceiptStatusError::from_status(21001),
            Some(ReceiptStatusError::Unknown(21001))
        );
    }

    #[test]
    fn test_empty_pem_block_message() {
        assert_eq!(
            CredentialError::empty_pem_block().to_string(),
            "pem block is empty after decoding"
        );
    }
}
