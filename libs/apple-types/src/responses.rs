use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{AppleUser, ClaimsError, ClaimsSource, IdentityClaims, UnverifiedClaims};

/// Successful response from Apple's token endpoint.
///
/// See <https://developer.apple.com/documentation/sign_in_with_apple/tokenresponse>.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Only returned when validating an authorization code.
    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub access_token: String,

    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: i64,

    /// Identity token with the user's identity claims
    #[serde(default)]
    pub id_token: String,

    /// Always "bearer"
    #[serde(default)]
    pub token_type: String,

    #[serde(skip, default = "default_claims_source")]
    claims_source: Arc<dyn ClaimsSource>,
}

fn default_claims_source() -> Arc<dyn ClaimsSource> {
    Arc::new(UnverifiedClaims)
}

impl TokenResponse {
    /// Replace the source used to read claims out of `id_token`.
    pub fn with_claims_source(mut self, source: Arc<dyn ClaimsSource>) -> Self {
        self.claims_source = source;
        self
    }

    /// Decode the identity token's claims.
    pub fn claims(&self) -> Result<IdentityClaims, ClaimsError> {
        self.claims_source.claims(&self.id_token)
    }

    /// The user's unique, stable identifier (`sub`).
    pub fn unique_id(&self) -> Result<String, ClaimsError> {
        self.claims()?
            .display("sub")
            .ok_or(ClaimsError::MissingClaim("sub"))
    }

    pub fn email(&self) -> Result<String, ClaimsError> {
        self.claims()?
            .display("email")
            .ok_or(ClaimsError::MissingClaim("email"))
    }

    /// 0 (Unsupported), 1 (Unknown) or 2 (LikelyReal).
    pub fn real_user_status(&self) -> Result<i64, ClaimsError> {
        let claims = self.claims()?;
        match claims.get("real_user_status") {
            None => Err(ClaimsError::MissingClaim("real_user_status")),
            Some(value) => value.as_i64().ok_or(ClaimsError::TypeMismatch {
                claim: "real_user_status",
                expected: "an integer",
            }),
        }
    }

    /// Builds the user from the identity token. Mistyped claims are skipped.
    pub fn get_user(&self) -> Result<AppleUser, ClaimsError> {
        Ok(self.claims()?.user())
    }
}

/// Error body returned by Apple's token endpoint on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
}
