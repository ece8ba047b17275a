use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::decode_claims;
use crate::errors::ClaimsError;

/// Claims of the client secret sent to Apple's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecretClaims {
    /// Team ID
    pub iss: String,

    /// Client ID (Services ID or bundle ID)
    pub sub: String,

    /// Always `https://appleid.apple.com`
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Claims of an Apple identity token, as a raw JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// The claim if it is a JSON string.
    pub fn string(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }

    /// The claim if it is a JSON boolean.
    pub fn boolean(&self, claim: &str) -> Option<bool> {
        self.0.get(claim).and_then(Value::as_bool)
    }

    /// The claim if it is a JSON integer. Floats such as `2.0` are not integers.
    pub fn integer(&self, claim: &str) -> Option<i64> {
        self.0.get(claim).and_then(Value::as_i64)
    }

    /// The claim rendered as text: strings verbatim, anything else as JSON.
    pub fn display(&self, claim: &str) -> Option<String> {
        self.0.get(claim).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Builds a user from the claims whose JSON type matches the field type.
    ///
    /// Claims of any other type leave the field at its default.
    pub fn user(&self) -> AppleUser {
        AppleUser {
            id: self.string("sub").map(str::to_string).unwrap_or_default(),
            email: self.string("email").map(str::to_string).unwrap_or_default(),
            email_verified: self.boolean("email_verified").unwrap_or_default(),
            is_private_email: self.boolean("is_private_email").unwrap_or_default(),
            real_user_status: self.integer("real_user_status").unwrap_or_default(),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for IdentityClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// A user authenticated by Sign in with Apple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleUser {
    /// Stable unique identifier (`sub`)
    pub id: String,

    /// Real or private relay email address
    pub email: String,

    pub email_verified: bool,

    /// Whether `email` is a private relay address
    pub is_private_email: bool,

    /// 0 (Unsupported), 1 (Unknown) or 2 (LikelyReal)
    pub real_user_status: i64,
}

impl AppleUser {
    pub fn real_user_status_kind(&self) -> Option<RealUserStatus> {
        RealUserStatus::from_i64(self.real_user_status)
    }
}

/// Indicates whether the user appears to be a real person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealUserStatus {
    Unsupported = 0,
    Unknown = 1,
    LikelyReal = 2,
}

impl RealUserStatus {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Unsupported),
            1 => Some(Self::Unknown),
            2 => Some(Self::LikelyReal),
            _ => None,
        }
    }
}

/// Source of identity token claims.
///
/// [`UnverifiedClaims`] is the production implementation; tests swap in
/// fixed claims.
pub trait ClaimsSource: Send + Sync + fmt::Debug {
    fn claims(&self, id_token: &str) -> Result<IdentityClaims, ClaimsError>;
}

/// Decodes identity token payloads without checking the signature.
///
/// Only use this for tokens received directly from Apple's token endpoint
/// over TLS. Tokens that arrive from a client device must be verified
/// against Apple's published keys instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedClaims;

impl ClaimsSource for UnverifiedClaims {
    fn claims(&self, id_token: &str) -> Result<IdentityClaims, ClaimsError> {
        decode_claims(id_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> IdentityClaims {
        match value {
            Value::Object(map) => IdentityClaims::new(map),
            _ => panic!("claims must be an object"),
        }
    }

    fn john_doe() -> AppleUser {
        AppleUser {
            id: "123456".to_string(),
            email: "john.doe@gmail.com".to_string(),
            email_verified: true,
            is_private_email: true,
            real_user_status: 2,
        }
    }

    #[test]
    fn test_user_from_typed_claims() {
        let claims = claims(json!({
            "sub": "123456",
            "email": "john.doe@gmail.com",
            "email_verified": true,
            "is_private_email": true,
            "real_user_status": 2
        }));

        assert_eq!(claims.user(), john_doe());
    }

    #[test]
    fn test_user_skips_mistyped_claims() {
        let claims = claims(json!({
            "sub": "123456",
            "email": 42,
            "email_verified": "true",
            "is_private_email": true,
            "real_user_status": 2.0
        }));

        let user = claims.user();
        assert_eq!(user.id, "123456");
        assert_eq!(user.email, "");
        assert!(!user.email_verified);
        assert!(user.is_private_email);
        assert_eq!(user.real_user_status, 0);
    }

    #[test]
    fn test_user_from_empty_claims() {
        assert_eq!(IdentityClaims::default().user(), AppleUser::default());
    }

    #[test]
    fn test_display_renders_non_strings_as_json() {
        let claims = claims(json!({ "sub": "abc", "n": 7, "b": false }));

        assert_eq!(claims.display("sub").as_deref(), Some("abc"));
        assert_eq!(claims.display("n").as_deref(), Some("7"));
        assert_eq!(claims.display("b").as_deref(), Some("false"));
        assert_eq!(claims.display("missing"), None);
    }

    #[test]
    fn test_real_user_status_kind() {
        assert_eq!(john_doe().real_user_status_kind(), Some(RealUserStatus::LikelyReal));
        let user = AppleUser {
            real_user_status: 9,
            ..Default::default()
        };
        assert_eq!(user.real_user_status_kind(), None);
    }
}
