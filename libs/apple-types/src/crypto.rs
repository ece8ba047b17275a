use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

use crate::{ClaimsError, ClientSecretClaims, CredentialError, IdentityClaims};

/// Audience of every client secret, and issuer of Apple identity tokens.
pub const AUDIENCE: &str = "https://appleid.apple.com";

/// Lifetime of a generated client secret.
pub const CLIENT_SECRET_TTL: Duration = Duration::days(30);

/// Everything needed to mint a client secret for Apple's token endpoint.
#[derive(Debug, Clone)]
pub struct SecretRequest {
    /// 10-character Team ID from the developer account
    pub team_id: String,

    /// Services ID (web) or bundle ID (native) the token is issued for
    pub client_id: String,

    /// ID of the Sign in with Apple private key
    pub key_id: String,

    /// Contents of the `.p8` private key file
    pub private_key: SecretString,
}

impl SecretRequest {
    pub fn new(
        team_id: impl Into<String>,
        client_id: impl Into<String>,
        key_id: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            team_id: team_id.into(),
            client_id: client_id.into(),
            key_id: key_id.into(),
            private_key: SecretString::from(private_key.into()),
        }
    }

    /// Generates an ES256-signed client secret valid for 30 days from now.
    ///
    /// # Example
    /// ```
    /// use apple_types::{CredentialError, SecretRequest};
    ///
    /// let request = SecretRequest::new("1234567890", "com.example.app", "abc123def4", "");
    /// let err = request.generate_client_secret().unwrap_err();
    /// assert_eq!(err.to_string(), CredentialError::EMPTY_PEM_BLOCK);
    /// ```
    pub fn generate_client_secret(&self) -> Result<String, CredentialError> {
        let der = decode_pem_block(self.private_key.expose_secret().as_bytes())?;
        let key = EncodingKey::from_ec_der(&der);

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        let claims = self.claims_at(OffsetDateTime::now_utc());

        // The DER is only parsed as PKCS#8 when signing.
        encode(&header, &claims, &key).map_err(|e| match e.kind() {
            ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                CredentialError::InvalidKeyMaterial(e.to_string())
            }
            _ => CredentialError::SigningFailure(e),
        })
    }

    pub(crate) fn claims_at(&self, now: OffsetDateTime) -> ClientSecretClaims {
        let iat = now.unix_timestamp();
        ClientSecretClaims {
            iss: self.team_id.clone(),
            sub: self.client_id.clone(),
            aud: AUDIENCE.to_string(),
            iat,
            exp: iat + CLIENT_SECRET_TTL.whole_seconds(),
        }
    }
}

const PEM_BEGIN: &[u8] = b"-----BEGIN ";

/// Extracts the DER bytes of the first well-formed PEM block in `data`.
///
/// Blocks must open at the start of a line. A block that fails to decode is
/// skipped and the search continues with the next one. Fails with
/// [`CredentialError::EMPTY_PEM_BLOCK`] when no block decodes.
pub fn decode_pem_block(data: &[u8]) -> Result<Vec<u8>, CredentialError> {
    (0..data.len())
        .filter(|&i| (i == 0 || data[i - 1] == b'\n') && data[i..].starts_with(PEM_BEGIN))
        .filter_map(|i| pem::parse(&data[i..]).ok())
        .find(|block| !block.tag().contains('\n') && !block.contents().is_empty())
        .map(pem::Pem::into_contents)
        .ok_or_else(CredentialError::empty_pem_block)
}

/// Decodes the payload of an identity token without verifying its signature.
///
/// # Security Note
/// This function does NOT verify the token. Callers must only pass tokens
/// they received directly from Apple's token endpoint.
pub fn decode_claims(id_token: &str) -> Result<IdentityClaims, ClaimsError> {
    let mut validation = Validation::new(Algorithm::ES256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Map<String, Value>>(
        id_token,
        &DecodingKey::from_secret(b"ignored"),
        &validation,
    )?;

    Ok(IdentityClaims::new(token_data.claims))
}
