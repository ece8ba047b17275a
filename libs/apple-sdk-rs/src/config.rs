use std::time::Duration;

use apple_types::{IapRequest, SecretRequest};
use env_helpers::get_env_default;
use secrecy::{ExposeSecret, SecretString};

use crate::error::AppleError;

/// Credentials and tuning for talking to Apple, usually read from the environment.
#[derive(Debug, Clone)]
pub struct AppleConfig {
    /// 10-character Team ID (`APPLE_TEAM_ID`)
    pub team_id: String,
    /// Services ID or bundle ID (`APPLE_CLIENT_ID`)
    pub client_id: String,
    /// Sign in with Apple key ID (`APPLE_KEY_ID`)
    pub key_id: String,
    /// PEM text of the `.p8` key (`APPLE_PRIVATE_KEY`)
    pub private_key: SecretString,
    /// App Store shared secret sent as the receipt `password` (`APPLE_SHARED_SECRET`)
    pub shared_secret: Option<SecretString>,
    /// Total request timeout of the HTTP client (`APPLE_HTTP_TIMEOUT_SECS`, default 10)
    pub http_timeout: Duration,
}

impl AppleConfig {
    pub fn from_env() -> Result<Self, AppleError> {
        let team_id: String = get_env_default("APPLE_TEAM_ID", String::new());
        let client_id: String = get_env_default("APPLE_CLIENT_ID", String::new());
        let key_id: String = get_env_default("APPLE_KEY_ID", String::new());
        let private_key: SecretString =
            SecretString::from(get_env_default("APPLE_PRIVATE_KEY", String::new()));
        let shared_secret: Option<SecretString> = std::env::var("APPLE_SHARED_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);
        let http_timeout_secs: u64 = get_env_default("APPLE_HTTP_TIMEOUT_SECS", 10);

        let config = Self {
            team_id,
            client_id,
            key_id,
            private_key,
            shared_secret,
            http_timeout: Duration::from_secs(http_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every required value is present.
    pub fn validate(&self) -> Result<(), AppleError> {
        let required = [
            ("APPLE_TEAM_ID", self.team_id.is_empty()),
            ("APPLE_CLIENT_ID", self.client_id.is_empty()),
            ("APPLE_KEY_ID", self.key_id.is_empty()),
            ("APPLE_PRIVATE_KEY", self.private_key.expose_secret().is_empty()),
        ];

        if let Some((name, _)) = required.iter().find(|(_, missing)| *missing) {
            return Err(AppleError::Config(format!("{name} is required")));
        }

        if self.http_timeout.is_zero() {
            return Err(AppleError::Config(
                "APPLE_HTTP_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Credential context for minting client secrets.
    pub fn secret_request(&self) -> SecretRequest {
        SecretRequest {
            team_id: self.team_id.clone(),
            client_id: self.client_id.clone(),
            key_id: self.key_id.clone(),
            private_key: self.private_key.clone(),
        }
    }

    /// A receipt request carrying the shared secret, if one is configured.
    pub fn iap_request(&self, receipt_data: impl Into<String>) -> IapRequest {
        let request = IapRequest::new(receipt_data);
        match &self.shared_secret {
            Some(secret) => request.with_password(secret.expose_secret()),
            None => request,
        }
    }
}
