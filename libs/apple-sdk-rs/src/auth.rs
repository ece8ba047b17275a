//! Sign in with Apple token endpoint client.

use std::sync::Arc;

use apple_types::{
    ClaimsSource, ErrorResponse, OAuthError, SecretRequest, TokenResponse, UnverifiedClaims,
};
use tracing::{debug, instrument, warn};
use url::{Url, form_urlencoded};

use crate::context::RequestContext;
use crate::error::AppleError;
use crate::transport::{HttpRequest, HttpTransport};

/// Apple's token endpoint.
pub const TOKEN_URL: &str = "https://appleid.apple.com/auth/token";

pub const USER_AGENT: &str = "apple-sdk-rs";

const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const ACCEPT: &str = "application/json";

const AUTHORIZATION_CODE: &str = "authorization_code";
const REFRESH_TOKEN: &str = "refresh_token";

/// Exchanges authorization codes and refresh tokens with Apple.
///
/// A fresh client secret is signed for every call.
pub struct AuthClient {
    credentials: SecretRequest,
    transport: Arc<dyn HttpTransport>,
    claims_source: Arc<dyn ClaimsSource>,
    token_url: Url,
}

impl AuthClient {
    /// Create a client that sends requests through `transport`.
    ///
    /// The key itself is only checked when the first secret is signed.
    pub fn new(
        credentials: SecretRequest,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, AppleError> {
        if credentials.team_id.is_empty() {
            return Err(AppleError::Config("team_id is required".into()));
        }
        if credentials.client_id.is_empty() {
            return Err(AppleError::Config("client_id is required".into()));
        }
        if credentials.key_id.is_empty() {
            return Err(AppleError::Config("key_id is required".into()));
        }

        let token_url =
            Url::parse(TOKEN_URL).map_err(|e| AppleError::Config(format!("token url: {e}")))?;

        Ok(Self {
            credentials,
            transport,
            claims_source: Arc::new(UnverifiedClaims),
            token_url,
        })
    }

    /// Create a reqwest-backed client from configuration.
    #[cfg(feature = "client")]
    pub fn from_config(config: &crate::AppleConfig) -> Result<Self, AppleError> {
        let transport = crate::transport::ReqwestTransport::with_timeout(config.http_timeout)?;
        Self::new(config.secret_request(), Arc::new(transport))
    }

    pub fn with_token_url(mut self, token_url: Url) -> Self {
        self.token_url = token_url;
        self
    }

    /// Source used by returned [`TokenResponse`]s to read identity claims.
    pub fn with_claims_source(mut self, claims_source: Arc<dyn ClaimsSource>) -> Self {
        self.claims_source = claims_source;
        self
    }

    /// Validate an authorization code received by the app.
    ///
    /// Returns access, refresh and identity tokens.
    ///
    /// # Example
    /// ```rust,ignore
    /// let tokens = client.validate_code(&RequestContext::background(), &code).await?;
    /// let user = tokens.get_user()?;
    /// ```
    #[instrument(skip_all, fields(grant_type = AUTHORIZATION_CODE))]
    pub async fn validate_code(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<TokenResponse, AppleError> {
        let form = self.form_data(AUTHORIZATION_CODE, code, "", "")?;
        self.do_request(ctx, form).await
    }

    /// Validate an authorization code issued to a web flow with `redirect_uri`.
    #[instrument(skip_all, fields(grant_type = AUTHORIZATION_CODE, redirect_uri = %redirect_uri))]
    pub async fn validate_code_with_redirect_uri(
        &self,
        ctx: &RequestContext,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppleError> {
        let form = self.form_data(AUTHORIZATION_CODE, code, redirect_uri, "")?;
        self.do_request(ctx, form).await
    }

    /// Validate a refresh token. Apple returns a new access token and identity
    /// token, never a new refresh token.
    #[instrument(skip_all, fields(grant_type = REFRESH_TOKEN))]
    pub async fn validate_refresh_token(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppleError> {
        let form = self.form_data(REFRESH_TOKEN, "", "", refresh_token)?;
        let mut response = self.do_request(ctx, form).await?;
        response.refresh_token = None;
        Ok(response)
    }

    fn form_data(
        &self,
        grant_type: &str,
        code: &str,
        redirect_uri: &str,
        refresh_token: &str,
    ) -> Result<String, AppleError> {
        let secret = self.credentials.generate_client_secret()?;

        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("client_id", &self.credentials.client_id)
            .append_pair("client_secret", &secret)
            .append_pair("grant_type", grant_type);

        if !code.is_empty() {
            form.append_pair("code", code);
        }
        if !redirect_uri.is_empty() {
            form.append_pair("redirect_uri", redirect_uri);
        }
        if !refresh_token.is_empty() {
            form.append_pair("refresh_token", refresh_token);
        }

        Ok(form.finish())
    }

    async fn do_request(
        &self,
        ctx: &RequestContext,
        form: String,
    ) -> Result<TokenResponse, AppleError> {
        let request = HttpRequest::post(self.token_url.clone(), form.into_bytes())
            .header("content-type", CONTENT_TYPE)
            .header("accept", ACCEPT)
            .header("user-agent", USER_AGENT);

        debug!(url = %self.token_url, "Sending token request");
        let response = ctx.run(self.transport.execute(request)).await?;

        if response.status != 200 {
            let body: ErrorResponse = serde_json::from_slice(&response.body)?;
            warn!(status = response.status, error = %body.error, "Token endpoint rejected request");
            return Err(OAuthError::from_code(&body.error).into());
        }

        let tokens: TokenResponse = serde_json::from_slice(&response.body)?;
        debug!(expires_in = tokens.expires_in, "Token request succeeded");

        Ok(tokens.with_claims_source(self.claims_source.clone()))
    }
}
