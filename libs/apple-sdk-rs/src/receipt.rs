//! App Store `verifyReceipt` client.

use std::sync::Arc;

use apple_types::{IapRequest, IapResponse, ReceiptStatusError};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::context::RequestContext;
use crate::error::AppleError;
use crate::transport::{HttpRequest, HttpTransport};

/// Endpoint for production receipts.
pub const PRODUCTION_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";

/// Endpoint for sandbox (TestFlight, Xcode, sandbox account) receipts.
pub const SANDBOX_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Verifies receipts against production, falling back to sandbox once.
pub struct ReceiptClient {
    transport: Arc<dyn HttpTransport>,
    production_url: Url,
    sandbox_url: Url,
}

impl ReceiptClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Result<Self, AppleError> {
        let parse = |url: &str| {
            Url::parse(url).map_err(|e| AppleError::Config(format!("receipt url {url}: {e}")))
        };

        Ok(Self {
            transport,
            production_url: parse(PRODUCTION_URL)?,
            sandbox_url: parse(SANDBOX_URL)?,
        })
    }

    /// Create a reqwest-backed client from configuration.
    #[cfg(feature = "client")]
    pub fn from_config(config: &crate::AppleConfig) -> Result<Self, AppleError> {
        let transport = crate::transport::ReqwestTransport::with_timeout(config.http_timeout)?;
        Self::new(Arc::new(transport))
    }

    pub fn with_urls(mut self, production_url: Url, sandbox_url: Url) -> Self {
        self.production_url = production_url;
        self.sandbox_url = sandbox_url;
        self
    }

    /// Verify a receipt.
    ///
    /// Production is always tried first. A `21007` status means the receipt
    /// belongs to the sandbox, so the same body is submitted there once and
    /// that answer is returned. Any other nonzero status is returned as is;
    /// use [`IapResponse::status_error`] to interpret it.
    ///
    /// # Example
    /// ```rust,ignore
    /// let response = receipts.verify(&ctx, &IapRequest::new(receipt_data)).await?;
    /// if let Some(err) = response.status_error() {
    ///     return Err(err.into());
    /// }
    /// ```
    #[instrument(skip_all, fields(exclude_old_transactions = request.exclude_old_transactions))]
    pub async fn verify(
        &self,
        ctx: &RequestContext,
        request: &IapRequest,
    ) -> Result<IapResponse, AppleError> {
        let body = serde_json::to_vec(request)?;

        let response = self
            .validate_request(ctx, &self.production_url, body.clone())
            .await?;

        if response.status != ReceiptStatusError::SANDBOX_RECEIPT {
            return Ok(response);
        }

        info!("Sandbox receipt sent to production, retrying against sandbox");
        self.validate_request(ctx, &self.sandbox_url, body).await
    }

    async fn validate_request(
        &self,
        ctx: &RequestContext,
        url: &Url,
        body: Vec<u8>,
    ) -> Result<IapResponse, AppleError> {
        let request = HttpRequest::post(url.clone(), body).header("content-type", CONTENT_TYPE);

        debug!(url = %url, "Sending receipt");
        let response = ctx.run(self.transport.execute(request)).await?;

        if response.status >= 500 {
            warn!(url = %url, status = response.status, "App Store server error");
            return Err(AppleError::AppStoreServer);
        }

        let parsed: IapResponse = serde_json::from_slice(&response.body)?;
        debug!(url = %url, status = parsed.status, environment = %parsed.environment, "Receipt verified");

        Ok(parsed)
    }
}
