//! Request and response bodies of the App Store `verifyReceipt` endpoint.
//!
//! Field documentation follows
//! <https://developer.apple.com/documentation/appstorereceipts>.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ReceiptStatusError;

/// Body submitted to `verifyReceipt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IapRequest {
    /// Base64-encoded receipt data
    #[serde(rename = "receipt-data")]
    pub receipt_data: String,

    /// The app's shared secret (hexadecimal string)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,

    /// Only include the latest renewal transaction of each subscription.
    #[serde(
        rename = "exclude-old-transactions",
        skip_serializing_if = "std::ops::Not::not",
        default
    )]
    pub exclude_old_transactions: bool,
}

impl IapRequest {
    pub fn new(receipt_data: impl Into<String>) -> Self {
        Self {
            receipt_data: receipt_data.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_exclude_old_transactions(mut self, exclude: bool) -> Self {
        self.exclude_old_transactions = exclude;
        self
    }
}

/// Response of `verifyReceipt`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IapResponse {
    /// 0 if the receipt is valid, otherwise a status code.
    #[serde(default)]
    pub status: i32,

    /// "Sandbox" or "Production"
    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub receipt: Receipt,

    /// All in-app purchase transactions. Only for auto-renewable subscriptions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub latest_receipt_info: Vec<InApp>,

    /// The latest Base64-encoded app receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_receipt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_renewal_info: Option<Vec<PendingRenewalInfo>>,

    /// Set when an internal App Store error occurred and the request may succeed later.
    #[serde(rename = "is-retryable", default)]
    pub is_retryable: bool,
}

impl IapResponse {
    /// The semantic error for `status`, or `None` if the receipt is valid.
    pub fn status_error(&self) -> Option<ReceiptStatusError> {
        ReceiptStatusError::from_status(self.status)
    }

    pub fn is_valid(&self) -> bool {
        self.status == ReceiptStatusError::OK
    }
}

/// Decoded receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Receipt {
    /// Production, ProductionVPP, ProductionSandbox or ProductionVPPSandbox
    #[serde(default)]
    pub receipt_type: String,

    #[serde(default)]
    pub adam_id: Option<i64>,

    /// Identifies the app. Only assigned in production.
    #[serde(default, deserialize_with = "numeric_string")]
    pub app_item_id: String,

    #[serde(default)]
    pub bundle_id: String,

    /// CFBundleVersion (iOS) or CFBundleShortVersionString (macOS). "1.0" in sandbox.
    #[serde(default)]
    pub application_version: String,

    #[serde(default)]
    pub download_id: Option<i64>,

    /// Identifies a revision of the app. "0" in sandbox.
    #[serde(default, deserialize_with = "numeric_string")]
    pub version_external_identifier: String,

    #[serde(default)]
    pub original_application_version: String,

    #[serde(default)]
    pub in_app: Vec<InApp>,

    #[serde(flatten)]
    pub receipt_creation_date: ReceiptCreationDate,

    #[serde(flatten)]
    pub request_date: RequestDate,

    #[serde(flatten)]
    pub original_purchase_date: OriginalPurchaseDate,

    #[serde(flatten)]
    pub preorder_date: PreorderDate,

    /// Only for Volume Purchase Program apps.
    #[serde(flatten)]
    pub expires_date: ExpiresDate,
}

/// An in-app purchase transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InApp {
    /// Number of consumables purchased. Usually "1", at most "10".
    #[serde(default)]
    pub quantity: String,

    #[serde(default)]
    pub product_id: String,

    #[serde(default)]
    pub transaction_id: String,

    #[serde(default)]
    pub original_transaction_id: String,

    /// Primary key for subscription purchase events across devices.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub web_order_line_item_id: String,

    #[serde(default)]
    pub promotional_offer_id: String,

    /// "true" while in the free trial period
    #[serde(default)]
    pub is_trial_period: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub is_in_intro_offer_period: String,

    #[serde(flatten)]
    pub expires_date: ExpiresDate,

    #[serde(flatten)]
    pub purchase_date: PurchaseDate,

    #[serde(flatten)]
    pub original_purchase_date: OriginalPurchaseDate,

    #[serde(flatten)]
    pub cancellation_date: CancellationDate,

    /// "1" if the customer canceled due to an issue in the app, "0" otherwise.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cancellation_reason: String,
}

impl InApp {
    pub fn is_trial_period(&self) -> bool {
        self.is_trial_period == "true"
    }

    pub fn is_in_intro_offer_period(&self) -> bool {
        self.is_in_intro_offer_period == "true"
    }

    /// Refunded or revoked transactions carry a cancellation date.
    pub fn is_canceled(&self) -> bool {
        !self.cancellation_date.cancellation_date_ms.is_empty()
    }

    pub fn purchased_at(&self) -> Option<DateTime<Utc>> {
        parse_ms(&self.purchase_date.purchase_date_ms)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_ms(&self.expires_date.expires_date_ms)
    }

    /// Whether the subscription period of this transaction covers `now`.
    /// Canceled transactions are never active.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_canceled() && self.expires_at().is_some_and(|expires| expires > now)
    }
}

/// Open or failed auto-renewable subscription renewal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingRenewalInfo {
    /// Why the subscription expired. Only for expired subscriptions.
    #[serde(rename = "expiration_intent", default)]
    pub subscription_expiration_intent: String,

    #[serde(rename = "auto_renew_product_id", default)]
    pub subscription_auto_renew_product_id: String,

    /// "1" while Apple retries billing
    #[serde(rename = "is_in_billing_retry_period", default)]
    pub subscription_retry_flag: String,

    /// "1" if the subscription renews at the end of the period
    #[serde(rename = "auto_renew_status", default)]
    pub subscription_auto_renew_status: String,

    #[serde(rename = "price_consent_status", default)]
    pub subscription_price_consent_status: String,

    #[serde(default)]
    pub product_id: String,

    #[serde(default)]
    pub original_transaction_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub offer_code_ref_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub promotional_offer_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price_increase_status: String,

    #[serde(flatten)]
    pub grace_period_date: GracePeriodDate,
}

impl PendingRenewalInfo {
    pub fn will_auto_renew(&self) -> bool {
        self.subscription_auto_renew_status == "1"
    }

    pub fn is_in_billing_retry_period(&self) -> bool {
        self.subscription_retry_flag == "1"
    }

    pub fn grace_period_expires_at(&self) -> Option<DateTime<Utc>> {
        parse_ms(&self.grace_period_date.grace_period_expires_date_ms)
    }
}

/// Every date appears as ISO 8601-like, Unix milliseconds and Pacific Time.
macro_rules! date_fields {
    ($(#[$doc:meta])* $name:ident { $date:ident, $ms:ident, $pst:ident }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default, skip_serializing_if = "String::is_empty")]
            pub $date: String,

            #[serde(default, skip_serializing_if = "String::is_empty")]
            pub $ms: String,

            #[serde(default, skip_serializing_if = "String::is_empty")]
            pub $pst: String,
        }

        impl $name {
            /// The millisecond timestamp as a UTC date, if present and valid.
            pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
                parse_ms(&self.$ms)
            }
        }
    };
}

date_fields!(
    /// When the App Store generated the receipt.
    ReceiptCreationDate {
        receipt_creation_date,
        receipt_creation_date_ms,
        receipt_creation_date_pst
    }
);

date_fields!(
    /// When the `verifyReceipt` request was processed.
    RequestDate {
        request_date,
        request_date_ms,
        request_date_pst
    }
);

date_fields!(
    /// When the product was purchased, restored or renewed.
    PurchaseDate {
        purchase_date,
        purchase_date_ms,
        purchase_date_pst
    }
);

date_fields!(
    /// Start of the original purchase.
    OriginalPurchaseDate {
        original_purchase_date,
        original_purchase_date_ms,
        original_purchase_date_pst
    }
);

date_fields!(
    /// When a pre-ordered app was ordered.
    PreorderDate {
        preorder_date,
        preorder_date_ms,
        preorder_date_pst
    }
);

date_fields!(
    /// Subscription or VPP expiration.
    ExpiresDate {
        expires_date,
        expires_date_ms,
        expires_date_pst
    }
);

date_fields!(
    /// When Apple support refunded or revoked the transaction.
    CancellationDate {
        cancellation_date,
        cancellation_date_ms,
        cancellation_date_pst
    }
);

date_fields!(
    /// End of the billing grace period.
    GracePeriodDate {
        grace_period_expires_date,
        grace_period_expires_date_ms,
        grace_period_expires_date_pst
    }
);

fn parse_ms(ms: &str) -> Option<DateTime<Utc>> {
    ms.parse::<i64>().ok().and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Accepts a JSON number or string (or null) and keeps its text.
fn numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(serde_json::Number),
        Text(String),
    }

    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => n.to_string(),
        Some(NumberOrString::Text(s)) => s,
        None => String::new(),
    })
}
