use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::StripeSettings;
use crate::error::{msg, AppError, Result};
use crate::models::SubscriptionPlan;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
    pub price_monthly: String,
    pub price_yearly: String,
}

impl StripeClient {
    pub fn new(settings: &StripeSettings) -> Self {
        Self {
            client: Client::new(),
            secret_key: settings.secret_key.clone(),
            webhook_secret: settings.webhook_secret.clone(),
            price_monthly: settings.price_monthly.clone(),
            price_yearly: settings.price_yearly.clone(),
        }
    }

    pub fn price_for_plan(&self, plan: SubscriptionPlan) -> &str {
        match plan {
            SubscriptionPlan::Monthly => &self.price_monthly,
            SubscriptionPlan::Yearly => &self.price_yearly,
        }
    }

    /// Create a subscription-mode checkout session for a tenant purchase.
    /// The purchasing user id travels as `client_reference_id` so the
    /// checkout webhook can provision the tenant for the right account.
    pub async fn create_checkout_session(
        &self,
        user_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "subscription"),
                ("success_url", success_url),
                ("cancel_url", cancel_url),
                ("line_items[0][price]", price_id),
                ("line_items[0][quantity]", "1"),
                ("client_reference_id", user_id),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))?;

        Ok((session.id, session.url))
    }

    /// Fetch the authoritative subscription detail (status, plan interval,
    /// period end) used by checkout and invoice reconciliation.
    pub async fn get_subscription(&self, subscription_id: &str) -> Result<StripeSubscriptionDetail> {
        let url = format!(
            "https://api.stripe.com/v1/subscriptions/{}",
            subscription_id
        );
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse subscription: {}", e)))
    }

    /// Maximum age of a webhook timestamp before it's rejected (seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Verify the `stripe-signature` header against the RAW request body.
    /// The signature covers the exact bytes on the wire; re-serialized
    /// JSON would not verify.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        // Reject replayed webhooks outside the tolerance window.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Clock skew tolerance for future timestamps: 60 seconds.
        if age < -60 {
            tracing::warn!(
                "Stripe webhook rejected: timestamp in the future (age={}s)",
                age
            );
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison. The length check is not constant-time,
        // but signature length is not secret (64 hex chars for SHA-256).
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type.
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    /// The purchasing user id set at session creation.
    pub client_reference_id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

// ============ invoice.paid / invoice.payment_failed ============

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: Option<String>,
    /// Older payload shape: subscription id at the top level.
    pub subscription: Option<String>,
    /// Newer payload shape: subscription id nested under `parent`.
    pub parent: Option<StripeInvoiceParent>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<String>,
}

/// The two shapes an invoice can carry its subscription id in, resolved by
/// an explicit discriminator rather than an untyped fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceSubscriptionRef {
    /// Shape A: top-level `subscription` field.
    Direct(String),
    /// Shape B: nested under `parent.subscription_details`.
    Nested(String),
}

impl InvoiceSubscriptionRef {
    pub fn resolve(invoice: &StripeInvoice) -> Option<Self> {
        if let Some(id) = &invoice.subscription {
            return Some(InvoiceSubscriptionRef::Direct(id.clone()));
        }
        if let Some(parent) = &invoice.parent {
            if let Some(details) = &parent.subscription_details {
                if let Some(id) = &details.subscription {
                    return Some(InvoiceSubscriptionRef::Nested(id.clone()));
                }
            }
        }
        None
    }

    pub fn id(&self) -> &str {
        match self {
            InvoiceSubscriptionRef::Direct(id) | InvoiceSubscriptionRef::Nested(id) => id,
        }
    }
}

// ============ customer.subscription.updated / .deleted ============

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionEvent {
    pub id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
}

// ============ GET /v1/subscriptions/{id} ============

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionDetail {
    pub id: String,
    pub status: String,
    pub customer: Option<String>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: Option<StripePrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRecurring {
    pub interval: String,
}

impl StripeSubscriptionDetail {
    /// The plan interval from the first subscription item, if present.
    pub fn plan(&self) -> Option<SubscriptionPlan> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.recurring.as_ref())
            .and_then(|r| SubscriptionPlan::from_interval(&r.interval))
    }
}
