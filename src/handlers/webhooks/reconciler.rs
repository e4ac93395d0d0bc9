//! Subscription reconciliation: applies billing events to the tenant
//! store.
//!
//! Every handler is a full overwrite of the derived subscription fields,
//! never an increment, so redelivered events are idempotent. Tenant
//! creation is additionally keyed on the unique billing-subscription id.
//! Tenant status is always derived from subscription status in one place
//! (`subscription_activates`).

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::SubscriptionPlan;
use crate::payments::{InvoiceSubscriptionRef, StripeSubscriptionDetail};

/// Provider-agnostic billing event, parsed from the webhook payload.
#[derive(Debug)]
pub enum BillingEvent {
    /// Initial checkout completed - the only transition that creates a
    /// tenant.
    CheckoutCompleted {
        user_id: String,
        customer_id: String,
        subscription_id: String,
    },
    /// Invoice paid - refresh the tenant matched by billing-customer id
    /// from live subscription detail.
    InvoicePaid {
        subscription_ref: InvoiceSubscriptionRef,
        customer_id: String,
    },
    /// Invoice payment failed - PAST_DUE/INACTIVE unconditionally.
    InvoicePaymentFailed {
        subscription_ref: InvoiceSubscriptionRef,
    },
    /// Subscription updated or deleted - status and period end come
    /// straight from the event payload, no extra fetch.
    SubscriptionChanged {
        subscription_id: String,
        status: String,
        period_end: Option<i64>,
    },
    /// Event types not relevant here, or events missing required fields
    /// (logged and acknowledged so the provider does not retry).
    Ignored(&'static str),
}

/// Authoritative subscription state, as fetched from the provider or read
/// from an event payload. Status is the upper-cased mirror stored on the
/// tenant.
#[derive(Debug, Clone)]
pub struct SubscriptionState {
    pub status: String,
    pub plan: Option<SubscriptionPlan>,
    pub period_end: Option<i64>,
}

impl From<&StripeSubscriptionDetail> for SubscriptionState {
    fn from(detail: &StripeSubscriptionDetail) -> Self {
        SubscriptionState {
            status: detail.status.to_uppercase(),
            plan: detail.plan(),
            period_end: detail.current_period_end,
        }
    }
}

/// Convert a completed checkout into a tenant with the purchaser as owner.
/// Redelivery is a no-op: creation is keyed on the unique
/// billing-subscription id.
pub fn apply_checkout_completed(
    conn: &mut Connection,
    user_id: &str,
    customer_id: &str,
    subscription_id: &str,
    state: &SubscriptionState,
) -> Result<&'static str> {
    let Some(user) = queries::get_user_by_id(conn, user_id)? else {
        tracing::warn!(
            "Checkout completed for unknown user {}, dropping event",
            user_id
        );
        return Ok("Unknown user");
    };

    let name = format!("{}'s store", user.name);
    match queries::provision_tenant(
        conn,
        &user.id,
        &name,
        customer_id,
        subscription_id,
        &state.status,
        state.plan,
        state.period_end,
    )? {
        Some(tenant) => {
            tracing::info!(
                "Tenant provisioned: tenant={}, owner={}, subscription={}, status={}",
                tenant.id,
                user.id,
                subscription_id,
                state.status
            );
            Ok("Tenant provisioned")
        }
        None => {
            tracing::info!(
                "Checkout redelivered for subscription {}, tenant already exists",
                subscription_id
            );
            Ok("Already provisioned")
        }
    }
}

/// Refresh the tenant matched by billing-customer id from live
/// subscription detail. Tolerates the tenant not existing yet (the
/// checkout event may still be in flight).
pub fn apply_invoice_paid(
    conn: &Connection,
    customer_id: &str,
    state: &SubscriptionState,
) -> Result<&'static str> {
    let updated = queries::update_subscription_by_customer(
        conn,
        customer_id,
        &state.status,
        state.plan,
        state.period_end,
    )?;

    if updated == 0 {
        tracing::warn!(
            "Invoice paid for customer {} but no tenant found yet (checkout race?)",
            customer_id
        );
        return Ok("Tenant not found");
    }

    tracing::info!(
        "Invoice paid: customer={}, status={}, period_end={:?}",
        customer_id,
        state.status,
        state.period_end
    );
    Ok("OK")
}

/// A failed invoice marks the tenant past-due and inactive, no fetch
/// needed. The plan is left untouched.
pub fn apply_invoice_payment_failed(
    conn: &Connection,
    subscription_id: &str,
) -> Result<&'static str> {
    let updated = queries::mark_past_due_by_subscription(conn, subscription_id)?;

    if updated == 0 {
        tracing::warn!(
            "Invoice payment failed for subscription {} but no tenant found",
            subscription_id
        );
        return Ok("Tenant not found");
    }

    tracing::info!(
        "Invoice payment failed: subscription={}, tenant marked PAST_DUE/INACTIVE",
        subscription_id
    );
    Ok("OK")
}

/// Subscription updated/deleted: overwrite status and period end from the
/// payload and re-derive tenant activity.
pub fn apply_subscription_changed(
    conn: &Connection,
    subscription_id: &str,
    status: &str,
    period_end: Option<i64>,
) -> Result<&'static str> {
    let status = status.to_uppercase();
    let updated =
        queries::update_subscription_by_subscription(conn, subscription_id, &status, period_end)?;

    if updated == 0 {
        tracing::warn!(
            "Subscription change for {} but no tenant found",
            subscription_id
        );
        return Ok("Tenant not found");
    }

    tracing::info!(
        "Subscription changed: subscription={}, status={}, period_end={:?}",
        subscription_id,
        status,
        period_end
    );
    Ok("OK")
}
