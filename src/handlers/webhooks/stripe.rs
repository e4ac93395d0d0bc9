//! Stripe webhook endpoint: raw-body signature verification, payload
//! parsing into provider-agnostic billing events, and dispatch to the
//! reconciler.
//!
//! Response contract: 200 `{"received":true}` on successful (possibly
//! no-op) processing, 400 on signature failure, 500 on handler errors -
//! the 500 deliberately triggers provider redelivery, which is safe
//! because the reconciler is idempotent.

use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde_json::json;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::payments::{
    InvoiceSubscriptionRef, StripeCheckoutSession, StripeInvoice, StripeSubscriptionEvent,
    StripeWebhookEvent,
};

use super::reconciler::{
    apply_checkout_completed, apply_invoice_paid, apply_invoice_payment_failed,
    apply_subscription_changed, BillingEvent, SubscriptionState,
};

/// Parse a Stripe webhook payload into a [`BillingEvent`].
///
/// Events missing required fields are logged and mapped to `Ignored` (the
/// provider must not retry them); a payload whose object cannot be parsed
/// at all is a 400.
pub fn parse_event(event: &StripeWebhookEvent) -> Result<BillingEvent> {
    match event.event_type.as_str() {
        "checkout.session.completed" => parse_checkout_completed(event),
        "invoice.paid" => parse_invoice(event, false),
        "invoice.payment_failed" => parse_invoice(event, true),
        "customer.subscription.updated" => parse_subscription_changed(event, None),
        "customer.subscription.deleted" => parse_subscription_changed(event, Some("canceled")),
        other => {
            tracing::debug!("Ignoring Stripe event type: {}", other);
            Ok(BillingEvent::Ignored("Event ignored"))
        }
    }
}

fn parse_checkout_completed(event: &StripeWebhookEvent) -> Result<BillingEvent> {
    let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| AppError::MalformedWebhookEvent(format!("Invalid checkout session: {}", e)))?;

    if session.payment_status != "paid" {
        return Ok(BillingEvent::Ignored("Checkout not paid"));
    }

    // A checkout must identify the purchasing user, the billing customer
    // and the subscription; anything less is logged and dropped.
    let (user_id, customer_id, subscription_id) = match (
        session.client_reference_id,
        session.customer,
        session.subscription,
    ) {
        (Some(u), Some(c), Some(s)) => (u, c, s),
        _ => {
            tracing::warn!(
                "Checkout session {} missing user/customer/subscription, dropping",
                session.id
            );
            return Ok(BillingEvent::Ignored("Incomplete checkout session"));
        }
    };

    Ok(BillingEvent::CheckoutCompleted {
        user_id,
        customer_id,
        subscription_id,
    })
}

fn parse_invoice(event: &StripeWebhookEvent, failed: bool) -> Result<BillingEvent> {
    let invoice: StripeInvoice = serde_json::from_value(event.data.object.clone())
        .map_err(|e| AppError::MalformedWebhookEvent(format!("Invalid invoice: {}", e)))?;

    let Some(subscription_ref) = InvoiceSubscriptionRef::resolve(&invoice) else {
        tracing::warn!("Invoice {} carries no subscription id, dropping", invoice.id);
        return Ok(BillingEvent::Ignored("Invoice without subscription"));
    };

    if failed {
        return Ok(BillingEvent::InvoicePaymentFailed { subscription_ref });
    }

    let Some(customer_id) = invoice.customer else {
        tracing::warn!("Invoice {} carries no customer id, dropping", invoice.id);
        return Ok(BillingEvent::Ignored("Invoice without customer"));
    };

    Ok(BillingEvent::InvoicePaid {
        subscription_ref,
        customer_id,
    })
}

fn parse_subscription_changed(
    event: &StripeWebhookEvent,
    forced_status: Option<&str>,
) -> Result<BillingEvent> {
    let subscription: StripeSubscriptionEvent = serde_json::from_value(event.data.object.clone())
        .map_err(|e| AppError::MalformedWebhookEvent(format!("Invalid subscription: {}", e)))?;

    Ok(BillingEvent::SubscriptionChanged {
        subscription_id: subscription.id,
        status: forced_status
            .map(|s| s.to_string())
            .unwrap_or(subscription.status),
        period_end: subscription.current_period_end,
    })
}

/// Axum handler for `POST /webhook/stripe`.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let Some(stripe) = &state.stripe else {
        // No config means no secret to verify against. Acknowledge so the
        // provider does not retry-storm a misconfigured deployment.
        tracing::warn!("Stripe webhook received but billing is not configured");
        return Ok(Json(json!({ "received": true })));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::SignatureVerificationFailed)?;

    // Verification runs on the unparsed byte stream before any handler.
    match stripe.verify_webhook_signature(&body, signature) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::SignatureVerificationFailed),
        Err(_) => return Err(AppError::SignatureVerificationFailed),
    }

    let event: StripeWebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::MalformedWebhookEvent(format!("Invalid JSON: {}", e)))?;

    let ack = match parse_event(&event)? {
        BillingEvent::CheckoutCompleted {
            user_id,
            customer_id,
            subscription_id,
        } => {
            let detail = stripe.get_subscription(&subscription_id).await?;
            let sub_state = SubscriptionState::from(&detail);
            let mut conn = state.db.get()?;
            apply_checkout_completed(
                &mut conn,
                &user_id,
                &customer_id,
                &subscription_id,
                &sub_state,
            )?
        }
        BillingEvent::InvoicePaid {
            subscription_ref,
            customer_id,
        } => {
            let detail = stripe.get_subscription(subscription_ref.id()).await?;
            let sub_state = SubscriptionState::from(&detail);
            let conn = state.db.get()?;
            apply_invoice_paid(&conn, &customer_id, &sub_state)?
        }
        BillingEvent::InvoicePaymentFailed { subscription_ref } => {
            let conn = state.db.get()?;
            apply_invoice_payment_failed(&conn, subscription_ref.id())?
        }
        BillingEvent::SubscriptionChanged {
            subscription_id,
            status,
            period_end,
        } => {
            let conn = state.db.get()?;
            apply_subscription_changed(&conn, &subscription_id, &status, period_end)?
        }
        BillingEvent::Ignored(reason) => reason,
    };

    tracing::debug!("Stripe webhook acknowledged: {}", ack);
    Ok(Json(json!({ "received": true })))
}
