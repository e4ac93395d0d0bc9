//! Tenant purchase: checkout initiation against the billing provider.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{msg, AppError, Result};
use crate::extractors::{CurrentSession, Json};
use crate::models::SubscriptionPlan;

#[derive(Debug, Deserialize)]
pub struct StartCheckoutRequest {
    pub plan: SubscriptionPlan,
}

#[derive(Debug, Serialize)]
pub struct StartCheckoutResponse {
    pub checkout_session_id: String,
    pub checkout_url: String,
}

/// Start a subscription checkout for the signed-in user. The tenant itself
/// is created later, by the checkout-completed webhook.
pub async fn start_checkout(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<StartCheckoutRequest>,
) -> Result<Json<StartCheckoutResponse>> {
    let Some(stripe) = &state.stripe else {
        return Err(AppError::Internal(msg::BILLING_NOT_CONFIGURED.into()));
    };

    let success_url = format!("{}/success", state.base_url);
    let cancel_url = format!("{}/buy-tenant", state.base_url);

    let (checkout_session_id, checkout_url) = stripe
        .create_checkout_session(
            &ctx.snapshot.user_id,
            stripe.price_for_plan(input.plan),
            &success_url,
            &cancel_url,
        )
        .await?;

    tracing::info!(
        "Checkout started: user={}, plan={}",
        ctx.snapshot.user_id,
        input.plan.as_str()
    );

    Ok(Json(StartCheckoutResponse {
        checkout_session_id,
        checkout_url,
    }))
}
