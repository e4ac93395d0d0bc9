//! Thin JSON endpoints for the routed page paths.
//!
//! Rendering is out of scope for this service; these handlers exist so
//! every path the authorization gate covers resolves to a real route and
//! returns the data its page needs.

use axum::extract::State;
use serde_json::{json, Value};

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::{CurrentSession, Json, MaybeSession};
use crate::models::TenantStatus;

pub async fn home() -> Json<Value> {
    Json(json!({ "page": "home" }))
}

pub async fn sign_in_page() -> Json<Value> {
    Json(json!({ "page": "sign-in" }))
}

pub async fn sign_up_page() -> Json<Value> {
    Json(json!({ "page": "sign-up" }))
}

pub async fn verify_code_page() -> Json<Value> {
    Json(json!({ "page": "verify-code" }))
}

pub async fn buy_tenant_page(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "page": "buy-tenant",
        "billing_enabled": state.stripe.is_some(),
        "plans": ["MONTHLY", "YEARLY"],
    }))
}

pub async fn success_page() -> Json<Value> {
    Json(json!({
        "page": "success",
        // Tenant provisioning happens in the checkout webhook, which may
        // still be in flight; clients poll tenant setup until it lands.
        "message": "Payment received. Your business account is being prepared.",
    }))
}

/// Distinguishes "subscription ended" from "deactivated by an
/// administrator" so support conversations start in the right place.
pub async fn tenant_inactive_page(MaybeSession(ctx): MaybeSession) -> Json<Value> {
    let reason = match ctx.as_ref().and_then(|c| c.snapshot.tenant_status) {
        Some(TenantStatus::Suspended) => "This business account was deactivated by an administrator.",
        _ => "The subscription for this business account has ended.",
    };
    Json(json!({ "page": "tenant-inactive", "reason": reason }))
}

/// The tenant-selection step for accounts with multiple memberships.
pub async fn select_tenant_page(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Value>> {
    let conn = state.db.get()?;
    let memberships = queries::list_memberships_with_tenant(&conn, &ctx.snapshot.user_id)?;
    Ok(Json(json!({
        "page": "select-tenant",
        "memberships": memberships,
    })))
}

pub async fn admin_home(CurrentSession(ctx): CurrentSession) -> Json<Value> {
    Json(json!({
        "page": "admin",
        "tenant_id": ctx.snapshot.tenant_id,
        "tenant_name": ctx.snapshot.tenant_name,
    }))
}

pub async fn manager_home(CurrentSession(ctx): CurrentSession) -> Json<Value> {
    Json(json!({
        "page": "manager",
        "tenant_id": ctx.snapshot.tenant_id,
        "tenant_name": ctx.snapshot.tenant_name,
    }))
}

pub async fn cashier_home(CurrentSession(ctx): CurrentSession) -> Json<Value> {
    Json(json!({
        "page": "cashier",
        "tenant_id": ctx.snapshot.tenant_id,
        "tenant_name": ctx.snapshot.tenant_name,
    }))
}

/// Super-admin console landing. The gate lets non-owners reach this path;
/// the role check here is the actual enforcement point.
pub async fn platform_home(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Value>> {
    ctx.require_super_admin()?;
    let conn = state.db.get()?;
    let tenants = queries::list_tenants(&conn)?;
    Ok(Json(json!({
        "page": "platform",
        "tenant_count": tenants.len(),
    })))
}
