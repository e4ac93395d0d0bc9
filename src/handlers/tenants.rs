//! Tenant provisioning flow: post-checkout setup and the explicit
//! active-tenant selection.

use axum::extract::State;

use crate::auth::session;
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{CurrentSession, Json};
use crate::handlers::auth::SessionResponse;
use crate::models::{SetupTenant, SwitchTenantRequest, Tenant};

/// Update the descriptive fields of the caller's owned tenant.
///
/// The owner membership is created by the checkout webhook; when it has
/// not landed yet this fails with `NoTenantFound`, which callers should
/// treat as retryable-after-delay rather than fatal.
pub async fn setup_tenant(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<SetupTenant>,
) -> Result<Json<Tenant>> {
    input.validate()?;

    let conn = state.db.get()?;

    let membership = queries::get_owner_membership_with_tenant(&conn, &ctx.snapshot.user_id)?
        .ok_or(AppError::NoTenantFound)?;

    let tenant = queries::setup_tenant_profile(&conn, &membership.tenant_id, &input)?
        .ok_or(AppError::NoTenantFound)?;

    tracing::info!(
        "Tenant setup: tenant={}, owner={}",
        tenant.id,
        ctx.snapshot.user_id
    );

    Ok(Json(tenant))
}

/// The caller's owned tenant, for the admin console settings page.
pub async fn get_own_tenant(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Tenant>> {
    let conn = state.db.get()?;

    let membership = queries::get_owner_membership_with_tenant(&conn, &ctx.snapshot.user_id)?
        .ok_or(AppError::NoTenantFound)?;
    let tenant = queries::get_tenant_by_id(&conn, &membership.tenant_id)?
        .ok_or(AppError::NoTenantFound)?;

    Ok(Json(tenant))
}

/// Set the active-tenant pointer. The caller must hold a membership in the
/// target tenant; nothing is ever guessed from ordering.
///
/// Returns a re-issued token so the new selection takes effect without
/// waiting for the next request's refresh.
pub async fn switch_tenant(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<SwitchTenantRequest>,
) -> Result<Json<SessionResponse>> {
    let conn = state.db.get()?;

    queries::get_membership(&conn, &ctx.snapshot.user_id, &input.tenant_id)?
        .ok_or_else(|| AppError::Forbidden("Not a member of that tenant".into()))?;

    queries::set_current_tenant(&conn, &ctx.snapshot.user_id, Some(&input.tenant_id))?;

    let user = queries::get_user_by_id(&conn, &ctx.snapshot.user_id)?
        .ok_or(AppError::Unauthorized)?;
    let snapshot = session::snapshot_for_user(&conn, &user)?;
    let token = session::issue_session(&state.session_key, &snapshot, state.session_ttl_mins)?;

    tracing::info!(
        "Tenant switched: user={}, tenant={}",
        ctx.snapshot.user_id,
        input.tenant_id
    );

    Ok(Json(SessionResponse { token, session: snapshot }))
}
