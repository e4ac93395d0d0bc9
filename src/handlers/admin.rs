//! Administrative user and tenant management.
//!
//! Every operation re-validates the caller's role from the live session
//! snapshot - the routing gate is defense-in-depth, not the enforcement
//! point.

use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::password;
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{CurrentSession, Json, Path};
use crate::models::{CreateEmployee, EmployeeWithRole, SetTenantStatus, Tenant};

/// Provision a new employee (manager or cashier) under the caller's own
/// tenant. The tenant always comes from the session snapshot - a
/// client-supplied tenant id is never honored.
pub async fn create_employee(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<CreateEmployee>,
) -> Result<Json<EmployeeWithRole>> {
    ctx.require_owner()?;
    input.validate()?;

    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, &input.email)?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }

    let password_hash = password::hash_password(&input.password)?;
    let user = queries::create_employee_user(&conn, &input.email, &input.name, &password_hash)?;
    let membership = queries::create_membership(&conn, &user.id, &tenant_id, input.role)?;

    tracing::info!(
        "Employee created: user={}, tenant={}, role={}",
        user.id,
        tenant_id,
        input.role.as_str()
    );

    Ok(Json(EmployeeWithRole {
        user_id: user.id,
        email: user.email,
        name: user.name,
        role: membership.role,
        verified: user.verified,
        created_at: membership.created_at,
    }))
}

/// Employees of the caller's tenant.
pub async fn list_employees(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<EmployeeWithRole>>> {
    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    let employees = queries::list_employees(&conn, &tenant_id)?;
    Ok(Json(employees))
}

/// Delete a user account.
///
/// Refused when the target is a super-admin and the caller is not, when
/// the target has recorded sales (referential history must survive), and
/// for self-deletion.
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    ctx.require_owner_or_super_admin()?;

    if user_id == ctx.snapshot.user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".into()));
    }

    let conn = state.db.get()?;

    let target = queries::get_user_by_id(&conn, &user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if target.super_admin && !ctx.snapshot.super_admin {
        return Err(AppError::Forbidden("Cannot delete a super-admin account".into()));
    }

    // Owners can only delete users inside their own tenant.
    if !ctx.snapshot.super_admin {
        let tenant_id = ctx.tenant_id()?;
        queries::get_membership(&conn, &target.id, tenant_id)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    }

    let sales = queries::count_user_sales(&conn, &target.id)?;
    if sales > 0 {
        return Err(AppError::Conflict(format!(
            "User has {} recorded sales and cannot be deleted",
            sales
        )));
    }

    queries::delete_user(&conn, &target.id)?;

    tracing::info!("User deleted: target={}, by={}", target.id, ctx.snapshot.user_id);

    Ok(Json(json!({ "deleted": true })))
}

// ============ Platform console (super-admin only) ============

pub async fn list_tenants(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<Tenant>>> {
    ctx.require_super_admin()?;
    let conn = state.db.get()?;
    Ok(Json(queries::list_tenants(&conn)?))
}

/// Manual tenant status override (activate / suspend).
pub async fn set_tenant_status(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(tenant_id): Path<String>,
    Json(input): Json<SetTenantStatus>,
) -> Result<Json<Tenant>> {
    ctx.require_super_admin()?;

    let conn = state.db.get()?;

    if !queries::set_tenant_status(&conn, &tenant_id, input.status)? {
        return Err(AppError::NotFound("Tenant not found".into()));
    }

    tracing::info!(
        "Tenant status override: tenant={}, status={}, by={}",
        tenant_id,
        input.status.as_str(),
        ctx.snapshot.user_id
    );

    queries::get_tenant_by_id(&conn, &tenant_id)?
        .ok_or_else(|| AppError::NotFound("Tenant not found".into()))
        .map(Json)
}

pub async fn delete_tenant(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>> {
    ctx.require_super_admin()?;

    let conn = state.db.get()?;

    if !queries::delete_tenant(&conn, &tenant_id)? {
        return Err(AppError::NotFound("Tenant not found".into()));
    }

    tracing::info!("Tenant deleted: tenant={}, by={}", tenant_id, ctx.snapshot.user_id);

    Ok(Json(json!({ "deleted": true })))
}
