//! Tenant-scoped product and customer CRUD.
//!
//! The tenant id always comes from the verified session snapshot, never
//! from client input. Writes require owner or manager; cashiers read.

use axum::extract::State;
use serde_json::{json, Value};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{CurrentSession, Json, Path};
use crate::models::{CreateCustomer, CreateProduct, Customer, Product, UpdateProduct};

pub async fn create_product(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<CreateProduct>,
) -> Result<Json<Product>> {
    ctx.require_catalog_write()?;
    input.validate()?;

    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    let product = queries::create_product(&conn, &tenant_id, &input)?;
    Ok(Json(product))
}

pub async fn list_products(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<Product>>> {
    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    Ok(Json(queries::list_products(&conn, &tenant_id)?))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(product_id): Path<String>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    ctx.require_catalog_write()?;
    input.validate()?;

    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    queries::update_product(&conn, &tenant_id, &product_id, &input)?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
        .map(Json)
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    ctx.require_catalog_write()?;

    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    if !queries::delete_product(&conn, &tenant_id, &product_id)? {
        return Err(AppError::NotFound("Product not found".into()));
    }
    Ok(Json(json!({ "deleted": true })))
}

pub async fn create_customer(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<CreateCustomer>,
) -> Result<Json<Customer>> {
    input.validate()?;

    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    let customer = queries::create_customer(&conn, &tenant_id, &input)?;
    Ok(Json(customer))
}

pub async fn list_customers(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<Customer>>> {
    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    Ok(Json(queries::list_customers(&conn, &tenant_id)?))
}
