//! Sales: the one flow needing true read-modify-write consistency.

use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::{CurrentSession, Json};
use crate::models::{CreateSale, Sale, SaleWithItems};

/// Record a sale. Sale row, line items and stock decrements commit in one
/// transaction; insufficient stock on any line rolls back the whole sale.
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
    Json(input): Json<CreateSale>,
) -> Result<Json<SaleWithItems>> {
    input.validate()?;

    let tenant_id = ctx.tenant_id()?.to_string();
    let cashier_id = ctx.snapshot.user_id.clone();

    let mut conn = state.db.get()?;
    let sale = queries::create_sale(&mut conn, &tenant_id, &cashier_id, &input)?;

    tracing::info!(
        "Sale recorded: sale={}, tenant={}, total_cents={}",
        sale.sale.id,
        tenant_id,
        sale.sale.total_cents
    );

    Ok(Json(sale))
}

pub async fn list_sales(
    State(state): State<AppState>,
    CurrentSession(ctx): CurrentSession,
) -> Result<Json<Vec<Sale>>> {
    let tenant_id = ctx.tenant_id()?.to_string();
    let conn = state.db.get()?;
    Ok(Json(queries::list_sales(&conn, &tenant_id)?))
}
