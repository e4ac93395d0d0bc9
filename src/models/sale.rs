use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub cashier_id: String,
    pub customer_id: Option<String>,
    pub total_cents: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for the one flow that requires true read-modify-write
/// consistency: sale creation decrements stock atomically.
#[derive(Debug, Deserialize)]
pub struct CreateSale {
    pub customer_id: Option<String>,
    pub items: Vec<CreateSaleItem>,
}

impl CreateSale {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(AppError::BadRequest("A sale needs at least one item".into()));
        }
        if self.items.iter().any(|i| i.quantity <= 0) {
            return Err(AppError::BadRequest("Item quantity must be positive".into()));
        }
        Ok(())
    }
}

/// A sale with its line items, as returned by the sales endpoints.
#[derive(Debug, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}
