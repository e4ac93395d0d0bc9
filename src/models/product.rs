use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// A catalog item. Always scoped by tenant; barcode is unique per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub barcode: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub barcode: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
}

impl CreateProduct {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        if self.price_cents < 0 {
            return Err(AppError::BadRequest("Price cannot be negative".into()));
        }
        if self.stock < 0 {
            return Err(AppError::BadRequest("Stock cannot be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl UpdateProduct {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
            }
        }
        if matches!(self.price_cents, Some(p) if p < 0) {
            return Err(AppError::BadRequest("Price cannot be negative".into()));
        }
        if matches!(self.stock, Some(s) if s < 0) {
            return Err(AppError::BadRequest("Stock cannot be negative".into()));
        }
        Ok(())
    }
}
