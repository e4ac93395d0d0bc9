//! Prefixed ID generation for tillpoint entities.
//!
//! All IDs use a `tp_` brand prefix to guarantee collision avoidance with
//! billing provider IDs (Stripe's `cus_`, `sub_`, `price_`, etc.).
//!
//! Format: `tp_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &[
    "tp_usr_",
    "tp_tnt_",
    "tp_mem_",
    "tp_prod_",
    "tp_cust_",
    "tp_sale_",
    "tp_item_",
];

/// Validate that a string is a valid tillpoint prefixed ID.
///
/// Cheap check to reject garbage before hitting the database.
/// Validates format: `tp_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];

    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in tillpoint.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Tenant,
    Membership,
    Product,
    Customer,
    Sale,
    SaleItem,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "tp_usr",
            Self::Tenant => "tp_tnt",
            Self::Membership => "tp_mem",
            Self::Product => "tp_prod",
            Self::Customer => "tp_cust",
            Self::Sale => "tp_sale",
            Self::SaleItem => "tp_item",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
