use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Owner,
    Manager,
    Cashier,
}

impl TenantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantRole::Owner => "owner",
            TenantRole::Manager => "manager",
            TenantRole::Cashier => "cashier",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(TenantRole::Owner),
            "manager" => Some(TenantRole::Manager),
            "cashier" => Some(TenantRole::Cashier),
            _ => None,
        }
    }

    /// Owners and managers can write catalog data; cashiers only read.
    pub fn can_manage_catalog(&self) -> bool {
        matches!(self, TenantRole::Owner | TenantRole::Manager)
    }
}

/// Grants a user a role within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub role: TenantRole,
    pub created_at: i64,
}

/// A membership joined with its tenant row, as the session refresher
/// consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipWithTenant {
    pub membership_id: String,
    pub tenant_id: String,
    pub role: TenantRole,
    pub tenant_name: String,
    pub tenant_status: crate::models::TenantStatus,
    pub subscription_status: String,
    pub subscription_end_date: Option<i64>,
}
