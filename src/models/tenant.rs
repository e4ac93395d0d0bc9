use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// Tenant operating status. ACTIVE/INACTIVE are derived from the
/// subscription by the webhook reconciler; SUSPENDED is a manual admin
/// override and is never written by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "ACTIVE",
            TenantStatus::Inactive => "INACTIVE",
            TenantStatus::Suspended => "SUSPENDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(TenantStatus::Active),
            "INACTIVE" => Some(TenantStatus::Inactive),
            "SUSPENDED" => Some(TenantStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    Monthly,
    Yearly,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Monthly => "MONTHLY",
            SubscriptionPlan::Yearly => "YEARLY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MONTHLY" => Some(SubscriptionPlan::Monthly),
            "YEARLY" => Some(SubscriptionPlan::Yearly),
            _ => None,
        }
    }

    /// Maps a billing-provider recurring interval ("month"/"year") to a plan.
    pub fn from_interval(interval: &str) -> Option<Self> {
        match interval {
            "month" => Some(SubscriptionPlan::Monthly),
            "year" => Some(SubscriptionPlan::Yearly),
            _ => None,
        }
    }
}

/// Whether a provider subscription status string (upper-cased mirror)
/// keeps the tenant operational. The single derivation point for the
/// `tenant.status` / `subscription_status` pair.
pub fn subscription_activates(subscription_status: &str) -> bool {
    matches!(subscription_status, "ACTIVE" | "TRIALING")
}

/// A business account. Created exactly once per successful checkout by the
/// webhook reconciler; subscription fields are mutated exclusively by the
/// reconciler afterwards (plus the rare manual admin status override).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub status: TenantStatus,
    /// Upper-cased mirror of the billing provider's subscription status
    /// (ACTIVE, TRIALING, PAST_DUE, CANCELED, UNPAID, INACTIVE, ...).
    pub subscription_status: String,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub subscription_end_date: Option<i64>,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Descriptive fields set by the tenant setup flow after checkout.
#[derive(Debug, Deserialize)]
pub struct SetupTenant {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo_url: Option<String>,
}

impl SetupTenant {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SetTenantStatus {
    pub status: TenantStatus,
}

#[derive(Debug, Deserialize)]
pub struct SwitchTenantRequest {
    pub tenant_id: String,
}
