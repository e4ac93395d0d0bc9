use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::models::TenantStatus;

/// The role carried in a session snapshot. Tenant roles come from the
/// active membership; `SuperAdmin` is tenant-less by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRole {
    #[serde(rename = "superAdmin")]
    SuperAdmin,
    #[serde(rename = "owner")]
    Owner,
    #[serde(rename = "manager")]
    Manager,
    #[serde(rename = "cashier")]
    Cashier,
}

impl From<crate::models::TenantRole> for SessionRole {
    fn from(role: crate::models::TenantRole) -> Self {
        match role {
            crate::models::TenantRole::Owner => SessionRole::Owner,
            crate::models::TenantRole::Manager => SessionRole::Manager,
            crate::models::TenantRole::Cashier => SessionRole::Cashier,
        }
    }
}

/// Per-request snapshot of identity, role, tenant and subscription state,
/// embedded in the signed session token.
///
/// This is a cache: it is recomputed from the stores on every decode, so
/// staleness is bounded by one request. Authorization must never treat it
/// as the source of truth beyond the current request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Option<SessionRole>,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub tenant_status: Option<TenantStatus>,
    pub subscription_status: Option<String>,
    /// ISO-8601 timestamp string, or None for no end date.
    pub subscription_end_date: Option<String>,
    pub verified: bool,
    pub billing_customer_id: Option<String>,
    pub super_admin: bool,
    /// True when the user holds memberships but has not picked an active
    /// tenant yet (multi-tenant accounts require an explicit selection).
    pub needs_tenant_selection: bool,
}

impl SessionSnapshot {
    pub fn is_super_admin(&self) -> bool {
        self.role == Some(SessionRole::SuperAdmin)
    }

    /// Computed-inactive check: the subscription counts as inactive when
    /// the stored status says so OR the end date has passed, regardless of
    /// the status string. Must stay a disjunction.
    pub fn subscription_inactive(&self, now: i64) -> bool {
        if self.subscription_status.as_deref() == Some("INACTIVE") {
            return true;
        }
        match self.subscription_end_date.as_deref() {
            Some(iso) => match DateTime::parse_from_rfc3339(iso) {
                Ok(end) => end.timestamp() < now,
                // Unparseable end date in a token is treated as inactive
                // rather than granting access on garbage.
                Err(_) => true,
            },
            None => false,
        }
    }

    /// Whether the tenant-inactive gate should block this session:
    /// a deactivated/suspended tenant or a computed-inactive subscription.
    pub fn tenant_blocked(&self, now: i64) -> bool {
        let status_blocked = matches!(
            self.tenant_status,
            Some(TenantStatus::Inactive) | Some(TenantStatus::Suspended)
        );
        let has_tenant = self.tenant_id.is_some();
        status_blocked || (has_tenant && self.subscription_inactive(now))
    }
}

/// Serialize a unix timestamp as the ISO-8601 string carried in tokens.
pub fn end_date_to_iso(ts: Option<i64>) -> Option<String> {
    ts.and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            user_id: "tp_usr_00000000000000000000000000000001".into(),
            email: "owner@example.com".into(),
            name: "Owner".into(),
            role: Some(SessionRole::Owner),
            tenant_id: Some("tp_tnt_00000000000000000000000000000001".into()),
            tenant_name: Some("Shop".into()),
            tenant_status: Some(TenantStatus::Active),
            subscription_status: Some("ACTIVE".into()),
            subscription_end_date: None,
            verified: true,
            billing_customer_id: Some("cus_123".into()),
            super_admin: false,
            needs_tenant_selection: false,
        }
    }

    #[test]
    fn test_end_date_to_iso_round_trip() {
        let iso = end_date_to_iso(Some(1_700_000_000)).unwrap();
        let parsed = DateTime::parse_from_rfc3339(&iso).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
        assert_eq!(end_date_to_iso(None), None);
    }

    #[test]
    fn test_subscription_inactive_is_a_disjunction() {
        let now = 1_700_000_000;

        // Status string alone
        let mut s = snapshot();
        s.subscription_status = Some("INACTIVE".into());
        assert!(s.subscription_inactive(now));

        // Past end date alone, even with an ACTIVE status string
        let mut s = snapshot();
        s.subscription_status = Some("ACTIVE".into());
        s.subscription_end_date = end_date_to_iso(Some(now - 86400));
        assert!(s.subscription_inactive(now));

        // Neither
        let mut s = snapshot();
        s.subscription_end_date = end_date_to_iso(Some(now + 86400));
        assert!(!s.subscription_inactive(now));
    }

    #[test]
    fn test_tenant_blocked_on_suspension() {
        let now = 1_700_000_000;
        let mut s = snapshot();
        s.tenant_status = Some(TenantStatus::Suspended);
        assert!(s.tenant_blocked(now));
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&SessionRole::SuperAdmin).unwrap(),
            "\"superAdmin\""
        );
        assert_eq!(serde_json::to_string(&SessionRole::Cashier).unwrap(), "\"cashier\"");
    }
}
