//! Routing gate tests: the ordered guard clauses as a pure function of
//! (session state, path).

mod common;

use common::*;
use tillpoint::middleware::gate::{paths, role_home, route_request, GateDecision, SessionState};

fn base_snapshot() -> SessionSnapshot {
    SessionSnapshot {
        user_id: "tp_usr_00000000000000000000000000000001".into(),
        email: "user@example.com".into(),
        name: "User".into(),
        role: None,
        tenant_id: None,
        tenant_name: None,
        tenant_status: None,
        subscription_status: None,
        subscription_end_date: None,
        verified: true,
        billing_customer_id: None,
        super_admin: false,
        needs_tenant_selection: false,
    }
}

fn with_role(role: SessionRole) -> SessionSnapshot {
    let mut s = base_snapshot();
    s.role = Some(role);
    if role == SessionRole::SuperAdmin {
        s.super_admin = true;
    } else {
        s.tenant_id = Some("tp_tnt_00000000000000000000000000000001".into());
        s.tenant_name = Some("Shop".into());
        s.tenant_status = Some(TenantStatus::Active);
        s.subscription_status = Some("ACTIVE".into());
    }
    s
}

fn decide(snapshot: &SessionSnapshot, path: &str) -> GateDecision {
    route_request(SessionState::Active(snapshot), path, now())
}

// ============ Guard 1: expiry ============

#[test]
fn test_expired_session_redirects_to_sign_in_even_on_public_paths() {
    for path in ["/", "/admin", "/buy-tenant", "/cashier/sales"] {
        assert_eq!(
            route_request(SessionState::Expired, path, now()),
            GateDecision::Redirect(paths::SIGN_IN),
            "path {}",
            path
        );
    }
}

// ============ Guard 2: auth-page bounce ============

#[test]
fn test_signed_in_user_bounced_off_auth_pages() {
    let owner = with_role(SessionRole::Owner);
    for path in ["/sign-in", "/sign-up", "/verify-code"] {
        assert_eq!(decide(&owner, path), GateDecision::Redirect(paths::ADMIN_HOME));
    }

    let cashier = with_role(SessionRole::Cashier);
    assert_eq!(
        decide(&cashier, "/sign-in"),
        GateDecision::Redirect(paths::CASHIER_HOME)
    );
}

#[test]
fn test_no_tenant_user_bounced_from_auth_pages_to_buy_tenant() {
    let s = base_snapshot();
    assert_eq!(decide(&s, "/sign-in"), GateDecision::Redirect(paths::BUY_TENANT));
}

// ============ Guard 3: home bounce ============

#[test]
fn test_role_bearing_session_bounced_from_home() {
    assert_eq!(
        decide(&with_role(SessionRole::Owner), "/"),
        GateDecision::Redirect(paths::ADMIN_HOME)
    );
    assert_eq!(
        decide(&with_role(SessionRole::Manager), "/"),
        GateDecision::Redirect(paths::MANAGER_HOME)
    );
    assert_eq!(
        decide(&with_role(SessionRole::SuperAdmin), "/"),
        GateDecision::Redirect(paths::PLATFORM_HOME)
    );
}

#[test]
fn test_roleless_session_allowed_on_home() {
    assert_eq!(decide(&base_snapshot(), "/"), GateDecision::Allow);
}

// ============ Guards 4-5: public allow-list, anonymous rejection ============

#[test]
fn test_anonymous_allowed_on_public_paths() {
    for path in [
        "/",
        "/sign-in",
        "/sign-up",
        "/verify-code",
        "/buy-tenant",
        "/success",
        "/tenant-inactive",
    ] {
        assert_eq!(
            route_request(SessionState::Anonymous, path, now()),
            GateDecision::Allow,
            "path {}",
            path
        );
    }
}

#[test]
fn test_anonymous_rejected_on_protected_paths() {
    for path in ["/admin", "/manager/products", "/cashier", "/select-tenant"] {
        assert_eq!(
            route_request(SessionState::Anonymous, path, now()),
            GateDecision::Redirect(paths::SIGN_IN),
            "path {}",
            path
        );
    }
}

// ============ Guard 6: verification gate ============

#[test]
fn test_unverified_session_redirected_from_any_protected_path() {
    let mut s = with_role(SessionRole::Owner);
    s.verified = false;

    for path in ["/admin", "/admin/products", "/manager/sales", "/select-tenant"] {
        assert_eq!(
            decide(&s, path),
            GateDecision::Redirect(paths::VERIFY_CODE),
            "path {}",
            path
        );
    }
}

#[test]
fn test_verification_gate_precedes_tenant_inactive_gate() {
    let mut s = with_role(SessionRole::Owner);
    s.verified = false;
    s.tenant_status = Some(TenantStatus::Inactive);

    assert_eq!(decide(&s, "/admin"), GateDecision::Redirect(paths::VERIFY_CODE));
}

// ============ Guard 7: tenant-inactive gate ============

#[test]
fn test_inactive_tenant_precedes_role_scoping() {
    let mut s = with_role(SessionRole::Owner);
    s.tenant_status = Some(TenantStatus::Inactive);
    s.subscription_status = Some("CANCELED".into());

    assert_eq!(
        decide(&s, "/admin/products"),
        GateDecision::Redirect(paths::TENANT_INACTIVE)
    );
}

#[test]
fn test_computed_inactive_expired_end_date_with_active_status_string() {
    // Stored status says ACTIVE, but the end date has passed: the
    // disjunction must still route as inactive.
    let mut s = with_role(SessionRole::Owner);
    s.subscription_status = Some("ACTIVE".into());
    s.subscription_end_date = end_date_to_iso(Some(past_timestamp(1)));

    assert_eq!(
        decide(&s, "/admin/products"),
        GateDecision::Redirect(paths::TENANT_INACTIVE)
    );
}

#[test]
fn test_suspended_tenant_routed_to_tenant_inactive() {
    let mut s = with_role(SessionRole::Cashier);
    s.tenant_status = Some(TenantStatus::Suspended);

    assert_eq!(
        decide(&s, "/cashier"),
        GateDecision::Redirect(paths::TENANT_INACTIVE)
    );
}

#[test]
fn test_active_subscription_with_future_end_date_passes() {
    let mut s = with_role(SessionRole::Owner);
    s.subscription_end_date = end_date_to_iso(Some(future_timestamp(30)));

    assert_eq!(decide(&s, "/admin"), GateDecision::Allow);
}

#[test]
fn test_inactive_tenant_can_still_reach_tenant_inactive_page() {
    let mut s = with_role(SessionRole::Owner);
    s.tenant_status = Some(TenantStatus::Inactive);

    assert_eq!(decide(&s, "/tenant-inactive"), GateDecision::Allow);
}

// ============ Guard 8: super-admin routing ============

#[test]
fn test_super_admin_allowed_on_admin_paths() {
    let s = with_role(SessionRole::SuperAdmin);
    assert_eq!(decide(&s, "/admin"), GateDecision::Allow);
    assert_eq!(decide(&s, "/admin/platform"), GateDecision::Allow);
    assert_eq!(decide(&s, "/admin/platform/tenants"), GateDecision::Allow);
}

#[test]
fn test_super_admin_redirected_to_console_from_other_paths() {
    let s = with_role(SessionRole::SuperAdmin);
    for path in ["/manager", "/cashier/sales", "/select-tenant", "/tenant-setup"] {
        assert_eq!(
            decide(&s, path),
            GateDecision::Redirect(paths::PLATFORM_HOME),
            "path {}",
            path
        );
    }
}

#[test]
fn test_super_admin_with_null_tenant_never_sent_to_buy_tenant() {
    // Tenant-less by design: the no-tenant gate must not apply.
    let s = with_role(SessionRole::SuperAdmin);
    assert!(s.tenant_id.is_none());

    for path in ["/admin", "/manager", "/cashier", "/admin/platform/tenants"] {
        assert_ne!(
            decide(&s, path),
            GateDecision::Redirect(paths::BUY_TENANT),
            "path {}",
            path
        );
    }
}

// ============ Guard 9: no-tenant gate ============

#[test]
fn test_no_tenant_user_redirected_to_buy_tenant() {
    let s = base_snapshot();
    for path in ["/admin", "/manager", "/cashier/sales"] {
        assert_eq!(
            decide(&s, path),
            GateDecision::Redirect(paths::BUY_TENANT),
            "path {}",
            path
        );
    }
}

#[test]
fn test_no_tenant_user_allowed_on_setup_and_success() {
    let s = base_snapshot();
    assert_eq!(decide(&s, "/tenant-setup"), GateDecision::Allow);
    assert_eq!(decide(&s, "/success"), GateDecision::Allow);
}

#[test]
fn test_multi_tenant_user_without_selection_sent_to_select_tenant() {
    let mut s = base_snapshot();
    s.needs_tenant_selection = true;

    assert_eq!(decide(&s, "/admin"), GateDecision::Redirect(paths::SELECT_TENANT));
    assert_eq!(decide(&s, "/select-tenant"), GateDecision::Allow);
}

// ============ Guards 10-11: role confinement ============

#[test]
fn test_cashier_confined_to_cashier_paths() {
    let s = with_role(SessionRole::Cashier);

    // /admin/users must never pass for a cashier.
    assert_eq!(
        decide(&s, "/admin/users"),
        GateDecision::Redirect(paths::CASHIER_HOME)
    );
    assert_eq!(
        decide(&s, "/manager/products"),
        GateDecision::Redirect(paths::CASHIER_HOME)
    );
    assert_eq!(
        decide(&s, "/select-tenant"),
        GateDecision::Redirect(paths::CASHIER_HOME)
    );
    assert_eq!(decide(&s, "/cashier"), GateDecision::Allow);
    assert_eq!(decide(&s, "/cashier/sales"), GateDecision::Allow);
}

#[test]
fn test_manager_confined_to_manager_paths() {
    let s = with_role(SessionRole::Manager);

    assert_eq!(
        decide(&s, "/admin/products"),
        GateDecision::Redirect(paths::MANAGER_HOME)
    );
    assert_eq!(
        decide(&s, "/cashier"),
        GateDecision::Redirect(paths::MANAGER_HOME)
    );
    assert_eq!(decide(&s, "/manager"), GateDecision::Allow);
    assert_eq!(decide(&s, "/manager/sales"), GateDecision::Allow);
}

#[test]
fn test_owner_confined_to_admin_paths() {
    let s = with_role(SessionRole::Owner);

    assert_eq!(decide(&s, "/manager"), GateDecision::Redirect(paths::ADMIN_HOME));
    assert_eq!(decide(&s, "/cashier"), GateDecision::Redirect(paths::ADMIN_HOME));
    assert_eq!(decide(&s, "/tenant-setup"), GateDecision::Redirect(paths::ADMIN_HOME));
    assert_eq!(decide(&s, "/admin"), GateDecision::Allow);
    assert_eq!(decide(&s, "/admin/products"), GateDecision::Allow);
    assert_eq!(decide(&s, "/admin/employees"), GateDecision::Allow);
}

#[test]
fn test_role_home_targets() {
    assert_eq!(role_home(&with_role(SessionRole::Owner)), paths::ADMIN_HOME);
    assert_eq!(role_home(&with_role(SessionRole::Manager)), paths::MANAGER_HOME);
    assert_eq!(role_home(&with_role(SessionRole::Cashier)), paths::CASHIER_HOME);
    assert_eq!(
        role_home(&with_role(SessionRole::SuperAdmin)),
        paths::PLATFORM_HOME
    );
    assert_eq!(role_home(&base_snapshot()), paths::BUY_TENANT);
}
