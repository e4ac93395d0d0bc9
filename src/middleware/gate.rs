//! The routing gate: a pure, deterministic function of
//! (session state, path) -> allow | redirect.
//!
//! The gate runs once per request after the session refresh and performs
//! no I/O itself. It is an ordered sequence of guard clauses; earlier
//! guards always take precedence. Authorization problems never surface as
//! errors here - the failure mode is always a redirect.

use crate::models::{SessionRole, SessionSnapshot};

pub mod paths {
    pub const HOME: &str = "/";
    pub const SIGN_IN: &str = "/sign-in";
    pub const SIGN_UP: &str = "/sign-up";
    pub const VERIFY_CODE: &str = "/verify-code";
    pub const BUY_TENANT: &str = "/buy-tenant";
    pub const SUCCESS: &str = "/success";
    pub const TENANT_INACTIVE: &str = "/tenant-inactive";
    pub const SELECT_TENANT: &str = "/select-tenant";
    pub const TENANT_SETUP: &str = "/tenant-setup";
    pub const ADMIN_HOME: &str = "/admin";
    pub const MANAGER_HOME: &str = "/manager";
    pub const CASHIER_HOME: &str = "/cashier";
    /// Super-admin console. Admin-prefixed on purpose: super-admins are
    /// confined to admin paths and everyone's defensive admin check
    /// excludes exactly this prefix.
    pub const PLATFORM_HOME: &str = "/admin/platform";
}

use paths::*;

/// What the gate knows about the caller before deciding.
#[derive(Debug, Clone, Copy)]
pub enum SessionState<'a> {
    /// No token presented.
    Anonymous,
    /// A token whose expiry timestamp is in the past, or that failed
    /// refresh because its user no longer exists.
    Expired,
    /// A live, freshly-refreshed snapshot.
    Active(&'a SessionSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
}

fn is_public(path: &str) -> bool {
    matches!(
        path,
        HOME | BUY_TENANT | SIGN_IN | SIGN_UP | SUCCESS | TENANT_INACTIVE
    ) || is_auth_flow(path)
}

fn is_auth_page(path: &str) -> bool {
    path == SIGN_IN || path == "/sign-in/federated" || path == SIGN_UP || is_verify_page(path)
}

fn is_verify_page(path: &str) -> bool {
    path == VERIFY_CODE || path.starts_with("/verify-code/")
}

fn is_auth_flow(path: &str) -> bool {
    is_auth_page(path)
}

/// Paths the authorization gate intercepts: the console prefixes plus the
/// exact page paths. Everything else (API endpoints like `/session`,
/// `/webhook/*`) relies on its handler's own checks.
pub fn is_gate_covered(path: &str) -> bool {
    is_admin_path(path)
        || is_manager_path(path)
        || is_cashier_path(path)
        || matches!(
            path,
            HOME | BUY_TENANT | SIGN_IN
                | SIGN_UP
                | SUCCESS
                | TENANT_INACTIVE
                | SELECT_TENANT
                | TENANT_SETUP
        )
        || is_auth_page(path)
}

fn is_admin_path(path: &str) -> bool {
    path == ADMIN_HOME || path.starts_with("/admin/")
}

fn is_manager_path(path: &str) -> bool {
    path == MANAGER_HOME || path.starts_with("/manager/")
}

fn is_cashier_path(path: &str) -> bool {
    path == CASHIER_HOME || path.starts_with("/cashier/")
}

fn is_platform_path(path: &str) -> bool {
    path == PLATFORM_HOME || path.starts_with("/admin/platform/")
}

/// The role-appropriate landing page for a session.
pub fn role_home(s: &SessionSnapshot) -> &'static str {
    match s.role {
        Some(SessionRole::SuperAdmin) => PLATFORM_HOME,
        Some(SessionRole::Owner) => ADMIN_HOME,
        Some(SessionRole::Manager) => MANAGER_HOME,
        Some(SessionRole::Cashier) => CASHIER_HOME,
        None if s.needs_tenant_selection => SELECT_TENANT,
        None => BUY_TENANT,
    }
}

/// Apply the ordered guard clauses. `now` is the unix timestamp the
/// computed-inactive check is evaluated against.
pub fn route_request(session: SessionState<'_>, path: &str, now: i64) -> GateDecision {
    // 1. Expiry: a stale token outranks everything, including the public
    //    allow-list.
    if matches!(session, SessionState::Expired) {
        return GateDecision::Redirect(SIGN_IN);
    }

    let snapshot = match session {
        SessionState::Active(s) => Some(s),
        _ => None,
    };

    // 2. Auth-page bounce: signed-in callers have no business on the
    //    sign-in/sign-up/verify pages.
    if let Some(s) = snapshot {
        if is_auth_page(path) {
            return GateDecision::Redirect(role_home(s));
        }
    }

    // 3. Home bounce for role-bearing sessions.
    if let Some(s) = snapshot {
        if path == HOME && s.role.is_some() {
            return GateDecision::Redirect(role_home(s));
        }
    }

    // 4. Public passthrough.
    if is_public(path) {
        return GateDecision::Allow;
    }

    // 5. Anonymous rejection on everything non-public.
    let Some(s) = snapshot else {
        return GateDecision::Redirect(SIGN_IN);
    };

    // 6. Verification gate, regardless of the requested path.
    if !s.verified {
        return GateDecision::Redirect(VERIFY_CODE);
    }

    // 7. Tenant-inactive gate: deactivated tenant or computed-inactive
    //    subscription (status string OR past end date - a disjunction).
    if !s.is_super_admin() && s.tenant_blocked(now) && path != TENANT_INACTIVE {
        return GateDecision::Redirect(TENANT_INACTIVE);
    }

    // 8. Super-admin routing: any admin-prefixed path is allowed, anything
    //    else goes back to the console. No tenant-membership checks apply.
    if s.is_super_admin() {
        if is_admin_path(path) {
            return GateDecision::Allow;
        }
        return GateDecision::Redirect(PLATFORM_HOME);
    }

    // 9. No-tenant gate. The success and setup pages stay reachable while
    //    the checkout webhook is in flight; the selection page stays
    //    reachable for multi-tenant accounts.
    if s.tenant_id.is_none() && path != SUCCESS && path != TENANT_SETUP && path != SELECT_TENANT {
        if s.needs_tenant_selection {
            return GateDecision::Redirect(SELECT_TENANT);
        }
        return GateDecision::Redirect(BUY_TENANT);
    }

    // 10. Role scoping: each role is confined to its console prefixes.
    match s.role {
        Some(SessionRole::Owner) => {
            if !is_admin_path(path) {
                return GateDecision::Redirect(ADMIN_HOME);
            }
        }
        Some(SessionRole::Manager) => {
            if !is_manager_path(path) && !is_admin_path(path) {
                return GateDecision::Redirect(MANAGER_HOME);
            }
        }
        Some(SessionRole::Cashier) => {
            if !is_cashier_path(path) && !is_manager_path(path) && !is_admin_path(path) {
                return GateDecision::Redirect(CASHIER_HOME);
            }
        }
        _ => {}
    }

    // 11. Cross-role exclusion: a final defensive sweep that sends
    //     non-owners off admin paths (except the platform console) and
    //     non-managers off manager paths, back to their own home.
    if is_admin_path(path)
        && !is_platform_path(path)
        && s.role != Some(SessionRole::Owner)
    {
        return GateDecision::Redirect(role_home(s));
    }
    if is_manager_path(path)
        && !matches!(s.role, Some(SessionRole::Owner) | Some(SessionRole::Manager))
    {
        return GateDecision::Redirect(role_home(s));
    }

    // 12. Through.
    GateDecision::Allow
}
