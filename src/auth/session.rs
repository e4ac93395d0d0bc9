//! Session issuing, decoding and per-request snapshot refresh.
//!
//! The session token is a stateless HS256 JWT carrying a
//! [`SessionSnapshot`]. The snapshot is recomputed from the stores on
//! every decode and the token re-signed, so a role change or subscription
//! cancellation takes effect on the very next request without requiring
//! the user to re-authenticate.

use jwt_simple::prelude::*;
use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{end_date_to_iso, SessionRole, SessionSnapshot, User};

const ISSUER: &str = "tillpoint";

/// A decoded token: the embedded snapshot plus its expiry timestamp.
/// Expiry is checked by the authorization gate, not here, so an expired
/// token can still be recognized (and redirected) rather than treated as
/// garbage.
#[derive(Debug, Clone)]
pub struct DecodedSession {
    pub snapshot: SessionSnapshot,
    pub expires_at: Option<i64>,
}

/// Sign a snapshot into a session token.
pub fn issue_session(key: &HS256Key, snapshot: &SessionSnapshot, ttl_mins: u64) -> Result<String> {
    let claims = Claims::with_custom_claims(snapshot.clone(), Duration::from_mins(ttl_mins))
        .with_issuer(ISSUER);
    key.authenticate(claims)
        .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
}

/// Verify a token's signature and extract the snapshot. Expiry is NOT
/// enforced here (see [`DecodedSession`]); signature or issuer mismatch is.
pub fn decode_session(key: &HS256Key, token: &str) -> Result<DecodedSession> {
    let mut allowed_issuers = std::collections::HashSet::new();
    allowed_issuers.insert(ISSUER.to_string());

    let options = VerificationOptions {
        allowed_issuers: Some(allowed_issuers),
        // Expiry is the gate's first guard clause; accept stale tokens at
        // the signature layer so they can be told apart from forgeries.
        time_tolerance: Some(Duration::from_days(365 * 100)),
        ..Default::default()
    };

    let claims = key
        .verify_token::<SessionSnapshot>(token, Some(options))
        .map_err(|_| AppError::Unauthorized)?;

    Ok(DecodedSession {
        snapshot: claims.custom,
        expires_at: claims.expires_at.map(|t| t.as_secs() as i64),
    })
}

/// Build a fresh snapshot for a user from live store data.
///
/// Super-admins are tenant-less by design: role is pinned and all tenant
/// fields are nulled. Everyone else resolves their active membership via
/// the explicit current-tenant pointer; a sole membership is auto-selected
/// (and the pointer persisted), multiple memberships without a selection
/// leave role/tenant unset so the gate can surface the selection step.
pub fn snapshot_for_user(conn: &Connection, user: &User) -> Result<SessionSnapshot> {
    if user.super_admin {
        return Ok(SessionSnapshot {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: Some(SessionRole::SuperAdmin),
            tenant_id: None,
            tenant_name: None,
            tenant_status: None,
            subscription_status: None,
            subscription_end_date: None,
            verified: user.verified,
            billing_customer_id: user.billing_customer_id.clone(),
            super_admin: true,
            needs_tenant_selection: false,
        });
    }

    let memberships = queries::list_memberships_with_tenant(conn, &user.id)?;

    let active = match user
        .current_tenant_id
        .as_deref()
        .and_then(|tid| memberships.iter().find(|m| m.tenant_id == tid))
    {
        Some(m) => Some(m),
        None if memberships.len() == 1 => {
            let m = &memberships[0];
            queries::set_current_tenant(conn, &user.id, Some(&m.tenant_id))?;
            Some(m)
        }
        None => None,
    };

    let needs_tenant_selection = active.is_none() && !memberships.is_empty();

    Ok(match active {
        Some(m) => SessionSnapshot {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: Some(SessionRole::from(m.role)),
            tenant_id: Some(m.tenant_id.clone()),
            tenant_name: Some(m.tenant_name.clone()),
            tenant_status: Some(m.tenant_status),
            subscription_status: Some(m.subscription_status.clone()),
            subscription_end_date: end_date_to_iso(m.subscription_end_date),
            verified: user.verified,
            billing_customer_id: user.billing_customer_id.clone(),
            super_admin: false,
            needs_tenant_selection: false,
        },
        None => SessionSnapshot {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: None,
            tenant_id: None,
            tenant_name: None,
            tenant_status: None,
            subscription_status: None,
            subscription_end_date: None,
            verified: user.verified,
            billing_customer_id: user.billing_customer_id.clone(),
            super_admin: false,
            needs_tenant_selection,
        },
    })
}

/// Recompute the snapshot embedded in a token from live data.
///
/// Lookup is by email with id fallback. A missing user is an explicit
/// invalidation signal (`Ok(None)` forces sign-out), never a silent no-op
/// that would keep serving stale snapshot values.
pub fn refresh_snapshot(
    conn: &Connection,
    prior: &SessionSnapshot,
) -> Result<Option<SessionSnapshot>> {
    let user = match queries::get_user_by_email(conn, &prior.email)? {
        Some(u) => Some(u),
        None => queries::get_user_by_id(conn, &prior.user_id)?,
    };

    match user {
        Some(user) => Ok(Some(snapshot_for_user(conn, &user)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TenantStatus;

    fn test_key() -> HS256Key {
        HS256Key::from_bytes(b"test-session-secret")
    }

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
            billing_customer_id: None,
            super_admin: false,
            needs_tenant_selection: false,
        }
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let key = test_key();
        let token = issue_session(&key, &snapshot(), 60).unwrap();

        let decoded = decode_session(&key, &token).unwrap();
        assert_eq!(decoded.snapshot.email, "owner@example.com");
        assert_eq!(decoded.snapshot.role, Some(SessionRole::Owner));
        assert!(decoded.expires_at.is_some());
    }

    #[test]
    fn test_decode_rejects_wrong_key() {
        let token = issue_session(&test_key(), &snapshot(), 60).unwrap();
        let other_key = HS256Key::from_bytes(b"a-different-secret");
        assert!(decode_session(&other_key, &token).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_session(&test_key(), "not.a.token").is_err());
    }

    #[test]
    fn test_expired_token_still_decodes() {
        // Expiry is enforced by the gate, not the signature layer.
        let key = test_key();
        let token = issue_session(&key, &snapshot(), 0).unwrap();
        let decoded = decode_session(&key, &token).unwrap();
        let exp = decoded.expires_at.unwrap();
        assert!(exp <= chrono::Utc::now().timestamp() + 1);
    }
}
