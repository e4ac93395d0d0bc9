//! Session middleware: decodes the token, refreshes the snapshot from the
//! stores, applies the routing gate and re-signs the token on the way out.
//!
//! This is the only I/O the authorization pipeline performs per request;
//! the gate itself stays pure.

use axum::{
    extract::{Request, State},
    http::{header::HeaderValue, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::auth::session::{decode_session, issue_session, refresh_snapshot};
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::middleware::gate::{is_gate_covered, route_request, GateDecision, SessionState};
use crate::models::{SessionRole, SessionSnapshot};

/// Response header carrying the re-signed session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// The refreshed session attached to allowed requests.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub snapshot: SessionSnapshot,
}

impl SessionContext {
    pub fn require_super_admin(&self) -> Result<()> {
        if self.snapshot.is_super_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Super-admin access required".into()))
        }
    }

    pub fn require_owner(&self) -> Result<()> {
        if self.snapshot.role == Some(SessionRole::Owner) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Owner access required".into()))
        }
    }

    /// Owner or super-admin, for operations like user deletion.
    pub fn require_owner_or_super_admin(&self) -> Result<()> {
        match self.snapshot.role {
            Some(SessionRole::Owner) | Some(SessionRole::SuperAdmin) => Ok(()),
            _ => Err(AppError::Forbidden("Owner access required".into())),
        }
    }

    /// Catalog writes are for owners and managers; cashiers read only.
    pub fn require_catalog_write(&self) -> Result<()> {
        match self.snapshot.role {
            Some(SessionRole::Owner) | Some(SessionRole::Manager) => Ok(()),
            _ => Err(AppError::Forbidden("Manager access required".into())),
        }
    }

    /// Tenant id from the verified session snapshot. Every tenant-scoped
    /// operation resolves its tenant through this - never from client
    /// input.
    pub fn tenant_id(&self) -> Result<&str> {
        self.snapshot
            .tenant_id
            .as_deref()
            .ok_or(AppError::NoTenantFound)
    }
}

/// Extract the session token: `Authorization: Bearer` first, then the
/// `session` cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get("Cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("session=").map(|v| v.to_string()))
        })
        .filter(|s| !s.is_empty())
}

/// How this request's token resolved after decode + refresh.
enum Resolved {
    Anonymous,
    /// Expired, forged, or pointing at a user that no longer exists -
    /// all handled as a forced sign-out.
    Invalid,
    Active(SessionSnapshot),
}

fn resolve_session(state: &AppState, headers: &HeaderMap, now: i64) -> Result<Resolved> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(Resolved::Anonymous);
    };

    let decoded = match decode_session(&state.session_key, &token) {
        Ok(d) => d,
        Err(_) => return Ok(Resolved::Invalid),
    };

    if decoded.expires_at.is_some_and(|exp| exp <= now) {
        return Ok(Resolved::Invalid);
    }

    let conn = state.db.get()?;
    match refresh_snapshot(&conn, &decoded.snapshot)? {
        Some(snapshot) => Ok(Resolved::Active(snapshot)),
        None => {
            tracing::info!(
                "Session user {} no longer exists, forcing sign-out",
                decoded.snapshot.user_id
            );
            Ok(Resolved::Invalid)
        }
    }
}

/// The per-request pipeline: token -> refreshed snapshot -> gate decision.
pub async fn session_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let now = Utc::now().timestamp();

    let resolved = match resolve_session(&state, request.headers(), now) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    let session_state = match &resolved {
        Resolved::Anonymous => SessionState::Anonymous,
        Resolved::Invalid => SessionState::Expired,
        Resolved::Active(s) => SessionState::Active(s),
    };

    if is_gate_covered(&path) {
        if let GateDecision::Redirect(target) = route_request(session_state, &path, now) {
            return Redirect::to(target).into_response();
        }
    }

    let mut request = request;
    let resigned = match &resolved {
        Resolved::Active(s) => {
            request
                .extensions_mut()
                .insert(SessionContext { snapshot: s.clone() });
            match issue_session(&state.session_key, s, state.session_ttl_mins) {
                Ok(token) => Some(token),
                Err(e) => return e.into_response(),
            }
        }
        _ => None,
    };

    let mut response = next.run(request).await;

    if let Some(token) = resigned {
        if let Ok(value) = HeaderValue::from_str(&token) {
            response.headers_mut().insert(SESSION_TOKEN_HEADER, value);
        }
    }
    response
}
