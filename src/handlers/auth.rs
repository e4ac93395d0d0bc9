//! Sign-up, sign-in (credentials and federated) and verification.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::auth::{credentials, password, session};
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{CurrentSession, Json};
use crate::models::{
    FederatedSignInRequest, SessionSnapshot, SignInRequest, SignUpRequest, VerifyCodeRequest,
};

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub id: String,
    pub email: String,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub session: SessionSnapshot,
}

/// Create an unverified account and issue a verification code.
///
/// Email delivery is out of scope here; the code is handed to the mail
/// collaborator, and logged in dev mode so the flow can be exercised.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUpRequest>,
) -> Result<Json<SignUpResponse>> {
    input.validate()?;

    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, &input.email)?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }

    let code = password::generate_verification_code();
    let code_hash = password::hash_verification_code(&code);
    let password_hash = password::hash_password(&input.password)?;

    let user = queries::create_credentials_user(
        &conn,
        &input.email,
        &input.name,
        &password_hash,
        &code_hash,
    )?;

    tracing::info!("Verification code issued for {}", user.email);
    tracing::debug!("Verification code for {}: {}", user.email, code);

    Ok(Json(SignUpResponse {
        id: user.id,
        email: user.email,
        verified: user.verified,
    }))
}

/// Credentials sign-in: verify, snapshot, sign.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignInRequest>,
) -> Result<Json<SessionResponse>> {
    let conn = state.db.get()?;

    let user = credentials::authenticate(&conn, &input.email, &input.password)?;
    let snapshot = session::snapshot_for_user(&conn, &user)?;
    let token = session::issue_session(&state.session_key, &snapshot, state.session_ttl_mins)?;

    Ok(Json(SessionResponse { token, session: snapshot }))
}

/// Identity returned by the OAuth provider's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct FederatedIdentity {
    email: String,
    name: Option<String>,
}

/// Federated sign-in: exchange the provider access token for an identity,
/// then link or auto-provision the user. Disabled when OAuth is not
/// configured.
pub async fn sign_in_federated(
    State(state): State<AppState>,
    Json(input): Json<FederatedSignInRequest>,
) -> Result<Json<SessionResponse>> {
    let Some(oauth) = &state.oauth else {
        return Err(AppError::NotFound("Federated sign-in is not enabled".into()));
    };

    let response = state
        .http_client
        .get(&oauth.userinfo_url)
        .bearer_auth(&input.access_token)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("OAuth provider error: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::InvalidCredentials);
    }

    let identity: FederatedIdentity = response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("Invalid userinfo response: {}", e)))?;

    let name = identity
        .name
        .unwrap_or_else(|| identity.email.split('@').next().unwrap_or_default().to_string());

    let conn = state.db.get()?;
    let user = credentials::link_or_create_federated_user(&conn, &identity.email, &name)?;
    let snapshot = session::snapshot_for_user(&conn, &user)?;
    let token = session::issue_session(&state.session_key, &snapshot, state.session_ttl_mins)?;

    Ok(Json(SessionResponse { token, session: snapshot }))
}

/// Redeem a verification code and flip the verified flag.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(input): Json<VerifyCodeRequest>,
) -> Result<Json<SignUpResponse>> {
    let conn = state.db.get()?;

    let user = credentials::verify_account(&conn, &input.email, &input.code)?;

    Ok(Json(SignUpResponse {
        id: user.id,
        email: user.email,
        verified: user.verified,
    }))
}

/// The current (freshly refreshed) session snapshot.
pub async fn current_session(CurrentSession(ctx): CurrentSession) -> Json<SessionSnapshot> {
    Json(ctx.snapshot)
}
