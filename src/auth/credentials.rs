//! Credential verification against the user store.

use rusqlite::Connection;

use crate::auth::password;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::User;

/// Validate an email/password pair.
///
/// Unknown email, missing password hash (federated account) and wrong
/// password all collapse into the same `InvalidCredentials` so responses
/// cannot be used to enumerate accounts. A matching but unverified account
/// is a hard gate even with correct credentials.
pub fn authenticate(conn: &Connection, email: &str, pass: &str) -> Result<User> {
    let user = queries::get_user_by_email(conn, email)?.ok_or(AppError::InvalidCredentials)?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(pass, hash)? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.verified {
        return Err(AppError::UnverifiedAccount);
    }

    Ok(user)
}

/// Federated identity linking: auto-provision a verified, passwordless
/// user on first federated sign-in; accept subsequent sign-ins by email
/// match without re-creating.
pub fn link_or_create_federated_user(conn: &Connection, email: &str, name: &str) -> Result<User> {
    if let Some(existing) = queries::get_user_by_email(conn, email)? {
        return Ok(existing);
    }
    queries::create_federated_user(conn, email, name)
}

/// Complete sign-up verification. The response never reveals whether the
/// email or the code was the mismatch.
pub fn verify_account(conn: &Connection, email: &str, code: &str) -> Result<User> {
    const INVALID: &str = "Invalid verification code";

    let user = queries::get_user_by_email(conn, email)?
        .ok_or_else(|| AppError::BadRequest(INVALID.into()))?;

    if user.verified {
        return Ok(user);
    }

    let expected = user
        .verification_code_hash
        .as_deref()
        .ok_or_else(|| AppError::BadRequest(INVALID.into()))?;

    if password::hash_verification_code(code) != expected {
        return Err(AppError::BadRequest(INVALID.into()));
    }

    queries::mark_user_verified(conn, &user.id)?;
    queries::get_user_by_id(conn, &user.id)?
        .ok_or_else(|| AppError::Internal("User vanished during verification".into()))
}
