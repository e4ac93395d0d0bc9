use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Shared user-facing message strings.
///
/// Authentication failures intentionally share one generic message so the
/// response does not reveal whether an email is registered.
pub mod msg {
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
    pub const UNVERIFIED_ACCOUNT: &str = "Account is not verified";
    pub const TENANT_INACTIVE: &str = "This business account is not active";
    pub const NO_TENANT_FOUND: &str = "No business account found for this user";
    pub const INVALID_SIGNATURE_FORMAT: &str = "Invalid signature format";
    pub const INVALID_TIMESTAMP_IN_SIGNATURE: &str = "Invalid timestamp in signature";
    pub const INVALID_WEBHOOK_SECRET: &str = "Invalid webhook secret";
    pub const EMAIL_EMPTY: &str = "Email cannot be empty";
    pub const NAME_EMPTY: &str = "Name cannot be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const BILLING_NOT_CONFIGURED: &str = "Billing provider is not configured";
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Email unknown or password mismatch - one error for both cases.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Correct credentials, but the account has not completed verification.
    #[error("Account not verified")]
    UnverifiedAccount,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Tenant inactive")]
    TenantInactive,

    /// The caller has no owner membership yet. Retryable: tenant creation
    /// happens in the checkout webhook, which may still be in flight.
    #[error("No tenant found")]
    NoTenantFound,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Webhook signature verification failed")]
    SignatureVerificationFailed,

    #[error("Malformed webhook event: {0}")]
    MalformedWebhookEvent(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AppError::Internal(format!("Password hashing error: {}", e))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, msg::INVALID_CREDENTIALS, None)
            }
            AppError::UnverifiedAccount => {
                (StatusCode::FORBIDDEN, msg::UNVERIFIED_ACCOUNT, None)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "Forbidden", Some(m.clone())),
            AppError::TenantInactive => (StatusCode::FORBIDDEN, msg::TENANT_INACTIVE, None),
            AppError::NoTenantFound => (StatusCode::NOT_FOUND, msg::NO_TENANT_FOUND, None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "Not found", Some(m.clone())),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, "Bad request", Some(m.clone())),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "Conflict", Some(m.clone())),
            AppError::SignatureVerificationFailed => {
                (StatusCode::BAD_REQUEST, "Invalid webhook signature", None)
            }
            AppError::MalformedWebhookEvent(m) => {
                (StatusCode::BAD_REQUEST, "Malformed webhook event", Some(m.clone()))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(m) => {
                tracing::error!("Internal error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
