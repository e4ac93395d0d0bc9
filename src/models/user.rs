use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// Basic email format validation.
///
/// Intentionally permissive - a sanity check, not RFC 5322 compliance.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let local_part = parts[0];
    let domain_part = parts[1];

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty()
        || !domain_part.contains('.')
        || domain_part.starts_with('.')
        || domain_part.ends_with('.')
    {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// How the user authenticates: local credentials or a federated provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Credentials,
    Federated,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Credentials => "credentials",
            AuthProvider::Federated => "federated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "credentials" => Some(AuthProvider::Credentials),
            "federated" => Some(AuthProvider::Federated),
            _ => None,
        }
    }
}

/// User identity record.
///
/// `super_admin` is a stored flag set only by the bootstrap provisioning
/// path, never derived from the email address at request time.
/// `current_tenant_id` is the explicit active-tenant pointer for users who
/// belong to more than one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub verification_code_hash: Option<String>,
    pub provider: AuthProvider,
    pub billing_customer_id: Option<String>,
    pub super_admin: bool,
    pub current_tenant_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        if self.password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct FederatedSignInRequest {
    /// Provider access token, exchanged for the user's identity via the
    /// configured userinfo endpoint.
    pub access_token: String,
}

/// Employee provisioning input (owner-only). The employee is created
/// pre-verified under the caller's own tenant.
#[derive(Debug, Deserialize)]
pub struct CreateEmployee {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: crate::models::TenantRole,
}

impl CreateEmployee {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        if self.password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".into(),
            ));
        }
        if self.role == crate::models::TenantRole::Owner {
            return Err(AppError::BadRequest(
                "Employees can only be managers or cashiers".into(),
            ));
        }
        Ok(())
    }
}

/// An employee row as listed in the tenant consoles (user joined with
/// their membership role).
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeWithRole {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: crate::models::TenantRole,
    pub verified: bool,
    pub created_at: i64,
}
