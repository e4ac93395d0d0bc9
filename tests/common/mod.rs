//! Test utilities and fixtures for tillpoint integration tests

#![allow(dead_code)]

use jwt_simple::prelude::HS256Key;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use tillpoint::auth::password;
pub use tillpoint::db::{init_db, queries, AppState};
pub use tillpoint::middleware::SessionContext;
pub use tillpoint::models::*;

/// Create an in-memory test database with schema initialized.
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an AppState for testing, backed by a throwaway database file
/// (a `:memory:` pool would give every pooled connection its own empty
/// database).
pub fn create_test_app_state() -> AppState {
    let path = std::env::temp_dir().join(format!(
        "tillpoint_test_{}.db",
        uuid::Uuid::new_v4().as_simple()
    ));
    let manager = SqliteConnectionManager::file(&path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        base_url: "http://localhost:3000".to_string(),
        session_key: HS256Key::from_bytes(b"test-session-secret"),
        session_ttl_mins: 60,
        stripe: None,
        oauth: None,
        http_client: reqwest::Client::new(),
    }
}

/// Create a verified user without the argon2 cost (federated users carry
/// no password hash).
pub fn create_test_user(conn: &Connection, email: &str) -> User {
    queries::create_federated_user(conn, email, "Test User").expect("Failed to create test user")
}

/// Create an unverified credentials user with the verification code
/// "123456".
pub fn create_unverified_user(conn: &Connection, email: &str, pass: &str) -> User {
    let password_hash = password::hash_password(pass).unwrap();
    let code_hash = password::hash_verification_code("123456");
    queries::create_credentials_user(conn, email, "Test User", &password_hash, &code_hash)
        .expect("Failed to create unverified user")
}

/// Provision a tenant for an owner the way the checkout webhook does.
pub fn provision_test_tenant(
    conn: &mut Connection,
    owner: &User,
    subscription_id: &str,
    customer_id: &str,
    subscription_status: &str,
    end_date: Option<i64>,
) -> Tenant {
    queries::provision_tenant(
        conn,
        &owner.id,
        "Test Store",
        customer_id,
        subscription_id,
        subscription_status,
        Some(SubscriptionPlan::Monthly),
        end_date,
    )
    .expect("Failed to provision test tenant")
    .expect("Tenant was already provisioned")
}

/// Attach a user to a tenant with the given role.
pub fn add_member(conn: &Connection, user: &User, tenant: &Tenant, role: TenantRole) -> Membership {
    queries::create_membership(conn, &user.id, &tenant.id, role)
        .expect("Failed to create membership")
}

pub fn create_test_product(conn: &Connection, tenant: &Tenant, name: &str, stock: i64) -> Product {
    queries::create_product(
        conn,
        &tenant.id,
        &CreateProduct {
            name: name.to_string(),
            barcode: None,
            price_cents: 500,
            stock,
        },
    )
    .expect("Failed to create test product")
}

/// A session context as the middleware would attach it after refresh.
pub fn session_ctx(conn: &Connection, user: &User) -> SessionContext {
    let user = queries::get_user_by_id(conn, &user.id)
        .unwrap()
        .expect("User not found for session context");
    let snapshot = tillpoint::auth::session::snapshot_for_user(conn, &user).unwrap();
    SessionContext { snapshot }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn future_timestamp(days: i64) -> i64 {
    now() + (days * 86400)
}

pub fn past_timestamp(days: i64) -> i64 {
    now() - (days * 86400)
}
