mod schema;
pub mod from_row;
pub mod queries;

pub use schema::init_db;

use jwt_simple::prelude::HS256Key;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::OAuthSettings;
use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Base URL for checkout success/cancel redirects.
    pub base_url: String,
    /// HMAC key used to sign and verify session tokens.
    pub session_key: HS256Key,
    pub session_ttl_mins: u64,
    /// Billing provider client (None when Stripe env vars are absent).
    pub stripe: Option<StripeClient>,
    /// Federated sign-in settings (None disables the flow).
    pub oauth: Option<OAuthSettings>,
    pub http_client: reqwest::Client,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().max_size(10).build(manager)
}
