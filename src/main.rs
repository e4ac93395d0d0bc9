use axum::Router;
use clap::Parser;
use jwt_simple::prelude::HS256Key;
use rand::{distributions::Alphanumeric, Rng};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tillpoint::auth::password;
use tillpoint::config::Config;
use tillpoint::db::{create_pool, init_db, queries, AppState};
use tillpoint::handlers;
use tillpoint::middleware;
use tillpoint::models::{CreateProduct, TenantRole};
use tillpoint::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "tillpoint")]
#[command(about = "Multi-tenant point-of-sale SaaS backend")]
struct Cli {
    /// Seed the database with dev data (owner, tenant, employees, products)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Provision the first super-admin if configured and none exists yet.
/// This is the only path that sets the super-admin flag.
fn bootstrap_super_admin(state: &AppState, email: &str) {
    let conn = state.db.get().expect("Failed to get db connection for bootstrap");

    let count = queries::count_super_admins(&conn).expect("Failed to count super admins");
    if count > 0 {
        tracing::info!("Super-admin already exists, skipping bootstrap");
        return;
    }

    let password = random_password();
    let password_hash = password::hash_password(&password).expect("Failed to hash password");

    let admin = queries::create_super_admin(&conn, email, "Platform Admin", &password_hash)
        .expect("Failed to create bootstrap super-admin");

    tracing::info!("============================================");
    tracing::info!("BOOTSTRAP SUPER-ADMIN CREATED");
    tracing::info!("Email: {}", admin.email);
    tracing::info!("Password: {}", password);
    tracing::info!("============================================");
    tracing::info!("SAVE THIS PASSWORD - IT WILL NOT BE SHOWN AGAIN");
    tracing::info!("============================================");
}

/// Seeds the database with dev data for testing.
/// Creates: an owner with an active tenant, a manager, a cashier, and a
/// couple of products. Only runs when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .expect("Failed to count users");
    if existing > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let password_hash = password::hash_password("password123").expect("Failed to hash password");

    let owner = queries::create_employee_user(&conn, "owner@dev.local", "Dev Owner", &password_hash)
        .expect("Failed to create dev owner");

    let now = chrono::Utc::now().timestamp();
    drop(conn);
    let mut conn = state.db.get().expect("Failed to get db connection");
    let tenant = queries::provision_tenant(
        &mut conn,
        &owner.id,
        "Dev Store",
        "cus_dev",
        "sub_dev",
        "TRIALING",
        Some(tillpoint::models::SubscriptionPlan::Monthly),
        Some(now + 14 * 86400),
    )
    .expect("Failed to provision dev tenant")
    .expect("Dev tenant already provisioned");

    let manager =
        queries::create_employee_user(&conn, "manager@dev.local", "Dev Manager", &password_hash)
            .expect("Failed to create dev manager");
    queries::create_membership(&conn, &manager.id, &tenant.id, TenantRole::Manager)
        .expect("Failed to create dev manager membership");

    let cashier =
        queries::create_employee_user(&conn, "cashier@dev.local", "Dev Cashier", &password_hash)
            .expect("Failed to create dev cashier");
    queries::create_membership(&conn, &cashier.id, &tenant.id, TenantRole::Cashier)
        .expect("Failed to create dev cashier membership");

    for (name, barcode, price_cents, stock) in [
        ("Espresso", "100001", 350_i64, 500_i64),
        ("Croissant", "100002", 450, 80),
    ] {
        queries::create_product(
            &conn,
            &tenant.id,
            &CreateProduct {
                name: name.to_string(),
                barcode: Some(barcode.to_string()),
                price_cents,
                stock,
            },
        )
        .expect("Failed to create dev product");
    }

    tracing::info!("Tenant: {} (id: {})", tenant.name, tenant.id);
    tracing::info!("Owner:   owner@dev.local / password123");
    tracing::info!("Manager: manager@dev.local / password123");
    tracing::info!("Cashier: cashier@dev.local / password123");
    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED SUCCESSFULLY");
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tillpoint=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        base_url: config.base_url.clone(),
        session_key: HS256Key::from_bytes(config.session_secret.as_bytes()),
        session_ttl_mins: config.session_ttl_mins,
        stripe: config.stripe.as_ref().map(StripeClient::new),
        oauth: config.oauth.clone(),
        http_client: reqwest::Client::new(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set TILLPOINT_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    if let Some(ref email) = config.bootstrap_super_admin_email {
        bootstrap_super_admin(&state, email);
    }

    // Routed surfaces go through the session/gate middleware; the webhook
    // endpoint authenticates by signature instead and stays outside it.
    let guarded = Router::new()
        .merge(handlers::pages_router())
        .merge(handlers::admin_router())
        .merge(handlers::manager_router())
        .merge(handlers::cashier_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_gate,
        ));

    let app = Router::new()
        .merge(guarded)
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("tillpoint server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
