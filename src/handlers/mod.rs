pub mod admin;
pub mod auth;
pub mod billing;
pub mod catalog;
pub mod pages;
pub mod sales;
pub mod tenants;
pub mod webhooks;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::db::AppState;

/// Public pages and the auth/provisioning flows.
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/sign-in", get(pages::sign_in_page).post(auth::sign_in))
        .route("/sign-in/federated", post(auth::sign_in_federated))
        .route("/sign-up", get(pages::sign_up_page).post(auth::sign_up))
        .route("/verify-code", get(pages::verify_code_page).post(auth::verify_code))
        .route("/buy-tenant", get(pages::buy_tenant_page).post(billing::start_checkout))
        .route("/success", get(pages::success_page))
        .route("/tenant-inactive", get(pages::tenant_inactive_page))
        .route("/select-tenant", get(pages::select_tenant_page).post(tenants::switch_tenant))
        .route("/tenant-setup", post(tenants::setup_tenant))
        .route("/session", get(auth::current_session))
}

/// Owner console (plus the super-admin platform console underneath it).
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(pages::admin_home))
        .route("/admin/tenant", get(tenants::get_own_tenant).put(tenants::setup_tenant))
        .route("/admin/employees", get(admin::list_employees).post(admin::create_employee))
        .route("/admin/users/{user_id}", delete(admin::delete_user))
        .route("/admin/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/admin/products/{product_id}",
            axum::routing::put(catalog::update_product).delete(catalog::delete_product),
        )
        .route("/admin/customers", get(catalog::list_customers).post(catalog::create_customer))
        .route("/admin/sales", get(sales::list_sales))
        .route("/admin/platform", get(pages::platform_home))
        .route("/admin/platform/tenants", get(admin::list_tenants))
        .route("/admin/platform/tenants/{tenant_id}/status", post(admin::set_tenant_status))
        .route("/admin/platform/tenants/{tenant_id}", delete(admin::delete_tenant))
}

/// Manager console.
pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/manager", get(pages::manager_home))
        .route("/manager/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/manager/products/{product_id}",
            axum::routing::put(catalog::update_product).delete(catalog::delete_product),
        )
        .route("/manager/customers", get(catalog::list_customers).post(catalog::create_customer))
        .route("/manager/sales", get(sales::list_sales))
        .route("/manager/employees", get(admin::list_employees))
}

/// Cashier console.
pub fn cashier_router() -> Router<AppState> {
    Router::new()
        .route("/cashier", get(pages::cashier_home))
        .route("/cashier/products", get(catalog::list_products))
        .route("/cashier/customers", get(catalog::list_customers).post(catalog::create_customer))
        .route("/cashier/sales", get(sales::list_sales).post(sales::create_sale))
}
