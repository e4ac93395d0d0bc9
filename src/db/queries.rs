use chrono::Utc;
use rusqlite::{params, types::Value, Connection};

use crate::error::{AppError, Result};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    query_all, query_one, CUSTOMER_COLS, EMPLOYEE_COLS, MEMBERSHIP_COLS,
    MEMBERSHIP_WITH_TENANT_COLS, PRODUCT_COLS, SALE_COLS, SALE_ITEM_COLS, TENANT_COLS, USER_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Builder for dynamic UPDATE statements with optional fields.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Execute the update and return the updated entity via RETURNING.
    /// Returns None if no row matched or there was nothing to update.
    fn execute_returning<T: super::from_row::FromRow>(
        mut self,
        conn: &Connection,
        returning_cols: &str,
    ) -> Result<Option<T>> {
        use rusqlite::OptionalExtension;

        if self.fields.is_empty() {
            return Ok(None);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? RETURNING {}",
            self.table,
            sets.join(", "),
            returning_cols
        );
        conn.query_row(&sql, rusqlite::params_from_iter(values), T::from_row)
            .optional()
            .map_err(Into::into)
    }
}

// ============ Users ============

/// Create an unverified credential-store user (sign-up flow).
pub fn create_credentials_user(
    conn: &Connection,
    email: &str,
    name: &str,
    password_hash: &str,
    verification_code_hash: &str,
) -> Result<User> {
    let id = EntityType::User.gen_id();
    let now = now();
    let email = email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, password_hash, verified, verification_code_hash, provider, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, 'credentials', ?6, ?7)",
        params![&id, &email, name, password_hash, verification_code_hash, now, now],
    )?;

    get_user_by_id(conn, &id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

/// Create a user on first federated sign-in: verified, no password.
pub fn create_federated_user(conn: &Connection, email: &str, name: &str) -> Result<User> {
    let id = EntityType::User.gen_id();
    let now = now();
    let email = email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, verified, provider, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, 'federated', ?4, ?5)",
        params![&id, &email, name, now, now],
    )?;

    get_user_by_id(conn, &id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

/// Create a pre-verified employee user (owner provisioning flow).
pub fn create_employee_user(
    conn: &Connection,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<User> {
    let id = EntityType::User.gen_id();
    let now = now();
    let email = email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, password_hash, verified, provider, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 1, 'credentials', ?5, ?6)",
        params![&id, &email, name, password_hash, now, now],
    )?;

    get_user_by_id(conn, &id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

/// Create a verified super-admin user (bootstrap provisioning path only).
pub fn create_super_admin(
    conn: &Connection,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<User> {
    let id = EntityType::User.gen_id();
    let now = now();
    let email = email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, email, name, password_hash, verified, provider, super_admin, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 1, 'credentials', 1, ?5, ?6)",
        params![&id, &email, name, password_hash, now, now],
    )?;

    get_user_by_id(conn, &id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

pub fn count_super_admins(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM users WHERE super_admin = 1", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Flip the verified flag and clear the pending code.
pub fn mark_user_verified(conn: &Connection, user_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET verified = 1, verification_code_hash = NULL, updated_at = ?1 WHERE id = ?2",
        params![now(), user_id],
    )?;
    Ok(affected > 0)
}

pub fn set_user_billing_customer(
    conn: &Connection,
    user_id: &str,
    billing_customer_id: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET billing_customer_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![billing_customer_id, now(), user_id],
    )?;
    Ok(affected > 0)
}

/// Set (or clear) the explicit active-tenant pointer.
pub fn set_current_tenant(
    conn: &Connection,
    user_id: &str,
    tenant_id: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET current_tenant_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![tenant_id, now(), user_id],
    )?;
    Ok(affected > 0)
}

pub fn delete_user(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Sales recorded by this user. Users with sales cannot be deleted.
pub fn count_user_sales(conn: &Connection, user_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sales WHERE cashier_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============ Memberships ============

pub fn create_membership(
    conn: &Connection,
    user_id: &str,
    tenant_id: &str,
    role: TenantRole,
) -> Result<Membership> {
    let id = EntityType::Membership.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO memberships (id, user_id, tenant_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, user_id, tenant_id, role.as_str(), now],
    )?;

    Ok(Membership {
        id,
        user_id: user_id.to_string(),
        tenant_id: tenant_id.to_string(),
        role,
        created_at: now,
    })
}

pub fn get_membership(
    conn: &Connection,
    user_id: &str,
    tenant_id: &str,
) -> Result<Option<Membership>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM memberships WHERE user_id = ?1 AND tenant_id = ?2",
            MEMBERSHIP_COLS
        ),
        &[&user_id, &tenant_id],
    )
}

/// All memberships of a user joined with their tenants, oldest first.
pub fn list_memberships_with_tenant(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<MembershipWithTenant>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM memberships m JOIN tenants t ON t.id = m.tenant_id
             WHERE m.user_id = ?1 ORDER BY m.created_at ASC",
            MEMBERSHIP_WITH_TENANT_COLS
        ),
        &[&user_id],
    )
}

/// The caller's owner membership, if checkout provisioning has landed.
pub fn get_owner_membership_with_tenant(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<MembershipWithTenant>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM memberships m JOIN tenants t ON t.id = m.tenant_id
             WHERE m.user_id = ?1 AND m.role = 'owner' ORDER BY m.created_at ASC LIMIT 1",
            MEMBERSHIP_WITH_TENANT_COLS
        ),
        &[&user_id],
    )
}

pub fn list_employees(conn: &Connection, tenant_id: &str) -> Result<Vec<EmployeeWithRole>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM memberships m JOIN users u ON u.id = m.user_id
             WHERE m.tenant_id = ?1 ORDER BY m.created_at ASC",
            EMPLOYEE_COLS
        ),
        &[&tenant_id],
    )
}

// ============ Tenants ============

pub fn get_tenant_by_id(conn: &Connection, id: &str) -> Result<Option<Tenant>> {
    query_one(
        conn,
        &format!("SELECT {} FROM tenants WHERE id = ?1", TENANT_COLS),
        &[&id],
    )
}

pub fn list_tenants(conn: &Connection) -> Result<Vec<Tenant>> {
    query_all(
        conn,
        &format!("SELECT {} FROM tenants ORDER BY created_at DESC", TENANT_COLS),
        &[],
    )
}

/// Convert a completed checkout into a tenant with the purchasing user as
/// owner, atomically. Keyed on the UNIQUE billing_subscription_id:
/// redelivery of the same checkout event inserts nothing and returns None.
pub fn provision_tenant(
    conn: &mut Connection,
    user_id: &str,
    name: &str,
    billing_customer_id: &str,
    billing_subscription_id: &str,
    subscription_status: &str,
    plan: Option<SubscriptionPlan>,
    end_date: Option<i64>,
) -> Result<Option<Tenant>> {
    let tx = conn.transaction()?;

    let id = EntityType::Tenant.gen_id();
    let now = now();
    let status = if subscription_activates(subscription_status) {
        TenantStatus::Active
    } else {
        TenantStatus::Inactive
    };

    let inserted = tx.execute(
        "INSERT OR IGNORE INTO tenants
         (id, name, status, subscription_status, subscription_plan, subscription_end_date,
          billing_customer_id, billing_subscription_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &id,
            name,
            status.as_str(),
            subscription_status,
            plan.map(|p| p.as_str()),
            end_date,
            billing_customer_id,
            billing_subscription_id,
            now,
            now
        ],
    )?;

    if inserted == 0 {
        // Redelivered checkout event - the tenant already exists.
        return Ok(None);
    }

    let membership_id = EntityType::Membership.gen_id();
    tx.execute(
        "INSERT INTO memberships (id, user_id, tenant_id, role, created_at)
         VALUES (?1, ?2, ?3, 'owner', ?4)",
        params![&membership_id, user_id, &id, now],
    )?;

    tx.execute(
        "UPDATE users SET billing_customer_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![billing_customer_id, now, user_id],
    )?;

    tx.commit()?;

    get_tenant_by_id(conn, &id)
}

/// Single-row overwrite of the subscription pair, scoped by the stable
/// billing-customer key. Returns the number of tenants updated.
pub fn update_subscription_by_customer(
    conn: &Connection,
    billing_customer_id: &str,
    subscription_status: &str,
    plan: Option<SubscriptionPlan>,
    end_date: Option<i64>,
) -> Result<usize> {
    let status = if subscription_activates(subscription_status) {
        TenantStatus::Active
    } else {
        TenantStatus::Inactive
    };
    let affected = conn.execute(
        "UPDATE tenants SET status = ?1, subscription_status = ?2,
             subscription_plan = COALESCE(?3, subscription_plan),
             subscription_end_date = ?4, updated_at = ?5
         WHERE billing_customer_id = ?6",
        params![
            status.as_str(),
            subscription_status,
            plan.map(|p| p.as_str()),
            end_date,
            now(),
            billing_customer_id
        ],
    )?;
    Ok(affected)
}

/// Same overwrite, scoped by the billing-subscription key. Plan is left
/// untouched; status and end date come straight from the event payload.
pub fn update_subscription_by_subscription(
    conn: &Connection,
    billing_subscription_id: &str,
    subscription_status: &str,
    end_date: Option<i64>,
) -> Result<usize> {
    let status = if subscription_activates(subscription_status) {
        TenantStatus::Active
    } else {
        TenantStatus::Inactive
    };
    let affected = conn.execute(
        "UPDATE tenants SET status = ?1, subscription_status = ?2,
             subscription_end_date = ?3, updated_at = ?4
         WHERE billing_subscription_id = ?5",
        params![
            status.as_str(),
            subscription_status,
            end_date,
            now(),
            billing_subscription_id
        ],
    )?;
    Ok(affected)
}

/// Failed invoice: PAST_DUE / INACTIVE unconditionally, plan and end date
/// untouched.
pub fn mark_past_due_by_subscription(
    conn: &Connection,
    billing_subscription_id: &str,
) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE tenants SET status = 'INACTIVE', subscription_status = 'PAST_DUE', updated_at = ?1
         WHERE billing_subscription_id = ?2",
        params![now(), billing_subscription_id],
    )?;
    Ok(affected)
}

/// Update descriptive fields from the tenant setup flow.
pub fn setup_tenant_profile(
    conn: &Connection,
    tenant_id: &str,
    input: &SetupTenant,
) -> Result<Option<Tenant>> {
    UpdateBuilder::new("tenants", tenant_id)
        .with_updated_at()
        .set("name", input.name.clone())
        .set_opt("address", input.address.clone())
        .set_opt("phone", input.phone.clone())
        .set_opt("logo_url", input.logo_url.clone())
        .execute_returning(conn, TENANT_COLS)
}

/// Manual admin override of the tenant status (platform console only).
pub fn set_tenant_status(conn: &Connection, tenant_id: &str, status: TenantStatus) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE tenants SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now(), tenant_id],
    )?;
    Ok(affected > 0)
}

pub fn delete_tenant(conn: &Connection, tenant_id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM tenants WHERE id = ?1", params![tenant_id])?;
    Ok(deleted > 0)
}

// ============ Products ============

pub fn create_product(conn: &Connection, tenant_id: &str, input: &CreateProduct) -> Result<Product> {
    let id = EntityType::Product.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO products (id, tenant_id, name, barcode, price_cents, stock, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            tenant_id,
            &input.name,
            &input.barcode,
            input.price_cents,
            input.stock,
            now,
            now
        ],
    )
    .map_err(|e| constraint_to_conflict(e, "A product with this barcode already exists"))?;

    Ok(Product {
        id,
        tenant_id: tenant_id.to_string(),
        name: input.name.clone(),
        barcode: input.barcode.clone(),
        price_cents: input.price_cents,
        stock: input.stock,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_product(conn: &Connection, tenant_id: &str, id: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM products WHERE id = ?1 AND tenant_id = ?2",
            PRODUCT_COLS
        ),
        &[&id, &tenant_id],
    )
}

pub fn list_products(conn: &Connection, tenant_id: &str) -> Result<Vec<Product>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 ORDER BY name ASC",
            PRODUCT_COLS
        ),
        &[&tenant_id],
    )
}

pub fn update_product(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
    input: &UpdateProduct,
) -> Result<Option<Product>> {
    // Scope check first - the UpdateBuilder works on the primary key only.
    if get_product(conn, tenant_id, id)?.is_none() {
        return Ok(None);
    }
    UpdateBuilder::new("products", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("barcode", input.barcode.clone())
        .set_opt("price_cents", input.price_cents)
        .set_opt("stock", input.stock)
        .execute_returning(conn, PRODUCT_COLS)
        .map_err(|e| match e {
            AppError::Database(db) => {
                constraint_to_conflict(db, "A product with this barcode already exists")
            }
            other => other,
        })
}

pub fn delete_product(conn: &Connection, tenant_id: &str, id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM products WHERE id = ?1 AND tenant_id = ?2",
        params![id, tenant_id],
    )?;
    Ok(deleted > 0)
}

// ============ Customers ============

pub fn create_customer(
    conn: &Connection,
    tenant_id: &str,
    input: &CreateCustomer,
) -> Result<Customer> {
    let id = EntityType::Customer.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO customers (id, tenant_id, name, email, phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&id, tenant_id, &input.name, &input.email, &input.phone, now],
    )?;

    Ok(Customer {
        id,
        tenant_id: tenant_id.to_string(),
        name: input.name.clone(),
        email: input.email.clone(),
        phone: input.phone.clone(),
        created_at: now,
    })
}

pub fn list_customers(conn: &Connection, tenant_id: &str) -> Result<Vec<Customer>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM customers WHERE tenant_id = ?1 ORDER BY name ASC",
            CUSTOMER_COLS
        ),
        &[&tenant_id],
    )
}

// ============ Sales ============

/// Create a sale: sale row, line items, and stock decrements in ONE
/// transaction. The conditional stock update guards against oversell under
/// concurrent checkouts - if any line has insufficient stock the whole
/// sale rolls back.
pub fn create_sale(
    conn: &mut Connection,
    tenant_id: &str,
    cashier_id: &str,
    input: &CreateSale,
) -> Result<SaleWithItems> {
    let tx = conn.transaction()?;
    let now = now();
    let sale_id = EntityType::Sale.gen_id();

    let mut items = Vec::with_capacity(input.items.len());
    let mut total_cents: i64 = 0;

    for line in &input.items {
        let product = query_one::<Product>(
            &tx,
            &format!(
                "SELECT {} FROM products WHERE id = ?1 AND tenant_id = ?2",
                PRODUCT_COLS
            ),
            &[&line.product_id, &tenant_id],
        )?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", line.product_id)))?;

        // Conditional decrement: fails the sale instead of going negative.
        let affected = tx.execute(
            "UPDATE products SET stock = stock - ?1, updated_at = ?2
             WHERE id = ?3 AND tenant_id = ?4 AND stock >= ?1",
            params![line.quantity, now, &line.product_id, tenant_id],
        )?;
        if affected == 0 {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }

        let item_id = EntityType::SaleItem.gen_id();
        tx.execute(
            "INSERT INTO sale_items (id, sale_id, product_id, quantity, unit_price_cents)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&item_id, &sale_id, &line.product_id, line.quantity, product.price_cents],
        )?;

        total_cents += product.price_cents * line.quantity;
        items.push(SaleItem {
            id: item_id,
            sale_id: sale_id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: product.price_cents,
        });
    }

    tx.execute(
        "INSERT INTO sales (id, tenant_id, cashier_id, customer_id, total_cents, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![&sale_id, tenant_id, cashier_id, &input.customer_id, total_cents, now],
    )?;

    tx.commit()?;

    Ok(SaleWithItems {
        sale: Sale {
            id: sale_id,
            tenant_id: tenant_id.to_string(),
            cashier_id: cashier_id.to_string(),
            customer_id: input.customer_id.clone(),
            total_cents,
            created_at: now,
        },
        items,
    })
}

pub fn list_sales(conn: &Connection, tenant_id: &str) -> Result<Vec<Sale>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM sales WHERE tenant_id = ?1 ORDER BY created_at DESC",
            SALE_COLS
        ),
        &[&tenant_id],
    )
}

pub fn list_sale_items(conn: &Connection, sale_id: &str) -> Result<Vec<SaleItem>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM sale_items WHERE sale_id = ?1",
            SALE_ITEM_COLS
        ),
        &[&sale_id],
    )
}

/// Map a UNIQUE-constraint violation to a Conflict, leave everything else
/// as a database error.
fn constraint_to_conflict(e: rusqlite::Error, message: &str) -> AppError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(e)
}
