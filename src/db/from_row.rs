//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! Models implement `FromRow` to define how they are constructed from
//! database rows; `query_one`/`query_all` build on it for the common
//! query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum, converting parse errors to rusqlite
/// errors instead of panicking on corrupted values.
fn parse_col<T>(
    row: &Row,
    col: usize,
    col_name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, password_hash, verified, verification_code_hash, provider, billing_customer_id, super_admin, current_tenant_id, created_at, updated_at";

pub const TENANT_COLS: &str = "id, name, status, subscription_status, subscription_plan, subscription_end_date, billing_customer_id, billing_subscription_id, address, phone, logo_url, created_at, updated_at";

pub const MEMBERSHIP_COLS: &str = "id, user_id, tenant_id, role, created_at";

pub const MEMBERSHIP_WITH_TENANT_COLS: &str = "m.id, m.tenant_id, m.role, t.name, t.status, t.subscription_status, t.subscription_end_date";

pub const EMPLOYEE_COLS: &str = "u.id, u.email, u.name, m.role, u.verified, m.created_at";

pub const PRODUCT_COLS: &str =
    "id, tenant_id, name, barcode, price_cents, stock, created_at, updated_at";

pub const CUSTOMER_COLS: &str = "id, tenant_id, name, email, phone, created_at";

pub const SALE_COLS: &str = "id, tenant_id, cashier_id, customer_id, total_cents, created_at";

pub const SALE_ITEM_COLS: &str = "id, sale_id, product_id, quantity, unit_price_cents";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            verified: row.get(4)?,
            verification_code_hash: row.get(5)?,
            provider: parse_col(row, 6, "provider", AuthProvider::from_str)?,
            billing_customer_id: row.get(7)?,
            super_admin: row.get(8)?,
            current_tenant_id: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl FromRow for Tenant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let plan: Option<String> = row.get(4)?;
        Ok(Tenant {
            id: row.get(0)?,
            name: row.get(1)?,
            status: parse_col(row, 2, "status", TenantStatus::from_str)?,
            subscription_status: row.get(3)?,
            subscription_plan: plan.and_then(|p| SubscriptionPlan::from_str(&p)),
            subscription_end_date: row.get(5)?,
            billing_customer_id: row.get(6)?,
            billing_subscription_id: row.get(7)?,
            address: row.get(8)?,
            phone: row.get(9)?,
            logo_url: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl FromRow for Membership {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Membership {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tenant_id: row.get(2)?,
            role: parse_col(row, 3, "role", TenantRole::from_str)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for MembershipWithTenant {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(MembershipWithTenant {
            membership_id: row.get(0)?,
            tenant_id: row.get(1)?,
            role: parse_col(row, 2, "role", TenantRole::from_str)?,
            tenant_name: row.get(3)?,
            tenant_status: parse_col(row, 4, "status", TenantStatus::from_str)?,
            subscription_status: row.get(5)?,
            subscription_end_date: row.get(6)?,
        })
    }
}

impl FromRow for EmployeeWithRole {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(EmployeeWithRole {
            user_id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            role: parse_col(row, 3, "role", TenantRole::from_str)?,
            verified: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            barcode: row.get(3)?,
            price_cents: row.get(4)?,
            stock: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl FromRow for Customer {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Customer {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Sale {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Sale {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            cashier_id: row.get(2)?,
            customer_id: row.get(3)?,
            total_cents: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for SaleItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(SaleItem {
            id: row.get(0)?,
            sale_id: row.get(1)?,
            product_id: row.get(2)?,
            quantity: row.get(3)?,
            unit_price_cents: row.get(4)?,
        })
    }
}
