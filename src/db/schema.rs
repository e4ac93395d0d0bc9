use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        -- Users (identity - credential store)
        -- password_hash is NULL for federated users.
        -- super_admin is set only by the bootstrap provisioning path.
        -- current_tenant_id is the explicit active-tenant pointer.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            verification_code_hash TEXT,
            provider TEXT NOT NULL CHECK (provider IN ('credentials', 'federated')),
            billing_customer_id TEXT,
            super_admin INTEGER NOT NULL DEFAULT 0,
            current_tenant_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        CREATE INDEX IF NOT EXISTS idx_users_billing_customer ON users(billing_customer_id);

        -- Tenants (business accounts)
        -- status ACTIVE/INACTIVE is derived from subscription_status by the
        -- webhook reconciler; SUSPENDED is a manual admin override.
        -- billing_subscription_id is UNIQUE: tenant creation is keyed on it
        -- so webhook redelivery cannot create duplicate tenants.
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('ACTIVE', 'INACTIVE', 'SUSPENDED')),
            subscription_status TEXT NOT NULL,
            subscription_plan TEXT CHECK (subscription_plan IS NULL OR subscription_plan IN ('MONTHLY', 'YEARLY')),
            subscription_end_date INTEGER,
            billing_customer_id TEXT,
            billing_subscription_id TEXT UNIQUE,
            address TEXT,
            phone TEXT,
            logo_url TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tenants_billing_customer ON tenants(billing_customer_id);

        -- Memberships (User <-> Tenant with a role per membership)
        CREATE TABLE IF NOT EXISTS memberships (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            role TEXT NOT NULL CHECK (role IN ('owner', 'manager', 'cashier')),
            created_at INTEGER NOT NULL,
            UNIQUE(user_id, tenant_id)
        );
        CREATE INDEX IF NOT EXISTS idx_memberships_user ON memberships(user_id);
        CREATE INDEX IF NOT EXISTS idx_memberships_tenant ON memberships(tenant_id);

        -- Products (catalog, tenant-scoped; barcode unique within a tenant)
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            barcode TEXT,
            price_cents INTEGER NOT NULL,
            stock INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(tenant_id, barcode)
        );
        CREATE INDEX IF NOT EXISTS idx_products_tenant ON products(tenant_id);

        -- Customers (tenant-scoped)
        CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_customers_tenant ON customers(tenant_id);

        -- Sales (tenant-scoped; cashier_id preserved for history, which is
        -- why users with sales cannot be deleted)
        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            cashier_id TEXT NOT NULL REFERENCES users(id),
            customer_id TEXT REFERENCES customers(id) ON DELETE SET NULL,
            total_cents INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sales_tenant_time ON sales(tenant_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_sales_cashier ON sales(cashier_id);

        CREATE TABLE IF NOT EXISTS sale_items (
            id TEXT PRIMARY KEY,
            sale_id TEXT NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
            product_id TEXT NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL,
            unit_price_cents INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sale_items_sale ON sale_items(sale_id);
        "#,
    )?;
    Ok(())
}
