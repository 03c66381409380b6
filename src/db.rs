// src/db.rs - Database migrations and pool setup

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;

pub async fn create_pool(db_config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&db_config.url)
        .with_context(|| format!("Invalid database URL: {}", db_config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(db_config.busy_timeout_seconds));

    let pool = SqlitePoolOptions::new()
        .max_connections(db_config.max_connections)
        .acquire_timeout(Duration::from_secs(db_config.connect_timeout))
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {}", db_config.url))?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create campuses table; money columns hold integer cents
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS campuses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 100),
            location TEXT NOT NULL CHECK(length(location) <= 200),
            contact_email TEXT CHECK(contact_email IS NULL OR length(contact_email) <= 120),
            contact_phone TEXT CHECK(contact_phone IS NULL OR length(contact_phone) <= 20),
            budget_allocated INTEGER NOT NULL DEFAULT 0,
            budget_used INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE CHECK(length(username) >= 3 AND length(username) <= 80),
            email TEXT NOT NULL UNIQUE CHECK(length(email) <= 120),
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK(
                role IN ('admin', 'manager', 'user')
            ),
            campus_id INTEGER,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (campus_id) REFERENCES campuses (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Create labs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS labs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 100),
            description TEXT,
            capacity INTEGER NOT NULL CHECK(capacity > 0),
            location TEXT CHECK(location IS NULL OR length(location) <= 200),
            equipment_list TEXT NOT NULL DEFAULT '[]',
            hourly_rate INTEGER NOT NULL DEFAULT 0 CHECK(hourly_rate >= 0),
            campus_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK(
                status IN ('active', 'maintenance', 'inactive')
            ),
            created_at DATETIME NOT NULL,
            FOREIGN KEY (campus_id) REFERENCES campuses (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Create inventory_items table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 100),
            description TEXT,
            category TEXT CHECK(category IS NULL OR length(category) <= 50),
            quantity_total INTEGER NOT NULL CHECK(quantity_total >= 0),
            quantity_available INTEGER NOT NULL CHECK(quantity_available >= 0),
            unit_cost INTEGER NOT NULL DEFAULT 0 CHECK(unit_cost >= 0),
            supplier TEXT CHECK(supplier IS NULL OR length(supplier) <= 100),
            purchase_date DATE,
            warranty_expiry DATE,
            lab_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK(
                status IN ('active', 'maintenance', 'retired')
            ),
            created_at DATETIME NOT NULL,
            FOREIGN KEY (lab_id) REFERENCES labs (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            lab_id INTEGER NOT NULL,
            start_time DATETIME NOT NULL,
            end_time DATETIME NOT NULL,
            purpose TEXT CHECK(purpose IS NULL OR length(purpose) <= 200),
            participants INTEGER NOT NULL DEFAULT 1 CHECK(participants >= 1),
            status TEXT NOT NULL DEFAULT 'pending' CHECK(
                status IN ('pending', 'confirmed', 'completed', 'cancelled')
            ),
            cost INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id),
            FOREIGN KEY (lab_id) REFERENCES labs (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Create budget_transactions table (append-only ledger)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS budget_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campus_id INTEGER NOT NULL,
            booking_id INTEGER,
            transaction_type TEXT NOT NULL CHECK(
                transaction_type IN ('booking', 'maintenance', 'purchase', 'allocation')
            ),
            amount INTEGER NOT NULL,
            description TEXT CHECK(description IS NULL OR length(description) <= 200),
            transaction_date DATETIME NOT NULL,
            FOREIGN KEY (campus_id) REFERENCES campuses (id),
            FOREIGN KEY (booking_id) REFERENCES bookings (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Create audit_logs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            user_id INTEGER,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT,
            description TEXT,
            ip_address TEXT,
            user_agent TEXT,
            created_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    create_indexes(pool).await?;

    log::info!("Database migrations completed");
    Ok(())
}

/// Foreign-key lookups used by scoped listings and reports.
async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_users_campus_id ON users(campus_id)",
        "CREATE INDEX IF NOT EXISTS idx_labs_campus_id ON labs(campus_id)",
        "CREATE INDEX IF NOT EXISTS idx_inventory_lab_id ON inventory_items(lab_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_lab_id ON bookings(lab_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_user_id ON bookings(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookings_created_at ON bookings(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_campus_id ON budget_transactions(campus_id)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_booking_id ON budget_transactions(booking_id)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON budget_transactions(transaction_date)",
        "CREATE INDEX IF NOT EXISTS idx_audit_logs_created_at ON audit_logs(created_at)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Fresh in-memory database with the full schema. One connection, because
    /// every `:memory:` connection is its own database.
    pub async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    /// File-backed database for tests that need several concurrent connections.
    pub async fn file_pool(dir: &tempfile::TempDir, max_connections: u32) -> SqlitePool {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("test.db").display()),
            max_connections,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }
}
