use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::role::RoleSet;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        real_name TEXT NOT NULL,
        roles TEXT NOT NULL,
        manager_id INTEGER,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        department TEXT,
        position TEXT,
        phone TEXT,
        email TEXT,
        hire_date DATE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL,
        created_at DATETIME NOT NULL,
        expires_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leave_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id INTEGER NOT NULL,
        approver_id INTEGER NOT NULL,
        leave_type TEXT NOT NULL,
        start_date DATE NOT NULL,
        end_date DATE NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        approver_comment TEXT,
        created_at DATETIME NOT NULL,
        decided_at DATETIME
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        date DATE NOT NULL,
        check_in TIME,
        check_out TIME,
        status TEXT,
        UNIQUE (user_id, date)
    )
    "#,
];

pub async fn init_db(database_url: &str) -> SqlitePool {
    let options = SqliteConnectOptions::from_str(database_url)
        .expect("invalid DATABASE_URL")
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to connect to database");

    init_schema(&pool).await.expect("Failed to apply schema");

    pool
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Ephemeral single-connection database; every connection to
/// `sqlite::memory:` is its own database, so the pool must not grow and the
/// one connection must never be reaped.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    init_schema(&pool).await.expect("Failed to apply schema");

    pool
}

/// First-run bootstrap: without at least one admin no staff can be created.
pub async fn seed_admin(pool: &SqlitePool, config: &Config) -> Result<(), sqlx::Error> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO users (username, password, real_name, roles, status)
        VALUES (?, ?, 'Administrator', ?, 'ACTIVE')
        "#,
    )
    .bind(&config.admin_username)
    .bind(hash_password(&config.admin_password))
    .bind(RoleSet::admin().to_csv())
    .execute(pool)
    .await?;

    tracing::info!(username = %config.admin_username, "Seeded initial admin account");
    Ok(())
}
