use anyhow::anyhow;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::model::principal::{Principal, STATUS_LEFT};
use crate::model::role::RoleSet;
use crate::model::session::Session;
use crate::utils::session_cache;

/// Issue a fresh token for the principal. Existing sessions are untouched;
/// concurrent logins from several devices are allowed.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    ttl_secs: i64,
) -> ApiResult<Session> {
    let now = Utc::now();
    let session = Session {
        token: Uuid::new_v4().to_string(),
        user_id,
        created_at: now,
        expires_at: now + Duration::seconds(ttl_secs),
    };

    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.token)
    .bind(session.user_id)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await?;

    session_cache::insert(&session).await;

    Ok(session)
}

/// The single rehydration primitive: token in, identity out. Side-effect
/// free apart from lazily dropping an expired row.
///
/// The cache holds only the token row; the principal is re-read on every
/// resolve, so deleting or deactivating an account needs no cache sweep.
pub async fn resolve_session(pool: &SqlitePool, token: &str) -> ApiResult<AuthUser> {
    let session = match session_cache::get(token).await {
        Some(s) => Some(s),
        None => {
            let row = sqlx::query_as::<_, Session>(
                "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
            )
            .bind(token)
            .fetch_optional(pool)
            .await?;

            if let Some(ref s) = row {
                session_cache::insert(s).await;
            }
            row
        }
    };

    let session = session.ok_or(ApiError::Unauthenticated)?;

    if session.is_expired(Utc::now()) {
        invalidate_session(pool, token).await?;
        return Err(ApiError::Unauthenticated);
    }

    let user = sqlx::query_as::<_, Principal>(
        r#"
        SELECT id, username, password, real_name, roles, manager_id, status,
               department, position, phone, email, hire_date
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(session.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::Unauthenticated)?;

    // A LEFT principal's sessions die with the account flip.
    if user.status == STATUS_LEFT {
        return Err(ApiError::Unauthenticated);
    }

    let roles = RoleSet::from_csv(&user.roles)
        .map_err(|e| ApiError::Internal(anyhow!("corrupt role set for user {}: {e}", user.id)))?;

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        roles,
    })
}

/// Idempotent: unknown tokens are not an error.
pub async fn invalidate_session(pool: &SqlitePool, token: &str) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    session_cache::invalidate(token).await;
    Ok(())
}

/// Used when an account is deleted or flipped to LEFT.
pub async fn revoke_all_for_user(pool: &SqlitePool, user_id: i64) -> ApiResult<()> {
    sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn purge_expired(pool: &SqlitePool) -> ApiResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
