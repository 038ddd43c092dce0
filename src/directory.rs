use std::collections::HashSet;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::auth::password::hash_password;
use crate::auth::session_store;
use crate::error::{ApiError, ApiResult, is_unique_violation};
use crate::model::principal::{STATUS_ACTIVE, STATUS_LEFT};
use crate::model::role::RoleSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePrincipal {
    pub username: String,
    pub password: String,
    pub real_name: String,
    /// Defaults to {EMPLOYEE}; validated against the closed enum by serde.
    #[serde(default)]
    pub roles: Option<RoleSet>,
    pub manager_id: Option<i64>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrincipalDto {
    pub id: i64,
    pub username: String,
    pub real_name: String,
    pub roles: RoleSet,
    pub status: String,
    pub manager_id: Option<i64>,
    pub manager_username: Option<String>,
    pub manager_real_name: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ManagerOption {
    pub id: i64,
    pub username: String,
    pub real_name: String,
}

#[derive(sqlx::FromRow)]
struct PrincipalJoinRow {
    id: i64,
    username: String,
    real_name: String,
    roles: String,
    status: String,
    manager_id: Option<i64>,
    manager_username: Option<String>,
    manager_real_name: Option<String>,
    department: Option<String>,
    position: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    hire_date: Option<NaiveDate>,
}

impl PrincipalJoinRow {
    fn into_dto(self) -> ApiResult<PrincipalDto> {
        let roles = RoleSet::from_csv(&self.roles)
            .map_err(|e| ApiError::Internal(anyhow!("corrupt role set for user {}: {e}", self.id)))?;
        Ok(PrincipalDto {
            id: self.id,
            username: self.username,
            real_name: self.real_name,
            roles,
            status: self.status,
            manager_id: self.manager_id,
            manager_username: self.manager_username,
            manager_real_name: self.manager_real_name,
            department: self.department,
            position: self.position,
            phone: self.phone,
            email: self.email,
            hire_date: self.hire_date,
        })
    }
}

const PRINCIPAL_SELECT: &str = r#"
    SELECT u.id, u.username, u.real_name, u.roles, u.status,
           u.manager_id, m.username AS manager_username, m.real_name AS manager_real_name,
           u.department, u.position, u.phone, u.email, u.hire_date
    FROM users u
    LEFT JOIN users m ON m.id = u.manager_id
"#;

pub async fn create_principal(
    pool: &SqlitePool,
    req: CreatePrincipal,
) -> ApiResult<PrincipalDto> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username must not be empty".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("password must not be empty".into()));
    }
    if req.real_name.trim().is_empty() {
        return Err(ApiError::Validation("real name must not be empty".into()));
    }

    let roles = req.roles.unwrap_or_else(RoleSet::employee);
    if roles.is_empty() {
        return Err(ApiError::Validation("at least one role is required".into()));
    }

    if let Some(manager_id) = req.manager_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
                .bind(manager_id)
                .fetch_one(pool)
                .await?;
        if !exists {
            return Err(ApiError::UnknownManager);
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (username, password, real_name, roles, manager_id, status,
             department, position, phone, email, hire_date)
        VALUES (?, ?, ?, ?, ?, 'ACTIVE', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(hash_password(&req.password))
    .bind(req.real_name.trim())
    .bind(roles.to_csv())
    .bind(req.manager_id)
    .bind(&req.department)
    .bind(&req.position)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(req.hire_date)
    .execute(pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => return Err(ApiError::DuplicateUsername),
        Err(e) => return Err(e.into()),
    };

    get_principal(pool, id).await
}

pub async fn get_principal(pool: &SqlitePool, id: i64) -> ApiResult<PrincipalDto> {
    let sql = format!("{PRINCIPAL_SELECT} WHERE u.id = ?");
    sqlx::query_as::<_, PrincipalJoinRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?
        .into_dto()
}

pub async fn list_principals(pool: &SqlitePool) -> ApiResult<Vec<PrincipalDto>> {
    let sql = format!("{PRINCIPAL_SELECT} ORDER BY u.id");
    let rows = sqlx::query_as::<_, PrincipalJoinRow>(&sql)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(PrincipalJoinRow::into_dto).collect()
}

/// Deletion policy: principals woven into leave history are only flipped to
/// LEFT; otherwise the row is removed and subordinate manager links are
/// nulled so no dangling reference survives. Sessions are revoked either way.
pub async fn delete_principal(
    pool: &SqlitePool,
    acting_user_id: i64,
    id: i64,
) -> ApiResult<()> {
    if id == acting_user_id {
        return Err(ApiError::CannotDeleteSelf);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ApiError::NotFound(format!("user {id} not found")));
    }

    let referenced: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM leave_requests WHERE employee_id = ? OR approver_id = ?)",
    )
    .bind(id)
    .bind(id)
    .fetch_one(pool)
    .await?;

    if referenced {
        sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(STATUS_LEFT)
            .bind(id)
            .execute(pool)
            .await?;
    } else {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        sqlx::query("UPDATE users SET manager_id = NULL WHERE manager_id = ?")
            .bind(id)
            .execute(pool)
            .await?;
    }

    session_store::revoke_all_for_user(pool, id).await?;

    Ok(())
}

/// Only ACTIVE principals may be routed new approvals.
pub async fn list_manager_candidates(pool: &SqlitePool) -> ApiResult<Vec<ManagerOption>> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, username, real_name FROM users WHERE status = ? ORDER BY username",
    )
    .bind(STATUS_ACTIVE)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, username, real_name)| ManagerOption {
            id,
            username,
            real_name,
        })
        .collect())
}

/// Ordered ids from immediate manager upward. The current workflow only
/// consumes the first element, but the walk must fail closed on a cycle
/// rather than loop.
pub async fn resolve_manager_chain(pool: &SqlitePool, user_id: i64) -> ApiResult<Vec<i64>> {
    let mut visited = HashSet::from([user_id]);
    let mut chain = Vec::new();
    let mut current = user_id;

    loop {
        let manager_id: Option<i64> =
            sqlx::query_scalar("SELECT manager_id FROM users WHERE id = ?")
                .bind(current)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("user {current} not found")))?;

        match manager_id {
            Some(next) => {
                if !visited.insert(next) {
                    return Err(ApiError::ManagerCycleDetected);
                }
                chain.push(next);
                current = next;
            }
            None => return Ok(chain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn req(username: &str, manager_id: Option<i64>) -> CreatePrincipal {
        CreatePrincipal {
            username: username.to_string(),
            password: "pw".to_string(),
            real_name: username.to_uppercase(),
            manager_id,
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn create_requires_mandatory_fields() {
        let pool = memory_pool().await;

        let blank = CreatePrincipal {
            username: "  ".to_string(),
            password: "pw".to_string(),
            real_name: "X".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_principal(&pool, blank).await,
            Err(ApiError::Validation(_))
        ));

        let no_password = CreatePrincipal {
            username: "x".to_string(),
            password: String::new(),
            real_name: "X".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_principal(&pool, no_password).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn duplicate_username_is_a_conflict() {
        let pool = memory_pool().await;
        create_principal(&pool, req("alice", None)).await.unwrap();
        assert!(matches!(
            create_principal(&pool, req("alice", None)).await,
            Err(ApiError::DuplicateUsername)
        ));
    }

    #[actix_web::test]
    async fn unknown_manager_is_rejected() {
        let pool = memory_pool().await;
        assert!(matches!(
            create_principal(&pool, req("alice", Some(999))).await,
            Err(ApiError::UnknownManager)
        ));
    }

    #[actix_web::test]
    async fn cannot_delete_self() {
        let pool = memory_pool().await;
        let admin = create_principal(&pool, req("root", None)).await.unwrap();
        assert!(matches!(
            delete_principal(&pool, admin.id, admin.id).await,
            Err(ApiError::CannotDeleteSelf)
        ));
    }

    #[actix_web::test]
    async fn delete_nulls_subordinate_manager_links() {
        let pool = memory_pool().await;
        let admin = create_principal(&pool, req("root", None)).await.unwrap();
        let boss = create_principal(&pool, req("boss", None)).await.unwrap();
        let worker = create_principal(&pool, req("worker", Some(boss.id)))
            .await
            .unwrap();

        delete_principal(&pool, admin.id, boss.id).await.unwrap();

        let reloaded = get_principal(&pool, worker.id).await.unwrap();
        assert_eq!(reloaded.manager_id, None);
    }

    #[actix_web::test]
    async fn referenced_principal_is_soft_deleted() {
        let pool = memory_pool().await;
        let admin = create_principal(&pool, req("root", None)).await.unwrap();
        let boss = create_principal(&pool, req("boss", None)).await.unwrap();
        let worker = create_principal(&pool, req("worker", Some(boss.id)))
            .await
            .unwrap();

        sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, approver_id, leave_type, start_date, end_date,
                 reason, status, created_at)
            VALUES (?, ?, 'ANNUAL', '2024-05-01', '2024-05-02', 'travel', 'PENDING', ?)
            "#,
        )
        .bind(worker.id)
        .bind(boss.id)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        delete_principal(&pool, admin.id, boss.id).await.unwrap();

        let reloaded = get_principal(&pool, boss.id).await.unwrap();
        assert_eq!(reloaded.status, STATUS_LEFT);
    }

    #[actix_web::test]
    async fn candidates_exclude_left_principals() {
        let pool = memory_pool().await;
        create_principal(&pool, req("active", None)).await.unwrap();
        let gone = create_principal(&pool, req("gone", None)).await.unwrap();
        sqlx::query("UPDATE users SET status = 'LEFT' WHERE id = ?")
            .bind(gone.id)
            .execute(&pool)
            .await
            .unwrap();

        let candidates = list_manager_candidates(&pool).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].username, "active");
    }

    #[actix_web::test]
    async fn manager_chain_walks_upward() {
        let pool = memory_pool().await;
        let top = create_principal(&pool, req("top", None)).await.unwrap();
        let mid = create_principal(&pool, req("mid", Some(top.id)))
            .await
            .unwrap();
        let leaf = create_principal(&pool, req("leaf", Some(mid.id)))
            .await
            .unwrap();

        let chain = resolve_manager_chain(&pool, leaf.id).await.unwrap();
        assert_eq!(chain, vec![mid.id, top.id]);
    }

    #[actix_web::test]
    async fn manager_cycle_fails_closed() {
        let pool = memory_pool().await;
        let a = create_principal(&pool, req("a", None)).await.unwrap();
        let b = create_principal(&pool, req("b", Some(a.id))).await.unwrap();
        sqlx::query("UPDATE users SET manager_id = ? WHERE id = ?")
            .bind(b.id)
            .bind(a.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            resolve_manager_chain(&pool, a.id).await,
            Err(ApiError::ManagerCycleDetected)
        ));
    }
}
