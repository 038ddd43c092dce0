use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::directory;
use crate::error::{ApiError, ApiResult};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitLeave {
    #[schema(example = "ANNUAL")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-05-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-05-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "travel")]
    pub reason: String,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn target_status(self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveDto {
    #[schema(example = 1)]
    pub id: i64,
    pub employee_id: i64,
    pub employee_username: Option<String>,
    pub employee_real_name: Option<String>,
    pub approver_id: i64,
    pub approver_username: Option<String>,
    pub approver_real_name: Option<String>,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    #[schema(example = "2024-05-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-05-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    #[schema(example = "PENDING")]
    pub status: String,
    pub approver_comment: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: chrono::DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decided_at: Option<chrono::DateTime<Utc>>,
}

const LEAVE_SELECT: &str = r#"
    SELECT l.id, l.employee_id,
           e.username AS employee_username, e.real_name AS employee_real_name,
           l.approver_id,
           a.username AS approver_username, a.real_name AS approver_real_name,
           l.leave_type, l.start_date, l.end_date, l.reason, l.status,
           l.approver_comment, l.created_at, l.decided_at
    FROM leave_requests l
    LEFT JOIN users e ON e.id = l.employee_id
    LEFT JOIN users a ON a.id = l.approver_id
"#;

/// Approver resolution happens here, once: the applicant's immediate manager
/// at submission time. Later manager changes never retarget the request.
pub async fn submit(
    pool: &SqlitePool,
    applicant_id: i64,
    req: SubmitLeave,
) -> ApiResult<LeaveDto> {
    if req.reason.trim().is_empty() {
        return Err(ApiError::Validation("reason must not be empty".into()));
    }
    if req.end_date < req.start_date {
        return Err(ApiError::Validation(
            "end_date must not be before start_date".into(),
        ));
    }

    let chain = directory::resolve_manager_chain(pool, applicant_id).await?;
    let approver_id = *chain.first().ok_or(ApiError::NoManagerAssigned)?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, approver_id, leave_type, start_date, end_date,
             reason, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(applicant_id)
    .bind(approver_id)
    .bind(req.leave_type.to_string())
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.reason.trim())
    .bind(LeaveStatus::Pending.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get_request(pool, result.last_insert_rowid()).await
}

/// The exactly-once transition out of PENDING. The status check rides inside
/// the UPDATE itself, so two racing calls cannot both succeed.
pub async fn decide(
    pool: &SqlitePool,
    acting: &AuthUser,
    request_id: i64,
    decision: Decision,
    comment: Option<String>,
) -> ApiResult<LeaveDto> {
    let request = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, approver_id, leave_type, start_date, end_date,
               reason, status, approver_comment, created_at, decided_at
        FROM leave_requests
        WHERE id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("leave request {request_id} not found")))?;

    // ADMIN satisfies the approver check unconditionally.
    if acting.user_id != request.approver_id && !acting.roles.contains(Role::Admin) {
        return Err(ApiError::Forbidden(
            "only the resolved approver may decide this request".into(),
        ));
    }

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, approver_comment = ?, decided_at = ?
        WHERE id = ?
        AND status = ?
        "#,
    )
    .bind(decision.target_status().to_string())
    .bind(&comment)
    .bind(Utc::now())
    .bind(request_id)
    .bind(LeaveStatus::Pending.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::AlreadyDecided);
    }

    get_request(pool, request_id).await
}

pub async fn get_request(pool: &SqlitePool, id: i64) -> ApiResult<LeaveDto> {
    let sql = format!("{LEAVE_SELECT} WHERE l.id = ?");
    sqlx::query_as::<_, LeaveDto>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("leave request {id} not found")))
}

pub async fn list_mine(pool: &SqlitePool, applicant_id: i64) -> ApiResult<Vec<LeaveDto>> {
    let sql = format!("{LEAVE_SELECT} WHERE l.employee_id = ? ORDER BY l.created_at DESC, l.id DESC");
    Ok(sqlx::query_as::<_, LeaveDto>(&sql)
        .bind(applicant_id)
        .fetch_all(pool)
        .await?)
}

pub async fn list_to_approve(pool: &SqlitePool, approver_id: i64) -> ApiResult<Vec<LeaveDto>> {
    let sql = format!(
        "{LEAVE_SELECT} WHERE l.approver_id = ? AND l.status = ? ORDER BY l.created_at DESC, l.id DESC"
    );
    Ok(sqlx::query_as::<_, LeaveDto>(&sql)
        .bind(approver_id)
        .bind(LeaveStatus::Pending.to_string())
        .fetch_all(pool)
        .await?)
}

/// Admin leave panel: every applicant's pending requests.
pub async fn list_all_pending(pool: &SqlitePool) -> ApiResult<Vec<LeaveDto>> {
    let sql = format!("{LEAVE_SELECT} WHERE l.status = ? ORDER BY l.created_at DESC, l.id DESC");
    Ok(sqlx::query_as::<_, LeaveDto>(&sql)
        .bind(LeaveStatus::Pending.to_string())
        .fetch_all(pool)
        .await?)
}
