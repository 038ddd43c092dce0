use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

use crate::attendance;
use crate::auth::auth::AuthUser;
use crate::error::ApiResult;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceRange {
    /// Start of range; defaults to 30 days ago
    #[param(example = "2024-05-01", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// End of range; defaults to today
    #[param(example = "2024-05-31", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Checked in"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Already checked in today")
    ),
    tag = "Attendance"
)]
pub async fn check_in(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    let record = attendance::check_in(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No check-in yet, or already checked out")
    ),
    tag = "Attendance"
)]
pub async fn check_out(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    let record = attendance::check_out(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Own attendance, optional date range (defaults to the last 30 days)
#[utoipa::path(
    get,
    path = "/api/attendance/my",
    params(AttendanceRange),
    responses(
        (status = 200, description = "Own records, newest first"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<AttendanceRange>,
) -> ApiResult<HttpResponse> {
    let list =
        attendance::my_attendance(pool.get_ref(), auth.user_id, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(list))
}
