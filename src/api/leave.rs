use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::ApiResult;
use crate::workflow::{self, Decision, SubmitLeave};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecideRequest {
    #[schema(example = "ok")]
    pub comment: Option<String>,
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = SubmitLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = workflow::LeaveDto),
        (status = 400, description = "Bad dates or empty reason"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "No manager assigned")
    ),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<SubmitLeave>,
) -> ApiResult<HttpResponse> {
    let created = workflow::submit(pool.get_ref(), auth.user_id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/* =========================
My requests
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/my",
    responses(
        (status = 200, description = "Own requests, newest first", body = [workflow::LeaveDto]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Leave"
)]
pub async fn my_leaves(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    let list = workflow::list_mine(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(list))
}

/* =========================
Requests awaiting me
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/to-approve",
    responses(
        (status = 200, description = "Pending requests routed to the caller", body = [workflow::LeaveDto]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Leave"
)]
pub async fn to_approve(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    let list = workflow::list_to_approve(pool.get_ref(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(list))
}

/* =========================
Admin: all pending
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Every pending request", body = [workflow::LeaveDto]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn all_pending(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let list = workflow::list_all_pending(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(list))
}

/* =========================
Approve
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/{id}/approve",
    params(("id" = i64, Path, description = "Leave request id")),
    request_body = DecideRequest,
    responses(
        (status = 200, description = "Approved", body = workflow::LeaveDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the resolved approver"),
        (status = 404, description = "No such request"),
        (status = 409, description = "Already decided")
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<DecideRequest>,
) -> ApiResult<HttpResponse> {
    let decided = workflow::decide(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        Decision::Approve,
        payload.into_inner().comment,
    )
    .await?;
    Ok(HttpResponse::Ok().json(decided))
}

/* =========================
Reject
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/{id}/reject",
    params(("id" = i64, Path, description = "Leave request id")),
    request_body = DecideRequest,
    responses(
        (status = 200, description = "Rejected", body = workflow::LeaveDto),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the resolved approver"),
        (status = 404, description = "No such request"),
        (status = 409, description = "Already decided")
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<DecideRequest>,
) -> ApiResult<HttpResponse> {
    let decided = workflow::decide(
        pool.get_ref(),
        &auth,
        path.into_inner(),
        Decision::Reject,
        payload.into_inner().comment,
    )
    .await?;
    Ok(HttpResponse::Ok().json(decided))
}
