use actix_web::{HttpResponse, web};
use sqlx::SqlitePool;

use crate::auth::auth::AuthUser;
use crate::directory::{self, CreatePrincipal};
use crate::error::ApiResult;

/// Admin: staff table
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All principals with manager info", body = [directory::PrincipalDto]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users"
)]
pub async fn list_users(auth: AuthUser, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let list = directory::list_principals(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(list))
}

/// Admin: create a principal (optionally with a manager reference)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreatePrincipal,
    responses(
        (status = 201, description = "Created", body = directory::PrincipalDto),
        (status = 400, description = "Missing fields or unknown manager"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreatePrincipal>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let created = directory::create_principal(pool.get_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Admin: delete (or deactivate) a principal
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "Principal id")),
    responses(
        (status = 204, description = "Deleted or deactivated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No such principal"),
        (status = 409, description = "Cannot delete own account")
    ),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    directory::delete_principal(pool.get_ref(), auth.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Admin: manager candidates for approver routing
#[utoipa::path(
    get,
    path = "/api/meta/managers",
    responses(
        (status = 200, description = "Active principals eligible as managers", body = [directory::ManagerOption]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users"
)]
pub async fn manager_candidates(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let list = directory::list_manager_candidates(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(list))
}
