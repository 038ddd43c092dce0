use actix_web::{HttpRequest, HttpResponse, cookie::Cookie, cookie::SameSite, web};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::{SESSION_COOKIE, extract_token};
use crate::auth::password::verify_password;
use crate::auth::session_store::{create_session, invalidate_session, resolve_session};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::model::principal::{Principal, STATUS_LEFT};
use crate::model::role::RoleSet;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    pub password: String,
}

/// Shared by login and the rehydration call: exactly what the client may
/// cache, nothing more.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    #[schema(example = "alice")]
    pub username: String,
    pub roles: RoleSet,
}

fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Login endpoint. Issues a fresh session without touching the principal's
/// other live sessions.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = MeResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account inactive")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(username = %payload.username)
)]
pub async fn login(
    payload: web::Json<LoginRequest>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::Validation(
            "username and password are required".into(),
        ));
    }

    debug!("Fetching user");

    let row = sqlx::query_as::<_, Principal>(
        r#"
        SELECT id, username, password, real_name, roles, manager_id, status,
               department, position, phone, email, hire_date
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(payload.username.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let user = match row {
        Some(u) => {
            debug!(user_id = u.id, "User found");
            u
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    if user.status == STATUS_LEFT {
        info!("Login rejected: account inactive");
        return Err(ApiError::AccountInactive);
    }

    let roles = RoleSet::from_csv(&user.roles)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt role set: {e}")))?;

    let session = create_session(pool.get_ref(), user.id, config.session_ttl_secs).await?;

    info!("Login successful");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.token))
        .json(MeResponse {
            username: user.username,
            roles,
        }))
}

/// The rehydration call: side-effect-free identity lookup for the session
/// the request carries.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "Auth"
)]
pub async fn me(req: HttpRequest, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    let token = extract_token(&req).ok_or(ApiError::Unauthenticated)?;
    let user = resolve_session(pool.get_ref(), &token).await?;

    Ok(HttpResponse::Ok().json(MeResponse {
        username: user.username,
        roles: user.roles,
    }))
}

/// Idempotent logout: the session row and cookie are both dropped; an
/// already-invalid token is not an error.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session invalidated")),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, pool: web::Data<SqlitePool>) -> ApiResult<HttpResponse> {
    if let Some(token) = extract_token(&req) {
        invalidate_session(pool.get_ref(), &token).await?;
    }

    let mut removal = session_cookie("");
    removal.make_removal();

    Ok(HttpResponse::NoContent().cookie(removal).finish())
}
