use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use sqlx::SqlitePool;

use crate::auth::auth::extract_token;
use crate::auth::session_store::resolve_session;
use crate::error::ApiError;

/// Resolves the session once per request and stashes the identity for the
/// `AuthUser` extractor. The session store is the only authority consulted;
/// nothing the client sent beyond the token is trusted.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let pool = req
        .app_data::<Data<SqlitePool>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Pool missing"))?;

    let token = match extract_token(req.request()) {
        Some(t) => t,
        None => return Err(ApiError::Unauthenticated.into()),
    };

    match resolve_session(&pool, &token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(e) => Err(e.into()),
    }
}
