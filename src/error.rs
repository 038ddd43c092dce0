use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy surfaced by the directory, workflow and session store.
/// The transport layer maps each variant to a status code; nothing is
/// retried, every failure is terminal for its request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("username already exists")]
    DuplicateUsername,

    #[error("leave request already decided")]
    AlreadyDecided,

    #[error("already checked in today")]
    AlreadyCheckedIn,

    #[error("already checked out today")]
    AlreadyCheckedOut,

    #[error("no check-in recorded for today")]
    NoCheckInYet,

    #[error("cannot delete the currently authenticated account")]
    CannotDeleteSelf,

    #[error("manager does not exist")]
    UnknownManager,

    #[error("no manager assigned")]
    NoManagerAssigned,

    #[error("manager chain contains a cycle")]
    ManagerCycleDetected,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable machine-readable code reported to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "Unauthenticated",
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::AccountInactive => "AccountInactive",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Validation(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFound",
            ApiError::DuplicateUsername => "DuplicateUsername",
            ApiError::AlreadyDecided => "AlreadyDecided",
            ApiError::AlreadyCheckedIn => "AlreadyCheckedIn",
            ApiError::AlreadyCheckedOut => "AlreadyCheckedOut",
            ApiError::NoCheckInYet => "NoCheckInYet",
            ApiError::CannotDeleteSelf => "CannotDeleteSelf",
            ApiError::UnknownManager => "UnknownManager",
            ApiError::NoManagerAssigned => "NoManagerAssigned",
            ApiError::ManagerCycleDetected => "ManagerCycleDetected",
            ApiError::Database(_) | ApiError::Internal(_) => "Internal",
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::AccountInactive | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::UnknownManager => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateUsername
            | ApiError::AlreadyDecided
            | ApiError::AlreadyCheckedIn
            | ApiError::AlreadyCheckedOut
            | ApiError::NoCheckInYet
            | ApiError::CannotDeleteSelf => StatusCode::CONFLICT,
            ApiError::NoManagerAssigned | ApiError::ManagerCycleDetected => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal",
                "message": "Internal Server Error"
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// SQLite reports UNIQUE violations both for plain unique indexes and for
/// primary keys; collapse the distinction for callers.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
