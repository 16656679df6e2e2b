use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Request-level failure. Every handler returns `Result<_, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("This email is already registered.")]
    DuplicateEmail,

    /// Same message whether the email is unknown or the password is wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("upstream service failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::DuplicateEmail;
            }
        }
        AppError::Internal(anyhow::Error::new(e).context("database"))
    }
}

/// Body rejections become 400s with a fixed message; serde's detail is only logged.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected json body");
        let msg = match rejection {
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON.",
            JsonRejection::MissingJsonContentType(_) => {
                "Expected a JSON body with Content-Type: application/json."
            }
            _ => "Request body has missing or invalid fields.",
        };
        AppError::invalid(msg)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(e) => {
                warn!(error = %e.body_text(), "rejected path parameter");
                AppError::invalid("Invalid path parameter.")
            }
            other => AppError::Internal(anyhow::anyhow!(other.body_text())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "An error occurred while processing your request.".to_string()
            }
            AppError::Upstream(msg) => {
                error!(error = %msg, "upstream error");
                "Upstream service is unavailable.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
