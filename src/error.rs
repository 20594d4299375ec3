use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, warn};

/// Failure taxonomy for the identity core.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    Validation(String),

    #[error("user already exists")]
    DuplicateEmail,

    #[error("Authorization Bearer token required")]
    MissingBearerToken,

    #[error("invalid token")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("malformed password hash")]
    InvalidHashFormat,

    #[error("storage error")]
    Storage(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

/// Error body returned to clients: a list of one item.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: Vec<ErrorItem>,
}

#[derive(Debug, Serialize)]
pub struct ErrorItem {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub code: u16,
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn of(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            error: vec![ErrorItem {
                timestamp: OffsetDateTime::now_utc(),
                code: status.as_u16(),
                detail: detail.into(),
            }],
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        // The four 401 causes share one outward detail string.
        let (status, detail) = match &self {
            IdentityError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            IdentityError::DuplicateEmail => (StatusCode::CONFLICT, self.to_string()),
            IdentityError::MissingBearerToken
            | IdentityError::TokenInvalid
            | IdentityError::TokenExpired
            | IdentityError::UserNotFound => {
                warn!(cause = %self, "request rejected as unauthorized");
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
            }
            IdentityError::InvalidHashFormat => {
                error!("stored password hash failed to parse");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            IdentityError::Storage(e) => {
                error!(error = %e, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            IdentityError::Internal(e) => {
                error!(error = %e, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorEnvelope::of(status, detail))).into_response()
    }
}
