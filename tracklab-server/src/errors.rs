use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracklab_collab::{
    AiError, AuthError, DatabaseError, LedgerError, ProcessingError, ProjectError,
};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing authorization")]
    Unauthorized,
    #[error("Session expired")]
    SessionExpired,
    #[error("Insufficient credits: {required} required, {balance} available")]
    InsufficientCredits { required: f64, balance: f64 },
    #[error("Access denied")]
    Forbidden,
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("File exceeds the upload limit")]
    PayloadTooLarge,
    #[error("Too many requests, try again later")]
    TooManyRequests,
    #[error("Audio processing failed: {0}")]
    Upstream(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A stable machine-readable name for the error
    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unauthorized => "unauthorized",
            Self::SessionExpired => "session_expired",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::Forbidden => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::PayloadTooLarge => "payload_too_large",
            Self::TooManyRequests => "rate_limited",
            Self::Upstream(_) => "upstream_error",
            Self::Unknown(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            log::error!("{}", self);
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::SessionExpired => Self::SessionExpired,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<ProjectError> for ServerError {
    fn from(value: ProjectError) -> Self {
        match value {
            ProjectError::Forbidden => Self::Forbidden,
            ProjectError::Db(e) => e.into(),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::InsufficientCredits { required, balance } => {
                Self::InsufficientCredits { required, balance }
            }
            LedgerError::Db(e) => e.into(),
        }
    }
}

impl From<AiError> for ServerError {
    fn from(value: AiError) -> Self {
        match value {
            AiError::MissingParameter(field) => {
                Self::Validation(format!("Missing parameter: {}", field))
            }
            AiError::Ledger(e) => e.into(),
        }
    }
}

impl From<ProcessingError> for ServerError {
    fn from(value: ProcessingError) -> Self {
        match value {
            e @ (ProcessingError::Tool { .. }
            | ProcessingError::Timeout { .. }
            | ProcessingError::Spawn { .. }) => Self::Upstream(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}
