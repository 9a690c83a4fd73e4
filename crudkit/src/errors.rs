//! # Error handling for repositories and handlers
//!
//! [`ApiError`] is the single error type returned by the repository layer and accepted by
//! axum handlers. Every variant maps to an HTTP status class and renders a sanitized JSON
//! body; database details are logged with `tracing` and never sent to clients.
//!
//! ```rust,ignore
//! use crudkit::{ApiError, ExecContext};
//!
//! async fn show(repo: &UserRepository, id: i32) -> Result<Json<User>, ApiError> {
//!     // Storage failures, not-found and cancellation all arrive as ApiError
//!     let user = repo.find_by_id(&ExecContext::new(), id).await?;
//!     Ok(Json(user))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

/// 499 is nginx's "client closed request"; not a registered `StatusCode` constant.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// API error type with automatic logging and sanitized responses.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        /// Resource type (e.g. "users")
        resource: String,
        /// Optional ID that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request
    BadRequest { message: String },

    /// 401 Unauthorized
    Unauthorized { message: String },

    /// 403 Forbidden
    Forbidden { message: String },

    /// 409 Conflict, e.g. a duplicate key
    Conflict {
        message: String,
        /// Underlying storage error, when the conflict came from the database
        internal: Option<DbErr>,
    },

    /// 422 Unprocessable Entity
    ValidationFailed { errors: Vec<String> },

    /// 500 Internal Server Error from the storage layer (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error
    Internal {
        message: String,
        internal: Option<String>,
    },

    /// 499 The caller cancelled the operation before storage answered
    Cancelled { operation: String },

    /// 504 The operation's deadline passed before storage answered
    Timeout { operation: String },

    /// Custom error with specific status code
    Custom {
        status: StatusCode,
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 404 Not Found error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::not_found("users", Some(id.to_string())));
    /// ```
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            internal: None,
        }
    }

    /// Create a 422 Validation Failed error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::validation_failed(vec![
    ///     "email: has already been taken".to_string(),
    /// ]));
    /// ```
    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create a 500 Internal Server Error from a database error.
    ///
    /// Unlike the `From<DbErr>` conversion this never reclassifies the error.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn custom(status: StatusCode, message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Custom {
            status,
            message: message.into(),
            internal,
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancelled { .. } => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::REQUEST_TIMEOUT),
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Custom { status, .. } => *status,
        }
    }

    /// Whether this is the not-found condition callers are expected to branch on.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// User-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Conflict { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message, .. }
            | Self::Custom { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => match errors.as_slice() {
                [single] => single.clone(),
                _ => format!("Validation failed: {}", errors.join(", ")),
            },
            Self::Cancelled { operation } => format!("{operation} was cancelled"),
            Self::Timeout { operation } => format!("{operation} timed out"),
        }
    }

    /// Log internal error details (not sent to user). No output unless a subscriber is set.
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Conflict {
                internal: Some(internal),
                ..
            } => {
                tracing::warn!(error = %internal, "Storage constraint conflict");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::Custom {
                internal: Some(details),
                status,
                ..
            } => {
                tracing::error!(status = %status, details = %details, "Custom error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database { internal, .. }
            | Self::Conflict {
                internal: Some(internal),
                ..
            } => Some(internal),
            _ => None,
        }
    }
}

/// Convert a sea-orm `DbErr`.
///
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - unique constraint violations → 409 Conflict (cause kept for logging)
/// - everything else → 500, logged internally and sanitized for users
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            let resource = msg.split_whitespace().next().unwrap_or("Resource");
            return Self::not_found(resource, None);
        }
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return Self::Conflict {
                message: "Resource already exists".to_string(),
                internal: Some(err),
            };
        }
        Self::database(err)
    }
}
