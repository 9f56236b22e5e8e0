use crate::schema::{ValidationError, Violation, ViolationKind};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Document store unavailable: {cause}")]
    StoreUnavailable { cause: String },

    #[error("Write to {collection} failed: {cause}")]
    Persistence { collection: String, cause: String },

    #[error("Query on {collection} failed: {cause}")]
    QueryFailed { collection: String, cause: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String) -> Self {
        Self {
            error: error.to_string(),
            message,
            violations: None,
            collection: None,
            cause: None,
        }
    }

    fn with_collection(mut self, collection: String) -> Self {
        self.collection = Some(collection);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            ApiError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    violations: Some(err.violations.clone()),
                    ..ErrorResponse::new("validation_failed", err.to_string())
                },
            ),
            ApiError::StoreUnavailable { cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    cause: Some(cause),
                    ..ErrorResponse::new(
                        "store_unavailable",
                        "Document store is not available".to_string(),
                    )
                },
            ),
            ApiError::Persistence { collection, cause } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    cause: Some(cause),
                    ..ErrorResponse::new(
                        "persistence_failed",
                        format!("Failed to store document in '{}'", collection),
                    )
                    .with_collection(collection)
                },
            ),
            ApiError::QueryFailed { collection, cause } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    cause: Some(cause),
                    ..ErrorResponse::new(
                        "query_failed",
                        format!("Failed to read documents from '{}'", collection),
                    )
                    .with_collection(collection)
                },
            ),
            ApiError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("invalid_request", message),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal_error", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationError::single(
            "body",
            Violation::new("body", ViolationKind::InvalidBody, rejection.body_text()),
        ))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        let cause = match &err {
            deadpool_postgres::PoolError::Backend(e) => describe_pg_error(e),
            other => other.to_string(),
        };
        ApiError::StoreUnavailable {
            cause: format!("Pool error: {}", cause),
        }
    }
}

/// Server-side message for database errors, whose `Display` is only "db error"
pub(crate) fn describe_pg_error(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{} ({})", db.message(), db.code().code()),
        None => err.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
