use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

const EXCLUSION_VIOLATION: &str = "23P01";
const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const QUERY_CANCELED: &str = "57014";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Invalid interview type: {0}")]
    InvalidType(String),

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unconfigured: {0}")]
    Unconfigured(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Serialization failure; the transaction may succeed if retried.
    #[error("Contention: {0}")]
    Contention(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::IllegalTransition(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::InvalidType(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::InvalidSlot(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Error::Unavailable(msg) | Error::Contention(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Reqwest(err) => {
                tracing::error!(error = %err, "Outbound HTTP call failed");
                (StatusCode::BAD_GATEWAY, "External service error".to_string())
            }
            other => {
                tracing::error!(error = %other, "Request failed with a server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Error::NotFound("Resource not found".to_string());
        }
        let code = err
            .as_database_error()
            .and_then(|db| db.code().map(|c| c.into_owned()));
        match code.as_deref() {
            Some(EXCLUSION_VIOLATION) => {
                Error::Conflict("Requested slot overlaps an existing booking".to_string())
            }
            Some(UNIQUE_VIOLATION) => Error::Conflict("Resource already exists".to_string()),
            Some(SERIALIZATION_FAILURE) => Error::Contention(
                "Concurrent update detected, please retry the request".to_string(),
            ),
            Some(LOCK_NOT_AVAILABLE) | Some(QUERY_CANCELED) => Error::Unavailable(
                "Calendar is busy, please retry the request".to_string(),
            ),
            _ => Error::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_becomes_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn client_errors_map_to_expected_status() {
        let cases = [
            (Error::IllegalTransition("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidSlot("x".into()), StatusCode::BAD_REQUEST),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (Error::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Contention("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::ObjectStore("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
