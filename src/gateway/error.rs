//! Gateway error taxonomy.

use thiserror::Error;

/// Failure of a single gateway operation.
///
/// These never escape the gateway as faults: [`super::Gateway::execute`]
/// folds them into an [`super::OperationResult`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Not connected to database")]
    NotConnected,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Database error: {0}")]
    Backend(String),

    #[error("Operation '{0}' not found")]
    OperationNotFound(String),
}

impl GatewayError {
    /// Stable machine-readable kind, reported as `error_kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotConnected => "connection",
            GatewayError::Validation(_) => "validation",
            GatewayError::Permission(_) => "permission",
            GatewayError::Backend(_) => "backend",
            GatewayError::OperationNotFound(_) => "not_found",
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(e: rusqlite::Error) -> Self {
        GatewayError::Backend(e.to_string())
    }
}

impl From<tokio_postgres::Error> for GatewayError {
    fn from(e: tokio_postgres::Error) -> Self {
        // The top-level Display of a server error is just "db error"
        match e.as_db_error() {
            Some(db) => GatewayError::Backend(db.message().to_string()),
            None => GatewayError::Backend(e.to_string()),
        }
    }
}
