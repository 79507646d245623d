//! Relational backends for the gateway.
//!
//! A backend owns one long-lived connection and knows how to run the handful
//! of statement shapes the gateway produces.

mod postgres;
mod sqlite;

pub use postgres::{PostgresBackend, PostgresDialect};
pub use sqlite::{SqliteBackend, SqliteDialect};

use super::response::{ColumnDescriptor, Record, RecordId};
use super::statement::{Dialect, Statement};
use super::GatewayError;
use crate::config::{DatabaseBackend, DatabaseSettings, Settings};
use async_trait::async_trait;

/// Capability set the gateway needs from a relational store.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// SQL dialect used to build statements for this backend.
    fn dialect(&self) -> &dyn Dialect;

    /// Run an insert and return the identifier of the new row.
    async fn insert(&self, statement: &Statement) -> Result<RecordId, GatewayError>;

    /// Run a row-returning statement.
    async fn select(&self, statement: &Statement) -> Result<Vec<Record>, GatewayError>;

    /// Run an update and return the number of affected rows.
    async fn update(&self, statement: &Statement) -> Result<u64, GatewayError>;

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError>;

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>, GatewayError>;
}

/// Open the backend named in the settings.
pub async fn open(settings: &DatabaseSettings) -> Result<Box<dyn SqlBackend>, GatewayError> {
    match settings.backend {
        DatabaseBackend::Sqlite => {
            let path = Settings::expand_path(&settings.sqlite_path);
            Ok(Box::new(SqliteBackend::open(&path)?))
        }
        DatabaseBackend::Postgres => {
            Ok(Box::new(PostgresBackend::connect(&settings.postgres_url).await?))
        }
    }
}
