//! Tabular data gateway.
//!
//! A fixed set of CRUD-shaped operations over one relational connection.
//! There is no delete, and raw queries must be read-only. Every failure is
//! reported as a structured [`OperationResult`] instead of an error.

pub mod backend;
mod error;
pub mod request;
pub mod response;
pub mod statement;

pub use backend::SqlBackend;
pub use error::GatewayError;
pub use request::{
    fields, is_read_only, CreateArgs, DescribeArgs, Fields, Operation, OperationRequest, QueryArgs,
    ReadArgs, Scalar, UpdateArgs, DEFAULT_READ_LIMIT,
};
pub use response::{ColumnDescriptor, OperationResult, Payload, Record, RecordId};

use crate::config::DatabaseSettings;
use serde_json::Value;
use statement::Statement;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Owns the backend connection for its whole lifetime.
pub struct Gateway {
    backend: Option<Box<dyn SqlBackend>>,
    lock: Mutex<()>,
}

impl Gateway {
    /// Open the configured backend.
    ///
    /// A failed connection does not fail construction: the gateway comes up
    /// disabled and every operation reports "Not connected to database".
    pub async fn connect(settings: &DatabaseSettings) -> Self {
        match backend::open(settings).await {
            Ok(backend) => {
                info!("Gateway connected ({} backend)", backend.dialect().name());
                Self::with_backend(backend)
            }
            Err(e) => {
                warn!("Database connection failed, gateway disabled: {}", e);
                Self::disconnected()
            }
        }
    }

    pub fn with_backend(backend: Box<dyn SqlBackend>) -> Self {
        Self {
            backend: Some(backend),
            lock: Mutex::new(()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            backend: None,
            lock: Mutex::new(()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Dispatch a named tool call with JSON arguments.
    pub async fn dispatch(&self, name: &str, arguments: Option<Value>) -> OperationResult {
        match OperationRequest::from_tool_call(name, arguments) {
            Ok(request) => self.execute(request).await,
            Err(e) => {
                debug!("Rejected call to '{}': {}", name, e);
                OperationResult::err(&e)
            }
        }
    }

    /// Run one typed request.
    #[instrument(skip(self, request), fields(operation = request.operation().tool_name()))]
    pub async fn execute(&self, request: OperationRequest) -> OperationResult {
        match self.try_execute(&request).await {
            Ok(payload) => OperationResult::ok(payload),
            Err(e) => {
                warn!("{} failed: {}", request.operation().tool_name(), e);
                OperationResult::err(&e)
            }
        }
    }

    async fn try_execute(&self, request: &OperationRequest) -> Result<Payload, GatewayError> {
        let backend = self.backend.as_deref().ok_or(GatewayError::NotConnected)?;
        request.validate()?;

        if let OperationRequest::RawQuery(args) = request {
            if !is_read_only(&args.query) {
                return Err(GatewayError::Permission(
                    "only SELECT queries are allowed".to_string(),
                ));
            }
        }

        let _guard = self.lock.lock().await;
        let dialect = backend.dialect();

        match request {
            OperationRequest::Create(args) => {
                let id = backend
                    .insert(&statement::insert(dialect, &args.table, &args.data))
                    .await?;
                Ok(Payload::Created {
                    id,
                    table: args.table.clone(),
                })
            }
            OperationRequest::Read(args) => {
                let stmt = statement::select(dialect, &args.table, args.filters.as_ref(), args.limit());
                let records = backend.select(&stmt).await?;
                Ok(Payload::records(records, Some(args.table.clone())))
            }
            OperationRequest::Update(args) => {
                let rows_affected = backend
                    .update(&statement::update(dialect, &args.table, &args.filters, &args.data))
                    .await?;
                Ok(Payload::Updated {
                    rows_affected,
                    table: args.table.clone(),
                })
            }
            OperationRequest::ListTables => Ok(Payload::tables(backend.list_tables().await?)),
            OperationRequest::DescribeTable(args) => Ok(Payload::Columns {
                table: args.table.clone(),
                columns: backend.describe_table(&args.table).await?,
            }),
            OperationRequest::RawQuery(args) => {
                let records = backend.select(&Statement::raw(args.query.clone())).await?;
                Ok(Payload::records(records, None))
            }
        }
    }

    pub async fn create(&self, table: &str, data: Fields) -> OperationResult {
        self.execute(OperationRequest::Create(CreateArgs {
            table: table.to_string(),
            data,
        }))
        .await
    }

    pub async fn read(&self, table: &str, filters: Option<Fields>, limit: Option<u32>) -> OperationResult {
        self.execute(OperationRequest::Read(ReadArgs {
            table: table.to_string(),
            filters,
            limit,
        }))
        .await
    }

    pub async fn update(&self, table: &str, filters: Fields, data: Fields) -> OperationResult {
        self.execute(OperationRequest::Update(UpdateArgs {
            table: table.to_string(),
            filters,
            data,
        }))
        .await
    }

    pub async fn raw_query(&self, query: &str) -> OperationResult {
        self.execute(OperationRequest::RawQuery(QueryArgs {
            query: query.to_string(),
        }))
        .await
    }

    pub async fn list_tables(&self) -> OperationResult {
        self.execute(OperationRequest::ListTables).await
    }

    pub async fn describe_table(&self, table: &str) -> OperationResult {
        self.execute(OperationRequest::DescribeTable(DescribeArgs {
            table: table.to_string(),
        }))
        .await
    }

    /// Release the connection.
    pub async fn close(mut self) {
        let _guard = self.lock.lock().await;
        if self.backend.take().is_some() {
            info!("Gateway connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::backend::SqliteBackend;
    use super::request::fields;
    use super::statement::Dialect;
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn users_gateway() -> Gateway {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT, age INTEGER);",
            )
            .unwrap();
        Gateway::with_backend(Box::new(backend))
    }

    /// Counts every backend call.
    struct RecordingBackend {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SqlBackend for RecordingBackend {
        fn dialect(&self) -> &dyn Dialect {
            &backend::SqliteDialect
        }

        async fn insert(&self, _: &Statement) -> Result<RecordId, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(1))
        }

        async fn select(&self, _: &Statement) -> Result<Vec<Record>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn update(&self, _: &Statement) -> Result<u64, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }

        async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn describe_table(&self, _: &str) -> Result<Vec<ColumnDescriptor>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn recording_gateway() -> (Gateway, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = RecordingBackend {
            calls: calls.clone(),
        };
        (Gateway::with_backend(Box::new(backend)), calls)
    }

    #[tokio::test]
    async fn test_users_scenario() {
        let gateway = users_gateway();

        let created = gateway
            .create(
                "users",
                fields([
                    ("name", Scalar::from("Ana")),
                    ("email", Scalar::from("a@x.com")),
                    ("age", Scalar::from(30i64)),
                ]),
            )
            .await;
        assert!(created.success);
        assert_eq!(
            created.payload,
            Some(Payload::Created {
                id: json!(1),
                table: "users".to_string()
            })
        );

        let read = gateway.read("users", Some(fields([("id", 1i64)])), None).await;
        let records = read.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], json!("Ana"));
        assert_eq!(records[0]["age"], json!(30));

        let updated = gateway
            .update("users", fields([("id", 1i64)]), fields([("age", 31i64)]))
            .await;
        assert_eq!(
            updated.payload,
            Some(Payload::Updated {
                rows_affected: 1,
                table: "users".to_string()
            })
        );

        let read = gateway.read("users", Some(fields([("id", 1i64)])), None).await;
        assert_eq!(read.records().unwrap()[0]["age"], json!(31));
    }

    #[tokio::test]
    async fn test_create_then_read_all_columns() {
        let gateway = users_gateway();
        gateway
            .create("users", fields([("name", "Bo"), ("email", "b@x.com")]))
            .await;

        let result = gateway.read("users", None, None).await;
        let record = &result.records().unwrap()[0];
        let keys: Vec<&String> = record.keys().collect();
        assert_eq!(keys, ["id", "name", "email", "age"]);
        assert_eq!(record["email"], json!("b@x.com"));
        assert_eq!(record["age"], Value::Null);
    }

    #[tokio::test]
    async fn test_read_respects_limit() {
        let gateway = users_gateway();
        for name in ["a", "b", "c"] {
            gateway.create("users", fields([("name", name)])).await;
        }

        let result = gateway.read("users", None, Some(2)).await;
        assert_eq!(result.records().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_match_update_succeeds() {
        let gateway = users_gateway();
        let result = gateway
            .update("users", fields([("id", 99i64)]), fields([("age", 1i64)]))
            .await;
        assert!(result.success);
        assert_eq!(
            result.payload,
            Some(Payload::Updated {
                rows_affected: 0,
                table: "users".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_raw_select_returns_rows() {
        let gateway = users_gateway();
        gateway.create("users", fields([("name", "Ana")])).await;

        let result = gateway.raw_query("  select name FROM users").await;
        assert!(result.success);
        assert_eq!(result.records().unwrap()[0]["name"], json!("Ana"));
    }

    #[tokio::test]
    async fn test_non_select_never_reaches_backend() {
        let (gateway, calls) = recording_gateway();

        for query in ["DROP TABLE users", "DELETE FROM users", "  update users set age = 1", "WITH x AS (SELECT 1) SELECT * FROM x"] {
            let result = gateway.raw_query(query).await;
            assert!(!result.success);
            assert_eq!(result.error_kind, Some("permission"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_table_leaves_table_intact() {
        let gateway = users_gateway();
        let result = gateway.raw_query("DROP TABLE users").await;
        assert_eq!(result.error_kind, Some("permission"));

        let tables = gateway.list_tables().await;
        assert_eq!(
            tables.payload,
            Some(Payload::Tables {
                tables: vec!["users".to_string()],
                count: 1
            })
        );
    }

    #[tokio::test]
    async fn test_delete_is_not_dispatchable() {
        let (gateway, calls) = recording_gateway();

        for name in ["delete", "delete_record", "drop_table"] {
            let result = gateway.dispatch(name, Some(json!({"table": "users"}))).await;
            assert_eq!(result.error_kind, Some("not_found"));
            assert_eq!(
                result.error.as_deref(),
                Some(format!("Operation '{}' not found", name).as_str())
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_validation_errors() {
        let (gateway, calls) = recording_gateway();

        let cases = [
            ("create_record", json!({"table": "users", "data": {}})),
            ("create_record", json!({"table": "users; DROP TABLE x", "data": {"a": 1}})),
            ("read_records", json!({"table": "users", "filters": {"a": [1, 2]}})),
            ("update_record", json!({"table": "users", "data": {"a": 1}})),
            ("describe_table", json!({"table": "users", "extra": true})),
        ];
        for (name, args) in cases {
            let result = gateway.dispatch(name, Some(args)).await;
            assert_eq!(result.error_kind, Some("validation"), "{}", name);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_structured() {
        let gateway = users_gateway();
        let result = gateway.read("missing_table", None, None).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some("backend"));
        assert!(result.error.unwrap().contains("missing_table"));
    }

    #[tokio::test]
    async fn test_describe_table() {
        let gateway = users_gateway();
        let result = gateway.describe_table("users").await;
        match result.payload {
            Some(Payload::Columns { table, columns }) => {
                assert_eq!(table, "users");
                assert_eq!(columns.len(), 4);
                assert_eq!(columns[0].key.as_deref(), Some("PRIMARY KEY"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnected_gateway() {
        let gateway = Gateway::disconnected();
        assert!(!gateway.is_connected());

        let result = gateway.list_tables().await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Not connected to database"));
        assert_eq!(result.error_kind, Some("connection"));
    }

    #[tokio::test]
    async fn test_connect_failure_yields_disabled_gateway() {
        let settings = DatabaseSettings {
            backend: crate::config::DatabaseBackend::Postgres,
            postgres_url: String::new(),
            ..Default::default()
        };
        let gateway = Gateway::connect(&settings).await;
        assert!(!gateway.is_connected());
    }

    #[tokio::test]
    async fn test_connect_sqlite_file_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DatabaseSettings {
            sqlite_path: dir.path().join("app.db").to_string_lossy().to_string(),
            ..Default::default()
        };

        let gateway = Gateway::connect(&settings).await;
        assert!(gateway.is_connected());
        assert!(gateway.list_tables().await.success);
        gateway.close().await;
        assert!(dir.path().join("app.db").exists());
    }
}
