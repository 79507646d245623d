//! Embedded single-file backend (SQLite).

use super::SqlBackend;
use crate::gateway::request::Scalar;
use crate::gateway::response::{ColumnDescriptor, Record, RecordId};
use crate::gateway::statement::{Dialect, Statement};
use crate::gateway::GatewayError;
use async_trait::async_trait;
use base64::Engine;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// `?N` placeholders and `sqlite_master` / `PRAGMA table_info` catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn list_tables(&self) -> Statement {
        Statement::raw(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
    }

    fn describe_table(&self, table: &str) -> Statement {
        match table.split_once('.') {
            Some((schema, name)) => Statement::raw(format!("PRAGMA {}.table_info({})", schema, name)),
            None => Statement::raw(format!("PRAGMA table_info({})", table)),
        }
    }
}

/// SQLite connection held for the lifetime of the gateway.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    dialect: SqliteDialect,
}

impl SqliteBackend {
    /// Open (or create) a database file.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| GatewayError::Backend(format!("cannot create {:?}: {}", parent, e)))?;
        }

        let conn = Connection::open(path)?;
        info!("Opened SQLite database at {:?}", path);
        Ok(Self::from_connection(conn))
    }

    /// In-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, GatewayError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            dialect: SqliteDialect,
        }
    }

    /// Run setup SQL directly, bypassing the gateway.
    pub fn execute_batch(&self, sql: &str) -> Result<(), GatewayError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, GatewayError> {
        self.conn
            .lock()
            .map_err(|e| GatewayError::Backend(format!("Failed to acquire lock: {}", e)))
    }

    fn query_records(conn: &Connection, statement: &Statement) -> Result<Vec<Record>, GatewayError> {
        let mut stmt = conn.prepare(&statement.sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt.query_map(params_from_iter(statement.params.iter().map(to_sql_value)), |row| {
            row_to_record(row, &names)
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        debug!("Fetched {} rows", records.len());
        Ok(records)
    }
}

#[async_trait]
impl SqlBackend for SqliteBackend {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    async fn insert(&self, statement: &Statement) -> Result<RecordId, GatewayError> {
        let conn = self.lock()?;
        conn.execute(
            &statement.sql,
            params_from_iter(statement.params.iter().map(to_sql_value)),
        )?;
        Ok(Value::from(conn.last_insert_rowid()))
    }

    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    async fn select(&self, statement: &Statement) -> Result<Vec<Record>, GatewayError> {
        let conn = self.lock()?;
        Self::query_records(&conn, statement)
    }

    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    async fn update(&self, statement: &Statement) -> Result<u64, GatewayError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            &statement.sql,
            params_from_iter(statement.params.iter().map(to_sql_value)),
        )?;
        Ok(affected as u64)
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.dialect.list_tables().sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>, GatewayError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&self.dialect.describe_table(table).sql)?;

        // cid | name | type | notnull | dflt_value | pk
        let columns = stmt
            .query_map([], |row| {
                let not_null: i64 = row.get(3)?;
                let pk: i64 = row.get(5)?;
                Ok(ColumnDescriptor {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                    nullable: not_null == 0,
                    key: (pk > 0).then(|| "PRIMARY KEY".to_string()),
                    default: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(GatewayError::Backend(format!("no such table: {}", table)));
        }
        Ok(columns)
    }
}

fn to_sql_value(value: &Scalar) -> SqlValue {
    match value {
        Scalar::Null => SqlValue::Null,
        Scalar::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Scalar::Int(i) => SqlValue::Integer(*i),
        Scalar::Float(f) => SqlValue::Real(*f),
        Scalar::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn row_to_record(row: &Row<'_>, names: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (i, name) in names.iter().enumerate() {
        let value = match row.get_ref(i)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::from(n),
            ValueRef::Real(f) => Value::from(f),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::String(base64::engine::general_purpose::STANDARD.encode(b)),
        };
        record.insert(name.clone(), value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::request::fields;
    use crate::gateway::statement;
    use serde_json::json;

    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, email TEXT, age INTEGER DEFAULT 18, avatar BLOB);",
            )
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_insert_returns_rowid() {
        let backend = backend();
        let data = fields([("name", Scalar::from("Ana")), ("age", Scalar::from(30i64))]);
        let stmt = statement::insert(&SqliteDialect, "users", &data);

        assert_eq!(backend.insert(&stmt).await.unwrap(), json!(1));
        assert_eq!(backend.insert(&stmt).await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_records_follow_column_order() {
        let backend = backend();
        backend
            .execute_batch("INSERT INTO users (name, email, avatar) VALUES ('Bo', NULL, x'0102');")
            .unwrap();

        let records = backend
            .select(&statement::select(&SqliteDialect, "users", None, 10))
            .await
            .unwrap();

        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, ["id", "name", "email", "age", "avatar"]);
        assert_eq!(records[0]["email"], Value::Null);
        assert_eq!(records[0]["age"], json!(18));
        assert_eq!(records[0]["avatar"], json!("AQI="));
    }

    #[tokio::test]
    async fn test_catalog() {
        let backend = backend();
        assert_eq!(backend.list_tables().await.unwrap(), vec!["users".to_string()]);

        let columns = backend.describe_table("users").await.unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].key.as_deref(), Some("PRIMARY KEY"));
        assert!(!columns[1].nullable);
        assert_eq!(columns[3].default.as_deref(), Some("18"));

        assert!(backend.describe_table("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_backend_rejects_unknown_column() {
        let backend = backend();
        let stmt = statement::insert(&SqliteDialect, "users", &fields([("nickname", "x")]));
        let err = backend.insert(&stmt).await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend(msg) if msg.contains("nickname")));
    }
}
