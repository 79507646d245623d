//! Gateway request types.
//!
//! Every operation has its own argument struct that rejects unknown fields and
//! non-scalar values at deserialization time, so malformed calls fail before
//! any statement is built.

use super::GatewayError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Default row bound for `read`.
pub const DEFAULT_READ_LIMIT: u32 = 100;

static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
});

static COLUMN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// A single column value supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Column/value pairs. Ordered by column name so generated SQL is stable.
pub type Fields = BTreeMap<String, Scalar>;

/// Build [`Fields`] from literal pairs.
pub fn fields<K, V, I>(pairs: I) -> Fields
where
    K: Into<String>,
    V: Into<Scalar>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateArgs {
    pub table: String,
    pub data: Fields,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadArgs {
    pub table: String,
    #[serde(default)]
    pub filters: Option<Fields>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ReadArgs {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_READ_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateArgs {
    pub table: String,
    pub filters: Fields,
    pub data: Fields,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescribeArgs {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryArgs {
    pub query: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

/// The closed set of gateway operations. There is no delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    ListTables,
    DescribeTable,
    RawQuery,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::ListTables,
        Operation::DescribeTable,
        Operation::RawQuery,
    ];

    /// Tool name used on the wire.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Operation::Create => "create_record",
            Operation::Read => "read_records",
            Operation::Update => "update_record",
            Operation::ListTables => "list_tables",
            Operation::DescribeTable => "describe_table",
            Operation::RawQuery => "execute_query",
        }
    }

    /// Resolve a tool name or short operation name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "create_record" | "create" => Some(Operation::Create),
            "read_records" | "read" => Some(Operation::Read),
            "update_record" | "update" => Some(Operation::Update),
            "list_tables" => Some(Operation::ListTables),
            "describe_table" => Some(Operation::DescribeTable),
            "execute_query" | "raw_query" | "query" => Some(Operation::RawQuery),
            _ => None,
        }
    }
}

/// A fully typed gateway request.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Create(CreateArgs),
    Read(ReadArgs),
    Update(UpdateArgs),
    ListTables,
    DescribeTable(DescribeArgs),
    RawQuery(QueryArgs),
}

impl OperationRequest {
    /// Parse a named tool invocation.
    ///
    /// Unknown names (including any form of delete) yield
    /// [`GatewayError::OperationNotFound`].
    pub fn from_tool_call(name: &str, arguments: Option<Value>) -> Result<Self, GatewayError> {
        let operation = Operation::from_name(name)
            .ok_or_else(|| GatewayError::OperationNotFound(name.to_string()))?;
        Self::parse(operation, arguments)
    }

    /// Parse arguments for a known operation.
    pub fn parse(operation: Operation, arguments: Option<Value>) -> Result<Self, GatewayError> {
        let args = match arguments {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(v) => v,
        };

        let request = match operation {
            Operation::Create => OperationRequest::Create(decode(args)?),
            Operation::Read => OperationRequest::Read(decode(args)?),
            Operation::Update => OperationRequest::Update(decode(args)?),
            Operation::ListTables => {
                decode::<NoArgs>(args)?;
                OperationRequest::ListTables
            }
            Operation::DescribeTable => OperationRequest::DescribeTable(decode(args)?),
            Operation::RawQuery => OperationRequest::RawQuery(decode(args)?),
        };

        Ok(request)
    }

    pub fn operation(&self) -> Operation {
        match self {
            OperationRequest::Create(_) => Operation::Create,
            OperationRequest::Read(_) => Operation::Read,
            OperationRequest::Update(_) => Operation::Update,
            OperationRequest::ListTables => Operation::ListTables,
            OperationRequest::DescribeTable(_) => Operation::DescribeTable,
            OperationRequest::RawQuery(_) => Operation::RawQuery,
        }
    }

    /// Check required arguments and identifier shapes.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match self {
            OperationRequest::Create(args) => {
                validate_table(&args.table)?;
                validate_fields("data", &args.data, true)
            }
            OperationRequest::Read(args) => {
                validate_table(&args.table)?;
                match &args.filters {
                    Some(filters) => validate_fields("filters", filters, false),
                    None => Ok(()),
                }
            }
            OperationRequest::Update(args) => {
                validate_table(&args.table)?;
                validate_fields("filters", &args.filters, true)?;
                validate_fields("data", &args.data, true)
            }
            OperationRequest::ListTables => Ok(()),
            OperationRequest::DescribeTable(args) => validate_table(&args.table),
            OperationRequest::RawQuery(args) => {
                if args.query.trim().is_empty() {
                    Err(GatewayError::Validation("'query' must not be empty".to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, GatewayError> {
    serde_json::from_value(args).map_err(|e| GatewayError::Validation(e.to_string()))
}

fn validate_table(table: &str) -> Result<(), GatewayError> {
    if TABLE_NAME.is_match(table) {
        Ok(())
    } else {
        Err(GatewayError::Validation(format!("invalid table name: '{}'", table)))
    }
}

fn validate_fields(label: &str, fields: &Fields, required: bool) -> Result<(), GatewayError> {
    if required && fields.is_empty() {
        return Err(GatewayError::Validation(format!("'{}' must not be empty", label)));
    }
    match fields.keys().find(|k| !COLUMN_NAME.is_match(k)) {
        Some(bad) => Err(GatewayError::Validation(format!(
            "invalid column name in '{}': '{}'",
            label, bad
        ))),
        None => Ok(()),
    }
}

/// The read-only gate for raw queries: a case-insensitive `SELECT` prefix
/// after trimming. Syntactic only; the query text is passed through verbatim.
pub fn is_read_only(query: &str) -> bool {
    query.trim().to_uppercase().starts_with("SELECT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_decoding() {
        let data: Fields =
            serde_json::from_value(json!({"name": "Ana", "age": 30, "score": 9.5, "active": true, "note": null}))
                .unwrap();
        assert_eq!(data["name"], Scalar::Text("Ana".to_string()));
        assert_eq!(data["age"], Scalar::Int(30));
        assert_eq!(data["score"], Scalar::Float(9.5));
        assert_eq!(data["active"], Scalar::Bool(true));
        assert_eq!(data["note"], Scalar::Null);
    }

    #[test]
    fn test_nested_values_rejected() {
        let err = OperationRequest::from_tool_call(
            "create_record",
            Some(json!({"table": "users", "data": {"tags": ["a", "b"]}})),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = OperationRequest::from_tool_call(
            "read_records",
            Some(json!({"table": "users", "order_by": "name"})),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let err = OperationRequest::from_tool_call("update_record", Some(json!({"table": "users", "data": {"age": 1}})))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn test_delete_is_not_an_operation() {
        for name in ["delete", "delete_record", "drop_table", ""] {
            let err = OperationRequest::from_tool_call(name, Some(json!({"table": "users"}))).unwrap_err();
            assert_eq!(err, GatewayError::OperationNotFound(name.to_string()));
        }
        assert!(Operation::ALL.iter().all(|op| !op.tool_name().contains("delete")));
    }

    #[test]
    fn test_read_defaults() {
        let request = OperationRequest::from_tool_call("read_records", Some(json!({"table": "users"}))).unwrap();
        match request {
            OperationRequest::Read(args) => {
                assert_eq!(args.limit(), DEFAULT_READ_LIMIT);
                assert!(args.filters.is_none());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_list_tables_accepts_no_arguments() {
        assert_eq!(
            OperationRequest::from_tool_call("list_tables", None).unwrap(),
            OperationRequest::ListTables
        );
        assert_eq!(
            OperationRequest::from_tool_call("list_tables", Some(json!({}))).unwrap(),
            OperationRequest::ListTables
        );
    }

    #[test]
    fn test_identifier_validation() {
        let bad_table = OperationRequest::Create(CreateArgs {
            table: "users; DROP TABLE users".to_string(),
            data: fields([("name", "x")]),
        });
        assert!(matches!(bad_table.validate(), Err(GatewayError::Validation(_))));

        let bad_column = OperationRequest::Read(ReadArgs {
            table: "public.users".to_string(),
            filters: Some(fields([("1=1 OR id", 1i64)])),
            limit: None,
        });
        assert!(matches!(bad_column.validate(), Err(GatewayError::Validation(_))));

        let empty_filters = OperationRequest::Update(UpdateArgs {
            table: "users".to_string(),
            filters: Fields::new(),
            data: fields([("age", 31i64)]),
        });
        assert!(matches!(empty_filters.validate(), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_read_only_prefix() {
        assert!(is_read_only("SELECT * FROM users"));
        assert!(is_read_only("   select id from users  "));
        assert!(is_read_only("\n\tSeLeCt 1"));
        assert!(!is_read_only("DROP TABLE users"));
        assert!(!is_read_only("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_read_only("  DELETE FROM users"));
        assert!(!is_read_only(""));
    }
}
