//! Gateway result types.

use super::GatewayError;
use serde::Serialize;
use serde_json::Value;

/// One row, keyed by column name in backend-reported order.
pub type Record = serde_json::Map<String, Value>;

/// Identifier assigned by the backend to a created row.
pub type RecordId = Value;

/// Column metadata reported by `describe_table`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub nullable: bool,
    /// Key role, e.g. `PRIMARY KEY`.
    pub key: Option<String>,
    pub default: Option<String>,
}

/// Successful operation output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Records {
        count: usize,
        records: Vec<Record>,
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<String>,
    },
    Created {
        id: RecordId,
        table: String,
    },
    Updated {
        rows_affected: u64,
        table: String,
    },
    Tables {
        tables: Vec<String>,
        count: usize,
    },
    Columns {
        table: String,
        columns: Vec<ColumnDescriptor>,
    },
}

impl Payload {
    pub fn records(records: Vec<Record>, table: Option<String>) -> Self {
        Payload::Records {
            count: records.len(),
            records,
            table,
        }
    }

    pub fn tables(tables: Vec<String>) -> Self {
        Payload::Tables {
            count: tables.len(),
            tables,
        }
    }
}

/// Structured outcome of one gateway operation. Exactly one of `payload`
/// and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl OperationResult {
    pub fn ok(payload: Payload) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
            error_kind: None,
        }
    }

    pub fn err(error: &GatewayError) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    /// Render as pretty JSON with UTF-8 preserved.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!("{{\"success\": false, \"error\": \"failed to serialize result: {}\"}}", e)
        })
    }

    /// Records of a successful read or raw query.
    pub fn records(&self) -> Option<&[Record]> {
        match &self.payload {
            Some(Payload::Records { records, .. }) => Some(records),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let result = OperationResult::ok(Payload::Created {
            id: json!(1),
            table: "users".to_string(),
        });
        let value: Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(value, json!({"success": true, "id": 1, "table": "users"}));
    }

    #[test]
    fn test_error_shape() {
        let result = OperationResult::err(&GatewayError::Permission("only SELECT".to_string()));
        let value: Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error_kind"], json!("permission"));
        assert!(value.get("records").is_none());
    }

    #[test]
    fn test_utf8_not_escaped() {
        let mut record = Record::new();
        record.insert("name".to_string(), json!("João"));
        let result = OperationResult::ok(Payload::records(vec![record], None));
        assert!(result.to_json().contains("João"));
    }
}
