//! Db command implementation.

use crate::cli::{DbAction, Output};
use crate::config::Settings;
use crate::gateway::{Gateway, Operation};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

/// Run one gateway operation and print its JSON result.
pub async fn run_db(action: &DbAction, settings: Settings) -> Result<()> {
    let (tool, arguments) = tool_call(action)?;

    let gateway = Gateway::connect(&settings.database).await;
    if !gateway.is_connected() {
        Output::warning(&format!(
            "Could not connect to the {} database",
            settings.database.backend
        ));
    }

    let result = gateway.dispatch(&tool, arguments).await;
    gateway.close().await;

    println!("{}", result.to_json());
    if result.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{}",
            result.error.unwrap_or_else(|| "operation failed".to_string())
        ))
    }
}

/// Translate CLI arguments into a tool name and JSON arguments.
fn tool_call(action: &DbAction) -> Result<(String, Option<Value>)> {
    let call = match action {
        DbAction::Create { table, data } => (
            Operation::Create.tool_name().to_string(),
            Some(json!({"table": table, "data": parse_object("data", data)?})),
        ),
        DbAction::Read { table, filters, limit } => {
            let mut args = Map::new();
            args.insert("table".to_string(), json!(table));
            if let Some(filters) = filters {
                args.insert("filters".to_string(), parse_object("filters", filters)?);
            }
            if let Some(limit) = limit {
                args.insert("limit".to_string(), json!(limit));
            }
            (Operation::Read.tool_name().to_string(), Some(Value::Object(args)))
        }
        DbAction::Update { table, filters, data } => (
            Operation::Update.tool_name().to_string(),
            Some(json!({
                "table": table,
                "filters": parse_object("filters", filters)?,
                "data": parse_object("data", data)?,
            })),
        ),
        DbAction::Query { sql } => (
            Operation::RawQuery.tool_name().to_string(),
            Some(json!({"query": sql})),
        ),
        DbAction::Tables => (Operation::ListTables.tool_name().to_string(), None),
        DbAction::Describe { table } => (
            Operation::DescribeTable.tool_name().to_string(),
            Some(json!({"table": table})),
        ),
        DbAction::Call { tool, args } => {
            let args = match args {
                Some(raw) => Some(serde_json::from_str(raw).context("--args is not valid JSON")?),
                None => None,
            };
            (tool.clone(), args)
        }
    };
    Ok(call)
}

fn parse_object(label: &str, raw: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--{} is not valid JSON", label))?;
    if !value.is_object() {
        anyhow::bail!("--{} must be a JSON object", label);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_call() {
        let (tool, args) = tool_call(&DbAction::Create {
            table: "users".to_string(),
            data: r#"{"name": "Ada"}"#.to_string(),
        })
        .unwrap();
        assert_eq!(tool, "create_record");
        assert_eq!(args.unwrap()["data"]["name"], "Ada");
    }

    #[test]
    fn test_read_call_omits_unset_arguments() {
        let (_, args) = tool_call(&DbAction::Read {
            table: "users".to_string(),
            filters: None,
            limit: Some(3),
        })
        .unwrap();
        assert_eq!(args.unwrap(), json!({"table": "users", "limit": 3}));
    }

    #[test]
    fn test_rejects_non_object_data() {
        let err = tool_call(&DbAction::Create {
            table: "users".to_string(),
            data: "[1, 2]".to_string(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }
}
