//! SQL statement construction.
//!
//! Identifiers are validated by the request layer before they get here; every
//! value travels as a bound parameter.

use super::request::{Fields, Scalar};

/// Per-backend SQL differences.
pub trait Dialect: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Parameter placeholder for the 1-based `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Statement listing user tables; first column is the table name.
    fn list_tables(&self) -> Statement;

    /// Statement describing `table`'s columns.
    fn describe_table(&self, table: &str) -> Statement;
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Scalar>,
}

impl Statement {
    /// Caller-supplied text without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// `INSERT INTO table (a, b) VALUES (p1, p2)`
pub fn insert(dialect: &dyn Dialect, table: &str, data: &Fields) -> Statement {
    let columns: Vec<&str> = data.keys().map(String::as_str).collect();
    let placeholders: Vec<String> = (1..=data.len()).map(|i| dialect.placeholder(i)).collect();

    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        ),
        params: data.values().cloned().collect(),
    }
}

/// `SELECT * FROM table [WHERE a = p1 AND ...] LIMIT n`
pub fn select(dialect: &dyn Dialect, table: &str, filters: Option<&Fields>, limit: u32) -> Statement {
    let mut sql = format!("SELECT * FROM {}", table);
    let mut params = Vec::new();

    if let Some(filters) = filters.filter(|f| !f.is_empty()) {
        let (clause, values) = equality_list(dialect, filters, 1, " AND ");
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
        params.extend(values);
    }

    sql.push_str(&format!(" LIMIT {}", limit));
    Statement { sql, params }
}

/// `UPDATE table SET a = p1 WHERE b = p2 AND ...`
pub fn update(dialect: &dyn Dialect, table: &str, filters: &Fields, data: &Fields) -> Statement {
    let (set_clause, mut params) = equality_list(dialect, data, 1, ", ");
    let (where_clause, where_params) = equality_list(dialect, filters, data.len() + 1, " AND ");
    params.extend(where_params);

    Statement {
        sql: format!("UPDATE {} SET {} WHERE {}", table, set_clause, where_clause),
        params,
    }
}

fn equality_list(
    dialect: &dyn Dialect,
    fields: &Fields,
    first_index: usize,
    separator: &str,
) -> (String, Vec<Scalar>) {
    let clause = fields
        .keys()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", column, dialect.placeholder(first_index + i)))
        .collect::<Vec<_>>()
        .join(separator);
    (clause, fields.values().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::backend::{PostgresDialect, SqliteDialect};
    use crate::gateway::request::fields;

    #[test]
    fn test_insert_sqlite() {
        let data = fields([("name", Scalar::from("Ana")), ("age", Scalar::from(30i64))]);
        let stmt = insert(&SqliteDialect, "users", &data);
        assert_eq!(stmt.sql, "INSERT INTO users (age, name) VALUES (?1, ?2)");
        assert_eq!(stmt.params, vec![Scalar::Int(30), Scalar::from("Ana")]);
    }

    #[test]
    fn test_select_without_filters() {
        let stmt = select(&SqliteDialect, "users", None, 100);
        assert_eq!(stmt.sql, "SELECT * FROM users LIMIT 100");
        assert!(stmt.params.is_empty());

        let empty = Fields::new();
        let stmt = select(&SqliteDialect, "users", Some(&empty), 5);
        assert_eq!(stmt.sql, "SELECT * FROM users LIMIT 5");
    }

    #[test]
    fn test_select_with_filters_postgres() {
        let filters = fields([("id", Scalar::from(1i64)), ("email", Scalar::from("a@x.com"))]);
        let stmt = select(&PostgresDialect, "users", Some(&filters), 10);
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE email = $1 AND id = $2 LIMIT 10");
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_update_numbers_where_after_set() {
        let filters = fields([("id", 1i64)]);
        let data = fields([("age", Scalar::from(31i64)), ("name", Scalar::from("Ana"))]);

        let stmt = update(&PostgresDialect, "users", &filters, &data);
        assert_eq!(stmt.sql, "UPDATE users SET age = $1, name = $2 WHERE id = $3");
        assert_eq!(
            stmt.params,
            vec![Scalar::Int(31), Scalar::from("Ana"), Scalar::Int(1)]
        );
    }
}
