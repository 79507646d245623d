//! Networked server backend (PostgreSQL).
//!
//! Values arrive untyped, so every statement is prepared first and each
//! parameter is converted to the type the server inferred for its slot.

use super::SqlBackend;
use crate::gateway::request::Scalar;
use crate::gateway::response::{ColumnDescriptor, Record, RecordId};
use crate::gateway::statement::{Dialect, Statement};
use crate::gateway::GatewayError;
use async_trait::async_trait;
use base64::Engine;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::error::Error;
use std::net::IpAddr;
use std::sync::LazyLock;
use tokio::task::JoinHandle;
use tokio_postgres::types::{accepts, to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info, instrument};
use uuid::Uuid;

type BoxedParam = Box<dyn ToSql + Sync + Send>;

const DESCRIBE_SQL: &str = "\
SELECT c.column_name::text, c.data_type::text, c.is_nullable::text, c.column_default::text, \
(SELECT tc.constraint_type::text \
   FROM information_schema.key_column_usage k \
   JOIN information_schema.table_constraints tc \
     ON tc.constraint_name = k.constraint_name AND tc.table_schema = k.table_schema \
  WHERE k.table_schema = c.table_schema AND k.table_name = c.table_name AND k.column_name = c.column_name \
  ORDER BY (tc.constraint_type = 'PRIMARY KEY') DESC LIMIT 1) AS key_role \
FROM information_schema.columns c \
WHERE c.table_name::text = $1::text AND c.table_schema::text = COALESCE($2::text, current_schema()::text) \
ORDER BY c.ordinal_position";

/// `$N` placeholders and `information_schema` catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn list_tables(&self) -> Statement {
        Statement::raw(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY table_name",
        )
    }

    fn describe_table(&self, table: &str) -> Statement {
        let (schema, name) = match table.split_once('.') {
            Some((schema, name)) => (Scalar::from(schema), name),
            None => (Scalar::Null, table),
        };
        Statement {
            sql: DESCRIBE_SQL.to_string(),
            params: vec![Scalar::from(name), schema],
        }
    }
}

/// PostgreSQL client plus the task driving its connection.
pub struct PostgresBackend {
    client: Client,
    connection: JoinHandle<()>,
    dialect: PostgresDialect,
}

impl PostgresBackend {
    #[instrument(skip_all)]
    pub async fn connect(url: &str) -> Result<Self, GatewayError> {
        if url.trim().is_empty() {
            return Err(GatewayError::Backend("postgres_url is not set".to_string()));
        }

        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {}", e);
            }
        });

        info!("Connected to PostgreSQL");
        Ok(Self {
            client,
            connection,
            dialect: PostgresDialect,
        })
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, GatewayError> {
        let prepared = self.client.prepare(&statement.sql).await?;
        let params = bind_all(&statement.params, prepared.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
        Ok(self.client.query(&prepared, &refs).await?)
    }
}

impl Drop for PostgresBackend {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    async fn insert(&self, statement: &Statement) -> Result<RecordId, GatewayError> {
        let returning = Statement {
            sql: format!("{} RETURNING *", statement.sql),
            params: statement.params.clone(),
        };
        let rows = self.query(&returning).await?;
        let row = rows
            .first()
            .ok_or_else(|| GatewayError::Backend("insert returned no row".to_string()))?;

        let mut record = row_to_record(row)?;
        let id = match record.remove("id") {
            Some(id) => id,
            None => record.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null),
        };
        Ok(id)
    }

    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    async fn select(&self, statement: &Statement) -> Result<Vec<Record>, GatewayError> {
        self.query(statement)
            .await?
            .iter()
            .map(row_to_record)
            .collect()
    }

    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    async fn update(&self, statement: &Statement) -> Result<u64, GatewayError> {
        let prepared = self.client.prepare(&statement.sql).await?;
        let params = bind_all(&statement.params, prepared.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
        Ok(self.client.execute(&prepared, &refs).await?)
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        self.query(&self.dialect.list_tables())
            .await?
            .iter()
            .map(|row| row.try_get::<_, String>(0).map_err(GatewayError::from))
            .collect()
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>, GatewayError> {
        let rows = self.query(&self.dialect.describe_table(table)).await?;
        if rows.is_empty() {
            return Err(GatewayError::Backend(format!("relation \"{}\" does not exist", table)));
        }

        rows.iter()
            .map(|row| -> Result<ColumnDescriptor, GatewayError> {
                let nullable: String = row.try_get(2)?;
                Ok(ColumnDescriptor {
                    name: row.try_get(0)?,
                    declared_type: row.try_get(1)?,
                    nullable: nullable == "YES",
                    key: row.try_get(4)?,
                    default: row.try_get(3)?,
                })
            })
            .collect()
    }
}

type SqlError = Box<dyn Error + Sync + Send>;

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("valid regex")
});

static CLOCK_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-)?(\d+):(\d{2})(?::(\d{2}(?:\.\d+)?))?$").expect("valid regex"));

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

/// An `interval` in its wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    months: i32,
    days: i32,
    micros: i64,
}

impl Interval {
    fn from_seconds(seconds: f64) -> Option<Self> {
        let micros = (seconds * MICROS_PER_SECOND as f64).round();
        micros.is_finite().then(|| Self {
            months: 0,
            days: 0,
            micros: micros as i64,
        })
    }

    /// Parse an ISO-8601 duration (`P1DT2H`) or clock time (`01:30:00`).
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let number = |m: Option<regex::Match<'_>>| -> Option<i64> {
            m.map_or(Some(0), |m| m.as_str().parse().ok())
        };
        let seconds = |m: Option<regex::Match<'_>>| -> Option<i64> {
            m.map_or(Some(0), |m| {
                m.as_str()
                    .parse::<f64>()
                    .ok()
                    .map(|f| (f * MICROS_PER_SECOND as f64).round() as i64)
            })
        };

        let (negative, interval) = if let Some(c) = ISO_DURATION.captures(s) {
            if (2..=8).all(|i| c.get(i).is_none()) {
                return None;
            }
            let months = number(c.get(2))? * 12 + number(c.get(3))?;
            let days = number(c.get(4))? * 7 + number(c.get(5))?;
            let micros = number(c.get(6))? * MICROS_PER_HOUR + number(c.get(7))? * MICROS_PER_MINUTE + seconds(c.get(8))?;
            (
                c.get(1).is_some(),
                Self {
                    months: i32::try_from(months).ok()?,
                    days: i32::try_from(days).ok()?,
                    micros,
                },
            )
        } else if let Some(c) = CLOCK_DURATION.captures(s) {
            let micros = number(c.get(2))? * MICROS_PER_HOUR + number(c.get(3))? * MICROS_PER_MINUTE + seconds(c.get(4))?;
            (c.get(1).is_some(), Self { months: 0, days: 0, micros })
        } else {
            return None;
        };

        Some(if negative {
            Self {
                months: -interval.months,
                days: -interval.days,
                micros: -interval.micros,
            }
        } else {
            interval
        })
    }

    fn to_iso8601(self) -> String {
        let mut out = String::from("P");
        let (years, months) = (self.months / 12, self.months % 12);
        if years != 0 {
            out.push_str(&format!("{}Y", years));
        }
        if months != 0 {
            out.push_str(&format!("{}M", months));
        }
        if self.days != 0 {
            out.push_str(&format!("{}D", self.days));
        }

        if self.micros != 0 {
            out.push('T');
            let hours = self.micros / MICROS_PER_HOUR;
            let minutes = self.micros % MICROS_PER_HOUR / MICROS_PER_MINUTE;
            let rest = self.micros % MICROS_PER_MINUTE;
            if hours != 0 {
                out.push_str(&format!("{}H", hours));
            }
            if minutes != 0 {
                out.push_str(&format!("{}M", minutes));
            }
            if rest != 0 {
                let sign = if rest < 0 { "-" } else { "" };
                let whole = rest.unsigned_abs() / MICROS_PER_SECOND as u64;
                let fraction = rest.unsigned_abs() % MICROS_PER_SECOND as u64;
                if fraction == 0 {
                    out.push_str(&format!("{}{}S", sign, whole));
                } else {
                    let digits = format!("{:06}", fraction);
                    out.push_str(&format!("{}{}.{}S", sign, whole, digits.trim_end_matches('0')));
                }
            }
        }

        if out == "P" {
            out.push_str("T0S");
        }
        out
    }
}

impl ToSql for Interval {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, SqlError> {
        out.put_i64(self.micros);
        out.put_i32(self.days);
        out.put_i32(self.months);
        Ok(IsNull::No)
    }

    accepts!(INTERVAL);
    to_sql_checked!();
}

impl<'a> FromSql<'a> for Interval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, SqlError> {
        let raw: &[u8; 16] = raw.try_into().map_err(|_| "invalid interval length")?;
        let mut micros = [0; 8];
        let mut days = [0; 4];
        let mut months = [0; 4];
        micros.copy_from_slice(&raw[0..8]);
        days.copy_from_slice(&raw[8..12]);
        months.copy_from_slice(&raw[12..16]);
        Ok(Self {
            months: i32::from_be_bytes(months),
            days: i32::from_be_bytes(days),
            micros: i64::from_be_bytes(micros),
        })
    }

    accepts!(INTERVAL);
}

/// Types whose binary wire form is their text form.
fn is_text_wire(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_)) || matches!(ty.name(), "citext" | "xml")
}

/// A value of an [`is_text_wire`] type.
#[derive(Debug)]
struct TextWire(String);

impl ToSql for TextWire {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, SqlError> {
        out.put_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        is_text_wire(ty)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for TextWire {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, SqlError> {
        Ok(Self(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        is_text_wire(ty)
    }
}

/// Undecoded wire bytes of any column type.
struct WireBytes(Vec<u8>);

impl<'a> FromSql<'a> for WireBytes {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, SqlError> {
        Ok(Self(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s.trim(), fmt).ok())
}

fn bind_all(values: &[Scalar], types: &[Type]) -> Result<Vec<BoxedParam>, GatewayError> {
    if values.len() != types.len() {
        return Err(GatewayError::Validation(format!(
            "statement expects {} parameters, got {}",
            types.len(),
            values.len()
        )));
    }
    values.iter().zip(types).map(|(v, ty)| bind(v, ty)).collect()
}

fn boxed<T: ToSql + Sync + Send + 'static>(value: Option<T>) -> BoxedParam {
    Box::new(value)
}

/// Convert a caller value to the Rust type the server expects for `ty`.
fn bind(value: &Scalar, ty: &Type) -> Result<BoxedParam, GatewayError> {
    let mismatch = || GatewayError::Validation(format!("cannot use {} as {}", value, ty.name()));
    let text = || match value {
        Scalar::Text(s) => Some(s.as_str()),
        _ => None,
    };
    let is_null = matches!(value, Scalar::Null);

    if *ty == Type::BOOL {
        let b = match value {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(i) => Some(*i != 0),
            Scalar::Text(s) => Some(s.parse::<bool>().map_err(|_| mismatch())?),
            Scalar::Float(_) => return Err(mismatch()),
        };
        return Ok(boxed(b));
    }

    if *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 {
        let i = match value {
            Scalar::Null => None,
            Scalar::Int(i) => Some(*i),
            Scalar::Bool(b) => Some(i64::from(*b)),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Text(s) => Some(s.trim().parse::<i64>().map_err(|_| mismatch())?),
            Scalar::Float(_) => return Err(mismatch()),
        };
        return Ok(if *ty == Type::INT2 {
            boxed(i.map(i16::try_from).transpose().map_err(|_| mismatch())?)
        } else if *ty == Type::INT4 {
            boxed(i.map(i32::try_from).transpose().map_err(|_| mismatch())?)
        } else {
            boxed(i)
        });
    }

    if *ty == Type::FLOAT4 || *ty == Type::FLOAT8 {
        let f = match value {
            Scalar::Null => None,
            Scalar::Float(f) => Some(*f),
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Text(s) => Some(s.trim().parse::<f64>().map_err(|_| mismatch())?),
            Scalar::Bool(_) => return Err(mismatch()),
        };
        return Ok(if *ty == Type::FLOAT4 {
            boxed(f.map(|f| f as f32))
        } else {
            boxed(f)
        });
    }

    if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME {
        return Ok(boxed((!is_null).then(|| value.to_string())));
    }

    if *ty == Type::JSON || *ty == Type::JSONB {
        let json = match value {
            Scalar::Null => None,
            Scalar::Text(s) => Some(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))),
            other => Some(serde_json::to_value(other).map_err(|_| mismatch())?),
        };
        return Ok(boxed(json));
    }

    if *ty == Type::TIMESTAMPTZ {
        let ts = match (is_null, text()) {
            (true, _) => None,
            (false, Some(s)) => Some(
                DateTime::parse_from_rfc3339(s)
                    .map_err(|_| mismatch())?
                    .with_timezone(&Utc),
            ),
            (false, None) => return Err(mismatch()),
        };
        return Ok(boxed(ts));
    }

    if *ty == Type::TIMESTAMP {
        let ts = match (is_null, text()) {
            (true, _) => None,
            (false, Some(s)) => Some(parse_naive_datetime(s).ok_or_else(mismatch)?),
            (false, None) => return Err(mismatch()),
        };
        return Ok(boxed(ts));
    }

    if *ty == Type::DATE {
        let date = match (is_null, text()) {
            (true, _) => None,
            (false, Some(s)) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| mismatch())?),
            (false, None) => return Err(mismatch()),
        };
        return Ok(boxed(date));
    }

    if *ty == Type::NUMERIC {
        let decimal = match value {
            Scalar::Null => None,
            Scalar::Int(i) => Some(Decimal::from(*i)),
            Scalar::Float(f) => Some(parse_decimal(&f.to_string()).ok_or_else(mismatch)?),
            Scalar::Text(s) => Some(parse_decimal(s).ok_or_else(mismatch)?),
            Scalar::Bool(_) => return Err(mismatch()),
        };
        return Ok(boxed(decimal));
    }

    if *ty == Type::TIME {
        let time = match (is_null, text()) {
            (true, _) => None,
            (false, Some(s)) => Some(parse_time(s).ok_or_else(mismatch)?),
            (false, None) => return Err(mismatch()),
        };
        return Ok(boxed(time));
    }

    if *ty == Type::INTERVAL {
        let interval = match value {
            Scalar::Null => None,
            Scalar::Int(i) => Some(Interval::from_seconds(*i as f64).ok_or_else(mismatch)?),
            Scalar::Float(f) => Some(Interval::from_seconds(*f).ok_or_else(mismatch)?),
            Scalar::Text(s) => Some(Interval::parse(s).ok_or_else(mismatch)?),
            Scalar::Bool(_) => return Err(mismatch()),
        };
        return Ok(boxed(interval));
    }

    if *ty == Type::INET {
        let addr = match (is_null, text()) {
            (true, _) => None,
            (false, Some(s)) => Some(s.trim().parse::<IpAddr>().map_err(|_| mismatch())?),
            (false, None) => return Err(mismatch()),
        };
        return Ok(boxed(addr));
    }

    if is_text_wire(ty) {
        return Ok(boxed((!is_null).then(|| TextWire(value.to_string()))));
    }

    if *ty == Type::UUID {
        let id = match (is_null, text()) {
            (true, _) => None,
            (false, Some(s)) => Some(Uuid::parse_str(s).map_err(|_| mismatch())?),
            (false, None) => return Err(mismatch()),
        };
        return Ok(boxed(id));
    }

    Err(GatewayError::Validation(format!(
        "unsupported parameter type {}",
        ty.name()
    )))
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// ISO-8601 text for a zone-less timestamp.
fn iso_timestamp(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn row_to_record(row: &Row) -> Result<Record, GatewayError> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), column_value(row, i, column.type_())?);
    }
    Ok(record)
}

fn column_value(row: &Row, i: usize, ty: &Type) -> Result<Value, GatewayError> {
    let value = if *ty == Type::BOOL {
        Value::from(row.try_get::<_, Option<bool>>(i)?)
    } else if *ty == Type::INT2 {
        Value::from(row.try_get::<_, Option<i16>>(i)?)
    } else if *ty == Type::INT4 {
        Value::from(row.try_get::<_, Option<i32>>(i)?)
    } else if *ty == Type::INT8 {
        Value::from(row.try_get::<_, Option<i64>>(i)?)
    } else if *ty == Type::OID {
        Value::from(row.try_get::<_, Option<u32>>(i)?)
    } else if *ty == Type::FLOAT4 {
        Value::from(row.try_get::<_, Option<f32>>(i)?.map(f64::from))
    } else if *ty == Type::FLOAT8 {
        Value::from(row.try_get::<_, Option<f64>>(i)?)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME {
        Value::from(row.try_get::<_, Option<String>>(i)?)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(i)?.unwrap_or(Value::Null)
    } else if *ty == Type::TIMESTAMPTZ {
        Value::from(row.try_get::<_, Option<DateTime<Utc>>>(i)?.map(|t| t.to_rfc3339()))
    } else if *ty == Type::TIMESTAMP {
        Value::from(row.try_get::<_, Option<NaiveDateTime>>(i)?.map(iso_timestamp))
    } else if *ty == Type::DATE {
        Value::from(row.try_get::<_, Option<NaiveDate>>(i)?.map(|d| d.to_string()))
    } else if *ty == Type::UUID {
        Value::from(row.try_get::<_, Option<Uuid>>(i)?.map(|u| u.to_string()))
    } else if *ty == Type::NUMERIC {
        Value::from(row.try_get::<_, Option<Decimal>>(i)?.map(|d| d.to_string()))
    } else if *ty == Type::TIME {
        Value::from(
            row.try_get::<_, Option<NaiveTime>>(i)?
                .map(|t| t.format("%H:%M:%S%.f").to_string()),
        )
    } else if *ty == Type::INTERVAL {
        Value::from(row.try_get::<_, Option<Interval>>(i)?.map(Interval::to_iso8601))
    } else if *ty == Type::INET {
        Value::from(row.try_get::<_, Option<IpAddr>>(i)?.map(|a| a.to_string()))
    } else if *ty == Type::TEXT_ARRAY || *ty == Type::VARCHAR_ARRAY {
        array_value(row.try_get::<_, Option<Vec<Option<String>>>>(i)?)
    } else if *ty == Type::INT4_ARRAY {
        array_value(row.try_get::<_, Option<Vec<Option<i32>>>>(i)?)
    } else if *ty == Type::INT8_ARRAY {
        array_value(row.try_get::<_, Option<Vec<Option<i64>>>>(i)?)
    } else if *ty == Type::FLOAT8_ARRAY {
        array_value(row.try_get::<_, Option<Vec<Option<f64>>>>(i)?)
    } else if *ty == Type::BOOL_ARRAY {
        array_value(row.try_get::<_, Option<Vec<Option<bool>>>>(i)?)
    } else if is_text_wire(ty) {
        Value::from(row.try_get::<_, Option<TextWire>>(i)?.map(|t| t.0))
    } else if *ty == Type::BYTEA {
        Value::from(
            row.try_get::<_, Option<Vec<u8>>>(i)?
                .map(|b| base64::engine::general_purpose::STANDARD.encode(b)),
        )
    } else {
        // Binary wire form of a type with no decoder here.
        Value::from(
            row.try_get::<_, Option<WireBytes>>(i)?
                .map(|b| base64::engine::general_purpose::STANDARD.encode(b.0)),
        )
    };
    Ok(value)
}

fn array_value<T: Into<Value>>(items: Option<Vec<Option<T>>>) -> Value {
    items.map_or(Value::Null, |items| {
        Value::Array(items.into_iter().map(|v| v.map_or(Value::Null, Into::into)).collect())
    })
}
