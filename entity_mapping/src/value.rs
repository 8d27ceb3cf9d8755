//! Dynamic parameter value binding.
//!
//! Raw commands and composed queries carry their parameter values as
//! `serde_json::Value`. This module converts those values to typed
//! PostgreSQL binds, either by inference (RFC3339 strings become
//! timestamps, UUID strings become uuids, integers narrow to int4 when
//! they fit) or forced through an explicit `DbType` annotation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use thiserror::Error;
use uuid::Uuid;

/// Database parameter types recognized by annotated descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Bool,
    Int4,
    Int8,
    Float8,
    Text,
    Uuid,
    Timestamp,
    Json,
}

/// A parameter value that cannot be coerced to its annotated database type.
#[derive(Error, Debug)]
#[error("parameter value {value} cannot bind as {db_type:?}")]
pub struct ValueTypeError {
    pub db_type: DbType,
    pub value: String,
}

/// Bind a value with inferred typing.
pub fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::String(s) => {
            // Try to parse as RFC3339 timestamp first
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                query.bind(dt.with_timezone(&Utc))
            // Try to parse as UUID
            } else if let Ok(uuid) = Uuid::parse_str(s) {
                query.bind(uuid)
            } else {
                query.bind(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                    query.bind(i as i32)
                } else {
                    query.bind(i)
                }
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::Bool(b) => query.bind(*b),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(other.to_string()),
    }
}

/// Bind a value coerced to an annotated database type.
///
/// `Value::Null` binds a typed NULL; any other value that does not fit the
/// annotation is a `ValueTypeError`, never a silent reinterpretation.
pub fn bind_value_as<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
    db_type: DbType,
) -> Result<Query<'q, Postgres, PgArguments>, ValueTypeError> {
    let mismatch = || ValueTypeError {
        db_type,
        value: value.to_string(),
    };

    if value.is_null() {
        return Ok(match db_type {
            DbType::Bool => query.bind(Option::<bool>::None),
            DbType::Int4 => query.bind(Option::<i32>::None),
            DbType::Int8 => query.bind(Option::<i64>::None),
            DbType::Float8 => query.bind(Option::<f64>::None),
            DbType::Text => query.bind(Option::<String>::None),
            DbType::Uuid => query.bind(Option::<Uuid>::None),
            DbType::Timestamp => query.bind(Option::<DateTime<Utc>>::None),
            DbType::Json => query.bind(Option::<Value>::None),
        });
    }

    Ok(match db_type {
        DbType::Bool => query.bind(value.as_bool().ok_or_else(mismatch)?),
        DbType::Int4 => {
            let wide = value.as_i64().ok_or_else(mismatch)?;
            let narrow = i32::try_from(wide).map_err(|_| mismatch())?;
            query.bind(narrow)
        }
        DbType::Int8 => query.bind(value.as_i64().ok_or_else(mismatch)?),
        DbType::Float8 => query.bind(value.as_f64().ok_or_else(mismatch)?),
        DbType::Text => query.bind(value.as_str().ok_or_else(mismatch)?.to_string()),
        DbType::Uuid => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            query.bind(Uuid::parse_str(raw).map_err(|_| mismatch())?)
        }
        DbType::Timestamp => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| mismatch())?;
            query.bind(parsed.with_timezone(&Utc))
        }
        DbType::Json => query.bind(value.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn annotated_bool_accepts_bool_only() {
        let query = sqlx::query("SELECT $1");
        assert!(bind_value_as(query, &json!(true), DbType::Bool).is_ok());

        let query = sqlx::query("SELECT $1");
        assert!(bind_value_as(query, &json!("true"), DbType::Bool).is_err());
    }

    #[test]
    fn annotated_int4_rejects_out_of_range() {
        let query = sqlx::query("SELECT $1");
        assert!(bind_value_as(query, &json!(42), DbType::Int4).is_ok());

        let query = sqlx::query("SELECT $1");
        let err = match bind_value_as(query, &json!(i64::MAX), DbType::Int4) {
            Ok(_) => panic!("expected out-of-range Int4 bind to fail"),
            Err(e) => e,
        };
        assert_eq!(err.db_type, DbType::Int4);
    }

    #[test]
    fn annotated_uuid_requires_valid_uuid_string() {
        let query = sqlx::query("SELECT $1");
        assert!(bind_value_as(
            query,
            &json!("3f9b1f2e-30c6-4b8d-9c5e-6a4a8b6f2d11"),
            DbType::Uuid
        )
        .is_ok());

        let query = sqlx::query("SELECT $1");
        assert!(bind_value_as(query, &json!("not-a-uuid"), DbType::Uuid).is_err());
    }

    #[test]
    fn annotated_null_binds_typed_null() {
        let query = sqlx::query("SELECT $1");
        assert!(bind_value_as(query, &Value::Null, DbType::Timestamp).is_ok());
    }
}
