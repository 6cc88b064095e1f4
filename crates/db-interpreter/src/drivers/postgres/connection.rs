//! PostgreSQL connection.
//!
//! Wraps one sqlx connection and runs statements through the simple query
//! protocol, so every value arrives in text format.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Column, ConnectOptions, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::QueryExecutor;
use crate::core::value::{Row, SqlValue};
use crate::drivers::common::SslMode;
use crate::error::{InterpretError, Result};

/// One open PostgreSQL connection.
pub struct PostgresConnection {
    conn: sqlx::PgConnection,
}

impl PostgresConnection {
    /// Open a connection from configuration and verify it with `SELECT 1`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode.to_postgres());

        let mut conn = options
            .connect()
            .await
            .map_err(|e| InterpretError::connection(e, "connecting to PostgreSQL"))?;

        sqlx::raw_sql("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|e| InterpretError::connection(e, "testing PostgreSQL connection"))?;

        info!("Connected to PostgreSQL: {}", config.display_name());

        Ok(Self { conn })
    }
}

#[async_trait]
impl QueryExecutor for PostgresConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        debug!("PostgreSQL query: {}", sql);
        let rows = sqlx::Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("PostgreSQL execute: {}", sql);
        let result = sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        Ok(result.rows_affected())
    }
}

fn decode_row(row: &PgRow) -> Row {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, i, column.type_info().name());
        out.push(column.name(), value);
    }
    out
}

/// Convert one PostgreSQL value based on the column's reported type.
fn decode_value(row: &PgRow, i: usize, type_name: &str) -> SqlValue {
    let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return SqlValue::Null;
    }

    let value = match type_name {
        "BOOL" => row.try_get::<bool, _>(i).map(SqlValue::Bool).ok(),
        "INT2" => row.try_get::<i16, _>(i).map(|v| SqlValue::I32(v.into())).ok(),
        "INT4" => row.try_get::<i32, _>(i).map(SqlValue::I32).ok(),
        "INT8" => row.try_get::<i64, _>(i).map(SqlValue::I64).ok(),
        "FLOAT4" => row.try_get::<f32, _>(i).map(SqlValue::F32).ok(),
        "FLOAT8" => row.try_get::<f64, _>(i).map(SqlValue::F64).ok(),
        "NUMERIC" => row.try_get::<Decimal, _>(i).map(SqlValue::Decimal).ok(),
        "UUID" => row.try_get::<uuid::Uuid, _>(i).map(SqlValue::Uuid).ok(),
        "DATE" => row.try_get::<chrono::NaiveDate, _>(i).map(SqlValue::Date).ok(),
        "TIME" => row.try_get::<chrono::NaiveTime, _>(i).map(SqlValue::Time).ok(),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(SqlValue::DateTime)
            .ok(),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
            .map(|v| SqlValue::DateTimeOffset(v.fixed_offset()))
            .ok(),
        "BYTEA" => row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok(),
        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(i)
            .map(|v| SqlValue::Text(v.to_string()))
            .ok(),
        _ => None,
    };

    // Text format: any remaining type decodes as its textual representation
    value
        .or_else(|| row.try_get_unchecked::<String, _>(i).map(SqlValue::Text).ok())
        .unwrap_or(SqlValue::Null)
}
