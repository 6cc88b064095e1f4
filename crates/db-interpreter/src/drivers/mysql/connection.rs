//! MySQL/MariaDB connection.
//!
//! Wraps one sqlx connection. Statements go through the text protocol
//! (`raw_sql`) so DDL that cannot be prepared, such as `CREATE TRIGGER`,
//! runs the same way as catalog queries.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::QueryExecutor;
use crate::core::value::{Row, SqlValue};
use crate::drivers::common::SslMode;
use crate::error::{InterpretError, Result};

/// One open MySQL connection.
pub struct MysqlConnection {
    conn: sqlx::MySqlConnection,
}

impl MysqlConnection {
    /// Open a connection from configuration and verify it with `SELECT 1`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode.to_mysql());

        let mut conn = options
            .connect()
            .await
            .map_err(|e| InterpretError::connection(e, "connecting to MySQL"))?;

        sqlx::raw_sql("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|e| InterpretError::connection(e, "testing MySQL connection"))?;

        info!("Connected to MySQL: {}", config.display_name());

        Ok(Self { conn })
    }
}

#[async_trait]
impl QueryExecutor for MysqlConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        debug!("MySQL query: {}", sql);
        let rows = sqlx::Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("MySQL execute: {}", sql);
        let result = sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        Ok(result.rows_affected())
    }
}

fn decode_row(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, i, column.type_info().name());
        out.push(column.name(), value);
    }
    out
}

/// Convert one MySQL value based on the column's reported type.
fn decode_value(row: &MySqlRow, i: usize, type_name: &str) -> SqlValue {
    let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return SqlValue::Null;
    }

    let data_type = type_name.to_lowercase();
    let value = match data_type.as_str() {
        "boolean" => row.try_get::<bool, _>(i).map(SqlValue::Bool).ok(),
        "tinyint" => row.try_get::<i8, _>(i).map(|v| SqlValue::I32(v.into())).ok(),
        "smallint" => row.try_get::<i16, _>(i).map(|v| SqlValue::I32(v.into())).ok(),
        "mediumint" | "int" => row.try_get::<i32, _>(i).map(SqlValue::I32).ok(),
        "bigint" => row.try_get::<i64, _>(i).map(SqlValue::I64).ok(),
        t if t.ends_with("unsigned") => row.try_get::<u64, _>(i).ok().map(|v| {
            i64::try_from(v)
                .map(SqlValue::I64)
                .unwrap_or_else(|_| SqlValue::Text(v.to_string()))
        }),
        "float" => row.try_get::<f32, _>(i).map(SqlValue::F32).ok(),
        "double" => row.try_get::<f64, _>(i).map(SqlValue::F64).ok(),
        "decimal" => row.try_get::<Decimal, _>(i).map(SqlValue::Decimal).ok(),
        "date" => row.try_get::<chrono::NaiveDate, _>(i).map(SqlValue::Date).ok(),
        "time" => row.try_get::<chrono::NaiveTime, _>(i).map(SqlValue::Time).ok(),
        "datetime" | "timestamp" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(SqlValue::DateTime)
            .ok(),
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bit"
        | "geometry" => row.try_get::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok(),
        "json" => row
            .try_get::<serde_json::Value, _>(i)
            .map(|v| SqlValue::Text(v.to_string()))
            .ok(),
        _ => None,
    };

    // Catalog columns report varying string/binary types across versions
    value
        .or_else(|| row.try_get::<String, _>(i).map(SqlValue::Text).ok())
        .or_else(|| row.try_get_unchecked::<Vec<u8>, _>(i).map(SqlValue::Bytes).ok())
        .unwrap_or(SqlValue::Null)
}
