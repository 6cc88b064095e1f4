//! SQL Server connection backed by a single Tiberius client.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::QueryExecutor;
use crate::core::value::{Row, SqlValue};
use crate::error::{InterpretError, Result};

/// Maximum TDS packet size (32KB).
const TDS_MAX_PACKET_SIZE: u32 = 32767;

/// One open SQL Server connection.
pub struct MssqlConnection {
    client: Client<Compat<TcpStream>>,
}

impl MssqlConnection {
    /// Open a connection from configuration and verify it with `SELECT 1`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let tiberius_config = build_config(config);

        let tcp = TcpStream::connect(tiberius_config.get_addr())
            .await
            .map_err(|e| InterpretError::connection(e, "connecting to SQL Server"))?;
        tcp.set_nodelay(true).ok();

        let mut client = Client::connect(tiberius_config, tcp.compat_write())
            .await
            .map_err(|e| InterpretError::connection(e, "SQL Server login"))?;

        client.simple_query("SELECT 1").await?.into_row().await?;

        info!("Connected to SQL Server: {}", config.display_name());

        Ok(Self { client })
    }
}

fn build_config(conn: &ConnectionConfig) -> Config {
    let mut config = Config::new();
    config.host(&conn.host);
    config.port(conn.port());
    config.database(&conn.database);
    config.authentication(AuthMethod::sql_server(&conn.user, &conn.password));

    // Encryption settings
    if conn.encrypt {
        if conn.trust_server_cert {
            config.trust_cert();
        }
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::NotSupported);
    }

    config.packet_size(TDS_MAX_PACKET_SIZE);
    config
}

#[async_trait]
impl QueryExecutor for MssqlConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        debug!("SQL Server query: {}", sql);
        let stream = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        Ok(rows.into_iter().map(decode_row).collect())
    }

    /// Runs the statement as a plain batch so session settings such as
    /// `SET IDENTITY_INSERT` stay in effect for later statements. Batches do
    /// not report affected rows; the result is always 0.
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("SQL Server execute: {}", sql);
        self.client
            .simple_query(sql)
            .await
            .map_err(|e| InterpretError::execution(sql, e))?
            .into_results()
            .await
            .map_err(|e| InterpretError::execution(sql, e))?;
        Ok(0)
    }

    async fn begin_transaction(&mut self) -> Result<()> {
        self.execute("BEGIN TRANSACTION").await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT TRANSACTION").await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK TRANSACTION").await.map(|_| ())
    }
}

fn decode_row(row: tiberius::Row) -> Row {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut out = Row::new();
    for (name, data) in names.into_iter().zip(row) {
        out.push(name, decode_value(data));
    }
    out
}

fn decode_value(data: ColumnData<'static>) -> SqlValue {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| SqlValue::I32(v.into())),
        ColumnData::I16(v) => v.map(|v| SqlValue::I32(v.into())),
        ColumnData::I32(v) => v.map(SqlValue::I32),
        ColumnData::I64(v) => v.map(SqlValue::I64),
        ColumnData::F32(v) => v.map(SqlValue::F32),
        ColumnData::F64(v) => v.map(SqlValue::F64),
        ColumnData::Bit(v) => v.map(SqlValue::Bool),
        ColumnData::String(v) => v.map(|s| SqlValue::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(SqlValue::Uuid),
        ColumnData::Binary(v) => v.map(|b| SqlValue::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.and_then(|n| {
            Decimal::try_from_i128_with_scale(n.value(), u32::from(n.scale()))
                .ok()
                .map(SqlValue::Decimal)
        }),
        ColumnData::Xml(v) => v.map(|x| SqlValue::Text(x.into_owned().into_string())),
        other => decode_temporal(&other),
    };
    value.unwrap_or(SqlValue::Null)
}

fn decode_temporal(data: &ColumnData<'static>) -> Option<SqlValue> {
    match data {
        ColumnData::Date(_) => NaiveDate::from_sql(data).ok().flatten().map(SqlValue::Date),
        ColumnData::Time(_) => NaiveTime::from_sql(data).ok().flatten().map(SqlValue::Time),
        ColumnData::DateTimeOffset(_) => chrono::DateTime::<Utc>::from_sql(data)
            .ok()
            .flatten()
            .map(|v| SqlValue::DateTimeOffset(v.fixed_offset())),
        _ => NaiveDateTime::from_sql(data)
            .ok()
            .flatten()
            .map(SqlValue::DateTime),
    }
}
