//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB driver
//! - [`postgres`]: PostgreSQL driver
//! - [`mssql`]: Microsoft SQL Server driver
//! - [`common`]: Shared utilities (SSL modes, catalog query fragments)
//!
//! # Architecture
//!
//! Each driver module provides:
//! - a `Dialect`: catalog queries and SQL syntax of the engine
//! - a connection implementing `QueryExecutor`
//!
//! [`DialectImpl`] and [`DbConnection`] are enums over the three engines so
//! callers pick an engine at runtime from configuration without boxing.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement `Dialect` and `QueryExecutor`
//! 3. Add enum variants to `DialectImpl` and `DbConnection`
//! 4. Register the type name in [`DialectImpl::from_db_type`]

pub mod common;
pub mod mssql;
pub mod mysql;
pub mod postgres;

pub use common::SslMode;
pub use mssql::{MssqlConnection, MssqlDialect};
pub use mysql::{MysqlConnection, MysqlDialect};
pub use postgres::{PostgresConnection, PostgresDialect};

use async_trait::async_trait;

use crate::config::{ConnectionConfig, DialectSettings};
use crate::core::datatype::TypeRules;
use crate::core::identifier::QuoteChars;
use crate::core::pagination::PaginationStyle;
use crate::core::schema::{DatabaseObjectKind, DbObject, Table, TableColumn, UserDefinedType};
use crate::core::traits::{CatalogFilter, Dialect, QueryExecutor};
use crate::core::value::{Row, SqlValue};
use crate::error::{InterpretError, Result};
use crate::script::StatementTerminator;

/// Enum-based static dispatch for dialects.
///
/// We use a manual impl instead of the enum_dispatch macro; the compiler
/// generates a match per call instead of vtable dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Mssql(MssqlDialect),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $call:expr) => {
        match $self {
            DialectImpl::Mysql($d) => $call,
            DialectImpl::Postgres($d) => $call,
            DialectImpl::Mssql($d) => $call,
        }
    };
}

impl DialectImpl {
    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        Self::from_config(db_type, &DialectSettings::default())
    }

    /// Create a dialect with engine-specific rendering settings applied.
    pub fn from_config(db_type: &str, settings: &DialectSettings) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::with_charset(
                settings.mysql_charset.clone(),
                settings.mysql_collation.clone(),
            ))),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectImpl::Mssql(
                MssqlDialect::with_legacy_pagination(settings.mssql_legacy_pagination),
            )),
            other => Err(InterpretError::Config(format!(
                "Unknown database type: '{}'. Supported types: mysql, postgres, mssql",
                other
            ))),
        }
    }

    pub fn is_mysql(&self) -> bool {
        matches!(self, DialectImpl::Mysql(_))
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        dispatch!(self, d => d.name())
    }

    fn quote_chars(&self) -> QuoteChars {
        dispatch!(self, d => d.quote_chars())
    }

    fn quote_ident(&self, name: &str) -> String {
        dispatch!(self, d => d.quote_ident(name))
    }

    fn qualify(&self, owner: &str, name: &str) -> String {
        dispatch!(self, d => d.qualify(owner, name))
    }

    fn max_identifier_length(&self) -> usize {
        dispatch!(self, d => d.max_identifier_length())
    }

    fn key_column_max_length(&self) -> i64 {
        dispatch!(self, d => d.key_column_max_length())
    }

    fn terminator(&self) -> StatementTerminator {
        dispatch!(self, d => d.terminator())
    }

    fn type_rules(&self) -> &TypeRules {
        dispatch!(self, d => d.type_rules())
    }

    fn pagination_style(&self) -> PaginationStyle {
        dispatch!(self, d => d.pagination_style())
    }

    fn max_insert_rows(&self) -> usize {
        dispatch!(self, d => d.max_insert_rows())
    }

    fn builtin_databases(&self) -> &[&str] {
        dispatch!(self, d => d.builtin_databases())
    }

    fn default_owner(&self) -> &str {
        dispatch!(self, d => d.default_owner())
    }

    fn databases_sql(&self) -> String {
        dispatch!(self, d => d.databases_sql())
    }

    fn catalog_sql(&self, kind: DatabaseObjectKind, filter: &CatalogFilter<'_>) -> Option<String> {
        dispatch!(self, d => d.catalog_sql(kind, filter))
    }

    fn charset_clause(&self, column: &TableColumn) -> Option<String> {
        dispatch!(self, d => d.charset_clause(column))
    }

    fn identity_clause(&self, table: &Table) -> String {
        dispatch!(self, d => d.identity_clause(table))
    }

    fn default_clause(&self, default_value: &str) -> String {
        dispatch!(self, d => d.default_clause(default_value))
    }

    fn inline_comment_clause(&self, comment: &str) -> Option<String> {
        dispatch!(self, d => d.inline_comment_clause(comment))
    }

    fn comment_statements(&self, table: &Table, table_ref: &str, columns: &[&TableColumn]) -> Vec<String> {
        dispatch!(self, d => d.comment_statements(table, table_ref, columns))
    }

    fn create_table_header(&self, owner: &str, name: &str, table_ref: &str, guard: bool) -> String {
        dispatch!(self, d => d.create_table_header(owner, name, table_ref, guard))
    }

    fn table_trailer(&self, table: &Table) -> String {
        dispatch!(self, d => d.table_trailer(table))
    }

    fn primary_key_clause(&self, constraint_name: &str, columns: &[String]) -> String {
        dispatch!(self, d => d.primary_key_clause(constraint_name, columns))
    }

    fn index_statement(&self, table_ref: &str, index_name: &str, columns: &[String], unique: bool) -> String {
        dispatch!(self, d => d.index_statement(table_ref, index_name, columns, unique))
    }

    fn user_defined_type_statement(&self, udt: &UserDefinedType, data_type: &str) -> Option<String> {
        dispatch!(self, d => d.user_defined_type_statement(udt, data_type))
    }

    fn guard_definition(&self, kind: DatabaseObjectKind, owner: &str, name: &str, definition: &str) -> String {
        dispatch!(self, d => d.guard_definition(kind, owner, name, definition))
    }

    fn set_constraints_sql(&self, enabled: bool) -> String {
        dispatch!(self, d => d.set_constraints_sql(enabled))
    }

    fn set_identity_sql(&self, table_ref: &str, table: &Table, column: &TableColumn, column_def: &str, enabled: bool) -> String {
        dispatch!(self, d => d.set_identity_sql(table_ref, table, column, column_def, enabled))
    }

    fn identity_insert_sql(&self, table_ref: &str, allow: bool) -> Option<String> {
        dispatch!(self, d => d.identity_insert_sql(table_ref, allow))
    }

    fn drop_sql(&self, object: &DbObject) -> String {
        dispatch!(self, d => d.drop_sql(object))
    }

    fn literal(&self, value: &SqlValue) -> String {
        dispatch!(self, d => d.literal(value))
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        dispatch!(self, d => d.bytes_literal(bytes))
    }

    fn string_literal(&self, text: &str) -> String {
        dispatch!(self, d => d.string_literal(text))
    }
}

/// One open connection to any supported engine.
pub enum DbConnection {
    Mysql(MysqlConnection),
    Postgres(PostgresConnection),
    Mssql(MssqlConnection),
}

macro_rules! dispatch_conn {
    ($self:ident, $c:ident => $call:expr) => {
        match $self {
            DbConnection::Mysql($c) => $call,
            DbConnection::Postgres($c) => $call,
            DbConnection::Mssql($c) => $call,
        }
    };
}

#[async_trait]
impl QueryExecutor for DbConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        dispatch_conn!(self, c => c.query(sql).await)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        dispatch_conn!(self, c => c.execute(sql).await)
    }

    async fn begin_transaction(&mut self) -> Result<()> {
        dispatch_conn!(self, c => c.begin_transaction().await)
    }

    async fn commit(&mut self) -> Result<()> {
        dispatch_conn!(self, c => c.commit().await)
    }

    async fn rollback(&mut self) -> Result<()> {
        dispatch_conn!(self, c => c.rollback().await)
    }
}

/// Open a connection for the configured engine.
pub async fn connect(config: &ConnectionConfig) -> Result<DbConnection> {
    match DialectImpl::from_db_type(&config.r#type)? {
        DialectImpl::Mysql(_) => Ok(DbConnection::Mysql(MysqlConnection::connect(config).await?)),
        DialectImpl::Postgres(_) => Ok(DbConnection::Postgres(
            PostgresConnection::connect(config).await?,
        )),
        DialectImpl::Mssql(_) => Ok(DbConnection::Mssql(MssqlConnection::connect(config).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_impl_from_db_type() {
        assert_eq!(DialectImpl::from_db_type("mysql").unwrap().name(), "mysql");
        assert_eq!(DialectImpl::from_db_type("postgres").unwrap().name(), "postgres");
        assert_eq!(DialectImpl::from_db_type("mssql").unwrap().name(), "mssql");

        // Alternative names
        assert!(DialectImpl::from_db_type("MariaDB").is_ok());
        assert!(DialectImpl::from_db_type("sqlserver").is_ok());
        assert!(DialectImpl::from_db_type("postgresql").is_ok());
        assert!(DialectImpl::from_db_type("pg").is_ok());

        let err = DialectImpl::from_db_type("oracle").unwrap_err();
        assert!(err.to_string().contains("Unknown database type: 'oracle'"));
    }

    #[test]
    fn test_dialect_impl_dispatch() {
        let dialect = DialectImpl::from_db_type("postgres").unwrap();
        assert_eq!(dialect.quote_ident("table"), "\"table\"");
        assert_eq!(dialect.pagination_style(), PaginationStyle::LimitOffset);

        let dialect = DialectImpl::from_db_type("mssql").unwrap();
        assert_eq!(dialect.quote_ident("table"), "[table]");
        assert_eq!(dialect.terminator(), StatementTerminator::BatchSeparator);
    }

    #[test]
    fn test_from_config_applies_settings() {
        let settings = DialectSettings {
            mssql_legacy_pagination: true,
            ..Default::default()
        };
        let dialect = DialectImpl::from_config("sqlserver", &settings).unwrap();
        assert_eq!(dialect.pagination_style(), PaginationStyle::RowNumber);

        let mysql = DialectImpl::from_config("mysql", &settings).unwrap();
        assert!(mysql.is_mysql());
        assert!(mysql.table_trailer(&Table::default()).contains("DEFAULT CHARSET=utf8mb4"));
    }
}
