//! Core traits consumed by the interpreter.
//!
//! - [`QueryExecutor`]: runs SQL on one open connection
//! - [`BulkCopySink`]: loads row batches into a destination table
//! - [`ProgressSink`]: receives per-object begin/end feedback
//! - [`Dialect`]: SQL syntax and catalog layout of one engine
//!
//! # Design Patterns
//!
//! - **Strategy**: each engine provides a `Dialect`; the interpreter and the
//!   reader only ever talk to the trait.
//! - **Template Method**: default `Dialect` methods cover the ANSI behavior;
//!   engines override the pieces that differ.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::script::StatementTerminator;

use super::datatype::{is_character_type, is_number_type, TypeRules};
use super::identifier::{escape_literal, quote_with, QuoteChars};
use super::pagination::PaginationStyle;
use super::schema::{DatabaseObjectKind, DbObject, Table, TableColumn, UserDefinedType};
use super::value::{DataBatch, Row, SqlValue};

/// Run SQL text on one open connection.
///
/// Every call takes `&mut self`: a connection serves one command at a time.
#[async_trait]
pub trait QueryExecutor: Send {
    /// Run a query and collect all rows.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Run a statement and return the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    async fn begin_transaction(&mut self) -> Result<()> {
        self.execute("BEGIN").await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await.map(|_| ())
    }
}

/// Load row batches into a destination table.
#[async_trait]
pub trait BulkCopySink: Send {
    /// Write the batch, returning the number of rows committed.
    async fn bulk_copy(&mut self, batch: &DataBatch, cancel: &CancellationToken) -> Result<u64>;
}

/// Whether an operation on an object is starting or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Begin,
    End,
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackInfo {
    pub state: OperationState,
    pub kind: DatabaseObjectKind,
    pub name: String,
}

impl FeedbackInfo {
    pub fn begin(kind: DatabaseObjectKind, name: impl Into<String>) -> Self {
        Self {
            state: OperationState::Begin,
            kind,
            name: name.into(),
        }
    }

    pub fn end(kind: DatabaseObjectKind, name: impl Into<String>) -> Self {
        Self {
            state: OperationState::End,
            kind,
            name: name.into(),
        }
    }
}

/// Receives progress notifications, once per object, never per row.
pub trait ProgressSink: Send + Sync {
    fn on_feedback(&self, info: &FeedbackInfo);
}

/// How much of each object the schema reader fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFetchMode {
    /// Owner and name only.
    Simple,
    /// Also runnable definition text for routines, views and triggers.
    #[default]
    Details,
}

/// Restriction applied to one catalog query.
#[derive(Debug, Clone, Copy)]
pub struct CatalogFilter<'a> {
    /// Schema (or database, for MySQL) to read.
    pub owner: &'a str,
    /// Exact names to keep; empty keeps all. Table-scoped kinds filter by
    /// table name.
    pub names: &'a [String],
    pub mode: ObjectFetchMode,
}

impl CatalogFilter<'_> {
    pub fn is_details(&self) -> bool {
        self.mode == ObjectFetchMode::Details
    }
}

/// SQL syntax and catalog layout of one database engine.
///
/// Catalog queries return rows with these column aliases so one mapper
/// serves every engine: `Owner`, `Name`, `TableName`, `ColumnName`,
/// `DataType`, `MaxLength`, `Precision`, `Scale`, `IsNullable`, `Order`,
/// `DefaultValue`, `Comment`, `IsIdentity`, `IdentitySeed`,
/// `IdentityIncrement`, `IsUnique`, `IsDesc`, `ReferencedOwner`,
/// `ReferencedTableName`, `ReferencedColumnName`, `UpdateCascade`,
/// `DeleteCascade`, `Definition`.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g. "mysql", "postgres", "mssql").
    fn name(&self) -> &str;

    fn quote_chars(&self) -> QuoteChars;

    /// Quote an identifier, escaping embedded quote characters.
    fn quote_ident(&self, name: &str) -> String {
        quote_with(name, self.quote_chars())
    }

    /// Quote a table-level object name, owner-qualified where the engine
    /// scopes objects by schema.
    fn qualify(&self, owner: &str, name: &str) -> String {
        if owner.is_empty() {
            self.quote_ident(name)
        } else {
            format!("{}.{}", self.quote_ident(owner), self.quote_ident(name))
        }
    }

    /// Longest identifier the engine accepts, in characters.
    fn max_identifier_length(&self) -> usize;

    /// Longest character column that can be part of a key or index.
    /// `0` disables length restriction.
    fn key_column_max_length(&self) -> i64;

    fn terminator(&self) -> StatementTerminator {
        StatementTerminator::Semicolon
    }

    fn type_rules(&self) -> &TypeRules;

    fn pagination_style(&self) -> PaginationStyle;

    /// Rows per INSERT statement the engine accepts.
    fn max_insert_rows(&self) -> usize {
        1000
    }

    /// Databases hidden unless explicitly requested.
    fn builtin_databases(&self) -> &[&str];

    /// Default schema when none is configured.
    fn default_owner(&self) -> &str;

    // ===== Catalog =====

    /// Query listing databases, ordered by name.
    fn databases_sql(&self) -> String;

    /// Catalog query for one object kind, ordered by name (keys and indexes
    /// additionally by column order). `None` when the engine has no such
    /// object kind.
    fn catalog_sql(&self, kind: DatabaseObjectKind, filter: &CatalogFilter<'_>) -> Option<String>;

    // ===== Table rendering =====

    /// Extra clause after a character column's type (MySQL charset).
    fn charset_clause(&self, _column: &TableColumn) -> Option<String> {
        None
    }

    /// Identity clause of an identity column.
    fn identity_clause(&self, table: &Table) -> String;

    fn default_clause(&self, default_value: &str) -> String {
        format!("DEFAULT {}", default_value)
    }

    /// Inline column comment clause, if the engine supports one.
    fn inline_comment_clause(&self, _comment: &str) -> Option<String> {
        None
    }

    /// Stand-alone comment statements for a table and its columns, for
    /// engines without inline comments.
    fn comment_statements(&self, _table: &Table, _table_ref: &str, _columns: &[&TableColumn]) -> Vec<String> {
        Vec::new()
    }

    /// Opening line of CREATE TABLE, up to the column list. `guard` makes
    /// replaying it over an existing table a no-op.
    fn create_table_header(&self, _owner: &str, _name: &str, table_ref: &str, guard: bool) -> String {
        if guard {
            format!("CREATE TABLE IF NOT EXISTS {}(", table_ref)
        } else {
            format!("CREATE TABLE {}(", table_ref)
        }
    }

    /// Text after the closing parenthesis of CREATE TABLE.
    fn table_trailer(&self, _table: &Table) -> String {
        String::new()
    }

    /// Inline PRIMARY KEY clause. `columns` are quoted.
    fn primary_key_clause(&self, constraint_name: &str, columns: &[String]) -> String {
        format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_ident(constraint_name),
            columns.join(", ")
        )
    }

    /// Stand-alone index statement. `columns` are quoted.
    fn index_statement(&self, table_ref: &str, index_name: &str, columns: &[String], unique: bool) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_ident(index_name),
            table_ref,
            columns.join(", ")
        )
    }

    /// CREATE statement for a user-defined (alias) type; `data_type` is the
    /// rendered base type. `None` for engines without alias types.
    fn user_defined_type_statement(&self, _udt: &UserDefinedType, _data_type: &str) -> Option<String> {
        None
    }

    /// Wrap a definition so replaying it over an existing object is a no-op.
    fn guard_definition(&self, kind: DatabaseObjectKind, owner: &str, name: &str, definition: &str) -> String;

    // ===== Session and DDL operations =====

    /// Toggle foreign-key enforcement for the session.
    fn set_constraints_sql(&self, enabled: bool) -> String;

    /// Toggle the identity property of one column. `column_def` is the
    /// column rendered without any identity clause.
    fn set_identity_sql(&self, table_ref: &str, table: &Table, column: &TableColumn, column_def: &str, enabled: bool) -> String;

    /// Statement allowing explicit values in identity columns, for engines
    /// that need one around INSERTs.
    fn identity_insert_sql(&self, _table_ref: &str, _allow: bool) -> Option<String> {
        None
    }

    /// Drop a database object.
    fn drop_sql(&self, object: &DbObject) -> String;

    // ===== Literals =====

    /// Render a value as a SQL literal.
    fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Bytes(bytes) => self.bytes_literal(bytes),
            SqlValue::Text(text) => self.string_literal(text),
            other => ansi_literal(other),
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String;

    fn string_literal(&self, text: &str) -> String {
        format!("'{}'", escape_literal(text))
    }
}

/// Literal rendering shared by every dialect; binary data goes through
/// [`Dialect::bytes_literal`].
pub fn ansi_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        SqlValue::Bytes(b) => format!("X'{}'", hex::encode(b)),
        other => match other.as_text() {
            Some(text) if is_numeric_value(other) => text,
            Some(text) => format!("'{}'", escape_literal(&text)),
            None => "NULL".to_string(),
        },
    }
}

fn is_numeric_value(value: &SqlValue) -> bool {
    matches!(
        value,
        SqlValue::I32(_) | SqlValue::I64(_) | SqlValue::F32(_) | SqlValue::F64(_) | SqlValue::Decimal(_)
    )
}

/// Whether a catalog default is an expression rather than a string value.
///
/// Bare numbers count only on number columns and function calls or casts
/// only on non-character columns; anything else gets quoted.
pub fn is_expression_default(value: &str, data_type: &str) -> bool {
    let v = value.trim();
    if v.is_empty() {
        return false;
    }
    if v.starts_with('\'') || v.starts_with('(') || v.starts_with("N'") || v.starts_with("b'") {
        return true;
    }
    let upper = v.to_uppercase();
    if upper == "NULL"
        || upper.starts_with("CURRENT_TIMESTAMP")
        || upper.starts_with("CURRENT_DATE")
        || upper.starts_with("CURRENT_TIME")
    {
        return true;
    }
    if is_number_type(data_type) && v.parse::<f64>().is_ok_and(f64::is_finite) {
        return true;
    }
    if is_character_type(data_type) {
        return false;
    }
    upper == "TRUE" || upper == "FALSE" || v.contains("::") || (v.ends_with(')') && v.contains('('))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_ansi_literal() {
        assert_eq!(ansi_literal(&SqlValue::Null), "NULL");
        assert_eq!(ansi_literal(&SqlValue::I64(42)), "42");
        assert_eq!(ansi_literal(&SqlValue::Decimal(Decimal::new(1999, 2))), "19.99");
        assert_eq!(ansi_literal(&SqlValue::Text("O'Brien".into())), "'O''Brien'");
        assert_eq!(ansi_literal(&SqlValue::Bool(true)), "1");
        assert_eq!(ansi_literal(&SqlValue::Bytes(vec![0xde, 0xad])), "X'dead'");
    }

    #[test]
    fn test_expression_defaults() {
        assert!(is_expression_default("0", "int"));
        assert!(is_expression_default("3.5", "decimal(10,2)"));
        assert!(is_expression_default("-1", "bigint unsigned"));
        assert!(is_expression_default("CURRENT_TIMESTAMP", "datetime"));
        assert!(is_expression_default("current_timestamp(6)", "timestamp(6)"));
        assert!(is_expression_default("'pending'", "varchar(20)"));
        assert!(is_expression_default("((0))", "int"));
        assert!(is_expression_default("nextval('seq'::regclass)", "integer"));
        assert!(is_expression_default("getdate()", "datetime"));
        assert!(is_expression_default("true", "boolean"));
        assert!(!is_expression_default("pending", "varchar(20)"));
        assert!(!is_expression_default("", "int"));
    }

    #[test]
    fn test_string_defaults_that_look_like_expressions() {
        for value in ["inf", "nan", "infinity", "NaN", "-inf"] {
            assert!(!is_expression_default(value, "varchar(10)"), "{}", value);
            assert!(!is_expression_default(value, "float"), "{}", value);
        }
        assert!(!is_expression_default("abc(def)", "varchar(20)"));
        assert!(!is_expression_default("abc(def)", "text"));
        assert!(!is_expression_default("a::b", "nvarchar(20)"));
        assert!(!is_expression_default("42", "char(2)"));
        assert!(!is_expression_default("true", "varchar(5)"));
    }

    #[test]
    fn test_feedback_constructors() {
        let begin = FeedbackInfo::begin(DatabaseObjectKind::Table, "orders");
        assert_eq!(begin.state, OperationState::Begin);
        let end = FeedbackInfo::end(DatabaseObjectKind::Table, "orders");
        assert_eq!(end.state, OperationState::End);
        assert_eq!(end.name, "orders");
    }

    #[test]
    fn test_fetch_mode_default_is_details() {
        assert_eq!(ObjectFetchMode::default(), ObjectFetchMode::Details);
        let filter = CatalogFilter {
            owner: "shop",
            names: &[],
            mode: ObjectFetchMode::Simple,
        };
        assert!(!filter.is_details());
    }
}
