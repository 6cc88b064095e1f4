//! Core abstractions shared by every dialect.
//!
//! - [`schema`]: dialect-neutral schema model
//! - [`value`]: SQL values, result rows and row batches
//! - [`traits`]: executor, bulk-copy, progress and dialect contracts
//! - [`identifier`]: quoting, truncation and literal escaping
//! - [`datatype`]: type-length inference and key-length limits
//! - [`pagination`]: page window math and windowed SELECT rendering
//! - [`progress`]: ready-made progress sinks
//!
//! Nothing here talks to a database; drivers implement the traits.

pub mod datatype;
pub mod identifier;
pub mod pagination;
pub mod progress;
pub mod schema;
pub mod traits;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use pagination::{PageWindow, PaginationStyle};
pub use progress::TracingProgress;
pub use schema::{
    Database, DatabaseObjectKind, DbObject, Function, Procedure, SchemaInfo, Table, TableColumn,
    TableForeignKey, TableIndex, TablePrimaryKey, TableTrigger, UserDefinedType, View,
};
pub use traits::{
    BulkCopySink, CatalogFilter, Dialect, FeedbackInfo, ObjectFetchMode, OperationState,
    ProgressSink, QueryExecutor,
};
pub use value::{DataBatch, Row, SqlValue};
