//! # db-interpreter
//!
//! Dialect-aware relational schema interpreter.
//!
//! Reads live catalog metadata from MySQL, PostgreSQL or SQL Server into a
//! dialect-neutral [`SchemaInfo`] and renders it back as runnable scripts for
//! any of the three engines:
//!
//! - **Schema scripts** with composite keys, cascades, indexes and comments
//! - **Identifier truncation** and key-length restriction per dialect
//! - **Paginated data extraction** and INSERT data scripts
//! - **Conversion** between engines through a canonical type map
//!
//! ## Example
//!
//! ```rust,no_run
//! use db_interpreter::{Config, DbInterpreter, SchemaInfoFilter};
//!
//! #[tokio::main]
//! async fn main() -> db_interpreter::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut interpreter =
//!         DbInterpreter::connect(&config.source, &config.settings, config.options.clone()).await?;
//!     let schema = interpreter.get_schema_info(&SchemaInfoFilter::default()).await?;
//!     let script = interpreter.generate_schema_scripts(&schema).await?;
//!     println!("{}", script.text.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod core;
pub mod drivers;
pub mod error;
pub mod interpreter;
pub mod reader;
pub mod script;
pub mod typemap;

// Re-exports for convenient access
pub use crate::core::{
    BulkCopySink, DataBatch, DbObject, Dialect, FeedbackInfo, ObjectFetchMode, ProgressSink,
    QueryExecutor, Row, SchemaInfo, SqlValue, TracingProgress,
};
pub use config::{Config, ConnectionConfig, DialectSettings, InterpreterOptions};
pub use convert::{translate_snapshot, ConvertPlan, ConvertResult, DbConverter};
pub use drivers::{connect, DbConnection, DialectImpl};
pub use error::{InterpretError, Result};
pub use interpreter::{DbInterpreter, ExecutionSummary, GeneratedScript};
pub use reader::{SchemaInfoFilter, SchemaReader};
pub use script::{ScriptBuilder, ScriptKind};
pub use typemap::TypeTranslator;
