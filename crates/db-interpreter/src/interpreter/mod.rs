//! Dialect-aware interpreter: reads a schema through [`SchemaReader`] and
//! renders it back as scripts for its dialect.
//!
//! One interpreter owns one open connection. Every executing call takes
//! `&mut self`, so at most one catalog query or statement is in flight.
//!
//! - [`schema`]: schema script generation and the key-length restriction pass
//! - [`data`]: pagination, record counts and data scripts
//! - [`execute`]: constraint/identity toggles, drops and script execution
//! - [`bulk`]: INSERT-statement bulk copy

mod bulk;
mod data;
mod execute;
mod schema;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{ConnectionConfig, DialectSettings, InterpreterOptions};
use crate::core::schema::{Database, DatabaseObjectKind, SchemaInfo};
use crate::core::traits::{Dialect, FeedbackInfo, ProgressSink, QueryExecutor};
use crate::drivers::{connect, DbConnection, DialectImpl};
use crate::error::Result;
use crate::reader::{SchemaInfoFilter, SchemaReader};
use crate::script::ScriptBuilder;

pub use bulk::{render_insert, InsertStatementSink};
pub use data::page_order;
pub use execute::ExecutionSummary;
pub use schema::restrict_key_column_lengths;

/// Output of a script generation run.
#[derive(Debug, Clone, Default)]
pub struct GeneratedScript {
    /// Every fragment produced, in replay order.
    pub builder: ScriptBuilder,
    /// Serialized script, when `return_as_text` is set.
    pub text: Option<String>,
    /// File the script was written to, when `write_to_file` is set.
    pub file: Option<PathBuf>,
    /// `false` when the run was cancelled before every object was rendered.
    pub completed: bool,
}

/// Schema interpreter bound to one connection and one dialect.
pub struct DbInterpreter<E: QueryExecutor> {
    executor: E,
    dialect: DialectImpl,
    options: InterpreterOptions,
    /// Database name, used in script file names.
    database: String,
    /// Owner (schema) read from the connection.
    owner: String,
    progress: Option<Arc<dyn ProgressSink>>,
    cancel: CancellationToken,
}

impl<E: QueryExecutor> DbInterpreter<E> {
    pub fn new(
        executor: E,
        dialect: DialectImpl,
        options: InterpreterOptions,
        database: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            dialect,
            options,
            database: database.into(),
            owner: owner.into(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Report per-object progress to `sink`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Stop long-running calls when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut InterpreterOptions {
        &mut self.options
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The underlying connection, e.g. for caller-managed transactions.
    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Schema reader over this interpreter's connection, using the configured
    /// fetch mode and cancellation token.
    pub fn reader(&mut self) -> SchemaReader<'_, E> {
        SchemaReader::new(&mut self.executor, &self.dialect, self.owner.clone())
            .with_mode(self.options.fetch_mode)
            .with_cancel(self.cancel.clone())
    }

    /// Databases on the server; builtin ones only with
    /// `show_builtin_databases`.
    pub async fn get_databases(&mut self) -> Result<Vec<Database>> {
        let include_builtin = self.options.show_builtin_databases;
        self.reader().get_databases(include_builtin).await
    }

    pub async fn get_schema_info(&mut self, filter: &SchemaInfoFilter) -> Result<SchemaInfo> {
        self.reader().get_schema_info(filter).await
    }

    /// Owner written into generated scripts.
    fn script_owner<'a>(&'a self, object_owner: &'a str) -> &'a str {
        self.options
            .target_owner
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or(object_owner)
    }

    fn feedback(&self, info: FeedbackInfo) {
        if let Some(sink) = &self.progress {
            sink.on_feedback(&info);
        }
    }

    pub(crate) fn begin(&self, kind: DatabaseObjectKind, name: &str) {
        self.feedback(FeedbackInfo::begin(kind, name));
    }

    pub(crate) fn end(&self, kind: DatabaseObjectKind, name: &str) {
        self.feedback(FeedbackInfo::end(kind, name));
    }

    /// Serialize `builder` for `dialect` and apply the output-mode options.
    async fn finish(
        &self,
        builder: ScriptBuilder,
        dialect: &dyn Dialect,
        suffix: &str,
        completed: bool,
    ) -> Result<GeneratedScript> {
        let script = builder.to_script(dialect.terminator());

        let file = if self.options.write_to_file {
            let path = self.options.output_folder.join(format!(
                "{}_{}_{}.sql",
                self.database,
                dialect.name(),
                suffix
            ));
            tokio::fs::create_dir_all(&self.options.output_folder).await?;
            tokio::fs::write(&path, &script).await?;
            info!("Wrote {} script to {}", suffix, path.display());
            Some(path)
        } else {
            None
        };

        Ok(GeneratedScript {
            builder,
            text: self.options.return_as_text.then_some(script),
            file,
            completed,
        })
    }
}

impl DbInterpreter<DbConnection> {
    /// Open a connection for `config` and bind an interpreter to it.
    pub async fn connect(
        config: &ConnectionConfig,
        settings: &DialectSettings,
        options: InterpreterOptions,
    ) -> Result<Self> {
        let dialect = DialectImpl::from_config(&config.r#type, settings)?;
        let connection = connect(config).await?;
        let owner = config.owner(&dialect);
        info!("Connected to {} ({})", config.display_name(), dialect.name());
        Ok(Self::new(connection, dialect, options, config.database.clone(), owner))
    }
}
