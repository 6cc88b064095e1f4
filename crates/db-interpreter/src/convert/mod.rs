//! Source to target conversion.
//!
//! A [`DbConverter`] reads a snapshot through the source interpreter,
//! translates it to the target dialect and replays it on the target:
//!
//! 1. Read the source schema in details mode
//! 2. Translate column types and re-home owners
//! 3. Generate the target schema script
//! 4. Optionally execute it on the target
//! 5. Optionally copy table data page by page

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::schema::{DatabaseObjectKind, SchemaInfo, Table};
use crate::core::traits::{BulkCopySink, Dialect, ObjectFetchMode, QueryExecutor};
use crate::core::value::DataBatch;
use crate::error::{InterpretError, Result};
use crate::interpreter::{page_order, DbInterpreter};
use crate::reader::SchemaInfoFilter;
use crate::typemap::TypeTranslator;

/// What a conversion run should do beyond script generation.
#[derive(Debug, Clone, Default)]
pub struct ConvertPlan {
    /// Restrict the run to these tables; empty means all.
    pub tables: Vec<String>,
    /// Execute the generated schema script on the target.
    pub execute_script: bool,
    /// Copy table rows after the schema is in place.
    pub transfer_data: bool,
}

/// Result of a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResult {
    pub run_id: String,
    pub status: String,
    pub source_dialect: String,
    pub target_dialect: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub tables_total: usize,
    pub statements_executed: usize,
    pub statements_failed: usize,
    pub rows_transferred: u64,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lossy_columns: Vec<String>,
}

impl ConvertResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Converter over a source and a target interpreter sharing one
/// cancellation token.
pub struct DbConverter<S: QueryExecutor, T: QueryExecutor> {
    source: DbInterpreter<S>,
    target: DbInterpreter<T>,
    cancel: CancellationToken,
}

impl<S: QueryExecutor, T: QueryExecutor> DbConverter<S, T> {
    pub fn new(source: DbInterpreter<S>, target: DbInterpreter<T>, cancel: CancellationToken) -> Self {
        Self {
            source: source.with_cancel(cancel.clone()),
            target: target.with_cancel(cancel.clone()),
            cancel,
        }
    }

    pub fn source(&self) -> &DbInterpreter<S> {
        &self.source
    }

    pub fn target(&self) -> &DbInterpreter<T> {
        &self.target
    }

    pub fn into_parts(self) -> (DbInterpreter<S>, DbInterpreter<T>) {
        (self.source, self.target)
    }

    /// Owner the converted objects are created under.
    fn target_owner(&self) -> String {
        self.target
            .options()
            .target_owner
            .clone()
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| self.target.owner().to_string())
    }

    /// Run a conversion.
    pub async fn run(&mut self, plan: &ConvertPlan) -> Result<ConvertResult> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start_time = Instant::now();
        let source_dialect = self.source.dialect().name().to_string();
        let target_dialect = self.target.dialect().name().to_string();

        info!(
            "Starting conversion run {}: {} -> {}",
            run_id, source_dialect, target_dialect
        );

        // Phase 1: read the source snapshot
        info!("Phase 1: Reading source schema");
        self.source.options_mut().fetch_mode = ObjectFetchMode::Details;
        let filter = if plan.tables.is_empty() {
            SchemaInfoFilter::default()
        } else {
            SchemaInfoFilter::tables(plan.tables.clone())
        };
        let source_schema = self.source.get_schema_info(&filter).await?;
        info!("Read {} tables from source", source_schema.tables.len());

        // Phase 2: translate and re-home
        info!("Phase 2: Translating to {}", target_dialect);
        let mut schema = source_schema.clone();
        let lossy_columns = translate_snapshot(&mut schema, &source_dialect, &target_dialect)?;
        let target_owner = self.target_owner();
        schema.rehome(&target_owner);

        let mut result = ConvertResult {
            run_id,
            status: "running".to_string(),
            source_dialect,
            target_dialect,
            started_at,
            completed_at: started_at,
            duration_seconds: 0.0,
            tables_total: schema.tables.len(),
            statements_executed: 0,
            statements_failed: 0,
            rows_transferred: 0,
            cancelled: false,
            script_file: None,
            script: None,
            lossy_columns,
        };

        // Phase 3: generate the target script
        info!("Phase 3: Generating target schema script");
        let script = self.target.generate_schema_scripts(&schema).await?;
        result.script_file = script.file.clone();
        result.script = script.text.clone();
        result.cancelled = !script.completed;

        // Phase 4: execute it
        if plan.execute_script && !result.cancelled {
            info!("Phase 4: Executing schema script on target");
            let summary = self.target.execute_script(&script.builder).await?;
            result.statements_executed = summary.executed;
            result.statements_failed = summary.failed;
            result.cancelled = !summary.completed;
        }

        // Phase 5: copy data
        if plan.transfer_data && !result.cancelled {
            info!("Phase 5: Transferring data");
            match self.transfer(&source_schema, &target_owner).await {
                Ok(rows) => result.rows_transferred = rows,
                Err(InterpretError::Cancelled) => result.cancelled = true,
                Err(e) => return Err(e),
            }
        }

        result.completed_at = Utc::now();
        result.duration_seconds = start_time.elapsed().as_secs_f64();
        result.status = if result.cancelled { "cancelled" } else { "completed" }.to_string();

        info!(
            "Conversion {}: {} tables, {} statements, {} rows in {:.1}s",
            result.status,
            result.tables_total,
            result.statements_executed,
            result.rows_transferred,
            result.duration_seconds
        );
        Ok(result)
    }

    /// Copy every table's rows inside one target transaction. Any failure,
    /// cancellation included, rolls the transaction back.
    async fn transfer(&mut self, source_schema: &SchemaInfo, target_owner: &str) -> Result<u64> {
        let use_transaction = self.target.options().use_transaction;
        if use_transaction {
            self.target.executor_mut().begin_transaction().await?;
        }

        let copied = self.copy_tables(source_schema, target_owner).await;
        match copied {
            Ok(rows) => {
                self.target.set_constraints_enabled(true).await?;
                if use_transaction {
                    self.target.executor_mut().commit().await?;
                }
                info!("Transferred {} rows", rows);
                Ok(rows)
            }
            Err(e) => {
                warn!("Data transfer failed: {}", e);
                if use_transaction {
                    if let Err(rollback_err) = self.target.executor_mut().rollback().await {
                        warn!("Rollback failed: {}", rollback_err);
                    }
                }
                // Session-scoped on MySQL and SQL Server; a rollback does not restore it
                let enable = self.target.set_constraints_enabled_sql(true);
                if let Err(enable_err) = self.target.executor_mut().execute(&enable).await {
                    warn!("Re-enabling constraints failed: {}", enable_err);
                }
                Err(e)
            }
        }
    }

    async fn copy_tables(&mut self, source_schema: &SchemaInfo, target_owner: &str) -> Result<u64> {
        self.target.set_constraints_enabled(false).await?;

        let mut total = 0u64;
        for table in &source_schema.tables {
            if self.cancel.is_cancelled() {
                return Err(InterpretError::Cancelled);
            }
            self.target.begin(DatabaseObjectKind::Table, &table.name);
            let rows = self.copy_table(source_schema, table, target_owner).await?;
            info!("{}: {} rows", table.name, rows);
            total += rows;
            self.target.end(DatabaseObjectKind::Table, &table.name);
        }
        Ok(total)
    }

    async fn copy_table(&mut self, source_schema: &SchemaInfo, table: &Table, target_owner: &str) -> Result<u64> {
        let source_columns = source_schema.columns_of(table);
        let columns: Vec<String> = source_columns.iter().map(|c| c.name.clone()).collect();
        let order = page_order(source_schema, table);
        let has_identity = source_columns.iter().any(|c| c.is_identity);
        let page_size = self.source.options().data_batch_size.max(1);

        let table_ref = self.target.dialect().qualify(target_owner, &table.name);
        let identity_on = has_identity
            .then(|| self.target.dialect().identity_insert_sql(&table_ref, true))
            .flatten();
        let identity_off = has_identity
            .then(|| self.target.dialect().identity_insert_sql(&table_ref, false))
            .flatten();

        if let Some(sql) = &identity_on {
            self.target.execute_statement(sql).await?;
        }

        let mut written = 0u64;
        let mut page = 1u64;
        loop {
            let rows = self
                .source
                .paginate(table, &columns, &order, None, page, page_size)
                .await?;
            if rows.is_empty() {
                break;
            }
            let fetched = rows.len() as u64;
            let batch = DataBatch::from_rows(target_owner, &table.name, columns.clone(), rows);
            let cancel = self.cancel.clone();
            written += self.target.bulk_sink().bulk_copy(&batch, &cancel).await?;
            if fetched < page_size {
                break;
            }
            page += 1;
        }

        if let Some(sql) = &identity_off {
            self.target.execute_statement(sql).await?;
        }
        Ok(written)
    }
}

/// Translate a snapshot read from `source` for rendering on `target`.
///
/// Across dialects column types go through the canonical type map, user
/// types are inlined and views, routines and triggers are dropped since
/// their bodies are engine-specific. Returns the lossy-conversion warnings.
pub fn translate_snapshot(schema: &mut SchemaInfo, source: &str, target: &str) -> Result<Vec<String>> {
    let translator = TypeTranslator::for_dialects(source, target)?;
    if translator.is_identity() {
        return Ok(Vec::new());
    }
    let warnings = translator.translate_schema(schema, false);
    drop_engine_specific(schema);
    Ok(warnings)
}

fn drop_engine_specific(schema: &mut SchemaInfo) {
    let dropped =
        schema.views.len() + schema.functions.len() + schema.procedures.len() + schema.table_triggers.len();
    if dropped > 0 {
        info!(
            "Skipping {} views, routines and triggers: definitions are not portable across dialects",
            dropped
        );
    }
    schema.views.clear();
    schema.functions.clear();
    schema.procedures.clear();
    schema.table_triggers.clear();
}
