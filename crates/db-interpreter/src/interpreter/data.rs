//! Paged reads, record counts and data scripts.

use tracing::{debug, info, warn};

use super::bulk::render_insert;
use super::{DbInterpreter, GeneratedScript};
use crate::core::datatype::is_orderable_type;
use crate::core::pagination::{page_window, render_page_query, PageSelect};
use crate::core::schema::{DatabaseObjectKind, SchemaInfo, Table};
use crate::core::traits::{Dialect, QueryExecutor};
use crate::core::value::{DataBatch, Row};
use crate::error::{InterpretError, Result};
use crate::script::{ScriptBuilder, ScriptKind};

impl<E: QueryExecutor> DbInterpreter<E> {
    /// SELECT returning page `page_number` (1-based) of `page_size` rows.
    ///
    /// Without `order_columns` the page uses a constant ordering; callers
    /// holding the schema get a stable one from [`page_order`].
    pub fn paginate_sql(
        &self,
        table: &Table,
        columns: &[String],
        order_columns: &[String],
        where_clause: Option<&str>,
        page_number: u64,
        page_size: u64,
    ) -> Result<String> {
        let window = page_window(page_number, page_size)?;
        let table_ref = self.dialect.qualify(&table.owner, &table.name);
        let quoted_columns = quote_each(&self.dialect, columns);
        let quoted_order = quote_each(&self.dialect, order_columns);
        render_page_query(
            self.dialect.pagination_style(),
            &PageSelect {
                table: &table_ref,
                columns: &quoted_columns,
                order_by: &quoted_order,
                where_clause,
            },
            window,
        )
    }

    /// Fetch one page of rows.
    pub async fn paginate(
        &mut self,
        table: &Table,
        columns: &[String],
        order_columns: &[String],
        where_clause: Option<&str>,
        page_number: u64,
        page_size: u64,
    ) -> Result<Vec<Row>> {
        let sql = self.paginate_sql(table, columns, order_columns, where_clause, page_number, page_size)?;
        debug!("Page {} of {}: {}", page_number, table.name, sql);
        self.query_cancellable(&sql).await
    }

    pub async fn get_table_record_count(&mut self, table: &Table, where_clause: Option<&str>) -> Result<u64> {
        let mut sql = format!(
            "SELECT COUNT(1) AS {} FROM {}",
            self.dialect.quote_ident("Count"),
            self.dialect.qualify(&table.owner, &table.name)
        );
        if let Some(w) = where_clause.map(str::trim).filter(|w| !w.is_empty()) {
            sql.push_str(&format!(" WHERE {}", w));
        }

        let rows = self.query_cancellable(&sql).await?;
        let count = rows
            .first()
            .and_then(|row| row.values().first())
            .and_then(|v| v.as_i64())
            .ok_or_else(|| InterpretError::Catalog(format!("COUNT on {} returned no value", table.name)))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Render every table's rows as INSERT statements for this dialect.
    pub async fn generate_data_scripts(&mut self, schema: &SchemaInfo) -> Result<GeneratedScript> {
        let target = self.dialect.clone();
        self.generate_data_scripts_for(schema, &target).await
    }

    /// Read rows through this connection and render them as INSERT
    /// statements for `target`.
    pub async fn generate_data_scripts_for(&mut self, schema: &SchemaInfo, target: &dyn Dialect) -> Result<GeneratedScript> {
        info!("Generating {} data script for {} tables", target.name(), schema.tables.len());

        let mut builder = ScriptBuilder::new();
        let mut completed = true;

        for table in &schema.tables {
            if self.cancel.is_cancelled() {
                warn!("Data generation cancelled before table {}", table.name);
                completed = false;
                break;
            }

            self.begin(DatabaseObjectKind::Table, &table.name);
            let fragments = self.table_data_script(schema, table, target).await;
            self.end(DatabaseObjectKind::Table, &table.name);
            match fragments {
                Ok(fragments) => builder.extend(fragments),
                Err(InterpretError::Cancelled) => {
                    warn!("Data generation cancelled while reading {}", table.name);
                    completed = false;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        self.finish(builder, target, "data", completed).await
    }

    async fn table_data_script(
        &mut self,
        schema: &SchemaInfo,
        table: &Table,
        target: &dyn Dialect,
    ) -> Result<ScriptBuilder> {
        let column_names: Vec<String> = schema.columns_of(table).iter().map(|c| c.name.clone()).collect();
        let order = page_order(schema, table);
        let has_identity = schema.columns_of(table).iter().any(|c| c.is_identity);

        let owner = self.script_owner(&table.owner).to_string();
        let table_ref = target.qualify(&owner, &table.name);
        let page_size = self.options.data_batch_size.max(1);
        let chunk = target.max_insert_rows().max(1);
        let treat_bytes_as_null = self.options.treat_bytes_as_null;

        let mut builder = ScriptBuilder::new();
        let mut page = 1u64;
        let mut total = 0usize;

        loop {
            let rows = self
                .paginate(table, &column_names, &order, None, page, page_size)
                .await?;
            let fetched = rows.len();
            if fetched == 0 {
                break;
            }

            let batch = DataBatch::from_rows(owner.as_str(), table.name.as_str(), column_names.clone(), rows);
            for values in batch.rows.chunks(chunk) {
                builder.append_statement(
                    ScriptKind::Data,
                    &table.name,
                    render_insert(target, &table_ref, &batch.columns, values, treat_bytes_as_null),
                );
            }
            total += fetched;

            if (fetched as u64) < page_size {
                break;
            }
            page += 1;
        }

        debug!("{} rows scripted for {}", total, table.name);
        if total == 0 || !has_identity {
            return Ok(builder);
        }

        match (
            target.identity_insert_sql(&table_ref, true),
            target.identity_insert_sql(&table_ref, false),
        ) {
            (Some(on), Some(off)) => {
                let mut wrapped = ScriptBuilder::new();
                wrapped.append_statement(ScriptKind::Session, &table.name, on);
                wrapped.extend(builder);
                wrapped.append_statement(ScriptKind::Session, &table.name, off);
                Ok(wrapped)
            }
            _ => Ok(builder),
        }
    }

    /// Query that gives up with `Cancelled` when the token fires.
    pub(crate) async fn query_cancellable(&mut self, sql: &str) -> Result<Vec<Row>> {
        if self.cancel.is_cancelled() {
            return Err(InterpretError::Cancelled);
        }
        let cancel = self.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InterpretError::Cancelled),
            rows = self.executor.query(sql) => rows,
        }
    }
}

/// Columns that keep pages of `table` stable: the primary key, or every
/// sortable column in declared order. Empty when no column sorts.
pub fn page_order(schema: &SchemaInfo, table: &Table) -> Vec<String> {
    if let Some(pk) = schema.primary_keys_of(table).first() {
        return pk.column_names().iter().map(|c| c.to_string()).collect();
    }
    let order: Vec<String> = schema
        .columns_of(table)
        .iter()
        .filter(|c| is_orderable_type(&c.data_type))
        .map(|c| c.name.clone())
        .collect();
    if order.is_empty() {
        debug!("No sortable column on {}, paging without a stable order", table.name);
    }
    order
}

fn quote_each(dialect: &dyn Dialect, names: &[String]) -> Vec<String> {
    names.iter().map(|n| dialect.quote_ident(n)).collect()
}
