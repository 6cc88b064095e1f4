//! Bulk copy through multi-row INSERT statements.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::traits::{BulkCopySink, Dialect, QueryExecutor};
use crate::core::value::{DataBatch, SqlValue};
use crate::error::{InterpretError, Result};

/// One `INSERT INTO t(cols) VALUES (...),(...)` statement.
///
/// `table_ref` is already qualified and quoted; columns are quoted here.
pub fn render_insert(
    dialect: &dyn Dialect,
    table_ref: &str,
    columns: &[String],
    rows: &[Vec<SqlValue>],
    treat_bytes_as_null: bool,
) -> String {
    let column_list = columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let values = rows
        .iter()
        .map(|row| {
            let literals: Vec<String> = row
                .iter()
                .map(|v| match v {
                    SqlValue::Bytes(_) if treat_bytes_as_null => "NULL".to_string(),
                    other => dialect.literal(other),
                })
                .collect();
            format!("({})", literals.join(", "))
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!("INSERT INTO {}({}) VALUES\n{}", table_ref, column_list, values)
}

/// [`BulkCopySink`] over any executor: each batch is written as chunks of
/// at most [`Dialect::max_insert_rows`] rows.
pub struct InsertStatementSink<'a, E: QueryExecutor + ?Sized> {
    executor: &'a mut E,
    dialect: &'a dyn Dialect,
    treat_bytes_as_null: bool,
}

impl<'a, E: QueryExecutor + ?Sized> InsertStatementSink<'a, E> {
    pub fn new(executor: &'a mut E, dialect: &'a dyn Dialect) -> Self {
        Self {
            executor,
            dialect,
            treat_bytes_as_null: false,
        }
    }

    pub fn with_bytes_as_null(mut self, enabled: bool) -> Self {
        self.treat_bytes_as_null = enabled;
        self
    }
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> BulkCopySink for InsertStatementSink<'_, E> {
    async fn bulk_copy(&mut self, batch: &DataBatch, cancel: &CancellationToken) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let table_ref = self.dialect.qualify(&batch.owner, &batch.table);
        let chunk_size = self.dialect.max_insert_rows().max(1);
        let mut written = 0u64;

        for chunk in batch.rows.chunks(chunk_size) {
            if cancel.is_cancelled() {
                return Err(InterpretError::Cancelled);
            }
            let sql = render_insert(
                self.dialect,
                &table_ref,
                &batch.columns,
                chunk,
                self.treat_bytes_as_null,
            );
            self.executor
                .execute(&sql)
                .await
                .map_err(|e| match e {
                    InterpretError::Execution { .. } | InterpretError::Cancelled => e,
                    other => InterpretError::execution(format!("INSERT INTO {} ...", table_ref), other),
                })?;
            written += chunk.len() as u64;
        }

        debug!("Inserted {} rows into {}", written, table_ref);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MockExecutor;
    use crate::drivers::{MssqlDialect, PostgresDialect};

    fn batch(rows: usize) -> DataBatch {
        let mut batch = DataBatch::new("shop", "orders", vec!["id".to_string(), "note".to_string()]);
        for i in 0..rows {
            batch
                .rows
                .push(vec![SqlValue::I64(i as i64), SqlValue::Text(format!("n'{}", i))]);
        }
        batch
    }

    #[test]
    fn test_render_insert_escapes() {
        let dialect = PostgresDialect::new();
        let sql = render_insert(
            &dialect,
            "\"shop\".\"orders\"",
            &["id".to_string(), "note".to_string()],
            &batch(1).rows,
            false,
        );
        assert_eq!(sql, "INSERT INTO \"shop\".\"orders\"(\"id\", \"note\") VALUES\n(0, 'n''0')");
    }

    #[tokio::test]
    async fn test_sink_chunks_by_max_insert_rows() {
        let dialect = MssqlDialect::new();
        let mut exec = MockExecutor::new();
        let mut sink = InsertStatementSink::new(&mut exec, &dialect);
        let written = sink
            .bulk_copy(&batch(2500), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(written, 2500);
        drop(sink);

        assert_eq!(exec.executed.len(), 3);
        assert!(exec.executed[0].starts_with("INSERT INTO [shop].[orders]([id], [note]) VALUES"));
        assert!(exec.executed[0].contains("N'n''0'"));
    }

    #[tokio::test]
    async fn test_sink_stops_on_cancel() {
        let dialect = PostgresDialect::new();
        let mut exec = MockExecutor::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = InsertStatementSink::new(&mut exec, &dialect);
        let err = sink.bulk_copy(&batch(3), &cancel).await.unwrap_err();
        assert!(matches!(err, InterpretError::Cancelled));
    }
}
