//! Session toggles, drops and script execution on the interpreter's
//! connection.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::bulk::InsertStatementSink;
use super::DbInterpreter;
use crate::core::schema::{DbObject, Table, TableColumn};
use crate::core::traits::{Dialect, QueryExecutor};
use crate::error::{InterpretError, Result};
use crate::script::ScriptBuilder;

/// Outcome of running a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub executed: usize,
    pub failed: usize,
    /// `false` when cancellation stopped the run early.
    pub completed: bool,
}

impl<E: QueryExecutor> DbInterpreter<E> {
    pub fn set_constraints_enabled_sql(&self, enabled: bool) -> String {
        self.dialect.set_constraints_sql(enabled)
    }

    /// Toggle foreign-key enforcement for this session.
    pub async fn set_constraints_enabled(&mut self, enabled: bool) -> Result<()> {
        let sql = self.set_constraints_enabled_sql(enabled);
        info!("{} constraints", if enabled { "Enabling" } else { "Disabling" });
        self.execute_statement(&sql).await.map(|_| ())
    }

    pub fn set_identity_enabled_sql(&self, table: &Table, column: &TableColumn, enabled: bool) -> String {
        let table_ref = self.dialect.qualify(self.script_owner(&table.owner), &table.name);
        let column_def = self.column_definition(table, column, false);
        self.dialect
            .set_identity_sql(&table_ref, table, column, &column_def, enabled)
    }

    /// Toggle the identity property of a column. On SQL Server a disabled
    /// identity allows explicit inserts into the column.
    pub async fn set_identity_enabled(&mut self, table: &Table, column: &TableColumn, enabled: bool) -> Result<()> {
        let sql = self.set_identity_enabled_sql(table, column, enabled);
        self.execute_statement(&sql).await.map(|_| ())
    }

    pub fn drop_sql(&self, object: &DbObject) -> String {
        self.dialect.drop_sql(object)
    }

    /// Drop a database object.
    pub async fn drop(&mut self, object: &DbObject) -> Result<()> {
        let sql = self.drop_sql(object);
        info!("Dropping {} {}", object.kind(), object.name());
        self.execute_statement(&sql).await.map(|_| ())
    }

    /// Run one statement, wrapping driver errors with the statement text.
    pub async fn execute_statement(&mut self, sql: &str) -> Result<u64> {
        if self.cancel.is_cancelled() {
            return Err(InterpretError::Cancelled);
        }
        debug!("Executing: {}", sql);
        self.executor.execute(sql).await.map_err(|e| match e {
            InterpretError::Execution { .. } | InterpretError::Cancelled => e,
            other => InterpretError::execution(sql, other),
        })
    }

    /// Execute every statement of a script in order.
    ///
    /// With `skip_script_error` failures are logged and counted; otherwise
    /// the first failure aborts with the rejected statement.
    pub async fn execute_script(&mut self, script: &ScriptBuilder) -> Result<ExecutionSummary> {
        let statements = script.statements();
        info!("Executing {} statements", statements.len());

        let mut summary = ExecutionSummary {
            completed: true,
            ..Default::default()
        };
        for statement in &statements {
            if self.cancel.is_cancelled() {
                warn!("Script execution cancelled after {} statements", summary.executed);
                summary.completed = false;
                break;
            }
            match self.execute_statement(&statement.sql).await {
                Ok(_) => summary.executed += 1,
                Err(e @ InterpretError::Execution { .. }) if self.options.skip_script_error => {
                    warn!("Statement for {} failed: {}", statement.object_name, e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// INSERT-statement bulk sink over this connection.
    pub fn bulk_sink(&mut self) -> InsertStatementSink<'_, E> {
        InsertStatementSink::new(&mut self.executor, &self.dialect)
            .with_bytes_as_null(self.options.treat_bytes_as_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::{make_test_column, make_test_fk, make_test_table};
    use crate::core::schema::{TableTrigger, View};
    use crate::core::testing::MockExecutor;
    use crate::interpreter::tests::{interpreter_for, mysql_interpreter};
    use crate::script::ScriptKind;

    #[tokio::test]
    async fn test_set_constraints_per_dialect() {
        let mut mysql = mysql_interpreter(MockExecutor::new());
        mysql.set_constraints_enabled(false).await.unwrap();
        assert_eq!(mysql.into_executor().executed, vec!["SET FOREIGN_KEY_CHECKS = 0"]);

        let pg = interpreter_for("postgres", MockExecutor::new());
        assert_eq!(
            pg.set_constraints_enabled_sql(false),
            "SET session_replication_role = replica"
        );
        assert_eq!(pg.set_constraints_enabled_sql(true), "SET session_replication_role = origin");

        let mssql = interpreter_for("mssql", MockExecutor::new());
        assert!(mssql.set_constraints_enabled_sql(false).contains("NOCHECK CONSTRAINT ALL"));
    }

    #[test]
    fn test_set_identity_sql() {
        let table = make_test_table("orders");
        let mut id = make_test_column("orders", "id", "int", 1);
        id.is_nullable = false;
        id.is_identity = true;

        let mysql = mysql_interpreter(MockExecutor::new());
        assert_eq!(
            mysql.set_identity_enabled_sql(&table, &id, true),
            "ALTER TABLE `orders` MODIFY COLUMN `id` int NOT NULL AUTO_INCREMENT"
        );
        assert_eq!(
            mysql.set_identity_enabled_sql(&table, &id, false),
            "ALTER TABLE `orders` MODIFY COLUMN `id` int NOT NULL"
        );

        let mssql = interpreter_for("mssql", MockExecutor::new());
        assert_eq!(
            mssql.set_identity_enabled_sql(&table, &id, false),
            "SET IDENTITY_INSERT [shop].[orders] ON"
        );
    }

    #[tokio::test]
    async fn test_drop_dispatches_by_kind() {
        let mysql = mysql_interpreter(MockExecutor::new());
        let fk = make_test_fk("orders", "fk_customer", "customer_id", 1);
        assert_eq!(
            mysql.drop_sql(&DbObject::TableForeignKey(fk)),
            "ALTER TABLE `orders` DROP FOREIGN KEY `fk_customer`"
        );
        let view = View {
            owner: "shop".to_string(),
            name: "v_orders".to_string(),
            definition: None,
        };
        assert_eq!(mysql.drop_sql(&DbObject::View(view)), "DROP VIEW IF EXISTS `v_orders`");

        let mut pg = interpreter_for("postgres", MockExecutor::new());
        let trigger = TableTrigger {
            owner: "public".to_string(),
            table_name: "orders".to_string(),
            name: "trg_audit".to_string(),
            definition: None,
        };
        pg.drop(&DbObject::TableTrigger(trigger)).await.unwrap();
        assert_eq!(
            pg.into_executor().executed,
            vec!["DROP TRIGGER IF EXISTS \"trg_audit\" ON \"public\".\"orders\""]
        );
    }

    fn two_statements() -> ScriptBuilder {
        let mut builder = ScriptBuilder::new();
        builder.append_statement(ScriptKind::Table, "a", "CREATE TABLE a(id int)");
        builder.append_statement(ScriptKind::Table, "b", "CREATE TABLE b(id int)");
        builder
    }

    #[tokio::test]
    async fn test_execute_script_aborts_with_statement() {
        let exec = MockExecutor::new().fail_on("TABLE a");
        let mut interp = mysql_interpreter(exec);
        let err = interp.execute_script(&two_statements()).await.unwrap_err();
        match err {
            InterpretError::Execution { statement, .. } => assert_eq!(statement, "CREATE TABLE a(id int)"),
            other => panic!("unexpected error: {}", other),
        }
        assert!(interp.into_executor().executed.is_empty());
    }

    #[tokio::test]
    async fn test_execute_script_skips_errors() {
        let exec = MockExecutor::new().fail_on("TABLE a");
        let mut interp = mysql_interpreter(exec);
        interp.options_mut().skip_script_error = true;
        let summary = interp.execute_script(&two_statements()).await.unwrap();
        assert_eq!(summary.executed, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.completed);
        assert_eq!(interp.into_executor().executed, vec!["CREATE TABLE b(id int)"]);
    }
}
