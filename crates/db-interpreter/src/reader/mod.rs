//! Schema reader: runs dialect catalog queries and maps the rows into the
//! schema model.
//!
//! Every dialect aliases its catalog columns to the same names (see
//! [`Dialect`]), so one mapper per object kind serves all engines. Kinds an
//! engine does not have come back empty.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::schema::{
    Database, DatabaseObjectKind, Function, Procedure, SchemaInfo, Table, TableColumn,
    TableForeignKey, TableIndex, TablePrimaryKey, TableTrigger, UserDefinedType, View,
};
use crate::core::traits::{CatalogFilter, Dialect, ObjectFetchMode, QueryExecutor};
use crate::core::value::Row;
use crate::error::{InterpretError, Result};

/// Which objects [`SchemaReader::get_schema_info`] fetches.
///
/// Empty name lists mean "all objects of that kind". Column, key, index and
/// trigger reads are restricted by `table_names`.
#[derive(Debug, Clone, Default)]
pub struct SchemaInfoFilter {
    /// Kinds to read; empty reads every kind.
    pub kinds: Vec<DatabaseObjectKind>,
    pub table_names: Vec<String>,
    pub view_names: Vec<String>,
    pub function_names: Vec<String>,
    pub procedure_names: Vec<String>,
    pub user_defined_type_names: Vec<String>,
}

impl SchemaInfoFilter {
    /// Restrict to the given tables (and their table-scoped objects).
    pub fn tables(names: Vec<String>) -> Self {
        Self {
            table_names: names,
            ..Default::default()
        }
    }

    fn includes(&self, kind: DatabaseObjectKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Reads catalog metadata of one owner (schema, or database on MySQL).
pub struct SchemaReader<'a, E: QueryExecutor + ?Sized> {
    executor: &'a mut E,
    dialect: &'a dyn Dialect,
    owner: String,
    mode: ObjectFetchMode,
    cancel: CancellationToken,
}

impl<'a, E: QueryExecutor + ?Sized> SchemaReader<'a, E> {
    pub fn new(executor: &'a mut E, dialect: &'a dyn Dialect, owner: impl Into<String>) -> Self {
        Self {
            executor,
            dialect,
            owner: owner.into(),
            mode: ObjectFetchMode::Details,
            cancel: CancellationToken::new(),
        }
    }

    /// Set how much of each object is fetched.
    pub fn with_mode(mut self, mode: ObjectFetchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// List databases, hiding the engine's system databases unless
    /// `include_builtin` is set.
    pub async fn get_databases(&mut self, include_builtin: bool) -> Result<Vec<Database>> {
        let sql = self.dialect.databases_sql();
        let rows = self.run(&sql).await?;
        let builtin = self.dialect.builtin_databases();

        rows.iter()
            .map(|row| required(row, "Name").map(|name| Database { name }))
            .filter(|db| match db {
                Ok(db) => include_builtin || !builtin.iter().any(|b| b.eq_ignore_ascii_case(&db.name)),
                Err(_) => true,
            })
            .collect()
    }

    pub async fn get_tables(&mut self, names: &[String]) -> Result<Vec<Table>> {
        let rows = self.fetch(DatabaseObjectKind::Table, names).await?;
        rows.iter()
            .map(|row| {
                Ok(Table {
                    owner: self.owner_of(row),
                    name: required(row, "Name")?,
                    comment: optional(row, "Comment"),
                    identity_seed: row.get_i64("IdentitySeed"),
                    identity_increment: row.get_i64("IdentityIncrement"),
                })
            })
            .collect()
    }

    /// Columns of the named tables, ordered by table then `order`.
    pub async fn get_table_columns(&mut self, table_names: &[String]) -> Result<Vec<TableColumn>> {
        let rows = self.fetch(DatabaseObjectKind::TableColumn, table_names).await?;
        rows.iter()
            .map(|row| {
                Ok(TableColumn {
                    owner: self.owner_of(row),
                    table_name: required(row, "TableName")?,
                    name: required(row, "Name")?,
                    data_type: required(row, "DataType")?,
                    max_length: row.get_i64("MaxLength"),
                    precision: row.get_i32("Precision"),
                    scale: row.get_i32("Scale"),
                    is_nullable: row.get_bool("IsNullable"),
                    order: row.get_i32("Order").unwrap_or(0),
                    default_value: optional(row, "DefaultValue"),
                    comment: optional(row, "Comment"),
                    is_identity: row.get_bool("IsIdentity"),
                })
            })
            .collect()
    }

    pub async fn get_primary_keys(&mut self, table_names: &[String]) -> Result<Vec<TablePrimaryKey>> {
        let rows = self.fetch(DatabaseObjectKind::TablePrimaryKey, table_names).await?;
        rows.iter()
            .map(|row| {
                Ok(TablePrimaryKey {
                    owner: self.owner_of(row),
                    table_name: required(row, "TableName")?,
                    name: required(row, "Name")?,
                    column_name: required(row, "ColumnName")?,
                    order: row.get_i32("Order").unwrap_or(0),
                })
            })
            .collect()
    }

    pub async fn get_foreign_keys(&mut self, table_names: &[String]) -> Result<Vec<TableForeignKey>> {
        let rows = self.fetch(DatabaseObjectKind::TableForeignKey, table_names).await?;
        rows.iter()
            .map(|row| {
                Ok(TableForeignKey {
                    owner: self.owner_of(row),
                    table_name: required(row, "TableName")?,
                    name: required(row, "Name")?,
                    column_name: required(row, "ColumnName")?,
                    order: row.get_i32("Order").unwrap_or(0),
                    referenced_owner: optional(row, "ReferencedOwner").unwrap_or_else(|| self.owner.clone()),
                    referenced_table_name: required(row, "ReferencedTableName")?,
                    referenced_column_name: required(row, "ReferencedColumnName")?,
                    update_cascade: row.get_bool("UpdateCascade"),
                    delete_cascade: row.get_bool("DeleteCascade"),
                })
            })
            .collect()
    }

    /// Index key parts. Indexes with an expression key part (no column
    /// name in the catalog) are left out whole: their column list alone
    /// would describe a different index.
    pub async fn get_indexes(&mut self, table_names: &[String]) -> Result<Vec<TableIndex>> {
        let rows = self.fetch(DatabaseObjectKind::TableIndex, table_names).await?;
        let mut indexes = Vec::with_capacity(rows.len());
        let mut expression_indexes: HashSet<(String, String)> = HashSet::new();
        for row in &rows {
            let table_name = required(row, "TableName")?;
            let name = required(row, "Name")?;
            let Some(column_name) = optional(row, "ColumnName") else {
                if expression_indexes.insert((table_name.clone(), name.clone())) {
                    warn!("Skipping index {} on {}: expression key parts are not scripted", name, table_name);
                }
                continue;
            };
            indexes.push(TableIndex {
                owner: self.owner_of(row),
                table_name,
                name,
                column_name,
                order: row.get_i32("Order").unwrap_or(0),
                is_unique: row.get_bool("IsUnique"),
                is_desc: row.get_bool("IsDesc"),
            });
        }
        indexes.retain(|i| !expression_indexes.contains(&(i.table_name.clone(), i.name.clone())));
        Ok(indexes)
    }

    /// Triggers defined on the named tables.
    pub async fn get_triggers(&mut self, table_names: &[String]) -> Result<Vec<TableTrigger>> {
        let rows = self.fetch(DatabaseObjectKind::TableTrigger, table_names).await?;
        rows.iter()
            .map(|row| {
                Ok(TableTrigger {
                    owner: self.owner_of(row),
                    table_name: required(row, "TableName")?,
                    name: required(row, "Name")?,
                    definition: optional(row, "Definition"),
                })
            })
            .collect()
    }

    pub async fn get_views(&mut self, names: &[String]) -> Result<Vec<View>> {
        let rows = self.fetch(DatabaseObjectKind::View, names).await?;
        rows.iter()
            .map(|row| {
                Ok(View {
                    owner: self.owner_of(row),
                    name: required(row, "Name")?,
                    definition: optional(row, "Definition"),
                })
            })
            .collect()
    }

    pub async fn get_procedures(&mut self, names: &[String]) -> Result<Vec<Procedure>> {
        let rows = self.fetch(DatabaseObjectKind::Procedure, names).await?;
        rows.iter()
            .map(|row| {
                Ok(Procedure {
                    owner: self.owner_of(row),
                    name: required(row, "Name")?,
                    definition: optional(row, "Definition"),
                })
            })
            .collect()
    }

    pub async fn get_functions(&mut self, names: &[String]) -> Result<Vec<Function>> {
        let rows = self.fetch(DatabaseObjectKind::Function, names).await?;
        rows.iter()
            .map(|row| {
                Ok(Function {
                    owner: self.owner_of(row),
                    name: required(row, "Name")?,
                    definition: optional(row, "Definition"),
                })
            })
            .collect()
    }

    pub async fn get_user_defined_types(&mut self, names: &[String]) -> Result<Vec<UserDefinedType>> {
        let rows = self.fetch(DatabaseObjectKind::UserDefinedType, names).await?;
        rows.iter()
            .map(|row| {
                Ok(UserDefinedType {
                    owner: self.owner_of(row),
                    name: required(row, "Name")?,
                    data_type: required(row, "DataType")?,
                    max_length: row.get_i64("MaxLength"),
                    precision: row.get_i32("Precision"),
                    scale: row.get_i32("Scale"),
                    is_nullable: row.get_bool("IsNullable"),
                })
            })
            .collect()
    }

    /// Read every requested kind into one snapshot.
    pub async fn get_schema_info(&mut self, filter: &SchemaInfoFilter) -> Result<SchemaInfo> {
        info!(
            "Reading {} schema '{}' ({:?} mode)",
            self.dialect.name(),
            self.owner,
            self.mode
        );

        let tables = &filter.table_names;
        let mut schema = SchemaInfo::default();

        if filter.includes(DatabaseObjectKind::UserDefinedType) {
            schema.user_defined_types = self.get_user_defined_types(&filter.user_defined_type_names).await?;
        }
        if filter.includes(DatabaseObjectKind::Function) {
            schema.functions = self.get_functions(&filter.function_names).await?;
        }
        if filter.includes(DatabaseObjectKind::Table) {
            schema.tables = self.get_tables(tables).await?;
        }
        if filter.includes(DatabaseObjectKind::TableColumn) {
            schema.table_columns = self.get_table_columns(tables).await?;
        }
        if filter.includes(DatabaseObjectKind::TablePrimaryKey) {
            schema.table_primary_keys = self.get_primary_keys(tables).await?;
        }
        if filter.includes(DatabaseObjectKind::TableForeignKey) {
            schema.table_foreign_keys = self.get_foreign_keys(tables).await?;
        }
        if filter.includes(DatabaseObjectKind::TableIndex) {
            schema.table_indexes = self.get_indexes(tables).await?;
        }
        if filter.includes(DatabaseObjectKind::TableTrigger) {
            schema.table_triggers = self.get_triggers(tables).await?;
        }
        if filter.includes(DatabaseObjectKind::View) {
            schema.views = self.get_views(&filter.view_names).await?;
        }
        if filter.includes(DatabaseObjectKind::Procedure) {
            schema.procedures = self.get_procedures(&filter.procedure_names).await?;
        }

        info!(
            "Read {} tables, {} columns, {} views, {} routines",
            schema.tables.len(),
            schema.table_columns.len(),
            schema.views.len(),
            schema.functions.len() + schema.procedures.len()
        );
        Ok(schema)
    }

    async fn fetch(&mut self, kind: DatabaseObjectKind, names: &[String]) -> Result<Vec<Row>> {
        let filter = CatalogFilter {
            owner: &self.owner,
            names,
            mode: self.mode,
        };
        let Some(sql) = self.dialect.catalog_sql(kind, &filter) else {
            debug!("{} has no {} objects", self.dialect.name(), kind);
            return Ok(Vec::new());
        };
        self.run(&sql).await
    }

    async fn run(&mut self, sql: &str) -> Result<Vec<Row>> {
        if self.cancel.is_cancelled() {
            return Err(InterpretError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(InterpretError::Cancelled),
            rows = self.executor.query(sql) => rows,
        }
    }

    /// Catalog owner, falling back to the reader's owner for engines that
    /// report none.
    fn owner_of(&self, row: &Row) -> String {
        optional(row, "Owner").unwrap_or_else(|| self.owner.clone())
    }
}

fn required(row: &Row, column: &str) -> Result<String> {
    row.get_str(column)
        .ok_or_else(|| InterpretError::Catalog(format!("catalog row is missing '{}'", column)))
}

fn optional(row: &Row, column: &str) -> Option<String> {
    row.get_str(column)
}
