//! Microsoft SQL Server SQL dialect (Strategy pattern).
//!
//! Catalog queries read the `sys.*` views. Scripts separate statements with
//! `GO` because `CREATE VIEW`/`PROCEDURE`/`FUNCTION`/`TRIGGER` must start a
//! batch; comments are stored as `MS_Description` extended properties.

use crate::core::datatype::TypeRules;
use crate::core::identifier::{escape_literal, QuoteChars, BRACKETS};
use crate::core::pagination::PaginationStyle;
use crate::core::schema::{DatabaseObjectKind, DbObject, Table, TableColumn, UserDefinedType};
use crate::core::traits::{CatalogFilter, Dialect};
use crate::drivers::common::and_in;
use crate::script::StatementTerminator;

const BUILTIN_DATABASES: &[&str] = &["master", "model", "msdb", "tempdb"];

const TYPE_RULES: TypeRules = TypeRules {
    no_length_types: &[
        "date", "time", "int", "text", "ntext", "image", "bit", "money", "real", "float", "xml",
        "uniqueidentifier", "sql_variant", "hierarchyid", "geography", "geometry", "sysname",
    ],
    max_length_keyword: Some("max"),
};

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect {
    /// Page with `ROW_NUMBER()` instead of `OFFSET ... FETCH` (pre-2012).
    legacy_pagination: bool,
}

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy_pagination(legacy_pagination: bool) -> Self {
        Self { legacy_pagination }
    }

    fn tables_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let details = if filter.is_details() {
            r#",
    CAST(ep.value AS NVARCHAR(4000)) AS [Comment],
    CAST(ISNULL(IDENT_SEED(QUOTENAME(s.name) + '.' + QUOTENAME(t.name)), 1) AS BIGINT) AS [IdentitySeed],
    CAST(ISNULL(IDENT_INCR(QUOTENAME(s.name) + '.' + QUOTENAME(t.name)), 1) AS BIGINT) AS [IdentityIncrement]"#
        } else {
            ""
        };
        let comment_join = if filter.is_details() {
            "\nLEFT JOIN sys.extended_properties ep ON ep.major_id = t.object_id AND ep.minor_id = 0 AND ep.class = 1 AND ep.name = 'MS_Description'"
        } else {
            ""
        };
        format!(
            r#"SELECT s.name AS [Owner], t.name AS [Name]{}
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id{}
WHERE t.is_ms_shipped = 0 AND s.name = '{}'{}
ORDER BY t.name"#,
            details,
            comment_join,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }

    /// `max_length` is in bytes; Unicode types halve it. `-1` marks `max`.
    fn columns_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT s.name AS [Owner], t.name AS [TableName], c.name AS [Name],
    CASE WHEN ty.is_user_defined = 1 THEN ty.name ELSE TYPE_NAME(c.system_type_id) END AS [DataType],
    CAST(CASE WHEN c.max_length = -1 THEN -1
              WHEN TYPE_NAME(c.system_type_id) IN ('nchar', 'nvarchar') THEN c.max_length / 2
              ELSE c.max_length END AS BIGINT) AS [MaxLength],
    CAST(c.precision AS INT) AS [Precision], CAST(c.scale AS INT) AS [Scale],
    CAST(c.is_nullable AS INT) AS [IsNullable], c.column_id AS [Order],
    dc.definition AS [DefaultValue], CAST(ep.value AS NVARCHAR(4000)) AS [Comment],
    CAST(c.is_identity AS INT) AS [IsIdentity]
FROM sys.columns c
JOIN sys.tables t ON t.object_id = c.object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.types ty ON ty.user_type_id = c.user_type_id
LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id
LEFT JOIN sys.extended_properties ep ON ep.major_id = c.object_id AND ep.minor_id = c.column_id
    AND ep.class = 1 AND ep.name = 'MS_Description'
WHERE t.is_ms_shipped = 0 AND s.name = '{}'{}
ORDER BY t.name, c.column_id"#,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }

    fn primary_keys_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT s.name AS [Owner], t.name AS [TableName], kc.name AS [Name],
    c.name AS [ColumnName], CAST(ic.key_ordinal AS INT) AS [Order]
FROM sys.key_constraints kc
JOIN sys.tables t ON t.object_id = kc.parent_object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.index_columns ic ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE kc.type = 'PK' AND s.name = '{}'{}
ORDER BY t.name, kc.name, ic.key_ordinal"#,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }

    fn foreign_keys_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT s.name AS [Owner], t.name AS [TableName], fk.name AS [Name],
    c.name AS [ColumnName], fkc.constraint_column_id AS [Order],
    rs.name AS [ReferencedOwner], rt.name AS [ReferencedTableName], rc.name AS [ReferencedColumnName],
    CASE WHEN fk.update_referential_action = 1 THEN 1 ELSE 0 END AS [UpdateCascade],
    CASE WHEN fk.delete_referential_action = 1 THEN 1 ELSE 0 END AS [DeleteCascade]
FROM sys.foreign_keys fk
JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
JOIN sys.tables t ON t.object_id = fk.parent_object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.columns c ON c.object_id = fkc.parent_object_id AND c.column_id = fkc.parent_column_id
JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
JOIN sys.schemas rs ON rs.schema_id = rt.schema_id
JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
WHERE s.name = '{}'{}
ORDER BY t.name, fk.name, fkc.constraint_column_id"#,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }

    fn indexes_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT s.name AS [Owner], t.name AS [TableName], i.name AS [Name],
    c.name AS [ColumnName], CAST(ic.key_ordinal AS INT) AS [Order],
    CAST(i.is_unique AS INT) AS [IsUnique], CAST(ic.is_descending_key AS INT) AS [IsDesc]
FROM sys.indexes i
JOIN sys.tables t ON t.object_id = i.object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE i.is_primary_key = 0 AND i.type > 0 AND ic.is_included_column = 0 AND s.name = '{}'{}
ORDER BY t.name, i.name, ic.key_ordinal"#,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }

    fn triggers_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            ", OBJECT_DEFINITION(tr.object_id) AS [Definition]"
        } else {
            ""
        };
        format!(
            r#"SELECT s.name AS [Owner], tr.name AS [Name], t.name AS [TableName]{}
FROM sys.triggers tr
JOIN sys.tables t ON t.object_id = tr.parent_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
WHERE tr.is_ms_shipped = 0 AND s.name = '{}'{}
ORDER BY tr.name"#,
            definition,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }

    /// Views, functions and procedures share `sys.objects`; `types` is the
    /// quoted list of object type codes.
    fn module_sql(&self, types: &str, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            ", OBJECT_DEFINITION(o.object_id) AS [Definition]"
        } else {
            ""
        };
        format!(
            r#"SELECT s.name AS [Owner], o.name AS [Name]{}
FROM sys.objects o
JOIN sys.schemas s ON s.schema_id = o.schema_id
WHERE o.type IN ({}) AND o.is_ms_shipped = 0 AND s.name = '{}'{}
ORDER BY o.name"#,
            definition,
            types,
            escape_literal(filter.owner),
            and_in("o.name", filter.names)
        )
    }

    fn user_defined_types_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT s.name AS [Owner], t.name AS [Name], TYPE_NAME(t.system_type_id) AS [DataType],
    CAST(CASE WHEN t.max_length = -1 THEN -1
              WHEN TYPE_NAME(t.system_type_id) IN ('nchar', 'nvarchar') THEN t.max_length / 2
              ELSE t.max_length END AS BIGINT) AS [MaxLength],
    CAST(t.precision AS INT) AS [Precision], CAST(t.scale AS INT) AS [Scale],
    CAST(t.is_nullable AS INT) AS [IsNullable]
FROM sys.types t
JOIN sys.schemas s ON s.schema_id = t.schema_id
WHERE t.is_user_defined = 1 AND t.is_table_type = 0 AND s.name = '{}'{}
ORDER BY t.name"#,
            escape_literal(filter.owner),
            and_in("t.name", filter.names)
        )
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_chars(&self) -> QuoteChars {
        BRACKETS
    }

    fn max_identifier_length(&self) -> usize {
        128
    }

    /// 900-byte index key limit over 2-byte characters.
    fn key_column_max_length(&self) -> i64 {
        450
    }

    fn terminator(&self) -> StatementTerminator {
        StatementTerminator::BatchSeparator
    }

    fn type_rules(&self) -> &TypeRules {
        &TYPE_RULES
    }

    fn pagination_style(&self) -> PaginationStyle {
        if self.legacy_pagination {
            PaginationStyle::RowNumber
        } else {
            PaginationStyle::OffsetFetch
        }
    }

    fn builtin_databases(&self) -> &[&str] {
        BUILTIN_DATABASES
    }

    fn default_owner(&self) -> &str {
        "dbo"
    }

    fn databases_sql(&self) -> String {
        "SELECT name AS [Name] FROM sys.databases ORDER BY name".to_string()
    }

    fn catalog_sql(&self, kind: DatabaseObjectKind, filter: &CatalogFilter<'_>) -> Option<String> {
        match kind {
            DatabaseObjectKind::Table => Some(self.tables_sql(filter)),
            DatabaseObjectKind::TableColumn => Some(self.columns_sql(filter)),
            DatabaseObjectKind::TablePrimaryKey => Some(self.primary_keys_sql(filter)),
            DatabaseObjectKind::TableForeignKey => Some(self.foreign_keys_sql(filter)),
            DatabaseObjectKind::TableIndex => Some(self.indexes_sql(filter)),
            DatabaseObjectKind::TableTrigger => Some(self.triggers_sql(filter)),
            DatabaseObjectKind::View => Some(self.module_sql("'V'", filter)),
            DatabaseObjectKind::Function => Some(self.module_sql("'FN', 'IF', 'TF'", filter)),
            DatabaseObjectKind::Procedure => Some(self.module_sql("'P'", filter)),
            DatabaseObjectKind::UserDefinedType => Some(self.user_defined_types_sql(filter)),
            DatabaseObjectKind::Database => None,
        }
    }

    fn identity_clause(&self, table: &Table) -> String {
        format!(
            "IDENTITY({},{})",
            table.identity_seed.unwrap_or(1),
            table.identity_increment.unwrap_or(1)
        )
    }

    fn comment_statements(&self, table: &Table, _table_ref: &str, columns: &[&TableColumn]) -> Vec<String> {
        let owner = escape_literal(&table.owner);
        let name = escape_literal(&table.name);
        let mut statements = Vec::new();
        if let Some(comment) = table.comment.as_deref().filter(|c| !c.is_empty()) {
            statements.push(format!(
                "EXECUTE sp_addextendedproperty N'MS_Description', N'{}', N'SCHEMA', N'{}', N'TABLE', N'{}'",
                escape_literal(comment),
                owner,
                name
            ));
        }
        for column in columns {
            if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
                statements.push(format!(
                    "EXECUTE sp_addextendedproperty N'MS_Description', N'{}', N'SCHEMA', N'{}', N'TABLE', N'{}', N'COLUMN', N'{}'",
                    escape_literal(comment),
                    owner,
                    name,
                    escape_literal(&column.name)
                ));
            }
        }
        statements
    }

    fn user_defined_type_statement(&self, udt: &UserDefinedType, data_type: &str) -> Option<String> {
        Some(format!(
            "CREATE TYPE {} FROM {}{}",
            self.qualify(&udt.owner, &udt.name),
            data_type,
            if udt.is_nullable { "" } else { " NOT NULL" }
        ))
    }

    /// `CREATE VIEW` and friends cannot sit inside `IF`, so the definition
    /// runs through dynamic SQL when the object does not exist yet.
    fn create_table_header(&self, owner: &str, name: &str, table_ref: &str, guard: bool) -> String {
        if guard {
            format!(
                "IF OBJECT_ID(N'{}', N'U') IS NULL\nCREATE TABLE {}(",
                escape_literal(&self.qualify(owner, name)),
                table_ref
            )
        } else {
            format!("CREATE TABLE {}(", table_ref)
        }
    }

    fn guard_definition(&self, _kind: DatabaseObjectKind, owner: &str, name: &str, definition: &str) -> String {
        format!(
            "IF OBJECT_ID(N'{}') IS NULL\n    EXEC(N'{}')",
            escape_literal(&self.qualify(owner, name)),
            escape_literal(definition)
        )
    }

    fn set_constraints_sql(&self, enabled: bool) -> String {
        if enabled {
            "EXEC sp_MSforeachtable 'ALTER TABLE ? WITH CHECK CHECK CONSTRAINT ALL'".to_string()
        } else {
            "EXEC sp_MSforeachtable 'ALTER TABLE ? NOCHECK CONSTRAINT ALL'".to_string()
        }
    }

    /// The identity property itself cannot be altered; explicit values are
    /// allowed by turning `IDENTITY_INSERT` on, so "disabled" maps to ON.
    fn set_identity_sql(
        &self,
        table_ref: &str,
        _table: &Table,
        _column: &TableColumn,
        _column_def: &str,
        enabled: bool,
    ) -> String {
        format!(
            "SET IDENTITY_INSERT {} {}",
            table_ref,
            if enabled { "OFF" } else { "ON" }
        )
    }

    fn identity_insert_sql(&self, table_ref: &str, allow: bool) -> Option<String> {
        Some(format!(
            "SET IDENTITY_INSERT {} {}",
            table_ref,
            if allow { "ON" } else { "OFF" }
        ))
    }

    fn drop_sql(&self, object: &DbObject) -> String {
        match object {
            DbObject::TablePrimaryKey(pk) => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.qualify(&pk.owner, &pk.table_name),
                self.quote_ident(&pk.name)
            ),
            DbObject::TableForeignKey(fk) => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.qualify(&fk.owner, &fk.table_name),
                self.quote_ident(&fk.name)
            ),
            DbObject::TableColumn(col) => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.qualify(&col.owner, &col.table_name),
                self.quote_ident(&col.name)
            ),
            DbObject::TableIndex(ix) => format!(
                "DROP INDEX {} ON {}",
                self.quote_ident(&ix.name),
                self.qualify(&ix.owner, &ix.table_name)
            ),
            other => format!(
                "DROP {} IF EXISTS {}",
                other.kind().keyword(),
                self.qualify(other.owner(), other.name())
            ),
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode_upper(bytes))
    }

    fn string_literal(&self, text: &str) -> String {
        format!("N'{}'", escape_literal(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::{make_test_column, make_test_table};
    use crate::core::schema::{TableIndex, View};
    use crate::core::traits::ObjectFetchMode;
    use crate::core::value::SqlValue;

    fn filter<'a>(names: &'a [String], mode: ObjectFetchMode) -> CatalogFilter<'a> {
        CatalogFilter {
            owner: "dbo",
            names,
            mode,
        }
    }

    #[test]
    fn test_quote_ident() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "[name]");
        assert_eq!(dialect.quote_ident("table]name"), "[table]]name]");
        assert_eq!(dialect.qualify("dbo", "Users"), "[dbo].[Users]");
    }

    #[test]
    fn test_limits_and_terminator() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.max_identifier_length(), 128);
        assert_eq!(dialect.key_column_max_length(), 450);
        assert_eq!(dialect.terminator(), StatementTerminator::BatchSeparator);
        assert_eq!(dialect.default_owner(), "dbo");
    }

    #[test]
    fn test_pagination_style() {
        assert_eq!(MssqlDialect::new().pagination_style(), PaginationStyle::OffsetFetch);
        assert_eq!(
            MssqlDialect::with_legacy_pagination(true).pagination_style(),
            PaginationStyle::RowNumber
        );
    }

    #[test]
    fn test_columns_sql_halves_unicode_lengths() {
        let dialect = MssqlDialect::new();
        let names = vec!["Orders".to_string()];
        let sql = dialect
            .catalog_sql(DatabaseObjectKind::TableColumn, &filter(&names, ObjectFetchMode::Details))
            .unwrap();
        assert!(sql.contains("c.max_length / 2"));
        assert!(sql.contains("t.name IN ('Orders')"));
        assert!(sql.contains("ORDER BY t.name, c.column_id"));
    }

    #[test]
    fn test_simple_mode_omits_definitions() {
        let dialect = MssqlDialect::new();
        let simple = dialect
            .catalog_sql(DatabaseObjectKind::Procedure, &filter(&[], ObjectFetchMode::Simple))
            .unwrap();
        assert!(!simple.contains("OBJECT_DEFINITION"));
        let full = dialect
            .catalog_sql(DatabaseObjectKind::Function, &filter(&[], ObjectFetchMode::Details))
            .unwrap();
        assert!(full.contains("OBJECT_DEFINITION"));
        assert!(full.contains("'FN', 'IF', 'TF'"));
    }

    #[test]
    fn test_identity_clause() {
        let dialect = MssqlDialect::new();
        let mut table = make_test_table("Orders");
        assert_eq!(dialect.identity_clause(&table), "IDENTITY(1,1)");
        table.identity_seed = Some(1000);
        table.identity_increment = Some(5);
        assert_eq!(dialect.identity_clause(&table), "IDENTITY(1000,5)");
    }

    #[test]
    fn test_comment_statements() {
        let dialect = MssqlDialect::new();
        let mut table = make_test_table("Orders");
        table.comment = Some("order header".into());
        let mut code = make_test_column("Orders", "Code", "nvarchar", 1);
        code.comment = Some("code".into());

        let statements = dialect.comment_statements(&table, "[shop].[Orders]", &[&code]);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].ends_with("N'SCHEMA', N'shop', N'TABLE', N'Orders'"));
        assert!(statements[1].ends_with("N'COLUMN', N'Code'"));
    }

    #[test]
    fn test_guard_definition_escapes_quotes() {
        let dialect = MssqlDialect::new();
        let guarded = dialect.guard_definition(
            DatabaseObjectKind::View,
            "dbo",
            "v_open",
            "CREATE VIEW v_open AS SELECT * FROM Orders WHERE Status = 'open'",
        );
        assert_eq!(
            guarded,
            "IF OBJECT_ID(N'[dbo].[v_open]') IS NULL\n    EXEC(N'CREATE VIEW v_open AS SELECT * FROM Orders WHERE Status = ''open''')"
        );
    }

    #[test]
    fn test_identity_toggles() {
        let dialect = MssqlDialect::new();
        let table = make_test_table("Orders");
        let column = make_test_column("Orders", "Id", "int", 1);
        assert_eq!(
            dialect.set_identity_sql("[shop].[Orders]", &table, &column, "", false),
            "SET IDENTITY_INSERT [shop].[Orders] ON"
        );
        assert_eq!(
            dialect.identity_insert_sql("[shop].[Orders]", false).as_deref(),
            Some("SET IDENTITY_INSERT [shop].[Orders] OFF")
        );
    }

    #[test]
    fn test_drop_sql() {
        let dialect = MssqlDialect::new();
        let index = TableIndex {
            owner: "dbo".into(),
            table_name: "Orders".into(),
            name: "IX_Code".into(),
            ..Default::default()
        };
        assert_eq!(
            dialect.drop_sql(&DbObject::TableIndex(index)),
            "DROP INDEX [IX_Code] ON [dbo].[Orders]"
        );
        let view = View {
            owner: "dbo".into(),
            name: "v_open".into(),
            definition: None,
        };
        assert_eq!(
            dialect.drop_sql(&DbObject::View(view)),
            "DROP VIEW IF EXISTS [dbo].[v_open]"
        );
    }

    #[test]
    fn test_literals() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.literal(&SqlValue::Text("O'Brien".into())), "N'O''Brien'");
        assert_eq!(dialect.literal(&SqlValue::Bytes(vec![0xca, 0xfe])), "0xCAFE");
        assert_eq!(dialect.literal(&SqlValue::Bool(false)), "0");
    }

    #[test]
    fn test_alias_type_statement() {
        let dialect = MssqlDialect::new();
        let udt = UserDefinedType {
            owner: "dbo".into(),
            name: "Phone".into(),
            data_type: "nvarchar".into(),
            is_nullable: true,
            ..Default::default()
        };
        assert_eq!(
            dialect.user_defined_type_statement(&udt, "nvarchar(20)").as_deref(),
            Some("CREATE TYPE [dbo].[Phone] FROM nvarchar(20)")
        );
    }
}
