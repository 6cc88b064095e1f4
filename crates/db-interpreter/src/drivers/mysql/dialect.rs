//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific catalog queries, identifier rules and DDL syntax.
//! Objects live in a database rather than a schema, so the owner is the
//! database name and generated scripts reference objects by bare name.

use crate::core::datatype::{base_type, is_char_type, TypeRules};
use crate::core::identifier::{escape_literal, QuoteChars, BACKTICKS};
use crate::core::pagination::PaginationStyle;
use crate::core::schema::{DatabaseObjectKind, DbObject, Table, TableColumn};
use crate::core::traits::{CatalogFilter, Dialect};
use crate::drivers::common::{and_in, create_or_replace, insert_if_not_exists};

const BUILTIN_DATABASES: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

const TYPE_RULES: TypeRules = TypeRules {
    no_length_types: &[
        "date", "time", "year", "int", "text", "blob", "json", "bool", "bit", "float", "double",
        "real", "enum", "set", "geometry", "point", "linestring", "polygon",
    ],
    max_length_keyword: None,
};

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    charset: Option<String>,
    collation: Option<String>,
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MysqlDialect {
    /// Create a dialect rendering columns without explicit charset clauses.
    pub fn new() -> Self {
        Self {
            charset: None,
            collation: None,
        }
    }

    /// Create a dialect appending `CHARACTER SET`/`COLLATE` to character
    /// columns and `DEFAULT CHARSET` to tables.
    pub fn with_charset(charset: Option<String>, collation: Option<String>) -> Self {
        Self {
            charset: charset.filter(|c| !c.is_empty()),
            collation: collation.filter(|c| !c.is_empty()),
        }
    }

    fn tables_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let details = if filter.is_details() {
            ", TABLE_COMMENT AS `Comment`, 1 AS `IdentitySeed`, 1 AS `IdentityIncrement`"
        } else {
            ""
        };
        format!(
            r#"SELECT TABLE_SCHEMA AS `Owner`, TABLE_NAME AS `Name`{}
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA = '{}'{}
ORDER BY TABLE_NAME"#,
            details,
            escape_literal(filter.owner),
            and_in("TABLE_NAME", filter.names)
        )
    }

    fn columns_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT C.TABLE_SCHEMA AS `Owner`, C.TABLE_NAME AS `TableName`, C.COLUMN_NAME AS `Name`,
    CAST(C.COLUMN_TYPE AS CHAR) AS `DataType`,
    CAST(CASE WHEN C.CHARACTER_MAXIMUM_LENGTH > 2147483647 THEN -1 ELSE C.CHARACTER_MAXIMUM_LENGTH END AS SIGNED) AS `MaxLength`,
    CAST(C.NUMERIC_PRECISION AS SIGNED) AS `Precision`, CAST(C.NUMERIC_SCALE AS SIGNED) AS `Scale`,
    IF(C.IS_NULLABLE = 'YES', 1, 0) AS `IsNullable`, CAST(C.ORDINAL_POSITION AS SIGNED) AS `Order`,
    C.COLUMN_DEFAULT AS `DefaultValue`, C.COLUMN_COMMENT AS `Comment`,
    IF(C.EXTRA LIKE '%auto_increment%', 1, 0) AS `IsIdentity`
FROM INFORMATION_SCHEMA.COLUMNS C
JOIN INFORMATION_SCHEMA.TABLES T ON T.TABLE_SCHEMA = C.TABLE_SCHEMA AND T.TABLE_NAME = C.TABLE_NAME
WHERE T.TABLE_TYPE = 'BASE TABLE' AND C.TABLE_SCHEMA = '{}'{}
ORDER BY C.TABLE_NAME, C.ORDINAL_POSITION"#,
            escape_literal(filter.owner),
            and_in("C.TABLE_NAME", filter.names)
        )
    }

    fn primary_keys_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT C.TABLE_SCHEMA AS `Owner`, C.TABLE_NAME AS `TableName`, C.CONSTRAINT_NAME AS `Name`,
    K.COLUMN_NAME AS `ColumnName`, CAST(K.ORDINAL_POSITION AS SIGNED) AS `Order`
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS C
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE K ON K.CONSTRAINT_SCHEMA = C.CONSTRAINT_SCHEMA
    AND K.TABLE_NAME = C.TABLE_NAME AND K.CONSTRAINT_NAME = C.CONSTRAINT_NAME
WHERE C.CONSTRAINT_TYPE = 'PRIMARY KEY' AND C.TABLE_SCHEMA = '{}'{}
ORDER BY C.TABLE_NAME, C.CONSTRAINT_NAME, K.ORDINAL_POSITION"#,
            escape_literal(filter.owner),
            and_in("C.TABLE_NAME", filter.names)
        )
    }

    fn foreign_keys_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT C.TABLE_SCHEMA AS `Owner`, C.TABLE_NAME AS `TableName`, C.CONSTRAINT_NAME AS `Name`,
    K.COLUMN_NAME AS `ColumnName`, CAST(K.ORDINAL_POSITION AS SIGNED) AS `Order`,
    K.REFERENCED_TABLE_SCHEMA AS `ReferencedOwner`, K.REFERENCED_TABLE_NAME AS `ReferencedTableName`,
    K.REFERENCED_COLUMN_NAME AS `ReferencedColumnName`,
    IF(R.UPDATE_RULE = 'CASCADE', 1, 0) AS `UpdateCascade`,
    IF(R.DELETE_RULE = 'CASCADE', 1, 0) AS `DeleteCascade`
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS C
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE K ON K.CONSTRAINT_SCHEMA = C.CONSTRAINT_SCHEMA
    AND K.TABLE_NAME = C.TABLE_NAME AND K.CONSTRAINT_NAME = C.CONSTRAINT_NAME
JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS R ON R.CONSTRAINT_SCHEMA = C.CONSTRAINT_SCHEMA
    AND R.TABLE_NAME = C.TABLE_NAME AND R.CONSTRAINT_NAME = C.CONSTRAINT_NAME
WHERE C.CONSTRAINT_TYPE = 'FOREIGN KEY' AND C.TABLE_SCHEMA = '{}'{}
ORDER BY C.TABLE_NAME, C.CONSTRAINT_NAME, K.ORDINAL_POSITION"#,
            escape_literal(filter.owner),
            and_in("C.TABLE_NAME", filter.names)
        )
    }

    fn indexes_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT TABLE_SCHEMA AS `Owner`, TABLE_NAME AS `TableName`, INDEX_NAME AS `Name`,
    COLUMN_NAME AS `ColumnName`, CAST(SEQ_IN_INDEX AS SIGNED) AS `Order`,
    IF(NON_UNIQUE = 0, 1, 0) AS `IsUnique`, IF(COLLATION = 'D', 1, 0) AS `IsDesc`
FROM INFORMATION_SCHEMA.STATISTICS
WHERE INDEX_NAME <> 'PRIMARY' AND TABLE_SCHEMA = '{}'{}
ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX"#,
            escape_literal(filter.owner),
            and_in("TABLE_NAME", filter.names)
        )
    }

    fn triggers_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            ",\n    CONCAT('CREATE TRIGGER `', TRIGGER_NAME, '` ', ACTION_TIMING, ' ', EVENT_MANIPULATION, \
             ' ON `', EVENT_OBJECT_TABLE, '` FOR EACH ', ACTION_ORIENTATION, ' ', ACTION_STATEMENT) AS `Definition`"
        } else {
            ""
        };
        format!(
            r#"SELECT TRIGGER_SCHEMA AS `Owner`, TRIGGER_NAME AS `Name`, EVENT_OBJECT_TABLE AS `TableName`{}
FROM INFORMATION_SCHEMA.TRIGGERS
WHERE TRIGGER_SCHEMA = '{}'{}
ORDER BY TRIGGER_NAME"#,
            definition,
            escape_literal(filter.owner),
            and_in("EVENT_OBJECT_TABLE", filter.names)
        )
    }

    fn views_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            ", CONCAT('CREATE VIEW `', TABLE_NAME, '` AS ', VIEW_DEFINITION) AS `Definition`"
        } else {
            ""
        };
        format!(
            r#"SELECT TABLE_SCHEMA AS `Owner`, TABLE_NAME AS `Name`{}
FROM INFORMATION_SCHEMA.VIEWS
WHERE TABLE_SCHEMA = '{}'{}
ORDER BY TABLE_NAME"#,
            definition,
            escape_literal(filter.owner),
            and_in("TABLE_NAME", filter.names)
        )
    }

    /// Functions and procedures, rebuilt from ROUTINES and PARAMETERS.
    fn routines_sql(&self, routine_type: &str, filter: &CatalogFilter<'_>) -> String {
        let details = if !filter.is_details() {
            String::new()
        } else if routine_type == "FUNCTION" {
            ",\n    CONCAT('CREATE FUNCTION `', R.ROUTINE_NAME, '`(', IFNULL(P.PARAMS, ''), ') RETURNS ', \
             R.DTD_IDENTIFIER, IF(R.IS_DETERMINISTIC = 'YES', ' DETERMINISTIC', ''), '\\n', \
             R.ROUTINE_DEFINITION) AS `Definition`"
                .to_string()
        } else {
            ",\n    CONCAT('CREATE PROCEDURE `', R.ROUTINE_NAME, '`(', IFNULL(P.PARAMS, ''), ')\\n', \
             R.ROUTINE_DEFINITION) AS `Definition`"
                .to_string()
        };
        let params_join = if filter.is_details() {
            r#"
LEFT JOIN (
    SELECT SPECIFIC_SCHEMA, SPECIFIC_NAME,
        GROUP_CONCAT(CONCAT(IF(ROUTINE_TYPE = 'PROCEDURE', CONCAT(PARAMETER_MODE, ' '), ''),
            '`', PARAMETER_NAME, '` ', DTD_IDENTIFIER) ORDER BY ORDINAL_POSITION SEPARATOR ', ') AS PARAMS
    FROM INFORMATION_SCHEMA.PARAMETERS
    WHERE ORDINAL_POSITION > 0
    GROUP BY SPECIFIC_SCHEMA, SPECIFIC_NAME
) P ON P.SPECIFIC_SCHEMA = R.ROUTINE_SCHEMA AND P.SPECIFIC_NAME = R.SPECIFIC_NAME"#
        } else {
            ""
        };
        format!(
            r#"SELECT R.ROUTINE_SCHEMA AS `Owner`, R.ROUTINE_NAME AS `Name`{}
FROM INFORMATION_SCHEMA.ROUTINES R{}
WHERE R.ROUTINE_TYPE = '{}' AND R.ROUTINE_SCHEMA = '{}'{}
ORDER BY R.ROUTINE_NAME"#,
            details,
            params_join,
            routine_type,
            escape_literal(filter.owner),
            and_in("R.ROUTINE_NAME", filter.names)
        )
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_chars(&self) -> QuoteChars {
        BACKTICKS
    }

    /// Scripts target the connection's current database.
    fn qualify(&self, _owner: &str, name: &str) -> String {
        self.quote_ident(name)
    }

    fn max_identifier_length(&self) -> usize {
        64
    }

    /// utf8mb4 keys are capped at 3072 bytes; 500 characters keeps composite
    /// keys of two such columns under the limit.
    fn key_column_max_length(&self) -> i64 {
        500
    }

    fn type_rules(&self) -> &TypeRules {
        &TYPE_RULES
    }

    fn pagination_style(&self) -> PaginationStyle {
        PaginationStyle::LimitComma
    }

    fn builtin_databases(&self) -> &[&str] {
        BUILTIN_DATABASES
    }

    fn default_owner(&self) -> &str {
        ""
    }

    fn databases_sql(&self) -> String {
        "SELECT SCHEMA_NAME AS `Name` FROM INFORMATION_SCHEMA.SCHEMATA ORDER BY SCHEMA_NAME".to_string()
    }

    fn catalog_sql(&self, kind: DatabaseObjectKind, filter: &CatalogFilter<'_>) -> Option<String> {
        match kind {
            DatabaseObjectKind::Table => Some(self.tables_sql(filter)),
            DatabaseObjectKind::TableColumn => Some(self.columns_sql(filter)),
            DatabaseObjectKind::TablePrimaryKey => Some(self.primary_keys_sql(filter)),
            DatabaseObjectKind::TableForeignKey => Some(self.foreign_keys_sql(filter)),
            DatabaseObjectKind::TableIndex => Some(self.indexes_sql(filter)),
            DatabaseObjectKind::TableTrigger => Some(self.triggers_sql(filter)),
            DatabaseObjectKind::View => Some(self.views_sql(filter)),
            DatabaseObjectKind::Function => Some(self.routines_sql("FUNCTION", filter)),
            DatabaseObjectKind::Procedure => Some(self.routines_sql("PROCEDURE", filter)),
            DatabaseObjectKind::UserDefinedType | DatabaseObjectKind::Database => None,
        }
    }

    fn charset_clause(&self, column: &TableColumn) -> Option<String> {
        let charset = self.charset.as_deref()?;
        let base = base_type(&column.data_type);
        if !is_char_type(&column.data_type) && !base.ends_with("text") {
            return None;
        }
        Some(match self.collation.as_deref() {
            Some(collation) => format!("CHARACTER SET {} COLLATE {}", charset, collation),
            None => format!("CHARACTER SET {}", charset),
        })
    }

    fn identity_clause(&self, _table: &Table) -> String {
        "AUTO_INCREMENT".to_string()
    }

    fn inline_comment_clause(&self, comment: &str) -> Option<String> {
        Some(format!("COMMENT '{}'", escape_literal(comment)))
    }

    fn table_trailer(&self, table: &Table) -> String {
        let mut trailer = String::new();
        if let Some(comment) = table.comment.as_deref().filter(|c| !c.is_empty()) {
            trailer.push_str(&format!(" comment='{}'", escape_literal(comment)));
        }
        if let Some(charset) = &self.charset {
            trailer.push_str(&format!(" DEFAULT CHARSET={}", charset));
        }
        trailer
    }

    /// MySQL always names the primary key `PRIMARY`.
    fn primary_key_clause(&self, _constraint_name: &str, columns: &[String]) -> String {
        format!("PRIMARY KEY ({})", columns.join(", "))
    }

    fn index_statement(&self, table_ref: &str, index_name: &str, columns: &[String], unique: bool) -> String {
        format!(
            "ALTER TABLE {} ADD {}INDEX {}({})",
            table_ref,
            if unique { "UNIQUE " } else { "" },
            self.quote_ident(index_name),
            columns.join(", ")
        )
    }

    fn guard_definition(&self, kind: DatabaseObjectKind, _owner: &str, _name: &str, definition: &str) -> String {
        match kind {
            DatabaseObjectKind::View => create_or_replace(definition),
            other => insert_if_not_exists(definition, other.keyword()),
        }
    }

    fn set_constraints_sql(&self, enabled: bool) -> String {
        format!("SET FOREIGN_KEY_CHECKS = {}", if enabled { 1 } else { 0 })
    }

    fn set_identity_sql(
        &self,
        table_ref: &str,
        _table: &Table,
        _column: &TableColumn,
        column_def: &str,
        enabled: bool,
    ) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}{}",
            table_ref,
            column_def,
            if enabled { " AUTO_INCREMENT" } else { "" }
        )
    }

    fn drop_sql(&self, object: &DbObject) -> String {
        match object {
            DbObject::TablePrimaryKey(pk) => format!(
                "ALTER TABLE {} DROP PRIMARY KEY",
                self.qualify(&pk.owner, &pk.table_name)
            ),
            DbObject::TableForeignKey(fk) => format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                self.qualify(&fk.owner, &fk.table_name),
                self.quote_ident(&fk.name)
            ),
            DbObject::TableIndex(ix) => format!(
                "ALTER TABLE {} DROP INDEX {}",
                self.qualify(&ix.owner, &ix.table_name),
                self.quote_ident(&ix.name)
            ),
            DbObject::TableColumn(col) => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.qualify(&col.owner, &col.table_name),
                self.quote_ident(&col.name)
            ),
            other => format!(
                "DROP {} IF EXISTS {}",
                other.kind().keyword(),
                self.qualify(other.owner(), other.name())
            ),
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("UNHEX('{}')", hex::encode_upper(bytes))
    }

    /// Backslash is an escape character in MySQL string literals.
    fn string_literal(&self, text: &str) -> String {
        format!("'{}'", escape_literal(&text.replace('\\', "\\\\")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::{make_test_column, make_test_table};
    use crate::core::schema::TableForeignKey;
    use crate::core::traits::ObjectFetchMode;

    fn filter<'a>(names: &'a [String], mode: ObjectFetchMode) -> CatalogFilter<'a> {
        CatalogFilter {
            owner: "shop",
            names,
            mode,
        }
    }

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "`name`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
        assert_eq!(dialect.qualify("shop", "Users"), "`Users`");
    }

    #[test]
    fn test_limits() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.max_identifier_length(), 64);
        assert_eq!(dialect.key_column_max_length(), 500);
        assert_eq!(dialect.pagination_style(), PaginationStyle::LimitComma);
    }

    #[test]
    fn test_tables_sql_filters_and_orders() {
        let dialect = MysqlDialect::new();
        let names = vec!["orders".to_string()];
        let sql = dialect
            .catalog_sql(DatabaseObjectKind::Table, &filter(&names, ObjectFetchMode::Details))
            .unwrap();
        assert!(sql.contains("TABLE_SCHEMA = 'shop'"));
        assert!(sql.contains("AND TABLE_NAME IN ('orders')"));
        assert!(sql.contains("`Comment`"));
        assert!(sql.trim_end().ends_with("ORDER BY TABLE_NAME"));
    }

    #[test]
    fn test_simple_mode_omits_definitions() {
        let dialect = MysqlDialect::new();
        for kind in [
            DatabaseObjectKind::View,
            DatabaseObjectKind::Function,
            DatabaseObjectKind::Procedure,
            DatabaseObjectKind::TableTrigger,
        ] {
            let simple = dialect.catalog_sql(kind, &filter(&[], ObjectFetchMode::Simple)).unwrap();
            assert!(!simple.contains("`Definition`"), "{:?}", kind);
            let full = dialect.catalog_sql(kind, &filter(&[], ObjectFetchMode::Details)).unwrap();
            assert!(full.contains("`Definition`"), "{:?}", kind);
        }
    }

    #[test]
    fn test_triggers_filter_by_table() {
        let dialect = MysqlDialect::new();
        let names = vec!["orders".to_string()];
        let sql = dialect
            .catalog_sql(DatabaseObjectKind::TableTrigger, &filter(&names, ObjectFetchMode::Simple))
            .unwrap();
        assert!(sql.contains("EVENT_OBJECT_TABLE IN ('orders')"));
    }

    #[test]
    fn test_no_user_defined_types() {
        let dialect = MysqlDialect::new();
        assert!(dialect
            .catalog_sql(DatabaseObjectKind::UserDefinedType, &filter(&[], ObjectFetchMode::Details))
            .is_none());
    }

    #[test]
    fn test_charset_clause_only_for_character_types() {
        let dialect = MysqlDialect::with_charset(Some("utf8mb4".into()), Some("utf8mb4_bin".into()));
        let code = make_test_column("orders", "code", "varchar(600)", 1);
        let notes = make_test_column("orders", "notes", "longtext", 2);
        let id = make_test_column("orders", "id", "int", 3);
        assert_eq!(
            dialect.charset_clause(&code).as_deref(),
            Some("CHARACTER SET utf8mb4 COLLATE utf8mb4_bin")
        );
        assert!(dialect.charset_clause(&notes).is_some());
        assert!(dialect.charset_clause(&id).is_none());
        assert!(MysqlDialect::new().charset_clause(&code).is_none());
    }

    #[test]
    fn test_table_trailer() {
        let dialect = MysqlDialect::with_charset(Some("utf8mb4".into()), None);
        let mut table = make_test_table("orders");
        table.comment = Some("customer's orders".into());
        assert_eq!(
            dialect.table_trailer(&table),
            " comment='customer''s orders' DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_index_statement() {
        let dialect = MysqlDialect::new();
        let sql = dialect.index_statement("`orders`", "ix_code", &["`code`".to_string()], true);
        assert_eq!(sql, "ALTER TABLE `orders` ADD UNIQUE INDEX `ix_code`(`code`)");
    }

    #[test]
    fn test_guard_definition() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.guard_definition(DatabaseObjectKind::View, "shop", "v", "CREATE VIEW `v` AS select 1"),
            "CREATE OR REPLACE VIEW `v` AS select 1"
        );
        assert_eq!(
            dialect.guard_definition(DatabaseObjectKind::Procedure, "shop", "p", "CREATE PROCEDURE `p`()\nBEGIN END"),
            "CREATE PROCEDURE IF NOT EXISTS `p`()\nBEGIN END"
        );
    }

    #[test]
    fn test_drop_sql() {
        let dialect = MysqlDialect::new();
        let fk = TableForeignKey {
            owner: "shop".into(),
            table_name: "orders".into(),
            name: "fk_orders_customer".into(),
            ..Default::default()
        };
        assert_eq!(
            dialect.drop_sql(&DbObject::TableForeignKey(fk)),
            "ALTER TABLE `orders` DROP FOREIGN KEY `fk_orders_customer`"
        );
        assert_eq!(
            dialect.drop_sql(&DbObject::Table(make_test_table("orders"))),
            "DROP TABLE IF EXISTS `orders`"
        );
    }

    #[test]
    fn test_set_identity_sql() {
        let dialect = MysqlDialect::new();
        let table = make_test_table("orders");
        let column = make_test_column("orders", "id", "int", 1);
        assert_eq!(
            dialect.set_identity_sql("`orders`", &table, &column, "`id` int NOT NULL", true),
            "ALTER TABLE `orders` MODIFY COLUMN `id` int NOT NULL AUTO_INCREMENT"
        );
        assert_eq!(
            dialect.set_identity_sql("`orders`", &table, &column, "`id` int NOT NULL", false),
            "ALTER TABLE `orders` MODIFY COLUMN `id` int NOT NULL"
        );
    }

    #[test]
    fn test_literals() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.bytes_literal(&[0xca, 0xfe]), "UNHEX('CAFE')");
        assert_eq!(dialect.string_literal("a\\b'c"), "'a\\\\b''c'");
        assert_eq!(dialect.set_constraints_sql(false), "SET FOREIGN_KEY_CHECKS = 0");
    }
}
