//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Catalog queries read `pg_catalog` directly where `information_schema`
//! loses information (composite foreign-key pairing, index column order,
//! definitions); comments are emitted as `COMMENT ON` statements.

use crate::core::datatype::TypeRules;
use crate::core::identifier::{escape_literal, QuoteChars, DOUBLE_QUOTES};
use crate::core::pagination::PaginationStyle;
use crate::core::schema::{DatabaseObjectKind, DbObject, Table, TableColumn, UserDefinedType};
use crate::core::traits::{ansi_literal, CatalogFilter, Dialect};
use crate::core::value::SqlValue;
use crate::drivers::common::{and_in, create_or_replace};

const BUILTIN_DATABASES: &[&str] = &["postgres"];

const TYPE_RULES: TypeRules = TypeRules {
    no_length_types: &[
        "date", "time", "int", "serial", "text", "bytea", "bool", "json", "uuid", "real", "double",
        "float", "money", "xml", "oid", "inet", "cidr", "macaddr", "bit", "point", "tsvector",
        "[]",
    ],
    max_length_keyword: None,
};

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    fn tables_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let details = if filter.is_details() {
            r#", obj_description(c.oid, 'pg_class') AS "Comment", 1 AS "IdentitySeed", 1 AS "IdentityIncrement""#
        } else {
            ""
        };
        format!(
            r#"SELECT n.nspname AS "Owner", c.relname AS "Name"{}
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE c.relkind IN ('r', 'p') AND n.nspname = '{}'{}
ORDER BY c.relname"#,
            details,
            escape_literal(filter.owner),
            and_in("c.relname", filter.names)
        )
    }

    fn columns_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT c.table_schema AS "Owner", c.table_name AS "TableName", c.column_name AS "Name",
    CASE WHEN c.data_type = 'USER-DEFINED' THEN c.udt_name
         WHEN c.data_type = 'ARRAY' THEN format_type(a.atttypid, a.atttypmod)
         ELSE c.data_type END AS "DataType",
    c.character_maximum_length AS "MaxLength", c.numeric_precision AS "Precision", c.numeric_scale AS "Scale",
    CASE WHEN c.is_nullable = 'YES' THEN 1 ELSE 0 END AS "IsNullable", c.ordinal_position AS "Order",
    c.column_default AS "DefaultValue", col_description(cl.oid, a.attnum) AS "Comment",
    CASE WHEN c.is_identity = 'YES' OR c.column_default LIKE 'nextval(%' THEN 1 ELSE 0 END AS "IsIdentity"
FROM information_schema.columns c
JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema
JOIN pg_catalog.pg_class cl ON cl.relnamespace = n.oid AND cl.relname = c.table_name
JOIN pg_catalog.pg_attribute a ON a.attrelid = cl.oid AND a.attname = c.column_name
WHERE cl.relkind IN ('r', 'p') AND c.table_schema = '{}'{}
ORDER BY c.table_name, c.ordinal_position"#,
            escape_literal(filter.owner),
            and_in("c.table_name", filter.names)
        )
    }

    fn primary_keys_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT tc.table_schema AS "Owner", tc.table_name AS "TableName", tc.constraint_name AS "Name",
    kcu.column_name AS "ColumnName", kcu.ordinal_position AS "Order"
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu ON kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = '{}'{}
ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position"#,
            escape_literal(filter.owner),
            and_in("tc.table_name", filter.names)
        )
    }

    fn foreign_keys_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT n.nspname AS "Owner", cl.relname AS "TableName", con.conname AS "Name",
    a.attname AS "ColumnName", k.ord AS "Order",
    rn.nspname AS "ReferencedOwner", rcl.relname AS "ReferencedTableName", ra.attname AS "ReferencedColumnName",
    CASE WHEN con.confupdtype = 'c' THEN 1 ELSE 0 END AS "UpdateCascade",
    CASE WHEN con.confdeltype = 'c' THEN 1 ELSE 0 END AS "DeleteCascade"
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace
JOIN pg_catalog.pg_class rcl ON rcl.oid = con.confrelid
JOIN pg_catalog.pg_namespace rn ON rn.oid = rcl.relnamespace
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refattnum, ord)
JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
JOIN pg_catalog.pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refattnum
WHERE con.contype = 'f' AND n.nspname = '{}'{}
ORDER BY cl.relname, con.conname, k.ord"#,
            escape_literal(filter.owner),
            and_in("cl.relname", filter.names)
        )
    }

    fn indexes_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT n.nspname AS "Owner", t.relname AS "TableName", i.relname AS "Name",
    a.attname AS "ColumnName", k.ord AS "Order",
    CASE WHEN ix.indisunique THEN 1 ELSE 0 END AS "IsUnique",
    CASE WHEN (ix.indoption[(k.ord - 1)::int] & 1) = 1 THEN 1 ELSE 0 END AS "IsDesc"
FROM pg_catalog.pg_index ix
JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum AND k.attnum <> 0
WHERE NOT ix.indisprimary AND k.ord <= ix.indnkeyatts AND n.nspname = '{}'{}
ORDER BY t.relname, i.relname, k.ord"#,
            escape_literal(filter.owner),
            and_in("t.relname", filter.names)
        )
    }

    fn triggers_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            r#", pg_get_triggerdef(tg.oid) AS "Definition""#
        } else {
            ""
        };
        format!(
            r#"SELECT n.nspname AS "Owner", tg.tgname AS "Name", c.relname AS "TableName"{}
FROM pg_catalog.pg_trigger tg
JOIN pg_catalog.pg_class c ON c.oid = tg.tgrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE NOT tg.tgisinternal AND n.nspname = '{}'{}
ORDER BY tg.tgname"#,
            definition,
            escape_literal(filter.owner),
            and_in("c.relname", filter.names)
        )
    }

    fn views_sql(&self, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            r#", 'CREATE VIEW ' || quote_ident(schemaname) || '.' || quote_ident(viewname) || ' AS' || chr(10)
    || rtrim(rtrim(definition), ';') AS "Definition""#
        } else {
            ""
        };
        format!(
            r#"SELECT schemaname AS "Owner", viewname AS "Name"{}
FROM pg_catalog.pg_views
WHERE schemaname = '{}'{}
ORDER BY viewname"#,
            definition,
            escape_literal(filter.owner),
            and_in("viewname", filter.names)
        )
    }

    /// `prokind` is `f` for functions and `p` for procedures (PostgreSQL 11+).
    fn routines_sql(&self, prokind: char, filter: &CatalogFilter<'_>) -> String {
        let definition = if filter.is_details() {
            r#", pg_get_functiondef(p.oid) AS "Definition""#
        } else {
            ""
        };
        format!(
            r#"SELECT n.nspname AS "Owner", p.proname AS "Name"{}
FROM pg_catalog.pg_proc p
JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
WHERE p.prokind = '{}' AND n.nspname = '{}'{}
ORDER BY p.proname"#,
            definition,
            prokind,
            escape_literal(filter.owner),
            and_in("p.proname", filter.names)
        )
    }

    /// Domains stand in for alias types.
    fn user_defined_types_sql(&self, filter: &CatalogFilter<'_>) -> String {
        format!(
            r#"SELECT d.domain_schema AS "Owner", d.domain_name AS "Name", d.data_type AS "DataType",
    d.character_maximum_length AS "MaxLength", d.numeric_precision AS "Precision", d.numeric_scale AS "Scale",
    CASE WHEN t.typnotnull THEN 0 ELSE 1 END AS "IsNullable"
FROM information_schema.domains d
JOIN pg_catalog.pg_namespace n ON n.nspname = d.domain_schema
JOIN pg_catalog.pg_type t ON t.typnamespace = n.oid AND t.typname = d.domain_name
WHERE d.domain_schema = '{}'{}
ORDER BY d.domain_name"#,
            escape_literal(filter.owner),
            and_in("d.domain_name", filter.names)
        )
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_chars(&self) -> QuoteChars {
        DOUBLE_QUOTES
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    /// B-tree entries can hold about 2700 bytes; no fixed character limit.
    fn key_column_max_length(&self) -> i64 {
        0
    }

    fn type_rules(&self) -> &TypeRules {
        &TYPE_RULES
    }

    fn pagination_style(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset
    }

    fn builtin_databases(&self) -> &[&str] {
        BUILTIN_DATABASES
    }

    fn default_owner(&self) -> &str {
        "public"
    }

    fn databases_sql(&self) -> String {
        r#"SELECT datname AS "Name" FROM pg_catalog.pg_database WHERE NOT datistemplate ORDER BY datname"#
            .to_string()
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
            DatabaseObjectKind::Function => Some(self.routines_sql('f', filter)),
            DatabaseObjectKind::Procedure => Some(self.routines_sql('p', filter)),
            DatabaseObjectKind::UserDefinedType => Some(self.user_defined_types_sql(filter)),
            DatabaseObjectKind::Database => None,
        }
    }

    fn identity_clause(&self, table: &Table) -> String {
        let seed = table.identity_seed.unwrap_or(1);
        let increment = table.identity_increment.unwrap_or(1);
        if seed == 1 && increment == 1 {
            "GENERATED BY DEFAULT AS IDENTITY".to_string()
        } else {
            format!(
                "GENERATED BY DEFAULT AS IDENTITY (START WITH {} INCREMENT BY {})",
                seed, increment
            )
        }
    }

    fn comment_statements(&self, table: &Table, table_ref: &str, columns: &[&TableColumn]) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(comment) = table.comment.as_deref().filter(|c| !c.is_empty()) {
            statements.push(format!(
                "COMMENT ON TABLE {} IS '{}'",
                table_ref,
                escape_literal(comment)
            ));
        }
        for column in columns {
            if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
                statements.push(format!(
                    "COMMENT ON COLUMN {}.{} IS '{}'",
                    table_ref,
                    self.quote_ident(&column.name),
                    escape_literal(comment)
                ));
            }
        }
        statements
    }

    fn user_defined_type_statement(&self, udt: &UserDefinedType, data_type: &str) -> Option<String> {
        Some(format!(
            "CREATE DOMAIN {} AS {}{}",
            self.qualify(&udt.owner, &udt.name),
            data_type,
            if udt.is_nullable { "" } else { " NOT NULL" }
        ))
    }

    /// Functions and procedures come back from `pg_get_functiondef` as
    /// `CREATE OR REPLACE` already; views and triggers (14+) accept it too.
    fn guard_definition(&self, _kind: DatabaseObjectKind, _owner: &str, _name: &str, definition: &str) -> String {
        create_or_replace(definition)
    }

    fn set_constraints_sql(&self, enabled: bool) -> String {
        format!(
            "SET session_replication_role = {}",
            if enabled { "origin" } else { "replica" }
        )
    }

    fn set_identity_sql(
        &self,
        table_ref: &str,
        _table: &Table,
        column: &TableColumn,
        _column_def: &str,
        enabled: bool,
    ) -> String {
        if enabled {
            format!(
                "ALTER TABLE {} ALTER COLUMN {} ADD GENERATED BY DEFAULT AS IDENTITY",
                table_ref,
                self.quote_ident(&column.name)
            )
        } else {
            format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP IDENTITY IF EXISTS",
                table_ref,
                self.quote_ident(&column.name)
            )
        }
    }

    fn drop_sql(&self, object: &DbObject) -> String {
        match object {
            DbObject::TablePrimaryKey(pk) => format!(
                "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
                self.qualify(&pk.owner, &pk.table_name),
                self.quote_ident(&pk.name)
            ),
            DbObject::TableForeignKey(fk) => format!(
                "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
                self.qualify(&fk.owner, &fk.table_name),
                self.quote_ident(&fk.name)
            ),
            DbObject::TableColumn(col) => format!(
                "ALTER TABLE {} DROP COLUMN IF EXISTS {}",
                self.qualify(&col.owner, &col.table_name),
                self.quote_ident(&col.name)
            ),
            DbObject::TableTrigger(tr) => format!(
                "DROP TRIGGER IF EXISTS {} ON {}",
                self.quote_ident(&tr.name),
                self.qualify(&tr.owner, &tr.table_name)
            ),
            DbObject::UserDefinedType(t) => format!(
                "DROP DOMAIN IF EXISTS {}",
                self.qualify(&t.owner, &t.name)
            ),
            other => format!(
                "DROP {} IF EXISTS {}",
                other.kind().keyword(),
                self.qualify(other.owner(), other.name())
            ),
        }
    }

    fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
            SqlValue::Bytes(bytes) => self.bytes_literal(bytes),
            SqlValue::Text(text) => self.string_literal(text),
            other => ansi_literal(other),
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::{make_test_column, make_test_table};
    use crate::core::schema::{TableIndex, TableTrigger};
    use crate::core::traits::ObjectFetchMode;

    fn filter<'a>(names: &'a [String], mode: ObjectFetchMode) -> CatalogFilter<'a> {
        CatalogFilter {
            owner: "public",
            names,
            mode,
        }
    }

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("users"), "\"users\"");
        assert_eq!(dialect.quote_ident("my\"table"), "\"my\"\"table\"");
        assert_eq!(dialect.qualify("public", "users"), "\"public\".\"users\"");
    }

    #[test]
    fn test_limits() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.max_identifier_length(), 63);
        assert_eq!(dialect.key_column_max_length(), 0);
        assert_eq!(dialect.default_owner(), "public");
    }

    #[test]
    fn test_foreign_keys_pair_columns_by_position() {
        let dialect = PostgresDialect::new();
        let sql = dialect
            .catalog_sql(DatabaseObjectKind::TableForeignKey, &filter(&[], ObjectFetchMode::Details))
            .unwrap();
        assert!(sql.contains("unnest(con.conkey, con.confkey) WITH ORDINALITY"));
        assert!(sql.contains("con.confdeltype = 'c'"));
    }

    #[test]
    fn test_definitions_only_in_details_mode() {
        let dialect = PostgresDialect::new();
        let names = vec!["calc_total".to_string()];
        let full = dialect
            .catalog_sql(DatabaseObjectKind::Function, &filter(&names, ObjectFetchMode::Details))
            .unwrap();
        assert!(full.contains("pg_get_functiondef"));
        assert!(full.contains("p.proname IN ('calc_total')"));
        let simple = dialect
            .catalog_sql(DatabaseObjectKind::Function, &filter(&names, ObjectFetchMode::Simple))
            .unwrap();
        assert!(!simple.contains("pg_get_functiondef"));
    }

    #[test]
    fn test_identity_clause() {
        let dialect = PostgresDialect::new();
        let mut table = make_test_table("orders");
        assert_eq!(dialect.identity_clause(&table), "GENERATED BY DEFAULT AS IDENTITY");
        table.identity_seed = Some(100);
        assert_eq!(
            dialect.identity_clause(&table),
            "GENERATED BY DEFAULT AS IDENTITY (START WITH 100 INCREMENT BY 1)"
        );
    }

    #[test]
    fn test_comment_statements() {
        let dialect = PostgresDialect::new();
        let mut table = make_test_table("orders");
        table.comment = Some("all orders".into());
        let mut code = make_test_column("orders", "code", "varchar", 1);
        code.comment = Some("it's the code".into());
        let id = make_test_column("orders", "id", "int", 2);

        let statements = dialect.comment_statements(&table, "\"shop\".\"orders\"", &[&code, &id]);
        assert_eq!(
            statements,
            vec![
                "COMMENT ON TABLE \"shop\".\"orders\" IS 'all orders'".to_string(),
                "COMMENT ON COLUMN \"shop\".\"orders\".\"code\" IS 'it''s the code'".to_string(),
            ]
        );
    }

    #[test]
    fn test_drop_trigger_names_table() {
        let dialect = PostgresDialect::new();
        let trigger = TableTrigger {
            owner: "shop".into(),
            table_name: "orders".into(),
            name: "trg_audit".into(),
            definition: None,
        };
        assert_eq!(
            dialect.drop_sql(&DbObject::TableTrigger(trigger)),
            "DROP TRIGGER IF EXISTS \"trg_audit\" ON \"shop\".\"orders\""
        );
    }

    #[test]
    fn test_drop_index_is_schema_scoped() {
        let dialect = PostgresDialect::new();
        let index = TableIndex {
            owner: "shop".into(),
            table_name: "orders".into(),
            name: "ix_code".into(),
            ..Default::default()
        };
        assert_eq!(
            dialect.drop_sql(&DbObject::TableIndex(index)),
            "DROP INDEX IF EXISTS \"shop\".\"ix_code\""
        );
    }

    #[test]
    fn test_set_constraints_and_identity() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.set_constraints_sql(false), "SET session_replication_role = replica");
        assert_eq!(dialect.set_constraints_sql(true), "SET session_replication_role = origin");

        let table = make_test_table("orders");
        let column = make_test_column("orders", "id", "integer", 1);
        assert_eq!(
            dialect.set_identity_sql("\"shop\".\"orders\"", &table, &column, "", false),
            "ALTER TABLE \"shop\".\"orders\" ALTER COLUMN \"id\" DROP IDENTITY IF EXISTS"
        );
    }

    #[test]
    fn test_literals() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.literal(&SqlValue::Bool(true)), "TRUE");
        assert_eq!(dialect.literal(&SqlValue::Bytes(vec![0xde, 0xad])), "'\\xdead'::bytea");
        assert_eq!(dialect.literal(&SqlValue::Text("O'Brien".into())), "'O''Brien'");
        assert_eq!(dialect.literal(&SqlValue::I32(7)), "7");
    }

    #[test]
    fn test_domain_statement() {
        let dialect = PostgresDialect::new();
        let udt = UserDefinedType {
            owner: "shop".into(),
            name: "phone".into(),
            data_type: "varchar".into(),
            max_length: Some(20),
            is_nullable: false,
            ..Default::default()
        };
        assert_eq!(
            dialect.user_defined_type_statement(&udt, "varchar(20)").as_deref(),
            Some("CREATE DOMAIN \"shop\".\"phone\" AS varchar(20) NOT NULL")
        );
    }
}
