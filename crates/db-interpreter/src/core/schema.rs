//! Dialect-neutral schema model: tables, columns, keys, indexes and routines.
//!
//! Key and index metadata is stored one row per member column, exactly as the
//! catalogs return it. Rows sharing `(table_name, name)` form one composite
//! key; [`group_by_constraint`] assembles them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a database object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseObjectKind {
    Database,
    UserDefinedType,
    Function,
    Table,
    TableColumn,
    TablePrimaryKey,
    TableForeignKey,
    TableIndex,
    TableTrigger,
    View,
    Procedure,
}

impl DatabaseObjectKind {
    /// SQL keyword used in `CREATE`/`DROP` statements.
    pub fn keyword(&self) -> &'static str {
        match self {
            DatabaseObjectKind::Database => "DATABASE",
            DatabaseObjectKind::UserDefinedType => "TYPE",
            DatabaseObjectKind::Function => "FUNCTION",
            DatabaseObjectKind::Table => "TABLE",
            DatabaseObjectKind::TableColumn => "COLUMN",
            DatabaseObjectKind::TablePrimaryKey => "PRIMARY KEY",
            DatabaseObjectKind::TableForeignKey => "FOREIGN KEY",
            DatabaseObjectKind::TableIndex => "INDEX",
            DatabaseObjectKind::TableTrigger => "TRIGGER",
            DatabaseObjectKind::View => "VIEW",
            DatabaseObjectKind::Procedure => "PROCEDURE",
        }
    }
}

impl fmt::Display for DatabaseObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatabaseObjectKind::Database => "Database",
            DatabaseObjectKind::UserDefinedType => "UserDefinedType",
            DatabaseObjectKind::Function => "Function",
            DatabaseObjectKind::Table => "Table",
            DatabaseObjectKind::TableColumn => "TableColumn",
            DatabaseObjectKind::TablePrimaryKey => "TablePrimaryKey",
            DatabaseObjectKind::TableForeignKey => "TableForeignKey",
            DatabaseObjectKind::TableIndex => "TableIndex",
            DatabaseObjectKind::TableTrigger => "TableTrigger",
            DatabaseObjectKind::View => "View",
            DatabaseObjectKind::Procedure => "Procedure",
        };
        f.write_str(name)
    }
}

/// Database (catalog) entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
}

/// Table metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Owner (schema or database name).
    pub owner: String,

    /// Table name.
    pub name: String,

    /// Table comment, if any.
    #[serde(default)]
    pub comment: Option<String>,

    /// Identity seed for the table's identity column.
    #[serde(default)]
    pub identity_seed: Option<i64>,

    /// Identity increment for the table's identity column.
    #[serde(default)]
    pub identity_increment: Option<i64>,
}

/// Column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub owner: String,

    /// Name of the table the column belongs to.
    pub table_name: String,

    pub name: String,

    /// Declared data type. May already carry a length, e.g. `varchar(20)`.
    pub data_type: String,

    /// Maximum length for character/binary types (-1 for max).
    #[serde(default)]
    pub max_length: Option<i64>,

    /// Numeric precision.
    #[serde(default)]
    pub precision: Option<i32>,

    /// Numeric scale.
    #[serde(default)]
    pub scale: Option<i32>,

    pub is_nullable: bool,

    /// Ordinal position (1-based).
    pub order: i32,

    /// Default value expression as stored by the catalog.
    #[serde(default)]
    pub default_value: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,

    pub is_identity: bool,
}

/// One member column of a primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePrimaryKey {
    pub owner: String,
    pub table_name: String,
    /// Constraint name.
    pub name: String,
    pub column_name: String,
    pub order: i32,
}

/// One member column of a foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableForeignKey {
    pub owner: String,
    pub table_name: String,
    /// Constraint name.
    pub name: String,
    pub column_name: String,
    pub order: i32,
    pub referenced_owner: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
    /// ON UPDATE CASCADE.
    pub update_cascade: bool,
    /// ON DELETE CASCADE.
    pub delete_cascade: bool,
}

/// One member column of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIndex {
    pub owner: String,
    pub table_name: String,
    /// Index name.
    pub name: String,
    pub column_name: String,
    pub order: i32,
    pub is_unique: bool,
    #[serde(default)]
    pub is_desc: bool,
}

/// Trigger metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableTrigger {
    pub owner: String,
    pub table_name: String,
    pub name: String,
    /// Runnable CREATE statement; `None` when fetched in simple mode.
    #[serde(default)]
    pub definition: Option<String>,
}

/// View metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// Stored procedure metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// User-defined function metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// User-defined (alias) type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDefinedType {
    pub owner: String,
    pub name: String,
    /// Base type the alias resolves to.
    pub data_type: String,
    #[serde(default)]
    pub max_length: Option<i64>,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
    pub is_nullable: bool,
}

/// Objects carrying script definition text.
pub trait ScriptObject {
    fn kind(&self) -> DatabaseObjectKind;
    fn owner(&self) -> &str;
    fn name(&self) -> &str;
    fn definition(&self) -> Option<&str>;
}

macro_rules! impl_script_object {
    ($ty:ty, $kind:expr) => {
        impl ScriptObject for $ty {
            fn kind(&self) -> DatabaseObjectKind {
                $kind
            }
            fn owner(&self) -> &str {
                &self.owner
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn definition(&self) -> Option<&str> {
                self.definition.as_deref()
            }
        }
    };
}

impl_script_object!(Function, DatabaseObjectKind::Function);
impl_script_object!(View, DatabaseObjectKind::View);
impl_script_object!(TableTrigger, DatabaseObjectKind::TableTrigger);
impl_script_object!(Procedure, DatabaseObjectKind::Procedure);

/// A per-column row belonging to a named key or index.
pub trait KeyColumn {
    fn owner(&self) -> &str;
    fn table_name(&self) -> &str;
    fn constraint_name(&self) -> &str;
    fn column_name(&self) -> &str;
    fn order(&self) -> i32;
}

macro_rules! impl_key_column {
    ($ty:ty) => {
        impl KeyColumn for $ty {
            fn owner(&self) -> &str {
                &self.owner
            }
            fn table_name(&self) -> &str {
                &self.table_name
            }
            fn constraint_name(&self) -> &str {
                &self.name
            }
            fn column_name(&self) -> &str {
                &self.column_name
            }
            fn order(&self) -> i32 {
                self.order
            }
        }
    };
}

impl_key_column!(TablePrimaryKey);
impl_key_column!(TableForeignKey);
impl_key_column!(TableIndex);

/// Member rows of one composite key, sorted by `order`.
#[derive(Debug, Clone)]
pub struct KeyGroup<'a, T> {
    pub name: &'a str,
    pub members: Vec<&'a T>,
}

impl<'a, T: KeyColumn> KeyGroup<'a, T> {
    /// Member column names in key order.
    pub fn column_names(&self) -> Vec<&'a str> {
        self.members.iter().map(|m| m.column_name()).collect()
    }
}

/// Group key rows of one table by constraint name.
///
/// Groups appear in first-seen order. Within a group members are sorted by
/// `order` and a column listed twice is kept once.
pub fn group_by_constraint<'a, T: KeyColumn>(
    rows: &'a [T],
    owner: &str,
    table_name: &str,
) -> Vec<KeyGroup<'a, T>> {
    let mut groups: Vec<KeyGroup<'a, T>> = Vec::new();

    for row in rows
        .iter()
        .filter(|r| r.owner() == owner && r.table_name() == table_name)
    {
        match groups.iter_mut().find(|g| g.name == row.constraint_name()) {
            Some(group) => {
                if !group
                    .members
                    .iter()
                    .any(|m| m.column_name() == row.column_name())
                {
                    group.members.push(row);
                }
            }
            None => groups.push(KeyGroup {
                name: row.constraint_name(),
                members: vec![row],
            }),
        }
    }

    for group in &mut groups {
        group.members.sort_by_key(|m| m.order());
    }

    groups
}

/// Object targeted by a drop operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DbObject {
    Table(Table),
    TableColumn(TableColumn),
    TablePrimaryKey(TablePrimaryKey),
    TableForeignKey(TableForeignKey),
    TableIndex(TableIndex),
    TableTrigger(TableTrigger),
    View(View),
    Function(Function),
    Procedure(Procedure),
    UserDefinedType(UserDefinedType),
}

impl DbObject {
    pub fn kind(&self) -> DatabaseObjectKind {
        match self {
            DbObject::Table(_) => DatabaseObjectKind::Table,
            DbObject::TableColumn(_) => DatabaseObjectKind::TableColumn,
            DbObject::TablePrimaryKey(_) => DatabaseObjectKind::TablePrimaryKey,
            DbObject::TableForeignKey(_) => DatabaseObjectKind::TableForeignKey,
            DbObject::TableIndex(_) => DatabaseObjectKind::TableIndex,
            DbObject::TableTrigger(_) => DatabaseObjectKind::TableTrigger,
            DbObject::View(_) => DatabaseObjectKind::View,
            DbObject::Function(_) => DatabaseObjectKind::Function,
            DbObject::Procedure(_) => DatabaseObjectKind::Procedure,
            DbObject::UserDefinedType(_) => DatabaseObjectKind::UserDefinedType,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            DbObject::Table(o) => &o.owner,
            DbObject::TableColumn(o) => &o.owner,
            DbObject::TablePrimaryKey(o) => &o.owner,
            DbObject::TableForeignKey(o) => &o.owner,
            DbObject::TableIndex(o) => &o.owner,
            DbObject::TableTrigger(o) => &o.owner,
            DbObject::View(o) => &o.owner,
            DbObject::Function(o) => &o.owner,
            DbObject::Procedure(o) => &o.owner,
            DbObject::UserDefinedType(o) => &o.owner,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DbObject::Table(o) => &o.name,
            DbObject::TableColumn(o) => &o.name,
            DbObject::TablePrimaryKey(o) => &o.name,
            DbObject::TableForeignKey(o) => &o.name,
            DbObject::TableIndex(o) => &o.name,
            DbObject::TableTrigger(o) => &o.name,
            DbObject::View(o) => &o.name,
            DbObject::Function(o) => &o.name,
            DbObject::Procedure(o) => &o.name,
            DbObject::UserDefinedType(o) => &o.name,
        }
    }

    /// Owning table for table-scoped objects.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            DbObject::TableColumn(o) => Some(&o.table_name),
            DbObject::TablePrimaryKey(o) => Some(&o.table_name),
            DbObject::TableForeignKey(o) => Some(&o.table_name),
            DbObject::TableIndex(o) => Some(&o.table_name),
            DbObject::TableTrigger(o) => Some(&o.table_name),
            _ => None,
        }
    }
}

/// One snapshot of schema metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaInfo {
    #[serde(default)]
    pub user_defined_types: Vec<UserDefinedType>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub table_columns: Vec<TableColumn>,
    #[serde(default)]
    pub table_primary_keys: Vec<TablePrimaryKey>,
    #[serde(default)]
    pub table_foreign_keys: Vec<TableForeignKey>,
    #[serde(default)]
    pub table_indexes: Vec<TableIndex>,
    #[serde(default)]
    pub table_triggers: Vec<TableTrigger>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl SchemaInfo {
    /// Columns of a table in ascending `order`.
    pub fn columns_of(&self, table: &Table) -> Vec<&TableColumn> {
        let mut columns: Vec<&TableColumn> = self
            .table_columns
            .iter()
            .filter(|c| c.owner == table.owner && c.table_name == table.name)
            .collect();
        columns.sort_by_key(|c| c.order);
        columns
    }

    pub fn primary_keys_of(&self, table: &Table) -> Vec<KeyGroup<'_, TablePrimaryKey>> {
        group_by_constraint(&self.table_primary_keys, &table.owner, &table.name)
    }

    pub fn foreign_keys_of(&self, table: &Table) -> Vec<KeyGroup<'_, TableForeignKey>> {
        group_by_constraint(&self.table_foreign_keys, &table.owner, &table.name)
    }

    pub fn indexes_of(&self, table: &Table) -> Vec<KeyGroup<'_, TableIndex>> {
        group_by_constraint(&self.table_indexes, &table.owner, &table.name)
    }

    pub fn triggers_of(&self, table: &Table) -> Vec<&TableTrigger> {
        self.table_triggers
            .iter()
            .filter(|t| t.owner == table.owner && t.table_name == table.name)
            .collect()
    }

    /// Whether a column participates in any primary key, foreign key or index.
    pub fn is_key_column(&self, column: &TableColumn) -> bool {
        fn references<T: KeyColumn>(rows: &[T], column: &TableColumn) -> bool {
            rows.iter().any(|r| {
                r.owner() == column.owner
                    && r.table_name() == column.table_name
                    && r.column_name() == column.name
            })
        }

        references(&self.table_primary_keys, column)
            || references(&self.table_foreign_keys, column)
            || references(&self.table_indexes, column)
    }

    /// Replace the owner of every object.
    pub fn rehome(&mut self, owner: &str) {
        for t in &mut self.user_defined_types {
            t.owner = owner.to_string();
        }
        for f in &mut self.functions {
            f.owner = owner.to_string();
        }
        for t in &mut self.tables {
            t.owner = owner.to_string();
        }
        for c in &mut self.table_columns {
            c.owner = owner.to_string();
        }
        for k in &mut self.table_primary_keys {
            k.owner = owner.to_string();
        }
        for k in &mut self.table_foreign_keys {
            k.owner = owner.to_string();
            k.referenced_owner = owner.to_string();
        }
        for i in &mut self.table_indexes {
            i.owner = owner.to_string();
        }
        for t in &mut self.table_triggers {
            t.owner = owner.to_string();
        }
        for v in &mut self.views {
            v.owner = owner.to_string();
        }
        for p in &mut self.procedures {
            p.owner = owner.to_string();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_test_table(name: &str) -> Table {
        Table {
            owner: "shop".to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn make_test_column(table: &str, name: &str, data_type: &str, order: i32) -> TableColumn {
        TableColumn {
            owner: "shop".to_string(),
            table_name: table.to_string(),
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
            order,
            ..Default::default()
        }
    }

    pub(crate) fn make_test_fk(table: &str, name: &str, column: &str, order: i32) -> TableForeignKey {
        TableForeignKey {
            owner: "shop".to_string(),
            table_name: table.to_string(),
            name: name.to_string(),
            column_name: column.to_string(),
            order,
            referenced_owner: "shop".to_string(),
            referenced_table_name: "customers".to_string(),
            referenced_column_name: format!("ref_{}", column),
            ..Default::default()
        }
    }

    fn pk(table: &str, name: &str, column: &str, order: i32) -> TablePrimaryKey {
        TablePrimaryKey {
            owner: "shop".to_string(),
            table_name: table.to_string(),
            name: name.to_string(),
            column_name: column.to_string(),
            order,
        }
    }

    #[test]
    fn test_group_by_constraint_sorts_by_order() {
        let rows = vec![
            make_test_fk("orders", "fk_a", "b", 2),
            make_test_fk("orders", "fk_b", "x", 1),
            make_test_fk("orders", "fk_a", "a", 1),
        ];

        let groups = group_by_constraint(&rows, "shop", "orders");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "fk_a");
        assert_eq!(groups[0].column_names(), vec!["a", "b"]);
        assert_eq!(groups[1].name, "fk_b");
    }

    #[test]
    fn test_group_by_constraint_drops_duplicates() {
        let rows = vec![
            pk("orders", "PRIMARY", "id", 1),
            pk("orders", "PRIMARY", "id", 1),
            pk("orders", "PRIMARY", "line", 2),
        ];
        let groups = group_by_constraint(&rows, "shop", "orders");
        assert_eq!(groups[0].column_names(), vec!["id", "line"]);
    }

    #[test]
    fn test_group_by_constraint_scopes_to_table() {
        // Same constraint name on two tables forms two separate keys.
        let rows = vec![pk("orders", "PRIMARY", "id", 1), pk("items", "PRIMARY", "sku", 1)];
        let groups = group_by_constraint(&rows, "shop", "items");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].column_names(), vec!["sku"]);
    }

    #[test]
    fn test_columns_of_sorted_by_order() {
        let table = make_test_table("orders");
        let schema = SchemaInfo {
            tables: vec![table.clone()],
            table_columns: vec![
                make_test_column("orders", "code", "varchar", 3),
                make_test_column("orders", "id", "int", 1),
                make_test_column("orders", "customer_id", "int", 2),
                make_test_column("other", "zzz", "int", 0),
            ],
            ..Default::default()
        };
        let names: Vec<_> = schema.columns_of(&table).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer_id", "code"]);
    }

    #[test]
    fn test_is_key_column() {
        let schema = SchemaInfo {
            table_primary_keys: vec![pk("orders", "PRIMARY", "id", 1)],
            ..Default::default()
        };
        assert!(schema.is_key_column(&make_test_column("orders", "id", "int", 1)));
        assert!(!schema.is_key_column(&make_test_column("orders", "code", "varchar", 2)));
    }

    #[test]
    fn test_rehome_updates_fk_reference_owner() {
        let mut schema = SchemaInfo {
            table_foreign_keys: vec![make_test_fk("orders", "fk", "customer_id", 1)],
            ..Default::default()
        };
        schema.rehome("public");
        assert_eq!(schema.table_foreign_keys[0].owner, "public");
        assert_eq!(schema.table_foreign_keys[0].referenced_owner, "public");
    }

    #[test]
    fn test_db_object_kind_keyword() {
        let obj = DbObject::View(View {
            owner: "shop".into(),
            name: "v".into(),
            definition: None,
        });
        assert_eq!(obj.kind().keyword(), "VIEW");
        assert_eq!(obj.table_name(), None);
        assert_eq!(DatabaseObjectKind::TableForeignKey.keyword(), "FOREIGN KEY");
    }
}
