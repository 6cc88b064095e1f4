//! Schema script generation.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{DbInterpreter, GeneratedScript};
use crate::core::datatype::{exceeds_key_limit, has_explicit_length, render_data_type, replace_length};
use crate::core::identifier::{normalize_index_name, truncate_identifier};
use crate::core::schema::{
    DatabaseObjectKind, KeyColumn, ScriptObject, SchemaInfo, Table, TableColumn, UserDefinedType,
};
use crate::core::traits::{is_expression_default, Dialect, QueryExecutor};
use crate::error::{InterpretError, Result};
use crate::script::{ScriptBuilder, ScriptFragment, ScriptKind};

/// Shrink character columns used by a key or index to `limit` characters.
///
/// Columns outside every key and index are left alone. Returns the number of
/// columns changed.
pub fn restrict_key_column_lengths(schema: &mut SchemaInfo, limit: i64) -> usize {
    if limit <= 0 {
        return 0;
    }

    let targets: Vec<usize> = schema
        .table_columns
        .iter()
        .enumerate()
        .filter(|(_, c)| exceeds_key_limit(c, limit) && schema.is_key_column(c))
        .map(|(i, _)| i)
        .collect();

    for &i in &targets {
        let column = &mut schema.table_columns[i];
        debug!(
            "Restricting {}.{} from {:?} to {} characters",
            column.table_name, column.name, column.max_length, limit
        );
        column.max_length = Some(limit);
        if has_explicit_length(&column.data_type) {
            column.data_type = replace_length(&column.data_type, &limit.to_string());
        }
    }
    targets.len()
}

impl<E: QueryExecutor> DbInterpreter<E> {
    /// Render a whole snapshot as one schema script.
    ///
    /// Order: user-defined types, functions, tables (each followed by its
    /// index and comment statements), views, triggers, procedures. A
    /// cancelled run returns what was rendered so far with
    /// `completed = false`.
    pub async fn generate_schema_scripts(&self, schema: &SchemaInfo) -> Result<GeneratedScript> {
        let mut schema = schema.clone();
        let restricted = restrict_key_column_lengths(&mut schema, self.dialect.key_column_max_length());
        if restricted > 0 {
            info!(
                "Restricted {} key columns to {} characters",
                restricted,
                self.dialect.key_column_max_length()
            );
        }

        info!(
            "Generating {} schema script: {} tables, {} views",
            self.dialect.name(),
            schema.tables.len(),
            schema.views.len()
        );

        let mut builder = ScriptBuilder::new();
        let mut completed = true;

        for udt in &schema.user_defined_types {
            if let Some(sql) = self.user_defined_type_sql(udt) {
                builder.append_statement(ScriptKind::UserDefinedType, &udt.name, sql);
            }
        }

        self.append_script_objects(&mut builder, ScriptKind::Function, &schema.functions)?;

        for table in replay_order(&schema) {
            if self.cancel.is_cancelled() {
                warn!("Schema generation cancelled before table {}", table.name);
                completed = false;
                break;
            }

            self.begin(DatabaseObjectKind::Table, &table.name);
            match self.table_script(&schema, table) {
                Ok(fragments) => builder.extend(fragments),
                Err(e) if self.options.skip_object_error && e.is_object_error() => {
                    warn!("Skipping table {}: {}", table.name, e);
                }
                Err(e) => return Err(e),
            }
            self.end(DatabaseObjectKind::Table, &table.name);
            tokio::task::yield_now().await;
        }

        if completed {
            self.append_script_objects(&mut builder, ScriptKind::View, &schema.views)?;
            self.append_script_objects(&mut builder, ScriptKind::TableTrigger, &schema.table_triggers)?;
            self.append_script_objects(&mut builder, ScriptKind::Procedure, &schema.procedures)?;
        }

        self.finish(builder, &self.dialect, "schema", completed).await
    }

    /// CREATE TABLE plus the table's index and comment statements.
    pub fn table_script(&self, schema: &SchemaInfo, table: &Table) -> Result<ScriptBuilder> {
        check_consistency(schema, table)?;

        let dialect = &self.dialect;
        let max_ident = dialect.max_identifier_length();
        let owner = self.script_owner(&table.owner);
        let table_name = truncate_identifier(&table.name, max_ident);
        let table_ref = dialect.qualify(owner, &table_name);
        let columns = schema.columns_of(table);

        let mut definitions: Vec<String> = columns
            .iter()
            .map(|c| self.column_definition(table, c, self.options.generate_identity))
            .collect();

        let primary_keys = schema.primary_keys_of(table);
        let mut emitted_key_columns: HashSet<Vec<String>> = HashSet::new();

        if self.options.generate_primary_key {
            if let Some(pk) = primary_keys.first() {
                let name = truncate_identifier(&primary_key_name(dialect, pk.name, &table.name), max_ident);
                let cols = pk.column_names();
                definitions.push(dialect.primary_key_clause(&name, &quote_all(dialect, &cols)));
                emitted_key_columns.insert(cols.iter().map(|c| c.to_string()).collect());
            }
        }

        if self.options.generate_foreign_key {
            for fk in schema.foreign_keys_of(table) {
                let Some(first) = fk.members.first() else {
                    continue;
                };
                let referenced: Vec<&str> = fk
                    .members
                    .iter()
                    .map(|m| m.referenced_column_name.as_str())
                    .collect();
                let referenced_owner = self.script_owner(&first.referenced_owner);
                definitions.push(format!(
                    "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON UPDATE {} ON DELETE {}",
                    dialect.quote_ident(&truncate_identifier(fk.name, max_ident)),
                    quote_all(dialect, &fk.column_names()).join(", "),
                    dialect.qualify(referenced_owner, &first.referenced_table_name),
                    quote_all(dialect, &referenced).join(", "),
                    referential_action(first.update_cascade),
                    referential_action(first.delete_cascade),
                ));
            }
        }

        let mut builder = ScriptBuilder::new();
        builder.append(ScriptFragment::begin(
            ScriptKind::Table,
            &table.name,
            dialect.create_table_header(owner, &table_name, &table_ref, self.options.not_create_if_exists),
        ));
        builder.append(ScriptFragment::body(
            ScriptKind::Table,
            &table.name,
            definitions
                .iter()
                .map(|d| format!("  {}", d))
                .collect::<Vec<_>>()
                .join(",\n"),
        ));
        let trailer = if self.options.generate_comment {
            dialect.table_trailer(table)
        } else {
            dialect.table_trailer(&Table {
                comment: None,
                ..table.clone()
            })
        };
        builder.append(ScriptFragment::end(ScriptKind::Table, &table.name, format!("){}", trailer)));

        if self.options.generate_index {
            for index in schema.indexes_of(table) {
                let cols: Vec<String> = index.column_names().iter().map(|c| c.to_string()).collect();
                if !emitted_key_columns.insert(cols) {
                    debug!("Skipping index {} on {}: same columns already keyed", index.name, table.name);
                    continue;
                }
                let quoted: Vec<String> = index
                    .members
                    .iter()
                    .map(|m| {
                        let col = dialect.quote_ident(&m.column_name);
                        if m.is_desc {
                            format!("{} DESC", col)
                        } else {
                            col
                        }
                    })
                    .collect();
                let unique = index.members.iter().any(|m| m.is_unique);
                let name = truncate_identifier(&normalize_index_name(index.name), max_ident);
                builder.append_statement(
                    ScriptKind::TableIndex,
                    &table.name,
                    dialect.index_statement(&table_ref, &name, &quoted, unique),
                );
            }
        }

        if self.options.generate_comment {
            let scripted = Table {
                owner: owner.to_string(),
                ..table.clone()
            };
            for statement in dialect.comment_statements(&scripted, &table_ref, &columns) {
                builder.append_statement(ScriptKind::TableComment, &table.name, statement);
            }
        }

        Ok(builder)
    }

    /// One column definition: name, type, charset, nullability, identity,
    /// default and inline comment.
    pub(crate) fn column_definition(&self, table: &Table, column: &TableColumn, with_identity: bool) -> String {
        let dialect = &self.dialect;
        let mut parts = vec![
            dialect.quote_ident(&column.name),
            render_data_type(column, dialect.type_rules()),
        ];

        if let Some(charset) = dialect.charset_clause(column) {
            parts.push(charset);
        }
        parts.push(if column.is_nullable { "NULL" } else { "NOT NULL" }.to_string());

        let identity = with_identity && column.is_identity;
        if identity {
            parts.push(dialect.identity_clause(table));
        } else if let Some(default) = column
            .default_value
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .filter(|d| !(column.is_identity && is_sequence_default(d)))
        {
            let value = if is_expression_default(default, &column.data_type) {
                default.trim().to_string()
            } else {
                dialect.string_literal(default)
            };
            parts.push(dialect.default_clause(&value));
        }

        if self.options.generate_comment {
            if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
                if let Some(clause) = dialect.inline_comment_clause(comment) {
                    parts.push(clause);
                }
            }
        }

        parts.join(" ")
    }

    fn user_defined_type_sql(&self, udt: &UserDefinedType) -> Option<String> {
        let as_column = TableColumn {
            data_type: udt.data_type.clone(),
            max_length: udt.max_length,
            precision: udt.precision,
            scale: udt.scale,
            ..Default::default()
        };
        let data_type = render_data_type(&as_column, self.dialect.type_rules());
        let scripted = UserDefinedType {
            owner: self.script_owner(&udt.owner).to_string(),
            ..udt.clone()
        };
        self.dialect.user_defined_type_statement(&scripted, &data_type)
    }

    fn append_script_objects<T: ScriptObject>(
        &self,
        builder: &mut ScriptBuilder,
        kind: ScriptKind,
        objects: &[T],
    ) -> Result<()> {
        for object in objects {
            match self.script_object_sql(object) {
                Ok(sql) => builder.append_statement(kind, object.name(), sql),
                Err(e) if self.options.skip_object_error && e.is_object_error() => {
                    warn!("Skipping {} {}: {}", object.kind(), object.name(), e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Definition text of a routine, view or trigger, guarded when
    /// `not_create_if_exists` is set. Tables get the same guard through
    /// [`Dialect::create_table_header`].
    pub fn script_object_sql<T: ScriptObject>(&self, object: &T) -> Result<String> {
        let definition = object
            .definition()
            .map(|d| d.trim().trim_end_matches(';').trim_end())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| InterpretError::definition_unavailable(object.kind(), object.name()))?;

        if self.options.not_create_if_exists {
            Ok(self.dialect.guard_definition(
                object.kind(),
                self.script_owner(object.owner()),
                object.name(),
                definition,
            ))
        } else {
            Ok(definition.to_string())
        }
    }
}

/// Tables ordered so referenced tables precede the tables whose foreign
/// keys point at them. Self references and cycles keep catalog order.
fn replay_order(schema: &SchemaInfo) -> Vec<&Table> {
    fn visit<'a>(index: usize, schema: &'a SchemaInfo, state: &mut [u8], out: &mut Vec<&'a Table>) {
        if state[index] != 0 {
            return;
        }
        state[index] = 1;
        let table = &schema.tables[index];
        for fk in &schema.table_foreign_keys {
            if fk.owner != table.owner || fk.table_name != table.name {
                continue;
            }
            if let Some(dep) = schema
                .tables
                .iter()
                .position(|t| t.owner == fk.referenced_owner && t.name == fk.referenced_table_name)
            {
                visit(dep, schema, state, out);
            }
        }
        state[index] = 2;
        out.push(table);
    }

    let mut state = vec![0u8; schema.tables.len()];
    let mut out = Vec::with_capacity(schema.tables.len());
    for index in 0..schema.tables.len() {
        visit(index, schema, &mut state, &mut out);
    }
    out
}

/// Reject key and index rows naming columns the table does not have.
fn check_consistency(schema: &SchemaInfo, table: &Table) -> Result<()> {
    let columns: HashSet<&str> = schema.columns_of(table).iter().map(|c| c.name.as_str()).collect();

    fn missing<'a, T: KeyColumn>(rows: &'a [T], table: &Table, columns: &HashSet<&str>) -> Option<&'a T> {
        rows.iter().find(|r| {
            r.owner() == table.owner
                && r.table_name() == table.name
                && !columns.contains(r.column_name())
        })
    }

    let orphan = missing(&schema.table_primary_keys, table, &columns)
        .map(|r| ("primary key", r.constraint_name(), r.column_name()))
        .or_else(|| {
            missing(&schema.table_foreign_keys, table, &columns)
                .map(|r| ("foreign key", r.constraint_name(), r.column_name()))
        })
        .or_else(|| {
            missing(&schema.table_indexes, table, &columns)
                .map(|r| ("index", r.constraint_name(), r.column_name()))
        });

    match orphan {
        Some((what, name, column)) => Err(InterpretError::script_generation(
            &table.name,
            format!("{} {} references missing column {}", what, name, column),
        )),
        None => Ok(()),
    }
}

/// MySQL names every primary key `PRIMARY`; other engines need a name
/// unique in the schema.
fn primary_key_name(dialect: &dyn Dialect, name: &str, table_name: &str) -> String {
    if name.is_empty() || (name.eq_ignore_ascii_case("PRIMARY") && dialect.name() != "mysql") {
        format!("PK_{}", table_name)
    } else {
        name.to_string()
    }
}

/// `nextval(...)` defaults that back a serial column; meaningless once the
/// identity property itself is not scripted.
fn is_sequence_default(default: &str) -> bool {
    default.trim().to_lowercase().starts_with("nextval(")
}

fn referential_action(cascade: bool) -> &'static str {
    if cascade {
        "CASCADE"
    } else {
        "NO ACTION"
    }
}

fn quote_all<S: AsRef<str>>(dialect: &dyn Dialect, names: &[S]) -> Vec<String> {
    names.iter().map(|n| dialect.quote_ident(n.as_ref())).collect()
}
