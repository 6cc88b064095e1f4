//! Ordered, append-only script buffer.
//!
//! A script is a list of fragments tagged by object kind and phase. A
//! statement spans one `Begin` fragment, any number of `Body` fragments and
//! one `End` fragment; single-fragment statements are stored as `End`.
//! Serialization appends the dialect's terminator after every `End`.
//!
//! Object kinds must be appended in replay order:
//! functions, tables (with each table's index and comment statements right
//! after it), views, triggers, procedures. Replaying the script top to bottom
//! against an empty database then never hits a forward reference.

use serde::Serialize;

/// Kind of object a fragment belongs to, in replay order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    UserDefinedType,
    Function,
    Table,
    TableIndex,
    TableComment,
    View,
    TableTrigger,
    Procedure,
    /// Session toggles (constraint checks, identity insert).
    Session,
    /// Data rows.
    Data,
}

impl ScriptKind {
    /// Replay rank; `None` for kinds outside the schema ordering.
    fn rank(&self) -> Option<u8> {
        match self {
            ScriptKind::UserDefinedType => Some(0),
            ScriptKind::Function => Some(1),
            ScriptKind::Table | ScriptKind::TableIndex | ScriptKind::TableComment => Some(2),
            ScriptKind::View => Some(3),
            ScriptKind::TableTrigger => Some(4),
            ScriptKind::Procedure => Some(5),
            ScriptKind::Session | ScriptKind::Data => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    Begin,
    Body,
    End,
}

/// How statements are terminated in serialized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementTerminator {
    /// `;` right after the statement.
    Semicolon,
    /// A `GO` batch separator on its own line.
    BatchSeparator,
}

impl StatementTerminator {
    fn apply(&self, statement: &str) -> String {
        match self {
            StatementTerminator::Semicolon => format!("{};", statement),
            StatementTerminator::BatchSeparator => format!("{}\nGO", statement),
        }
    }
}

/// One rendered piece of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptFragment {
    pub kind: ScriptKind,
    pub phase: ScriptPhase,
    /// Object the fragment belongs to (table name for index/comment fragments).
    pub object_name: String,
    pub text: String,
}

impl ScriptFragment {
    pub fn begin(kind: ScriptKind, object_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(kind, ScriptPhase::Begin, object_name, text)
    }

    pub fn body(kind: ScriptKind, object_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(kind, ScriptPhase::Body, object_name, text)
    }

    pub fn end(kind: ScriptKind, object_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(kind, ScriptPhase::End, object_name, text)
    }

    fn new(
        kind: ScriptKind,
        phase: ScriptPhase,
        object_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            phase,
            object_name: object_name.into(),
            text: text.into(),
        }
    }
}

/// A complete executable statement assembled from fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStatement {
    pub kind: ScriptKind,
    pub object_name: String,
    pub sql: String,
}

/// Ordered buffer of script fragments.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptBuilder {
    fragments: Vec<ScriptFragment>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fragment: ScriptFragment) {
        self.fragments.push(fragment);
    }

    pub fn append_range(&mut self, fragments: impl IntoIterator<Item = ScriptFragment>) {
        self.fragments.extend(fragments);
    }

    /// Append a statement that fits in one fragment.
    pub fn append_statement(
        &mut self,
        kind: ScriptKind,
        object_name: impl Into<String>,
        sql: impl Into<String>,
    ) {
        self.append(ScriptFragment::end(kind, object_name, sql));
    }

    /// Move all fragments of `other` to the end of this builder.
    pub fn extend(&mut self, other: ScriptBuilder) {
        self.fragments.extend(other.fragments);
    }

    pub fn fragments(&self) -> &[ScriptFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Assemble fragments into complete statements.
    ///
    /// Fragments left open at the end (no closing `End`) form a final
    /// statement of their own.
    pub fn statements(&self) -> Vec<ScriptStatement> {
        let mut statements = Vec::new();
        let mut open: Option<ScriptStatement> = None;

        for fragment in &self.fragments {
            let current = open.get_or_insert_with(|| ScriptStatement {
                kind: fragment.kind,
                object_name: fragment.object_name.clone(),
                sql: String::new(),
            });
            if !current.sql.is_empty() {
                current.sql.push('\n');
            }
            current.sql.push_str(&fragment.text);

            if fragment.phase == ScriptPhase::End {
                if let Some(done) = open.take() {
                    statements.push(done);
                }
            }
        }

        if let Some(rest) = open {
            statements.push(rest);
        }
        statements
    }

    /// Serialize to one text blob. Statements of different objects are
    /// separated by a blank line.
    pub fn to_script(&self, terminator: StatementTerminator) -> String {
        let mut out = String::new();
        let mut previous: Option<(ScriptKind, String)> = None;

        for statement in self.statements() {
            if let Some((kind, name)) = &previous {
                let same_object = *kind == statement.kind && *name == statement.object_name;
                out.push_str(if same_object { "\n" } else { "\n\n" });
            }
            out.push_str(&terminator.apply(&statement.sql));
            previous = Some((statement.kind, statement.object_name));
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Check that schema fragments respect replay order.
    ///
    /// Index and comment fragments must follow their own table's fragments.
    pub fn is_replay_ordered(&self) -> bool {
        let mut last_rank = 0u8;
        let mut tables_seen: Vec<&str> = Vec::new();

        for fragment in &self.fragments {
            let Some(rank) = fragment.kind.rank() else {
                continue;
            };
            if rank < last_rank {
                return false;
            }
            last_rank = rank;

            match fragment.kind {
                ScriptKind::Table => tables_seen.push(&fragment.object_name),
                ScriptKind::TableIndex | ScriptKind::TableComment => {
                    if !tables_seen.contains(&fragment.object_name.as_str()) {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_fragments(name: &str) -> Vec<ScriptFragment> {
        vec![
            ScriptFragment::begin(ScriptKind::Table, name, format!("CREATE TABLE `{}`(", name)),
            ScriptFragment::body(ScriptKind::Table, name, "`id` int NOT NULL"),
            ScriptFragment::end(ScriptKind::Table, name, ")"),
        ]
    }

    #[test]
    fn test_statements_assemble_phases() {
        let mut builder = ScriptBuilder::new();
        builder.append_range(table_fragments("orders"));
        builder.append_statement(
            ScriptKind::TableIndex,
            "orders",
            "ALTER TABLE `orders` ADD INDEX `ix`(`id`)",
        );

        let statements = builder.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].sql, "CREATE TABLE `orders`(\n`id` int NOT NULL\n)");
        assert_eq!(statements[1].kind, ScriptKind::TableIndex);
    }

    #[test]
    fn test_to_script_semicolon() {
        let mut builder = ScriptBuilder::new();
        builder.append_range(table_fragments("orders"));
        builder.append_statement(ScriptKind::View, "v", "CREATE VIEW v AS SELECT 1");

        let text = builder.to_script(StatementTerminator::Semicolon);
        assert_eq!(
            text,
            "CREATE TABLE `orders`(\n`id` int NOT NULL\n);\n\nCREATE VIEW v AS SELECT 1;\n"
        );
    }

    #[test]
    fn test_to_script_batch_separator() {
        let mut builder = ScriptBuilder::new();
        builder.append_statement(ScriptKind::Procedure, "p", "CREATE PROCEDURE p AS SELECT 1");
        let text = builder.to_script(StatementTerminator::BatchSeparator);
        assert_eq!(text, "CREATE PROCEDURE p AS SELECT 1\nGO\n");
    }

    #[test]
    fn test_empty_builder_serializes_empty() {
        assert_eq!(ScriptBuilder::new().to_script(StatementTerminator::Semicolon), "");
    }

    #[test]
    fn test_unterminated_statement_is_flushed() {
        let mut builder = ScriptBuilder::new();
        builder.append(ScriptFragment::begin(ScriptKind::Table, "t", "CREATE TABLE t("));
        builder.append(ScriptFragment::body(ScriptKind::Table, "t", "a int"));
        assert_eq!(builder.statements().len(), 1);
    }

    #[test]
    fn test_replay_order_accepts_canonical_sequence() {
        let mut builder = ScriptBuilder::new();
        builder.append_statement(ScriptKind::Function, "f", "CREATE FUNCTION f() ...");
        builder.append_range(table_fragments("customers"));
        builder.append_range(table_fragments("orders"));
        builder.append_statement(ScriptKind::TableIndex, "orders", "ALTER TABLE ...");
        builder.append_statement(ScriptKind::View, "v", "CREATE VIEW v ...");
        builder.append_statement(ScriptKind::TableTrigger, "tr", "CREATE TRIGGER tr ...");
        builder.append_statement(ScriptKind::Procedure, "p", "CREATE PROCEDURE p ...");
        assert!(builder.is_replay_ordered());
    }

    #[test]
    fn test_replay_order_rejects_view_before_table() {
        let mut builder = ScriptBuilder::new();
        builder.append_statement(ScriptKind::View, "v", "CREATE VIEW v ...");
        builder.append_range(table_fragments("orders"));
        assert!(!builder.is_replay_ordered());
    }

    #[test]
    fn test_replay_order_rejects_index_before_its_table() {
        let mut builder = ScriptBuilder::new();
        builder.append_range(table_fragments("customers"));
        builder.append_statement(ScriptKind::TableIndex, "orders", "ALTER TABLE ...");
        builder.append_range(table_fragments("orders"));
        assert!(!builder.is_replay_ordered());
    }

    #[test]
    fn test_session_and_data_ignored_by_order_check() {
        let mut builder = ScriptBuilder::new();
        builder.append_statement(ScriptKind::Session, "", "SET FOREIGN_KEY_CHECKS = 0");
        builder.append_statement(ScriptKind::Data, "orders", "INSERT INTO ...");
        builder.append_statement(ScriptKind::Session, "", "SET FOREIGN_KEY_CHECKS = 1");
        assert!(builder.is_replay_ordered());
    }
}
