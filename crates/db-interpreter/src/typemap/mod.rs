//! Column type translation between dialects.
//!
//! Types go through the canonical hub in [`canonical`]; see [`TypeTranslator`].

pub mod canonical;
mod mssql;
mod mysql;
mod postgres;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::schema::{SchemaInfo, TableColumn, UserDefinedType};
use crate::error::{InterpretError, Result};

pub use canonical::{
    CanonicalType, CanonicalTypeInfo, ComposedMapper, FromCanonical, NativeType, ToCanonical,
    TypeMapping,
};
pub use mssql::MssqlTypes;
pub use mysql::MysqlTypes;
pub use postgres::PostgresTypes;

fn to_canonical_for(dialect: &str) -> Result<Arc<dyn ToCanonical>> {
    match dialect {
        "mysql" => Ok(Arc::new(MysqlTypes)),
        "postgres" => Ok(Arc::new(PostgresTypes)),
        "mssql" => Ok(Arc::new(MssqlTypes)),
        other => Err(InterpretError::Config(format!(
            "No type mapping for dialect '{}'",
            other
        ))),
    }
}

fn from_canonical_for(dialect: &str) -> Result<Arc<dyn FromCanonical>> {
    match dialect {
        "mysql" => Ok(Arc::new(MysqlTypes)),
        "postgres" => Ok(Arc::new(PostgresTypes)),
        "mssql" => Ok(Arc::new(MssqlTypes)),
        other => Err(InterpretError::Config(format!(
            "No type mapping for dialect '{}'",
            other
        ))),
    }
}

/// Rewrites column types from a source dialect to a target dialect.
///
/// Same-dialect translation is the identity.
#[derive(Debug)]
pub struct TypeTranslator {
    mapper: Option<ComposedMapper>,
}

impl TypeTranslator {
    /// Translator between two dialect names (as returned by `Dialect::name`).
    pub fn for_dialects(source: &str, target: &str) -> Result<Self> {
        if source == target {
            return Ok(Self { mapper: None });
        }
        let mapper = ComposedMapper::new(to_canonical_for(source)?, from_canonical_for(target)?);
        Ok(Self {
            mapper: Some(mapper),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.mapper.is_none()
    }

    /// Translate one column in place. Returns the lossy-conversion warning,
    /// if any.
    pub fn translate_column(&self, column: &mut TableColumn) -> Option<String> {
        let mapper = self.mapper.as_ref()?;
        let mapping = mapper.map_type(&NativeType {
            data_type: &column.data_type,
            max_length: column.max_length,
            precision: column.precision,
            scale: column.scale,
        });

        if let CanonicalType::Unknown(_) = canonical_of(mapper, column) {
            warn!(
                "No {} mapping for {}.{} type '{}'; kept as declared",
                mapper.target_dialect(),
                column.table_name,
                column.name,
                column.data_type
            );
        }

        debug!(
            "{}.{}: {} -> {}",
            column.table_name, column.name, column.data_type, mapping.data_type
        );
        column.data_type = mapping.data_type;
        column.max_length = mapping.max_length;
        column.precision = mapping.precision;
        column.scale = mapping.scale;
        column.default_value = column
            .default_value
            .take()
            .and_then(|value| normalize_default(&value, mapper.target_dialect()));
        mapping.warning
    }

    fn translate_udt(&self, udt: &mut UserDefinedType) {
        let Some(mapper) = self.mapper.as_ref() else {
            return;
        };
        let mapping = mapper.map_type(&NativeType {
            data_type: &udt.data_type,
            max_length: udt.max_length,
            precision: udt.precision,
            scale: udt.scale,
        });
        udt.data_type = mapping.data_type;
        udt.max_length = mapping.max_length;
        udt.precision = mapping.precision;
        udt.scale = mapping.scale;
    }

    /// Translate every column of a snapshot.
    ///
    /// Columns typed by a user-defined type are resolved to the type's base
    /// definition first unless `keep_user_types` is set and the target can
    /// create them; without `keep_user_types` the types are dropped.
    pub fn translate_schema(&self, schema: &mut SchemaInfo, keep_user_types: bool) -> Vec<String> {
        if self.is_identity() {
            return Vec::new();
        }

        if !keep_user_types {
            inline_user_types(schema);
        }

        let mut warnings = Vec::new();
        for column in &mut schema.table_columns {
            if keep_user_types
                && schema
                    .user_defined_types
                    .iter()
                    .any(|t| t.name.eq_ignore_ascii_case(&column.data_type))
            {
                continue;
            }
            if let Some(warning) = self.translate_column(column) {
                warnings.push(format!("{}.{}: {}", column.table_name, column.name, warning));
            }
        }
        for udt in &mut schema.user_defined_types {
            self.translate_udt(udt);
        }

        for warning in &warnings {
            warn!("Lossy type conversion: {}", warning);
        }
        warnings
    }
}

fn canonical_of(mapper: &ComposedMapper, column: &TableColumn) -> CanonicalType {
    let source = match mapper.source_dialect() {
        "mysql" => MysqlTypes.to_canonical(&native_of(column)),
        "postgres" => PostgresTypes.to_canonical(&native_of(column)),
        _ => MssqlTypes.to_canonical(&native_of(column)),
    };
    source.canonical_type
}

fn native_of(column: &TableColumn) -> NativeType<'_> {
    NativeType {
        data_type: &column.data_type,
        max_length: column.max_length,
        precision: column.precision,
        scale: column.scale,
    }
}

/// Replace columns typed by a user-defined type with the type's base
/// definition, then drop the types.
fn inline_user_types(schema: &mut SchemaInfo) {
    let types = std::mem::take(&mut schema.user_defined_types);
    for column in &mut schema.table_columns {
        if let Some(udt) = types
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(&column.data_type))
        {
            debug!(
                "{}.{}: resolved user type {} to {}",
                column.table_name, column.name, udt.name, udt.data_type
            );
            column.data_type = udt.data_type.clone();
            column.max_length = udt.max_length;
            column.precision = udt.precision;
            column.scale = udt.scale;
            if !udt.is_nullable {
                column.is_nullable = false;
            }
        }
    }
}

/// Rewrite a catalog default for another dialect.
///
/// SQL Server wraps defaults in parentheses, PostgreSQL appends `::type`
/// casts; both are stripped. Current-time functions become
/// `CURRENT_TIMESTAMP`. Sequence defaults (`nextval(...)`) are dropped since
/// the identity clause replaces them.
pub fn normalize_default(value: &str, target: &str) -> Option<String> {
    let mut v = value.trim();
    while v.len() >= 2 && v.starts_with('(') && v.ends_with(')') && balanced(&v[1..v.len() - 1]) {
        v = v[1..v.len() - 1].trim();
    }

    let lower = v.to_lowercase();
    if lower.starts_with("nextval(") {
        return None;
    }

    // only a cast after the last quote is a cast
    let mut out = match v.rfind("::") {
        Some(pos) if !v[pos..].contains('\'') => v[..pos].trim_end().to_string(),
        _ => v.to_string(),
    };

    let lower = out.to_lowercase();
    if matches!(
        lower.as_str(),
        "getdate()" | "sysdatetime()" | "now()" | "current_timestamp()" | "localtimestamp"
    ) {
        out = "CURRENT_TIMESTAMP".to_string();
    }

    if target != "mssql" && out.starts_with("N'") {
        out.remove(0);
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn balanced(inner: &str) -> bool {
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::make_test_column;

    #[test]
    fn test_same_dialect_is_identity() {
        let translator = TypeTranslator::for_dialects("mysql", "mysql").unwrap();
        let mut column = make_test_column("orders", "code", "varchar", 1);
        column.max_length = Some(600);
        assert!(translator.translate_column(&mut column).is_none());
        assert_eq!(column.data_type, "varchar");
        assert_eq!(column.max_length, Some(600));
    }

    #[test]
    fn test_mssql_to_postgres_column() {
        let translator = TypeTranslator::for_dialects("mssql", "postgres").unwrap();
        let mut column = make_test_column("orders", "notes", "nvarchar", 1);
        column.max_length = Some(-1);
        column.default_value = Some("(N'none')".to_string());
        translator.translate_column(&mut column);
        assert_eq!(column.data_type, "text");
        assert_eq!(column.max_length, None);
        assert_eq!(column.default_value.as_deref(), Some("'none'"));
    }

    #[test]
    fn test_mysql_to_mssql_keeps_length() {
        let translator = TypeTranslator::for_dialects("mysql", "mssql").unwrap();
        let mut column = make_test_column("orders", "code", "varchar(600)", 1);
        translator.translate_column(&mut column);
        assert_eq!(column.data_type, "nvarchar");
        assert_eq!(column.max_length, Some(600));
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let translator = TypeTranslator::for_dialects("postgres", "mysql").unwrap();
        let mut column = make_test_column("shapes", "area", "geometry", 1);
        translator.translate_column(&mut column);
        assert_eq!(column.data_type, "geometry");
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        assert!(TypeTranslator::for_dialects("oracle", "mysql").is_err());
    }

    #[test]
    fn test_user_types_inlined() {
        let translator = TypeTranslator::for_dialects("mssql", "mysql").unwrap();
        let mut schema = SchemaInfo {
            user_defined_types: vec![UserDefinedType {
                owner: "dbo".to_string(),
                name: "Phone".to_string(),
                data_type: "varchar".to_string(),
                max_length: Some(20),
                precision: None,
                scale: None,
                is_nullable: false,
            }],
            table_columns: vec![make_test_column("customers", "phone", "Phone", 1)],
            ..Default::default()
        };

        translator.translate_schema(&mut schema, false);
        assert!(schema.user_defined_types.is_empty());
        let column = &schema.table_columns[0];
        assert_eq!(column.data_type, "varchar");
        assert_eq!(column.max_length, Some(20));
        assert!(!column.is_nullable);
    }

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default("((0))", "postgres").as_deref(), Some("0"));
        assert_eq!(normalize_default("(getdate())", "mysql").as_deref(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(normalize_default("'new'::character varying", "mssql").as_deref(), Some("'new'"));
        assert_eq!(normalize_default("nextval('orders_id_seq'::regclass)", "mysql"), None);
        assert_eq!(normalize_default("now()", "mssql").as_deref(), Some("CURRENT_TIMESTAMP"));
    }
}
