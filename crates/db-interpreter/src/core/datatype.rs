//! Column type rendering: length/precision inference and key-length limits.

use super::schema::TableColumn;

/// Per-dialect inputs to type rendering.
#[derive(Debug, Clone, Copy)]
pub struct TypeRules {
    /// Substrings marking types that never take a length suffix.
    pub no_length_types: &'static [&'static str],
    /// Keyword rendered for a max length of `-1` (`max` on SQL Server).
    pub max_length_keyword: Option<&'static str>,
}

const CHAR_TYPES: &[&str] = &[
    "char",
    "varchar",
    "nchar",
    "nvarchar",
    "character",
    "character varying",
    "bpchar",
    "varchar2",
    "nvarchar2",
];

const BINARY_TYPES: &[&str] = &["binary", "varbinary"];

const NUMERIC_TYPES: &[&str] = &["decimal", "numeric", "dec", "number"];

const TEXT_TYPES: &[&str] = &["text", "ntext", "tinytext", "mediumtext", "longtext", "citext", "enum", "set"];

const NUMBER_TYPES: &[&str] = &[
    "tinyint", "smallint", "mediumint", "int", "integer", "bigint", "bit", "float", "real", "double",
    "money", "smallmoney", "serial", "smallserial", "bigserial", "int2", "int4", "int8", "float4", "float8",
];

/// Lowercased type name without any `(...)` suffix or trailing modifiers.
pub fn base_type(data_type: &str) -> String {
    let head = data_type.split('(').next().unwrap_or(data_type);
    head.trim().to_lowercase()
}

/// Whether the declared type already carries an explicit length/precision.
pub fn has_explicit_length(data_type: &str) -> bool {
    data_type.contains('(')
}

pub fn is_char_type(data_type: &str) -> bool {
    CHAR_TYPES.contains(&base_type(data_type).as_str())
}

/// Character and fixed/variable binary types, which take `(MaxLength)`.
pub fn is_length_type(data_type: &str) -> bool {
    let base = base_type(data_type);
    CHAR_TYPES.contains(&base.as_str()) || BINARY_TYPES.contains(&base.as_str())
}

pub fn is_numeric_type(data_type: &str) -> bool {
    NUMERIC_TYPES.contains(&base_type(data_type).as_str())
}

/// Large-object, document and spatial types. SQL Server refuses to sort
/// `text`, `ntext`, `image` and `xml`, PostgreSQL refuses `json`, and the
/// rest are too wide to sort a whole table by.
const UNORDERABLE_TYPES: &[&str] = &[
    "text", "ntext", "tinytext", "mediumtext", "longtext", "image", "xml", "json", "jsonb", "tinyblob",
    "blob", "mediumblob", "longblob", "bytea", "geometry", "geography", "point", "linestring", "polygon",
];

pub fn is_orderable_type(data_type: &str) -> bool {
    !UNORDERABLE_TYPES.contains(&base_type(data_type).as_str())
}

/// Any type holding numbers: integers, floats, money and exact numerics.
pub fn is_number_type(data_type: &str) -> bool {
    let base = base_type(data_type);
    let head = base.split_whitespace().next().unwrap_or_default();
    NUMBER_TYPES.contains(&head) || NUMERIC_TYPES.contains(&head)
}

/// Character types including the unbounded text kinds.
pub fn is_character_type(data_type: &str) -> bool {
    let base = base_type(data_type);
    CHAR_TYPES.contains(&base.as_str()) || TEXT_TYPES.contains(&base.as_str())
}

/// Whether a character column must shrink to fit a key of `limit` characters.
pub fn exceeds_key_limit(column: &TableColumn, limit: i64) -> bool {
    if limit <= 0 || !is_char_type(&column.data_type) {
        return false;
    }
    match column.max_length {
        Some(-1) => true,
        Some(len) => len > limit,
        None => false,
    }
}

/// Replace (or add) the `(...)` suffix of a declared type.
pub fn replace_length(data_type: &str, length: &str) -> String {
    match (data_type.find('('), data_type.find(')')) {
        (Some(open), Some(close)) if close > open => format!(
            "{}({}){}",
            data_type[..open].trim_end(),
            length,
            &data_type[close + 1..]
        ),
        _ => format!("{}({})", data_type.trim_end(), length),
    }
}

/// Render a column's type with an inferred length or precision.
///
/// - character/binary types always render their `max_length`;
/// - types in the dialect's no-length set never get a suffix;
/// - exact numerics get `(precision,scale)` with scale defaulting to 0;
/// - anything already carrying `(...)` is kept as declared.
pub fn render_data_type(column: &TableColumn, rules: &TypeRules) -> String {
    let data_type = column.data_type.trim();

    if is_length_type(data_type) {
        return match column.max_length {
            Some(-1) => match rules.max_length_keyword {
                Some(keyword) => replace_length(data_type, keyword),
                None => data_type.to_string(),
            },
            Some(len) if len > 0 => replace_length(data_type, &len.to_string()),
            _ => data_type.to_string(),
        };
    }

    if has_explicit_length(data_type) {
        return data_type.to_string();
    }

    let lower = data_type.to_lowercase();
    if rules.no_length_types.iter().any(|t| lower.contains(t)) {
        return data_type.to_string();
    }

    if is_numeric_type(data_type) {
        if let Some(precision) = column.precision.filter(|p| *p > 0) {
            return format!("{}({},{})", data_type, precision, column.scale.unwrap_or(0));
        }
    }

    data_type.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: TypeRules = TypeRules {
        no_length_types: &["date", "time", "int", "text", "blob", "bit"],
        max_length_keyword: Some("max"),
    };

    fn column(data_type: &str, max_length: Option<i64>, precision: Option<i32>, scale: Option<i32>) -> TableColumn {
        TableColumn {
            data_type: data_type.to_string(),
            max_length,
            precision,
            scale,
            ..Default::default()
        }
    }

    #[test]
    fn test_char_gets_max_length() {
        assert_eq!(render_data_type(&column("varchar", Some(40), None, None), &RULES), "varchar(40)");
        assert_eq!(render_data_type(&column("nchar", Some(2), None, None), &RULES), "nchar(2)");
    }

    #[test]
    fn test_char_length_rerendered_from_max_length() {
        // Restricted columns keep the declared type text but the new length.
        let col = column("varchar(600)", Some(500), None, None);
        assert_eq!(render_data_type(&col, &RULES), "varchar(500)");
    }

    #[test]
    fn test_max_keyword() {
        let col = column("nvarchar", Some(-1), None, None);
        assert_eq!(render_data_type(&col, &RULES), "nvarchar(max)");
        let no_max = TypeRules {
            max_length_keyword: None,
            ..RULES
        };
        assert_eq!(render_data_type(&col, &no_max), "nvarchar");
    }

    #[test]
    fn test_numeric_precision_scale_default() {
        assert_eq!(
            render_data_type(&column("decimal", None, Some(10), Some(2)), &RULES),
            "decimal(10,2)"
        );
        assert_eq!(
            render_data_type(&column("numeric", None, Some(18), None), &RULES),
            "numeric(18,0)"
        );
    }

    #[test]
    fn test_no_length_types_never_suffixed() {
        for ty in ["int", "bigint", "datetime", "date", "time", "longtext", "mediumblob"] {
            let col = column(ty, Some(10), Some(19), Some(0));
            assert_eq!(render_data_type(&col, &RULES), ty);
        }
    }

    #[test]
    fn test_explicit_length_kept() {
        let col = column("decimal(12,4)", None, Some(10), Some(2));
        assert_eq!(render_data_type(&col, &RULES), "decimal(12,4)");
        let col = column("enum('a','b')", None, None, None);
        assert_eq!(render_data_type(&col, &RULES), "enum('a','b')");
    }

    #[test]
    fn test_exceeds_key_limit() {
        assert!(exceeds_key_limit(&column("varchar", Some(600), None, None), 500));
        assert!(!exceeds_key_limit(&column("varchar", Some(500), None, None), 500));
        assert!(exceeds_key_limit(&column("nvarchar", Some(-1), None, None), 450));
        assert!(!exceeds_key_limit(&column("text", Some(65535), None, None), 500));
        assert!(!exceeds_key_limit(&column("varchar", Some(600), None, None), 0));
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("VARCHAR(20)"), "varchar");
        assert_eq!(base_type("character varying"), "character varying");
        assert!(is_char_type("character varying"));
        assert!(is_length_type("varbinary"));
        assert!(!is_char_type("varbinary"));
    }
}
