//! Hub-and-spoke canonical type system.
//!
//! Instead of one mapper per (source, target) pair, each dialect converts its
//! native types to a [`CanonicalType`] and back:
//!
//! ```text
//! Source DB  →  CanonicalType  →  Target DB
//!   MSSQL    →     Int32       →   MySQL
//!   MySQL    →  Varchar(600)   →   PostgreSQL
//! ```
//!
//! Adding a dialect takes two implementations ([`ToCanonical`] and
//! [`FromCanonical`]) instead of one per existing dialect.

use std::fmt;
use std::sync::Arc;

/// Length marker for `max`/unbounded character and binary types.
pub const UNBOUNDED: i64 = -1;

/// Database-agnostic intermediate type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalType {
    Boolean,
    /// 8-bit signed integer.
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Exact decimal; precision is total digits, scale digits after the point.
    Decimal { precision: i32, scale: i32 },
    /// Currency with four decimal places.
    Money,
    /// Fixed-length character string.
    Char(i64),
    /// Variable-length character string; [`UNBOUNDED`] for `max`.
    Varchar(i64),
    /// Unlimited text.
    Text,
    Binary(i64),
    /// Variable-length binary; [`UNBOUNDED`] for `max`.
    Varbinary(i64),
    /// Unlimited binary data.
    Blob,
    Date,
    Time,
    /// Date and time without timezone.
    DateTime,
    /// Date and time with timezone.
    DateTimeTz,
    Uuid,
    Json,
    Xml,
    /// Type with no canonical counterpart; carries the native name.
    Unknown(String),
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalType::Decimal { precision, scale } => write!(f, "Decimal({},{})", precision, scale),
            CanonicalType::Char(n) => write!(f, "Char({})", n),
            CanonicalType::Varchar(n) => write!(f, "Varchar({})", n),
            CanonicalType::Binary(n) => write!(f, "Binary({})", n),
            CanonicalType::Varbinary(n) => write!(f, "Varbinary({})", n),
            CanonicalType::Unknown(name) => write!(f, "Unknown({})", name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Result of converting a native type to canonical form.
#[derive(Debug, Clone)]
pub struct CanonicalTypeInfo {
    pub canonical_type: CanonicalType,
    /// Whether information was lost in the conversion.
    pub is_lossy: bool,
    pub warning: Option<String>,
}

impl CanonicalTypeInfo {
    pub fn lossless(canonical_type: CanonicalType) -> Self {
        Self {
            canonical_type,
            is_lossy: false,
            warning: None,
        }
    }

    pub fn lossy(canonical_type: CanonicalType, warning: impl Into<String>) -> Self {
        Self {
            canonical_type,
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// A native type split into the pieces a column stores.
///
/// `data_type` carries no length suffix; lengths and precision go in the
/// dedicated fields so type rendering and length restriction see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    pub data_type: String,
    pub max_length: Option<i64>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_lossy: bool,
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Plain type without length or precision.
    pub fn plain(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            max_length: None,
            precision: None,
            scale: None,
            is_lossy: false,
            warning: None,
        }
    }

    pub fn sized(data_type: impl Into<String>, max_length: i64) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::plain(data_type)
        }
    }

    pub fn numeric(data_type: impl Into<String>, precision: i32, scale: i32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::plain(data_type)
        }
    }

    /// Mark the mapping lossy with a warning.
    pub fn lossy(mut self, warning: impl Into<String>) -> Self {
        self.is_lossy = true;
        self.warning = Some(warning.into());
        self
    }
}

/// Native type as read from the catalog.
#[derive(Debug, Clone, Copy)]
pub struct NativeType<'a> {
    /// Declared type, possibly with a `(...)` suffix or modifiers.
    pub data_type: &'a str,
    pub max_length: Option<i64>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
}

impl NativeType<'_> {
    /// Lowercased type name without suffix or `unsigned`/`zerofill`
    /// modifiers.
    pub fn base(&self) -> String {
        let head = self.data_type.split('(').next().unwrap_or(self.data_type);
        head.to_lowercase()
            .replace("unsigned", "")
            .replace("zerofill", "")
            .trim()
            .to_string()
    }

    pub fn is_unsigned(&self) -> bool {
        self.data_type.to_lowercase().contains("unsigned")
    }

    /// Numbers inside the `(...)` suffix, if any.
    pub fn declared_args(&self) -> Vec<i64> {
        match (self.data_type.find('('), self.data_type.find(')')) {
            (Some(open), Some(close)) if close > open => self.data_type[open + 1..close]
                .split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Character/binary length from the catalog, else from the suffix.
    pub fn length(&self) -> i64 {
        self.max_length
            .or_else(|| self.declared_args().first().copied())
            .unwrap_or(0)
    }

    /// Precision and scale from the catalog, else from the suffix.
    pub fn precision_scale(&self) -> (i32, i32) {
        let args = self.declared_args();
        let precision = self
            .precision
            .filter(|p| *p > 0)
            .or_else(|| args.first().and_then(|p| i32::try_from(*p).ok()))
            .unwrap_or(18);
        let scale = self
            .scale
            .or_else(|| args.get(1).and_then(|s| i32::try_from(*s).ok()))
            .unwrap_or(0);
        (precision, scale)
    }
}

/// Convert native types of one dialect to canonical types.
pub trait ToCanonical: Send + Sync {
    fn dialect_name(&self) -> &str;

    fn to_canonical(&self, native: &NativeType<'_>) -> CanonicalTypeInfo;
}

/// Convert canonical types to native types of one dialect.
#[allow(clippy::wrong_self_convention)]
pub trait FromCanonical: Send + Sync {
    fn dialect_name(&self) -> &str;

    fn from_canonical(&self, canonical: &CanonicalType) -> TypeMapping;
}

/// Chains a source [`ToCanonical`] with a target [`FromCanonical`].
pub struct ComposedMapper {
    source: Arc<dyn ToCanonical>,
    target: Arc<dyn FromCanonical>,
}

impl ComposedMapper {
    pub fn new(source: Arc<dyn ToCanonical>, target: Arc<dyn FromCanonical>) -> Self {
        Self { source, target }
    }

    pub fn source_dialect(&self) -> &str {
        self.source.dialect_name()
    }

    pub fn target_dialect(&self) -> &str {
        self.target.dialect_name()
    }

    /// Map one native type, merging warnings from both steps.
    pub fn map_type(&self, native: &NativeType<'_>) -> TypeMapping {
        let canonical = self.source.to_canonical(native);
        let mut mapping = self.target.from_canonical(&canonical.canonical_type);

        if canonical.is_lossy {
            mapping.is_lossy = true;
            mapping.warning = match (canonical.warning, mapping.warning.take()) {
                (Some(src), Some(tgt)) => Some(format!("{} {}", src, tgt)),
                (Some(src), None) => Some(src),
                (None, tgt) => tgt,
            };
        }
        mapping
    }
}

impl fmt::Debug for ComposedMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedMapper")
            .field("source", &self.source.dialect_name())
            .field("target", &self.target.dialect_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(data_type: &str) -> NativeType<'_> {
        NativeType {
            data_type,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    #[test]
    fn test_native_base_strips_suffix_and_modifiers() {
        assert_eq!(native("INT(10) UNSIGNED").base(), "int");
        assert_eq!(native("varchar(600)").base(), "varchar");
        assert_eq!(native("timestamp without time zone").base(), "timestamp without time zone");
        assert!(native("bigint unsigned").is_unsigned());
    }

    #[test]
    fn test_native_length_prefers_catalog() {
        let mut t = native("varchar(600)");
        assert_eq!(t.length(), 600);
        t.max_length = Some(500);
        assert_eq!(t.length(), 500);
    }

    #[test]
    fn test_native_precision_scale() {
        assert_eq!(native("decimal(10,2)").precision_scale(), (10, 2));
        assert_eq!(native("numeric").precision_scale(), (18, 0));
    }

    #[test]
    fn test_canonical_display() {
        assert_eq!(CanonicalType::Varchar(20).to_string(), "Varchar(20)");
        assert_eq!(CanonicalType::Uuid.to_string(), "Uuid");
        assert_eq!(
            CanonicalType::Decimal { precision: 10, scale: 2 }.to_string(),
            "Decimal(10,2)"
        );
    }
}
