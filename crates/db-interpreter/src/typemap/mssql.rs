//! SQL Server native ↔ canonical types.
//!
//! Character data always lands in the Unicode types (`nchar`/`nvarchar`).

use super::canonical::{
    CanonicalType, CanonicalTypeInfo, FromCanonical, NativeType, ToCanonical, TypeMapping, UNBOUNDED,
};

const MAX_NVARCHAR: i64 = 4000;
const MAX_VARBINARY: i64 = 8000;

#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlTypes;

impl ToCanonical for MssqlTypes {
    fn dialect_name(&self) -> &str {
        "mssql"
    }

    fn to_canonical(&self, native: &NativeType<'_>) -> CanonicalTypeInfo {
        let canonical = match native.base().as_str() {
            "bit" => CanonicalType::Boolean,
            // tinyint is unsigned (0-255)
            "tinyint" | "smallint" => CanonicalType::Int16,
            "int" => CanonicalType::Int32,
            "bigint" => CanonicalType::Int64,
            "real" => CanonicalType::Float32,
            "float" => CanonicalType::Float64,
            "decimal" | "numeric" => {
                let (precision, scale) = native.precision_scale();
                CanonicalType::Decimal { precision, scale }
            }
            "money" | "smallmoney" => CanonicalType::Money,
            "char" | "nchar" => CanonicalType::Char(native.length()),
            "varchar" | "nvarchar" => CanonicalType::Varchar(native.length()),
            "text" | "ntext" => CanonicalType::Text,
            "binary" => CanonicalType::Binary(native.length()),
            "varbinary" => CanonicalType::Varbinary(native.length()),
            "image" => CanonicalType::Blob,
            "date" => CanonicalType::Date,
            "time" => CanonicalType::Time,
            "datetime" | "datetime2" | "smalldatetime" => CanonicalType::DateTime,
            "datetimeoffset" => CanonicalType::DateTimeTz,
            "uniqueidentifier" => CanonicalType::Uuid,
            "xml" => CanonicalType::Xml,
            "rowversion" | "timestamp" => {
                return CanonicalTypeInfo::lossy(
                    CanonicalType::Binary(8),
                    "ROWVERSION values are copied as plain binary.",
                )
            }
            "sql_variant" | "hierarchyid" | "geography" | "geometry" => {
                return CanonicalTypeInfo::lossy(
                    CanonicalType::Text,
                    format!("{} stored as text.", native.base()),
                )
            }
            _ => CanonicalType::Unknown(native.data_type.to_string()),
        };
        CanonicalTypeInfo::lossless(canonical)
    }
}

impl FromCanonical for MssqlTypes {
    fn dialect_name(&self) -> &str {
        "mssql"
    }

    fn from_canonical(&self, canonical: &CanonicalType) -> TypeMapping {
        match canonical {
            CanonicalType::Boolean => TypeMapping::plain("bit"),
            CanonicalType::Int8 | CanonicalType::Int16 => TypeMapping::plain("smallint"),
            CanonicalType::Int32 => TypeMapping::plain("int"),
            CanonicalType::Int64 => TypeMapping::plain("bigint"),
            CanonicalType::Float32 => TypeMapping::plain("real"),
            CanonicalType::Float64 => TypeMapping::plain("float"),
            CanonicalType::Decimal { precision, scale } if *precision > 38 => {
                TypeMapping::numeric("decimal", 38, (*scale).min(38))
                    .lossy(format!("Precision {} exceeds SQL Server maximum of 38.", precision))
            }
            CanonicalType::Decimal { precision, scale } => {
                TypeMapping::numeric("decimal", *precision, *scale)
            }
            CanonicalType::Money => TypeMapping::plain("money"),
            CanonicalType::Char(n) if *n > 0 && *n <= MAX_NVARCHAR => TypeMapping::sized("nchar", *n),
            CanonicalType::Varchar(n) if *n > 0 && *n <= MAX_NVARCHAR => {
                TypeMapping::sized("nvarchar", *n)
            }
            CanonicalType::Char(_)
            | CanonicalType::Varchar(_)
            | CanonicalType::Text
            | CanonicalType::Json => TypeMapping::sized("nvarchar", UNBOUNDED),
            CanonicalType::Binary(n) if *n > 0 && *n <= MAX_VARBINARY => {
                TypeMapping::sized("binary", *n)
            }
            CanonicalType::Varbinary(n) if *n > 0 && *n <= MAX_VARBINARY => {
                TypeMapping::sized("varbinary", *n)
            }
            CanonicalType::Binary(_) | CanonicalType::Varbinary(_) | CanonicalType::Blob => {
                TypeMapping::sized("varbinary", UNBOUNDED)
            }
            CanonicalType::Date => TypeMapping::plain("date"),
            CanonicalType::Time => TypeMapping::plain("time"),
            CanonicalType::DateTime => TypeMapping::plain("datetime2"),
            CanonicalType::DateTimeTz => TypeMapping::plain("datetimeoffset"),
            CanonicalType::Uuid => TypeMapping::plain("uniqueidentifier"),
            CanonicalType::Xml => TypeMapping::plain("xml"),
            CanonicalType::Unknown(name) => TypeMapping::plain(name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_length_marker_round_trips() {
        let types = MssqlTypes;
        let native = NativeType {
            data_type: "nvarchar",
            max_length: Some(-1),
            precision: None,
            scale: None,
        };
        let canonical = types.to_canonical(&native).canonical_type;
        assert_eq!(canonical, CanonicalType::Varchar(UNBOUNDED));
        assert_eq!(types.from_canonical(&canonical), TypeMapping::sized("nvarchar", UNBOUNDED));
    }

    #[test]
    fn test_long_strings_become_max() {
        let types = MssqlTypes;
        assert_eq!(
            types.from_canonical(&CanonicalType::Varchar(10_000)),
            TypeMapping::sized("nvarchar", UNBOUNDED)
        );
        assert_eq!(types.from_canonical(&CanonicalType::Text).max_length, Some(UNBOUNDED));
    }

    #[test]
    fn test_decimal_precision_capped() {
        let types = MssqlTypes;
        let mapping = types.from_canonical(&CanonicalType::Decimal { precision: 65, scale: 4 });
        assert_eq!(mapping.precision, Some(38));
        assert!(mapping.is_lossy);
    }
}
