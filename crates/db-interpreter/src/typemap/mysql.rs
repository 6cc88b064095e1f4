//! MySQL/MariaDB native ↔ canonical types.

use super::canonical::{
    CanonicalType, CanonicalTypeInfo, FromCanonical, NativeType, ToCanonical, TypeMapping, UNBOUNDED,
};

/// Longest VARCHAR worth keeping; longer strings become LONGTEXT.
const MAX_VARCHAR: i64 = 16383;
const MAX_CHAR: i64 = 255;
const MAX_VARBINARY: i64 = 65535;

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlTypes;

impl ToCanonical for MysqlTypes {
    fn dialect_name(&self) -> &str {
        "mysql"
    }

    fn to_canonical(&self, native: &NativeType<'_>) -> CanonicalTypeInfo {
        let base = native.base();
        let canonical = match base.as_str() {
            "bool" | "boolean" => CanonicalType::Boolean,
            "tinyint" if native.declared_args().first() == Some(&1) => CanonicalType::Boolean,
            "tinyint" if native.is_unsigned() => CanonicalType::Int16,
            "tinyint" => CanonicalType::Int8,
            "smallint" if native.is_unsigned() => CanonicalType::Int32,
            "smallint" => CanonicalType::Int16,
            "mediumint" => CanonicalType::Int32,
            "int" | "integer" if native.is_unsigned() => CanonicalType::Int64,
            "int" | "integer" => CanonicalType::Int32,
            "bigint" if native.is_unsigned() => CanonicalType::Decimal {
                precision: 20,
                scale: 0,
            },
            "bigint" => CanonicalType::Int64,
            "float" => CanonicalType::Float32,
            "double" | "double precision" | "real" => CanonicalType::Float64,
            "decimal" | "numeric" | "dec" | "fixed" => {
                let (precision, scale) = native.precision_scale();
                CanonicalType::Decimal { precision, scale }
            }
            "char" => CanonicalType::Char(native.length()),
            "varchar" => CanonicalType::Varchar(native.length()),
            "tinytext" | "text" | "mediumtext" | "longtext" => CanonicalType::Text,
            "binary" => CanonicalType::Binary(native.length()),
            "varbinary" => CanonicalType::Varbinary(native.length()),
            "tinyblob" | "blob" | "mediumblob" | "longblob" => CanonicalType::Blob,
            "date" => CanonicalType::Date,
            "time" => CanonicalType::Time,
            "datetime" | "timestamp" => CanonicalType::DateTime,
            "json" => CanonicalType::Json,
            "year" => {
                return CanonicalTypeInfo::lossy(CanonicalType::Int16, "YEAR stored as a small integer.")
            }
            "enum" | "set" => {
                return CanonicalTypeInfo::lossy(
                    CanonicalType::Varchar(255),
                    format!("{} values are not enforced after conversion.", base.to_uppercase()),
                )
            }
            "bit" if native.length() <= 1 => CanonicalType::Boolean,
            "bit" => {
                return CanonicalTypeInfo::lossy(CanonicalType::Int64, "BIT(n) stored as an integer.")
            }
            _ => CanonicalType::Unknown(native.data_type.to_string()),
        };
        CanonicalTypeInfo::lossless(canonical)
    }
}

impl FromCanonical for MysqlTypes {
    fn dialect_name(&self) -> &str {
        "mysql"
    }

    fn from_canonical(&self, canonical: &CanonicalType) -> TypeMapping {
        match canonical {
            CanonicalType::Boolean => TypeMapping::plain("tinyint(1)"),
            CanonicalType::Int8 => TypeMapping::plain("tinyint"),
            CanonicalType::Int16 => TypeMapping::plain("smallint"),
            CanonicalType::Int32 => TypeMapping::plain("int"),
            CanonicalType::Int64 => TypeMapping::plain("bigint"),
            CanonicalType::Float32 => TypeMapping::plain("float"),
            CanonicalType::Float64 => TypeMapping::plain("double"),
            CanonicalType::Decimal { precision, scale } if *precision > 65 => {
                TypeMapping::numeric("decimal", 65, (*scale).min(30))
                    .lossy(format!("Precision {} exceeds MySQL maximum of 65.", precision))
            }
            CanonicalType::Decimal { precision, scale } => {
                TypeMapping::numeric("decimal", *precision, *scale)
            }
            CanonicalType::Money => TypeMapping::numeric("decimal", 19, 4),
            CanonicalType::Char(n) if *n > 0 && *n <= MAX_CHAR => TypeMapping::sized("char", *n),
            CanonicalType::Char(n) | CanonicalType::Varchar(n) if *n > 0 && *n <= MAX_VARCHAR => {
                TypeMapping::sized("varchar", *n)
            }
            CanonicalType::Char(_) | CanonicalType::Varchar(_) | CanonicalType::Text => {
                TypeMapping::plain("longtext")
            }
            CanonicalType::Binary(n) if *n > 0 && *n <= MAX_CHAR => TypeMapping::sized("binary", *n),
            CanonicalType::Binary(n) | CanonicalType::Varbinary(n)
                if *n != UNBOUNDED && *n > 0 && *n <= MAX_VARBINARY =>
            {
                TypeMapping::sized("varbinary", *n)
            }
            CanonicalType::Binary(_) | CanonicalType::Varbinary(_) | CanonicalType::Blob => {
                TypeMapping::plain("longblob")
            }
            CanonicalType::Date => TypeMapping::plain("date"),
            CanonicalType::Time => TypeMapping::plain("time"),
            CanonicalType::DateTime => TypeMapping::plain("datetime"),
            CanonicalType::DateTimeTz => {
                TypeMapping::plain("datetime").lossy("Timezone offset is dropped.")
            }
            CanonicalType::Uuid => TypeMapping::sized("char", 36),
            CanonicalType::Json => TypeMapping::plain("json"),
            CanonicalType::Xml => TypeMapping::plain("longtext"),
            CanonicalType::Unknown(name) => TypeMapping::plain(name.clone()),
        }
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
    fn test_to_canonical() {
        let types = MysqlTypes;
        assert_eq!(types.to_canonical(&native("tinyint(1)")).canonical_type, CanonicalType::Boolean);
        assert_eq!(types.to_canonical(&native("int(11)")).canonical_type, CanonicalType::Int32);
        assert_eq!(
            types.to_canonical(&native("int unsigned")).canonical_type,
            CanonicalType::Int64
        );
        assert_eq!(
            types.to_canonical(&native("varchar(600)")).canonical_type,
            CanonicalType::Varchar(600)
        );
        assert_eq!(
            types.to_canonical(&native("decimal(10,2)")).canonical_type,
            CanonicalType::Decimal { precision: 10, scale: 2 }
        );
        assert!(types.to_canonical(&native("enum('a','b')")).is_lossy);
    }

    #[test]
    fn test_from_canonical() {
        let types = MysqlTypes;
        assert_eq!(types.from_canonical(&CanonicalType::Varchar(100)), TypeMapping::sized("varchar", 100));
        assert_eq!(types.from_canonical(&CanonicalType::Varchar(UNBOUNDED)).data_type, "longtext");
        assert_eq!(types.from_canonical(&CanonicalType::Uuid), TypeMapping::sized("char", 36));
        assert!(types.from_canonical(&CanonicalType::DateTimeTz).is_lossy);
    }
}
