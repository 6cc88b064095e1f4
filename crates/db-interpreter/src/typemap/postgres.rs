//! PostgreSQL native ↔ canonical types.

use super::canonical::{
    CanonicalType, CanonicalTypeInfo, FromCanonical, NativeType, ToCanonical, TypeMapping,
};

/// Longest `varchar(n)` PostgreSQL accepts.
const MAX_VARCHAR: i64 = 10_485_760;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTypes;

impl ToCanonical for PostgresTypes {
    fn dialect_name(&self) -> &str {
        "postgres"
    }

    fn to_canonical(&self, native: &NativeType<'_>) -> CanonicalTypeInfo {
        let canonical = match native.base().as_str() {
            "bool" | "boolean" => CanonicalType::Boolean,
            "smallint" | "int2" | "smallserial" => CanonicalType::Int16,
            "integer" | "int" | "int4" | "serial" => CanonicalType::Int32,
            "bigint" | "int8" | "bigserial" => CanonicalType::Int64,
            "real" | "float4" => CanonicalType::Float32,
            "double precision" | "float8" => CanonicalType::Float64,
            "numeric" | "decimal" => {
                let (precision, scale) = native.precision_scale();
                CanonicalType::Decimal { precision, scale }
            }
            "money" => CanonicalType::Money,
            "character" | "char" | "bpchar" => CanonicalType::Char(native.length()),
            "character varying" | "varchar" => match native.length() {
                n if n > 0 => CanonicalType::Varchar(n),
                _ => CanonicalType::Text,
            },
            "text" | "citext" => CanonicalType::Text,
            "bytea" => CanonicalType::Blob,
            "date" => CanonicalType::Date,
            "time" | "time without time zone" => CanonicalType::Time,
            "timestamp" | "timestamp without time zone" => CanonicalType::DateTime,
            "timestamptz" | "timestamp with time zone" => CanonicalType::DateTimeTz,
            "uuid" => CanonicalType::Uuid,
            "json" | "jsonb" => CanonicalType::Json,
            "xml" => CanonicalType::Xml,
            "timetz" | "time with time zone" => {
                return CanonicalTypeInfo::lossy(CanonicalType::Time, "Time zone of TIMETZ is dropped.")
            }
            "interval" | "inet" | "cidr" | "macaddr" => {
                return CanonicalTypeInfo::lossy(
                    CanonicalType::Varchar(100),
                    format!("{} stored as text.", native.base()),
                )
            }
            _ => CanonicalType::Unknown(native.data_type.to_string()),
        };
        CanonicalTypeInfo::lossless(canonical)
    }
}

impl FromCanonical for PostgresTypes {
    fn dialect_name(&self) -> &str {
        "postgres"
    }

    fn from_canonical(&self, canonical: &CanonicalType) -> TypeMapping {
        match canonical {
            CanonicalType::Boolean => TypeMapping::plain("boolean"),
            CanonicalType::Int8 | CanonicalType::Int16 => TypeMapping::plain("smallint"),
            CanonicalType::Int32 => TypeMapping::plain("integer"),
            CanonicalType::Int64 => TypeMapping::plain("bigint"),
            CanonicalType::Float32 => TypeMapping::plain("real"),
            CanonicalType::Float64 => TypeMapping::plain("double precision"),
            CanonicalType::Decimal { precision, scale } => {
                TypeMapping::numeric("numeric", *precision, *scale)
            }
            CanonicalType::Money => TypeMapping::numeric("numeric", 19, 4),
            CanonicalType::Char(n) if *n > 0 && *n <= MAX_VARCHAR => TypeMapping::sized("char", *n),
            CanonicalType::Varchar(n) if *n > 0 && *n <= MAX_VARCHAR => {
                TypeMapping::sized("varchar", *n)
            }
            CanonicalType::Char(_) | CanonicalType::Varchar(_) | CanonicalType::Text => {
                TypeMapping::plain("text")
            }
            CanonicalType::Binary(_) | CanonicalType::Varbinary(_) | CanonicalType::Blob => {
                TypeMapping::plain("bytea")
            }
            CanonicalType::Date => TypeMapping::plain("date"),
            CanonicalType::Time => TypeMapping::plain("time"),
            CanonicalType::DateTime => TypeMapping::plain("timestamp"),
            CanonicalType::DateTimeTz => TypeMapping::plain("timestamptz"),
            CanonicalType::Uuid => TypeMapping::plain("uuid"),
            CanonicalType::Json => TypeMapping::plain("jsonb"),
            CanonicalType::Xml => TypeMapping::plain("xml"),
            CanonicalType::Unknown(name) => TypeMapping::plain(name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_information_schema_names() {
        let types = PostgresTypes;
        let native = NativeType {
            data_type: "character varying",
            max_length: Some(40),
            precision: None,
            scale: None,
        };
        assert_eq!(types.to_canonical(&native).canonical_type, CanonicalType::Varchar(40));

        let native = NativeType {
            data_type: "timestamp with time zone",
            max_length: None,
            precision: None,
            scale: None,
        };
        assert_eq!(types.to_canonical(&native).canonical_type, CanonicalType::DateTimeTz);
    }

    #[test]
    fn test_unbounded_varchar_is_text() {
        let types = PostgresTypes;
        let native = NativeType {
            data_type: "character varying",
            max_length: None,
            precision: None,
            scale: None,
        };
        assert_eq!(types.to_canonical(&native).canonical_type, CanonicalType::Text);
        assert_eq!(types.from_canonical(&CanonicalType::Varchar(-1)).data_type, "text");
    }

    #[test]
    fn test_from_canonical() {
        let types = PostgresTypes;
        assert_eq!(types.from_canonical(&CanonicalType::Blob).data_type, "bytea");
        assert_eq!(
            types.from_canonical(&CanonicalType::Money),
            TypeMapping::numeric("numeric", 19, 4)
        );
    }
}
