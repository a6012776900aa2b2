//! MySQL type classification and the default type tables.
//!
//! This module provides:
//! - [`MySqlType`], the driver-side type family of a declared column type
//! - classification of SQL type text (`"datetime(3)"`, `"int unsigned"`, ...)
//! - [`TypeMappings`], the configurable scalar-to-SQL default table plus
//!   classifier overrides, and the value coercions that depend on them

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use regex::Regex;
use sqlbulk_core::{ScalarType, Value};

/// MySQL column type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MySqlType {
    Bit,
    /// `tinyint(1)` / `bool`
    Bool,
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Year,
    Date,
    Time,
    DateTime,
    Timestamp,
    /// `char(36)`, the textual UUID layout
    Guid,
    Char,
    VarChar,
    TinyText,
    Text,
    MediumText,
    LongText,
    Binary,
    VarBinary,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Enum,
    Set,
    Json,
    Geometry,
}

impl MySqlType {
    /// Classify SQL type text, ignoring case, length/precision arguments and
    /// trailing attributes such as `unsigned`.
    ///
    /// Unknown names classify as `VarChar`.
    pub fn classify(sql_type: &str) -> Self {
        let lowered = sql_type.trim().to_ascii_lowercase();
        let Some(caps) = type_pattern().captures(&lowered) else {
            return MySqlType::VarChar;
        };
        let name = caps.get(1).map_or("", |m| m.as_str());
        let args = caps.get(2).map(|m| m.as_str().trim());

        match name {
            "bit" => MySqlType::Bit,
            "bool" | "boolean" => MySqlType::Bool,
            "tinyint" if args == Some("1") => MySqlType::Bool,
            "tinyint" => MySqlType::TinyInt,
            "smallint" => MySqlType::SmallInt,
            "mediumint" => MySqlType::MediumInt,
            "int" | "integer" => MySqlType::Int,
            "bigint" => MySqlType::BigInt,
            "float" => MySqlType::Float,
            "double" | "double precision" | "real" => MySqlType::Double,
            "decimal" | "dec" | "numeric" | "fixed" => MySqlType::Decimal,
            "year" => MySqlType::Year,
            "date" => MySqlType::Date,
            "time" => MySqlType::Time,
            "datetime" => MySqlType::DateTime,
            "timestamp" => MySqlType::Timestamp,
            "char" if args == Some("36") => MySqlType::Guid,
            "char" | "nchar" => MySqlType::Char,
            "varchar" | "nvarchar" => MySqlType::VarChar,
            "tinytext" => MySqlType::TinyText,
            "text" => MySqlType::Text,
            "mediumtext" => MySqlType::MediumText,
            "longtext" => MySqlType::LongText,
            "binary" => MySqlType::Binary,
            "varbinary" => MySqlType::VarBinary,
            "tinyblob" => MySqlType::TinyBlob,
            "blob" => MySqlType::Blob,
            "mediumblob" => MySqlType::MediumBlob,
            "longblob" => MySqlType::LongBlob,
            "enum" => MySqlType::Enum,
            "set" => MySqlType::Set,
            "json" => MySqlType::Json,
            "geometry" | "point" | "linestring" | "polygon" => MySqlType::Geometry,
            other => {
                tracing::trace!(sql_type = other, "unknown SQL type, treating as varchar");
                MySqlType::VarChar
            }
        }
    }

    /// Character data (compared under a collation).
    pub const fn is_string(self) -> bool {
        matches!(
            self,
            MySqlType::Guid
                | MySqlType::Char
                | MySqlType::VarChar
                | MySqlType::TinyText
                | MySqlType::Text
                | MySqlType::MediumText
                | MySqlType::LongText
                | MySqlType::Enum
                | MySqlType::Set
        )
    }

    /// Byte data.
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            MySqlType::Binary
                | MySqlType::VarBinary
                | MySqlType::TinyBlob
                | MySqlType::Blob
                | MySqlType::MediumBlob
                | MySqlType::LongBlob
        )
    }

    /// TEXT/BLOB families, which MySQL only indexes with a key prefix length.
    pub const fn needs_index_prefix(self) -> bool {
        matches!(
            self,
            MySqlType::TinyText
                | MySqlType::Text
                | MySqlType::MediumText
                | MySqlType::LongText
                | MySqlType::TinyBlob
                | MySqlType::Blob
                | MySqlType::MediumBlob
                | MySqlType::LongBlob
        )
    }

    /// Types carrying fractional seconds.
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            MySqlType::Time | MySqlType::DateTime | MySqlType::Timestamp
        )
    }
}

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z]+(?: precision)?)\s*(?:\(([^)]*)\))?").unwrap_or_else(|e| {
            unreachable!("type pattern is a valid regex: {e}")
        })
    })
}

/// Fractional-second precision declared by a temporal type (`datetime(3)` -> 3).
///
/// Returns 0 when no precision is declared, which is also MySQL's default.
pub fn fractional_seconds(sql_type: &str) -> u8 {
    let lowered = sql_type.trim().to_ascii_lowercase();
    type_pattern()
        .captures(&lowered)
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().trim().parse::<u8>().ok())
        .map_or(0, |fsp| fsp.min(6))
}

/// Drop digits beyond `fsp` fractional-second digits from a microsecond count.
pub fn truncate_micros(micros: i64, fsp: u8) -> i64 {
    let unit = 10_i64.pow(u32::from(6 - fsp.min(6)));
    micros - micros.rem_euclid(unit)
}

/// Default scalar-to-SQL type table plus classifier overrides.
///
/// One process-wide instance is available through [`TypeMappings::shared`];
/// sessions may also own their own instance.
#[derive(Debug)]
pub struct TypeMappings {
    sql_types: RwLock<HashMap<ScalarType, String>>,
    classifications: RwLock<HashMap<String, MySqlType>>,
}

impl Default for TypeMappings {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeMappings {
    /// Create a table with the built-in MySQL defaults.
    pub fn new() -> Self {
        let defaults = [
            (ScalarType::Bool, "tinyint(1)"),
            (ScalarType::I8, "tinyint"),
            (ScalarType::I16, "smallint"),
            (ScalarType::I32, "int"),
            (ScalarType::I64, "bigint"),
            (ScalarType::U8, "tinyint unsigned"),
            (ScalarType::U16, "smallint unsigned"),
            (ScalarType::U32, "int unsigned"),
            (ScalarType::U64, "bigint unsigned"),
            (ScalarType::F32, "float"),
            (ScalarType::F64, "double"),
            (ScalarType::Decimal, "decimal(65,30)"),
            (ScalarType::String, "longtext"),
            (ScalarType::Bytes, "longblob"),
            (ScalarType::Uuid, "char(36)"),
            (ScalarType::Date, "date"),
            (ScalarType::Time, "time(6)"),
            (ScalarType::DateTime, "datetime(6)"),
            (ScalarType::DateTimeTz, "datetime(6)"),
            (ScalarType::Json, "json"),
        ];
        Self {
            sql_types: RwLock::new(
                defaults
                    .into_iter()
                    .map(|(scalar, sql)| (scalar, sql.to_string()))
                    .collect(),
            ),
            classifications: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide instance.
    pub fn shared() -> &'static Arc<TypeMappings> {
        static SHARED: OnceLock<Arc<TypeMappings>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(TypeMappings::new()))
    }

    /// Default SQL type for a scalar; unmapped scalars become `longtext`.
    pub fn sql_type_for(&self, scalar: ScalarType) -> String {
        self.sql_types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scalar)
            .cloned()
            .unwrap_or_else(|| "longtext".to_string())
    }

    /// Register (or replace) the default SQL type for a scalar.
    pub fn register_sql_type(&self, scalar: ScalarType, sql_type: impl Into<String>) {
        self.sql_types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scalar, sql_type.into());
    }

    /// Pin the classification of an exact SQL type text (case-insensitive).
    pub fn register_classification(&self, sql_type: &str, kind: MySqlType) {
        self.classifications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sql_type.trim().to_ascii_lowercase(), kind);
    }

    /// Classify SQL type text, honoring registered overrides first.
    pub fn classify(&self, sql_type: &str) -> MySqlType {
        let key = sql_type.trim().to_ascii_lowercase();
        if let Some(kind) = self
            .classifications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return *kind;
        }
        MySqlType::classify(&key)
    }

    /// Adapt a value to the column type it is written into.
    ///
    /// - UUIDs become hyphenated text in character columns and raw bytes in
    ///   binary columns.
    /// - Times and timestamps are truncated to the declared fractional-second
    ///   precision, matching what the server stores.
    pub fn coerce(&self, value: Value, sql_type: &str) -> Value {
        let kind = self.classify(sql_type);
        match value {
            Value::Uuid(bytes) if kind.is_string() => {
                Value::Text(uuid::Uuid::from_bytes(bytes).hyphenated().to_string())
            }
            Value::Uuid(bytes) if kind.is_binary() => Value::Bytes(bytes.to_vec()),
            Value::Timestamp(us) if kind.is_temporal() => {
                Value::Timestamp(truncate_micros(us, fractional_seconds(sql_type)))
            }
            Value::TimestampTz(us) if kind.is_temporal() => {
                Value::TimestampTz(truncate_micros(us, fractional_seconds(sql_type)))
            }
            Value::Time(us) if kind.is_temporal() => {
                Value::Time(truncate_micros(us, fractional_seconds(sql_type)))
            }
            other => other,
        }
    }
}
