//! Rust-side logical types of entity properties.

/// The logical type of an entity property, with any `Option` wrapper removed.
///
/// This is what staging columns are typed by before any database type
/// override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Arbitrary precision decimal carried as text
    Decimal,
    String,
    Bytes,
    Uuid,
    Date,
    Time,
    /// Date and time without zone
    DateTime,
    /// Date and time in UTC
    DateTimeTz,
    Json,
    /// A type with no built-in mapping, by name
    Other(&'static str),
}

impl ScalarType {
    /// Display name, used in error messages and as the type-mapping key.
    pub const fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::I8 => "i8",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U8 => "u8",
            ScalarType::U16 => "u16",
            ScalarType::U32 => "u32",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::Decimal => "decimal",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Uuid => "uuid",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::DateTime => "datetime",
            ScalarType::DateTimeTz => "datetimetz",
            ScalarType::Json => "json",
            ScalarType::Other(name) => name,
        }
    }

    /// Textual types get the collation override in join predicates.
    pub const fn is_textual(&self) -> bool {
        matches!(self, ScalarType::String)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::I8
                | ScalarType::I16
                | ScalarType::I32
                | ScalarType::I64
                | ScalarType::U8
                | ScalarType::U16
                | ScalarType::U32
                | ScalarType::U64
        )
    }

    pub const fn is_temporal(&self) -> bool {
        matches!(
            self,
            ScalarType::Date | ScalarType::Time | ScalarType::DateTime | ScalarType::DateTimeTz
        )
    }
}

/// Trait for Rust types that can back an entity property.
///
/// `#[derive(Entity)]` reads `SCALAR` and `NULLABLE` from each field's type.
/// Implement it for custom newtypes to make them usable as properties.
pub trait ScalarInfo {
    /// The logical type of this Rust type.
    const SCALAR: ScalarType;

    /// Whether this type admits NULL.
    const NULLABLE: bool = false;
}

macro_rules! scalar_info {
    ($($ty:ty => $scalar:expr),* $(,)?) => {
        $(
            impl ScalarInfo for $ty {
                const SCALAR: ScalarType = $scalar;
            }
        )*
    };
}

scalar_info! {
    bool => ScalarType::Bool,
    i8 => ScalarType::I8,
    i16 => ScalarType::I16,
    i32 => ScalarType::I32,
    i64 => ScalarType::I64,
    u8 => ScalarType::U8,
    u16 => ScalarType::U16,
    u32 => ScalarType::U32,
    u64 => ScalarType::U64,
    f32 => ScalarType::F32,
    f64 => ScalarType::F64,
    String => ScalarType::String,
    Vec<u8> => ScalarType::Bytes,
    uuid::Uuid => ScalarType::Uuid,
    chrono::NaiveDate => ScalarType::Date,
    chrono::NaiveTime => ScalarType::Time,
    chrono::NaiveDateTime => ScalarType::DateTime,
    chrono::DateTime<chrono::Utc> => ScalarType::DateTimeTz,
    serde_json::Value => ScalarType::Json,
}

impl<T: ScalarInfo> ScalarInfo for Option<T> {
    const SCALAR: ScalarType = T::SCALAR;
    const NULLABLE: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_unwraps_to_inner_scalar() {
        assert_eq!(<Option<i64> as ScalarInfo>::SCALAR, ScalarType::I64);
        assert!(<Option<i64> as ScalarInfo>::NULLABLE);
        assert!(!<i64 as ScalarInfo>::NULLABLE);
        assert_eq!(
            <Option<chrono::NaiveDateTime> as ScalarInfo>::SCALAR,
            ScalarType::DateTime
        );
    }

    #[test]
    fn classification() {
        assert!(ScalarType::String.is_textual());
        assert!(!ScalarType::Uuid.is_textual());
        assert!(ScalarType::U16.is_integer());
        assert!(ScalarType::DateTimeTz.is_temporal());
        assert_eq!(ScalarType::Other("Money").name(), "Money");
    }
}
