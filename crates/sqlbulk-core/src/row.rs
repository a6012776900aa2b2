//! Database row representation and typed extraction.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from a query.
///
/// Column metadata is shared via `Arc` by every row of one result set.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a row owning its own column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a row sharing column metadata with its siblings.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column name.
    #[allow(clippy::result_large_err)]
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get_by_name(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
                rust_type: None,
            })
        })?;
        T::from_value(value).map_err(|e| match e {
            Error::Type(mut te) => {
                te.column = Some(name.to_string());
                Error::Type(te)
            }
            e => e,
        })
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Consume the row, yielding (column_name, value) pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        let names = self.columns.names().to_vec();
        names.into_iter().zip(self.values)
    }
}

/// Trait for converting from a `Value` to a typed value.
///
/// Derived entity setters go through this trait, so every property type an
/// entity may declare implements it.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    #[allow(clippy::result_large_err)]
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: None,
        rust_type: None,
    })
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

/// Integers accept any integer-shaped value that fits; out of range is an error
/// rather than a silent wrap.
macro_rules! int_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    if let Value::Decimal(s) = value {
                        if let Ok(v) = s.parse::<$ty>() {
                            return Ok(v);
                        }
                    }
                    let v = value
                        .as_i64()
                        .ok_or_else(|| mismatch(stringify!($ty), value))?;
                    <$ty>::try_from(v).map_err(|_| {
                        Error::Type(TypeError {
                            expected: stringify!($ty),
                            actual: format!("value {} out of range", v),
                            column: None,
                            rust_type: None,
                        })
                    })
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            other => other
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| mismatch("f32", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s.clone()),
            Value::Uuid(b) => Ok(uuid::Uuid::from_bytes(*b).hyphenated().to_string()),
            Value::Json(v) => Ok(v.to_string()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Uuid(b) => Ok(uuid::Uuid::from_bytes(*b)),
            Value::Bytes(b) => uuid::Uuid::from_slice(b).map_err(|_| mismatch("UUID", value)),
            Value::Text(s) => uuid::Uuid::parse_str(s).map_err(|e| {
                Error::Type(TypeError {
                    expected: "UUID",
                    actual: format!("invalid UUID text '{}': {}", s, e),
                    column: None,
                    rust_type: Some("uuid::Uuid"),
                })
            }),
            _ => Err(mismatch("UUID", value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_date().ok_or_else(|| mismatch("DATE", value))
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_time().ok_or_else(|| mismatch("TIME", value))
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_naive_datetime()
            .ok_or_else(|| mismatch("DATETIME", value))
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_naive_datetime()
            .map(|dt| dt.and_utc())
            .ok_or_else(|| mismatch("TIMESTAMP", value))
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            Value::Text(s) => serde_json::from_str(s).map_err(|e| {
                Error::Type(TypeError {
                    expected: "valid JSON",
                    actual: format!("invalid JSON: {}", e),
                    column: None,
                    rust_type: None,
                })
            }),
            _ => Err(mismatch("JSON", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_named_reports_column() {
        let row = Row::new(
            vec!["id".to_string(), "name".to_string()],
            vec![Value::BigInt(7), Value::Text("x".to_string())],
        );
        let id: i32 = row.get_named("id").unwrap();
        assert_eq!(id, 7);

        match row.get_named::<i64>("name") {
            Err(Error::Type(te)) => assert_eq!(te.column.as_deref(), Some("name")),
            other => panic!("expected type error, got {:?}", other),
        }
        assert!(row.get_named::<i64>("missing").is_err());
    }

    #[test]
    fn narrowing_integers_checks_range() {
        assert_eq!(i32::from_value(&Value::BigInt(42)).unwrap(), 42);
        assert!(i32::from_value(&Value::BigInt(i64::MAX)).is_err());
        assert!(u8::from_value(&Value::Int(-1)).is_err());
        assert_eq!(
            u64::from_value(&Value::Decimal("18446744073709551615".to_string())).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i32>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(&Value::Int(0)).unwrap(), Some(0));
    }

    #[test]
    fn uuid_from_text_and_bytes() {
        let id = uuid::Uuid::from_u128(42);
        let text = Value::Text(id.hyphenated().to_string());
        assert_eq!(uuid::Uuid::from_value(&text).unwrap(), id);
        let bytes = Value::Bytes(id.as_bytes().to_vec());
        assert_eq!(uuid::Uuid::from_value(&bytes).unwrap(), id);
        assert!(uuid::Uuid::from_value(&Value::Text("nope".to_string())).is_err());
    }

    #[test]
    fn shared_columns_and_pairs() {
        let columns = Arc::new(ColumnInfo::new(vec!["a".to_string(), "b".to_string()]));
        let row = Row::with_columns(Arc::clone(&columns), vec![Value::Int(1), Value::Null]);
        assert_eq!(columns.index_of("b"), Some(1));
        let pairs: Vec<_> = row.into_pairs().collect();
        assert_eq!(pairs[1], ("b".to_string(), Value::Null));
    }
}
