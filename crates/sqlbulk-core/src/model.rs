//! Entity and model traits.
//!
//! [`Entity`] is the per-type field-accessor table the bulk engine reads and
//! writes records through. [`Model`] adds ORM metadata (table, columns, keys,
//! generation) and is what the context-based mapping path introspects. Both
//! are normally derived with `#[derive(Entity, Model)]` from `sqlbulk-macros`.

use crate::Result;
use crate::converter::ValueConverter;
use crate::field::{FieldInfo, PropertyInfo};
use crate::value::Value;

/// A record type whose properties can be read and written by name.
///
/// # Example
///
/// ```ignore
/// use sqlbulk::prelude::*;
///
/// #[derive(Entity, Default)]
/// struct Order {
///     id: i64,
///     customer: String,
///     placed_at: Option<chrono::NaiveDateTime>,
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// All properties, in declaration order.
    fn properties() -> &'static [PropertyInfo];

    /// Read a property. `None` means the name is unknown; a NULL property is
    /// `Some(Value::Null)`.
    fn get(&self, property: &str) -> Option<Value>;

    /// Write a property from a dynamically typed value.
    #[allow(clippy::result_large_err)]
    fn set(&mut self, property: &str, value: Value) -> Result<()>;

    /// Look up one property by name.
    fn property(name: &str) -> Option<&'static PropertyInfo> {
        Self::properties().iter().find(|p| p.name == name)
    }
}

/// An entity mapped to a table by ORM metadata.
pub trait Model: Entity {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// Schema (database) the table lives in, when not the connection default.
    const SCHEMA: Option<&'static str> = None;

    /// Field metadata for all mapped columns.
    fn fields() -> &'static [FieldInfo];

    /// Value converters keyed by property name.
    fn converters() -> Vec<(&'static str, ValueConverter)> {
        Vec::new()
    }

    /// Primary key property names in declaration order.
    fn primary_key() -> Vec<&'static str> {
        Self::fields()
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name)
            .collect()
    }
}

/// Identifies an ORM context type.
///
/// Model metadata is cached per (context type, entity type), so two contexts
/// mapping the same entity to different schemas stay apart.
pub trait DbContext: Send + Sync + 'static {
    /// Schema applied to models that do not declare their own.
    fn default_schema() -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::row::FromValue;
    use crate::types::ScalarType;

    #[derive(Default)]
    struct Season {
        id: i32,
        name: Option<String>,
    }

    impl Entity for Season {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 2] = [
                PropertyInfo::new("id", ScalarType::I32),
                PropertyInfo::new("name", ScalarType::String).nullable(true),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "id" => Some(Value::from(self.id)),
                "name" => Some(Value::from(self.name.clone())),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id = FromValue::from_value(&value)?,
                "name" => self.name = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Season", other)),
            }
            Ok(())
        }
    }

    impl Model for Season {
        const TABLE_NAME: &'static str = "seasons";

        fn fields() -> &'static [FieldInfo] {
            static FIELDS: [FieldInfo; 2] = [
                FieldInfo::new("id", "id", ScalarType::I32)
                    .primary_key(true)
                    .auto_increment(true),
                FieldInfo::new("name", "season_name", ScalarType::String).nullable(true),
            ];
            &FIELDS
        }
    }

    #[test]
    fn accessor_table_round_trip() {
        let mut s = Season::default();
        s.set("id", Value::BigInt(4)).unwrap();
        s.set("name", Value::Null).unwrap();
        assert_eq!(s.get("id"), Some(Value::Int(4)));
        assert_eq!(s.get("name"), Some(Value::Null));
        assert_eq!(s.get("nope"), None);
        assert!(s.set("nope", Value::Null).is_err());
    }

    #[test]
    fn model_defaults() {
        assert_eq!(Season::primary_key(), vec!["id"]);
        assert!(Season::converters().is_empty());
        assert_eq!(Season::SCHEMA, None);
        assert!(Season::property("name").unwrap().nullable);
    }
}
