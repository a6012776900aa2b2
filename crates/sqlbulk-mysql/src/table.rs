//! In-memory tabular buffer staged to the server.
//!
//! Columns are named after properties; database column names are applied
//! later at the DDL and copy boundary. Each column's type is the staged type
//! of its property (the converter's provider type when a converter is set).

use std::collections::HashSet;

use sqlbulk_core::{Entity, Error, Result, ScalarType, Value};

use crate::mapping::MappingProfile;
use crate::types::TypeMappings;

/// One buffer column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataColumn {
    /// Property name
    pub name: String,
    pub scalar: ScalarType,
    pub nullable: bool,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            nullable: true,
        }
    }
}

/// Rows by columns of staged values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<DataColumn>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<DataColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a buffer over `properties` of `records`.
    ///
    /// Every cell passes through the property's converter and the
    /// coercions of its destination column type.
    pub fn from_records<T: Entity>(
        records: &[T],
        properties: &[&str],
        mapping: &MappingProfile,
        types: &TypeMappings,
    ) -> Result<Self> {
        let mut columns = Vec::with_capacity(properties.len());
        let mut sql_types = Vec::with_capacity(properties.len());
        for prop in properties {
            let nullable = mapping.column(prop).is_none_or(|c| c.nullable);
            columns.push(DataColumn {
                name: (*prop).to_string(),
                scalar: mapping.staged_type(prop)?,
                nullable,
            });
            sql_types.push(mapping.sql_type(prop, types)?);
        }

        let mut table = Self {
            columns,
            rows: Vec::with_capacity(records.len()),
        };
        for record in records {
            let mut row = Vec::with_capacity(properties.len());
            for (prop, sql_type) in properties.iter().zip(&sql_types) {
                let value = record
                    .get(prop)
                    .ok_or_else(|| Error::unknown_property(mapping.type_name(), prop))?;
                let value = match mapping.converter(prop) {
                    Some(conv) => conv.to_provider(&value)?,
                    None => value,
                };
                row.push(types.coerce(value, sql_type));
            }
            table.rows.push(row);
        }

        tracing::trace!(
            columns = table.columns.len(),
            rows = table.rows.len(),
            "Built staging buffer"
        );
        Ok(table)
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::argument(
                "row",
                format!(
                    "expected {} values, got {}",
                    self.columns.len(),
                    row.len()
                ),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Drop rows identical to an earlier row. Returns how many were removed.
    pub fn dedup_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(format!("{row:?}")));
        before - self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::{FromValue, PropertyInfo, ValueConverter};

    #[derive(Default)]
    struct Shipment {
        id: uuid::Uuid,
        carrier: Option<String>,
        weight: f64,
        shipped: chrono::NaiveDateTime,
    }

    impl Entity for Shipment {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 4] = [
                PropertyInfo::new("id", ScalarType::Uuid),
                PropertyInfo::new("carrier", ScalarType::String).nullable(true),
                PropertyInfo::new("weight", ScalarType::F64),
                PropertyInfo::new("shipped", ScalarType::DateTime),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "id" => Some(self.id.into()),
                "carrier" => Some(self.carrier.clone().into()),
                "weight" => Some(self.weight.into()),
                "shipped" => Some(self.shipped.into()),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id = FromValue::from_value(&value)?,
                "carrier" => self.carrier = FromValue::from_value(&value)?,
                "weight" => self.weight = FromValue::from_value(&value)?,
                "shipped" => self.shipped = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Shipment", other)),
            }
            Ok(())
        }
    }

    fn shipped_at(micros: u32) -> chrono::NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(10, 0, 0, micros)
            .unwrap()
    }

    #[test]
    fn null_cells_stay_null() {
        let profile = MappingProfile::builder::<Shipment>().build().unwrap();
        let records = vec![
            Shipment {
                carrier: Some("DHL".to_string()),
                weight: 2.5,
                ..Default::default()
            },
            Shipment::default(),
        ];
        let table =
            DataTable::from_records(&records, &["carrier", "weight"], &profile, &TypeMappings::new())
                .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][0], Value::Text("DHL".to_string()));
        assert_eq!(table.rows()[1][0], Value::Null);
        assert_eq!(table.rows()[1][1], Value::Double(0.0));
        assert_eq!(table.column("carrier").map(|c| c.scalar), Some(ScalarType::String));
    }

    #[test]
    fn timestamps_follow_declared_precision() {
        let profile = MappingProfile::builder::<Shipment>()
            .column_type("shipped", "datetime(3)")
            .build()
            .unwrap();
        let records = vec![Shipment {
            shipped: shipped_at(123_456),
            ..Default::default()
        }];
        let table =
            DataTable::from_records(&records, &["shipped"], &profile, &TypeMappings::new()).unwrap();
        assert_eq!(table.rows()[0][0], Value::from(shipped_at(123_000)));
    }

    #[test]
    fn uuid_rendered_for_char_column() {
        let profile = MappingProfile::builder::<Shipment>().build().unwrap();
        let records = vec![Shipment {
            id: uuid::Uuid::from_u128(1),
            ..Default::default()
        }];
        let table =
            DataTable::from_records(&records, &["id"], &profile, &TypeMappings::new()).unwrap();
        assert_eq!(
            table.rows()[0][0],
            Value::Text("00000000-0000-0000-0000-000000000001".to_string())
        );
    }

    #[test]
    fn converter_applies_per_cell() {
        let grams = ValueConverter::new(
            ScalarType::I64,
            |v| {
                #[allow(clippy::cast_possible_truncation)]
                let g = (v.as_f64().unwrap_or_default() * 1000.0).round() as i64;
                Ok(Value::BigInt(g))
            },
            |v| {
                #[allow(clippy::cast_precision_loss)]
                let kg = v.as_i64().unwrap_or_default() as f64 / 1000.0;
                Ok(Value::Double(kg))
            },
        );
        let profile = MappingProfile::builder::<Shipment>()
            .converter("weight", grams)
            .build()
            .unwrap();
        let records = vec![Shipment {
            weight: 1.25,
            ..Default::default()
        }];
        let table =
            DataTable::from_records(&records, &["weight"], &profile, &TypeMappings::new()).unwrap();
        assert_eq!(table.columns()[0].scalar, ScalarType::I64);
        assert_eq!(table.rows()[0][0], Value::BigInt(1250));
    }

    #[test]
    fn unknown_property_is_reported() {
        let profile = MappingProfile::builder::<Shipment>().build().unwrap();
        let err = DataTable::from_records(
            &[Shipment::default()],
            &["volume"],
            &profile,
            &TypeMappings::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn dedup_and_push() {
        let mut table = DataTable::new(vec![DataColumn::new("id", ScalarType::I32)]);
        table.push_row(vec![Value::Int(1)]).unwrap();
        table.push_row(vec![Value::Int(2)]).unwrap();
        table.push_row(vec![Value::Int(1)]).unwrap();
        assert!(table.push_row(vec![]).is_err());
        assert_eq!(table.dedup_rows(), 1);
        assert_eq!(table.rows(), &[vec![Value::Int(1)], vec![Value::Int(2)]]);
    }
}
