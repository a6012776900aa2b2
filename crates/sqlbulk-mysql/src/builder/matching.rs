//! Keyed bulk read.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlbulk_core::{
    Connection, Cx, Entity, Error, Outcome, Result, Row, TypeError, try_outcome, try_result,
};

use super::{Operation, block_on, check_properties, resolve_keys};
use crate::columns::Columns;
use crate::ddl::IndexSpec;
use crate::mapping::MappingProfile;
use crate::options::BulkMatchOptions;
use crate::types::TypeMappings;

/// Read back the target rows whose keys appear in the input.
///
/// Only key properties of the input records are used. Results come back in
/// server order, one record per matched target row.
pub struct BulkMatch<T> {
    profile: Arc<MappingProfile>,
    types: Arc<TypeMappings>,
    keys: Columns,
    columns: Columns,
    options: BulkMatchOptions,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity + Default> BulkMatch<T> {
    pub fn new(profile: Arc<MappingProfile>) -> Self {
        Self {
            profile,
            types: Arc::clone(TypeMappings::shared()),
            keys: Columns::All,
            columns: Columns::All,
            options: BulkMatchOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Key columns. Defaults to the primary key.
    pub fn keys(mut self, keys: impl Into<Columns>) -> Self {
        self.keys = keys.into();
        self
    }

    /// Columns read back. Defaults to every mapped column.
    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn options(mut self, options: BulkMatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn type_mappings(mut self, types: Arc<TypeMappings>) -> Self {
        self.types = types;
        self
    }

    fn returned_properties(&self) -> Result<Vec<String>> {
        let props: Vec<String> = self
            .columns
            .resolve(|| {
                self.profile
                    .property_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .into_iter()
            .map(|c| c.property)
            .collect();
        if props.is_empty() {
            return Err(Error::argument("columns", "no columns to select"));
        }
        check_properties(&self.profile, &props)?;
        Ok(props)
    }

    #[tracing::instrument(level = "debug", skip(self, cx, conn, data), fields(rows = data.len()))]
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &[T],
    ) -> Outcome<Vec<T>, Error> {
        if data.is_empty() {
            return Outcome::Ok(Vec::new());
        }
        try_result!(self.profile.check_type::<T>());
        let keys = try_result!(resolve_keys(&self.keys, &self.profile));
        let returned = try_result!(self.returned_properties());

        let rows = if let [record] = data {
            let op = Operation::new(&self.profile, &self.types, &self.options.bulk, "SingleMatch");
            let selected: Vec<String> = returned.iter().map(|p| op.target_column(p)).collect();
            let filter: Vec<String> = keys
                .iter()
                .map(|k| format!("{} = @{}", op.target_column(k), k))
                .collect();
            let sql = format!(
                "SELECT {} FROM {} a WHERE {};",
                selected.join(", "),
                op.table(),
                filter.join(" AND ")
            );
            let bound: Vec<&str> = keys.iter().map(String::as_str).collect();
            let params = try_result!(self.profile.create_parameters(record, &bound, &self.types));

            try_outcome!(conn.ensure_open(cx).await);
            try_outcome!(
                op.query(cx, conn, "executing", op.command(sql).params(params))
                    .await
            )
        } else {
            let op = Operation::new(&self.profile, &self.types, &self.options.bulk, "BulkMatch");
            let mut table = try_result!(op.buffer(data, &keys));
            table.dedup_rows();
            let temp = try_outcome!(op.stage(cx, conn, &table, &IndexSpec::new(keys.clone())).await);

            let selected: Vec<String> = returned.iter().map(|p| op.target_column(p)).collect();
            let sql = format!(
                "SELECT {} FROM {} a JOIN {} b ON {};",
                selected.join(", "),
                op.table(),
                temp,
                op.join_condition(&keys, &table, self.options.collation.as_deref())
            );
            try_outcome!(op.query(cx, conn, "selecting", op.command(sql)).await)
        };

        let records = try_result!(
            rows.iter()
                .map(|row| self.materialize(row, &returned))
                .collect::<Result<Vec<T>>>()
        );
        tracing::debug!(matched = records.len(), "Matched rows");
        Outcome::Ok(records)
    }

    fn materialize(&self, row: &Row, properties: &[String]) -> Result<T> {
        let mut record = T::default();
        for prop in properties {
            let column = self.profile.column_name(prop)?;
            let value = row.get_by_name(column).ok_or_else(|| {
                Error::Type(TypeError {
                    expected: "matched column",
                    actual: format!("column '{}' not found", column),
                    column: Some(column.to_string()),
                    rust_type: None,
                })
            })?;
            record.set(prop, self.profile.model_value(prop, value)?)?;
        }
        Ok(record)
    }

    /// Blocking form of [`execute`](Self::execute).
    pub fn execute_blocking<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &[T],
    ) -> Result<Vec<T>> {
        block_on(self.execute(cx, conn, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::{FromValue, PropertyInfo, ScalarType, Value, ValueConverter};

    #[derive(Debug, Default, PartialEq)]
    struct Tag {
        id: i32,
        name: String,
    }

    impl Entity for Tag {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 2] = [
                PropertyInfo::new("id", ScalarType::I32),
                PropertyInfo::new("name", ScalarType::String),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "id" => Some(self.id.into()),
                "name" => Some(self.name.clone().into()),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id = FromValue::from_value(&value)?,
                "name" => self.name = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Tag", other)),
            }
            Ok(())
        }
    }

    #[test]
    fn materialize_reads_by_column_name() {
        let upper_on_wire = ValueConverter::new(
            ScalarType::String,
            |v| Ok(Value::Text(v.as_str().unwrap_or_default().to_uppercase())),
            |v| Ok(Value::Text(v.as_str().unwrap_or_default().to_lowercase())),
        );
        let profile = MappingProfile::builder::<Tag>()
            .primary_key("id")
            .column("name", "tag_name")
            .converter("name", upper_on_wire)
            .build()
            .unwrap();
        let matcher = BulkMatch::<Tag>::new(Arc::new(profile));
        let row = Row::new(
            vec!["id".to_string(), "tag_name".to_string()],
            vec![Value::Int(7), Value::Text("RUST".to_string())],
        );
        let props = matcher.returned_properties().unwrap();
        let tag = matcher.materialize(&row, &props).unwrap();
        assert_eq!(
            tag,
            Tag {
                id: 7,
                name: "rust".to_string()
            }
        );

        let short = Row::new(vec!["id".to_string()], vec![Value::Int(7)]);
        assert!(matches!(
            matcher.materialize(&short, &props),
            Err(Error::Type(_))
        ));
    }
}
