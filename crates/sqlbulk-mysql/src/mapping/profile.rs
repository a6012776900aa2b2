//! Fluent registration of mapping profiles.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use sqlbulk_core::{Entity, Error, Parameter, Result, Value, ValueConverter, ValueGenerated};

use super::{ColumnDescriptor, MappingProfile, OutputId, OutputIdMode, TableDescriptor};

/// Builds the parameter for one staged property value, replacing the
/// default `@property` parameter.
pub type ParameterFactory = Arc<dyn Fn(&str, Value) -> Parameter + Send + Sync>;

/// Builder for a [`MappingProfile`] of `T`.
///
/// Property names are checked against `T`'s accessor table when the profile
/// is built, so a typo fails registration rather than the first bulk call.
///
/// # Example
///
/// ```ignore
/// let profile = MappingProfile::builder::<Order>()
///     .table("orders")
///     .primary_key("id")
///     .column("customer", "customer_name")
///     .output_id("id", OutputIdMode::ServerGenerated)
///     .build()?;
/// ```
pub struct ProfileBuilder<T> {
    table: Option<String>,
    schema: Option<String>,
    primary_keys: Vec<String>,
    column_names: Vec<(String, String)>,
    column_types: Vec<(String, String)>,
    converters: Vec<(String, ValueConverter)>,
    read_only: Vec<String>,
    ignored: Vec<String>,
    output_id: Option<(String, OutputIdMode)>,
    parameter_factory: Option<ParameterFactory>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for ProfileBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ProfileBuilder<T> {
    pub fn new() -> Self {
        Self {
            table: None,
            schema: None,
            primary_keys: Vec::new(),
            column_names: Vec::new(),
            column_types: Vec::new(),
            converters: Vec::new(),
            read_only: Vec::new(),
            ignored: Vec::new(),
            output_id: None,
            parameter_factory: None,
            _entity: PhantomData,
        }
    }

    /// Target table. Defaults to the type's name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.schema = Some(name.into());
        self
    }

    /// Add a primary key property. Call repeatedly for composite keys.
    pub fn primary_key(mut self, property: impl Into<String>) -> Self {
        self.primary_keys.push(property.into());
        self
    }

    /// Map a property to a differently named column.
    pub fn column(mut self, property: impl Into<String>, column: impl Into<String>) -> Self {
        self.column_names.push((property.into(), column.into()));
        self
    }

    /// Declare the database type of a property's column.
    pub fn column_type(mut self, property: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.column_types.push((property.into(), sql_type.into()));
        self
    }

    pub fn converter(mut self, property: impl Into<String>, converter: ValueConverter) -> Self {
        self.converters.push((property.into(), converter));
        self
    }

    /// Mark a property as produced by the database; it is never inserted or
    /// updated.
    pub fn read_only(mut self, property: impl Into<String>) -> Self {
        self.read_only.push(property.into());
        self
    }

    /// Leave a property out of the mapping entirely.
    pub fn ignore(mut self, property: impl Into<String>) -> Self {
        self.ignored.push(property.into());
        self
    }

    pub fn output_id(mut self, property: impl Into<String>, mode: OutputIdMode) -> Self {
        self.output_id = Some((property.into(), mode));
        self
    }

    pub fn parameter_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str, Value) -> Parameter + Send + Sync + 'static,
    {
        self.parameter_factory = Some(Arc::new(factory));
        self
    }

    /// Validate and produce the profile.
    pub fn build(self) -> Result<MappingProfile> {
        let type_name = std::any::type_name::<T>();
        let known = |prop: &str| -> Result<()> {
            if T::property(prop).is_some() {
                Ok(())
            } else {
                Err(Error::unknown_property(type_name, prop))
            }
        };

        let named: Vec<&str> = self
            .primary_keys
            .iter()
            .chain(&self.read_only)
            .chain(&self.ignored)
            .chain(self.column_names.iter().map(|(p, _)| p))
            .chain(self.column_types.iter().map(|(p, _)| p))
            .chain(self.converters.iter().map(|(p, _)| p))
            .chain(self.output_id.iter().map(|(p, _)| p))
            .map(String::as_str)
            .collect();
        for prop in named {
            known(prop)?;
        }
        if let Some(prop) = self.primary_keys.iter().find(|p| self.ignored.contains(p)) {
            return Err(Error::argument(
                "primary_key",
                format!("primary key '{}' is ignored", prop),
            ));
        }

        let table_name = self.table.unwrap_or_else(|| short_type_name(type_name).to_string());
        let table = TableDescriptor::new(self.schema.as_deref(), &table_name)?;

        let columns: Vec<ColumnDescriptor> = T::properties()
            .iter()
            .filter(|p| !self.ignored.iter().any(|i| i == p.name))
            .map(|p| {
                let mut column = ColumnDescriptor::new(p.name, p.scalar);
                column.nullable = p.nullable;
                column.primary_key = self.primary_keys.iter().any(|k| k == p.name);
                if let Some((_, name)) = self.column_names.iter().find(|(prop, _)| prop == p.name) {
                    column.column_name.clone_from(name);
                }
                if let Some((_, ty)) = self.column_types.iter().find(|(prop, _)| prop == p.name) {
                    column.column_type = Some(ty.clone());
                }
                let server_id = matches!(
                    &self.output_id,
                    Some((prop, OutputIdMode::ServerGenerated)) if prop == p.name
                );
                if server_id || self.read_only.iter().any(|r| r == p.name) {
                    column.value_generated = ValueGenerated::OnAdd;
                }
                column
            })
            .collect();

        let insertable = columns
            .iter()
            .filter(|c| !c.is_store_generated())
            .map(|c| c.property.clone())
            .collect();

        let output_id = match self.output_id {
            Some((property, mode)) => Some(OutputId { property, mode }),
            None => match self.primary_keys.as_slice() {
                [single] => columns
                    .iter()
                    .find(|c| &c.property == single)
                    .and_then(super::infer_output_id),
                _ => None,
            },
        };

        let converters: HashMap<String, ValueConverter> = self.converters.into_iter().collect();

        Ok(MappingProfile {
            entity_type: TypeId::of::<T>(),
            type_name,
            table,
            columns,
            primary_keys: self.primary_keys,
            insertable,
            converters,
            output_id,
            parameter_factory: self.parameter_factory,
        })
    }
}

/// `app::model::Order<X>` -> `Order`
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
