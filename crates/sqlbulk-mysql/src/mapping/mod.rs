//! Table and column mapping.
//!
//! A [`MappingProfile`] is the resolved set of facts the bulk builders need
//! about a record type: target table, per-property columns, keys, converters
//! and how ids are produced. It is produced either from ORM metadata
//! ([`ModelMetadata`]) or from an explicit registration ([`MappingRegistry`]);
//! builders cannot tell the two apart.

mod metadata;
mod profile;
mod registry;

pub use metadata::{ContextMappings, ModelMetadata};
pub use profile::{ParameterFactory, ProfileBuilder};
pub use registry::{MappingRegistry, MappingResolver};

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use sqlbulk_core::{
    Entity, Error, MappingError, MappingErrorKind, Model, Parameter, Result, ScalarType, Value,
    ValueConverter, ValueGenerated, qualified_name,
};

use crate::types::TypeMappings;

/// An immutable reference to a target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    schema: Option<String>,
    name: String,
    quoted: String,
}

impl TableDescriptor {
    /// Create a descriptor. The table name must not be empty.
    pub fn new(schema: Option<&str>, name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::argument("table", "table name must not be empty"));
        }
        let schema = schema.filter(|s| !s.is_empty()).map(str::to_string);
        Ok(Self {
            quoted: qualified_name(schema.as_deref(), name),
            schema,
            name: name.to_string(),
        })
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema-qualified, backtick-quoted name.
    pub fn quoted_name(&self) -> &str {
        &self.quoted
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted)
    }
}

/// Facts about one mapped property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub property: String,
    pub scalar: ScalarType,
    pub column_name: String,
    /// Declared database type, when known
    pub column_type: Option<String>,
    pub value_generated: ValueGenerated,
    pub default_sql: Option<String>,
    pub primary_key: bool,
    pub row_version: bool,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(property: &str, scalar: ScalarType) -> Self {
        Self {
            property: property.to_string(),
            scalar,
            column_name: property.to_string(),
            column_type: None,
            value_generated: ValueGenerated::Never,
            default_sql: None,
            primary_key: false,
            row_version: false,
            nullable: false,
        }
    }

    /// Produced by the database rather than the caller.
    pub fn is_store_generated(&self) -> bool {
        self.value_generated != ValueGenerated::Never || self.row_version
    }
}

/// How the id of a newly inserted record is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputIdMode {
    /// A time-ordered UUID is generated in-process before sending.
    ClientGenerated,
    /// The database assigns the value (auto-increment or computed).
    ServerGenerated,
}

/// The id property of a mapping and its generation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputId {
    pub property: String,
    pub mode: OutputIdMode,
}

/// Resolved mapping of a record type to a table.
#[derive(Clone)]
pub struct MappingProfile {
    entity_type: TypeId,
    type_name: &'static str,
    table: TableDescriptor,
    columns: Vec<ColumnDescriptor>,
    primary_keys: Vec<String>,
    insertable: Vec<String>,
    converters: HashMap<String, ValueConverter>,
    output_id: Option<OutputId>,
    parameter_factory: Option<ParameterFactory>,
}

impl fmt::Debug for MappingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingProfile")
            .field("type_name", &self.type_name)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("primary_keys", &self.primary_keys)
            .field("insertable", &self.insertable)
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .field("output_id", &self.output_id)
            .field("parameter_factory", &self.parameter_factory.is_some())
            .finish()
    }
}

impl MappingProfile {
    /// Start a fluent registration for `T`.
    pub fn builder<T: Entity>() -> ProfileBuilder<T> {
        ProfileBuilder::new()
    }

    /// Build a profile from ORM metadata.
    ///
    /// `default_schema` applies when the model declares none. Only properties
    /// with a field entry are mapped.
    pub fn from_model<T: Model>(default_schema: Option<&str>) -> Result<Self> {
        let type_name = std::any::type_name::<T>();
        let table = TableDescriptor::new(T::SCHEMA.or(default_schema), T::TABLE_NAME)?;

        let columns: Vec<ColumnDescriptor> = T::fields()
            .iter()
            .map(|f| ColumnDescriptor {
                property: f.name.to_string(),
                scalar: f.scalar,
                column_name: f.column_name.to_string(),
                column_type: f.sql_type.map(str::to_string),
                value_generated: f.value_generated,
                default_sql: f.default.map(str::to_string),
                primary_key: f.primary_key,
                row_version: f.row_version,
                nullable: f.nullable,
            })
            .collect();

        for column in &columns {
            if T::property(&column.property).is_none() {
                return Err(Error::unknown_property(type_name, &column.property));
            }
        }

        let primary_keys: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.property.clone())
            .collect();

        let insertable = columns
            .iter()
            .filter(|c| !c.is_store_generated())
            .map(|c| c.property.clone())
            .collect();

        let output_id = match primary_keys.as_slice() {
            [single] => columns
                .iter()
                .find(|c| &c.property == single)
                .and_then(infer_output_id),
            _ => None,
        };

        let converters = T::converters()
            .into_iter()
            .map(|(prop, conv)| (prop.to_string(), conv))
            .collect();

        Ok(Self {
            entity_type: TypeId::of::<T>(),
            type_name,
            table,
            columns,
            primary_keys,
            insertable,
            converters,
            output_id,
            parameter_factory: None,
        })
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, property: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Primary key properties in order.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// All mapped properties in order.
    pub fn property_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.property.as_str()).collect()
    }

    /// Properties a plain insert writes (excludes database-generated columns).
    pub fn insertable_properties(&self) -> &[String] {
        &self.insertable
    }

    /// Properties a plain update writes: everything but keys and
    /// database-generated columns.
    pub fn updatable_properties(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.primary_key && !c.is_store_generated())
            .map(|c| c.property.as_str())
            .collect()
    }

    pub fn output_id(&self) -> Option<&OutputId> {
        self.output_id.as_ref()
    }

    pub fn converter(&self, property: &str) -> Option<&ValueConverter> {
        self.converters.get(property)
    }

    /// Property name to column name.
    pub fn column_name_map(&self) -> HashMap<&str, &str> {
        self.columns
            .iter()
            .map(|c| (c.property.as_str(), c.column_name.as_str()))
            .collect()
    }

    /// Property name to declared column type, for properties that declare one.
    pub fn column_type_map(&self) -> HashMap<&str, &str> {
        self.columns
            .iter()
            .filter_map(|c| Some((c.property.as_str(), c.column_type.as_deref()?)))
            .collect()
    }

    fn require(&self, property: &str) -> Result<&ColumnDescriptor> {
        self.column(property)
            .ok_or_else(|| Error::unknown_property(self.type_name, property))
    }

    pub fn column_name(&self, property: &str) -> Result<&str> {
        self.require(property).map(|c| c.column_name.as_str())
    }

    /// Logical type of the staged value: the converter's provider type when a
    /// converter is attached, the property type otherwise.
    pub fn staged_type(&self, property: &str) -> Result<ScalarType> {
        let column = self.require(property)?;
        Ok(self
            .converter(property)
            .map_or(column.scalar, ValueConverter::provider_type))
    }

    /// Database type of the column: the declared type, else the default for
    /// the staged type.
    pub fn sql_type(&self, property: &str, types: &TypeMappings) -> Result<String> {
        let column = self.require(property)?;
        match &column.column_type {
            Some(declared) => Ok(declared.clone()),
            None => Ok(types.sql_type_for(self.staged_type(property)?)),
        }
    }

    /// Convert a property value to what is sent to the server.
    pub fn provider_value(&self, property: &str, value: Value, types: &TypeMappings) -> Result<Value> {
        let value = match self.converter(property) {
            Some(conv) => conv.to_provider(&value)?,
            None => value,
        };
        Ok(types.coerce(value, &self.sql_type(property, types)?))
    }

    /// Convert a value read from the server back to the property's form.
    pub fn model_value(&self, property: &str, value: &Value) -> Result<Value> {
        match self.converter(property) {
            Some(conv) => conv.from_provider(value),
            None => Ok(value.clone()),
        }
    }

    /// Build the `@property` parameter for one value.
    pub fn create_parameter(&self, property: &str, value: Value, types: &TypeMappings) -> Result<Parameter> {
        let provider = self.provider_value(property, value, types)?;
        if let Some(factory) = &self.parameter_factory {
            return Ok(factory(property, provider));
        }
        Ok(Parameter::new(property, provider).sql_type(self.sql_type(property, types)?))
    }

    /// Build parameters for the given properties of one record.
    pub fn create_parameters<T: Entity>(
        &self,
        record: &T,
        properties: &[&str],
        types: &TypeMappings,
    ) -> Result<Vec<Parameter>> {
        properties
            .iter()
            .map(|prop| {
                let value = record
                    .get(prop)
                    .ok_or_else(|| Error::unknown_property(self.type_name, prop))?;
                self.create_parameter(prop, value, types)
            })
            .collect()
    }

    /// Fails unless the profile was built for `T`.
    pub(crate) fn check_type<T: Entity>(&self) -> Result<()> {
        if self.entity_type == TypeId::of::<T>() {
            return Ok(());
        }
        Err(Error::Mapping(MappingError {
            kind: MappingErrorKind::Invalid,
            type_name: std::any::type_name::<T>().to_string(),
            profile: None,
            message: format!(
                "mapping profile for '{}' used with '{}'",
                self.type_name,
                std::any::type_name::<T>()
            ),
        }))
    }
}

/// Server-generated when the database produces the key; client-generated for
/// UUID keys without a server default.
fn infer_output_id(column: &ColumnDescriptor) -> Option<OutputId> {
    let mode = if column.is_store_generated() {
        OutputIdMode::ServerGenerated
    } else if column.scalar == ScalarType::Uuid && column.default_sql.is_none() {
        OutputIdMode::ClientGenerated
    } else {
        return None;
    };
    Some(OutputId {
        property: column.property.clone(),
        mode,
    })
}

/// Is an id property still at its "not yet assigned" value?
pub(crate) fn is_unset_id(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Uuid(bytes) => bytes.iter().all(|b| *b == 0),
        Value::Text(s) => s.is_empty() || uuid::Uuid::parse_str(s).is_ok_and(|u| u.is_nil()),
        Value::Bytes(b) => b.is_empty() || b.iter().all(|x| *x == 0),
        other => other.as_i64() == Some(0),
    }
}
