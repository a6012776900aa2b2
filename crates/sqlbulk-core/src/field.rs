//! Property and column definitions.

use crate::types::ScalarType;

/// Accessor-table entry for one entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Rust field name
    pub name: &'static str,
    /// Logical type, `Option` removed
    pub scalar: ScalarType,
    /// Whether the Rust type admits NULL
    pub nullable: bool,
}

impl PropertyInfo {
    pub const fn new(name: &'static str, scalar: ScalarType) -> Self {
        Self {
            name,
            scalar,
            nullable: false,
        }
    }

    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }
}

/// When the database produces a column's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueGenerated {
    #[default]
    Never,
    OnAdd,
    OnAddOrUpdate,
}

/// ORM metadata about a model field/column.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Rust field (property) name
    pub name: &'static str,
    /// Database column name (may differ from field name)
    pub column_name: &'static str,
    /// Logical type of the property
    pub scalar: ScalarType,
    /// Explicit database type (e.g. "varchar(255)", "datetime(3)")
    pub sql_type: Option<&'static str>,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub value_generated: ValueGenerated,
    /// Default value expression (SQL)
    pub default: Option<&'static str>,
    /// Concurrency token maintained by the database
    pub row_version: bool,
}

impl FieldInfo {
    /// Create a new field info with minimal required data.
    pub const fn new(name: &'static str, column_name: &'static str, scalar: ScalarType) -> Self {
        Self {
            name,
            column_name,
            scalar,
            sql_type: None,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            value_generated: ValueGenerated::Never,
            default: None,
            row_version: false,
        }
    }

    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    pub const fn sql_type(mut self, type_str: &'static str) -> Self {
        self.sql_type = Some(type_str);
        self
    }

    pub const fn sql_type_opt(mut self, type_str: Option<&'static str>) -> Self {
        self.sql_type = type_str;
        self
    }

    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Auto-increment implies the value is generated on add.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        if value && matches!(self.value_generated, ValueGenerated::Never) {
            self.value_generated = ValueGenerated::OnAdd;
        }
        self
    }

    pub const fn value_generated(mut self, value: ValueGenerated) -> Self {
        self.value_generated = value;
        self
    }

    pub const fn default_sql(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    pub const fn default_opt(mut self, expr: Option<&'static str>) -> Self {
        self.default = expr;
        self
    }

    /// Row versions are maintained by the server on every write.
    pub const fn row_version(mut self, value: bool) -> Self {
        self.row_version = value;
        if value {
            self.value_generated = ValueGenerated::OnAddOrUpdate;
        }
        self
    }

    /// Is the value produced by the database rather than the caller?
    pub const fn is_store_generated(&self) -> bool {
        !matches!(self.value_generated, ValueGenerated::Never) || self.row_version
    }
}
