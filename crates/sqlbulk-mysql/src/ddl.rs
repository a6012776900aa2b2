//! Temporary staging table DDL.

use std::collections::HashMap;

use sqlbulk_core::quote_ident;

use crate::mapping::MappingProfile;
use crate::table::{DataColumn, DataTable};
use crate::types::{MySqlType, TypeMappings};

/// Key prefix for TEXT/BLOB index columns.
pub const INDEX_PREFIX_LENGTH: usize = 255;

/// Property-to-column name and type overrides applied at the staging
/// boundary. Missing entries fall back to the property name and the default
/// type of the column's staged type.
#[derive(Debug, Clone, Default)]
pub struct ColumnOverrides<'a> {
    names: HashMap<&'a str, &'a str>,
    types: HashMap<&'a str, &'a str>,
}

impl<'a> ColumnOverrides<'a> {
    pub fn new(names: HashMap<&'a str, &'a str>, types: HashMap<&'a str, &'a str>) -> Self {
        Self { names, types }
    }

    pub fn from_profile(profile: &'a MappingProfile) -> Self {
        Self {
            names: profile.column_name_map(),
            types: profile.column_type_map(),
        }
    }

    pub fn column_name<'s>(&'s self, property: &'s str) -> &'s str {
        self.names.get(property).copied().unwrap_or(property)
    }

    /// Quoted column name for a property.
    pub fn quoted(&self, property: &str) -> String {
        quote_ident(self.column_name(property))
    }

    pub fn sql_type(&self, column: &DataColumn, types: &TypeMappings) -> String {
        match self.types.get(column.name.as_str()) {
            Some(declared) => (*declared).to_string(),
            None => types.sql_type_for(column.scalar),
        }
    }
}

/// Index created right after the staging table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Property names of the indexed columns
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            unique: false,
        }
    }

    pub fn unique(columns: Vec<String>) -> Self {
        Self {
            columns,
            unique: true,
        }
    }
}

/// A fresh quoted temp table name.
pub fn temp_table_name() -> String {
    quote_ident(&format!("tmp_{}", uuid::Uuid::new_v4().simple()))
}

fn index_name() -> String {
    quote_ident(&format!("ix_{}", uuid::Uuid::new_v4().simple()))
}

/// Whether a UNIQUE index over this column compares whole values byte for
/// byte. Prefixed TEXT/BLOB keys and collated character keys (other than
/// canonical uuid text) can collide on distinct values.
fn exact_unique(
    column: &DataColumn,
    overrides: &ColumnOverrides<'_>,
    types: &TypeMappings,
) -> bool {
    let kind = types.classify(&overrides.sql_type(column, types));
    !kind.needs_index_prefix() && (kind == MySqlType::Guid || !kind.is_string())
}

/// `CREATE TEMPORARY TABLE` for the buffer's shape, every column `NULL`,
/// optionally followed by `CREATE [UNIQUE] INDEX` over key columns.
///
/// A unique index falls back to a plain one when any key column cannot be
/// compared exactly; callers requesting uniqueness dedup the buffer first.
pub fn create_temp_table(
    table_name: &str,
    data: &DataTable,
    overrides: &ColumnOverrides<'_>,
    types: &TypeMappings,
    index: Option<&IndexSpec>,
) -> String {
    let columns: Vec<String> = data
        .columns()
        .iter()
        .map(|c| {
            format!(
                "{} {} NULL",
                overrides.quoted(&c.name),
                overrides.sql_type(c, types)
            )
        })
        .collect();
    let mut sql = format!(
        "CREATE TEMPORARY TABLE {} ({});",
        table_name,
        columns.join(", ")
    );

    if let Some(index) = index.filter(|i| !i.columns.is_empty()) {
        let unique = index.unique
            && index
                .columns
                .iter()
                .filter_map(|prop| data.column(prop))
                .all(|c| exact_unique(c, overrides, types));
        if index.unique && !unique {
            tracing::debug!(
                table = table_name,
                "Key columns compare by prefix or collation, using a plain index"
            );
        }
        let keys: Vec<String> = index
            .columns
            .iter()
            .map(|prop| {
                let quoted = overrides.quoted(prop);
                let prefixed = data.column(prop).is_some_and(|c| {
                    types
                        .classify(&overrides.sql_type(c, types))
                        .needs_index_prefix()
                });
                if prefixed {
                    format!("{}({})", quoted, INDEX_PREFIX_LENGTH)
                } else {
                    quoted
                }
            })
            .collect();
        sql.push_str(&format!(
            "\nCREATE {}INDEX {} ON {} ({});",
            if unique { "UNIQUE " } else { "" },
            index_name(),
            table_name,
            keys.join(", ")
        ));
    }

    sql
}
