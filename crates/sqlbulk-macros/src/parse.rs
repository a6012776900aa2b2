//! Parsing of `#[bulk(...)]` attributes for the derive macros.

use proc_macro2::Span;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, Generics, Ident, Lit, LitStr, Path,
    Result, Type,
};

/// Parsed struct for the derives.
#[derive(Debug)]
pub struct EntityDef {
    pub name: Ident,
    pub generics: Generics,
    pub table_name: String,
    pub schema: Option<String>,
    pub fields: Vec<FieldDef>,
}

/// When the database produces a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    Never,
    OnAdd,
    OnAddOrUpdate,
}

/// Parsed field.
#[derive(Debug)]
pub struct FieldDef {
    pub name: Ident,
    pub ty: Type,
    pub column_name: String,
    pub sql_type: Option<String>,
    pub nullable: Option<bool>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub generated: Generated,
    pub default: Option<String>,
    pub row_version: bool,
    /// Path to a `fn() -> ValueConverter`
    pub converter: Option<Path>,
    /// Not a property at all
    pub skip: bool,
}

impl EntityDef {
    /// Fields that take part in the accessor table and mapping.
    pub fn properties(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.skip)
    }
}

pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();

    let (table_name, schema) = parse_struct_attrs(&input.attrs, &name)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "bulk entities can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "bulk entities can only be derived for structs, not unions",
            ));
        }
    };

    Ok(EntityDef {
        name,
        generics,
        table_name,
        schema,
        fields,
    })
}

fn lit_str(meta: &syn::meta::ParseNestedMeta<'_>, what: &str) -> Result<String> {
    let value: Lit = meta.value()?.parse()?;
    match value {
        Lit::Str(s) => Ok(s.value()),
        other => Err(Error::new_spanned(
            other,
            format!("expected string literal for {}", what),
        )),
    }
}

/// Struct-level keys: `table = "name"`, `schema = "name"`.
fn parse_struct_attrs(attrs: &[Attribute], struct_name: &Ident) -> Result<(String, Option<String>)> {
    let mut table_name: Option<String> = None;
    let mut schema: Option<String> = None;

    for attr in attrs {
        if !attr.path().is_ident("bulk") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table_name = Some(lit_str(&meta, "table name")?);
            } else if meta.path.is_ident("schema") {
                schema = Some(lit_str(&meta, "schema")?);
            } else {
                return Err(meta.error("unknown bulk struct attribute"));
            }
            Ok(())
        })?;
    }

    let table_name = table_name.unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
    if table_name.is_empty() {
        return Err(Error::new_spanned(struct_name, "table name must not be empty"));
    }
    Ok((table_name, schema))
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "bulk entities require a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "bulk entities require a struct with fields, not a unit struct",
        )),
    }
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut def = FieldDef {
        column_name: name.to_string(),
        name,
        ty: field.ty.clone(),
        sql_type: None,
        nullable: None,
        primary_key: false,
        auto_increment: false,
        generated: Generated::Never,
        default: None,
        row_version: false,
        converter: None,
        skip: false,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("bulk") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("primary_key") {
                def.primary_key = true;
            } else if path.is_ident("auto_increment") {
                def.auto_increment = true;
            } else if path.is_ident("nullable") {
                def.nullable = Some(true);
            } else if path.is_ident("row_version") {
                def.row_version = true;
            } else if path.is_ident("skip") {
                def.skip = true;
            } else if path.is_ident("column") {
                def.column_name = lit_str(&meta, "column name")?;
            } else if path.is_ident("sql_type") {
                def.sql_type = Some(lit_str(&meta, "sql_type")?);
            } else if path.is_ident("default") {
                def.default = Some(lit_str(&meta, "default")?);
            } else if path.is_ident("generated") {
                let value: LitStr = meta.value()?.parse()?;
                def.generated = match value.value().as_str() {
                    "never" => Generated::Never,
                    "on_add" => Generated::OnAdd,
                    "on_add_or_update" => Generated::OnAddOrUpdate,
                    _ => {
                        return Err(Error::new_spanned(
                            value,
                            "generated must be \"never\", \"on_add\" or \"on_add_or_update\"",
                        ));
                    }
                };
            } else if path.is_ident("converter") {
                let value: LitStr = meta.value()?.parse()?;
                def.converter = Some(value.parse()?);
            } else {
                return Err(meta.error("unknown bulk field attribute"));
            }
            Ok(())
        })?;
    }

    if def.skip && (def.primary_key || def.converter.is_some()) {
        return Err(Error::new_spanned(
            &def.name,
            "a skipped field cannot be a primary key or carry a converter",
        ));
    }
    if def.column_name.is_empty() {
        return Err(Error::new_spanned(&def.name, "column name must not be empty"));
    }

    Ok(def)
}

/// Convert PascalCase to snake_case.
///
/// - `Order` -> `order`
/// - `BulkTestEntity` -> `bulk_test_entity`
/// - `HTTPLog` -> `http_log`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();
                if prev.is_lowercase()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()))
                {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Order"), "order");
        assert_eq!(to_snake_case("BulkTestEntity"), "bulk_test_entity");
        assert_eq!(to_snake_case("HTTPLog"), "http_log");
    }

    #[test]
    fn test_struct_attrs() {
        let input: DeriveInput = parse_quote! {
            #[bulk(table = "orders", schema = "shop")]
            struct Order {
                #[bulk(primary_key, auto_increment)]
                id: i64,
                total: f64,
            }
        };
        let def = parse_entity(&input).unwrap();
        assert_eq!(def.table_name, "orders");
        assert_eq!(def.schema.as_deref(), Some("shop"));
        assert!(def.fields[0].primary_key);
        assert!(def.fields[0].auto_increment);
    }

    #[test]
    fn test_default_table_name() {
        let input: DeriveInput = parse_quote! {
            struct BulkTestEntity { id: i32 }
        };
        let def = parse_entity(&input).unwrap();
        assert_eq!(def.table_name, "bulk_test_entity");
        assert_eq!(def.schema, None);
    }

    #[test]
    fn test_field_attrs() {
        let input: DeriveInput = parse_quote! {
            struct Row {
                #[bulk(column = "created_at", sql_type = "datetime(3)", generated = "on_add")]
                created: chrono::NaiveDateTime,
                #[bulk(converter = "crate::conv::season")]
                season: String,
                #[bulk(row_version)]
                stamp: Vec<u8>,
                #[bulk(skip)]
                cache: Option<String>,
            }
        };
        let def = parse_entity(&input).unwrap();
        let created = &def.fields[0];
        assert_eq!(created.column_name, "created_at");
        assert_eq!(created.sql_type.as_deref(), Some("datetime(3)"));
        assert_eq!(created.generated, Generated::OnAdd);
        assert!(def.fields[1].converter.is_some());
        assert!(def.fields[2].row_version);
        assert_eq!(def.properties().count(), 3);
    }

    #[test]
    fn test_unknown_attribute_errors() {
        let input: DeriveInput = parse_quote! {
            struct Row {
                #[bulk(primary)]
                id: i32,
            }
        };
        let err = parse_entity(&input).unwrap_err();
        assert!(err.to_string().contains("unknown bulk field attribute"));
    }

    #[test]
    fn test_bad_generated_value() {
        let input: DeriveInput = parse_quote! {
            struct Row {
                #[bulk(generated = "sometimes")]
                id: i32,
            }
        };
        assert!(parse_entity(&input).is_err());
    }

    #[test]
    fn test_tuple_struct_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Row(i32);
        };
        assert!(parse_entity(&input).is_err());
    }
}
