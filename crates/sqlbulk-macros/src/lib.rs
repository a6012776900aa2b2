//! Procedural macros for SQLBulk Rust.
//!
//! - `#[derive(Entity)]` generates the per-type field-accessor table
//!   (`properties`, `get`, `set`) the bulk engine reads and writes records through.
//! - `#[derive(Model)]` generates ORM metadata (table, schema, column facts,
//!   value converters) for the context-based mapping path.
//!
//! Both derives read the same `#[bulk(...)]` attributes.

use proc_macro::TokenStream;
use quote::quote;

mod parse;

use parse::{EntityDef, Generated, parse_entity};

/// Derive macro for the `Entity` trait.
///
/// Every property type must implement `ScalarInfo`, `FromValue`, `Clone` and
/// `Into<Value>`.
///
/// # Attributes
///
/// - `#[bulk(skip)]` - Field is not a property
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
/// }
/// ```
#[proc_macro_derive(Entity, attributes(bulk))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let entity = match parse_entity(&input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_entity_impl(&entity).into()
}

/// Derive macro for the `Model` trait. Requires `Entity` as well.
///
/// # Attributes
///
/// - `#[bulk(table = "name")]` - Override table name (defaults to snake_case struct name)
/// - `#[bulk(schema = "name")]` - Schema (database) of the table
/// - `#[bulk(primary_key)]` - Mark field as (part of) the primary key
/// - `#[bulk(auto_increment)]` - Server-assigned id
/// - `#[bulk(column = "name")]` - Override column name
/// - `#[bulk(sql_type = "datetime(3)")]` - Declared database type
/// - `#[bulk(nullable)]` - Force nullability
/// - `#[bulk(default = "expr")]` - Default SQL expression
/// - `#[bulk(generated = "on_add" | "on_add_or_update")]` - Value produced by the database
/// - `#[bulk(row_version)]` - Concurrency token
/// - `#[bulk(converter = "path::to::fn")]` - `fn() -> ValueConverter` for this property
///
/// # Example
///
/// ```ignore
/// #[derive(Entity, Model, Default)]
/// #[bulk(table = "orders")]
/// struct Order {
///     #[bulk(primary_key, auto_increment)]
///     id: i64,
///     #[bulk(column = "customer_name", sql_type = "varchar(100)")]
///     customer: String,
/// }
/// ```
#[proc_macro_derive(Model, attributes(bulk))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let entity = match parse_entity(&input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_model_impl(&entity).into()
}

fn generate_entity_impl(entity: &EntityDef) -> proc_macro2::TokenStream {
    let name = &entity.name;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = entity.generics.split_for_impl();

    let props: Vec<_> = entity.properties().collect();
    let count = props.len();

    let infos = props.iter().map(|f| {
        let prop = f.name.to_string();
        let ty = &f.ty;
        quote! {
            sqlbulk_core::PropertyInfo::new(
                #prop,
                <#ty as sqlbulk_core::ScalarInfo>::SCALAR,
            )
            .nullable(<#ty as sqlbulk_core::ScalarInfo>::NULLABLE)
        }
    });

    let getters = props.iter().map(|f| {
        let ident = &f.name;
        let prop = ident.to_string();
        quote! {
            #prop => ::core::option::Option::Some(sqlbulk_core::Value::from(
                ::core::clone::Clone::clone(&self.#ident),
            )),
        }
    });

    let setters = props.iter().map(|f| {
        let ident = &f.name;
        let ty = &f.ty;
        let prop = ident.to_string();
        quote! {
            #prop => {
                self.#ident = <#ty as sqlbulk_core::FromValue>::from_value(&value)?;
            }
        }
    });

    quote! {
        impl #impl_generics sqlbulk_core::Entity for #name #ty_generics #where_clause {
            fn properties() -> &'static [sqlbulk_core::PropertyInfo] {
                static PROPERTIES: [sqlbulk_core::PropertyInfo; #count] = [
                    #(#infos),*
                ];
                &PROPERTIES
            }

            fn get(&self, property: &str) -> ::core::option::Option<sqlbulk_core::Value> {
                match property {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set(
                &mut self,
                property: &str,
                value: sqlbulk_core::Value,
            ) -> sqlbulk_core::Result<()> {
                match property {
                    #(#setters)*
                    other => {
                        return ::core::result::Result::Err(
                            sqlbulk_core::Error::unknown_property(#type_name, other),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }
    }
}

fn generate_model_impl(entity: &EntityDef) -> proc_macro2::TokenStream {
    let name = &entity.name;
    let table_name = &entity.table_name;
    let (impl_generics, ty_generics, where_clause) = entity.generics.split_for_impl();

    let schema = match &entity.schema {
        Some(s) => quote! { ::core::option::Option::Some(#s) },
        None => quote! { ::core::option::Option::None },
    };

    let props: Vec<_> = entity.properties().collect();
    let count = props.len();

    let fields = props.iter().map(|f| {
        let prop = f.name.to_string();
        let column = &f.column_name;
        let ty = &f.ty;
        let primary_key = f.primary_key;
        let auto_increment = f.auto_increment;
        let row_version = f.row_version;

        let nullable = match f.nullable {
            Some(v) => quote! { #v },
            None => quote! { <#ty as sqlbulk_core::ScalarInfo>::NULLABLE },
        };
        let sql_type = match &f.sql_type {
            Some(s) => quote! { ::core::option::Option::Some(#s) },
            None => quote! { ::core::option::Option::None },
        };
        let default = match &f.default {
            Some(s) => quote! { ::core::option::Option::Some(#s) },
            None => quote! { ::core::option::Option::None },
        };
        let generated = match f.generated {
            Generated::Never => quote! { sqlbulk_core::ValueGenerated::Never },
            Generated::OnAdd => quote! { sqlbulk_core::ValueGenerated::OnAdd },
            Generated::OnAddOrUpdate => quote! { sqlbulk_core::ValueGenerated::OnAddOrUpdate },
        };

        // value_generated first so auto_increment/row_version can refine it
        quote! {
            sqlbulk_core::FieldInfo::new(
                #prop,
                #column,
                <#ty as sqlbulk_core::ScalarInfo>::SCALAR,
            )
            .value_generated(#generated)
            .sql_type_opt(#sql_type)
            .nullable(#nullable)
            .primary_key(#primary_key)
            .auto_increment(#auto_increment)
            .default_opt(#default)
            .row_version(#row_version)
        }
    });

    let converters: Vec<_> = props
        .iter()
        .filter_map(|f| {
            let path = f.converter.as_ref()?;
            let prop = f.name.to_string();
            Some(quote! { (#prop, #path()) })
        })
        .collect();

    let converters_fn = if converters.is_empty() {
        quote! {}
    } else {
        quote! {
            fn converters() -> ::std::vec::Vec<(&'static str, sqlbulk_core::ValueConverter)> {
                ::std::vec![#(#converters),*]
            }
        }
    };

    quote! {
        impl #impl_generics sqlbulk_core::Model for #name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table_name;
            const SCHEMA: ::core::option::Option<&'static str> = #schema;

            fn fields() -> &'static [sqlbulk_core::FieldInfo] {
                static FIELDS: [sqlbulk_core::FieldInfo; #count] = [
                    #(#fields),*
                ];
                &FIELDS
            }

            #converters_fn
        }
    }
}
