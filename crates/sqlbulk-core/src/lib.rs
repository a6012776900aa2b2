//! Core types and traits for SQLBulk.
//!
//! This crate provides the foundational abstractions the bulk engine is built on:
//!
//! - `Value` / `Row` / `FromValue` for dynamically typed cells
//! - `Entity` (field-accessor table) and `Model` (ORM metadata) traits
//! - `Connection` trait with named-parameter commands and bulk load
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod converter;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod model;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{Connection, Parameter, SqlCommand};
pub use converter::ValueConverter;
pub use error::{
    ArgumentError, ConfigError, ConnectionError, ConnectionErrorKind, Error, MappingError,
    MappingErrorKind, QueryError, QueryErrorKind, Result, TypeError,
};
pub use field::{FieldInfo, PropertyInfo, ValueGenerated};
pub use identifiers::{qualified_name, quote_ident};
pub use model::{DbContext, Entity, Model};
pub use row::{ColumnInfo, FromValue, Row};
pub use types::{ScalarInfo, ScalarType};
pub use value::Value;

/// Unwrap an `Outcome`, returning early from the enclosing async fn on
/// error, cancellation or panic.
#[macro_export]
macro_rules! try_outcome {
    ($e:expr) => {
        match $e {
            $crate::Outcome::Ok(v) => v,
            $crate::Outcome::Err(e) => return $crate::Outcome::Err(e),
            $crate::Outcome::Cancelled(r) => return $crate::Outcome::Cancelled(r),
            $crate::Outcome::Panicked(p) => return $crate::Outcome::Panicked(p),
        }
    };
}

/// Unwrap a `Result` inside a fn returning `Outcome`.
#[macro_export]
macro_rules! try_result {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return $crate::Outcome::Err(e),
        }
    };
}
