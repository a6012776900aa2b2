//! SQLBulk Rust - high-throughput bulk operations for MySQL.
//!
//! Moves collections of records with a few set-based statements instead of
//! one round trip per row:
//!
//! - Bulk insert through `LOAD DATA LOCAL INFILE` or chunked multi-row INSERT
//! - Bulk update, delete and match by joining a staged temp table
//! - Merge (insert or update) in two statements over the same staged rows
//! - A single parameterized statement when there is only one record
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlbulk::prelude::*;
//!
//! #[derive(Entity, Model, Debug, Default)]
//! #[bulk(table = "products")]
//! struct Product {
//!     #[bulk(primary_key, auto_increment)]
//!     id: i64,
//!     name: String,
//!     stock: i32,
//! }
//!
//! struct Shop;
//! impl DbContext for Shop {}
//!
//! async fn restock(cx: &Cx, conn: &impl Connection, items: &mut [Product]) -> Outcome<u64, Error> {
//!     let bulk = BulkSession::<ContextMappings<Shop>>::for_context();
//!
//!     // Add incoming quantities to the stored stock
//!     let updated = match bulk.update::<Product>(BulkUpdateOptions::new()) {
//!         Ok(update) => update.columns(columns!(Product { stock += })),
//!         Err(e) => return Outcome::Err(e),
//!     };
//!     updated.execute(cx, conn, items).await.map(|r| r.affected_rows)
//! }
//! ```
//!
//! The derives expand to `sqlbulk_core` paths, so crates using them depend
//! on `sqlbulk-core` as well.

pub use sqlbulk_core::{
    ArgumentError, ConfigError, Connection, ConnectionError, ConnectionErrorKind, Cx, DbContext,
    Entity, Error, FieldInfo, FromValue, MappingError, MappingErrorKind, Model, Outcome,
    Parameter, PropertyInfo, QueryError, QueryErrorKind, Result, Row, ScalarInfo, ScalarType,
    SqlCommand, TypeError, Value, ValueConverter, ValueGenerated, qualified_name, quote_ident,
};

pub use sqlbulk_macros::{Entity, Model};

pub use sqlbulk_mysql::{
    AssignOp, BulkCopy, BulkDelete, BulkDeleteOptions, BulkDeleteResult, BulkInsert,
    BulkInsertOptions, BulkInsertResult, BulkMatch, BulkMatchOptions, BulkMerge,
    BulkMergeOptions, BulkMergeResult, BulkOptions, BulkSession, BulkUpdate, BulkUpdateOptions,
    BulkUpdateResult, ColumnRef, Columns, ContextMappings, DataTable, MappingProfile,
    MappingRegistry, MappingResolver, ModelMetadata, MySqlType, NotMatchedBySource, OutputIdMode,
    ProfileBuilder, SetClause, SetClauseContext, TypeMappings, columns,
};

/// Everything needed to map a type and run bulk operations.
pub mod prelude {
    pub use crate::{
        BulkDeleteOptions, BulkInsertOptions, BulkMatchOptions, BulkMergeOptions, BulkSession,
        BulkUpdateOptions, Columns, Connection, ContextMappings, Cx, DbContext, Entity, Error,
        MappingProfile, MappingRegistry, Model, Outcome, Result, Value, columns,
    };
}
