//! MySQL bulk operations for SQLBulk Rust.
//!
//! Moves collections of records in and out of a MySQL-family server with a
//! handful of set-based statements instead of one statement per row:
//!
//! - Mapping profiles (table, columns, keys, converters, output id) from an
//!   explicit registry or from ORM model metadata
//! - A staging buffer built from records through the per-type accessor table
//! - `CREATE TEMPORARY TABLE` DDL with an optional key index
//! - Bulk copy via `LOAD DATA LOCAL INFILE` or chunked multi-row INSERT
//! - Insert, update, delete, merge and match builders joining the staged
//!   rows to the target table
//!
//! # Execution
//!
//! One record takes a single parameterized statement. More records are
//! staged into a uniquely named temp table and applied with one or two
//! `JOIN`-based statements. The builders never open or close transactions;
//! pass a connection bound to the caller's transaction to run inside it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlbulk_mysql::{BulkMergeOptions, BulkSession, MappingProfile, MappingRegistry};
//!
//! MappingRegistry::global().configure::<Product, _>(|p| p.table("products").primary_key("id"))?;
//!
//! let result = BulkSession::global()
//!     .merge::<Product>(BulkMergeOptions::new().log(|line| println!("{line}")))?
//!     .update_columns(["price", "stock+="])
//!     .execute(&cx, &conn, &mut products)
//!     .await;
//! ```

pub mod builder;
pub mod columns;
pub mod copy;
pub mod ddl;
pub mod log;
pub mod mapping;
pub mod options;
pub mod result;
pub mod session;
pub mod table;
pub mod types;

pub use builder::{BulkDelete, BulkInsert, BulkMatch, BulkMerge, BulkUpdate};
pub use columns::{AssignOp, ColumnRef, Columns};
pub use copy::BulkCopy;
pub use ddl::{ColumnOverrides, IndexSpec};
pub use log::{LogSink, OperationLog};
pub use mapping::{
    ColumnDescriptor, ContextMappings, MappingProfile, MappingRegistry, MappingResolver,
    ModelMetadata, OutputId, OutputIdMode, ParameterFactory, ProfileBuilder, TableDescriptor,
};
pub use options::{
    BulkDeleteOptions, BulkInsertOptions, BulkMatchOptions, BulkMergeOptions, BulkOptions,
    BulkUpdateOptions, NotMatchedBySource, SetClause, SetClauseContext,
};
pub use result::{BulkDeleteResult, BulkInsertResult, BulkMergeResult, BulkUpdateResult};
pub use session::BulkSession;
pub use table::{DataColumn, DataTable};
pub use types::{MySqlType, TypeMappings};
