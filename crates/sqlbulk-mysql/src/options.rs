//! Per-call options for bulk operations.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::log::LogSink;
use crate::mapping::TableDescriptor;

/// Default command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options shared by every bulk operation.
#[derive(Clone)]
pub struct BulkOptions {
    /// Rows per bulk-copy batch (0 = engine default)
    pub batch_size: usize,
    /// Command timeout for every statement of the operation
    pub timeout: Duration,
    /// Receives checkpoint lines
    pub log: Option<LogSink>,
    /// Named mapping profile to resolve instead of the default one
    pub mapping_name: Option<String>,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            batch_size: 0,
            timeout: DEFAULT_TIMEOUT,
            log: None,
            mapping_name: None,
        }
    }
}

impl fmt::Debug for BulkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkOptions")
            .field("batch_size", &self.batch_size)
            .field("timeout", &self.timeout)
            .field("log", &self.log.is_some())
            .field("mapping_name", &self.mapping_name)
            .finish()
    }
}

impl BulkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn log<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(sink));
        self
    }

    pub fn mapping_name(mut self, name: impl Into<String>) -> Self {
        self.mapping_name = Some(name.into());
        self
    }
}

/// Inputs to a custom SET-clause fragment.
#[derive(Debug, Clone, Copy)]
pub struct SetClauseContext<'a> {
    pub table: &'a TableDescriptor,
    pub property: &'a str,
    /// Target column reference, e.g. ``a.`qty` ``
    pub left: &'a str,
    /// Staged value reference, e.g. ``b.`qty` `` or `@qty`
    pub right: &'a str,
    pub target_alias: &'a str,
    pub source_alias: &'a str,
}

/// Returns a full assignment fragment for a property, or `None` for the
/// default `left = right`.
pub type SetClause = Arc<dyn Fn(&SetClauseContext<'_>) -> Option<String> + Send + Sync>;

/// Action for target rows with no staged counterpart.
///
/// MySQL has no `WHEN NOT MATCHED BY SOURCE`; configuring one is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotMatchedBySource {
    Delete,
    /// Apply a SET fragment to the unmatched target rows
    Update(String),
}

macro_rules! common_setters {
    () => {
        pub fn batch_size(mut self, rows: usize) -> Self {
            self.bulk.batch_size = rows;
            self
        }

        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.bulk.timeout = timeout;
            self
        }

        pub fn log<F>(mut self, sink: F) -> Self
        where
            F: Fn(&str) + Send + Sync + 'static,
        {
            self.bulk.log = Some(Arc::new(sink));
            self
        }

        pub fn mapping_name(mut self, name: impl Into<String>) -> Self {
            self.bulk.mapping_name = Some(name.into());
            self
        }
    };
}

/// Options for bulk insert.
#[derive(Debug, Clone, Default)]
pub struct BulkInsertOptions {
    pub bulk: BulkOptions,
    /// Insert the id column verbatim instead of generating it
    pub keep_identity: bool,
}

impl BulkInsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    common_setters!();

    pub fn keep_identity(mut self, keep: bool) -> Self {
        self.keep_identity = keep;
        self
    }
}

/// Options for bulk update.
#[derive(Clone, Default)]
pub struct BulkUpdateOptions {
    pub bulk: BulkOptions,
    /// Collation applied to textual key comparisons
    pub collation: Option<String>,
    pub set_clause: Option<SetClause>,
}

impl fmt::Debug for BulkUpdateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkUpdateOptions")
            .field("bulk", &self.bulk)
            .field("collation", &self.collation)
            .field("set_clause", &self.set_clause.is_some())
            .finish()
    }
}

impl BulkUpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    common_setters!();

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn set_clause<F>(mut self, f: F) -> Self
    where
        F: Fn(&SetClauseContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.set_clause = Some(Arc::new(f));
        self
    }
}

/// Options for bulk delete.
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteOptions {
    pub bulk: BulkOptions,
    pub collation: Option<String>,
}

impl BulkDeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    common_setters!();

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }
}

/// Options for bulk merge.
#[derive(Clone, Default)]
pub struct BulkMergeOptions {
    pub bulk: BulkOptions,
    pub collation: Option<String>,
    pub set_clause: Option<SetClause>,
    /// Always rejected on MySQL
    pub when_not_matched_by_source: Option<NotMatchedBySource>,
}

impl fmt::Debug for BulkMergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkMergeOptions")
            .field("bulk", &self.bulk)
            .field("collation", &self.collation)
            .field("set_clause", &self.set_clause.is_some())
            .field("when_not_matched_by_source", &self.when_not_matched_by_source)
            .finish()
    }
}

impl BulkMergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    common_setters!();

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn set_clause<F>(mut self, f: F) -> Self
    where
        F: Fn(&SetClauseContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.set_clause = Some(Arc::new(f));
        self
    }

    pub fn when_not_matched_by_source(mut self, action: NotMatchedBySource) -> Self {
        self.when_not_matched_by_source = Some(action);
        self
    }
}

/// Options for bulk match (keyed read).
#[derive(Debug, Clone, Default)]
pub struct BulkMatchOptions {
    pub bulk: BulkOptions,
    pub collation: Option<String>,
}

impl BulkMatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    common_setters!();

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = BulkOptions::default();
        assert_eq!(options.batch_size, 0);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(options.log.is_none());
        assert!(options.mapping_name.is_none());
        assert!(!BulkInsertOptions::default().keep_identity);
    }

    #[test]
    fn setters_chain() {
        let options = BulkMergeOptions::new()
            .batch_size(500)
            .timeout(Duration::from_secs(5))
            .mapping_name("archive")
            .collation("utf8mb4_bin")
            .set_clause(|ctx| Some(format!("{} = GREATEST({}, {})", ctx.left, ctx.left, ctx.right)));
        assert_eq!(options.bulk.batch_size, 500);
        assert_eq!(options.bulk.timeout, Duration::from_secs(5));
        assert_eq!(options.bulk.mapping_name.as_deref(), Some("archive"));
        assert_eq!(options.collation.as_deref(), Some("utf8mb4_bin"));
        assert!(options.set_clause.is_some());
        assert!(format!("{options:?}").contains("set_clause: true"));
    }

    #[test]
    fn set_clause_receives_context() {
        let table = TableDescriptor::new(None, "stock").unwrap();
        let options = BulkUpdateOptions::new().set_clause(|ctx| {
            (ctx.property == "qty").then(|| format!("{} = {} * 2", ctx.left, ctx.right))
        });
        let f = options.set_clause.unwrap();
        let ctx = SetClauseContext {
            table: &table,
            property: "qty",
            left: "a.`qty`",
            right: "b.`qty`",
            target_alias: "a",
            source_alias: "b",
        };
        assert_eq!(f(&ctx).as_deref(), Some("a.`qty` = b.`qty` * 2"));
        let other = SetClauseContext { property: "name", ..ctx };
        assert_eq!(f(&other), None);
    }
}
