//! Bulk delete.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlbulk_core::{Connection, Cx, Entity, Error, Outcome, Result, try_outcome, try_result};

use super::{Operation, block_on, resolve_keys};
use crate::columns::Columns;
use crate::ddl::IndexSpec;
use crate::mapping::MappingProfile;
use crate::options::BulkDeleteOptions;
use crate::result::BulkDeleteResult;
use crate::types::TypeMappings;

/// Delete target rows matched by key.
///
/// Duplicate keys in the input are collapsed before the copy, so the staged
/// keys fit their UNIQUE index and each target row is deleted once. Keys
/// that only a prefix or a collation could index get a plain index over the
/// same deduplicated rows.
pub struct BulkDelete<T> {
    profile: Arc<MappingProfile>,
    types: Arc<TypeMappings>,
    keys: Columns,
    options: BulkDeleteOptions,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Entity> BulkDelete<T> {
    pub fn new(profile: Arc<MappingProfile>) -> Self {
        Self {
            profile,
            types: Arc::clone(TypeMappings::shared()),
            keys: Columns::All,
            options: BulkDeleteOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Key columns. Defaults to the primary key.
    pub fn keys(mut self, keys: impl Into<Columns>) -> Self {
        self.keys = keys.into();
        self
    }

    pub fn options(mut self, options: BulkDeleteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn type_mappings(mut self, types: Arc<TypeMappings>) -> Self {
        self.types = types;
        self
    }

    #[tracing::instrument(level = "debug", skip(self, cx, conn, data), fields(rows = data.len()))]
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &[T],
    ) -> Outcome<BulkDeleteResult, Error> {
        if data.is_empty() {
            return Outcome::Ok(BulkDeleteResult::default());
        }
        try_result!(self.profile.check_type::<T>());
        let keys = try_result!(resolve_keys(&self.keys, &self.profile));

        if let [record] = data {
            let op = Operation::new(&self.profile, &self.types, &self.options.bulk, "SingleDelete");
            let sql = format!("DELETE FROM {} WHERE {};", op.table(), op.where_keys(&keys));
            let bound: Vec<&str> = keys.iter().map(String::as_str).collect();
            let params = try_result!(self.profile.create_parameters(record, &bound, &self.types));

            try_outcome!(conn.ensure_open(cx).await);
            let affected = try_outcome!(
                op.execute(cx, conn, "executing", op.command(sql).params(params))
                    .await
            );
            return Outcome::Ok(BulkDeleteResult {
                affected_rows: affected,
            });
        }

        let op = Operation::new(&self.profile, &self.types, &self.options.bulk, "BulkDelete");
        let mut table = try_result!(op.buffer(data, &keys));
        let duplicates = table.dedup_rows();
        if duplicates > 0 {
            tracing::debug!(duplicates, "Dropped duplicate delete keys");
        }
        let temp = try_outcome!(op.stage(cx, conn, &table, &IndexSpec::unique(keys.clone())).await);

        let sql = format!(
            "DELETE a FROM {} a JOIN {} b ON {};",
            op.table(),
            temp,
            op.join_condition(&keys, &table, self.options.collation.as_deref())
        );
        let affected = try_outcome!(op.execute(cx, conn, "deleting", op.command(sql)).await);

        Outcome::Ok(BulkDeleteResult {
            affected_rows: affected,
        })
    }

    /// Blocking form of [`execute`](Self::execute).
    pub fn execute_blocking<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &[T],
    ) -> Result<BulkDeleteResult> {
        block_on(self.execute(cx, conn, data))
    }
}
