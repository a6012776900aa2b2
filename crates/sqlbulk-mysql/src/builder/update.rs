//! Bulk update.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlbulk_core::{Connection, Cx, Entity, Error, Outcome, Result, try_outcome, try_result};

use super::{Operation, block_on, check_properties, push_unique, resolve_keys};
use crate::columns::{ColumnRef, Columns};
use crate::ddl::IndexSpec;
use crate::mapping::MappingProfile;
use crate::options::BulkUpdateOptions;
use crate::result::BulkUpdateResult;
use crate::types::TypeMappings;

/// Update target rows matched by key.
///
/// Rows whose key matches nothing are skipped and not counted.
pub struct BulkUpdate<T> {
    profile: Arc<MappingProfile>,
    types: Arc<TypeMappings>,
    keys: Columns,
    columns: Columns,
    options: BulkUpdateOptions,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Entity> BulkUpdate<T> {
    pub fn new(profile: Arc<MappingProfile>) -> Self {
        Self {
            profile,
            types: Arc::clone(TypeMappings::shared()),
            keys: Columns::All,
            columns: Columns::All,
            options: BulkUpdateOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Key columns joining records to target rows. Defaults to the primary
    /// key.
    pub fn keys(mut self, keys: impl Into<Columns>) -> Self {
        self.keys = keys.into();
        self
    }

    /// Columns to assign. Defaults to every non-key, non-generated column.
    /// Names may carry a `+=` / `-=` suffix.
    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn options(mut self, options: BulkUpdateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn type_mappings(mut self, types: Arc<TypeMappings>) -> Self {
        self.types = types;
        self
    }

    fn update_columns(&self) -> Result<Vec<ColumnRef>> {
        let columns = self.columns.resolve(|| {
            self.profile
                .updatable_properties()
                .into_iter()
                .map(str::to_string)
                .collect()
        });
        if columns.is_empty() {
            return Err(Error::argument("columns", "no columns to update"));
        }
        check_properties(&self.profile, columns.iter().map(|c| &c.property))?;
        Ok(columns)
    }

    #[tracing::instrument(level = "debug", skip(self, cx, conn, data), fields(rows = data.len()))]
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &[T],
    ) -> Outcome<BulkUpdateResult, Error> {
        if data.is_empty() {
            return Outcome::Ok(BulkUpdateResult::default());
        }
        try_result!(self.profile.check_type::<T>());
        let keys = try_result!(resolve_keys(&self.keys, &self.profile));
        let columns = try_result!(self.update_columns());

        if let [record] = data {
            let op = Operation::new(&self.profile, &self.types, &self.options.bulk, "SingleUpdate");
            return self.update_one(&op, cx, conn, record, &keys, &columns).await;
        }

        let op = Operation::new(&self.profile, &self.types, &self.options.bulk, "BulkUpdate");
        let mut staged = keys.clone();
        for column in &columns {
            push_unique(&mut staged, &column.property);
        }
        let table = try_result!(op.buffer(data, &staged));
        let temp = try_outcome!(op.stage(cx, conn, &table, &IndexSpec::new(keys.clone())).await);

        let sql = format!(
            "UPDATE {} a JOIN {} b ON {} SET {};",
            op.table(),
            temp,
            op.join_condition(&keys, &table, self.options.collation.as_deref()),
            op.staged_assignments(&columns, self.options.set_clause.as_ref())
        );
        let affected = try_outcome!(op.execute(cx, conn, "updating", op.command(sql)).await);

        Outcome::Ok(BulkUpdateResult {
            affected_rows: affected,
        })
    }

    async fn update_one<C: Connection>(
        &self,
        op: &Operation<'_>,
        cx: &Cx,
        conn: &C,
        record: &T,
        keys: &[String],
        columns: &[ColumnRef],
    ) -> Outcome<BulkUpdateResult, Error> {
        let assignments: Vec<String> = columns
            .iter()
            .map(|c| {
                op.assignment(
                    c,
                    &op.quoted(&c.property),
                    &format!("@{}", c.property),
                    ("", ""),
                    self.options.set_clause.as_ref(),
                )
            })
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {};",
            op.table(),
            assignments.join(", "),
            op.where_keys(keys)
        );

        let mut bound: Vec<&str> = columns.iter().map(|c| c.property.as_str()).collect();
        for key in keys {
            if !bound.contains(&key.as_str()) {
                bound.push(key.as_str());
            }
        }
        let params = try_result!(self.profile.create_parameters(record, &bound, &self.types));

        try_outcome!(conn.ensure_open(cx).await);
        let affected = try_outcome!(
            op.execute(cx, conn, "executing", op.command(sql).params(params))
                .await
        );
        Outcome::Ok(BulkUpdateResult {
            affected_rows: affected,
        })
    }

    /// Blocking form of [`execute`](Self::execute).
    pub fn execute_blocking<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &[T],
    ) -> Result<BulkUpdateResult> {
        block_on(self.execute(cx, conn, data))
    }
}
