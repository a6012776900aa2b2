//! Bulk merge (insert or update).

use std::marker::PhantomData;
use std::sync::Arc;

use sqlbulk_core::{Connection, Cx, Entity, Error, Outcome, Result, try_outcome, try_result};

use super::{Operation, block_on, check_properties, push_unique, resolve_keys};
use crate::columns::{ColumnRef, Columns};
use crate::ddl::IndexSpec;
use crate::mapping::{MappingProfile, OutputIdMode};
use crate::options::BulkMergeOptions;
use crate::result::BulkMergeResult;
use crate::types::TypeMappings;

/// Update rows whose key exists in the target and insert the rest.
///
/// Always stages, even for a single record: the staged rows are first joined
/// to the target for the UPDATE, then anti-joined for the INSERT, both over
/// the same temp table.
pub struct BulkMerge<T> {
    profile: Arc<MappingProfile>,
    types: Arc<TypeMappings>,
    keys: Columns,
    update_columns: Columns,
    insert_columns: Columns,
    options: BulkMergeOptions,
    _entity: PhantomData<fn(&mut T)>,
}

/// Resolved column sets of one merge.
#[derive(Debug)]
struct MergePlan {
    keys: Vec<String>,
    updates: Vec<ColumnRef>,
    inserts: Vec<String>,
}

impl MergePlan {
    /// Keys, then update and insert properties, each once.
    fn staged(&self) -> Vec<String> {
        let mut staged = self.keys.clone();
        for column in &self.updates {
            push_unique(&mut staged, &column.property);
        }
        for prop in &self.inserts {
            push_unique(&mut staged, prop);
        }
        staged
    }
}

impl<T: Entity> BulkMerge<T> {
    pub fn new(profile: Arc<MappingProfile>) -> Self {
        Self {
            profile,
            types: Arc::clone(TypeMappings::shared()),
            keys: Columns::All,
            update_columns: Columns::All,
            insert_columns: Columns::All,
            options: BulkMergeOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Key columns. Defaults to the primary key.
    pub fn keys(mut self, keys: impl Into<Columns>) -> Self {
        self.keys = keys.into();
        self
    }

    /// Columns assigned on matched rows. Defaults to every non-key,
    /// non-generated column; [`Columns::none`] skips the update.
    pub fn update_columns(mut self, columns: impl Into<Columns>) -> Self {
        self.update_columns = columns.into();
        self
    }

    /// Columns written for new rows. Defaults to every insertable column;
    /// [`Columns::none`] skips the insert.
    pub fn insert_columns(mut self, columns: impl Into<Columns>) -> Self {
        self.insert_columns = columns.into();
        self
    }

    pub fn options(mut self, options: BulkMergeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn type_mappings(mut self, types: Arc<TypeMappings>) -> Self {
        self.types = types;
        self
    }

    /// Resolve the update and insert sets. `None` when both are empty.
    fn projections(&self) -> Result<Option<(Vec<ColumnRef>, Vec<String>)>> {
        let updates = self.update_columns.resolve(|| {
            self.profile
                .updatable_properties()
                .into_iter()
                .map(str::to_string)
                .collect()
        });
        let mut inserts = Vec::new();
        for column in self
            .insert_columns
            .resolve(|| self.profile.insertable_properties().to_vec())
        {
            push_unique(&mut inserts, &column.property);
        }
        if updates.is_empty() && inserts.is_empty() {
            return Ok(None);
        }
        check_properties(&self.profile, updates.iter().map(|c| &c.property))?;
        check_properties(&self.profile, &inserts)?;

        if !inserts.is_empty() {
            match self.profile.output_id() {
                Some(id) if id.mode == OutputIdMode::ClientGenerated => {
                    push_unique(&mut inserts, &id.property);
                }
                Some(id) => inserts.retain(|p| p != &id.property),
                None => {}
            }
        }
        Ok(Some((updates, inserts)))
    }

    fn plan(&self) -> Result<Option<MergePlan>> {
        if self.options.when_not_matched_by_source.is_some() {
            return Err(Error::argument(
                "when_not_matched_by_source",
                "not supported by MySQL merge",
            ));
        }
        let Some((updates, inserts)) = self.projections()? else {
            return Ok(None);
        };
        let keys = resolve_keys(&self.keys, &self.profile)?;
        Ok(Some(MergePlan {
            keys,
            updates,
            inserts,
        }))
    }

    #[tracing::instrument(level = "debug", skip(self, cx, conn, data), fields(rows = data.len()))]
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &mut [T],
    ) -> Outcome<BulkMergeResult, Error> {
        let plan = match self.plan() {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                tracing::debug!("Merge has no update or insert columns");
                return Outcome::Ok(BulkMergeResult::default());
            }
            Err(e) => return Outcome::Err(e),
        };
        if data.is_empty() {
            return Outcome::Ok(BulkMergeResult::default());
        }
        try_result!(self.profile.check_type::<T>());

        let operation = if data.len() == 1 { "SingleMerge" } else { "BulkMerge" };
        let op = Operation::new(&self.profile, &self.types, &self.options.bulk, operation);
        if !plan.inserts.is_empty() {
            try_result!(op.assign_client_ids(data));
        }

        let table = try_result!(op.buffer(data, &plan.staged()));
        let index = IndexSpec::new(plan.keys.clone());
        let temp = try_outcome!(op.stage(cx, conn, &table, &index).await);
        let join = op.join_condition(&plan.keys, &table, self.options.collation.as_deref());

        let mut updated = 0;
        if !plan.updates.is_empty() {
            let sql = format!(
                "UPDATE {} a JOIN {} b ON {} SET {};",
                op.table(),
                temp,
                join,
                op.staged_assignments(&plan.updates, self.options.set_clause.as_ref())
            );
            updated = try_outcome!(op.execute(cx, conn, "updating", op.command(sql)).await);
        }

        let mut inserted = 0;
        if !plan.inserts.is_empty() {
            let columns: Vec<String> = plan.inserts.iter().map(|p| op.quoted(p)).collect();
            let selected: Vec<String> = plan.inserts.iter().map(|p| op.source_column(p)).collect();
            let missing: Vec<String> = plan
                .keys
                .iter()
                .map(|k| format!("{} IS NULL", op.target_column(k)))
                .collect();
            let sql = format!(
                "INSERT INTO {} ({}) SELECT {} FROM {} b LEFT JOIN {} a ON {} WHERE {};",
                op.table(),
                columns.join(", "),
                selected.join(", "),
                temp,
                op.table(),
                join,
                missing.join(" AND ")
            );
            inserted = try_outcome!(op.execute(cx, conn, "inserting", op.command(sql)).await);
        }

        Outcome::Ok(BulkMergeResult::new(inserted, updated))
    }

    /// Blocking form of [`execute`](Self::execute).
    pub fn execute_blocking<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &mut [T],
    ) -> Result<BulkMergeResult> {
        block_on(self.execute(cx, conn, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NotMatchedBySource;
    use sqlbulk_core::{FromValue, PropertyInfo, ScalarType, Value};

    #[derive(Default)]
    struct Price {
        id: uuid::Uuid,
        sku: String,
        amount: f64,
    }

    impl Entity for Price {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 3] = [
                PropertyInfo::new("id", ScalarType::Uuid),
                PropertyInfo::new("sku", ScalarType::String),
                PropertyInfo::new("amount", ScalarType::F64),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "id" => Some(self.id.into()),
                "sku" => Some(self.sku.clone().into()),
                "amount" => Some(self.amount.into()),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id = FromValue::from_value(&value)?,
                "sku" => self.sku = FromValue::from_value(&value)?,
                "amount" => self.amount = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Price", other)),
            }
            Ok(())
        }
    }

    fn profile() -> Arc<MappingProfile> {
        Arc::new(
            MappingProfile::builder::<Price>()
                .primary_key("id")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn plan_stages_keys_updates_and_inserts_once() {
        let merge = BulkMerge::<Price>::new(profile())
            .keys("sku")
            .update_columns(["amount+="])
            .insert_columns(["sku", "amount"]);
        let plan = merge.plan().unwrap().unwrap();
        assert_eq!(plan.keys, vec!["sku"]);
        assert_eq!(plan.inserts, vec!["sku", "amount", "id"]);
        assert_eq!(plan.staged(), vec!["sku", "amount", "id"]);
    }

    #[test]
    fn repeated_insert_columns_collapse() {
        let merge = BulkMerge::<Price>::new(profile())
            .keys("sku")
            .insert_columns(["amount", "sku", "amount", "id"]);
        let plan = merge.plan().unwrap().unwrap();
        assert_eq!(plan.inserts, vec!["amount", "sku", "id"]);
    }

    #[test]
    fn both_projections_empty_is_noop() {
        let merge = BulkMerge::<Price>::new(profile())
            .update_columns(Columns::none())
            .insert_columns(Columns::none());
        assert!(merge.plan().unwrap().is_none());
    }

    #[test]
    fn not_matched_by_source_is_rejected() {
        let merge = BulkMerge::<Price>::new(profile()).options(
            BulkMergeOptions::new().when_not_matched_by_source(NotMatchedBySource::Delete),
        );
        assert!(matches!(merge.plan(), Err(Error::Argument(_))));
    }
}
