//! Statement builders.
//!
//! Each builder is a plain configuration value consumed by `execute`, so it
//! runs exactly once. Execution picks a path by input size:
//!
//! - one record: a single parameterized statement
//! - more records: stage into a temp table (DDL, bulk copy), then one or two
//!   set-based statements joining the staged rows to the target
//!
//! Merge always stages, since insert-or-update needs the set comparison.

mod delete;
mod insert;
mod matching;
mod merge;
mod update;

pub use delete::BulkDelete;
pub use insert::BulkInsert;
pub use matching::BulkMatch;
pub use merge::BulkMerge;
pub use update::BulkUpdate;

use asupersync::runtime::RuntimeBuilder;
use sqlbulk_core::{
    ConfigError, Connection, Cx, Entity, Error, MappingError, MappingErrorKind, Outcome, Result,
    Row, SqlCommand, Value, try_outcome,
};

use crate::columns::{AssignOp, ColumnRef, Columns};
use crate::copy::BulkCopy;
use crate::ddl::{ColumnOverrides, IndexSpec, create_temp_table, temp_table_name};
use crate::log::OperationLog;
use crate::mapping::{MappingProfile, OutputIdMode, is_unset_id};
use crate::options::{BulkOptions, SetClause, SetClauseContext};
use crate::table::DataTable;
use crate::types::TypeMappings;

/// Alias of the target table in generated joins.
pub const TARGET_ALIAS: &str = "a";
/// Alias of the staging table in generated joins.
pub const SOURCE_ALIAS: &str = "b";

/// Per-execution state shared by the builders.
pub(crate) struct Operation<'a> {
    pub profile: &'a MappingProfile,
    pub types: &'a TypeMappings,
    pub overrides: ColumnOverrides<'a>,
    pub options: &'a BulkOptions,
    pub log: OperationLog,
}

impl<'a> Operation<'a> {
    pub fn new(
        profile: &'a MappingProfile,
        types: &'a TypeMappings,
        options: &'a BulkOptions,
        operation: &'static str,
    ) -> Self {
        Self {
            profile,
            types,
            overrides: ColumnOverrides::from_profile(profile),
            options,
            log: OperationLog::new(operation, options.log.clone()),
        }
    }

    pub fn table(&self) -> &str {
        self.profile.table().quoted_name()
    }

    pub fn command(&self, sql: String) -> SqlCommand {
        SqlCommand::new(sql).timeout(self.options.timeout)
    }

    pub fn quoted(&self, property: &str) -> String {
        self.overrides.quoted(property)
    }

    /// ``a.`col` `` for a property.
    pub fn target_column(&self, property: &str) -> String {
        format!("{}.{}", TARGET_ALIAS, self.quoted(property))
    }

    /// ``b.`col` `` for a property.
    pub fn source_column(&self, property: &str) -> String {
        format!("{}.{}", SOURCE_ALIAS, self.quoted(property))
    }

    pub fn buffer<T: Entity>(&self, records: &[T], properties: &[String]) -> Result<DataTable> {
        let props: Vec<&str> = properties.iter().map(String::as_str).collect();
        DataTable::from_records(records, &props, self.profile, self.types)
    }

    /// Create the temp table (with index) and copy `data` into it. Returns
    /// the quoted temp table name.
    pub async fn stage<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        data: &DataTable,
        index: &IndexSpec,
    ) -> Outcome<String, Error> {
        try_outcome!(conn.ensure_open(cx).await);

        let temp = temp_table_name();
        let ddl = create_temp_table(&temp, data, &self.overrides, self.types, Some(index));
        self.log.log(&format!("Begin creating temp table: {}", ddl));
        try_outcome!(conn.execute(cx, &self.command(ddl)).await);
        self.log.log("End creating temp table.");

        let destination_columns = data
            .columns()
            .iter()
            .map(|c| self.overrides.column_name(&c.name).to_string())
            .collect();
        let copy = BulkCopy::new(temp.clone())
            .column_mappings(destination_columns)
            .batch_size(self.options.batch_size)
            .timeout(self.options.timeout);
        self.log.log("Begin executing bulk copy...");
        try_outcome!(copy.write_to_server(cx, conn, data).await);
        self.log.log("End executing bulk copy.");

        Outcome::Ok(temp)
    }

    /// Execute one statement between `Begin <verb>:` / `End <verb>.` lines.
    pub async fn execute<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        verb: &str,
        cmd: SqlCommand,
    ) -> Outcome<u64, Error> {
        self.log.log(&format!("Begin {}: {}", verb, cmd.sql));
        let affected = try_outcome!(conn.execute(cx, &cmd).await);
        self.log.log(&format!("End {}.", verb));
        tracing::debug!(table = self.table(), affected, "{}", verb);
        Outcome::Ok(affected)
    }

    /// Run a query between `Begin <verb>:` / `End <verb>.` lines.
    pub async fn query<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        verb: &str,
        cmd: SqlCommand,
    ) -> Outcome<Vec<Row>, Error> {
        self.log.log(&format!("Begin {}: {}", verb, cmd.sql));
        let rows = try_outcome!(conn.query(cx, &cmd).await);
        self.log.log(&format!("End {}.", verb));
        Outcome::Ok(rows)
    }

    /// ``a.`k` = b.`k` [COLLATE c] AND ...``; the collation only applies to
    /// textual staged keys.
    pub fn join_condition(&self, keys: &[String], data: &DataTable, collation: Option<&str>) -> String {
        keys.iter()
            .map(|k| {
                let textual = data.column(k).is_some_and(|c| c.scalar.is_textual());
                match collation {
                    Some(collation) if textual => format!(
                        "{} = {} COLLATE {}",
                        self.target_column(k),
                        self.source_column(k),
                        collation
                    ),
                    _ => format!("{} = {}", self.target_column(k), self.source_column(k)),
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// `` `k` = @k AND ...`` for the single-row path.
    pub fn where_keys(&self, keys: &[String]) -> String {
        keys.iter()
            .map(|k| format!("{} = @{}", self.quoted(k), k))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// One SET fragment: the custom callback's result if it returns one,
    /// otherwise `left = right` or the accumulate form.
    pub fn assignment(
        &self,
        column: &ColumnRef,
        left: &str,
        right: &str,
        aliases: (&str, &str),
        set_clause: Option<&SetClause>,
    ) -> String {
        if let Some(custom) = set_clause {
            let ctx = SetClauseContext {
                table: self.profile.table(),
                property: &column.property,
                left,
                right,
                target_alias: aliases.0,
                source_alias: aliases.1,
            };
            if let Some(fragment) = custom(&ctx) {
                return fragment;
            }
        }
        match column.op {
            AssignOp::Set => format!("{} = {}", left, right),
            AssignOp::Add => format!("{} = {} + {}", left, left, right),
            AssignOp::Subtract => format!("{} = {} - {}", left, left, right),
        }
    }

    /// SET list for the staging path.
    pub fn staged_assignments(&self, columns: &[ColumnRef], set_clause: Option<&SetClause>) -> String {
        columns
            .iter()
            .map(|c| {
                self.assignment(
                    c,
                    &self.target_column(&c.property),
                    &self.source_column(&c.property),
                    (TARGET_ALIAS, SOURCE_ALIAS),
                    set_clause,
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generate ids for records whose client-generated id is unset.
    pub fn assign_client_ids<T: Entity>(&self, records: &mut [T]) -> Result<usize> {
        let Some(output) = self.profile.output_id() else {
            return Ok(0);
        };
        if output.mode != OutputIdMode::ClientGenerated {
            return Ok(0);
        }
        let mut assigned = 0;
        for record in records.iter_mut() {
            let current = record.get(&output.property).unwrap_or(Value::Null);
            if is_unset_id(&current) {
                record.set(&output.property, Value::from(uuid::Uuid::now_v7()))?;
                assigned += 1;
            }
        }
        if assigned > 0 {
            tracing::trace!(property = %output.property, assigned, "Generated client ids");
        }
        Ok(assigned)
    }
}

/// Key properties for a selection; `All` means the primary key.
pub(crate) fn resolve_keys(keys: &Columns, profile: &MappingProfile) -> Result<Vec<String>> {
    let refs = keys.resolve(|| profile.primary_keys().to_vec());
    if refs.is_empty() {
        return Err(if keys.is_all() {
            Error::Mapping(MappingError {
                kind: MappingErrorKind::MissingKey,
                type_name: profile.type_name().to_string(),
                profile: None,
                message: format!(
                    "type '{}' has no primary key; pass key columns explicitly",
                    profile.type_name()
                ),
            })
        } else {
            Error::argument("keys", "at least one key column is required")
        });
    }
    let names: Vec<String> = refs.into_iter().map(|r| r.property).collect();
    check_properties(profile, &names)?;
    Ok(names)
}

pub(crate) fn check_properties<'s, I>(profile: &MappingProfile, properties: I) -> Result<()>
where
    I: IntoIterator<Item = &'s String>,
{
    for prop in properties {
        profile.column_name(prop)?;
    }
    Ok(())
}

/// Append `property` unless already present.
pub(crate) fn push_unique(list: &mut Vec<String>, property: &str) {
    if !list.iter().any(|p| p == property) {
        list.push(property.to_string());
    }
}

/// Drive an operation to completion on a current-thread runtime.
pub(crate) fn block_on<F, R>(future: F) -> Result<R>
where
    F: Future<Output = Outcome<R, Error>>,
{
    let runtime = match RuntimeBuilder::current_thread().build() {
        Ok(runtime) => runtime,
        Err(_) => {
            return Err(Error::Config(ConfigError {
                message: "failed to create blocking runtime".to_string(),
                source: None,
            }));
        }
    };
    match runtime.block_on(future) {
        Outcome::Ok(value) => Ok(value),
        Outcome::Err(e) => Err(e),
        Outcome::Cancelled(_) => Err(Error::Cancelled),
        Outcome::Panicked(_) => Err(Error::Custom("bulk operation panicked".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::{FromValue, PropertyInfo, ScalarType};

    use crate::table::DataColumn;

    #[derive(Default)]
    struct Line {
        order: i64,
        sku: String,
        qty: i32,
    }

    impl Entity for Line {
        fn properties() -> &'static [PropertyInfo] {
            static PROPS: [PropertyInfo; 3] = [
                PropertyInfo::new("order", ScalarType::I64),
                PropertyInfo::new("sku", ScalarType::String),
                PropertyInfo::new("qty", ScalarType::I32),
            ];
            &PROPS
        }

        fn get(&self, property: &str) -> Option<Value> {
            match property {
                "order" => Some(self.order.into()),
                "sku" => Some(self.sku.clone().into()),
                "qty" => Some(self.qty.into()),
                _ => None,
            }
        }

        fn set(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "order" => self.order = FromValue::from_value(&value)?,
                "sku" => self.sku = FromValue::from_value(&value)?,
                "qty" => self.qty = FromValue::from_value(&value)?,
                other => return Err(Error::unknown_property("Line", other)),
            }
            Ok(())
        }
    }

    fn profile() -> MappingProfile {
        MappingProfile::builder::<Line>()
            .table("order_lines")
            .primary_key("order")
            .primary_key("sku")
            .column("order", "order_id")
            .build()
            .unwrap()
    }

    fn staged() -> DataTable {
        DataTable::new(vec![
            DataColumn::new("order", ScalarType::I64),
            DataColumn::new("sku", ScalarType::String),
        ])
    }

    #[test]
    fn join_applies_collation_to_text_keys_only() {
        let profile = profile();
        let options = BulkOptions::default();
        let op = Operation::new(&profile, TypeMappings::shared(), &options, "BulkUpdate");
        let keys = vec!["order".to_string(), "sku".to_string()];

        assert_eq!(
            op.join_condition(&keys, &staged(), None),
            "a.`order_id` = b.`order_id` AND a.`sku` = b.`sku`"
        );
        assert_eq!(
            op.join_condition(&keys, &staged(), Some("utf8mb4_bin")),
            "a.`order_id` = b.`order_id` AND a.`sku` = b.`sku` COLLATE utf8mb4_bin"
        );
        assert_eq!(op.where_keys(&keys), "`order_id` = @order AND `sku` = @sku");
    }

    #[test]
    fn assignments_follow_operator_and_callback() {
        let profile = profile();
        let options = BulkOptions::default();
        let op = Operation::new(&profile, TypeMappings::shared(), &options, "BulkUpdate");
        let columns = vec![ColumnRef::parse("qty+="), ColumnRef::parse("sku")];
        assert_eq!(
            op.staged_assignments(&columns, None),
            "a.`qty` = a.`qty` + b.`qty`, a.`sku` = b.`sku`"
        );

        let custom: SetClause = std::sync::Arc::new(|ctx: &SetClauseContext<'_>| {
            (ctx.property == "sku").then(|| format!("{} = UPPER({})", ctx.left, ctx.right))
        });
        assert_eq!(
            op.staged_assignments(&columns, Some(&custom)),
            "a.`qty` = a.`qty` + b.`qty`, a.`sku` = UPPER(b.`sku`)"
        );
    }

    #[test]
    fn keys_default_to_primary_key() {
        let profile = profile();
        assert_eq!(
            resolve_keys(&Columns::All, &profile).unwrap(),
            vec!["order".to_string(), "sku".to_string()]
        );
        assert_eq!(
            resolve_keys(&Columns::from("sku"), &profile).unwrap(),
            vec!["sku".to_string()]
        );
        assert!(matches!(
            resolve_keys(&Columns::none(), &profile),
            Err(Error::Argument(_))
        ));
        assert!(matches!(
            resolve_keys(&Columns::from("nope"), &profile),
            Err(Error::Mapping(_))
        ));

        let keyless = MappingProfile::builder::<Line>().build().unwrap();
        match resolve_keys(&Columns::All, &keyless) {
            Err(Error::Mapping(m)) => assert_eq!(m.kind, MappingErrorKind::MissingKey),
            other => panic!("expected missing key, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn push_unique_keeps_order() {
        let mut list = vec!["a".to_string()];
        push_unique(&mut list, "b");
        push_unique(&mut list, "a");
        assert_eq!(list, vec!["a".to_string(), "b".to_string()]);
    }
}
