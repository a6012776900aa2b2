//! Bulk insert.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlbulk_core::{
    Connection, Cx, Entity, Error, Outcome, Result, Value, try_outcome, try_result,
};

use super::{Operation, block_on, check_properties, push_unique};
use crate::columns::Columns;
use crate::copy::BulkCopy;
use crate::mapping::{MappingProfile, OutputIdMode, is_unset_id};
use crate::options::BulkInsertOptions;
use crate::result::BulkInsertResult;
use crate::types::TypeMappings;

/// Insert records into the mapped table.
///
/// One record is written with `INSERT ... VALUES (@...)`; more are bulk
/// copied straight into the destination table. Client-generated ids are
/// assigned to the records before anything is sent; a server-generated id is
/// written back on the single-row path.
pub struct BulkInsert<T> {
    profile: Arc<MappingProfile>,
    types: Arc<TypeMappings>,
    columns: Columns,
    options: BulkInsertOptions,
    _entity: PhantomData<fn(&mut T)>,
}

impl<T: Entity> BulkInsert<T> {
    pub fn new(profile: Arc<MappingProfile>) -> Self {
        Self {
            profile,
            types: Arc::clone(TypeMappings::shared()),
            columns: Columns::All,
            options: BulkInsertOptions::default(),
            _entity: PhantomData,
        }
    }

    /// Columns to insert. Defaults to every insertable column.
    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn options(mut self, options: BulkInsertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn type_mappings(mut self, types: Arc<TypeMappings>) -> Self {
        self.types = types;
        self
    }

    /// Properties written, with the id column added or removed according
    /// to its generation mode.
    fn insert_properties(&self) -> Result<Vec<String>> {
        let mut props = Vec::new();
        for column in self
            .columns
            .resolve(|| self.profile.insertable_properties().to_vec())
        {
            push_unique(&mut props, &column.property);
        }
        check_properties(&self.profile, &props)?;

        match self.profile.output_id() {
            Some(id) if self.options.keep_identity || id.mode == OutputIdMode::ClientGenerated => {
                push_unique(&mut props, &id.property);
            }
            Some(id) => props.retain(|p| p != &id.property),
            None if self.options.keep_identity => {
                for key in self.profile.primary_keys() {
                    push_unique(&mut props, key);
                }
            }
            None => {}
        }

        if props.is_empty() {
            return Err(Error::argument("columns", "no columns to insert"));
        }
        Ok(props)
    }

    #[tracing::instrument(level = "debug", skip(self, cx, conn, data), fields(rows = data.len()))]
    pub async fn execute<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &mut [T],
    ) -> Outcome<BulkInsertResult, Error> {
        if data.is_empty() {
            return Outcome::Ok(BulkInsertResult::default());
        }
        try_result!(self.profile.check_type::<T>());
        let props = try_result!(self.insert_properties());

        let operation = if data.len() == 1 { "SingleInsert" } else { "BulkInsert" };
        let op = Operation::new(&self.profile, &self.types, &self.options.bulk, operation);
        if !self.options.keep_identity {
            try_result!(op.assign_client_ids(data));
        }

        if let [record] = data {
            return self.insert_one(&op, cx, conn, record, &props).await;
        }

        let table = try_result!(op.buffer(data, &props));
        let destination_columns = props
            .iter()
            .map(|p| op.overrides.column_name(p).to_string())
            .collect();
        let copy = BulkCopy::new(op.table())
            .column_mappings(destination_columns)
            .batch_size(self.options.bulk.batch_size)
            .timeout(self.options.bulk.timeout);

        op.log.log("Begin executing bulk copy...");
        let copied = try_outcome!(copy.write_to_server(cx, conn, &table).await);
        op.log.log("End executing bulk copy.");

        Outcome::Ok(BulkInsertResult {
            affected_rows: copied,
        })
    }

    async fn insert_one<C: Connection>(
        &self,
        op: &Operation<'_>,
        cx: &Cx,
        conn: &C,
        record: &mut T,
        props: &[String],
    ) -> Outcome<BulkInsertResult, Error> {
        let columns: Vec<String> = props.iter().map(|p| op.quoted(p)).collect();
        let values: Vec<String> = props.iter().map(|p| format!("@{}", p)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            op.table(),
            columns.join(", "),
            values.join(", ")
        );
        let prop_refs: Vec<&str> = props.iter().map(String::as_str).collect();
        let params = try_result!(self.profile.create_parameters(record, &prop_refs, &self.types));
        let cmd = op.command(sql).params(params);

        try_outcome!(conn.ensure_open(cx).await);
        op.log.log(&format!("Begin executing: {}", cmd.sql));
        let last_id = try_outcome!(conn.insert(cx, &cmd).await);
        op.log.log("End executing.");

        if let Some(id) = self.profile.output_id() {
            let server_assigned =
                id.mode == OutputIdMode::ServerGenerated && !self.options.keep_identity;
            let unset = record.get(&id.property).is_none_or(|v| is_unset_id(&v));
            if server_assigned && unset && last_id != 0 {
                let value = try_result!(self.profile.model_value(&id.property, &Value::from(last_id)));
                try_result!(record.set(&id.property, value));
            }
        }

        Outcome::Ok(BulkInsertResult { affected_rows: 1 })
    }

    /// Blocking form of [`execute`](Self::execute).
    pub fn execute_blocking<C: Connection>(
        self,
        cx: &Cx,
        conn: &C,
        data: &mut [T],
    ) -> Result<BulkInsertResult> {
        block_on(self.execute(cx, conn, data))
    }
}
