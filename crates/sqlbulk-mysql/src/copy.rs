//! Bulk copy of a [`DataTable`] into a server table.
//!
//! Two transports:
//!
//! - `LOAD DATA LOCAL INFILE` with a tab-separated payload, when the
//!   connection allows it
//! - chunked multi-row `INSERT ... VALUES` with named parameters otherwise
//!
//! Provider errors are returned unchanged; nothing is retried here.

use std::time::{Duration, Instant};

use sqlbulk_core::{
    Connection, Cx, Error, Outcome, Parameter, QueryError, QueryErrorKind, SqlCommand, Value,
    quote_ident, try_outcome,
};

use crate::options::DEFAULT_TIMEOUT;
use crate::table::DataTable;

/// Rows per INSERT chunk when no batch size is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Placeholder limit of a single MySQL prepared statement.
pub const MAX_PLACEHOLDERS: usize = 65_535;

/// Streams a buffer into `destination`.
#[derive(Debug, Clone)]
pub struct BulkCopy {
    destination: String,
    column_mappings: Vec<String>,
    batch_size: usize,
    timeout: Duration,
}

impl BulkCopy {
    /// `destination` is an already quoted (and qualified) table name.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            column_mappings: Vec::new(),
            batch_size: 0,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Destination column name per buffer ordinal. Empty means the buffer's
    /// own column names.
    pub fn column_mappings(mut self, columns: Vec<String>) -> Self {
        self.column_mappings = columns;
        self
    }

    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Copy every row. Opens the connection first if needed. Returns rows
    /// copied as reported by the server.
    ///
    /// A server count below the buffer size is an error: `LOAD DATA LOCAL`
    /// skips duplicate-key rows with only a warning.
    pub async fn write_to_server<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        data: &DataTable,
    ) -> Outcome<u64, Error> {
        let columns = match self.destination_columns(data) {
            Ok(columns) => columns,
            Err(e) => return Outcome::Err(e),
        };
        try_outcome!(conn.ensure_open(cx).await);
        if data.is_empty() {
            return Outcome::Ok(0);
        }

        let started = Instant::now();
        let (copied, sql) = if conn.supports_local_infile() {
            let cmd = SqlCommand::new(self.load_data_sql(&columns)).timeout(self.timeout);
            tracing::trace!(sql = %cmd.sql, "LOAD DATA LOCAL INFILE");
            let loaded = try_outcome!(conn.load_local_infile(cx, &cmd, encode_tsv(data)).await);
            (loaded, cmd.sql)
        } else {
            let mut total = 0;
            let mut last = String::new();
            for cmd in self.insert_commands(data, &columns) {
                tracing::trace!(sql = %cmd.sql, params = cmd.params.len(), "Bulk copy chunk");
                total += try_outcome!(conn.execute(cx, &cmd).await);
                last = cmd.sql;
            }
            (total, last)
        };

        let sent = data.len() as u64;
        if copied != sent {
            tracing::warn!(
                table = %self.destination,
                sent,
                copied,
                "Bulk copy row count mismatch"
            );
            return Outcome::Err(Error::Query(QueryError {
                kind: QueryErrorKind::Constraint,
                sql: Some(sql),
                sqlstate: None,
                message: format!(
                    "bulk copy into {} wrote {} of {} rows",
                    self.destination, copied, sent
                ),
                source: None,
            }));
        }

        tracing::debug!(
            table = %self.destination,
            rows = copied,
            elapsed_ms = started.elapsed().as_millis(),
            "Bulk copy complete"
        );
        Outcome::Ok(copied)
    }

    fn destination_columns(&self, data: &DataTable) -> Result<Vec<String>, Error> {
        if self.column_mappings.is_empty() {
            return Ok(data.columns().iter().map(|c| quote_ident(&c.name)).collect());
        }
        if self.column_mappings.len() != data.columns().len() {
            return Err(Error::argument(
                "column_mappings",
                format!(
                    "{} column mappings for {} buffer columns",
                    self.column_mappings.len(),
                    data.columns().len()
                ),
            ));
        }
        Ok(self.column_mappings.iter().map(|c| quote_ident(c)).collect())
    }

    pub(crate) fn load_data_sql(&self, columns: &[String]) -> String {
        format!(
            "LOAD DATA LOCAL INFILE 'sqlbulk_{}.tsv' INTO TABLE {} CHARACTER SET utf8mb4 \
             FIELDS TERMINATED BY '\\t' ESCAPED BY '\\\\' LINES TERMINATED BY '\\n' ({})",
            uuid::Uuid::new_v4().simple(),
            self.destination,
            columns.join(", ")
        )
    }

    /// Rows per INSERT statement: the batch size capped by the placeholder
    /// limit.
    fn chunk_rows(&self, width: usize) -> usize {
        let wanted = if self.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            self.batch_size
        };
        wanted.min(MAX_PLACEHOLDERS / width.max(1)).max(1)
    }

    pub(crate) fn insert_commands(&self, data: &DataTable, columns: &[String]) -> Vec<SqlCommand> {
        let head = format!("INSERT INTO {} ({}) VALUES ", self.destination, columns.join(", "));
        let width = columns.len();

        data.rows()
            .chunks(self.chunk_rows(width))
            .enumerate()
            .map(|(chunk, rows)| {
                let base = chunk * self.chunk_rows(width);
                let mut tuples = Vec::with_capacity(rows.len());
                let mut params = Vec::with_capacity(rows.len() * width);
                for (offset, row) in rows.iter().enumerate() {
                    let r = base + offset;
                    let names: Vec<String> = (0..width).map(|c| format!("@p{}_{}", r, c)).collect();
                    tuples.push(format!("({})", names.join(", ")));
                    params.extend(
                        names
                            .into_iter()
                            .zip(row)
                            .map(|(name, value)| Parameter::new(name, value.clone())),
                    );
                }
                SqlCommand::new(format!("{}{};", head, tuples.join(", ")))
                    .params(params)
                    .timeout(self.timeout)
            })
            .collect()
    }
}

/// Tab-separated payload: `\N` for NULL, backslash escapes for the
/// field/line terminators and control bytes.
pub fn encode_tsv(data: &DataTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * data.columns().len() * 8);
    for row in data.rows() {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(b'\t');
            }
            write_cell(&mut out, value);
        }
        out.push(b'\n');
    }
    out
}

fn write_cell(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"\\N"),
        Value::Bool(b) => out.push(if *b { b'1' } else { b'0' }),
        Value::TinyInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::SmallInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::BigInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Float(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Double(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Decimal(s) => out.extend_from_slice(s.as_bytes()),
        Value::Text(s) => escape_into(out, s.as_bytes()),
        Value::Bytes(b) => escape_into(out, b),
        Value::Uuid(bytes) => escape_into(out, bytes),
        Value::Json(json) => escape_into(out, json.to_string().as_bytes()),
        Value::Date(_) => match value.as_date() {
            Some(d) => out.extend_from_slice(d.format("%Y-%m-%d").to_string().as_bytes()),
            None => out.extend_from_slice(b"\\N"),
        },
        Value::Time(us) => out.extend_from_slice(format_time(*us).as_bytes()),
        Value::Timestamp(_) | Value::TimestampTz(_) => match value.as_naive_datetime() {
            Some(dt) => out.extend_from_slice(
                dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string().as_bytes(),
            ),
            None => out.extend_from_slice(b"\\N"),
        },
    }
}

fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        match b {
            0 => out.extend_from_slice(b"\\0"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x1a => out.extend_from_slice(b"\\Z"),
            other => out.push(other),
        }
    }
}

/// MySQL TIME text; may be negative or exceed 24 hours.
fn format_time(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let total = micros.unsigned_abs();
    let frac = total % 1_000_000;
    let secs = total / 1_000_000;
    format!(
        "{}{:02}:{:02}:{:02}.{:06}",
        sign,
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        frac
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbulk_core::ScalarType;

    use crate::table::DataColumn;

    fn sample() -> DataTable {
        let mut table = DataTable::new(vec![
            DataColumn::new("id", ScalarType::I32),
            DataColumn::new("note", ScalarType::String),
        ]);
        table
            .push_row(vec![Value::Int(1), Value::Text("a\tb\nc\\d".to_string())])
            .unwrap();
        table.push_row(vec![Value::Int(2), Value::Null]).unwrap();
        table
    }

    #[test]
    fn tsv_escapes_and_nulls() {
        let payload = encode_tsv(&sample());
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            "1\ta\\tb\\nc\\\\d\n2\t\\N\n"
        );
    }

    #[test]
    fn temporal_cells() {
        let mut out = Vec::new();
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(23, 59, 58, 120_000)
            .unwrap();
        write_cell(&mut out, &Value::from(dt));
        out.push(b'|');
        write_cell(&mut out, &Value::from(dt.date()));
        out.push(b'|');
        write_cell(&mut out, &Value::Time(-(90_061_000_001)));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2024-02-29 23:59:58.120000|2024-02-29|-25:01:01.000001"
        );
    }

    #[test]
    fn load_data_statement() {
        let copy = BulkCopy::new("`tmp_1`");
        let sql = copy.load_data_sql(&["`id`".to_string(), "`note`".to_string()]);
        assert!(sql.starts_with("LOAD DATA LOCAL INFILE 'sqlbulk_"));
        assert!(sql.contains("INTO TABLE `tmp_1` CHARACTER SET utf8mb4"));
        assert!(sql.contains("FIELDS TERMINATED BY '\\t' ESCAPED BY '\\\\'"));
        assert!(sql.ends_with("(`id`, `note`)"));
    }

    #[test]
    fn insert_chunks_respect_batch_size() {
        let copy = BulkCopy::new("`orders`").batch_size(1);
        let table = sample();
        let columns = vec!["`order_id`".to_string(), "`note`".to_string()];
        let cmds = copy.insert_commands(&table, &columns);
        assert_eq!(cmds.len(), 2);
        assert_eq!(
            cmds[0].sql,
            "INSERT INTO `orders` (`order_id`, `note`) VALUES (@p0_0, @p0_1);"
        );
        assert_eq!(
            cmds[1].sql,
            "INSERT INTO `orders` (`order_id`, `note`) VALUES (@p1_0, @p1_1);"
        );
        assert_eq!(cmds[1].value_of("p1_1"), Some(&Value::Null));
        assert_eq!(cmds[0].timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn chunk_size_capped_by_placeholders() {
        let copy = BulkCopy::new("`t`").batch_size(100_000);
        assert_eq!(copy.chunk_rows(3), MAX_PLACEHOLDERS / 3);
        assert_eq!(BulkCopy::new("`t`").chunk_rows(2), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn mapping_width_must_match() {
        let copy = BulkCopy::new("`t`").column_mappings(vec!["only".to_string()]);
        assert!(copy.destination_columns(&sample()).is_err());
        let copy = BulkCopy::new("`t`").column_mappings(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            copy.destination_columns(&sample()).unwrap(),
            vec!["`a`".to_string(), "`b`".to_string()]
        );
    }
}
