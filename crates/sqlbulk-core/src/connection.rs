//! Database connection trait and command types.
//!
//! - [`Connection`] - executes commands and exposes the bulk-load capability
//! - [`SqlCommand`] - SQL text with named parameters and a timeout
//! - [`Parameter`] - one `@name` bound value
//!
//! All I/O integrates with asupersync's structured concurrency via `Cx`.
//! Transactions are not managed here: a caller that wants the bulk statements
//! inside its transaction passes a `Connection` bound to that transaction.

use std::time::Duration;

use crate::error::{Error, QueryError, QueryErrorKind};
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// A named parameter bound into a [`SqlCommand`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Placeholder name including the leading `@`
    pub name: String,
    pub value: Value,
    /// Declared database type of the target column, when known
    pub sql_type: Option<String>,
}

impl Parameter {
    /// Create a parameter; a missing `@` prefix is added.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let name = if name.starts_with('@') {
            name
        } else {
            format!("@{}", name)
        };
        Self {
            name,
            value: value.into(),
            sql_type: None,
        }
    }

    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }
}

/// SQL text plus its parameters and command timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    pub sql: String,
    pub params: Vec<Parameter>,
    /// Hard ceiling for the statement; expiry is reported by the provider
    pub timeout: Option<Duration>,
}

impl SqlCommand {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            timeout: None,
        }
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Parameter>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a bound value by placeholder name (with or without `@`).
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        let name = name.trim_start_matches('@');
        self.params
            .iter()
            .find(|p| p.name.trim_start_matches('@') == name)
            .map(|p| &p.value)
    }
}

/// A database connection capable of executing bulk commands.
///
/// All operations are async and take a `Cx` context for cancellation support.
/// Implementations must be `Send + Sync` for use across async boundaries.
///
/// # Example
///
/// ```rust,ignore
/// conn.ensure_open(&cx).await?;
/// let cmd = SqlCommand::new("DELETE FROM `t` WHERE `id` = @id")
///     .param(Parameter::new("id", 7_i64));
/// let affected = conn.execute(&cx, &cmd).await?;
/// ```
pub trait Connection: Send + Sync {
    /// Whether the underlying session is currently open.
    fn is_open(&self) -> bool;

    /// Open the underlying session.
    fn open(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Open the session unless it already is. Idempotent.
    fn ensure_open(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        async move {
            if self.is_open() {
                Outcome::Ok(())
            } else {
                self.open(cx).await
            }
        }
    }

    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        cmd: &SqlCommand,
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Execute a statement and return rows affected.
    ///
    /// For UPDATE the count is rows matched, not only rows whose values
    /// changed. MySQL drivers get this by connecting with
    /// `CLIENT_FOUND_ROWS`; without it a repeated update or merge reports 0.
    fn execute(&self, cx: &Cx, cmd: &SqlCommand) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Execute an INSERT and return the last inserted id (0 when none).
    fn insert(&self, cx: &Cx, cmd: &SqlCommand) -> impl Future<Output = Outcome<i64, Error>> + Send;

    /// Whether `LOAD DATA LOCAL INFILE` may be used on this connection.
    fn supports_local_infile(&self) -> bool {
        false
    }

    /// Run a `LOAD DATA LOCAL INFILE` command, streaming `payload` as the
    /// file contents. Returns rows loaded.
    fn load_local_infile(
        &self,
        _cx: &Cx,
        cmd: &SqlCommand,
        _payload: Vec<u8>,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let sql = cmd.sql.clone();
        async move {
            Outcome::Err(Error::Query(QueryError {
                kind: QueryErrorKind::Unsupported,
                sql: Some(sql),
                sqlstate: None,
                message: "LOAD DATA LOCAL INFILE is not supported by this connection".to_string(),
                source: None,
            }))
        }
    }
}
