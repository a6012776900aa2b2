//! Error types for SQLBulk operations.

use std::fmt;

/// The primary error type for all SQLBulk operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, disconnect, timeout)
    Connection(ConnectionError),
    /// Query execution errors reported by the provider
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Mapping resolution errors (unregistered type, unknown property)
    Mapping(MappingError),
    /// Caller misuse detected before any I/O
    Argument(ArgumentError),
    /// Configuration errors
    Config(ConfigError),
    /// I/O errors
    Io(std::io::Error),
    /// Operation timed out
    Timeout,
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
    /// SSL/TLS negotiation failed
    Ssl,
    /// Connection refused
    Refused,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Data too large for column
    DataTruncation,
    /// Deadlock detected
    Deadlock,
    /// Statement timeout
    Timeout,
    /// Feature not supported by the connection
    Unsupported,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
    pub rust_type: Option<&'static str>,
}

#[derive(Debug)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    /// Rust type name the mapping was requested for
    pub type_name: String,
    /// Named profile, when one was requested
    pub profile: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// No profile registered for the type (and profile name)
    NotRegistered,
    /// A property name does not exist on the mapped type
    UnknownProperty,
    /// The operation needs key columns and none could be resolved
    MissingKey,
    /// The mapping itself is inconsistent
    Invalid,
}

#[derive(Debug)]
pub struct ArgumentError {
    /// Name of the offending argument or option
    pub parameter: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Is this a retryable error (deadlock, timeouts)?
    ///
    /// Nothing in this crate retries; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query(q) => matches!(q.kind, QueryErrorKind::Deadlock | QueryErrorKind::Timeout),
            Error::Timeout => true,
            _ => false,
        }
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(_) | Error::Io(_) => true,
            _ => false,
        }
    }

    /// Get SQLSTATE if available (e.g., "23000" for a duplicate key)
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// Shorthand for an [`Error::Argument`].
    pub fn argument(parameter: &'static str, message: impl Into<String>) -> Self {
        Error::Argument(ArgumentError {
            parameter,
            message: message.into(),
        })
    }

    /// Shorthand for an [`Error::Mapping`] of kind `UnknownProperty`.
    pub fn unknown_property(type_name: impl Into<String>, property: &str) -> Self {
        let type_name = type_name.into();
        Error::Mapping(MappingError {
            kind: MappingErrorKind::UnknownProperty,
            message: format!("type '{}' has no property '{}'", type_name, property),
            type_name,
            profile: None,
        })
    }
}

impl MappingError {
    /// Error for a type (and optional profile name) with no registration.
    pub fn not_registered(type_name: impl Into<String>, profile: Option<&str>) -> Self {
        let type_name = type_name.into();
        let message = match profile {
            Some(name) => format!(
                "no mapping profile '{}' registered for type '{}'",
                name, type_name
            ),
            None => format!("no mapping profile registered for type '{}'", type_name),
        };
        Self {
            kind: MappingErrorKind::NotRegistered,
            type_name,
            profile: profile.map(str::to_string),
            message,
        }
    }
}

impl QueryError {
    /// Is this a duplicate-key violation (MySQL error 1062, SQLSTATE 23000)?
    pub fn is_duplicate_key(&self) -> bool {
        self.sqlstate.as_deref() == Some("23000") && self.kind == QueryErrorKind::Constraint
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Mapping(e) => write!(f, "Mapping error: {}", e.message),
            Error::Argument(e) => write!(f, "Invalid argument '{}': {}", e.parameter, e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parameter, self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<ArgumentError> for Error {
    fn from(err: ArgumentError) -> Self {
        Error::Argument(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for SQLBulk operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_helpers() {
        let query = QueryError {
            kind: QueryErrorKind::Constraint,
            sql: Some("INSERT INTO `t` (`id`) VALUES (@id)".to_string()),
            sqlstate: Some("23000".to_string()),
            message: "Duplicate entry '1' for key 'PRIMARY'".to_string(),
            source: None,
        };

        assert!(query.is_duplicate_key());

        let err = Error::Query(query);
        assert_eq!(err.sqlstate(), Some("23000"));
        assert_eq!(err.sql(), Some("INSERT INTO `t` (`id`) VALUES (@id)"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_and_connection_flags() {
        let deadlock = Error::Query(QueryError {
            kind: QueryErrorKind::Deadlock,
            sql: None,
            sqlstate: Some("40001".to_string()),
            message: "Deadlock found when trying to get lock".to_string(),
            source: None,
        });
        assert!(deadlock.is_retryable());
        assert!(Error::Timeout.is_retryable());

        let lost = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: "lost connection".to_string(),
            source: None,
        });
        assert!(lost.is_connection_error());
        assert!(!lost.is_retryable());
    }

    #[test]
    fn not_registered_names_type_and_profile() {
        let err = MappingError::not_registered("app::Order", Some("archive"));
        assert_eq!(err.kind, MappingErrorKind::NotRegistered);
        assert_eq!(err.profile.as_deref(), Some("archive"));
        assert!(err.message.contains("app::Order"));
        assert!(err.message.contains("archive"));

        let plain = MappingError::not_registered("app::Order", None);
        assert!(plain.profile.is_none());
        assert_eq!(
            Error::from(plain).to_string(),
            "Mapping error: no mapping profile registered for type 'app::Order'"
        );
    }

    #[test]
    fn argument_error_display() {
        let err = Error::argument("when_not_matched_by_source", "not supported by MySQL");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'when_not_matched_by_source': not supported by MySQL"
        );
    }
}
