//! Operation checkpoint logging.
//!
//! Every checkpoint goes to `tracing` and, when the caller supplied one, to
//! the per-call log sink. The sink is called synchronously, in order, with a
//! timestamped line:
//!
//! ```text
//! 2024-05-01 13:45:12.345 +02:00 [BulkUpdate]: Begin updating: UPDATE ...
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};

/// Caller-supplied log callback.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Checkpoint logger bound to one operation name.
#[derive(Clone)]
pub struct OperationLog {
    operation: &'static str,
    sink: Option<LogSink>,
}

impl fmt::Debug for OperationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationLog")
            .field("operation", &self.operation)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl OperationLog {
    pub fn new(operation: &'static str, sink: Option<LogSink>) -> Self {
        Self { operation, sink }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn log(&self, message: &str) {
        tracing::debug!(operation = self.operation, "{}", message);
        if let Some(sink) = &self.sink {
            sink(&format_line(&Local::now(), self.operation, message));
        }
    }
}

/// `yyyy-MM-dd HH:mm:ss.fff zzz [Operation]: message`
pub fn format_line<Tz>(at: &DateTime<Tz>, operation: &str, message: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{} [{}]: {}",
        at.format("%Y-%m-%d %H:%M:%S%.3f %:z"),
        operation,
        message
    )
}
