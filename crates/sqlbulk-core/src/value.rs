//! Dynamic SQL values.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A dynamically-typed SQL value.
///
/// Used for parameter binding, staged cells and result fetching.
/// `Value::Null` is the explicit database NULL marker; a `None` never
/// becomes a zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// 8-bit signed integer
    TinyInt(i8),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// Arbitrary precision decimal (stored as string)
    Decimal(String),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Date (days since 1970-01-01)
    Date(i32),

    /// Time of day (microseconds since midnight)
    Time(i64),

    /// Timestamp without zone (microseconds since epoch)
    Timestamp(i64),

    /// Timestamp with timezone (microseconds since epoch, UTC)
    TimestampTz(i64),

    /// UUID (as 16 bytes)
    Uuid([u8; 16]),

    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "FLOAT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "DATETIME",
            Value::TimestampTz(_) => "TIMESTAMP",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            other => other.as_i64().map(|v| v != 0),
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Decimal(s) => s.parse().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Uuid(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Interpret a temporal value as a naive date-time.
    ///
    /// `Date` becomes midnight, `TimestampTz` is read in UTC.
    pub fn as_naive_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(us) | Value::TimestampTz(us) => {
                DateTime::<Utc>::from_timestamp_micros(*us).map(|dt| dt.naive_utc())
            }
            Value::Date(days) => date_from_days(*days).map(|d| d.and_time(NaiveTime::MIN)),
            _ => None,
        }
    }

    /// Interpret a value as a calendar date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(days) => date_from_days(*days),
            other => other.as_naive_datetime().map(|dt| dt.date()),
        }
    }

    /// Interpret a value as a time of day.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(us) => time_from_micros(*us),
            other => other.as_naive_datetime().map(|dt| dt.time()),
        }
    }
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_CE_DAYS)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

#[allow(clippy::cast_possible_truncation)]
fn time_from_micros(us: i64) -> Option<NaiveTime> {
    if !(0..86_400 * MICROS_PER_SECOND).contains(&us) {
        return None;
    }
    let secs = (us / MICROS_PER_SECOND) as u32;
    let nanos = ((us % MICROS_PER_SECOND) * 1_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::SmallInt(i16::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Int(i32::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::BigInt(i64::from(v))
    }
}

/// Unsigned 64-bit ids above `i64::MAX` keep their digits as a decimal.
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(signed) => Value::BigInt(signed),
            Err(_) => Value::Decimal(v.to_string()),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(*v.as_bytes())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v.num_days_from_ce() - UNIX_EPOCH_CE_DAYS)
    }
}

/// Sub-microsecond nanoseconds are dropped.
impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        let micros = i64::from(v.num_seconds_from_midnight()) * MICROS_PER_SECOND
            + i64::from(v.nanosecond().min(999_999_999) / 1_000);
        Value::Time(micros)
    }
}

/// Sub-microsecond nanoseconds are dropped.
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc().timestamp_micros())
    }
}

/// Sub-microsecond nanoseconds are dropped.
impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v.timestamp_micros())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_integers() {
        assert_eq!(Value::from(7u8), Value::SmallInt(7));
        assert_eq!(Value::from(70_000u32), Value::BigInt(70_000));
        assert_eq!(Value::from(i64::MIN), Value::BigInt(i64::MIN));
        assert_eq!(
            Value::from(u64::MAX),
            Value::Decimal("18446744073709551615".to_string())
        );
    }

    #[test]
    fn test_from_option_is_null_marker() {
        let some: Value = Some(0i32).into();
        assert_eq!(some, Value::Int(0));

        assert_eq!(Value::from(Option::<i64>::None), Value::Null);

        let empty: Value = Some(String::new()).into();
        assert_eq!(empty, Value::Text(String::new()));
    }

    #[test]
    fn test_date_epoch_offsets() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(Value::from(epoch), Value::Date(0));

        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap();
        assert_eq!(Value::from(before), Value::Date(-1));
        assert_eq!(Value::Date(-1).as_date(), Some(before));
    }

    #[test]
    fn test_datetime_drops_sub_microsecond() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_nano_opt(10, 11, 12, 123_456_789)
            .unwrap();
        let value = Value::from(dt);
        let back = value.as_naive_datetime().unwrap();
        assert_eq!(back.nanosecond(), 123_456_000);
        assert_eq!(back.date(), dt.date());
    }

    #[test]
    fn test_utc_timestamp() {
        let dt = Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).unwrap();
        let value = Value::from(dt);
        assert!(matches!(value, Value::TimestampTz(_)));
        assert_eq!(value.as_naive_datetime(), Some(dt.naive_utc()));
    }

    #[test]
    fn test_time_of_day() {
        let t = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        let value = Value::from(t);
        assert_eq!(value, Value::Time(86_399_999_999));
        assert_eq!(value.as_time(), Some(t));
        assert_eq!(Value::Time(-1).as_time(), None);
    }

    #[test]
    fn test_uuid_keeps_raw_bytes() {
        let id = uuid::Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let value = Value::from(id);
        assert_eq!(value, Value::Uuid(*id.as_bytes()));
        assert_eq!(value.as_bytes(), Some(&id.as_bytes()[..]));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::SmallInt(-3).as_i64(), Some(-3));
        assert_eq!(Value::Decimal("7".to_string()).as_i64(), Some(7));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert!(Value::Json(serde_json::json!(1)).as_i64().is_none());
        assert_eq!(Value::TinyInt(1).as_bool(), Some(true));
        assert_eq!(Value::Text("1".to_string()).as_bool(), None);
    }
}
