//! The scalar value representation shared by every driver family.
//!
//! [`Value`] is the common currency between [`PreparedStatement`] parameter
//! binding and [`ResultSet`] column reads: relational drivers never see
//! UUIDs, columnar drivers never see `NULL` type tags the way a relational
//! placeholder does, but both speak the same enum.
//!
//! [`PreparedStatement`]: https://docs.rs/cpp-dbc-driver
//! [`ResultSet`]: https://docs.rs/cpp-dbc-driver

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

/// A timestamp with second-or-subsecond resolution (ISO-8601).
pub type Timestamp = chrono::NaiveDateTime;

/// A scalar database value.
///
/// Relational drivers use every variant except [`Value::Uuid`]; columnar
/// drivers additionally use [`Value::Uuid`] for native UUID columns. `NULL`
/// is represented out-of-band by [`Value::Null`] rather than by an
/// `Option<Value>` wrapper, so a caller can distinguish "no value bound yet"
/// from "value explicitly bound to NULL".
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 32-bit signed integer.
    Integer(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit floating point.
    Double(f64),
    /// Character data.
    String(String),
    /// Calendar date with no time-of-day component.
    Date(NaiveDate),
    /// Time-of-day with no calendar date component.
    Time(NaiveTime),
    /// Combined date and time, second-or-subsecond resolution.
    Timestamp(Timestamp),
    /// Opaque binary payload.
    Bytes(Vec<u8>),
    /// Native UUID (columnar drivers only).
    Uuid(Uuid),
}

impl Value {
    /// `true` if this value is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The zero-value used when a NULL column is read through a typed
    /// numeric or boolean getter, per the ResultSet contract: "NULL reads
    /// return zero-value for numeric/boolean and empty string for strings".
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Boolean(v) => *v,
            _ => false,
        }
    }

    /// See [`Value::as_bool`].
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Integer(v) => *v,
            Self::Long(v) => *v as i32,
            _ => 0,
        }
    }

    /// See [`Value::as_bool`].
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Long(v) => *v,
            Self::Integer(v) => i64::from(*v),
            _ => 0,
        }
    }

    /// See [`Value::as_bool`].
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Double(v) => *v,
            Self::Integer(v) => f64::from(*v),
            Self::Long(v) => *v as f64,
            _ => 0.0,
        }
    }

    /// NULL reads return an empty string for string columns.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::String(v) => v,
            _ => "",
        }
    }

    /// NULL reads return an empty slice for binary columns.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(v) => v,
            _ => &[],
        }
    }

    /// The data-layer type name, for diagnostics and error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "INTEGER",
            Self::Long(_) => "LONG",
            Self::Double(_) => "DOUBLE",
            Self::String(_) => "STRING",
            Self::Date(_) => "DATE",
            Self::Time(_) => "TIME",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Bytes(_) => "BYTES",
            Self::Uuid(_) => "UUID",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Uuid(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Self::Timestamp(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn null_probes_are_zero_value() {
        let v = Value::Null;
        assert!(v.is_null());
        assert!(!v.as_bool());
        assert_eq!(v.as_i32(), 0);
        assert_eq!(v.as_i64(), 0);
        assert_eq!(v.as_f64(), 0.0);
        assert_eq!(v.as_str(), "");
        assert_eq!(v.as_bytes(), &[] as &[u8]);
    }

    #[test]
    fn integer_widens_to_long_and_double() {
        let v = Value::Integer(7);
        assert_eq!(v.as_i64(), 7);
        assert_eq!(v.as_f64(), 7.0);
    }

    #[test]
    fn from_option_none_is_null() {
        let v: Value = Option::<i32>::None.into();
        assert!(v.is_null());
        let v: Value = Some(5i32).into();
        assert_eq!(v, Value::Integer(5));
    }

    #[test]
    fn type_names_match_data_layer() {
        assert_eq!(Value::Null.type_name(), "NULL");
        assert_eq!(Value::Uuid(Uuid::nil()).type_name(), "UUID");
    }
}
