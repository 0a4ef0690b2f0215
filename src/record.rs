use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Severity of a [`LogRecord`] as reported by the host logging facility.
///
/// The named variants are ordered from least to most severe. `Unrecognized`
/// stands for any level the host emits that has no counterpart here; it is
/// encoded as `INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    /// Highest-severity abort level (`panic` / `critical`).
    Panic,
    Unrecognized,
}

impl Severity {
    /// Canonical name written to the `level` output field.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal | Severity::Panic => "FATAL",
            Severity::Unrecognized => "INFO",
        }
    }

    /// Parse a level name case-insensitively. Never fails: unknown names
    /// yield [`Severity::Unrecognized`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Severity::Trace,
            "debug" => Severity::Debug,
            "info" => Severity::Info,
            "warn" | "warning" => Severity::Warn,
            "error" => Severity::Error,
            "fatal" => Severity::Fatal,
            "panic" | "critical" => Severity::Panic,
            _ => Severity::Unrecognized,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Severity::Trace,
            tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

/// Numeric attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Error attached to a record as an attribute.
///
/// Holds the error object itself; it is turned into its description only
/// when the record is encoded.
#[derive(Clone)]
pub struct ErrorValue(Arc<dyn Error + Send + Sync>);

impl ErrorValue {
    pub fn new<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        ErrorValue(Arc::new(err))
    }

    /// Snapshot a borrowed error, e.g. one handed out by a `tracing` visitor.
    pub fn capture(err: &(dyn Error + 'static)) -> Self {
        ErrorValue(Arc::new(CapturedError(err.to_string())))
    }

    /// Human-readable description of the wrapped error.
    pub fn description(&self) -> String {
        self.0.to_string()
    }

    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorValue").field(&self.description()).finish()
    }
}

#[derive(Debug)]
struct CapturedError(String);

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for CapturedError {}

/// Value of a single record attribute.
#[derive(Debug, Clone)]
pub enum AttrValue {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
    Array(Vec<AttrValue>),
    Object(BTreeMap<String, AttrValue>),
    Error(ErrorValue),
}

impl AttrValue {
    pub fn error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        AttrValue::Error(ErrorValue::new(err))
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Number(Number::Int(v.into()))
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Number(Number::Int(v))
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Number(Number::UInt(v.into()))
    }
}

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        AttrValue::Number(Number::UInt(v))
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(Number::Float(v))
    }
}

impl From<ErrorValue> for AttrValue {
    fn from(v: ErrorValue) -> Self {
        AttrValue::Error(v)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AttrValue::Null, Into::into)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(v: Vec<T>) -> Self {
        AttrValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttrValue::Number(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    AttrValue::Number(Number::UInt(u))
                } else {
                    AttrValue::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => AttrValue::String(s),
            Value::Array(items) => AttrValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                AttrValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// A single log record handed over by the host logging facility.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub severity: Severity,
    pub message: String,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl LogRecord {
    /// Create a record stamped with the current time and no attributes.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().fixed_offset(),
            severity,
            message: message.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_time<Tz: chrono::TimeZone>(mut self, time: DateTime<Tz>) -> Self {
        self.timestamp = time.fixed_offset();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_fields<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<AttrValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.attributes
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach an error under the conventional `error` key.
    pub fn with_error<E>(self, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.with_field(ERROR_KEY, AttrValue::error(err))
    }
}

/// Attribute key used by [`LogRecord::with_error`].
pub const ERROR_KEY: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn severity_names_are_total() {
        let cases = [
            (Severity::Trace, "TRACE"),
            (Severity::Debug, "DEBUG"),
            (Severity::Info, "INFO"),
            (Severity::Warn, "WARN"),
            (Severity::Error, "ERROR"),
            (Severity::Fatal, "FATAL"),
            (Severity::Panic, "FATAL"),
            (Severity::Unrecognized, "INFO"),
        ];
        for (severity, name) in cases {
            assert_eq!(severity.as_str(), name);
        }
    }

    #[test]
    fn from_name_accepts_aliases() {
        assert_eq!(Severity::from_name("WARNING"), Severity::Warn);
        assert_eq!(Severity::from_name(" critical "), Severity::Panic);
        assert_eq!(Severity::from_name("notice"), Severity::Unrecognized);
    }

    #[test]
    fn tracing_levels_map_one_to_one() {
        assert_eq!(Severity::from(tracing::Level::TRACE), Severity::Trace);
        assert_eq!(Severity::from(tracing::Level::WARN), Severity::Warn);
        assert_eq!(Severity::from(tracing::Level::ERROR), Severity::Error);
    }

    #[test]
    fn with_error_uses_error_key() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let record = LogRecord::new(Severity::Error, "write failed").with_error(err);
        match record.attributes.get(ERROR_KEY) {
            Some(AttrValue::Error(e)) => assert_eq!(e.description(), "disk gone"),
            other => panic!("unexpected attribute: {:?}", other),
        }
    }

    #[test]
    fn with_time_keeps_the_instant() {
        let utc = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let plus3 = utc.with_timezone(&FixedOffset::east_opt(3 * 3600).unwrap());
        let record = LogRecord::new(Severity::Info, "").with_time(plus3);
        assert_eq!(record.timestamp, utc.fixed_offset());
    }

    #[test]
    fn json_values_convert() {
        let value: AttrValue = serde_json::json!({"a": [1, -2, 1.5, null, true]}).into();
        let AttrValue::Object(map) = value else {
            panic!("expected object");
        };
        let Some(AttrValue::Array(items)) = map.get("a") else {
            panic!("expected array");
        };
        assert!(matches!(items[0], AttrValue::Number(Number::Int(1))));
        assert!(matches!(items[1], AttrValue::Number(Number::Int(-2))));
        assert!(matches!(items[2], AttrValue::Number(Number::Float(f)) if f == 1.5));
        assert!(matches!(items[3], AttrValue::Null));
        assert!(matches!(items[4], AttrValue::Bool(true)));
    }
}
