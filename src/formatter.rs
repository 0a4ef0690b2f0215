use crate::error::{ConfigError, EncodeError};
use crate::metadata::{build_metadata, EnvironmentMetadata, MetadataStep, VarSource};
use crate::record::{AttrValue, LogRecord, Number};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Encodes [`LogRecord`]s as single-line Sage JSON objects.
///
/// The formatter only holds immutable [`EnvironmentMetadata`], so one
/// instance can be shared across threads and used concurrently.
#[derive(Debug, Clone, Default)]
pub struct SageFormatter {
    metadata: EnvironmentMetadata,
    time_pattern: Option<String>,
}

/// Wire shape of one encoded record.
#[derive(Serialize)]
struct SageLogEntry<'a> {
    #[serde(rename = "@timestamp")]
    time: String,
    msg: &'a str,
    level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    dc: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    env: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    group: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    inst: &'a str,
}

impl SageFormatter {
    pub fn builder() -> SageFormatterBuilder {
        SageFormatterBuilder::default()
    }

    /// Formatter with metadata read from the `SAGE_*` process variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().metadata_from_env().build()
    }

    /// Formatter with the given metadata and nothing else.
    pub fn with_metadata(metadata: EnvironmentMetadata) -> Result<Self, ConfigError> {
        Self::builder().metadata(metadata).build()
    }

    pub fn metadata(&self) -> &EnvironmentMetadata {
        &self.metadata
    }

    /// Encode `record` as one JSON object followed by `\n`.
    ///
    /// **Errors**
    /// - [`EncodeError::NonFiniteNumber`] if an attribute holds NaN or an
    ///   infinity, which JSON cannot represent.
    /// - [`EncodeError::TimeFormat`] if the time format override cannot be
    ///   rendered for this instant.
    /// - [`EncodeError::Serialize`] if `serde_json` fails.
    pub fn format(&self, record: &LogRecord) -> Result<Vec<u8>, EncodeError> {
        let extra = if record.attributes.is_empty() {
            None
        } else {
            Some(normalize_attributes(&record.attributes)?)
        };

        let entry = SageLogEntry {
            time: self.format_time(record.timestamp.with_timezone(&Utc))?,
            msg: &record.message,
            level: record.severity.as_str(),
            extra,
            dc: &self.metadata.dc,
            env: &self.metadata.env,
            group: &self.metadata.group,
            system: &self.metadata.system,
            inst: &self.metadata.inst,
        };

        let mut serialized = serde_json::to_vec(&entry)?;
        serialized.push(b'\n');
        Ok(serialized)
    }

    fn format_time(&self, time: DateTime<Utc>) -> Result<String, EncodeError> {
        let Some(pattern) = &self.time_pattern else {
            return Ok(time.to_rfc3339_opts(SecondsFormat::Secs, true));
        };
        let mut out = String::new();
        write!(out, "{}", time.format(pattern)).map_err(|_| EncodeError::TimeFormat {
            format: pattern.clone(),
        })?;
        Ok(out)
    }
}

/// Convert attributes into plain JSON, replacing every error with its
/// description. `serde_json` has no representation for error objects.
fn normalize_attributes(
    attributes: &BTreeMap<String, AttrValue>,
) -> Result<Map<String, Value>, EncodeError> {
    attributes
        .iter()
        .map(|(key, value)| {
            normalize_value(value)
                .map(|v| (key.clone(), v))
                .ok_or_else(|| EncodeError::NonFiniteNumber { key: key.clone() })
        })
        .collect()
}

/// `None` when the value contains a non-finite float.
fn normalize_value(value: &AttrValue) -> Option<Value> {
    Some(match value {
        AttrValue::String(s) => Value::String(s.clone()),
        AttrValue::Number(Number::Int(i)) => Value::from(*i),
        AttrValue::Number(Number::UInt(u)) => Value::from(*u),
        AttrValue::Number(Number::Float(f)) => Value::Number(serde_json::Number::from_f64(*f)?),
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Null => Value::Null,
        AttrValue::Array(items) => Value::Array(
            items
                .iter()
                .map(normalize_value)
                .collect::<Option<Vec<_>>>()?,
        ),
        AttrValue::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| normalize_value(v).map(|v| (k.clone(), v)))
                .collect::<Option<Map<_, _>>>()?,
        ),
        AttrValue::Error(err) => Value::String(err.description()),
    })
}

/// Builder for [`SageFormatter`]; collects metadata steps and applies them
/// in the order they were added.
#[derive(Debug, Default)]
pub struct SageFormatterBuilder {
    steps: Vec<MetadataStep>,
}

impl SageFormatterBuilder {
    /// Overlay values of the `SAGE_*` process variables.
    pub fn metadata_from_env(self) -> Self {
        self.step(MetadataStep::from_env())
    }

    /// Overlay values looked up in `source` under the `SAGE_*` names.
    pub fn metadata_from(self, source: impl VarSource + 'static) -> Self {
        self.step(MetadataStep::from_source(source))
    }

    /// Replace all metadata collected so far.
    pub fn metadata(self, metadata: EnvironmentMetadata) -> Self {
        self.step(MetadataStep::Explicit(metadata))
    }

    pub fn step(mut self, step: MetadataStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Result<SageFormatter, ConfigError> {
        let metadata = build_metadata(&self.steps)?;
        let time_pattern = metadata.time_pattern()?;
        Ok(SageFormatter {
            metadata,
            time_pattern,
        })
    }
}
