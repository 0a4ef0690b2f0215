use crate::formatter::SageFormatter;
use crate::record::{AttrValue, ErrorValue, LogRecord, Number};
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that encodes every event it observes with a
/// [`SageFormatter`] and writes the resulting line to a [`MakeWriter`].
///
/// Encoding happens synchronously on the calling thread. Failures never
/// propagate into application code: they are counted in `failed_events` and
/// reported on stderr.
pub struct SageLayer<W = fn() -> io::Stdout> {
    formatter: SageFormatter,
    make_writer: W,
    /// Total events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Events encoded and written successfully.
    pub encoded_events: Arc<AtomicU64>,
    /// Events lost to an encode or write failure.
    pub failed_events: Arc<AtomicU64>,
}

impl SageLayer {
    /// Create a layer writing to stdout.
    pub fn new(formatter: SageFormatter) -> Self {
        Self {
            formatter,
            make_writer: io::stdout,
            total_events: Arc::new(AtomicU64::new(0)),
            encoded_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<W> SageLayer<W> {
    /// Replace the destination of encoded lines.
    pub fn with_writer<W2>(self, make_writer: W2) -> SageLayer<W2>
    where
        W2: for<'w> MakeWriter<'w> + 'static,
    {
        SageLayer {
            formatter: self.formatter,
            make_writer,
            total_events: self.total_events,
            encoded_events: self.encoded_events,
            failed_events: self.failed_events,
        }
    }

    pub fn formatter(&self) -> &SageFormatter {
        &self.formatter
    }
}

/// Build a [`LogRecord`] out of a `tracing` event, stamped with the
/// current time.
pub fn record_from_event(event: &Event<'_>) -> LogRecord {
    let mut attributes = BTreeMap::new();
    let mut message: Option<String> = None;

    let mut visitor = FieldVisitor {
        fields: &mut attributes,
        message: &mut message,
    };
    event.record(&mut visitor);

    LogRecord {
        timestamp: Utc::now().fixed_offset(),
        severity: (*event.metadata().level()).into(),
        message: message.unwrap_or_default(),
        attributes,
    }
}

impl<S, W> Layer<S> for SageLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let record = record_from_event(event);
        let line = match self.formatter.format(&record) {
            Ok(line) => line,
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("failed to encode log record: {}", e);
                return;
            }
        };

        let mut writer = self.make_writer.make_writer_for(event.metadata());
        if let Err(e) = writer.write_all(&line) {
            self.failed_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("failed to write log record: {}", e);
            return;
        }
        self.encoded_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Collects event fields into record attributes; the `message` field
/// becomes the record message.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, AttrValue>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: AttrValue) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, AttrValue::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, AttrValue::Number(Number::Int(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, AttrValue::Number(Number::UInt(value)));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        let value = match i64::try_from(value) {
            Ok(v) => AttrValue::Number(Number::Int(v)),
            Err(_) => match u64::try_from(value) {
                Ok(v) => AttrValue::Number(Number::UInt(v)),
                Err(_) => AttrValue::String(value.to_string()),
            },
        };
        self.insert(field, value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        let value = match u64::try_from(value) {
            Ok(v) => AttrValue::Number(Number::UInt(v)),
            Err(_) => AttrValue::String(value.to_string()),
        };
        self.insert(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, AttrValue::Number(Number::Float(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, AttrValue::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, AttrValue::Error(ErrorValue::capture(value)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, AttrValue::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EnvironmentMetadata;
    use serde_json::Value;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Captured;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_lines(f: impl FnOnce()) -> (Vec<Value>, u64) {
        let out = Captured::default();
        let formatter = SageFormatter::with_metadata(EnvironmentMetadata {
            system: "system".into(),
            ..Default::default()
        })
        .unwrap();
        let layer = SageLayer::new(formatter).with_writer(out.clone());
        let failed = Arc::clone(&layer.failed_events);
        tracing::subscriber::with_default(Registry::default().with(layer), f);

        let bytes = out.0.lock().unwrap().clone();
        let lines = String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (lines, failed.load(Ordering::Relaxed))
    }

    #[test]
    fn event_fields_become_extra() {
        let (lines, _) = capture_lines(|| {
            tracing::warn!(user_id = 42u64, retry = true, "authentication failed");
        });
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["msg"], "authentication failed");
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["extra"]["user_id"], 42);
        assert_eq!(line["extra"]["retry"], true);
        assert_eq!(line["system"], "system");
    }

    #[test]
    fn dyn_error_fields_are_described() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "test error");
        let err_ref: &(dyn std::error::Error + 'static) = &err;
        let (lines, _) = capture_lines(|| {
            tracing::error!(err = err_ref, "my log entry");
        });
        assert_eq!(lines[0]["extra"]["err"], "test error");
        assert_eq!(lines[0]["level"], "ERROR");
    }

    #[test]
    fn wide_integers_stay_numeric_when_they_fit() {
        let top = u128::from(u64::MAX);
        let huge = u128::MAX;
        let (lines, _) = capture_lines(|| {
            tracing::info!(big = 5i128, neg = -7i128, top, huge, "wide");
        });
        let extra = &lines[0]["extra"];
        assert_eq!(extra["big"], 5);
        assert_eq!(extra["neg"], -7);
        assert_eq!(extra["top"], u64::MAX);
        assert_eq!(extra["huge"], u128::MAX.to_string());
    }

    #[test]
    fn event_without_fields_has_no_extra() {
        let (lines, _) = capture_lines(|| tracing::info!("plain"));
        assert!(lines[0].get("extra").is_none());
    }

    #[test]
    fn encode_failure_is_counted_not_written() {
        let (lines, failed) = capture_lines(|| tracing::info!(ratio = f64::NAN, "bad"));
        assert!(lines.is_empty());
        assert_eq!(failed, 1);
    }
}
