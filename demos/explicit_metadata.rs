use std::io::Write;

use sage_formatter::{EnvironmentMetadata, LogRecord, SageFormatter, Severity};

fn main() {
    let formatter = SageFormatter::builder()
        .metadata_from_env()
        .metadata(EnvironmentMetadata {
            env: "prod".to_string(),
            group: "test".to_string(),
            system: "system".to_string(),
            ..Default::default()
        })
        .build()
        .expect("valid metadata");

    let err = std::io::Error::new(std::io::ErrorKind::Other, "test error");
    let record = LogRecord::new(Severity::Fatal, "my log entry")
        .with_field("foo", "bar")
        .with_error(err);

    let line = formatter.format(&record).expect("encodable record");
    std::io::stdout().write_all(&line).expect("write to stdout");
}
