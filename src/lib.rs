pub mod env;
pub mod error;
pub mod formatter;
pub mod init;
pub mod layer;
pub mod layout;
pub mod metadata;
pub mod record;

pub use error::{ConfigError, EncodeError, InitError};
pub use formatter::{SageFormatter, SageFormatterBuilder};
pub use layer::SageLayer;
pub use metadata::{EnvironmentMetadata, MetadataStep, ProcessEnv, VarSource};
pub use record::{AttrValue, ErrorValue, LogRecord, Number, Severity};
