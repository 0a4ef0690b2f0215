/// Error returned when a metadata construction step fails.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: String, reason: String },

    #[error("invalid timestamp format {format:?}")]
    InvalidTimeFormat { format: String },
}

/// Error returned when a record cannot be encoded.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("failed to marshal fields to JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("attribute {key:?} holds a non-finite number")]
    NonFiniteNumber { key: String },

    #[error("failed to format timestamp with {format:?}")]
    TimeFormat { format: String },
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
