use std::path::PathBuf;

/// A scenario that cannot be run as configured. Nothing has been sent to the store when one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Parallel must be between 1 and {}", crate::definition::MAX_PARALLELISM)]
    Parallelism,
    #[error("BufferSize must be between 1 and {}", crate::definition::MAX_BUFFER_SIZE)]
    BufferSize,
    #[error("Queries must not be empty")]
    NoOperations,
    #[error("every query needs a non-empty Name")]
    EmptyName,
    #[error("query name `{0}` is used more than once")]
    DuplicateName(String),
    #[error("query `{name}` has Repeat {repeat}, which must be 0 (forever) or a positive count")]
    Repeat { name: String, repeat: i64 },
    #[error("query `{name}`: action not supported: {action}")]
    UnsupportedAction { name: String, action: String },
    #[error("query `{name}`: payload empty")]
    EmptyPayload { name: String },
    #[error("query `{name}`: missing field {field}")]
    MissingField { name: String, field: &'static str },
    #[error("query `{name}`: malformed field {field}: {reason}")]
    MalformedField {
        name: String,
        field: &'static str,
        reason: String,
    },
    #[error("none of the configured queries can be run")]
    NoRunnableOperations,
    #[error("failed to read scenario file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The store could not be reached before the run started.
#[derive(Debug, thiserror::Error)]
#[error("failed to connect to {target}: {reason}")]
pub struct ConnectionError {
    pub target: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("failed to create the async runtime")]
    Runtime(#[source] std::io::Error),
    #[error("a pipeline task failed")]
    Task(#[from] tokio::task::JoinError),
}
