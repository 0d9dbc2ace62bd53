use thiserror::Error;

/// Ошибки загрузки и проверки конфигурации брокера.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("inbox capacity must be at least 1, got {0}")]
    InvalidInboxCapacity(usize),

    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Ошибки инициализации логирования.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("unknown log format '{0}' (expected pretty, compact or json)")]
    UnknownFormat(String),

    #[error("global tracing subscriber is already set: {0}")]
    AlreadyInitialized(String),
}
