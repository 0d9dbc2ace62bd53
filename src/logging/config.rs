use std::{env, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::LoggingError;

/// Формат вывода логов.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Конфигурация логирования.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Директива фильтра: уровень (`info`) или полная директива
    /// `EnvFilter` (`fanout=debug,warn`).
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub with_ansi: bool,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// Применяет переопределения из `FANOUT_LOG_LEVEL` и `FANOUT_LOG_FORMAT`.
    pub fn apply_env_overrides(&mut self) -> Result<(), LoggingError> {
        if let Ok(level) = env::var("FANOUT_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("FANOUT_LOG_FORMAT") {
            self.format = format.parse()?;
        }
        Ok(())
    }

    /// Директива фильтра, собранная из конфигурации.
    pub fn build_filter_directive(&self) -> String {
        self.level.trim().to_string()
    }

    /// Проверяет, что директива разбирается `EnvFilter`.
    pub fn validate(&self) -> Result<(), LoggingError> {
        let directive = self.build_filter_directive();
        EnvFilter::try_new(&directive)
            .map(|_| ())
            .map_err(|e| LoggingError::InvalidDirective {
                directive,
                reason: e.to_string(),
            })
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
