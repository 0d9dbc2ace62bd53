use ::config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ёмкость inbox по умолчанию: одно сообщение "в полёте" на подписчика.
pub const DEFAULT_INBOX_CAPACITY: usize = 1;

/// Что делает задача доставки, когда inbox подписчика заполнен.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Ждать, пока подписчик вычитает inbox, либо пока подписка или брокер
    /// не будут отменены.
    #[default]
    Block,
    /// Сразу отбросить сообщение для этого подписчика.
    DropNewest,
}

/// Настройки доставки сообщений брокера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Сколько сообщений inbox буферизует до того, как задачи доставки
    /// начнут ждать (или отбрасывать, см. [`DeliveryPolicy`]).
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
    #[serde(default)]
    pub delivery: DeliveryPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            delivery: DeliveryPolicy::Block,
        }
    }
}

impl BrokerConfig {
    /// Загружает конфигурацию из переменных окружения с префиксом `FANOUT_`
    /// (`FANOUT_INBOX_CAPACITY`, `FANOUT_DELIVERY`) поверх значений по
    /// умолчанию.
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .set_default("inbox_capacity", DEFAULT_INBOX_CAPACITY as u64)?
            .set_default("delivery", "block")?
            .add_source(Environment::with_prefix("FANOUT").try_parsing(true))
            .build()?;

        let settings: Self = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_inbox_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.inbox_capacity = capacity;
        self
    }

    pub fn with_delivery(
        mut self,
        delivery: DeliveryPolicy,
    ) -> Self {
        self.delivery = delivery;
        self
    }

    /// Проверяет корректность настроек.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbox_capacity == 0 {
            return Err(ConfigError::InvalidInboxCapacity(self.inbox_capacity));
        }
        Ok(())
    }
}

fn default_inbox_capacity() -> usize {
    DEFAULT_INBOX_CAPACITY
}
