//! Настройки брокера: ёмкость inbox и политика доставки.

pub mod settings;

pub use settings::{BrokerConfig, DeliveryPolicy, DEFAULT_INBOX_CAPACITY};
