//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Этот модуль реализует внутрипроцессный fan-out сообщений:
//!
//! - `broker`: реестр подписок по именам каналов и публикация.
//! - `delivery` (приватный): задачи доставки, по одной на пару
//!   канал/подписчик.
//! - `handle` (приватный): сторона подписки, которую видит реестр, и счётчик
//!   задач "в полёте".
//! - `intern` (приватный): пул имён каналов.
//! - `message`: структура сообщения.
//! - `stats`: счётчики брокера.
//! - `subscriber`: подписка и её принимающий конец.
//!
//! ```text
//! publish(channels, value)
//!     └─► снимок подписчиков канала (DashMap shard lock)
//!           └─► tokio::spawn(deliver) на каждого подписчика
//!                 ├─► inbox.send()           → Delivered
//!                 ├─► subscription token     → Cancelled
//!                 └─► broker token           → ShutDown
//! ```

pub mod broker;
mod delivery;
mod handle;
mod intern;
pub mod message;
pub mod stats;
pub mod subscriber;

pub use broker::{Broker, PublishReport};
pub use handle::SubscriptionId;
pub use intern::channel_set;
pub(crate) use intern::intern_channel;
pub use message::Message;
pub use stats::{BrokerStats, DeliveryOutcome};
pub use subscriber::{Inbox, Subscription};
