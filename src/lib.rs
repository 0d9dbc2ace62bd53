/// Broker configuration: inbox capacity and delivery policy.
pub mod config;
/// Common error types: subscription reads, configuration, logging.
pub mod error;
/// Logging setup (filters, formats).
pub mod logging;
/// Pub/Sub: Broker, Subscription, Message.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{BrokerConfig, DeliveryPolicy};
/// Operation errors.
pub use error::{ConfigError, LoggingError, RecvError, TryRecvError};
/// Logging entry point.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Pub/Sub API.
pub use pubsub::{
    channel_set, Broker, BrokerStats, DeliveryOutcome, Inbox, Message, PublishReport,
    Subscription, SubscriptionId,
};
/// Cancellation primitive the broker is bound to.
pub use tokio_util::sync::CancellationToken;
