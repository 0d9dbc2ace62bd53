pub mod config;
pub mod pubsub;

pub use config::{ConfigError, LoggingError};
pub use pubsub::{RecvError, TryRecvError};
