use thiserror::Error;
use tokio::sync::mpsc;

/// Ошибка при получении сообщений из подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Подписка отменена (или брокер остановлен) и inbox пуст.
    #[error("subscription is closed")]
    Closed,

    #[error("operation exceeded the specified timeout")]
    Timeout,
}

/// Ошибка при неблокирующем получении сообщений.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    #[error("no messages available")]
    Empty,

    #[error("subscription is closed")]
    Closed,
}

// === Преобразования ===

impl From<mpsc::error::TryRecvError> for TryRecvError {
    fn from(err: mpsc::error::TryRecvError) -> Self {
        match err {
            mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            mpsc::error::TryRecvError::Disconnected => TryRecvError::Closed,
        }
    }
}

impl From<tokio::time::error::Elapsed> for RecvError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RecvError::Timeout
    }
}
