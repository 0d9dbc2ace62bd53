//! Доставка сообщений подписчикам.
//!
//! На каждую пару (канал, подписчик) из снимка `publish` запускается
//! отдельная задача. Задача завершается, как только случится одно из трёх:
//! сообщение записано в inbox, отменена подписка, отменён брокер.
//! Гарантия доставки: не более одного раза на подписчика, без повторов.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{
    handle::{InFlightGuard, Subscriber},
    stats::{BrokerMetrics, DeliveryOutcome},
    Message,
};
use crate::config::DeliveryPolicy;

/// Запускает задачу доставки одного сообщения одному подписчику.
///
/// `target` уже учтён в счётчике "в полёте" подписчика; guard уходит в
/// задачу и освобождается на любом пути выхода.
pub(crate) fn spawn<T>(
    target: InFlightGuard<T>,
    message: Message<T>,
    global: CancellationToken,
    policy: DeliveryPolicy,
    metrics: Arc<BrokerMetrics>,
) where
    T: Send + 'static,
{
    tokio::spawn(async move {
        let channel = message.channel.clone();
        let outcome = deliver(&target, message, &global, policy).await;
        metrics.record_outcome(outcome);
        trace!(
            subscription_id = %target.id,
            channel = %channel,
            ?outcome,
            "delivery finished"
        );
    });
}

/// Одна попытка доставки.
pub(crate) async fn deliver<T>(
    target: &Subscriber<T>,
    message: Message<T>,
    global: &CancellationToken,
    policy: DeliveryPolicy,
) -> DeliveryOutcome {
    match policy {
        DeliveryPolicy::Block => {
            tokio::select! {
                biased;
                _ = global.cancelled() => DeliveryOutcome::ShutDown,
                _ = target.token.cancelled() => DeliveryOutcome::Cancelled,
                res = target.sender.send(message) => match res {
                    Ok(()) => DeliveryOutcome::Delivered,
                    // Приёмник уже уничтожен вместе с подпиской.
                    Err(_) => DeliveryOutcome::Cancelled,
                },
            }
        }
        DeliveryPolicy::DropNewest => {
            if global.is_cancelled() {
                return DeliveryOutcome::ShutDown;
            }
            if target.token.is_cancelled() {
                return DeliveryOutcome::Cancelled;
            }
            match target.sender.try_send(message) {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(TrySendError::Full(_)) => DeliveryOutcome::Full,
                Err(TrySendError::Closed(_)) => DeliveryOutcome::Cancelled,
            }
        }
    }
}
