use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Чем закончилась одна задача доставки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Сообщение записано в inbox.
    Delivered,
    /// Подписка отменена (`unsubscribe` или drop) раньше, чем inbox освободился.
    Cancelled,
    /// Сработал глобальный токен брокера.
    ShutDown,
    /// Inbox заполнен, а политика доставки велит не ждать.
    Full,
}

/// Счётчики брокера.
#[derive(Debug, Default)]
pub(crate) struct BrokerMetrics {
    publish_count: AtomicU64,
    deliveries_spawned: AtomicU64,
    delivered: AtomicU64,
    dropped_cancelled: AtomicU64,
    dropped_full: AtomicU64,
    active_subscriptions: AtomicUsize,
}

/// Снимок счётчиков брокера.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BrokerStats {
    /// Общее количество вызовов `publish`.
    pub publish_count: u64,
    /// Сколько задач доставки было запущено.
    pub deliveries_spawned: u64,
    /// Сколько сообщений попало в inbox.
    pub delivered: u64,
    /// Сколько сообщений отброшено из-за отмены подписки или брокера.
    pub dropped_cancelled: u64,
    /// Сколько сообщений отброшено из-за заполненного inbox.
    pub dropped_full: u64,
    /// Текущее число зарегистрированных подписок.
    pub active_subscriptions: usize,
}

impl BrokerMetrics {
    pub(crate) fn record_publish(&self) {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spawned(
        &self,
        count: u64,
    ) {
        self.deliveries_spawned.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(
        &self,
        outcome: DeliveryOutcome,
    ) {
        let counter = match outcome {
            DeliveryOutcome::Delivered => &self.delivered,
            DeliveryOutcome::Cancelled | DeliveryOutcome::ShutDown => &self.dropped_cancelled,
            DeliveryOutcome::Full => &self.dropped_full,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn subscription_opened(&self) {
        self.active_subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn subscription_closed(&self) {
        self.active_subscriptions.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BrokerStats {
        BrokerStats {
            publish_count: self.publish_count.load(Ordering::Relaxed),
            deliveries_spawned: self.deliveries_spawned.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_cancelled: self.dropped_cancelled.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
        }
    }
}
