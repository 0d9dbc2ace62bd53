use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{
    channel_set, delivery,
    handle::{InFlightGuard, Subscriber, SubscriptionId},
    stats::{BrokerMetrics, BrokerStats},
    Message, Subscription,
};
use crate::{
    config::{BrokerConfig, DeliveryPolicy},
    error::ConfigError,
};

type ChannelKey = Arc<str>;
type SubscriberSet<T> = HashMap<SubscriptionId, Arc<Subscriber<T>>>;

/// Брокер Pub/Sub сообщений внутри процесса.
///
/// Поддерживает:
/// - Подписку одного потребителя сразу на несколько каналов
/// - Публикацию в несколько каналов без блокировки издателя
/// - Двухуровневую отмену: глобальный токен брокера и токен каждой подписки
/// - Автоматическое удаление пустых каналов
/// - Статистику публикаций и доставок
///
/// `Broker` дёшево клонируется: все клоны разделяют один реестр.
pub struct Broker<T> {
    shared: Arc<BrokerShared<T>>,
}

/// Итог одного вызова [`Broker::publish`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Сколько задач доставки запущено (по одной на пару канал/подписчик).
    pub deliveries: usize,
}

pub(crate) struct BrokerShared<T> {
    /// Каналы → подписчики. Шарды `DashMap` сериализуют вставку, снимок и
    /// удаление для каждого канала.
    channels: DashMap<ChannelKey, SubscriberSet<T>>,
    token: CancellationToken,
    config: BrokerConfig,
    next_id: AtomicU64,
    metrics: Arc<BrokerMetrics>,
}

impl<T> Broker<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Создаёт брокер с настройками по умолчанию, привязанный к `token`.
    ///
    /// Отмена `token` навсегда останавливает доставку для всех подписок.
    pub fn new(token: CancellationToken) -> Self {
        Self::from_parts(token, BrokerConfig::default())
    }

    /// Создаёт брокер с явной конфигурацией доставки.
    pub fn with_config(
        token: CancellationToken,
        config: BrokerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(token, config))
    }

    fn from_parts(
        token: CancellationToken,
        config: BrokerConfig,
    ) -> Self {
        debug!(
            inbox_capacity = config.inbox_capacity,
            delivery = ?config.delivery,
            "broker created"
        );
        Self {
            shared: Arc::new(BrokerShared {
                channels: DashMap::new(),
                token,
                config,
                next_id: AtomicU64::new(0),
                metrics: Arc::new(BrokerMetrics::default()),
            }),
        }
    }

    /// Публикует `value` во все каналы из `channels`.
    ///
    /// Для каждого канала берётся снимок текущих подписчиков и на каждого
    /// запускается своя задача доставки. Метод не ждёт получателей и
    /// никогда не приостанавливается. Каналы без подписчиков пропускаются,
    /// сообщение для них просто теряется.
    ///
    /// # Panics
    /// Должен вызываться внутри Tokio runtime, если у канала есть подписчики.
    pub fn publish<I, S>(
        &self,
        channels: I,
        value: T,
    ) -> PublishReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let shared = &self.shared;
        shared.metrics.record_publish();

        if shared.token.is_cancelled() {
            trace!("publish after broker shutdown ignored");
            return PublishReport::default();
        }

        let policy = shared.config.delivery;
        let mut deliveries = 0;

        let names: Vec<S> = channels.into_iter().collect();
        let mut seen = HashSet::with_capacity(names.len());

        for name in &names {
            let name: &str = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            // ключ берётся из реестра: имена без подписчиков не интернируются
            let (channel, targets): (ChannelKey, Vec<_>) = match shared.channels.get(name) {
                Some(entry) => (
                    entry.key().clone(),
                    entry.values().map(|sub| sub.enter()).collect(),
                ),
                None => continue,
            };

            for target in targets {
                let message = Message::from_key(channel.clone(), value.clone());
                self.spawn_delivery(target, message, policy);
                deliveries += 1;
            }
            trace!(channel = %channel, deliveries, "message fanned out");
        }

        shared.metrics.record_spawned(deliveries as u64);
        PublishReport { deliveries }
    }

    fn spawn_delivery(
        &self,
        target: InFlightGuard<T>,
        message: Message<T>,
        policy: DeliveryPolicy,
    ) {
        delivery::spawn(
            target,
            message,
            self.shared.token.clone(),
            policy,
            self.shared.metrics.clone(),
        );
    }

    /// Подписывается на все каналы из `channels`.
    ///
    /// Подписка видна любому `publish`, начавшемуся после возврата из этого
    /// метода. Сообщения, опубликованные раньше, не доставляются. Если
    /// брокер уже остановлен, возвращается отменённая подписка, которая не
    /// попадает в реестр. Подписка на пустой набор каналов тоже не
    /// регистрируется и не учитывается в статистике.
    pub fn subscribe<I, S>(
        &self,
        channels: I,
    ) -> Subscription<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let shared = &self.shared;
        let channels = channel_set(channels);
        let id = SubscriptionId(shared.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::channel(shared.config.inbox_capacity);
        let handle = Arc::new(Subscriber::new(id, tx, shared.token.child_token()));

        let registered = !shared.token.is_cancelled() && !channels.is_empty();
        if registered {
            for channel in &channels {
                shared
                    .channels
                    .entry(channel.clone())
                    .or_default()
                    .insert(id, handle.clone());
            }
            shared.metrics.subscription_opened();
            debug!(subscription_id = %id, channels = ?channels, "subscription registered");
        } else {
            debug!(subscription_id = %id, channels = channels.len(), "subscription not registered");
        }

        Subscription::new(handle, channels, rx, Arc::downgrade(shared), registered)
    }
}

impl<T> Broker<T> {
    /// Останавливает брокер: отменяет глобальный токен.
    ///
    /// Все задачи доставки прерываются, новые публикации игнорируются.
    pub fn shutdown(&self) {
        if !self.shared.token.is_cancelled() {
            debug!("broker shutdown requested");
        }
        self.shared.token.cancel();
    }

    /// Проверяет, остановлен ли брокер.
    pub fn is_shutdown(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Возвращает глобальный токен брокера.
    pub fn token(&self) -> &CancellationToken {
        &self.shared.token
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.shared.config
    }

    /// Возвращает количество подписчиков на канал.
    pub fn subscriber_count<S: AsRef<str>>(
        &self,
        channel: S,
    ) -> usize {
        self.shared
            .channels
            .get(channel.as_ref())
            .map_or(0, |subs| subs.len())
    }

    /// Возвращает отсортированный список каналов, у которых есть подписчики.
    pub fn active_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .channels
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Возвращает снимок счётчиков брокера.
    pub fn stats(&self) -> BrokerStats {
        self.shared.metrics.snapshot()
    }
}

impl<T> BrokerShared<T> {
    /// Удаляет подписку `id` из всех её каналов.
    ///
    /// Повторный вызов ничего не делает. Опустевшие каналы удаляются.
    pub(crate) fn unregister(
        &self,
        id: SubscriptionId,
        channels: &[ChannelKey],
    ) {
        let mut removed = false;
        for channel in channels {
            if let Some(mut subs) = self.channels.get_mut(channel) {
                removed |= subs.remove(&id).is_some();
            }
            // guard шарда уже отпущен, иначе remove_if заблокируется
            self.channels.remove_if(channel, |_, subs| subs.is_empty());
        }
        if removed {
            self.metrics.subscription_closed();
        }
    }
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Broker<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Broker")
            .field("channels", &self.shared.channels.len())
            .field("config", &self.shared.config)
            .field("shutdown", &self.shared.token.is_cancelled())
            .finish()
    }
}
