use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::debug;

use super::{
    broker::BrokerShared,
    handle::{Subscriber, SubscriptionId},
    Message,
};
use crate::{RecvError, TryRecvError};

/// Подписка на набор каналов.
///
/// Создаётся через [`Broker::subscribe`](super::Broker::subscribe) и
/// принадлежит вызывающему коду. Брокер держит только сторону доставки,
/// поэтому подписка живёт ровно столько, сколько её владелец.
///
/// Отписка происходит явно через [`Subscription::unsubscribe`] либо
/// автоматически при `Drop` (без ожидания задач доставки).
pub struct Subscription<T> {
    handle: Arc<Subscriber<T>>,
    channels: Vec<Arc<str>>,
    inbox: mpsc::Receiver<Message<T>>,
    /// Обратная ссылка на брокер; не продлевает ему жизнь.
    broker: Weak<BrokerShared<T>>,
    registered: bool,
}

/// Принимающий конец подписки.
///
/// Чтение приостанавливает задачу до прихода сообщения, отмены подписки
/// или остановки брокера. После отмены сообщения, уже лежащие в inbox,
/// ещё можно вычитать; затем поток считается исчерпанным.
pub struct Inbox<'a, T> {
    subscription: &'a mut Subscription<T>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        handle: Arc<Subscriber<T>>,
        channels: Vec<Arc<str>>,
        inbox: mpsc::Receiver<Message<T>>,
        broker: Weak<BrokerShared<T>>,
        registered: bool,
    ) -> Self {
        Self {
            handle,
            channels,
            inbox,
            broker,
            registered,
        }
    }

    /// Возвращает идентификатор подписки.
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }

    /// Возвращает каналы, на которые оформлена подписка, в порядке
    /// первого упоминания.
    pub fn channels(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.iter().map(|c| c.as_ref())
    }

    /// Проверяет, что подписка ещё может получать новые сообщения.
    pub fn is_active(&self) -> bool {
        !self.handle.token.is_cancelled()
    }

    /// Количество задач доставки, которые сейчас пишут в inbox.
    pub fn in_flight(&self) -> usize {
        self.handle.in_flight()
    }

    /// Возвращает принимающий конец подписки.
    pub fn channel(&mut self) -> Inbox<'_, T> {
        Inbox { subscription: self }
    }

    /// Асинхронно ожидает следующее сообщение.
    ///
    /// # Возвращает
    /// - `Some(Message)` при успешном получении сообщения
    /// - `None`, если подписка отменена и inbox пуст
    pub async fn recv(&mut self) -> Option<Message<T>> {
        self.channel().recv().await
    }

    /// Ожидает следующее сообщение не дольше `timeout`.
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Message<T>, RecvError> {
        self.channel().recv_timeout(timeout).await
    }

    /// Пытается получить сообщение без ожидания.
    pub fn try_recv(&mut self) -> Result<Message<T>, TryRecvError> {
        self.channel().try_recv()
    }

    /// Отписывается от всех каналов.
    ///
    /// 1. Отменяет токен подписки: задачи доставки, ожидающие место в inbox,
    ///    прекращают попытку без доставки.
    /// 2. Ждёт, пока завершатся все задачи доставки "в полёте".
    /// 3. Удаляет подписку из реестра брокера.
    ///
    /// Повторный вызов ничего не делает. После возврата в inbox больше
    /// ничего не пишется и задач доставки "в полёте" не остаётся.
    pub async fn unsubscribe(&mut self) {
        self.handle.token.cancel();
        self.handle.wait_idle().await;
        self.unregister();
        // publish мог взять снимок между ожиданием и удалением из реестра;
        // такие задачи видят отмену и сразу выходят.
        self.handle.wait_idle().await;
        self.inbox.close();
    }

    fn unregister(&mut self) {
        if !std::mem::take(&mut self.registered) {
            return;
        }
        if let Some(broker) = self.broker.upgrade() {
            broker.unregister(self.handle.id, &self.channels);
        }
        debug!(subscription_id = %self.handle.id, "subscription removed");
    }
}

impl<T> Inbox<'_, T> {
    /// Асинхронно ожидает следующее сообщение.
    pub async fn recv(&mut self) -> Option<Message<T>> {
        let sub = &mut *self.subscription;
        tokio::select! {
            biased;
            msg = sub.inbox.recv() => msg,
            _ = sub.handle.token.cancelled() => sub.inbox.try_recv().ok(),
        }
    }

    /// Ожидает следующее сообщение не дольше `timeout`.
    ///
    /// # Возвращает
    /// - `Ok(Message)` при успешном получении сообщения
    /// - `Err(RecvError::Timeout)`, если за `timeout` ничего не пришло
    /// - `Err(RecvError::Closed)`, если подписка отменена и inbox пуст
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Message<T>, RecvError> {
        tokio::time::timeout(timeout, self.recv())
            .await?
            .ok_or(RecvError::Closed)
    }

    /// Пытается получить сообщение без ожидания.
    ///
    /// # Возвращает
    /// - `Ok(Message)`, если сообщение доступно немедленно
    /// - `Err(TryRecvError::Empty)`, если сообщений нет
    /// - `Err(TryRecvError::Closed)`, если подписка отменена и inbox пуст
    pub fn try_recv(&mut self) -> Result<Message<T>, TryRecvError> {
        let sub = &mut *self.subscription;
        match sub.inbox.try_recv() {
            Ok(msg) => Ok(msg),
            Err(_) if sub.handle.token.is_cancelled() => Err(TryRecvError::Closed),
            Err(err) => Err(err.into()),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.registered {
            self.handle.token.cancel();
            self.unregister();
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.handle.id)
            .field("channels", &self.channels)
            .field("active", &self.is_active())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
