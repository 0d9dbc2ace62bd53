use std::{
    fmt,
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use super::Message;

/// Уникальный идентификатор подписки внутри одного брокера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Сторона подписки, которую видит реестр брокера.
///
/// Хранит только то, что нужно задачам доставки: отправляющий конец inbox,
/// собственный токен отмены и счётчик задач "в полёте". Сам `Subscription`
/// реестр не держит.
pub(crate) struct Subscriber<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) sender: mpsc::Sender<Message<T>>,
    pub(crate) token: CancellationToken,
    in_flight: InFlight,
}

impl<T> Subscriber<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        sender: mpsc::Sender<Message<T>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            sender,
            token,
            in_flight: InFlight::default(),
        }
    }

    /// Регистрирует новую задачу доставки. Счётчик уменьшается при drop
    /// возвращённого guard'а, на любом пути выхода из задачи.
    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard<T> {
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            target: Arc::clone(self),
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Ждёт, пока все зарегистрированные задачи доставки не завершатся.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            // Подписываемся на уведомление до проверки счётчика, иначе
            // последний guard может уйти между load и await.
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Guard задачи доставки: держит подписчика и уменьшает счётчик при drop.
pub(crate) struct InFlightGuard<T> {
    target: Arc<Subscriber<T>>,
}

impl<T> Deref for InFlightGuard<T> {
    type Target = Subscriber<T>;

    fn deref(&self) -> &Self::Target {
        &self.target
    }
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        let in_flight = &self.target.in_flight;
        if in_flight.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            in_flight.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn subscriber() -> Arc<Subscriber<u32>> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(Subscriber::new(
            SubscriptionId(7),
            tx,
            CancellationToken::new(),
        ))
    }

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId(42).to_string(), "sub-42");
        assert_eq!(SubscriptionId(42).as_u64(), 42);
    }

    /// Тест проверяет, что guard увеличивает и уменьшает счётчик.
    #[test]
    fn test_guard_tracks_in_flight() {
        let sub = subscriber();
        assert_eq!(sub.in_flight(), 0);

        let g1 = sub.enter();
        let g2 = sub.enter();
        assert_eq!(sub.in_flight(), 2);
        assert_eq!(g1.id, SubscriptionId(7));

        drop(g1);
        assert_eq!(sub.in_flight(), 1);
        drop(g2);
        assert_eq!(sub.in_flight(), 0);
    }

    /// Тест проверяет, что wait_idle сразу возвращается без задач.
    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_idle() {
        let sub = subscriber();
        timeout(Duration::from_millis(100), sub.wait_idle())
            .await
            .expect("wait_idle should not block");
    }

    /// Тест проверяет, что wait_idle ждёт последний guard.
    #[tokio::test]
    async fn test_wait_idle_waits_for_guards() {
        let sub = subscriber();
        let guard = sub.enter();

        let waiter = {
            let sub = sub.clone();
            tokio::spawn(async move { sub.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should finish")
            .expect("waiter panicked");
    }

    /// Тест проверяет, что guard освобождается даже при панике задачи.
    #[tokio::test]
    async fn test_guard_released_on_panic() {
        let sub = subscriber();
        let guard = sub.enter();

        let res = tokio::spawn(async move {
            let _guard = guard;
            panic!("delivery task failed");
        })
        .await;

        assert!(res.is_err());
        assert_eq!(sub.in_flight(), 0);
    }
}
