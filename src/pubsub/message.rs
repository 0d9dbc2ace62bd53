use std::sync::Arc;

use super::intern_channel;

/// Сообщение, опубликованное в канал.
///
/// Неизменяемо после создания: хранит имя канала, в который оно было
/// опубликовано, и непрозрачное значение.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T> {
    /// Имя канала; снаружи читается через [`Message::channel`].
    pub(crate) channel: Arc<str>,
    /// Полезная нагрузка.
    pub value: T,
}

impl<T> Message<T> {
    pub fn new(
        channel: impl AsRef<str>,
        value: T,
    ) -> Self {
        Self {
            channel: intern_channel(channel),
            value,
        }
    }

    /// Создаёт сообщение из уже interned-имени канала.
    pub(crate) fn from_key(
        channel: Arc<str>,
        value: T,
    ) -> Self {
        Self { channel, value }
    }

    /// Возвращает имя канала.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Разбирает сообщение на имя канала и значение.
    pub fn into_parts(self) -> (Arc<str>, T) {
        (self.channel, self.value)
    }
}
