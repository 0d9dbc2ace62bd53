use std::{collections::HashSet, sync::Arc};

use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Пул для повторного использования `Arc<str>` по одинаковым именам каналов.
static CHANNEL_INTERN: Lazy<DashMap<Box<str>, Arc<str>>> = Lazy::new(DashMap::new);

/// Возвращает interned `Arc<str>` для данного канала.
///
/// При первом вызове для нового имени создаёт `Arc<str>` и сохраняет его в
/// пуле. Вставка идёт через `entry`, поэтому два потока с одним и тем же
/// именем всегда получат один и тот же указатель.
#[inline]
pub(crate) fn intern_channel<S: AsRef<str>>(chan: S) -> Arc<str> {
    let key = chan.as_ref();
    if let Some(existing) = CHANNEL_INTERN.get(key) {
        return existing.clone();
    }
    CHANNEL_INTERN
        .entry(Box::from(key))
        .or_insert_with(|| Arc::from(key))
        .clone()
}

#[cfg(test)]
pub(crate) fn is_interned(chan: &str) -> bool {
    CHANNEL_INTERN.contains_key(chan)
}

/// Превращает произвольный набор имён каналов в множество interned-ключей.
///
/// Дубликаты схлопываются, порядок первого вхождения сохраняется.
pub fn channel_set<I, S>(names: I) -> Vec<Arc<str>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(intern_channel)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Проверяет, что при первом вызове создаётся Arc<str> с правильным
    /// содержимым, а при повторном возвращается тот же самый объект.
    #[test]
    fn intern_new_and_repeats() {
        let a1 = intern_channel("kin");
        assert_eq!(&*a1, "kin");

        let a2 = intern_channel("kin");
        assert!(
            Arc::ptr_eq(&a1, &a2),
            "Должен вернуть тот же Arc по указателю"
        );
    }

    /// Проверяет, что для разных имён каналов создаются разные Arc<str>.
    #[test]
    fn intern_different_keys() {
        let a1 = intern_channel("dzadza");
        let a2 = intern_channel("maz");
        assert_eq!(&*a1, "dzadza");
        assert_eq!(&*a2, "maz");
        assert!(!Arc::ptr_eq(&a1, &a2), "Разные ключи - разные Arc");
    }

    /// Проверяет, что при конкурентных вызовах для одинаковых строк в разных
    /// потоках возвращается один и тот же `Arc<str>`.
    #[test]
    fn intern_concurrent() {
        let keys = ["race-a", "race-b", "race-a", "race-c", "race-b", "race-a"];
        let handles: Vec<_> = keys
            .iter()
            .map(|&k| std::thread::spawn(move || intern_channel(k)))
            .collect();

        let arcs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let first = arcs[0].clone();
        for arc in arcs.iter().filter(|arc| arc.as_ref() == "race-a") {
            assert!(
                Arc::ptr_eq(&first, arc),
                "Все interned для \"race-a\" должны ссылаться на один Arc"
            );
        }
    }

    #[test]
    fn channel_set_dedups_and_keeps_order() {
        let set = channel_set(["two", "one", "two", "three", "one"]);
        let names: Vec<&str> = set.iter().map(|s| s.as_ref()).collect();
        assert_eq!(names, vec!["two", "one", "three"]);
    }

    #[test]
    fn intern_registers_name() {
        assert!(!is_interned("intern-fresh"));
        intern_channel("intern-fresh");
        assert!(is_interned("intern-fresh"));
    }

    #[test]
    fn channel_set_empty() {
        let set = channel_set(Vec::<String>::new());
        assert!(set.is_empty());
    }
}
