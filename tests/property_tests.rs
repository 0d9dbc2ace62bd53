//! Property-based тесты для реестра подписок.
//!
//! Генерируются случайные наборы подписок и публикаций; проверяется, что
//! каждый подписчик получает ровно сообщения своих каналов.

use std::collections::{BTreeMap, HashSet};

use fanout::{channel_set, Broker, CancellationToken};
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 64;

/// Небольшой алфавит каналов, чтобы подписки и публикации пересекались.
fn channel_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string)
}

fn channels_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(channel_strategy(), 1..4)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        ..ProptestConfig::default()
    })]

    /// channel_set убирает дубликаты и сохраняет порядок первого появления.
    #[test]
    fn prop_channel_set_dedups_in_order(names in prop::collection::vec(channel_strategy(), 0..16)) {
        let set = channel_set(&names);

        let mut seen = HashSet::new();
        let expected: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| seen.insert(*n))
            .collect();

        let got: Vec<&str> = set.iter().map(|c| c.as_ref()).collect();
        prop_assert_eq!(got, expected);
    }

    /// Каждый подписчик получает по одному сообщению на каждую пару
    /// (публикация, канал), где канал входит в его подписку.
    #[test]
    fn prop_each_subscriber_gets_its_channels(
        subscriptions in prop::collection::vec(channels_strategy(), 1..6),
        publishes in prop::collection::vec(channels_strategy(), 0..12),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let broker = Broker::new(CancellationToken::new());
            let mut subs: Vec<_> = subscriptions
                .iter()
                .map(|chs| broker.subscribe(chs))
                .collect();

            let mut total = 0;
            for (i, chs) in publishes.iter().enumerate() {
                total += broker.publish(chs, i).deliveries;
            }

            let mut expected_total = 0;
            for (sub, chs) in subs.iter_mut().zip(&subscriptions) {
                let own: HashSet<&str> = chs.iter().map(String::as_str).collect();

                // (канал, номер публикации) -> количество
                let mut expected: BTreeMap<(String, usize), usize> = BTreeMap::new();
                for (i, pub_chs) in publishes.iter().enumerate() {
                    for ch in channel_set(pub_chs) {
                        if own.contains(ch.as_ref()) {
                            *expected.entry((ch.to_string(), i)).or_default() += 1;
                        }
                    }
                }
                let count: usize = expected.values().sum();
                expected_total += count;

                let mut got: BTreeMap<(String, usize), usize> = BTreeMap::new();
                for _ in 0..count {
                    let msg = sub
                        .recv_timeout(std::time::Duration::from_secs(2))
                        .await
                        .expect("missing delivery");
                    *got.entry((msg.channel().to_string(), msg.value)).or_default() += 1;
                }
                sub.unsubscribe().await;

                assert_eq!(got, expected);
                assert!(sub.recv().await.is_none(), "extra delivery");
            }

            assert_eq!(total, expected_total);
            assert_eq!(broker.stats().active_subscriptions, 0);
        });
    }
}
