//! Общие помощники для бенчмарков.

use tokio::runtime::Runtime;

/// Многопоточный runtime для async-бенчмарков.
pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}
