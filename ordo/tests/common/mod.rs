#![allow(dead_code)]

use ordo::ThreadPool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Routes `tracing` output through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A private pool, so blocking tests do not starve each other.
pub fn pool(threads: usize) -> Arc<ThreadPool> {
    Arc::new(
        ThreadPool::builder()
            .worker_threads(threads)
            .thread_name("ordo-test")
            .build()
            .unwrap(),
    )
}

/// Polls `condition` until it holds or a generous deadline passes.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }

    condition()
}
