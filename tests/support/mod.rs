//! Shared setup for the integration suites: tracing for test-run diagnostics and the
//! in-memory catalog bootstrap every suite starts from.

use polyplane::catalog::Catalog;
use sqlx::SqlitePool;

/// Enable tracing output under the test harness. Safe to call once per test; later
/// calls are no-ops since the global subscriber can only be installed once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn pool() -> SqlitePool {
    init_tracing();
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    Catalog::bootstrap(&pool).await.unwrap();
    pool
}
