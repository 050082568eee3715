//! Shared test helpers.

use std::sync::Once;

static INIT: Once = Once::new();

/// Route tracing output through the test harness so `--nocapture` shows
/// structured logs. Callable from every test; only the first call installs
/// the subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
