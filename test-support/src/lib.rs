pub mod fake_contact_endpoint;
pub mod fake_recaptcha;
pub mod fake_smtp;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` (and `log`, which mailin-embedded uses) output to the test harness.
pub fn setup_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .init();
    });
}
