//! Shared fixtures for the pipeline integration tests.
#![allow(dead_code)]

use resx::testkit;
use resx::Resx;

/// A facade with the fixture transformers registered.
pub fn runtime() -> Resx {
    init_tracing();
    let rt = Resx::new();
    testkit::register_transformers(&rt);
    rt
}

pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
