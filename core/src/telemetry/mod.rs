//! Tracing setup for hosts embedding the finalizer.

pub mod events;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "voxskill.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(false);
    let subscriber = Registry::default().with(env_filter()).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber).expect("failed to set global subscriber");
}

/// Console output plus a daily rolling JSON log under `dir`. Keep the guard
/// alive for as long as logs should be flushed.
pub fn init_tracing_to_dir(dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let subscriber = Registry::default()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().json().with_writer(writer));

    tracing::subscriber::set_global_default(subscriber).expect("failed to set global subscriber");
    guard
}
