use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const METRICS_PREFIX: &str = "coverage";

#[derive(thiserror::Error, Debug)]
pub enum MetricsSetupError {
    #[error("could not build statsd exporter: {0}")]
    Exporter(#[from] metrics_exporter_statsd::StatsdError),
    #[error("a global metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Install the tracing subscriber, plus the sentry integration when a DSN is configured.
/// The returned guard flushes sentry events on drop and must be held for the process lifetime.
pub fn init_logging(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.is_some().then(sentry::integrations::tracing::layer))
        .init();

    guard
}

/// Route the `metrics` facade to statsd. Without this, metrics are discarded.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsSetupError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| MetricsSetupError::AlreadyInstalled)?;

    for defs in [
        shared::metrics_defs::ALL_METRICS,
        key_service::ALL_METRICS,
        data_service::ALL_METRICS,
        upload_service::ALL_METRICS,
    ] {
        describe(defs);
    }

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
