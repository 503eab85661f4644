use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "piazza_cache_hit_total",
            Unit::Count,
            "Total number of entity cache hits."
        );
        describe_counter!(
            "piazza_cache_miss_total",
            Unit::Count,
            "Total number of entity cache misses."
        );
        describe_counter!(
            "piazza_cache_stale_drop_total",
            Unit::Count,
            "Total number of fetched pages and entities discarded because a newer write superseded them."
        );
        describe_counter!(
            "piazza_mutation_applied_total",
            Unit::Count,
            "Total number of mutations applied speculatively."
        );
        describe_counter!(
            "piazza_mutation_committed_total",
            Unit::Count,
            "Total number of mutations acknowledged by the server."
        );
        describe_counter!(
            "piazza_mutation_rolled_back_total",
            Unit::Count,
            "Total number of mutations rolled back after a server rejection."
        );
        describe_counter!(
            "piazza_settle_failed_total",
            Unit::Count,
            "Total number of settle refetches that failed and were dropped."
        );
        describe_histogram!(
            "piazza_gateway_request_ms",
            Unit::Milliseconds,
            "API gateway request latency in milliseconds."
        );
        describe_histogram!(
            "piazza_mutation_settle_ms",
            Unit::Milliseconds,
            "Settle phase latency in milliseconds."
        );
    });
}
