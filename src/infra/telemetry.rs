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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "smart_erp_gateway_cache_hit_total",
            Unit::Count,
            "Requests answered from a cache partition, by strategy."
        );
        describe_counter!(
            "smart_erp_gateway_cache_miss_total",
            Unit::Count,
            "Requests no cache partition could answer, by strategy."
        );
        describe_counter!(
            "smart_erp_gateway_offline_fallback_total",
            Unit::Count,
            "Navigations answered with the offline document."
        );
        describe_counter!(
            "smart_erp_gateway_cache_write_failed_total",
            Unit::Count,
            "Cache writes that failed and were dropped."
        );
        describe_histogram!(
            "smart_erp_upstream_fetch_ms",
            Unit::Milliseconds,
            "Latency of requests forwarded to the upstream origin."
        );
        describe_counter!(
            "smart_erp_planning_submit_total",
            Unit::Count,
            "Planning batch submissions, by outcome."
        );
    });
}
