use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::layered_nav::METRIC_FILTER_QUERY_MS;
use crate::cache::metric_names;
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
            metric_names::METRIC_TRANSIENT_HIT,
            Unit::Count,
            "Total number of transient cache hits."
        );
        describe_counter!(
            metric_names::METRIC_TRANSIENT_MISS,
            Unit::Count,
            "Total number of transient cache misses, expired entries included."
        );
        describe_counter!(
            metric_names::METRIC_TRANSIENT_EVICT,
            Unit::Count,
            "Total number of in-memory transient evictions due to capacity."
        );
        describe_counter!(
            metric_names::METRIC_TRANSIENT_DELETE,
            Unit::Count,
            "Total number of transient deletions issued by invalidation."
        );
        describe_gauge!(
            metric_names::METRIC_EVENT_QUEUE_LEN,
            Unit::Count,
            "Current number of pending invalidation events in the queue."
        );
        describe_histogram!(
            metric_names::METRIC_CONSUME_MS,
            Unit::Milliseconds,
            "Invalidation batch consumption latency in milliseconds."
        );
        describe_histogram!(
            METRIC_FILTER_QUERY_MS,
            Unit::Milliseconds,
            "In-stock variation query latency in milliseconds."
        );
    });
}
