//! Prometheus metrics for the invoicing service.
//!
//! Domain metrics live in the default `prometheus` registry. HTTP request
//! metrics recorded through the `metrics` facade are rendered by the
//! installed Prometheus recorder and appended to the same scrape.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Recorder for the `metrics` facade. `None` when another recorder was
/// already installed in this process.
static METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Applied status transitions by event and status pair.
pub static STATUS_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_status_transitions_total",
        "Total number of applied invoice status transitions",
        &["event", "from", "to"]
    )
    .expect("Failed to register status_transitions_total")
});

/// Events whose precondition did not hold.
pub static IGNORED_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_ignored_transitions_total",
        "Total number of ignored invoice status events",
        &["event", "status"]
    )
    .expect("Failed to register ignored_transitions_total")
});

/// Payment counter by method.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_payments_total",
        "Total number of payments by payment method",
        &["payment_method"]
    )
    .expect("Failed to register payments_total")
});

/// Payment amount counter by currency.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_payment_amount_total",
        "Total payment amount by currency",
        &["currency"]
    )
    .expect("Failed to register payment_amount_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Install the facade recorder and force the domain metrics. Safe to call repeatedly.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| tracing::warn!(error = %e, "Prometheus recorder not installed"))
            .ok()
    });
    Lazy::force(&STATUS_TRANSITIONS_TOTAL);
    Lazy::force(&IGNORED_TRANSITIONS_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .and_then(|handle| handle.as_ref())
        .map(|handle| handle.render())
        .unwrap_or_default();

    let metric_families = prometheus::gather();
    match TextEncoder::new().encode_to_string(&metric_families) {
        Ok(domain) => output.push_str(&domain),
        Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_exported() {
        init_metrics();
        STATUS_TRANSITIONS_TOTAL
            .with_label_values(&["send", "draft", "sent"])
            .inc();

        let text = get_metrics();
        assert!(text.contains("invoicing_status_transitions_total"));
    }
}
