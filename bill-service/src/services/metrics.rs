//! Metrics for bill-service.
//!
//! HTTP request metrics flow through the `metrics` facade (see
//! `service_core::middleware::metrics`); domain counters live in the default
//! `prometheus` registry. `/metrics` renders both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Store call duration histogram
pub static STORE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "bill_store_operation_duration_seconds",
            "Store operation duration",
            vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
        ),
        &["backend", "operation"]
    )
    .expect("Failed to register STORE_OPERATION_DURATION")
});

/// Bill operations by type and outcome
pub static BILL_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Bill number allocations by outcome (sequential / fallback)
pub static BILL_NUMBER_ALLOCATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Authentication attempts
pub static AUTH_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once; later calls are no-ops.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("A global metrics recorder is already installed");
        }
        handle
    });

    BILL_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "bill_operations_total",
                "Total bill operations by operation and status"
            ),
            &["operation", "status"]
        )
        .expect("Failed to register BILL_OPERATIONS_TOTAL")
    });

    BILL_NUMBER_ALLOCATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "bill_number_allocations_total",
                "Bill numbers handed out, by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register BILL_NUMBER_ALLOCATIONS_TOTAL")
    });

    AUTH_ATTEMPTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("bill_auth_attempts_total", "Register and login attempts"),
            &["action", "status"]
        )
        .expect("Failed to register AUTH_ATTEMPTS_TOTAL")
    });

    let _ = &*STORE_OPERATION_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode prometheus metrics: {}", e);
    }
    output.push_str(&String::from_utf8_lossy(&buffer));
    output
}

/// Record a bill operation.
pub fn record_bill_operation(operation: &str, status: &str) {
    if let Some(counter) = BILL_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation, status]).inc();
    }
}

/// Record how a bill number was produced.
pub fn record_allocation(outcome: &str) {
    if let Some(counter) = BILL_NUMBER_ALLOCATIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a register or login attempt.
pub fn record_auth_attempt(action: &str, status: &str) {
    if let Some(counter) = AUTH_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[action, status]).inc();
    }
}

/// Observe the duration of a store call started at `start`.
pub fn observe_store_operation(backend: &str, operation: &str, start: Instant) {
    STORE_OPERATION_DURATION
        .with_label_values(&[backend, operation])
        .observe(start.elapsed().as_secs_f64());
}
