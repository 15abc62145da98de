// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the kvdns backend.
//!
//! All metrics live in one registry under the `kvdns_` namespace and are
//! served at `/metrics` when the HTTP listener is active.

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;

/// Namespace prefix for all kvdns metrics
const METRICS_NAMESPACE: &str = "kvdns";

/// Global Prometheus metrics registry.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total lookups by outcome (`hit`, `miss`).
pub static LOOKUPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_lookups_total"),
        "Total lookup requests by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Lookup latency in seconds.
pub static LOOKUP_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_lookup_duration_seconds"),
        "Lookup latency in seconds",
    )
    .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]);
    let histogram = HistogramVec::new(opts, &["qtype"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total subtree reloads by scope (`full`, `zone`) and status.
pub static RELOADS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reloads_total"),
        "Total subtree reloads by scope and status",
    );
    let counter = CounterVec::new(opts, &["scope", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Entries dropped during reload by reason (`parse`, `version`,
/// `duplicate`, `render`).
pub static RELOAD_ENTRIES_DROPPED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reload_entries_dropped_total"),
        "Entries dropped during reload by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Watch events processed by type (`put`, `delete`).
pub static WATCH_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_watch_events_total"),
        "Watch events processed by type",
    );
    let counter = CounterVec::new(opts, &["type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// The KV revision watermark of the last processed watch batch.
pub static CURRENT_REVISION: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new(
        format!("{METRICS_NAMESPACE}_current_revision"),
        "KV revision of the last processed watch batch",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Record one reload's drop counters.
pub fn record_reload(scope: &str, stats: &crate::reload::ReloadStats) {
    RELOADS_TOTAL.with_label_values(&[scope, "success"]).inc();
    let drops = [
        ("parse", stats.parse_errors),
        ("version", stats.skipped_version),
        ("duplicate", stats.duplicate_drops),
        ("render", stats.render_errors),
    ];
    for (reason, count) in drops {
        if count > 0 {
            RELOAD_ENTRIES_DROPPED_TOTAL
                .with_label_values(&[reason])
                .inc_by(count as f64);
        }
    }
}

/// Gather all metrics in the Prometheus text exposition format.
///
/// # Errors
///
/// Returns an error when encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
