// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `metrics.rs`

use crate::metrics::{gather_metrics, record_reload, LOOKUPS_TOTAL};
use crate::reload::ReloadStats;

#[test]
fn test_gather_contains_registered_metrics() {
    LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
    let text = gather_metrics().unwrap();
    assert!(text.contains("kvdns_lookups_total"));
}

#[test]
fn test_record_reload_counts_drops() {
    let stats = ReloadStats {
        loaded: 5,
        skipped_version: 1,
        parse_errors: 2,
        duplicate_drops: 0,
        render_errors: 1,
        records: 4,
    };
    record_reload("zone", &stats);
    let text = gather_metrics().unwrap();
    assert!(text.contains("kvdns_reloads_total"));
    assert!(text.contains("kvdns_reload_entries_dropped_total"));
}
