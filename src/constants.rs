// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the kvdns backend.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

use std::time::Duration;

// ============================================================================
// Data Schema Constants
// ============================================================================

/// Data schema version this backend reads.
///
/// Entries tagged with an `@<version>` key suffix are only loaded when their
/// version is compatible with this one (same development flag, same major,
/// entry minor not above ours).
pub const DATA_SCHEMA_VERSION: &str = "0.1";

/// Default global key prefix in the KV store
pub const DEFAULT_KEY_PREFIX: &str = "/DNS/";

/// Key segment marking a defaults entry
pub const DEFAULTS_SEGMENT: &str = "-defaults-";

/// Key segment marking an options entry
pub const OPTIONS_SEGMENT: &str = "-options-";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Priority placeholder embedded in rendered MX/SRV content.
///
/// The lookup engine strips it (protocol v3, priority as a separate field)
/// or substitutes the decimal priority in place (protocol v4 and later).
pub const PRIORITY_PLACEHOLDER: &str = "{priority:%d }";

/// Frontend protocol version that still expects a separate priority field
pub const PDNS_PROTOCOL_V3: u32 = 3;

/// Default frontend protocol version
pub const DEFAULT_PDNS_VERSION: u32 = 4;

// ============================================================================
// Timeout Constants
// ============================================================================

/// Per-call timeout for KV gets
pub const KV_GET_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-request timeout for lookups
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before re-establishing a failed watch channel
pub const WATCH_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path the HTTP listener serves the backend protocol on
pub const HTTP_BACKEND_PATH: &str = "/dnsapi";
