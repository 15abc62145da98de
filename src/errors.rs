// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the kvdns backend.
//!
//! This module provides specialized error types for:
//! - Key and content parsing of raw KV entries
//! - Typed field extraction during record rendering
//! - Record rendering (missing fields, name anchoring, durations)
//! - KV store access (gets, watches, timeouts)
//! - Frontend protocol violations
//!
//! Propagation policy: per-entry errors are local to that entry, per-zone
//! errors downgrade at most that zone, per-connection errors affect only one
//! client, and configuration errors at startup are fatal (exit code 1).

use thiserror::Error;

/// Errors raised while decomposing a KV key or its content.
///
/// A parse error skips the single offending entry with a warning; the rest
/// of the zone loads normally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The `@<version>` suffix did not parse as a data-schema version
    #[error("key '{key}': invalid version token '{token}'")]
    BadVersion {
        /// The offending key (global prefix stripped)
        key: String,
        /// The token after the last `@`
        token: String,
    },

    /// A label between separators was empty (e.g. `a//b` or `a..b`)
    #[error("key '{key}': empty label")]
    EmptyLabel {
        /// The offending key
        key: String,
    },

    /// A normal (record) entry without a QTYPE segment
    #[error("key '{key}': record entry without a record type")]
    MissingType {
        /// The offending key
        key: String,
    },

    /// SOA entries are singletons per zone and may not carry an id
    #[error("key '{key}': SOA entry with id '{id}'")]
    SoaWithId {
        /// The offending key
        key: String,
        /// The non-empty id that was rejected
        id: String,
    },

    /// Defaults/options entries must have content
    #[error("key '{key}': empty")]
    EmptyContent {
        /// The offending key
        key: String,
    },

    /// Defaults/options entries must be objects
    #[error("key '{key}': must be an object")]
    NotAnObject {
        /// The offending key
        key: String,
    },

    /// Content starting with `{` or `=` that is not valid JSON
    #[error("key '{key}': failed to parse as JSON object: {reason}")]
    BadJson {
        /// The offending key
        key: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Content starting with a `---` document marker that is not valid YAML
    #[error("key '{key}': failed to parse as YAML object: {reason}")]
    BadYaml {
        /// The offending key
        key: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Content form not recognised for this entry kind
    #[error("key '{key}': invalid")]
    InvalidContent {
        /// The offending key
        key: String,
    },
}

/// A field was present but carried the wrong JSON type.
///
/// Type errors are never coerced; the affected record is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field '{field}': expected {expected}, found {found}")]
pub struct TypeError {
    /// The field name that was searched for
    pub field: String,
    /// The expected type, e.g. "string" or "uint16"
    pub expected: &'static str,
    /// A short description of the value actually found
    pub found: String,
}

/// Errors raised while rendering a stored value into a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No value field, no default and no last-field value supplied the field
    #[error("missing field '{field}' for {qtype} record")]
    MissingField {
        /// The canonical field name
        field: String,
        /// The QTYPE being rendered
        qtype: String,
    },

    /// Field present with the wrong type
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A domain name never reached a zone apex or append option
    #[error("domain name '{name}' does not terminate in a zone")]
    UnanchoredName {
        /// The unterminated name
        name: String,
    },

    /// Durations must be at least one second
    #[error("duration field '{field}' is below 1s")]
    DurationTooShort {
        /// The field name
        field: String,
    },

    /// A malformed duration string
    #[error("field '{field}': invalid duration '{value}'")]
    BadDuration {
        /// The field name
        field: String,
        /// The rejected input
        value: String,
    },

    /// A/AAAA octet content that did not parse or assemble
    #[error("field '{field}': {reason}")]
    BadAddress {
        /// The field name
        field: String,
        /// What went wrong
        reason: String,
    },

    /// A QTYPE without a renderer
    #[error("no renderer for record type '{qtype}'")]
    UnsupportedType {
        /// The unsupported QTYPE
        qtype: String,
    },
}

/// Errors from the KV store client.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A get (point or prefix) failed
    #[error("KV get '{key}' failed: {reason}")]
    GetFailed {
        /// The key or prefix
        key: String,
        /// Transport diagnostic
        reason: String,
    },

    /// A put failed (test harness only)
    #[error("KV put '{key}' failed: {reason}")]
    PutFailed {
        /// The key
        key: String,
        /// Transport diagnostic
        reason: String,
    },

    /// Establishing or reading a watch failed
    #[error("KV watch '{prefix}' failed: {reason}")]
    WatchFailed {
        /// The watched prefix
        prefix: String,
        /// Transport diagnostic
        reason: String,
    },

    /// A KV call exceeded its deadline
    #[error("KV {operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Which call timed out
        operation: &'static str,
        /// The deadline in milliseconds
        timeout_ms: u64,
    },

    /// Initial connection to the store could not be established
    #[error("KV connect to [{endpoints}] failed: {reason}")]
    ConnectFailed {
        /// The configured endpoints, joined with '|'
        endpoints: String,
        /// Transport diagnostic
        reason: String,
    },
}

/// Frontend protocol violations; fatal for the affected connection only.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A request line that is not a JSON request envelope
    #[error("bad request framing: {reason}")]
    BadFraming {
        /// Parser diagnostic
        reason: String,
    },

    /// The first message on a connection was not `initialize`
    #[error("first method was '{method}', expected 'initialize'")]
    NotInitialized {
        /// The method actually received
        method: String,
    },

    /// Writing a response failed; the connection is torn down
    #[error("response write failed: {reason}")]
    WriteFailed {
        /// I/O diagnostic
        reason: String,
    },
}

/// Composite error type for the backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Entry parsing
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Record rendering
    #[error(transparent)]
    Render(#[from] RenderError),

    /// KV store access
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Frontend protocol
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration errors at startup; fatal (exit code 1)
    #[error("configuration: {0}")]
    Config(String),
}

impl From<TypeError> for BackendError {
    fn from(err: TypeError) -> Self {
        Self::Render(RenderError::Type(err))
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
