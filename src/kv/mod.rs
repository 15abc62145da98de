// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The consumed KV store interface.
//!
//! The backend is read-only against the store: it issues prefix gets
//! (optionally pinned to a revision) and watches. `put` exists for the test
//! harness only. The production implementation is [`etcd::EtcdKv`]; tests
//! and the end-to-end scenarios run against [`memory::MemoryKv`].

pub mod etcd;
pub mod memory;

use crate::errors::StoreError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// One key-value pair with its revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvItem {
    /// Full key, including the global prefix
    pub key: String,
    /// Raw value bytes
    pub value: Vec<u8>,
    /// Revision that created the key
    pub create_rev: i64,
    /// Revision of the last modification
    pub mod_rev: i64,
}

/// Result of a get.
#[derive(Debug, Clone, Default)]
pub struct GetResponse {
    /// The store's current revision at response time
    pub revision: i64,
    /// Matching items
    pub items: Vec<KvItem>,
}

/// What happened to a watched key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Create or modify
    Put,
    /// Delete
    Delete,
}

/// One watch event.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// Put or delete
    pub event_type: EventType,
    /// The affected item; empty value on delete
    pub item: KvItem,
}

/// A batch of watch events sharing a header revision.
#[derive(Debug, Clone, Default)]
pub struct WatchBatch {
    /// Store revision of the batch header
    pub header_rev: i64,
    /// Events in commit order
    pub events: Vec<WatchEvent>,
    /// The server canceled the watch; re-establish it
    pub canceled: bool,
    /// Compaction revision when canceled due to compaction
    pub compact_rev: i64,
}

impl WatchBatch {
    fn events_only(header_rev: i64, events: Vec<WatchEvent>) -> Self {
        Self {
            header_rev,
            events,
            canceled: false,
            compact_rev: 0,
        }
    }
}

/// Stream of watch batches.
pub type WatchStream = BoxStream<'static, Result<WatchBatch, StoreError>>;

/// The KV store operations the backend consumes.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Get `key` (exact) or all keys under it (`multi`), optionally pinned
    /// to `rev`.
    async fn get(&self, key: &str, multi: bool, rev: Option<i64>)
        -> Result<GetResponse, StoreError>;

    /// Write a value. Test harness only; the backend never writes in
    /// production.
    async fn put(&self, key: &str, value: &[u8]) -> Result<i64, StoreError>;

    /// Watch all keys under `prefix`, starting at `start_rev`.
    async fn watch(&self, prefix: &str, start_rev: i64) -> Result<WatchStream, StoreError>;
}
