// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory KV store with revision history.
//!
//! Backs the unit tests and end-to-end scenarios. The store keeps its full
//! write log so that prefix gets can be pinned to any past revision, the
//! same way the zone reload path reads the real store. Watches are fanned
//! out per registered watcher; events missed between `start_rev` and
//! registration are replayed synthetically first.

use super::{EventType, GetResponse, KvClient, KvItem, WatchBatch, WatchEvent, WatchStream};
use crate::errors::StoreError;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
struct LogEntry {
    rev: i64,
    key: String,
    /// `None` marks a delete
    value: Option<Vec<u8>>,
}

#[derive(Default)]
struct Shared {
    revision: i64,
    log: Vec<LogEntry>,
    watchers: Vec<Watcher>,
}

struct Watcher {
    prefix: String,
    sender: mpsc::UnboundedSender<Result<WatchBatch, StoreError>>,
}

/// The in-memory store.
#[derive(Default)]
pub struct MemoryKv {
    shared: Mutex<Shared>,
}

impl MemoryKv {
    /// An empty store at revision 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a key, producing a delete watch event. Harness-only, like
    /// `put`; the backend itself never writes.
    pub fn delete(&self, key: &str) -> i64 {
        self.apply(key, None)
    }

    /// The store's current revision.
    #[must_use]
    pub fn revision(&self) -> i64 {
        self.lock().revision
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, key: &str, value: Option<Vec<u8>>) -> i64 {
        let mut shared = self.lock();
        shared.revision += 1;
        let rev = shared.revision;
        shared.log.push(LogEntry {
            rev,
            key: key.to_string(),
            value: value.clone(),
        });

        let create_rev = create_rev_of(&shared.log, key, rev);
        let event = WatchEvent {
            event_type: if value.is_some() {
                EventType::Put
            } else {
                EventType::Delete
            },
            item: KvItem {
                key: key.to_string(),
                value: value.unwrap_or_default(),
                create_rev,
                mod_rev: rev,
            },
        };

        shared.watchers.retain(|watcher| {
            if !key.starts_with(&watcher.prefix) {
                return !watcher.sender.is_closed();
            }
            watcher
                .sender
                .unbounded_send(Ok(WatchBatch::events_only(rev, vec![event.clone()])))
                .is_ok()
        });
        rev
    }

    /// Materialize the store contents as of `rev`.
    fn state_at(log: &[LogEntry], rev: i64) -> BTreeMap<String, KvItem> {
        let mut state: BTreeMap<String, KvItem> = BTreeMap::new();
        for entry in log.iter().take_while(|e| e.rev <= rev) {
            match &entry.value {
                Some(value) => {
                    let create_rev = state
                        .get(&entry.key)
                        .map_or(entry.rev, |existing| existing.create_rev);
                    state.insert(
                        entry.key.clone(),
                        KvItem {
                            key: entry.key.clone(),
                            value: value.clone(),
                            create_rev,
                            mod_rev: entry.rev,
                        },
                    );
                }
                None => {
                    state.remove(&entry.key);
                }
            }
        }
        state
    }
}

/// Creation revision of `key` as of `rev`: the revision of the first put
/// since the key last did not exist.
fn create_rev_of(log: &[LogEntry], key: &str, rev: i64) -> i64 {
    let mut create = 0;
    for entry in log.iter().take_while(|e| e.rev <= rev) {
        if entry.key != key {
            continue;
        }
        match entry.value {
            Some(_) if create == 0 => create = entry.rev,
            Some(_) => {}
            None => create = 0,
        }
    }
    create
}

#[async_trait]
impl KvClient for MemoryKv {
    async fn get(
        &self,
        key: &str,
        multi: bool,
        rev: Option<i64>,
    ) -> Result<GetResponse, StoreError> {
        let shared = self.lock();
        let pinned = rev.unwrap_or(shared.revision);
        let state = Self::state_at(&shared.log, pinned);
        let items = if multi {
            state
                .range(key.to_string()..)
                .take_while(|(k, _)| k.starts_with(key))
                .map(|(_, item)| item.clone())
                .collect()
        } else {
            state.get(key).cloned().into_iter().collect()
        };
        Ok(GetResponse {
            revision: shared.revision,
            items,
        })
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<i64, StoreError> {
        Ok(self.apply(key, Some(value.to_vec())))
    }

    async fn watch(&self, prefix: &str, start_rev: i64) -> Result<WatchStream, StoreError> {
        let (sender, receiver) = mpsc::unbounded();
        let mut shared = self.lock();

        // replay writes the caller missed before registering
        for entry in shared.log.iter().filter(|e| e.rev >= start_rev) {
            if !entry.key.starts_with(prefix) {
                continue;
            }
            let event = WatchEvent {
                event_type: if entry.value.is_some() {
                    EventType::Put
                } else {
                    EventType::Delete
                },
                item: KvItem {
                    key: entry.key.clone(),
                    value: entry.value.clone().unwrap_or_default(),
                    create_rev: create_rev_of(&shared.log, &entry.key, entry.rev),
                    mod_rev: entry.rev,
                },
            };
            let _ = sender.unbounded_send(Ok(WatchBatch::events_only(entry.rev, vec![event])));
        }

        shared.watchers.push(Watcher {
            prefix: prefix.to_string(),
            sender,
        });
        Ok(receiver.boxed())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
