// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! etcd v3 adapter for the KV interface.
//!
//! A thin translation layer: etcd response types in, [`super`] types out.
//! Every unary call carries the configured per-call timeout; the watch
//! stream itself is unbounded (the watcher loop applies its own retry
//! policy on stream errors).

use super::{EventType, GetResponse, KvClient, KvItem, WatchBatch, WatchEvent, WatchStream};
use crate::errors::StoreError;
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, GetOptions, WatchOptions};
use futures::StreamExt;
use std::time::Duration;

/// KV client backed by an etcd cluster.
pub struct EtcdKv {
    client: Client,
    timeout: Duration,
}

impl EtcdKv {
    /// Connect to the cluster.
    ///
    /// # Errors
    ///
    /// [`StoreError::ConnectFailed`] when no endpoint is reachable.
    pub async fn connect(endpoints: &[String], timeout: Duration) -> Result<Self, StoreError> {
        let options = ConnectOptions::new()
            .with_timeout(timeout)
            .with_connect_timeout(timeout);
        let client = Client::connect(endpoints, Some(options))
            .await
            .map_err(|e| StoreError::ConnectFailed {
                endpoints: endpoints.join("|"),
                reason: e.to_string(),
            })?;
        Ok(Self { client, timeout })
    }

    async fn deadline<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, etcd_client::Error>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(StoreError::GetFailed {
                key: operation.to_string(),
                reason: e.to_string(),
            }),
            Ok(Ok(value)) => Ok(value),
        }
    }
}

#[async_trait]
impl KvClient for EtcdKv {
    async fn get(
        &self,
        key: &str,
        multi: bool,
        rev: Option<i64>,
    ) -> Result<GetResponse, StoreError> {
        let mut options = GetOptions::new();
        if multi {
            options = options.with_prefix();
        }
        if let Some(rev) = rev {
            options = options.with_revision(rev);
        }
        let mut client = self.client.clone();
        let resp = self
            .deadline("get", client.get(key, Some(options)))
            .await
            .map_err(|e| match e {
                StoreError::GetFailed { reason, .. } => StoreError::GetFailed {
                    key: key.to_string(),
                    reason,
                },
                other => other,
            })?;

        Ok(GetResponse {
            revision: resp.header().map_or(0, |h| h.revision()),
            items: resp
                .kvs()
                .iter()
                .map(|kv| KvItem {
                    key: String::from_utf8_lossy(kv.key()).into_owned(),
                    value: kv.value().to_vec(),
                    create_rev: kv.create_revision(),
                    mod_rev: kv.mod_revision(),
                })
                .collect(),
        })
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<i64, StoreError> {
        let mut client = self.client.clone();
        let resp = self
            .deadline("put", client.put(key, value, None))
            .await
            .map_err(|e| match e {
                StoreError::GetFailed { reason, .. } => StoreError::PutFailed {
                    key: key.to_string(),
                    reason,
                },
                other => other,
            })?;
        Ok(resp.header().map_or(0, |h| h.revision()))
    }

    async fn watch(&self, prefix: &str, start_rev: i64) -> Result<WatchStream, StoreError> {
        let options = WatchOptions::new()
            .with_prefix()
            .with_start_revision(start_rev);
        let mut client = self.client.clone();
        let prefix_owned = prefix.to_string();
        let (watcher, stream) = client
            .watch(prefix, Some(options))
            .await
            .map_err(|e| StoreError::WatchFailed {
                prefix: prefix.to_string(),
                reason: e.to_string(),
            })?;

        // the control handle must outlive the stream or the server cancels
        // the watch; move it into the adapter closure
        let stream = stream
            .map(move |result| {
                let _keepalive = &watcher;
                match result {
                    Ok(resp) => Ok(WatchBatch {
                        header_rev: resp.header().map_or(0, |h| h.revision()),
                        canceled: resp.canceled(),
                        compact_rev: resp.compact_revision(),
                        events: resp
                            .events()
                            .iter()
                            .filter_map(|event| {
                                let kv = event.kv()?;
                                Some(WatchEvent {
                                    event_type: match event.event_type() {
                                        etcd_client::EventType::Put => EventType::Put,
                                        etcd_client::EventType::Delete => EventType::Delete,
                                    },
                                    item: KvItem {
                                        key: String::from_utf8_lossy(kv.key()).into_owned(),
                                        value: kv.value().to_vec(),
                                        create_rev: kv.create_revision(),
                                        mod_rev: kv.mod_revision(),
                                    },
                                })
                            })
                            .collect(),
                    }),
                    Err(e) => Err(StoreError::WatchFailed {
                        prefix: prefix_owned.clone(),
                        reason: e.to_string(),
                    }),
                }
            })
            .boxed();
        Ok(stream)
    }
}
