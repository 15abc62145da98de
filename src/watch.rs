// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The KV watcher.
//!
//! A single long-lived task watches the global prefix from the revision
//! right after initial population. Each event is routed to the zone that
//! owns its key: the zone subtree is prefix-fetched pinned at the event's
//! revision and reloaded, then swapped into the live tree under the
//! attachment point's writer lock. An SOA delete demotes the affected
//! subtree into the parent zone, so the reload targets the parent's apex.
//!
//! The watcher is the tree's only writer after initial population; events
//! apply in KV commit order.

use crate::config::Config;
use crate::key::{EntryKey, EntryKind};
use crate::kv::{EventType, KvClient, WatchEvent};
use crate::metrics;
use crate::name::{Label, NamePath};
use crate::reload::{self, RawEntry};
use crate::tree::{PathChain, ScopeFrame, Tree};
use crate::version::reader_version;
use futures::StreamExt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Run the watch loop until shutdown.
///
/// `start_rev` is the first revision to watch (initial population revision
/// plus one). On stream errors or cancellation the watch re-establishes
/// after [`crate::constants::WATCH_RETRY_INTERVAL`], resuming from the
/// watermark.
pub async fn run(
    kv: Arc<dyn KvClient>,
    tree: Arc<Tree>,
    config: Config,
    start_rev: i64,
    current_revision: Arc<AtomicI64>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut from_rev = start_rev;
    info!(target: "kv", prefix = %config.prefix, from_rev, "starting KV watch");

    loop {
        if *shutdown.borrow() {
            break;
        }
        let stream = tokio::select! {
            _ = shutdown.changed() => break,
            result = kv.watch(&config.prefix, from_rev) => match result {
                Ok(stream) => stream,
                Err(e) => {
                    error!(target: "kv", error = %e, "watch failed, retrying");
                    if !sleep_or_shutdown(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            },
        };
        tokio::pin!(stream);

        loop {
            let batch = tokio::select! {
                _ = shutdown.changed() => return,
                batch = stream.next() => batch,
            };
            let batch = match batch {
                None => {
                    warn!(target: "kv", "watch channel closed, retrying");
                    break;
                }
                Some(Err(e)) => {
                    error!(target: "kv", error = %e, "watch stream error, retrying");
                    break;
                }
                Some(Ok(batch)) => batch,
            };

            if batch.canceled {
                warn!(
                    target: "kv",
                    compact_rev = batch.compact_rev,
                    "watch canceled by the store, re-establishing"
                );
                if batch.compact_rev > 0 {
                    from_rev = batch.compact_rev;
                }
                break;
            }

            for event in &batch.events {
                apply_event(kv.as_ref(), &tree, &config, event).await;
            }
            if batch.header_rev > 0 {
                current_revision.store(batch.header_rev, Ordering::SeqCst);
                metrics::CURRENT_REVISION.set(batch.header_rev);
                from_rev = batch.header_rev + 1;
            }
        }

        if !sleep_or_shutdown(&mut shutdown).await {
            break;
        }
    }
    info!(target: "kv", "KV watch stopped");
}

/// Sleep the retry interval; false when shutdown arrived instead.
async fn sleep_or_shutdown(shutdown: &mut tokio::sync::watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown.changed() => false,
        () = tokio::time::sleep(crate::constants::WATCH_RETRY_INTERVAL) => true,
    }
}

/// Route one event: locate the owning zone, fetch it pinned at the event
/// revision, reload and swap. A fetch failure abandons this reload; the
/// next event (or watch retry) catches the tree up.
async fn apply_event(kv: &dyn KvClient, tree: &Tree, config: &Config, event: &WatchEvent) {
    let Some(relative) = event.item.key.strip_prefix(&config.prefix) else {
        return;
    };
    metrics::WATCH_EVENTS_TOTAL
        .with_label_values(&[match event.event_type {
            EventType::Put => "put",
            EventType::Delete => "delete",
        }])
        .inc();

    let entry = match EntryKey::parse(relative) {
        Ok(entry) => entry,
        Err(e) => {
            debug!(target: "kv", key = %event.item.key, error = %e, "ignoring unparseable event");
            return;
        }
    };
    if let Some(version) = &entry.version {
        if !reader_version().is_compatible_with(version) {
            trace!(target: "kv", key = %event.item.key, "ignoring incompatible version");
            return;
        }
    }

    // deleting a zone's SOA demotes its subtree into the parent zone
    let soa_delete = event.event_type == EventType::Delete
        && entry.kind == EntryKind::Normal
        && entry.qtype == "SOA";
    let chain = tree.chain_for(&entry.name, soa_delete);

    let apex_depth = chain.apex.unwrap_or(0);
    let (target_path, scope) = reload_target(&chain, apex_depth);

    let fetch_prefix = if target_path.is_empty() {
        config.prefix.clone()
    } else {
        format!("{}{}", config.prefix, target_path.as_key(true))
    };
    let response = match kv.get(&fetch_prefix, true, Some(event.item.mod_rev)).await {
        Ok(response) => response,
        Err(e) => {
            error!(target: "kv", prefix = %fetch_prefix, error = %e, "zone fetch failed, abandoning reload");
            metrics::RELOADS_TOTAL
                .with_label_values(&[reload_scope(apex_depth), "error"])
                .inc();
            return;
        }
    };

    let items: Vec<RawEntry> = response
        .items
        .into_iter()
        .filter_map(|item| {
            item.key.strip_prefix(&config.prefix).map(|key| RawEntry {
                key: key.to_string(),
                value: item.value,
                revision: item.mod_rev,
            })
        })
        .collect();

    let (new_subtree, stats) = reload::rebuild(&target_path, &scope, items, tree.serials());
    debug!(
        target: "data",
        zone = %target_path,
        rev = event.item.mod_rev,
        loaded = stats.loaded,
        records = stats.records,
        "zone reloaded"
    );
    metrics::record_reload(reload_scope(apex_depth), &stats);

    if apex_depth == 0 {
        tree.swap_root(new_subtree);
    } else {
        let parent = &chain.nodes[apex_depth - 1];
        let label = new_subtree.label().to_string();
        let mut parent_data = parent.write();
        if new_subtree.read().is_vacant() {
            parent_data.children.remove(&label);
        } else {
            parent_data.children.insert(label, new_subtree);
        }
    }
}

/// The reload root's path (spelled with the separators its nodes were
/// created with) and the ancestor scope above it.
fn reload_target(chain: &PathChain, apex_depth: usize) -> (NamePath, Vec<ScopeFrame>) {
    let mut labels = Vec::with_capacity(apex_depth);
    for node in chain.nodes.iter().take(apex_depth + 1).skip(1) {
        labels.push(Label::new(node.label().to_string(), node.sep()));
    }
    let target_path = NamePath::from_labels(labels);

    let scope = (0..apex_depth)
        .map(|depth| ScopeFrame::capture(&target_path.prefix(depth), &chain.nodes[depth]))
        .collect();
    (target_path, scope)
}

fn reload_scope(apex_depth: usize) -> &'static str {
    if apex_depth == 0 {
        "full"
    } else {
        "zone"
    }
}

/// Initial population: fetch everything under the prefix and swap in a
/// fresh root. Returns the store revision the watch should start after.
///
/// # Errors
///
/// [`crate::errors::StoreError`] when the initial get fails.
pub async fn initial_load(
    kv: &dyn KvClient,
    tree: &Tree,
    config: &Config,
) -> Result<i64, crate::errors::StoreError> {
    let response = kv.get(&config.prefix, true, None).await?;
    let items: Vec<RawEntry> = response
        .items
        .into_iter()
        .filter_map(|item| {
            item.key.strip_prefix(&config.prefix).map(|key| RawEntry {
                key: key.to_string(),
                value: item.value,
                revision: item.mod_rev,
            })
        })
        .collect();

    let count = items.len();
    let (root, stats) = reload::rebuild(&NamePath::root(), &[], items, tree.serials());
    tree.swap_root(root);
    metrics::record_reload("full", &stats);
    info!(
        target: "data",
        entries = count,
        loaded = stats.loaded,
        records = stats.records,
        revision = response.revision,
        "initial population complete"
    );
    Ok(response.revision)
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
