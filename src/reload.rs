// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Subtree reload: raw KV items in, a rendered subtree out.
//!
//! A reload rebuilds one subtree (a zone, or the whole tree) from a batch
//! of raw items fetched at a single revision. The build runs on a detached
//! node graph, so no tree lock is held while parsing or rendering; the
//! caller swaps the finished subtree in afterwards.
//!
//! Per-entry failures (unparseable key or content, version collisions,
//! render errors) are logged and skipped; one bad record never poisons the
//! rest of the zone.

use crate::content::ContentValue;
use crate::key::{EntryKey, EntryKind};
use crate::name::{NamePath, Separator};
use crate::render::scope::{Level, Resolver};
use crate::render::{render_record, RenderRequest};
use crate::tree::{Node, NodeData, ScopeFrame, SerialLedger};
use crate::version::{precedence, reader_version, Precedence};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One raw KV item, global prefix already stripped.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Key relative to the global prefix
    pub key: String,
    /// Raw value bytes
    pub value: Vec<u8>,
    /// The item's modification revision
    pub revision: i64,
}

/// Counters from one reload, for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    /// Entries stored into the tree
    pub loaded: usize,
    /// Entries skipped by the version gate
    pub skipped_version: usize,
    /// Entries dropped for key/content parse errors
    pub parse_errors: usize,
    /// Later arrivals of duplicate unversioned entries
    pub duplicate_drops: usize,
    /// Stored values whose rendering failed
    pub render_errors: usize,
    /// Records rendered
    pub records: usize,
}

/// Rebuild the subtree rooted at `path` from `items`.
///
/// `scope` carries snapshots of the ancestors above `path`, root-first
/// (empty for a full-tree rebuild). Items whose parsed name falls outside
/// `path` are ignored. Returns the detached subtree root, ready to be
/// swapped into the live tree.
#[must_use]
pub fn rebuild(
    path: &NamePath,
    scope: &[ScopeFrame],
    items: Vec<RawEntry>,
    serials: &SerialLedger,
) -> (Arc<Node>, ReloadStats) {
    let (label, sep) = path
        .labels()
        .last()
        .map_or((String::new(), Separator::None), |l| {
            (l.text.clone(), l.sep)
        });
    let root = Arc::new(Node::new(label, sep));
    let reader = reader_version();
    let mut stats = ReloadStats::default();

    for item in items {
        let entry = match EntryKey::parse(&item.key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "data", key = %item.key, error = %e, "skipping unparseable entry");
                stats.parse_errors += 1;
                continue;
            }
        };
        if let Some(version) = &entry.version {
            if !reader.is_compatible_with(version) {
                trace!(target: "data", key = %item.key, version = %version, "skipping incompatible version");
                stats.skipped_version += 1;
                continue;
            }
        }
        if !entry.name.is_descendant_of(path) {
            debug!(target: "data", key = %item.key, subtree = %path, "entry outside reloaded subtree");
            continue;
        }

        let node = node_for(&root, &entry.name, path.len());
        insert_entry(&node, &entry, &item, &mut stats);
    }

    let mut frames: Vec<ScopeFrame> = scope.to_vec();
    process_node(&root, path.normal(), &mut frames, serials, &mut stats);

    (root, stats)
}

/// Descend from the subtree root along the labels below `depth`, creating
/// nodes as needed.
fn node_for(root: &Arc<Node>, name: &NamePath, depth: usize) -> Arc<Node> {
    let mut current = root.clone();
    for label in name.from_depth(depth) {
        let next = {
            let mut data = current.write();
            data.children
                .entry(label.text.clone())
                .or_insert_with(|| Arc::new(Node::new(label.text.clone(), label.sep)))
                .clone()
        };
        current = next;
    }
    current
}

/// Store one parsed entry at its node, applying version precedence.
fn insert_entry(node: &Arc<Node>, entry: &EntryKey, item: &RawEntry, stats: &mut ReloadStats) {
    let mut data = node.write();
    let area = match entry.kind {
        EntryKind::Normal => &mut data.values,
        EntryKind::Defaults => &mut data.defaults,
        EntryKind::Options => &mut data.options,
    };
    let ids = area.entry(entry.qtype.clone()).or_default();
    let id = entry.id_str().to_string();

    if let Some(existing) = ids.get(&id) {
        match precedence(existing.version.as_ref(), entry.version.as_ref()) {
            Precedence::Replace => {}
            Precedence::Keep => {
                trace!(target: "data", key = %item.key, "older version superseded by stored entry");
                return;
            }
            Precedence::DuplicateUnversioned => {
                warn!(
                    target: "data",
                    key = %item.key,
                    stored = %existing.key,
                    "duplicate unversioned entry, dropping the later one"
                );
                stats.duplicate_drops += 1;
                return;
            }
        }
    }

    let content = match ContentValue::parse(&item.key, &item.value, entry.kind) {
        Ok(content) => content,
        Err(e) => {
            warn!(target: "data", key = %item.key, error = %e, "skipping entry with bad content");
            stats.parse_errors += 1;
            return;
        }
    };

    ids.insert(
        id,
        crate::tree::StoredEntry {
            content,
            key: item.key.clone(),
            version: entry.version,
        },
    );
    data.max_rev = data.max_rev.max(item.revision);
    stats.loaded += 1;
}

/// Render all stored values of a node and recurse into its children.
///
/// SOA entries render first so later records see the zone apex; vacant
/// children are pruned on the way back up.
fn process_node(
    node: &Arc<Node>,
    qname: String,
    frames: &mut Vec<ScopeFrame>,
    serials: &SerialLedger,
    stats: &mut ReloadStats,
) {
    let mut guard = node.write();
    let data = &mut *guard;

    let is_apex = has_soa_value(data);
    let zone_serial = if is_apex {
        let ancestors = frames.iter().map(|f| f.max_rev).max().unwrap_or(0);
        let derived = ancestors.max(cut_rev(data));
        serials.monotonic(&qname, derived)
    } else {
        0
    };

    let mut rendered: Vec<(String, String, crate::tree::Record)> = Vec::new();
    {
        let mut levels = Vec::with_capacity(frames.len() + 1);
        levels.push(Level {
            qname: &qname,
            defaults: &data.defaults,
            options: &data.options,
            is_apex,
        });
        for frame in frames.iter().rev() {
            levels.push(Level {
                qname: &frame.qname,
                defaults: &frame.defaults,
                options: &frame.options,
                is_apex: frame.is_apex,
            });
        }
        let resolver = Resolver::new(levels);

        let mut entries: Vec<(&String, &String, &crate::tree::StoredEntry)> = data
            .values
            .iter()
            .flat_map(|(qtype, ids)| ids.iter().map(move |(id, entry)| (qtype, id, entry)))
            .collect();
        entries.sort_by_key(|(qtype, id, _)| (*qtype != "SOA", (*qtype).clone(), (*id).clone()));

        for (qtype, id, entry) in entries {
            let request = RenderRequest {
                qtype,
                id,
                entry,
                resolver: &resolver,
                zone_serial,
            };
            match render_record(&request) {
                Ok(record) => rendered.push((qtype.clone(), id.clone(), record)),
                Err(e) => {
                    warn!(target: "data", key = %entry.key, error = %e, "dropping record");
                    stats.render_errors += 1;
                }
            }
        }
    }

    stats.records += rendered.len();
    for (qtype, id, record) in rendered {
        data.records.entry(qtype).or_default().insert(id, record);
    }
    if data.is_zone_apex() {
        data.apex_serial = Some(zone_serial);
    }

    frames.push(ScopeFrame {
        qname: qname.clone(),
        defaults: data.defaults.clone(),
        options: data.options.clone(),
        max_rev: data.max_rev,
        is_apex,
    });

    let children: Vec<(String, Arc<Node>)> = data
        .children
        .iter()
        .map(|(label, child)| (label.clone(), child.clone()))
        .collect();
    for (label, child) in children {
        let child_qname = if qname == "." {
            format!("{label}.")
        } else {
            format!("{label}.{qname}")
        };
        process_node(&child, child_qname, frames, serials, stats);
        if child.read().is_vacant() {
            data.children.remove(&label);
        }
    }

    frames.pop();
}

/// Apex test on *stored values* (rendered records do not exist yet while
/// processing).
fn has_soa_value(data: &NodeData) -> bool {
    data.values.get("SOA").is_some_and(|ids| ids.contains_key(""))
}

/// Greatest revision within a node's zone cut: itself plus descendants,
/// stopping at nested apices.
fn cut_rev(data: &NodeData) -> i64 {
    let mut max = data.max_rev;
    for child in data.children.values() {
        let child_data = child.read();
        if has_soa_value(&child_data) {
            continue;
        }
        max = max.max(cut_rev(&child_data));
    }
    max
}

#[cfg(test)]
#[path = "reload_tests.rs"]
mod reload_tests;
