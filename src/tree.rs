// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The in-memory zone tree.
//!
//! One [`Node`] per domain label plus a root. Children are exclusively
//! owned by their parent; every node guards its data with its own
//! reader/writer lock. Traversal locks hand-over-hand: a child is entered
//! only while the parent's reader guard is still held, and guards release
//! in inverse acquisition order (recursion unwinding does both naturally).
//!
//! Mutation happens at subtree granularity: the reload engine builds a
//! replacement subtree detached, then the caller swaps it in under the
//! attachment point's writer lock ([`Tree::swap_root`] for full rebuilds,
//! a child-slot write for zone reloads). Readers therefore observe either
//! the previous subtree or the new one, never a partial reload.

use crate::content::ContentValue;
use crate::name::{NamePath, Separator};
use crate::version::EntryVersion;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Stored (unrendered) entry content for one (QTYPE, id).
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Parsed content
    pub content: ContentValue,
    /// The source key, for diagnostics
    pub key: String,
    /// Version tag from the key, if any
    pub version: Option<EntryVersion>,
}

/// A rendered resource record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Rendered content; MX/SRV contain the priority placeholder
    pub content: String,
    /// Priority for placeholder substitution
    pub priority: Option<u16>,
    /// TTL in seconds
    pub ttl: u64,
    /// Version tag of the winning entry
    pub version: Option<EntryVersion>,
}

/// QTYPE → id → stored entry. QTYPE `""` is the catch-all used by
/// defaults/options entries without a type segment.
pub type AreaMap = HashMap<String, BTreeMap<String, StoredEntry>>;

/// QTYPE → id → rendered record.
pub type RecordsMap = HashMap<String, BTreeMap<String, Record>>;

/// Data guarded by a node's lock.
#[derive(Debug, Default)]
pub struct NodeData {
    /// Raw record values stored at this node
    pub values: AreaMap,
    /// Inheritable defaults stored at this node
    pub defaults: AreaMap,
    /// Rendering options stored at this node
    pub options: AreaMap,
    /// Rendered records, a pure function of `values` plus inherited
    /// defaults/options
    pub records: RecordsMap,
    /// Children, keyed by label text
    pub children: HashMap<String, Arc<Node>>,
    /// Greatest KV revision observed for entries stored at this node
    pub max_rev: i64,
    /// Derived SOA serial; present exactly on zone apices
    pub apex_serial: Option<i64>,
}

impl NodeData {
    /// A zone apex carries a rendered SOA record with the empty id.
    #[must_use]
    pub fn is_zone_apex(&self) -> bool {
        self.records
            .get("SOA")
            .is_some_and(|ids| ids.contains_key(""))
    }

    /// Whether this node still holds anything worth keeping.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.values.is_empty()
            && self.defaults.is_empty()
            && self.options.is_empty()
            && self.records.is_empty()
            && self.children.is_empty()
    }
}

/// One label in the tree.
#[derive(Debug)]
pub struct Node {
    /// Label text, as stored
    label: String,
    /// Separator this label was recorded with in keys
    sep: Separator,
    data: RwLock<NodeData>,
}

impl Node {
    /// Create an empty node.
    #[must_use]
    pub fn new(label: impl Into<String>, sep: Separator) -> Self {
        Self {
            label: label.into(),
            sep,
            data: RwLock::new(NodeData::default()),
        }
    }

    /// The root node (empty label).
    #[must_use]
    pub fn new_root() -> Self {
        Self::new("", Separator::None)
    }

    /// Label text.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Recorded key separator.
    #[must_use]
    pub fn sep(&self) -> Separator {
        self.sep
    }

    /// Acquire the reader lock. Poison is impossible to act on here, so a
    /// poisoned lock yields its data anyway.
    pub fn read(&self) -> RwLockReadGuard<'_, NodeData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the writer lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, NodeData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A snapshot of one ancestor taken before a subtree reload.
///
/// Rendering inside the rebuilt subtree consults these frames for inherited
/// defaults, non-inheriting options and the zone-revision contribution of
/// the ancestors, without touching their locks again.
#[derive(Debug, Clone, Default)]
pub struct ScopeFrame {
    /// Presentation-form QNAME of the ancestor (dot-terminated)
    pub qname: String,
    /// Clone of the ancestor's defaults
    pub defaults: AreaMap,
    /// Clone of the ancestor's options
    pub options: AreaMap,
    /// The ancestor's `max_rev`
    pub max_rev: i64,
    /// Whether the ancestor is a zone apex
    pub is_apex: bool,
}

impl ScopeFrame {
    /// Snapshot `node` (whose name is `path`) under its reader lock.
    #[must_use]
    pub fn capture(path: &NamePath, node: &Node) -> Self {
        let data = node.read();
        Self {
            qname: path.normal(),
            defaults: data.defaults.clone(),
            options: data.options.clone(),
            max_rev: data.max_rev,
            is_apex: data.is_zone_apex(),
        }
    }
}

/// The chain of existing nodes along a path, used by the watcher to locate
/// the zone that owns an event.
pub struct PathChain {
    /// Nodes from the root downward; `nodes[0]` is the root. The chain may
    /// be shorter than the requested path when nodes do not exist yet.
    pub nodes: Vec<Arc<Node>>,
    /// Index into `nodes` of the deepest zone apex, if any
    pub apex: Option<usize>,
}

/// The zone tree. The root slot has its own lock so that a full rebuild can
/// swap in a fresh root atomically.
pub struct Tree {
    root: RwLock<Arc<Node>>,
    serials: SerialLedger,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Arc::new(Node::new_root())),
            serials: SerialLedger::default(),
        }
    }

    /// The current root.
    #[must_use]
    pub fn root(&self) -> Arc<Node> {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the root atomically (initial population, full reloads).
    pub fn swap_root(&self, new_root: Arc<Node>) {
        *self.root.write().unwrap_or_else(PoisonError::into_inner) = new_root;
    }

    /// The per-apex monotonic serial ledger.
    #[must_use]
    pub fn serials(&self) -> &SerialLedger {
        &self.serials
    }

    /// Walk the existing nodes along `path` under hand-over-hand reader
    /// locks, recording the deepest zone apex seen.
    ///
    /// `skip_apex_at_target`: treat the final node as a non-apex even if it
    /// has an SOA record. Used when an SOA delete demotes the node's
    /// subtree into the parent zone.
    #[must_use]
    pub fn chain_for(&self, path: &NamePath, skip_apex_at_target: bool) -> PathChain {
        fn walk(
            node: &Arc<Node>,
            path: &NamePath,
            depth: usize,
            skip_apex_at_target: bool,
            nodes: &mut Vec<Arc<Node>>,
            apex: &mut Option<usize>,
        ) {
            let data = node.read();
            let demoted = skip_apex_at_target && depth == path.len();
            if data.is_zone_apex() && !demoted {
                *apex = Some(depth);
            }
            if depth == path.len() {
                return;
            }
            if let Some(child) = data.children.get(&path.labels()[depth].text) {
                let child = child.clone();
                nodes.push(child.clone());
                // parent guard stays held while the child is entered
                walk(&child, path, depth + 1, skip_apex_at_target, nodes, apex);
            }
        }

        let root = self.root();
        let mut nodes: Vec<Arc<Node>> = vec![root.clone()];
        let mut apex: Option<usize> = None;
        walk(&root, path, 0, skip_apex_at_target, &mut nodes, &mut apex);
        PathChain { nodes, apex }
    }
}

/// Monotonic SOA serial ledger, keyed by apex QNAME.
///
/// A delete event can shrink the derived zone revision below a serial the
/// frontend already saw; the ledger clamps rendered serials so they never
/// move backwards within one process lifetime.
#[derive(Debug, Default)]
pub struct SerialLedger {
    floors: Mutex<HashMap<String, i64>>,
}

impl SerialLedger {
    /// Clamp `derived` to be no less than the last serial reported for
    /// `apex_qname`, remembering the result.
    #[must_use]
    pub fn monotonic(&self, apex_qname: &str, derived: i64) -> i64 {
        let mut floors = self
            .floors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let floor = floors.entry(apex_qname.to_string()).or_insert(0);
        *floor = (*floor).max(derived);
        *floor
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;
