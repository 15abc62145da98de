// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `tree.rs`

use crate::name::{NamePath, Separator};
use crate::tree::{Node, Record, ScopeFrame, Tree};
use std::sync::Arc;

fn record(content: &str) -> Record {
    Record {
        content: content.to_string(),
        priority: None,
        ttl: 3600,
        version: None,
    }
}

/// Attach a chain of labels under `root`, returning the deepest node.
fn graft(root: &Arc<Node>, labels: &[&str]) -> Arc<Node> {
    let mut current = root.clone();
    for label in labels {
        let next = {
            let mut data = current.write();
            data.children
                .entry((*label).to_string())
                .or_insert_with(|| Arc::new(Node::new((*label).to_string(), Separator::Dot)))
                .clone()
        };
        current = next;
    }
    current
}

fn mark_apex(node: &Arc<Node>) {
    node.write()
        .records
        .entry("SOA".to_string())
        .or_default()
        .insert(String::new(), record("soa"));
}

#[test]
fn test_zone_apex_requires_the_empty_id() {
    let node = Node::new("example", Separator::Dot);
    assert!(!node.read().is_zone_apex());
    node.write()
        .records
        .entry("SOA".to_string())
        .or_default()
        .insert("other".to_string(), record("soa"));
    assert!(!node.read().is_zone_apex());
    node.write()
        .records
        .entry("SOA".to_string())
        .or_default()
        .insert(String::new(), record("soa"));
    assert!(node.read().is_zone_apex());
}

#[test]
fn test_vacant_node() {
    let node = Node::new("empty", Separator::Slash);
    assert!(node.read().is_vacant());
    node.write().max_rev = 7;
    // revision bookkeeping alone does not keep a node alive
    assert!(node.read().is_vacant());
}

#[test]
fn test_chain_for_finds_the_deepest_apex() {
    let tree = Tree::new();
    let apex = graft(&tree.root(), &["net", "example"]);
    mark_apex(&apex);
    graft(&tree.root(), &["net", "example", "ns"]);

    let path = NamePath::from_storage_key("net.example/ns").unwrap();
    let chain = tree.chain_for(&path, false);
    assert_eq!(chain.nodes.len(), 4); // root, net, example, ns
    assert_eq!(chain.apex, Some(2));
    assert_eq!(chain.nodes[2].label(), "example");
}

#[test]
fn test_chain_for_stops_at_missing_nodes() {
    let tree = Tree::new();
    let apex = graft(&tree.root(), &["net", "example"]);
    mark_apex(&apex);

    let path = NamePath::from_storage_key("net.example/absent/deeper").unwrap();
    let chain = tree.chain_for(&path, false);
    assert_eq!(chain.nodes.len(), 3);
    assert_eq!(chain.apex, Some(2));
}

#[test]
fn test_chain_for_nested_zones_prefers_the_deeper_apex() {
    let tree = Tree::new();
    mark_apex(&graft(&tree.root(), &["net", "example"]));
    mark_apex(&graft(&tree.root(), &["net", "example", "sub"]));

    let path = NamePath::from_storage_key("net.example/sub/www").unwrap();
    let chain = tree.chain_for(&path, false);
    assert_eq!(chain.apex, Some(3));
}

#[test]
fn test_chain_for_skip_apex_at_target_demotes_to_parent_zone() {
    let tree = Tree::new();
    mark_apex(&graft(&tree.root(), &["net", "example"]));
    mark_apex(&graft(&tree.root(), &["net", "example", "sub"]));

    let path = NamePath::from_storage_key("net.example/sub").unwrap();
    // an SOA delete at `sub` must reload the parent's zone
    let chain = tree.chain_for(&path, true);
    assert_eq!(chain.apex, Some(2));
    // a plain event at `sub` stays in its own zone
    let chain = tree.chain_for(&path, false);
    assert_eq!(chain.apex, Some(3));
}

#[test]
fn test_chain_for_without_any_apex() {
    let tree = Tree::new();
    graft(&tree.root(), &["net", "example"]);
    let path = NamePath::from_storage_key("net.example").unwrap();
    let chain = tree.chain_for(&path, false);
    assert_eq!(chain.apex, None);
}

#[test]
fn test_swap_root_replaces_atomically() {
    let tree = Tree::new();
    graft(&tree.root(), &["old"]);
    assert!(tree.root().read().children.contains_key("old"));

    let fresh = Arc::new(Node::new_root());
    graft(&fresh, &["new"]);
    tree.swap_root(fresh);
    let root = tree.root();
    let data = root.read();
    assert!(data.children.contains_key("new"));
    assert!(!data.children.contains_key("old"));
}

#[test]
fn test_serial_ledger_is_monotonic_per_apex() {
    let tree = Tree::new();
    assert_eq!(tree.serials().monotonic("example.net.", 103), 103);
    assert_eq!(tree.serials().monotonic("example.net.", 110), 110);
    // a compaction-shrunk derivation never moves the serial backwards
    assert_eq!(tree.serials().monotonic("example.net.", 90), 110);
    // independent zones do not interfere
    assert_eq!(tree.serials().monotonic("example.org.", 5), 5);
}

#[test]
fn test_scope_frame_capture() {
    let tree = Tree::new();
    let apex = graft(&tree.root(), &["net", "example"]);
    mark_apex(&apex);
    apex.write().max_rev = 42;

    let path = NamePath::from_storage_key("net.example").unwrap();
    let frame = ScopeFrame::capture(&path, &apex);
    assert_eq!(frame.qname, "example.net.");
    assert_eq!(frame.max_rev, 42);
    assert!(frame.is_apex);
}
