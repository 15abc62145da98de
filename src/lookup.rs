// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The lookup engine.
//!
//! Answers `lookup` queries by walking the tree under hand-over-hand
//! reader locks. A missing name or an empty record set yields `None`,
//! which the dispatcher turns into the distinguished `false` result so the
//! frontend emits NXDOMAIN instead of treating an empty answer as a
//! success.
//!
//! Matching is case-insensitive; the response echoes the request's
//! original case, dot-terminated.

use crate::constants::{PDNS_PROTOCOL_V3, PRIORITY_PLACEHOLDER};
use crate::name::NamePath;
use crate::tree::{Node, NodeData, Tree};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One answer row, shaped for the frontend protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupAnswer {
    /// The queried name, original case, dot-terminated
    pub qname: String,
    /// The record's QTYPE
    pub qtype: String,
    /// Rendered content, priority placeholder resolved
    pub content: String,
    /// TTL in seconds
    pub ttl: u64,
    /// Whether the name sits inside a zone this backend is authoritative
    /// for
    pub auth: bool,
    /// Priority as a separate field (protocol v3 only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

/// Answer a lookup. `None` means "no such data" (NXDOMAIN).
#[must_use]
pub fn lookup(tree: &Tree, qname: &str, qtype: &str, pdns_version: u32) -> Option<Vec<LookupAnswer>> {
    let echo_qname = dot_terminated(qname);
    let path = NamePath::from_qname(qname);
    let root = tree.root();

    let answers = descend(&root, &path, 0, false, &|data, in_zone| {
        collect_answers(data, in_zone, &echo_qname, qtype, pdns_version)
    })?;

    if answers.is_empty() {
        debug!(target: "pdns", qname = %echo_qname, qtype, "no records at existing node");
        return None;
    }
    Some(answers)
}

/// All zone apices with their derived serials, for `getAllDomains`.
#[must_use]
pub fn list_zones(tree: &Tree) -> Vec<(String, i64)> {
    fn walk(node: &Arc<Node>, qname: &str, zones: &mut Vec<(String, i64)>) {
        let data = node.read();
        if let Some(serial) = data.apex_serial {
            zones.push((qname.to_string(), serial));
        }
        for child in data.children.values() {
            let child_qname = if qname == "." {
                format!("{}.", child.label())
            } else {
                format!("{}.{qname}", child.label())
            };
            walk(child, &child_qname, zones);
        }
    }

    let root = tree.root();
    let mut zones = Vec::new();
    walk(&root, ".", &mut zones);
    zones.sort();
    zones
}

/// Hand-over-hand descent: the parent's reader guard is held until the
/// child's is taken (recursion releases them in inverse order).
fn descend<R>(
    node: &Arc<Node>,
    path: &NamePath,
    depth: usize,
    in_zone: bool,
    visit: &dyn Fn(&NodeData, bool) -> R,
) -> Option<R> {
    let data = node.read();
    let in_zone = in_zone || data.is_zone_apex();
    if depth == path.len() {
        return Some(visit(&data, in_zone));
    }
    let child = data.children.get(&path.labels()[depth].text)?.clone();
    descend(&child, path, depth + 1, in_zone, visit)
}

fn collect_answers(
    data: &NodeData,
    in_zone: bool,
    echo_qname: &str,
    qtype: &str,
    pdns_version: u32,
) -> Vec<LookupAnswer> {
    let mut answers = Vec::new();
    let selected: Vec<(&String, &std::collections::BTreeMap<String, crate::tree::Record>)> =
        if qtype == "ANY" {
            let mut all: Vec<_> = data.records.iter().collect();
            all.sort_by_key(|(q, _)| (*q).clone());
            all
        } else {
            data.records.get_key_value(qtype).into_iter().collect()
        };

    for (record_qtype, ids) in selected {
        for record in ids.values() {
            let (content, priority) = resolve_priority(record, pdns_version);
            answers.push(LookupAnswer {
                qname: echo_qname.to_string(),
                qtype: record_qtype.clone(),
                content,
                ttl: record.ttl,
                auth: in_zone,
                priority,
            });
        }
    }
    answers
}

/// Resolve the priority placeholder per protocol version: v3 strips it and
/// reports the priority separately; v4+ substitutes the decimal value in
/// place.
fn resolve_priority(record: &crate::tree::Record, pdns_version: u32) -> (String, Option<u16>) {
    match record.priority {
        None => (record.content.clone(), None),
        Some(priority) => {
            if pdns_version <= PDNS_PROTOCOL_V3 {
                (record.content.replace(PRIORITY_PLACEHOLDER, ""), Some(priority))
            } else {
                (
                    record
                        .content
                        .replace(PRIORITY_PLACEHOLDER, &format!("{priority} ")),
                    None,
                )
            }
        }
    }
}

fn dot_terminated(qname: &str) -> String {
    if qname.ends_with('.') {
        qname.to_string()
    } else {
        format!("{qname}.")
    }
}

#[cfg(test)]
#[path = "lookup_tests.rs"]
mod lookup_tests;
