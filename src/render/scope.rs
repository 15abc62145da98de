// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Defaults and options resolution.
//!
//! A [`Resolver`] is built per rendered node from that node's own data plus
//! snapshots of its ancestors, deepest level first. Field search at each
//! level tries `(QTYPE, id)`, `("", id)`, `(QTYPE, "")`, `("", "")` in that
//! order, skipping combinations whose components are empty duplicates, and
//! stops at the first area object that contains the field.
//!
//! Defaults inherit: the search ascends all levels. Options may be pinned
//! to a single level (`zone-append-domain` must not inherit past the node
//! that declares it).

use crate::tree::AreaMap;
use serde_json::Value;

/// One level of the resolver stack: a node's own maps or an ancestor
/// snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Level<'a> {
    /// Presentation-form QNAME of this level, dot-terminated
    pub qname: &'a str,
    /// Defaults stored at this level
    pub defaults: &'a AreaMap,
    /// Options stored at this level
    pub options: &'a AreaMap,
    /// Whether this level is a zone apex
    pub is_apex: bool,
}

/// Which auxiliary area a search reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Inheritable field defaults
    Defaults,
    /// Rendering options
    Options,
}

/// The resolver stack for one rendered record.
///
/// `levels[0]` is the record's node; higher indices ascend to the root.
#[derive(Debug, Default)]
pub struct Resolver<'a> {
    levels: Vec<Level<'a>>,
}

impl<'a> Resolver<'a> {
    /// Build from pre-assembled levels, deepest first.
    #[must_use]
    pub fn new(levels: Vec<Level<'a>>) -> Self {
        Self { levels }
    }

    /// The stack, deepest first.
    #[must_use]
    pub fn levels(&self) -> &[Level<'a>] {
        &self.levels
    }

    /// Search `area` for `field`, ascending from the record's node to the
    /// root.
    #[must_use]
    pub fn find(&self, area: Area, qtype: &str, id: &str, field: &str) -> Option<&'a Value> {
        self.levels
            .iter()
            .find_map(|level| find_at_level(level, area, qtype, id, field))
    }

    /// Search `area` for `field` at exactly one level (non-inheriting
    /// options).
    #[must_use]
    pub fn find_at(
        &self,
        level: usize,
        area: Area,
        qtype: &str,
        id: &str,
        field: &str,
    ) -> Option<&'a Value> {
        self.levels
            .get(level)
            .and_then(|l| find_at_level(l, area, qtype, id, field))
    }

    /// The deepest enclosing zone apex QNAME visible from this record, if
    /// any. When `include_self`, the record's own level counts (used while
    /// rendering the SOA itself, before its record exists).
    #[must_use]
    pub fn apex_qname(&self, include_self: bool) -> Option<&'a str> {
        self.levels
            .iter()
            .enumerate()
            .find(|(i, level)| level.is_apex && (include_self || *i > 0))
            .map(|(_, level)| level.qname)
    }
}

/// The 4-axis search at one level.
fn find_at_level<'a>(
    level: &Level<'a>,
    area: Area,
    qtype: &str,
    id: &str,
    field: &str,
) -> Option<&'a Value> {
    let map = match area {
        Area::Defaults => level.defaults,
        Area::Options => level.options,
    };
    let mut seen: [Option<(&str, &str)>; 4] = [None; 4];
    let axes = [(qtype, id), ("", id), (qtype, ""), ("", "")];
    for (slot, (q, i)) in axes.into_iter().enumerate() {
        // skip combinations that collapse onto an earlier one
        if seen[..slot].iter().flatten().any(|prev| *prev == (q, i)) {
            continue;
        }
        seen[slot] = Some((q, i));
        if let Some(value) = map
            .get(q)
            .and_then(|ids| ids.get(i))
            .and_then(|entry| entry.content.as_object())
            .and_then(|object| object.get(field))
        {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod scope_tests;
