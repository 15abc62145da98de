// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain name paths in storage order.
//!
//! A [`NamePath`] stores the labels of a domain name *root-first* (the TLD at
//! depth 1), the reverse of DNS presentation order. Each label remembers the
//! separator that preceded it in the KV key (`/` or `.`), so the exact
//! storage-form key can be reconstructed byte for byte.
//!
//! Two renderings exist:
//! - [`NamePath::normal`]: DNS presentation form, deepest label first,
//!   dot-terminated (`ns.example.net.`)
//! - [`NamePath::as_key`]: storage form, root-first with the recorded
//!   separators (`net.example/ns`)

use crate::errors::ParseError;
use std::fmt;

/// Separator that preceded a label in the storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// First label of a key; nothing precedes it
    None,
    /// Label started a new `/`-separated key part
    Slash,
    /// Label continued a part after a `.`
    Dot,
}

impl Separator {
    /// The separator as it appears in the key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Separator::None => "",
            Separator::Slash => "/",
            Separator::Dot => ".",
        }
    }
}

/// One label of a domain name, with its recorded key separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// The label text, exactly as stored
    pub text: String,
    /// The separator that preceded this label in the key
    pub sep: Separator,
}

impl Label {
    /// Create a label.
    #[must_use]
    pub fn new(text: impl Into<String>, sep: Separator) -> Self {
        Self {
            text: text.into(),
            sep,
        }
    }
}

/// A domain name as an ordered, root-first sequence of labels.
///
/// Equality is case-sensitive on the storage form (text and separators).
/// Lookups lower-case incoming QNAMEs before building a path; the
/// original-case QNAME is echoed back in responses separately.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamePath {
    labels: Vec<Label>,
}

impl NamePath {
    /// The empty path (the tree root).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from pre-split labels.
    #[must_use]
    pub fn from_labels(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    /// Parse the label portion of a storage key.
    ///
    /// Splits on `/` and `.`, recording which separator produced each label.
    /// The empty string parses to the root path.
    ///
    /// # Errors
    ///
    /// [`ParseError::EmptyLabel`] when two separators are adjacent or the
    /// key starts or ends with one (`a//b`, `.a`, `a.`).
    pub fn from_storage_key(key: &str) -> Result<Self, ParseError> {
        if key.is_empty() {
            return Ok(Self::root());
        }
        let mut labels = Vec::new();
        for (pi, part) in key.split('/').enumerate() {
            for (li, text) in part.split('.').enumerate() {
                if text.is_empty() {
                    return Err(ParseError::EmptyLabel {
                        key: key.to_string(),
                    });
                }
                let sep = match (pi, li) {
                    (0, 0) => Separator::None,
                    (_, 0) => Separator::Slash,
                    _ => Separator::Dot,
                };
                labels.push(Label::new(text, sep));
            }
        }
        Ok(Self { labels })
    }

    /// Build a path from a QNAME in presentation form.
    ///
    /// Lower-cases the name, splits on `.`, treats an empty trailing label
    /// as the root terminator, and reverses into root-first order. Labels
    /// are recorded with `.` separators (the canonical spelling when no
    /// storage key is known for them).
    #[must_use]
    pub fn from_qname(qname: &str) -> Self {
        let lowered = qname.to_lowercase();
        let mut parts: Vec<&str> = lowered.split('.').collect();
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        let labels = parts
            .into_iter()
            .rev()
            .enumerate()
            .map(|(i, text)| {
                let sep = if i == 0 {
                    Separator::None
                } else {
                    Separator::Dot
                };
                Label::new(text, sep)
            })
            .collect();
        Self { labels }
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The labels, root-first.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// DNS presentation form: deepest label first, dot-terminated.
    ///
    /// The root renders as `"."`.
    #[must_use]
    pub fn normal(&self) -> String {
        if self.labels.is_empty() {
            return ".".to_string();
        }
        let mut out = String::new();
        for label in self.labels.iter().rev() {
            out.push_str(&label.text);
            out.push('.');
        }
        out
    }

    /// Storage form: labels root-first with their recorded separators.
    ///
    /// With `trailing_slash`, a `/` is appended (used when the path prefixes
    /// deeper keys).
    #[must_use]
    pub fn as_key(&self, trailing_slash: bool) -> String {
        let mut out = String::new();
        for label in &self.labels {
            out.push_str(label.sep.as_str());
            out.push_str(&label.text);
        }
        if trailing_slash {
            out.push('/');
        }
        out
    }

    /// The first `depth` labels as a new path.
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Self {
        Self {
            labels: self.labels[..depth.min(self.labels.len())].to_vec(),
        }
    }

    /// The labels from `depth` onward (the part below a node at `depth`).
    #[must_use]
    pub fn from_depth(&self, depth: usize) -> &[Label] {
        &self.labels[depth.min(self.labels.len())..]
    }

    /// True when `self` extends `other` label for label (case-sensitive on
    /// label text; separators are not compared, both spellings address the
    /// same node).
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.labels.len() >= other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.text == b.text)
    }

    /// Append a label, returning the extended path.
    #[must_use]
    pub fn child(&self, label: Label) -> Self {
        let mut labels = self.labels.clone();
        labels.push(label);
        Self { labels }
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normal())
    }
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod name_tests;
