// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! KV key decomposition.
//!
//! A key (global prefix already stripped) decomposes into
//! `(name, entry kind, QTYPE, id, version)` following the grammar
//!
//! ```text
//! <labels>[/-defaults-|/-options-][/<QTYPE>][#<id>][@<version>]
//! ```
//!
//! Parsing order matters: the version token is everything after the last
//! `@`, the id everything after the last `#` of what remains, and only then
//! is the rest split on `/`. A parsed key re-serializes to the original
//! bytes, including a bare `#` marker and a recorded trailing `/`.

use crate::constants::{DEFAULTS_SEGMENT, OPTIONS_SEGMENT};
use crate::errors::ParseError;
use crate::name::NamePath;
use crate::version::EntryVersion;
use std::fmt;

/// What a KV entry contributes to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A resource record instance
    Normal,
    /// Inheritable field defaults (`-defaults-`)
    Defaults,
    /// Rendering options (`-options-`)
    Options,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Normal => "record",
            EntryKind::Defaults => "defaults",
            EntryKind::Options => "options",
        })
    }
}

/// A fully decomposed KV key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryKey {
    /// The domain name path the entry attaches to
    pub name: NamePath,
    /// Record, defaults or options
    pub kind: EntryKind,
    /// The record type, upper-case; empty for catch-all defaults/options
    pub qtype: String,
    /// The instance id. `None` when no `#` marker was present; `Some("")`
    /// for a bare `#`. Both address id `""`.
    pub id: Option<String>,
    /// The data-schema version tag, if any
    pub version: Option<EntryVersion>,
    /// A trailing `/` was present; meaningless, kept for round-tripping
    pub trailing_slash: bool,
}

impl EntryKey {
    /// Decompose `key` (global prefix already stripped).
    ///
    /// # Errors
    ///
    /// - [`ParseError::BadVersion`] for an unparseable `@` suffix
    /// - [`ParseError::EmptyLabel`] for adjacent separators
    /// - [`ParseError::MissingType`] for a record entry without a QTYPE
    /// - [`ParseError::SoaWithId`] for `SOA` with a non-empty id
    pub fn parse(key: &str) -> Result<Self, ParseError> {
        let mut rest = key;

        let version = match rest.rfind('@') {
            None => None,
            Some(at) => {
                let token = &rest[at + 1..];
                let parsed = EntryVersion::parse(token).ok_or_else(|| ParseError::BadVersion {
                    key: key.to_string(),
                    token: token.to_string(),
                })?;
                rest = &rest[..at];
                Some(parsed)
            }
        };

        let id = match rest.rfind('#') {
            None => None,
            Some(hash) => {
                let id = rest[hash + 1..].to_string();
                rest = &rest[..hash];
                Some(id)
            }
        };

        let mut parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        let trailing_slash = parts.len() > 1 && parts.last() == Some(&"");
        if trailing_slash {
            parts.pop();
        }

        let qtype = match parts.last() {
            Some(last) if is_qtype(last) => {
                let qtype = (*last).to_string();
                parts.pop();
                qtype
            }
            _ => String::new(),
        };

        let kind = match parts.last() {
            Some(&DEFAULTS_SEGMENT) => {
                parts.pop();
                EntryKind::Defaults
            }
            Some(&OPTIONS_SEGMENT) => {
                parts.pop();
                EntryKind::Options
            }
            _ => EntryKind::Normal,
        };

        let name = NamePath::from_storage_key(&parts.join("/")).map_err(|_| {
            ParseError::EmptyLabel {
                key: key.to_string(),
            }
        })?;

        if kind == EntryKind::Normal && qtype.is_empty() {
            return Err(ParseError::MissingType {
                key: key.to_string(),
            });
        }
        if qtype == "SOA" && id.as_deref().is_some_and(|id| !id.is_empty()) {
            return Err(ParseError::SoaWithId {
                key: key.to_string(),
                id: id.unwrap_or_default(),
            });
        }

        Ok(Self {
            name,
            kind,
            qtype,
            id,
            version,
            trailing_slash,
        })
    }

    /// The id this entry addresses (`""` when no marker was present).
    #[must_use]
    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Re-serialize to the original key bytes.
    #[must_use]
    pub fn to_key(&self) -> String {
        let mut segments: Vec<String> = Vec::new();
        if !self.name.is_empty() {
            segments.push(self.name.as_key(false));
        }
        match self.kind {
            EntryKind::Normal => {}
            EntryKind::Defaults => segments.push(DEFAULTS_SEGMENT.to_string()),
            EntryKind::Options => segments.push(OPTIONS_SEGMENT.to_string()),
        }
        if !self.qtype.is_empty() {
            segments.push(self.qtype.clone());
        }
        let mut out = segments.join("/");
        if self.trailing_slash {
            out.push('/');
        }
        if let Some(id) = &self.id {
            out.push('#');
            out.push_str(id);
        }
        if let Some(version) = &self.version {
            out.push('@');
            out.push_str(&version.to_string());
        }
        out
    }
}

/// A key part is a QTYPE when it matches `^[A-Z][A-Z0-9]*$`.
#[must_use]
pub fn is_qtype(part: &str) -> bool {
    let mut bytes = part.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_uppercase() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod key_tests;
