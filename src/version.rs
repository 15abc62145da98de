// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Data-schema versions and entry version gating.
//!
//! Entries may carry an `@<version>` suffix in their key. The version
//! grammar is `[0.]<major>[.<minor>[.<patch>]]`; a leading `0.` marks a
//! development version. The backend reads entries whose version is
//! *compatible* with [`crate::constants::DATA_SCHEMA_VERSION`]: same
//! development flag, same major, and an entry minor not above the reader's.
//!
//! Gating runs before any further parsing, since a higher schema version may
//! change key or content syntax.

use std::fmt;

/// A parsed data-schema version.
///
/// `minor` and `patch` remember whether they were written out, so a parsed
/// version re-renders byte-exactly (`0.1` never becomes `0.1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryVersion {
    /// True when the version began with `0.`
    pub is_development: bool,
    /// Major version; compatibility requires an exact match
    pub major: u8,
    /// Minor version, if written
    pub minor: Option<u8>,
    /// Patch version, if written; carried but never compared
    pub patch: Option<u8>,
}

/// Outcome of comparing a stored entry against a new arrival for the same
/// (QTYPE, id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// The new entry supersedes the stored one
    Replace,
    /// The stored entry stays
    Keep,
    /// Two unversioned entries collided; a data error. The later arrival is
    /// dropped with a warning.
    DuplicateUnversioned,
}

impl EntryVersion {
    /// Parse a version token.
    ///
    /// Returns `None` for anything outside the
    /// `[0.]<major>[.<minor>[.<patch>]]` grammar.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let first = parts.next()?;
        let first_num: u8 = parse_component(first)?;

        let (is_development, major) = if first_num == 0 && first == "0" {
            match parts.next() {
                // a bare "0" is major zero, not a development marker
                None => (false, 0),
                Some(m) => (true, parse_component(m)?),
            }
        } else {
            (false, first_num)
        };

        let minor = match parts.next() {
            None => None,
            Some(m) => Some(parse_component(m)?),
        };
        let patch = match parts.next() {
            None => None,
            Some(p) => Some(parse_component(p)?),
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            is_development,
            major,
            minor,
            patch,
        })
    }

    /// The minor version, defaulting to zero when unwritten.
    #[must_use]
    pub fn minor_or_zero(&self) -> u8 {
        self.minor.unwrap_or(0)
    }

    /// Whether this reader may load an entry tagged `entry`.
    #[must_use]
    pub fn is_compatible_with(&self, entry: &EntryVersion) -> bool {
        self.is_development == entry.is_development
            && self.major == entry.major
            && self.minor_or_zero() >= entry.minor_or_zero()
    }
}

/// Decide whether a new arrival replaces the stored entry.
///
/// An unversioned entry is older than any versioned one; between two
/// versioned entries the greater minor wins; equal minors keep the
/// incumbent. Both versions are assumed compatible with the reader (gating
/// happened earlier).
#[must_use]
pub fn precedence(stored: Option<&EntryVersion>, arrival: Option<&EntryVersion>) -> Precedence {
    match (stored, arrival) {
        (None, None) => Precedence::DuplicateUnversioned,
        (None, Some(_)) => Precedence::Replace,
        (Some(_), None) => Precedence::Keep,
        (Some(s), Some(a)) => {
            if a.minor_or_zero() > s.minor_or_zero() {
                Precedence::Replace
            } else {
                Precedence::Keep
            }
        }
    }
}

/// The schema version this backend reads
/// ([`crate::constants::DATA_SCHEMA_VERSION`]).
#[must_use]
pub fn reader_version() -> EntryVersion {
    EntryVersion::parse(crate::constants::DATA_SCHEMA_VERSION).unwrap_or(EntryVersion {
        is_development: true,
        major: 1,
        minor: None,
        patch: None,
    })
}

fn parse_component(text: &str) -> Option<u8> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for EntryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_development {
            write!(f, "0.{}", self.major)?;
        } else {
            write!(f, "{}", self.major)?;
        }
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
        }
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod version_tests;
