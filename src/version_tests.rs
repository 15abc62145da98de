// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `version.rs`

use crate::version::{precedence, reader_version, EntryVersion, Precedence};

fn v(token: &str) -> EntryVersion {
    EntryVersion::parse(token).unwrap()
}

#[test]
fn test_parse_development_versions() {
    let version = v("0.1");
    assert!(version.is_development);
    assert_eq!(version.major, 1);
    assert_eq!(version.minor, None);
    assert_eq!(version.minor_or_zero(), 0);

    let version = v("0.1.2");
    assert!(version.is_development);
    assert_eq!(version.major, 1);
    assert_eq!(version.minor, Some(2));
}

#[test]
fn test_parse_release_versions() {
    let version = v("1");
    assert!(!version.is_development);
    assert_eq!(version.major, 1);

    let version = v("1.2");
    assert_eq!((version.major, version.minor), (1, Some(2)));

    let version = v("1.2.3");
    assert_eq!(version.patch, Some(3));
}

#[test]
fn test_parse_bare_zero_is_major_zero() {
    let version = v("0");
    assert!(!version.is_development);
    assert_eq!(version.major, 0);
}

#[test]
fn test_parse_rejects_garbage() {
    for token in ["", "x", "1.", ".1", "1.2.3.4.5", "1.x", "-1", "1..2"] {
        assert!(EntryVersion::parse(token).is_none(), "token {token:?}");
    }
}

#[test]
fn test_display_round_trips() {
    for token in ["0.1", "0.1.2", "1", "1.2", "1.2.3", "0", "0.1.2.3"] {
        assert_eq!(v(token).to_string(), token);
    }
}

#[test]
fn test_compatibility() {
    let reader = v("0.1");
    assert!(reader.is_compatible_with(&v("0.1")));
    assert!(reader.is_compatible_with(&v("0.1.0")));
    // an entry minor above the reader's is unreadable
    assert!(!reader.is_compatible_with(&v("0.1.1")));
    // different major
    assert!(!reader.is_compatible_with(&v("0.2")));
    // development flag must match
    assert!(!reader.is_compatible_with(&v("1")));

    let reader = v("2.3");
    assert!(reader.is_compatible_with(&v("2")));
    assert!(reader.is_compatible_with(&v("2.3")));
    assert!(!reader.is_compatible_with(&v("2.4")));
}

#[test]
fn test_precedence_unversioned_loses_to_versioned() {
    assert_eq!(precedence(None, Some(&v("0.1"))), Precedence::Replace);
    assert_eq!(precedence(Some(&v("0.1")), None), Precedence::Keep);
}

#[test]
fn test_precedence_higher_minor_wins() {
    assert_eq!(
        precedence(Some(&v("0.1.1")), Some(&v("0.1.2"))),
        Precedence::Replace
    );
    assert_eq!(
        precedence(Some(&v("0.1.2")), Some(&v("0.1.1"))),
        Precedence::Keep
    );
    // equal minors keep the incumbent
    assert_eq!(
        precedence(Some(&v("0.1.2")), Some(&v("0.1.2"))),
        Precedence::Keep
    );
}

#[test]
fn test_precedence_duplicate_unversioned_is_a_data_error() {
    assert_eq!(precedence(None, None), Precedence::DuplicateUnversioned);
}

#[test]
fn test_reader_version_parses_the_schema_constant() {
    let reader = reader_version();
    assert!(reader.is_development);
    assert_eq!(reader.major, 1);
}
