// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `name.rs`

use crate::name::{Label, NamePath, Separator};

#[test]
fn test_from_storage_key_mixed_separators() {
    let path = NamePath::from_storage_key("net.example/ns").unwrap();
    let labels = path.labels();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0].text, "net");
    assert_eq!(labels[0].sep, Separator::None);
    assert_eq!(labels[1].text, "example");
    assert_eq!(labels[1].sep, Separator::Dot);
    assert_eq!(labels[2].text, "ns");
    assert_eq!(labels[2].sep, Separator::Slash);
}

#[test]
fn test_from_storage_key_dotted_part_splits_into_labels() {
    let path = NamePath::from_storage_key("arpa.in-addr/192.0.2").unwrap();
    let texts: Vec<&str> = path.labels().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["arpa", "in-addr", "192", "0", "2"]);
    assert_eq!(path.labels()[2].sep, Separator::Slash);
    assert_eq!(path.labels()[3].sep, Separator::Dot);
}

#[test]
fn test_from_storage_key_empty_is_root() {
    let path = NamePath::from_storage_key("").unwrap();
    assert!(path.is_empty());
    assert_eq!(path.normal(), ".");
}

#[test]
fn test_from_storage_key_rejects_empty_labels() {
    assert!(NamePath::from_storage_key("a//b").is_err());
    assert!(NamePath::from_storage_key("a..b").is_err());
    assert!(NamePath::from_storage_key(".a").is_err());
    assert!(NamePath::from_storage_key("a.").is_err());
}

#[test]
fn test_as_key_round_trips_storage_form() {
    for key in ["net.example/ns", "net.example", "arpa.in-addr/192.0.2/2", "com"] {
        let path = NamePath::from_storage_key(key).unwrap();
        assert_eq!(path.as_key(false), key);
    }
}

#[test]
fn test_as_key_trailing_slash() {
    let path = NamePath::from_storage_key("net.example").unwrap();
    assert_eq!(path.as_key(true), "net.example/");
}

#[test]
fn test_normal_renders_deepest_first_with_trailing_dot() {
    let path = NamePath::from_storage_key("net.example/ns").unwrap();
    assert_eq!(path.normal(), "ns.example.net.");
}

#[test]
fn test_from_qname_lowercases_and_reverses() {
    let path = NamePath::from_qname("NS.Example.NET.");
    let texts: Vec<&str> = path.labels().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["net", "example", "ns"]);
}

#[test]
fn test_from_qname_without_root_terminator() {
    assert_eq!(
        NamePath::from_qname("ns.example.net"),
        NamePath::from_qname("ns.example.net.")
    );
}

#[test]
fn test_from_qname_root() {
    assert!(NamePath::from_qname(".").is_empty());
    assert!(NamePath::from_qname("").is_empty());
}

#[test]
fn test_prefix_and_from_depth() {
    let path = NamePath::from_storage_key("net.example/ns").unwrap();
    assert_eq!(path.prefix(2).normal(), "example.net.");
    let below = path.from_depth(2);
    assert_eq!(below.len(), 1);
    assert_eq!(below[0].text, "ns");
    assert!(path.prefix(10).len() == 3);
    assert!(path.from_depth(10).is_empty());
}

#[test]
fn test_is_descendant_of_ignores_separator_spelling() {
    let slashed = NamePath::from_storage_key("net/example/ns").unwrap();
    let dotted = NamePath::from_storage_key("net.example").unwrap();
    assert!(slashed.is_descendant_of(&dotted));
    assert!(!dotted.is_descendant_of(&slashed));
    assert!(dotted.is_descendant_of(&NamePath::root()));
}

#[test]
fn test_equality_is_case_sensitive_on_storage_form() {
    let lower = NamePath::from_storage_key("net.example").unwrap();
    let upper = NamePath::from_storage_key("net.Example").unwrap();
    assert_ne!(lower, upper);
}

#[test]
fn test_child_extends_path() {
    let base = NamePath::from_storage_key("net.example").unwrap();
    let child = base.child(Label::new("www", Separator::Slash));
    assert_eq!(child.normal(), "www.example.net.");
    assert_eq!(child.as_key(false), "net.example/www");
}
