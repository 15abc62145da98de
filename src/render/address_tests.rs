// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the octet parser and address assembly.

use crate::render::address::{
    assemble, canonical_text, parse_fragment, Fragment, TOTAL_OCTETS_V4, TOTAL_OCTETS_V6,
};
use serde_json::json;

fn fragment(octets: &[u8]) -> Fragment {
    Fragment {
        octets: octets.to_vec(),
        leading_sep: false,
        trailing_sep: false,
    }
}

#[test]
fn test_integer_is_one_octet() {
    let parsed = parse_fragment("ip", &json!(2), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(parsed.octets, vec![2]);
    assert!(parse_fragment("ip", &json!(256), TOTAL_OCTETS_V4).is_err());
}

#[test]
fn test_array_of_octets() {
    let parsed = parse_fragment("ip-prefix", &json!([192, 0, 2]), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(parsed.octets, vec![192, 0, 2]);
}

#[test]
fn test_hex_strings() {
    let parsed = parse_fragment("ip", &json!("0xC0A8"), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(parsed.octets, vec![0xC0, 0xA8]);
    let parsed = parse_fragment("ip", &json!("c0a80001"), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(parsed.octets, vec![192, 168, 0, 1]);
    assert!(parse_fragment("ip", &json!("0xC"), TOTAL_OCTETS_V4).is_err());
    assert!(parse_fragment("ip", &json!("zz"), TOTAL_OCTETS_V4).is_err());
}

#[test]
fn test_dotted_form() {
    let parsed = parse_fragment("ip", &json!("192.0.2.1"), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(parsed.octets, vec![192, 0, 2, 1]);
    assert!(!parsed.leading_sep);
    assert!(!parsed.trailing_sep);
}

#[test]
fn test_dotted_form_separator_markers() {
    let suffix = parse_fragment("ip", &json!(".2.1"), TOTAL_OCTETS_V4).unwrap();
    assert!(suffix.leading_sep);
    assert_eq!(suffix.octets, vec![2, 1]);

    let prefix = parse_fragment("ip-prefix", &json!("192.0.2."), TOTAL_OCTETS_V4).unwrap();
    assert!(prefix.trailing_sep);
    assert_eq!(prefix.octets, vec![192, 0, 2]);
}

#[test]
fn test_colon_groups() {
    let parsed = parse_fragment("ip", &json!("2001:db8"), TOTAL_OCTETS_V6).unwrap();
    assert_eq!(parsed.octets, vec![0x20, 0x01, 0x0d, 0xb8]);
}

#[test]
fn test_full_ipv6_with_compression() {
    let parsed = parse_fragment("ip", &json!("2001:db8::1"), TOTAL_OCTETS_V6).unwrap();
    assert_eq!(parsed.octets.len(), 16);
    assert_eq!(parsed.octets[0], 0x20);
    assert_eq!(parsed.octets[15], 1);
}

#[test]
fn test_mixed_array_elements() {
    let parsed = parse_fragment("ip", &json!([0xC0, "0.2", 1]), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(parsed.octets, vec![0xC0, 0, 2, 1]);
}

#[test]
fn test_too_many_octets_is_rejected() {
    assert!(parse_fragment("ip", &json!([1, 2, 3, 4, 5]), TOTAL_OCTETS_V4).is_err());
    assert!(parse_fragment("ip", &json!([]), TOTAL_OCTETS_V4).is_err());
}

#[test]
fn test_assemble_with_prefix_and_padding() {
    // prefix ++ zero-pad ++ value, right-aligned
    let bytes = assemble(
        "ip",
        Some(&fragment(&[10])),
        &fragment(&[1]),
        TOTAL_OCTETS_V4,
    )
    .unwrap();
    assert_eq!(bytes, vec![10, 0, 0, 1]);
}

#[test]
fn test_assemble_without_prefix_zero_pads() {
    let bytes = assemble("ip", None, &fragment(&[1]), TOTAL_OCTETS_V4).unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 1]);
}

#[test]
fn test_assemble_exact_fit() {
    let bytes = assemble(
        "ip",
        Some(&fragment(&[192, 0, 2])),
        &fragment(&[2]),
        TOTAL_OCTETS_V4,
    )
    .unwrap();
    assert_eq!(bytes, vec![192, 0, 2, 2]);
}

#[test]
fn test_assemble_overlap_is_rejected() {
    assert!(assemble(
        "ip",
        Some(&fragment(&[192, 0, 2])),
        &fragment(&[1, 2]),
        TOTAL_OCTETS_V4,
    )
    .is_err());
}

#[test]
fn test_assemble_role_validation() {
    let mut suffix_value = fragment(&[1]);
    suffix_value.leading_sep = true;
    // a suffix-form value demands a configured prefix
    assert!(assemble("ip", None, &suffix_value, TOTAL_OCTETS_V4).is_err());
    assert!(assemble("ip", Some(&fragment(&[10])), &suffix_value, TOTAL_OCTETS_V4).is_ok());

    let mut prefix_form_value = fragment(&[10]);
    prefix_form_value.trailing_sep = true;
    assert!(assemble("ip", None, &prefix_form_value, TOTAL_OCTETS_V4).is_err());

    let mut suffix_form_prefix = fragment(&[10]);
    suffix_form_prefix.leading_sep = true;
    assert!(assemble("ip", Some(&suffix_form_prefix), &fragment(&[1]), TOTAL_OCTETS_V4).is_err());
}

#[test]
fn test_canonical_text() {
    assert_eq!(canonical_text(&[192, 0, 2, 2]), "192.0.2.2");
    let mut v6 = vec![0u8; 16];
    v6[0] = 0x20;
    v6[1] = 0x01;
    v6[2] = 0x0d;
    v6[3] = 0xb8;
    v6[15] = 1;
    assert_eq!(canonical_text(&v6), "2001:db8::1");
}
