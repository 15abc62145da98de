// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Octet parsing and assembly for A and AAAA records.
//!
//! The `ip` field of an address record may supply fewer octets than the
//! address family needs; the missing left part comes from the inherited
//! `ip-prefix` option, with zero padding between prefix and value:
//!
//! ```text
//! address = prefix ++ zero-pad ++ value     (right-aligned)
//! ```
//!
//! Accepted element forms: an integer (one octet), a hex string with
//! optional `0x`, IPv4 dotted form, IPv6 colon groups, or an array of any
//! of those. A leading separator marks a value that only makes sense as a
//! suffix (requires a configured prefix); a trailing separator marks a
//! prefix fragment (only meaningful on the `ip-prefix` option itself).

use crate::errors::RenderError;
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Octets for an IPv4 address.
pub const TOTAL_OCTETS_V4: usize = 4;

/// Octets for an IPv6 address.
pub const TOTAL_OCTETS_V6: usize = 16;

/// A parsed fragment with its separator markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The octets, in order
    pub octets: Vec<u8>,
    /// The input began with a separator (`.` or `:`)
    pub leading_sep: bool,
    /// The input ended with a separator
    pub trailing_sep: bool,
}

/// Parse an `ip`/`ip-prefix` field into octets.
///
/// `total` is 4 for A and 16 for AAAA; element counts outside `[1, total]`
/// are rejected.
pub fn parse_fragment(field: &str, value: &Value, total: usize) -> Result<Fragment, RenderError> {
    let mut fragment = Fragment {
        octets: Vec::new(),
        leading_sep: false,
        trailing_sep: false,
    };
    collect(field, value, &mut fragment)?;
    if fragment.octets.is_empty() {
        return Err(bad(field, "no octets"));
    }
    if fragment.octets.len() > total {
        return Err(bad(
            field,
            format!("{} octets exceed address size {total}", fragment.octets.len()),
        ));
    }
    Ok(fragment)
}

/// Assemble the final address bytes from an optional prefix and the value.
pub fn assemble(
    field: &str,
    prefix: Option<&Fragment>,
    value: &Fragment,
    total: usize,
) -> Result<Vec<u8>, RenderError> {
    if value.leading_sep && prefix.is_none() {
        return Err(bad(field, "suffix form requires an ip-prefix"));
    }
    if value.trailing_sep {
        return Err(bad(field, "record value cannot be a prefix fragment"));
    }
    if let Some(p) = prefix {
        if p.leading_sep {
            return Err(bad(field, "ip-prefix cannot be a suffix fragment"));
        }
    }

    let prefix_octets = prefix.map_or(&[][..], |p| &p.octets);
    let used = prefix_octets.len() + value.octets.len();
    if used > total {
        return Err(bad(
            field,
            format!("prefix and value overlap: {used} octets for {total}"),
        ));
    }
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(prefix_octets);
    out.resize(total - value.octets.len(), 0);
    out.extend_from_slice(&value.octets);
    Ok(out)
}

/// Render assembled bytes in the family's canonical text form.
#[must_use]
pub fn canonical_text(bytes: &[u8]) -> String {
    if bytes.len() == TOTAL_OCTETS_V4 {
        let octets: [u8; 4] = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Ipv4Addr::from(octets).to_string()
    } else {
        let mut octets = [0u8; TOTAL_OCTETS_V6];
        octets.copy_from_slice(bytes);
        Ipv6Addr::from(octets).to_string()
    }
}

fn collect(field: &str, value: &Value, fragment: &mut Fragment) -> Result<(), RenderError> {
    match value {
        Value::Number(n) => {
            let octet = n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| bad(field, format!("octet {n} out of range")))?;
            fragment.octets.push(octet);
            Ok(())
        }
        Value::String(text) => collect_text(field, text, fragment),
        Value::Array(items) => {
            for item in items {
                collect(field, item, fragment)?;
            }
            Ok(())
        }
        other => Err(bad(
            field,
            format!("unsupported value type {}", crate::value::type_name(other)),
        )),
    }
}

fn collect_text(field: &str, text: &str, fragment: &mut Fragment) -> Result<(), RenderError> {
    if text.is_empty() {
        return Err(bad(field, "empty octet string"));
    }
    if text.contains('.') && !text.chars().all(|c| c == '.') {
        return collect_separated(field, text, '.', fragment, |part| {
            part.parse::<u8>()
                .map(|o| vec![o])
                .map_err(|_| bad(field, format!("bad decimal octet '{part}'")))
        });
    }
    if text.contains(':') && !text.chars().all(|c| c == ':') {
        // a full address (possibly with `::` compression) parses directly
        if !text.starts_with(':') && !text.ends_with(':') {
            if let Ok(addr) = text.parse::<Ipv6Addr>() {
                fragment.octets.extend_from_slice(&addr.octets());
                return Ok(());
            }
        }
        return collect_separated(field, text, ':', fragment, |part| {
            u16::from_str_radix(part, 16)
                .map(|group| group.to_be_bytes().to_vec())
                .map_err(|_| bad(field, format!("bad hex group '{part}'")))
        });
    }
    // bare hex string, optionally 0x-prefixed
    let hex = text.strip_prefix("0x").unwrap_or(text);
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad(field, format!("bad hex string '{text}'")));
    }
    let mut i = 0;
    while i < hex.len() {
        let octet = u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| bad(field, format!("bad hex string '{text}'")))?;
        fragment.octets.push(octet);
        i += 2;
    }
    Ok(())
}

fn collect_separated(
    field: &str,
    text: &str,
    sep: char,
    fragment: &mut Fragment,
    parse_part: impl Fn(&str) -> Result<Vec<u8>, RenderError>,
) -> Result<(), RenderError> {
    let mut body = text;
    if let Some(stripped) = body.strip_prefix(sep) {
        fragment.leading_sep = true;
        body = stripped.strip_prefix(sep).unwrap_or(stripped);
    }
    if let Some(stripped) = body.strip_suffix(sep) {
        fragment.trailing_sep = true;
        body = stripped.strip_suffix(sep).unwrap_or(stripped);
    }
    if body.is_empty() {
        return Err(bad(field, format!("no octets in '{text}'")));
    }
    for part in body.split(sep) {
        if part.is_empty() {
            return Err(bad(field, format!("empty group in '{text}'")));
        }
        fragment.octets.extend(parse_part(part)?);
    }
    Ok(())
}

fn bad(field: &str, reason: impl Into<String>) -> RenderError {
    RenderError::BadAddress {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod address_tests;
