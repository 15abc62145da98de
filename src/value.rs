// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed extraction from dynamically typed entry fields.
//!
//! Entry content arrives as `serde_json::Value`. Renderers read fields
//! through the extractors here; a field of the wrong JSON type is a
//! [`TypeError`], never coerced.

use crate::errors::{RenderError, TypeError};
use serde_json::Value;

/// Short type description for diagnostics.
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract a string field.
pub fn as_str<'a>(field: &str, value: &'a Value) -> Result<&'a str, TypeError> {
    value.as_str().ok_or_else(|| TypeError {
        field: field.to_string(),
        expected: "string",
        found: type_name(value).to_string(),
    })
}

/// Extract an unsigned 16-bit integer field (MX/SRV priority, weight, port).
pub fn as_u16(field: &str, value: &Value) -> Result<u16, TypeError> {
    value
        .as_u64()
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| TypeError {
            field: field.to_string(),
            expected: "uint16",
            found: describe(value),
        })
}

/// Extract a duration field as whole seconds.
///
/// Accepts an integer number of seconds or a duration string of the form
/// `[<int><unit>]+` with units `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.
/// Durations below one second are rejected.
pub fn as_duration_secs(field: &str, value: &Value) -> Result<u64, RenderError> {
    let nanos = match value {
        Value::Number(n) => {
            let secs = n.as_u64().ok_or_else(|| {
                RenderError::from(TypeError {
                    field: field.to_string(),
                    expected: "duration",
                    found: describe(value),
                })
            })?;
            u128::from(secs) * NANOS_PER_SEC
        }
        Value::String(text) => parse_duration_nanos(text).ok_or_else(|| {
            RenderError::BadDuration {
                field: field.to_string(),
                value: text.clone(),
            }
        })?,
        _ => {
            return Err(TypeError {
                field: field.to_string(),
                expected: "duration",
                found: type_name(value).to_string(),
            }
            .into())
        }
    };
    if nanos < NANOS_PER_SEC {
        return Err(RenderError::DurationTooShort {
            field: field.to_string(),
        });
    }
    Ok(u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX))
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration string (`2s`, `1m30s`, `500ms`) into a [`std::time::Duration`].
///
/// Used by the `--timeout` command-line flag; record fields go through
/// [`as_duration_secs`] instead.
#[must_use]
pub fn parse_duration(text: &str) -> Option<std::time::Duration> {
    let nanos = parse_duration_nanos(text)?;
    u64::try_from(nanos).ok().map(std::time::Duration::from_nanos)
}

/// Parse `[<int><unit>]+` into nanoseconds. Returns `None` on any syntax
/// error or an empty input.
fn parse_duration_nanos(text: &str) -> Option<u128> {
    if text.is_empty() {
        return None;
    }
    let mut total: u128 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits_end == 0 {
            return None;
        }
        let number: u128 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];
        let (scale, consumed) = match_unit(rest)?;
        total = total.checked_add(number.checked_mul(scale)?)?;
        rest = &rest[consumed..];
    }
    Some(total)
}

/// Longest-match unit lookup; returns the scale in nanoseconds and the
/// byte length consumed.
fn match_unit(rest: &str) -> Option<(u128, usize)> {
    for (unit, scale) in [
        ("ns", 1),
        ("us", 1_000),
        ("µs", 1_000),
        ("ms", 1_000_000),
        ("s", NANOS_PER_SEC),
        ("m", 60 * NANOS_PER_SEC),
        ("h", 3_600 * NANOS_PER_SEC),
    ] {
        if rest.starts_with(unit) {
            return Some((scale, unit.len()));
        }
    }
    None
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {n}"),
        other => type_name(other).to_string(),
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod value_tests;
