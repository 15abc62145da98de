// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Entry content parsing.
//!
//! The first byte of an entry's value decides its shape:
//!
//! | leads with | parsed as |
//! |------------|-----------|
//! | `=`        | JSON scalar or array (a *last-field value*) |
//! | `{`        | JSON object |
//! | `` ` ``    | the rest, verbatim text |
//! | `` !` ``   | verbatim text, never re-interpreted |
//! | `---` + EOL | YAML object |
//! | otherwise  | opaque text (records only) |
//!
//! Defaults and options entries must parse to objects; anything else is a
//! per-entry error. Record entries accept any form, including empty.

use crate::errors::ParseError;
use crate::key::EntryKind;
use serde_json::{Map, Value};

/// A parsed entry value.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentValue {
    /// A field map (`{...}` JSON or a YAML document)
    Object(Map<String, Value>),
    /// A bare scalar or array introduced by `=`; the renderer binds it to
    /// the QTYPE's canonical field
    LastField(Value),
    /// Opaque text. With `parse_suppressed`, renderers take it verbatim and
    /// never re-interpret it.
    Text {
        /// The text, without its escape prefix
        text: String,
        /// Introduced by ``!` ``
        parse_suppressed: bool,
    },
}

impl ContentValue {
    /// Parse raw entry bytes for an entry of `kind` stored under `key`.
    ///
    /// # Errors
    ///
    /// Per-entry [`ParseError`]s as described in the module docs; the caller
    /// logs and skips the entry.
    pub fn parse(key: &str, raw: &[u8], kind: EntryKind) -> Result<Self, ParseError> {
        let is_record = kind == EntryKind::Normal;

        if raw.is_empty() {
            if is_record {
                return Ok(ContentValue::Text {
                    text: String::new(),
                    parse_suppressed: false,
                });
            }
            return Err(ParseError::EmptyContent {
                key: key.to_string(),
            });
        }

        match raw[0] {
            b'=' => {
                if !is_record {
                    return Err(ParseError::NotAnObject {
                        key: key.to_string(),
                    });
                }
                let value: Value =
                    serde_json::from_slice(&raw[1..]).map_err(|e| ParseError::BadJson {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                if value.is_object() {
                    return Err(ParseError::InvalidContent {
                        key: key.to_string(),
                    });
                }
                Ok(ContentValue::LastField(value))
            }
            b'{' => {
                let map: Map<String, Value> =
                    serde_json::from_slice(raw).map_err(|e| ParseError::BadJson {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(ContentValue::Object(map))
            }
            b'`' => {
                let text = String::from_utf8_lossy(&raw[1..]).into_owned();
                Self::text_for_kind(key, kind, text, false)
            }
            b'!' if raw.get(1) == Some(&b'`') => {
                let text = String::from_utf8_lossy(&raw[2..]).into_owned();
                Self::text_for_kind(key, kind, text, true)
            }
            _ if is_yaml_document(raw) => {
                let value: Value =
                    serde_yaml::from_slice(raw).map_err(|e| ParseError::BadYaml {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                match value {
                    Value::Object(map) => Ok(ContentValue::Object(map)),
                    _ => Err(ParseError::NotAnObject {
                        key: key.to_string(),
                    }),
                }
            }
            _ => {
                if is_record {
                    Ok(ContentValue::Text {
                        text: String::from_utf8_lossy(raw).into_owned(),
                        parse_suppressed: false,
                    })
                } else {
                    Err(ParseError::InvalidContent {
                        key: key.to_string(),
                    })
                }
            }
        }
    }

    fn text_for_kind(
        key: &str,
        kind: EntryKind,
        text: String,
        parse_suppressed: bool,
    ) -> Result<Self, ParseError> {
        if kind == EntryKind::Normal {
            Ok(ContentValue::Text {
                text,
                parse_suppressed,
            })
        } else {
            Err(ParseError::NotAnObject {
                key: key.to_string(),
            })
        }
    }

    /// The field map, for defaults/options entries.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            ContentValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// `---` followed by an end-of-line marks a YAML document.
fn is_yaml_document(raw: &[u8]) -> bool {
    raw.starts_with(b"---") && matches!(raw.get(3), Some(&b'\n') | Some(&b'\r'))
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod content_tests;
