// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-QTYPE record renderers.
//!
//! Each supported QTYPE maps to a content builder that reads its fields
//! through the resolver (record value first, then inherited defaults, then
//! a last-field value bound to the QTYPE's canonical field) and emits the
//! PowerDNS content string. MX and SRV embed the priority placeholder for
//! the lookup engine to strip or substitute per protocol version.
//!
//! Renderers are a flat dispatch table; there is deliberately no trait
//! hierarchy behind them.

pub mod address;
pub mod scope;

use crate::constants::PRIORITY_PLACEHOLDER;
use crate::content::ContentValue;
use crate::errors::{RenderError, TypeError};
use crate::tree::{Record, StoredEntry};
use crate::value::{as_duration_secs, as_str, as_u16, type_name};
use scope::{Area, Resolver};
use serde_json::Value;

/// Everything a renderer needs for one stored value.
#[derive(Debug)]
pub struct RenderRequest<'a> {
    /// The QTYPE being rendered
    pub qtype: &'a str,
    /// The instance id
    pub id: &'a str,
    /// The stored entry
    pub entry: &'a StoredEntry,
    /// Resolver stack rooted at the record's node
    pub resolver: &'a Resolver<'a>,
    /// Derived serial of the enclosing zone (SOA only)
    pub zone_serial: i64,
}

/// The QTYPEs this backend renders.
pub const SUPPORTED_QTYPES: &[&str] = &[
    "SOA", "NS", "CNAME", "DNAME", "PTR", "A", "AAAA", "MX", "SRV", "TXT",
];

/// Render one stored value into a record.
///
/// # Errors
///
/// Any [`RenderError`]; the caller logs it and drops this record, leaving
/// the rest of the zone intact.
pub fn render_record(req: &RenderRequest<'_>) -> Result<Record, RenderError> {
    let ttl = duration_field(req, "ttl")?;

    let (content, priority) = match req.qtype {
        "SOA" => (render_soa(req)?, None),
        "NS" | "CNAME" | "DNAME" | "PTR" => (render_domain_name(req)?, None),
        "A" => (render_address(req, address::TOTAL_OCTETS_V4)?, None),
        "AAAA" => (render_address(req, address::TOTAL_OCTETS_V6)?, None),
        "MX" => render_mx(req)?,
        "SRV" => render_srv(req)?,
        "TXT" => (render_txt(req)?, None),
        other => {
            return Err(RenderError::UnsupportedType {
                qtype: other.to_string(),
            })
        }
    };

    Ok(Record {
        content,
        priority,
        ttl,
        version: req.entry.version,
    })
}

/// The field a bare scalar/string value binds to, per QTYPE.
#[must_use]
pub fn canonical_field(qtype: &str) -> &'static str {
    match qtype {
        "SOA" => "primary",
        "A" | "AAAA" => "ip",
        "TXT" => "text",
        _ => "target",
    }
}

// ============================================================================
// Per-QTYPE builders
// ============================================================================

fn render_soa(req: &RenderRequest<'_>) -> Result<String, RenderError> {
    let primary = string_field(req, "primary")?;
    let primary = fqdn(req, primary, true)?;

    let mail = string_field(req, "mail")?;
    let mail = fqdn(req, encode_mailbox(&mail), true)?;

    let refresh = duration_field(req, "refresh")?;
    let retry = duration_field(req, "retry")?;
    let expire = duration_field(req, "expire")?;
    let neg_ttl = duration_field(req, "neg-ttl")?;

    Ok(format!(
        "{primary} {mail} {serial} {refresh} {retry} {expire} {neg_ttl}",
        serial = req.zone_serial
    ))
}

fn render_domain_name(req: &RenderRequest<'_>) -> Result<String, RenderError> {
    let target = string_field(req, "target")?;
    fqdn(req, target, false)
}

fn render_address(req: &RenderRequest<'_>, total: usize) -> Result<String, RenderError> {
    let ip = required_field(req, "ip")?;
    let value = address::parse_fragment("ip", &ip, total)?;

    let prefix = match req
        .resolver
        .find(Area::Options, req.qtype, req.id, "ip-prefix")
    {
        Some(option) => Some(address::parse_fragment("ip-prefix", option, total)?),
        None => None,
    };

    let bytes = address::assemble("ip", prefix.as_ref(), &value, total)?;
    Ok(address::canonical_text(&bytes))
}

fn render_mx(req: &RenderRequest<'_>) -> Result<(String, Option<u16>), RenderError> {
    let priority = u16_field(req, "priority")?;
    let target = string_field(req, "target")?;
    let target = fqdn(req, target, false)?;
    Ok((format!("{PRIORITY_PLACEHOLDER}{target}"), Some(priority)))
}

fn render_srv(req: &RenderRequest<'_>) -> Result<(String, Option<u16>), RenderError> {
    let priority = u16_field(req, "priority")?;
    let weight = u16_field(req, "weight")?;
    let port = u16_field(req, "port")?;
    let target = string_field(req, "target")?;
    let target = fqdn(req, target, false)?;
    Ok((
        format!("{PRIORITY_PLACEHOLDER}{weight} {port} {target}"),
        Some(priority),
    ))
}

fn render_txt(req: &RenderRequest<'_>) -> Result<String, RenderError> {
    let text = required_field(req, "text")?;
    let elements: Vec<String> = match &text {
        Value::Array(items) => items
            .iter()
            .map(quote_txt_element)
            .collect::<Result<_, _>>()?,
        single => vec![quote_txt_element(single)?],
    };
    Ok(elements.join(" "))
}

/// Quote and escape one TXT element per RFC 1035 §3.3.
fn quote_txt_element(element: &Value) -> Result<String, TypeError> {
    let text = match element {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(TypeError {
                field: "text".to_string(),
                expected: "string or number",
                found: type_name(other).to_string(),
            })
        }
    };
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    Ok(format!("\"{escaped}\""))
}

// ============================================================================
// Field access
// ============================================================================

/// Locate `field` for this record: the record value wins over defaults;
/// with neither present, a bare scalar entry binds to the QTYPE's
/// canonical field.
#[must_use]
pub fn find_field(req: &RenderRequest<'_>, field: &str) -> Option<Value> {
    if let ContentValue::Object(map) = &req.entry.content {
        if let Some(value) = map.get(field) {
            return Some(value.clone());
        }
    }
    if let Some(value) = req
        .resolver
        .find(Area::Defaults, req.qtype, req.id, field)
    {
        return Some(value.clone());
    }
    if field == canonical_field(req.qtype) {
        match &req.entry.content {
            ContentValue::LastField(value) => return Some(value.clone()),
            ContentValue::Text { text, .. } => return Some(Value::String(text.clone())),
            ContentValue::Object(_) => {}
        }
    }
    None
}

fn required_field(req: &RenderRequest<'_>, field: &str) -> Result<Value, RenderError> {
    find_field(req, field).ok_or_else(|| RenderError::MissingField {
        field: field.to_string(),
        qtype: req.qtype.to_string(),
    })
}

fn string_field(req: &RenderRequest<'_>, field: &str) -> Result<String, RenderError> {
    let value = required_field(req, field)?;
    Ok(as_str(field, &value)?.to_string())
}

fn u16_field(req: &RenderRequest<'_>, field: &str) -> Result<u16, RenderError> {
    let value = required_field(req, field)?;
    Ok(as_u16(field, &value)?)
}

fn duration_field(req: &RenderRequest<'_>, field: &str) -> Result<u64, RenderError> {
    let value = required_field(req, field)?;
    as_duration_secs(field, &value)
}

// ============================================================================
// Name anchoring
// ============================================================================

/// Complete a relative domain name into an FQDN.
///
/// Walks the resolver levels from the record's node upward. A level with a
/// non-inheriting `zone-append-domain` option contributes its suffix; a
/// zone apex contributes its QNAME and terminates. A name that never
/// terminates is a render error.
///
/// `rendering_soa`: the record's own level terminates the walk even though
/// its SOA record does not exist yet.
pub fn fqdn(
    req: &RenderRequest<'_>,
    name: String,
    rendering_soa: bool,
) -> Result<String, RenderError> {
    let mut name = name;
    if name.ends_with('.') {
        return Ok(name);
    }
    for (idx, level) in req.resolver.levels().iter().enumerate() {
        if let Some(option) =
            req.resolver
                .find_at(idx, Area::Options, req.qtype, req.id, "zone-append-domain")
        {
            let suffix = as_str("zone-append-domain", option)?;
            if !suffix.starts_with('.') {
                name.push('.');
            }
            name.push_str(suffix);
            if name.ends_with('.') {
                return Ok(name);
            }
        } else if level.is_apex || (rendering_soa && idx == 0) {
            name.push('.');
            if level.qname != "." {
                name.push_str(level.qname);
            }
            return Ok(name);
        }
    }
    Err(RenderError::UnanchoredName { name })
}

/// RFC 1035 mailbox encoding: dots in the local part are escaped, the `@`
/// becomes a label separator. Without an `@`, every dot is escaped.
#[must_use]
pub fn encode_mailbox(mail: &str) -> String {
    match mail.split_once('@') {
        Some((local, domain)) => format!("{}.{}", local.replace('.', "\\."), domain),
        None => mail.replace('.', "\\."),
    }
}
