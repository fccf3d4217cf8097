// src/attribute/codec.rs

//! Attribute value codec
//!
//! Converts between the external `(type spec, raw string)` form of an
//! attribute and its typed [`AttrValue`].
//!
//! # Type specs
//!
//! - absent or empty → `String`
//! - `String`, `Version`, `Long`, `Double` → scalar of that kind
//! - `List<Kind>` → list of that kind (`List` alone means `List<String>`)
//!
//! # List encoding
//!
//! Elements are comma separated. A literal `,` or `\` inside an element is
//! written as `\,` or `\\`. Decoding splits on unescaped commas, un-escapes,
//! then trims each element, so escapes survive the trim of adjacent separators.
//!
//! An empty raw string decodes to the empty list. A list holding one empty
//! String element therefore encodes to the same raw string and comes back
//! empty; the grammar has no way to tell the two apart. Empty elements next to
//! other elements (`",a"`) are kept.

use super::{AttrKind, AttrValue, AttributeError, ScalarRef};
use crate::version::Version;

/// Parse a type spec into its kind and whether it denotes a list
pub fn parse_type_spec(spec: Option<&str>) -> Result<(AttrKind, bool), AttributeError> {
    let spec = spec.map(str::trim).unwrap_or("");

    if let Some(rest) = spec.strip_prefix("List") {
        let rest = rest.trim();
        if rest.is_empty() {
            return Ok((AttrKind::String, true));
        }
        let inner = rest
            .strip_prefix('<')
            .and_then(|r| r.strip_suffix('>'))
            .ok_or_else(|| AttributeError::UnknownType(spec.to_string()))?;
        let kind = inner
            .parse::<AttrKind>()
            .map_err(|_| AttributeError::UnknownType(spec.to_string()))?;
        return Ok((kind, true));
    }

    Ok((spec.parse::<AttrKind>()?, false))
}

/// Decode a raw string into a typed value
pub fn decode(type_spec: Option<&str>, raw: &str) -> Result<AttrValue, AttributeError> {
    let (kind, is_list) = parse_type_spec(type_spec)?;
    let raw = raw.trim();

    if !is_list {
        return Ok(match kind {
            AttrKind::String => AttrValue::String(raw.to_string()),
            AttrKind::Version => AttrValue::Version(parse_version(raw)?),
            AttrKind::Long => AttrValue::Long(parse_long(raw)?),
            AttrKind::Double => AttrValue::Double(parse_double(raw)?),
        });
    }

    let elements = split_list(raw);
    Ok(match kind {
        AttrKind::String => AttrValue::StringList(elements),
        AttrKind::Version => AttrValue::VersionList(
            elements
                .iter()
                .map(|e| parse_version(e))
                .collect::<Result<_, _>>()?,
        ),
        AttrKind::Long => AttrValue::LongList(
            elements
                .iter()
                .map(|e| parse_long(e))
                .collect::<Result<_, _>>()?,
        ),
        AttrKind::Double => AttrValue::DoubleList(
            elements
                .iter()
                .map(|e| parse_double(e))
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// Encode a typed value into `(type spec, raw string)`
///
/// Empty lists always report `List<String>` with an empty raw string.
pub fn encode(value: &AttrValue) -> (String, String) {
    if !value.is_list() {
        let raw = value
            .elements()
            .first()
            .map(|scalar| encode_scalar(*scalar))
            .unwrap_or_default();
        return (value.type_spec(), raw);
    }

    let raw = value
        .elements()
        .into_iter()
        .map(|scalar| escape_element(&encode_scalar(scalar)))
        .collect::<Vec<_>>()
        .join(",");

    (value.type_spec(), raw)
}

/// Canonical string form of a single element
///
/// This is also the key the capability index buckets values under.
pub fn encode_scalar(scalar: ScalarRef<'_>) -> String {
    match scalar {
        ScalarRef::String(s) => s.to_string(),
        ScalarRef::Version(v) => v.to_string(),
        ScalarRef::Long(n) => n.to_string(),
        ScalarRef::Double(d) => d.to_string(),
    }
}

fn malformed(kind: AttrKind, token: &str, reason: impl ToString) -> AttributeError {
    AttributeError::MalformedValue {
        kind,
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_version(token: &str) -> Result<Version, AttributeError> {
    Version::parse(token).map_err(|e| malformed(AttrKind::Version, token, e))
}

fn parse_long(token: &str) -> Result<i64, AttributeError> {
    token
        .parse::<i64>()
        .map_err(|e| malformed(AttrKind::Long, token, e))
}

fn parse_double(token: &str) -> Result<f64, AttributeError> {
    token
        .parse::<f64>()
        .map_err(|e| malformed(AttrKind::Double, token, e))
}

/// Split a raw list on unescaped commas, un-escape, then trim each element
fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ',' => {
                elements.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    elements.push(current.trim().to_string());

    elements
}

fn escape_element(element: &str) -> String {
    let mut escaped = String::with_capacity(element.len());
    for c in element.chars() {
        if c == '\\' || c == ',' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
