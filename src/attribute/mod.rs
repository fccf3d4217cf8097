// src/attribute/mod.rs

//! Typed attribute values for capabilities and requirements
//!
//! Every attribute carries one of four kinds (String, Version, Long, Double)
//! in either scalar or list form. List variants are typed per kind, so a list
//! can never mix element kinds. An empty list has no recoverable kind and is
//! treated as a String list wherever the kind is reported.

pub mod codec;

pub use codec::{decode, encode, encode_scalar, parse_type_spec};

use crate::version::Version;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Attribute map of a capability or requirement
pub type Attributes = BTreeMap<String, AttrValue>;

/// Directive map of a capability or requirement
pub type Directives = BTreeMap<String, String>;

/// Errors produced by the attribute codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("Malformed {kind} value '{token}': {reason}")]
    MalformedValue {
        kind: AttrKind,
        token: String,
        reason: String,
    },

    #[error("Unknown attribute type '{0}'")]
    UnknownType(String),

    #[error("List elements must all be {expected}, found {found}")]
    HeterogeneousList { expected: String, found: String },
}

/// The element kind of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttrKind {
    #[default]
    String,
    Version,
    Long,
    Double,
}

impl AttrKind {
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Version => "Version",
            Self::Long => "Long",
            Self::Double => "Double",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttrKind {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "String" => Ok(Self::String),
            "Version" => Ok(Self::Version),
            "Long" => Ok(Self::Long),
            "Double" => Ok(Self::Double),
            other => Err(AttributeError::UnknownType(other.to_string())),
        }
    }
}

/// A typed attribute value
#[derive(Debug, Clone)]
pub enum AttrValue {
    String(String),
    Version(Version),
    Long(i64),
    Double(f64),
    StringList(Vec<String>),
    VersionList(Vec<Version>),
    LongList(Vec<i64>),
    DoubleList(Vec<f64>),
}

/// A borrowed view of one scalar element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarRef<'a> {
    String(&'a str),
    Version(&'a Version),
    Long(i64),
    Double(f64),
}

impl ScalarRef<'_> {
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::String(_) => AttrKind::String,
            Self::Version(_) => AttrKind::Version,
            Self::Long(_) => AttrKind::Long,
            Self::Double(_) => AttrKind::Double,
        }
    }
}

impl AttrValue {
    /// The element kind; empty lists report String
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::String(_) => AttrKind::String,
            Self::Version(_) => AttrKind::Version,
            Self::Long(_) => AttrKind::Long,
            Self::Double(_) => AttrKind::Double,
            list if list.is_empty_list() => AttrKind::String,
            Self::StringList(_) => AttrKind::String,
            Self::VersionList(_) => AttrKind::Version,
            Self::LongList(_) => AttrKind::Long,
            Self::DoubleList(_) => AttrKind::Double,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::StringList(_) | Self::VersionList(_) | Self::LongList(_) | Self::DoubleList(_)
        )
    }

    fn is_empty_list(&self) -> bool {
        match self {
            Self::StringList(v) => v.is_empty(),
            Self::VersionList(v) => v.is_empty(),
            Self::LongList(v) => v.is_empty(),
            Self::DoubleList(v) => v.is_empty(),
            _ => false,
        }
    }

    /// Type spec as written by the codec, e.g. `Long` or `List<Version>`
    pub fn type_spec(&self) -> String {
        if self.is_list() {
            format!("List<{}>", self.kind())
        } else {
            self.kind().to_string()
        }
    }

    /// Every element of this value; a scalar yields itself
    pub fn elements(&self) -> Vec<ScalarRef<'_>> {
        match self {
            Self::String(s) => vec![ScalarRef::String(s)],
            Self::Version(v) => vec![ScalarRef::Version(v)],
            Self::Long(n) => vec![ScalarRef::Long(*n)],
            Self::Double(d) => vec![ScalarRef::Double(*d)],
            Self::StringList(items) => items.iter().map(|s| ScalarRef::String(s)).collect(),
            Self::VersionList(items) => items.iter().map(ScalarRef::Version).collect(),
            Self::LongList(items) => items.iter().map(|n| ScalarRef::Long(*n)).collect(),
            Self::DoubleList(items) => items.iter().map(|d| ScalarRef::Double(*d)).collect(),
        }
    }

    /// Borrow a scalar String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow a scalar Version value
    pub fn as_version(&self) -> Option<&Version> {
        match self {
            Self::Version(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Build a list from scalar values, inferring the kind from the first one
    ///
    /// This is a heuristic, not type inference: the first element decides the
    /// list kind and every later element must agree. An empty input yields an
    /// empty String list.
    pub fn infer_list(items: Vec<AttrValue>) -> Result<Self, AttributeError> {
        let Some(first) = items.first() else {
            return Ok(Self::StringList(Vec::new()));
        };
        let expected = first.kind();

        let mismatch = |found: &AttrValue| AttributeError::HeterogeneousList {
            expected: expected.to_string(),
            found: found.type_spec(),
        };

        macro_rules! collect_as {
            ($variant:ident, $list:ident) => {{
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        AttrValue::$variant(v) => out.push(v),
                        other => return Err(mismatch(&other)),
                    }
                }
                Ok(AttrValue::$list(out))
            }};
        }

        if first.is_list() {
            return Err(mismatch(first));
        }

        match expected {
            AttrKind::String => collect_as!(String, StringList),
            AttrKind::Version => collect_as!(Version, VersionList),
            AttrKind::Long => collect_as!(Long, LongList),
            AttrKind::Double => collect_as!(Double, DoubleList),
        }
    }
}

// Empty lists compare equal whatever their declared kind, since the kind of an
// empty list cannot survive encoding.
impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty_list() && other.is_empty_list() {
            return true;
        }
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Version(a), Self::Version(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::StringList(a), Self::StringList(b)) => a == b,
            (Self::VersionList(a), Self::VersionList(b)) => a == b,
            (Self::LongList(a), Self::LongList(b)) => a == b,
            (Self::DoubleList(a), Self::DoubleList(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, raw) = encode(self);
        f.write_str(&raw)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Version> for AttrValue {
    fn from(v: Version) -> Self {
        Self::Version(v)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<f64> for AttrValue {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        Self::StringList(items)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(items: Vec<&str>) -> Self {
        Self::StringList(items.into_iter().map(String::from).collect())
    }
}

impl From<Vec<Version>> for AttrValue {
    fn from(items: Vec<Version>) -> Self {
        Self::VersionList(items)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(items: Vec<i64>) -> Self {
        Self::LongList(items)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(items: Vec<f64>) -> Self {
        Self::DoubleList(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_empty_list_is_string() {
        assert_eq!(AttrValue::LongList(vec![]).kind(), AttrKind::String);
        assert_eq!(AttrValue::LongList(vec![]).type_spec(), "List<String>");
        assert_eq!(AttrValue::LongList(vec![1]).type_spec(), "List<Long>");
    }

    #[test]
    fn test_empty_lists_are_equal() {
        assert_eq!(AttrValue::LongList(vec![]), AttrValue::StringList(vec![]));
        assert_ne!(AttrValue::LongList(vec![1]), AttrValue::StringList(vec![]));
    }

    #[test]
    fn test_infer_list_from_first_element() {
        let list = AttrValue::infer_list(vec![AttrValue::Long(1), AttrValue::Long(2)]).unwrap();
        assert_eq!(list, AttrValue::LongList(vec![1, 2]));

        let empty = AttrValue::infer_list(vec![]).unwrap();
        assert_eq!(empty.kind(), AttrKind::String);
        assert!(empty.is_list());
    }

    #[test]
    fn test_infer_list_rejects_mixed_kinds() {
        let err = AttrValue::infer_list(vec![AttrValue::Long(1), AttrValue::from("x")]).unwrap_err();
        assert_eq!(
            err,
            AttributeError::HeterogeneousList {
                expected: "Long".to_string(),
                found: "String".to_string(),
            }
        );

        let nested = AttrValue::infer_list(vec![AttrValue::LongList(vec![1])]);
        assert!(nested.is_err());
    }

    #[test]
    fn test_elements() {
        let value = AttrValue::from(vec!["a", "b"]);
        assert_eq!(
            value.elements(),
            vec![ScalarRef::String("a"), ScalarRef::String("b")]
        );
        assert_eq!(AttrValue::Long(3).elements(), vec![ScalarRef::Long(3)]);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("".parse::<AttrKind>().unwrap(), AttrKind::String);
        assert_eq!("Version".parse::<AttrKind>().unwrap(), AttrKind::Version);
        assert!(matches!(
            "Integer".parse::<AttrKind>(),
            Err(AttributeError::UnknownType(_))
        ));
    }
}
