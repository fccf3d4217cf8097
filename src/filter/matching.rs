// src/filter/matching.rs

//! Filter evaluation against typed attribute maps

use super::{CompareOp, Filter};
use crate::attribute::{Attributes, ScalarRef};
use crate::version::Version;
use std::cmp::Ordering;

impl Filter {
    /// Evaluate this filter against an attribute map
    ///
    /// - The operand is read with the attribute's kind: lexicographic for
    ///   String, numeric for Long and Double, version order for Version. An
    ///   operand that does not parse as that kind never matches.
    /// - A missing attribute fails every comparison and the presence test.
    /// - A list attribute matches when any element does.
    /// - Substring patterns only apply to String elements.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Filter::And(children) => children.iter().all(|f| f.matches(attributes)),
            Filter::Or(children) => children.iter().any(|f| f.matches(attributes)),
            Filter::Not(child) => !child.matches(attributes),
            Filter::Present(attr) => attributes.contains_key(attr),
            Filter::Compare { attr, op, value } => attributes.get(attr).is_some_and(|v| {
                v.elements()
                    .into_iter()
                    .any(|scalar| compare_scalar(scalar, *op, value))
            }),
            Filter::Substring { attr, segments } => attributes.get(attr).is_some_and(|v| {
                v.elements().into_iter().any(|scalar| match scalar {
                    ScalarRef::String(s) => wildcard_match(s, segments),
                    _ => false,
                })
            }),
        }
    }
}

fn compare_scalar(scalar: ScalarRef<'_>, op: CompareOp, operand: &str) -> bool {
    match scalar {
        ScalarRef::String(s) => match op {
            CompareOp::Equal => s == operand,
            CompareOp::Approx => normalize(s) == normalize(operand),
            CompareOp::GreaterEq => s >= operand,
            CompareOp::LessEq => s <= operand,
        },
        ScalarRef::Long(n) => match operand.trim().parse::<i64>() {
            Ok(other) => ordering_satisfies(n.cmp(&other), op),
            Err(_) => false,
        },
        ScalarRef::Double(d) => match operand.trim().parse::<f64>() {
            Ok(other) => d
                .partial_cmp(&other)
                .is_some_and(|ord| ordering_satisfies(ord, op)),
            Err(_) => false,
        },
        ScalarRef::Version(v) => match Version::parse(operand) {
            Ok(other) => ordering_satisfies(v.cmp(&other), op),
            Err(_) => false,
        },
    }
}

#[inline]
fn ordering_satisfies(ord: Ordering, op: CompareOp) -> bool {
    match op {
        CompareOp::Equal | CompareOp::Approx => ord == Ordering::Equal,
        CompareOp::GreaterEq => ord != Ordering::Less,
        CompareOp::LessEq => ord != Ordering::Greater,
    }
}

/// Case- and whitespace-insensitive form for approximate matching
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Match `s` against wildcard segments (`*` sits between consecutive segments)
fn wildcard_match(s: &str, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    let Some(remaining) = s.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };

    let mut remaining = remaining;
    for segment in middle {
        match remaining.find(segment.as_str()) {
            Some(idx) => remaining = &remaining[idx + segment.len()..],
            None => return false,
        }
    }

    remaining.ends_with(last.as_str())
}
