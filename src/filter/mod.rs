// src/filter/mod.rs

//! LDAP-style filters over capability attributes
//!
//! # Grammar
//!
//! ```text
//! filter   := '(' body ')'
//! body     := '&' filter+ | '|' filter+ | '!' filter | item
//! item     := attr '=' value      equality, or substring when value has '*'
//!           | attr '=*'           presence
//!           | attr '~=' value     approximate
//!           | attr '>=' value
//!           | attr '<=' value
//! ```
//!
//! Inside a value, `\(`, `\)`, `\*` and `\\` stand for the literal character.
//! Comparison semantics follow the attribute's kind; see [`Filter::matches`].

mod matching;
mod parser;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Filter parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid filter '{filter}' at position {position}: {message}")]
pub struct FilterError {
    pub filter: String,
    pub position: usize,
    pub message: String,
}

/// Comparison operator of a simple filter item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

impl CompareOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Approx => "~=",
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
        }
    }
}

/// A parsed filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare {
        attr: String,
        op: CompareOp,
        value: String,
    },
    /// Wildcard match; segments sit between the `*`s, so a leading or
    /// trailing empty segment means the pattern is open on that side
    Substring { attr: String, segments: Vec<String> },
    Present(String),
}

impl Filter {
    /// Parse a filter string
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        parser::Parser::new(input).parse()
    }

    /// Wrap this filter in a negation
    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(children) => {
                f.write_str("(&")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Filter::Or(children) => {
                f.write_str("(|")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Filter::Not(child) => write!(f, "(!{})", child),
            Filter::Compare { attr, op, value } => {
                write!(f, "({}{}{})", attr, op.symbol(), escape_value(value))
            }
            Filter::Substring { attr, segments } => {
                let pattern = segments
                    .iter()
                    .map(|s| escape_value(s))
                    .collect::<Vec<_>>()
                    .join("*");
                write!(f, "({}={})", attr, pattern)
            }
            Filter::Present(attr) => write!(f, "({}=*)", attr),
        }
    }
}

/// Escape a literal so it can be embedded as a filter operand
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '(' | ')' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_canonical() {
        let filter = Filter::parse(" ( & (a=1) (| (b>=2) (c~=x) ) (!(d=*)) ) ").unwrap();
        assert_eq!(filter.to_string(), "(&(a=1)(|(b>=2)(c~=x))(!(d=*)))");
    }

    #[test]
    fn test_display_reparses() {
        let original = "(&(name=a\\(b\\)\\*)(path=/usr/*/lib*))";
        let filter = Filter::parse(original).unwrap();
        assert_eq!(filter.to_string(), original);
        assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value("a(b)*c\\"), "a\\(b\\)\\*c\\\\");
        assert_eq!(escape_value("plain"), "plain");
    }

    #[test]
    fn test_negate() {
        let filter = Filter::parse("(a=1)").unwrap().negate();
        assert_eq!(filter.to_string(), "(!(a=1))");
    }
}
