// src/filter/parser.rs

//! Recursive-descent filter parser

use super::{CompareOp, Filter, FilterError};

pub(super) struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    pub(super) fn parse(mut self) -> Result<Filter, FilterError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty filter"));
        }

        let filter = self.parse_filter()?;

        self.skip_whitespace();
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing characters"));
        }
        Ok(filter)
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterError> {
        self.expect('(')?;
        self.skip_whitespace();

        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_whitespace();
                let child = self.parse_filter()?;
                Filter::Not(Box::new(child))
            }
            Some(_) => self.parse_item()?,
            None => return Err(self.error("unexpected end of filter")),
        };

        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('(') => children.push(self.parse_filter()?),
                _ => break,
            }
        }

        if children.is_empty() {
            return Err(self.error("operator requires at least one operand"));
        }
        Ok(children)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterError> {
        let attr = self.parse_attr()?;

        let op = match (self.peek(), self.peek_at(1)) {
            (Some('='), _) => {
                self.pos += 1;
                CompareOp::Equal
            }
            (Some('~'), Some('=')) => {
                self.pos += 2;
                CompareOp::Approx
            }
            (Some('>'), Some('=')) => {
                self.pos += 2;
                CompareOp::GreaterEq
            }
            (Some('<'), Some('=')) => {
                self.pos += 2;
                CompareOp::LessEq
            }
            _ => return Err(self.error("expected one of '=', '~=', '>=', '<='")),
        };

        let segments = self.parse_value()?;

        if op == CompareOp::Equal && segments.len() > 1 {
            if segments.len() == 2 && segments.iter().all(String::is_empty) {
                return Ok(Filter::Present(attr));
            }
            return Ok(Filter::Substring { attr, segments });
        }

        if segments.len() > 1 {
            return Err(self.error("wildcards are only allowed with '='"));
        }

        let value = segments.into_iter().next().unwrap_or_default();
        Ok(Filter::Compare { attr, op, value })
    }

    fn parse_attr(&mut self) -> Result<String, FilterError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '=' | '~' | '<' | '>' => break,
                '(' | ')' | '*' | '\\' => {
                    return Err(self.error(&format!("invalid character '{}' in attribute", c)));
                }
                _ => self.pos += 1,
            }
        }

        let attr: String = self.chars[start..self.pos].iter().collect();
        let attr = attr.trim();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }
        Ok(attr.to_string())
    }

    /// Read an operand up to the closing paren, splitting on unescaped '*'
    fn parse_value(&mut self) -> Result<Vec<String>, FilterError> {
        let mut segments = Vec::new();
        let mut current = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            current.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("dangling escape")),
                    }
                }
                Some('*') => {
                    segments.push(std::mem::take(&mut current));
                    self.pos += 1;
                }
                Some(c) => {
                    current.push(c);
                    self.pos += 1;
                }
            }
        }

        segments.push(current);
        Ok(segments)
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(&format!("expected '{}'", expected))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: &str) -> FilterError {
        FilterError {
            filter: self.input.to_string(),
            position: self.pos,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{CompareOp, Filter};

    fn item(attr: &str, op: CompareOp, value: &str) -> Filter {
        Filter::Compare {
            attr: attr.to_string(),
            op,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_parse_simple_items() {
        assert_eq!(
            Filter::parse("(pkg=org.acme.pool)").unwrap(),
            item("pkg", CompareOp::Equal, "org.acme.pool")
        );
        assert_eq!(
            Filter::parse("(version>=1.0)").unwrap(),
            item("version", CompareOp::GreaterEq, "1.0")
        );
        assert_eq!(
            Filter::parse("(version<=2)").unwrap(),
            item("version", CompareOp::LessEq, "2")
        );
        assert_eq!(
            Filter::parse("(name~=Acme Pool)").unwrap(),
            item("name", CompareOp::Approx, "Acme Pool")
        );
    }

    #[test]
    fn test_parse_presence_and_substring() {
        assert_eq!(
            Filter::parse("(mime=*)").unwrap(),
            Filter::Present("mime".to_string())
        );
        assert_eq!(
            Filter::parse("(pkg=org.acme.*)").unwrap(),
            Filter::Substring {
                attr: "pkg".to_string(),
                segments: vec!["org.acme.".to_string(), String::new()],
            }
        );
        // An escaped star is a literal, not a wildcard
        assert_eq!(
            Filter::parse("(pkg=a\\*)").unwrap(),
            item("pkg", CompareOp::Equal, "a*")
        );
    }

    #[test]
    fn test_parse_compound() {
        let filter = Filter::parse("(&(a=1)(|(b=2)(c=3))(!(d=4)))").unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![
                item("a", CompareOp::Equal, "1"),
                Filter::Or(vec![
                    item("b", CompareOp::Equal, "2"),
                    item("c", CompareOp::Equal, "3"),
                ]),
                Filter::Not(Box::new(item("d", CompareOp::Equal, "4"))),
            ])
        );
    }

    #[test]
    fn test_parse_keeps_value_whitespace() {
        assert_eq!(
            Filter::parse("( name = a b )").unwrap(),
            item("name", CompareOp::Equal, " a b ")
        );
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "   ",
            "pkg=a",
            "(pkg=a",
            "(pkg=a))",
            "(=a)",
            "(pkg>1)",
            "(&)",
            "(!)",
            "(pkg=a(b)",
            "(pkg>=a*)",
            "(pkg=a\\",
            "(a=1)(b=2)",
        ] {
            assert!(Filter::parse(bad).is_err(), "expected error for {:?}", bad);
        }
    }

    #[test]
    fn test_error_reports_position() {
        let err = Filter::parse("(pkg>1)").unwrap_err();
        assert_eq!(err.position, 4);
        assert_eq!(err.filter, "(pkg>1)");
    }
}
