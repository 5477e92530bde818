// Typed literals for configuration values: ints, floats, booleans, None,
// quoted strings and (nested) lists. Nothing is ever evaluated.

use serde::Serialize;
use std::fmt;

use crate::core::error::{Result, SummaryError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
}

impl Literal {
    /// Parse `input` as a literal. A bare comma-separated sequence is a list,
    /// as is anything in `[...]` or `(..., ...)`.
    pub fn parse(input: &str) -> Result<Literal> {
        let mut parser = Parser { src: input, pos: 0 };
        let first = parser.value()?;
        parser.skip_ws();
        let value = if parser.eat(',') {
            let mut items = vec![first];
            items.extend(parser.items(None)?);
            Literal::List(items)
        } else {
            first
        };
        parser.skip_ws();
        if parser.pos < parser.src.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(value)
    }

    /// Parse `input`, keeping it as a plain string when it is not a literal.
    pub fn parse_or_string(input: &str) -> Literal {
        Literal::parse(input).unwrap_or_else(|_| Literal::Str(input.to_string()))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => f.write_str(s),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, msg: &str) -> SummaryError {
        SummaryError::ParseError(format!("{} at offset {} in {:?}", msg, self.pos, self.src))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn value(&mut self) -> Result<Literal> {
        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                Ok(Literal::List(self.items(Some(']'))?))
            }
            Some('(') => {
                self.pos += 1;
                let start = self.pos;
                let items = self.items(Some(')'))?;
                // `(x)` is grouping, `(x,)` is a one-element list
                let inner = self.src[start..self.pos - 1].trim_end();
                if items.len() == 1 && !inner.ends_with(',') {
                    Ok(items.into_iter().next().unwrap_or(Literal::None))
                } else {
                    Ok(Literal::List(items))
                }
            }
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(q)
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Comma-separated values up to `close`, or to the end of input when
    /// `close` is `None`. A trailing comma is allowed.
    fn items(&mut self, close: Option<char>) -> Result<Vec<Literal>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match (close, self.peek()) {
                (Some(c), Some(p)) if c == p => {
                    self.pos += 1;
                    return Ok(items);
                }
                (None, None) => return Ok(items),
                (Some(_), None) => return Err(self.error("unterminated list")),
                _ => {}
            }
            items.push(self.value()?);
            self.skip_ws();
            if !self.eat(',') {
                match (close, self.peek()) {
                    (Some(c), Some(p)) if c == p => {}
                    (None, None) => {}
                    _ => return Err(self.error("expected ','")),
                }
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Literal> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Literal::Str(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<Literal> {
        let start = self.pos;
        self.bump();
        while let Some(c) = self.peek() {
            let after_exponent = matches!(self.src[..self.pos].chars().last(), Some('e' | 'E'));
            let exponent_sign = matches!(c, '-' | '+') && after_exponent;
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_') || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.src[start..self.pos].chars().filter(|&c| c != '_').collect();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Literal::Int(i));
        }
        text.parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| self.error("invalid number"))
    }

    fn word(&mut self) -> Result<Literal> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += self.peek().map_or(1, char::len_utf8);
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => {
                self.pos = start;
                Err(self.error("unquoted word"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(Literal::parse("12").unwrap(), Literal::Int(12));
        assert_eq!(Literal::parse(" -3 ").unwrap(), Literal::Int(-3));
        assert_eq!(Literal::parse("0.5").unwrap(), Literal::Float(0.5));
        assert_eq!(Literal::parse("1e-3").unwrap(), Literal::Float(1e-3));
        assert_eq!(Literal::parse("True").unwrap(), Literal::Bool(true));
        assert_eq!(Literal::parse("None").unwrap(), Literal::None);
        assert_eq!(Literal::parse("'log'").unwrap(), Literal::Str("log".to_string()));
        assert_eq!(Literal::parse(r#""a \"b\"""#).unwrap(), Literal::Str("a \"b\"".to_string()));
    }

    #[test]
    fn test_lists() {
        let ints = Literal::List(vec![Literal::Int(1), Literal::Int(2)]);
        assert_eq!(Literal::parse("[1, 2]").unwrap(), ints);
        assert_eq!(Literal::parse("1, 2").unwrap(), ints);
        assert_eq!(Literal::parse("(1, 2,)").unwrap(), ints);
        assert_eq!(Literal::parse("(2)").unwrap(), Literal::Int(2));
        assert_eq!(Literal::parse("(2,)").unwrap(), Literal::List(vec![Literal::Int(2)]));
        assert_eq!(
            Literal::parse("[1, (2, [3, 4])]").unwrap(),
            Literal::List(vec![
                Literal::Int(1),
                Literal::List(vec![
                    Literal::Int(2),
                    Literal::List(vec![Literal::Int(3), Literal::Int(4)])
                ]),
            ])
        );
        assert_eq!(Literal::parse("[]").unwrap(), Literal::List(vec![]));
    }

    #[test]
    fn test_multibyte_whitespace() {
        let ints = Literal::List(vec![Literal::Int(1), Literal::Int(2)]);
        assert_eq!(Literal::parse("[1,\u{a0}2]").unwrap(), ints);
        assert_eq!(Literal::parse("\u{3000}1,\u{2003}2\u{a0}").unwrap(), ints);
        assert_eq!(Literal::parse("\u{3000}2").unwrap(), Literal::Int(2));
        assert!(Literal::parse("[1,\u{a0}x]").is_err());
    }

    #[test]
    fn test_never_evaluates_expressions() {
        assert!(Literal::parse("__import__('os')").is_err());
        assert!(Literal::parse("1 + 1").is_err());
        assert!(Literal::parse("[1, 2").is_err());
        assert!(Literal::parse("'open").is_err());
        assert!(Literal::parse("").is_err());
    }

    #[test]
    fn test_parse_or_string() {
        assert_eq!(Literal::parse_or_string("log"), Literal::Str("log".to_string()));
        assert_eq!(
            Literal::parse_or_string("L1:GDS-CALIB_STRAIN"),
            Literal::Str("L1:GDS-CALIB_STRAIN".to_string())
        );
        assert_eq!(Literal::parse_or_string("[1e-24, 1e-20]").as_list().map(<[_]>::len), Some(2));
    }
}
