//! Unit expression grammar: tokenizer, parser and canonical formatting.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! expr   := factor (('*' | '/') factor)*
//! factor := atom (('^' | '**') exponent)?
//! atom   := SYMBOL | '1' | '(' expr ')'
//! ```
//!
//! Operators are left-associative, so `a/b*c` is `a*c/b`. Symbols are not
//! resolved here; that is the registry's job.
use crate::error::{ParseErrorKind, UnitParseError};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed unit expression, mapping each symbol to its exponent.
/// Example: "kg*m/s^2" -> { "kg": 1, "m": 1, "s": -2 }
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedUnit {
    terms: BTreeMap<String, i32>,
}

impl ParsedUnit {
    fn symbol(name: &str) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(name.to_string(), 1);
        Self { terms }
    }

    /// Iterates `(symbol, exponent)` pairs in symbol order, skipping zeros.
    pub fn terms(&self) -> impl Iterator<Item = (&str, i32)> {
        self.terms
            .iter()
            .filter(|&(_, &e)| e != 0)
            .map(|(s, &e)| (s.as_str(), e))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.terms().next().is_none()
    }

    /// Merges another `ParsedUnit` into this one, effectively multiplying them.
    /// Leaves `self` unchanged if an exponent would leave the `i32` range.
    pub fn multiply(&mut self, other: &Self) -> Result<(), ParseErrorKind> {
        self.merge(other, i32::checked_add)
    }

    /// Merges another `ParsedUnit` into this one, effectively dividing by it.
    pub fn divide(&mut self, other: &Self) -> Result<(), ParseErrorKind> {
        self.merge(other, i32::checked_sub)
    }

    pub fn powi(&mut self, n: i32) -> Result<(), ParseErrorKind> {
        let mut raised = self.terms.clone();
        for (base, exponent) in raised.iter_mut() {
            *exponent = exponent
                .checked_mul(n)
                .ok_or_else(|| ParseErrorKind::ExponentOverflow { symbol: base.clone() })?;
        }
        self.terms = raised;
        Ok(())
    }

    fn merge(&mut self, other: &Self, combine: fn(i32, i32) -> Option<i32>) -> Result<(), ParseErrorKind> {
        let mut merged = self.terms.clone();
        for (base, &exponent) in &other.terms {
            let slot = merged.entry(base.clone()).or_insert(0);
            *slot = combine(*slot, exponent)
                .ok_or_else(|| ParseErrorKind::ExponentOverflow { symbol: base.clone() })?;
        }
        self.terms = merged;
        Ok(())
    }
}

impl fmt::Display for ParsedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_terms(self.terms().map(|(s, e)| (s.to_string(), e))))
    }
}

/// Formats `(name, exponent)` pairs into canonical text, preserving the given
/// order within numerator and denominator.
///
/// `[(kg,1),(m,1),(s,-2)]` -> `kg*m/s^2`, `[(kg,1),(m,-1),(s,-2)]` -> `kg/(m*s^2)`.
pub fn format_terms<I>(terms: I) -> String
where
    I: IntoIterator<Item = (String, i32)>,
{
    let (num, den): (Vec<_>, Vec<_>) = terms
        .into_iter()
        .filter(|(_, exp)| *exp != 0)
        .partition(|(_, exp)| *exp > 0);

    let format_term = |(base, exp): (String, i32)| {
        if exp.unsigned_abs() == 1 {
            base
        } else {
            format!("{}^{}", base, exp.unsigned_abs())
        }
    };

    let den_count = den.len();
    let num_str = if num.is_empty() {
        "1".to_string()
    } else {
        num.into_iter().map(format_term).collect::<Vec<_>>().join("*")
    };
    let den_str = den.into_iter().map(format_term).collect::<Vec<_>>().join("*");

    match den_count {
        0 => num_str,
        1 => format!("{}/{}", num_str, den_str),
        _ => format!("{}/({})", num_str, den_str),
    }
}

/// Parses a unit expression into symbol exponents.
pub fn parse_expression(expr: &str) -> Result<ParsedUnit, UnitParseError> {
    let fail = |kind| UnitParseError {
        expr: expr.to_string(),
        kind,
    };

    if expr.trim().is_empty() {
        return Err(fail(ParseErrorKind::Empty));
    }
    let tokens = tokenize(expr).map_err(fail)?;
    let mut parser = Parser { tokens, pos: 0 };
    let parsed = parser.expression().map_err(fail)?;

    if let Some(tok) = parser.peek() {
        let kind = match tok.kind {
            TokenKind::RParen => ParseErrorKind::UnbalancedParen { pos: tok.pos },
            _ => ParseErrorKind::UnexpectedToken {
                token: tok.kind.to_string(),
                pos: tok.pos,
            },
        };
        return Err(fail(kind));
    }
    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Number(String),
    Mul,
    Div,
    Pow,
    Minus,
    Plus,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) | TokenKind::Number(s) => f.write_str(s),
            TokenKind::Mul => f.write_str("*"),
            TokenKind::Div => f.write_str("/"),
            TokenKind::Pow => f.write_str("^"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '%' | '°')
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ParseErrorKind> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '*' => {
                if chars.next_if(|&(_, n)| n == '*').is_some() {
                    TokenKind::Pow
                } else {
                    TokenKind::Mul
                }
            }
            '^' => TokenKind::Pow,
            '/' => TokenKind::Div,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut text = c.to_string();
                while let Some((_, n)) = chars.next_if(|&(_, n)| n.is_ascii_digit() || n == '.') {
                    text.push(n);
                }
                TokenKind::Number(text)
            }
            c if is_symbol_char(c) => {
                let mut text = c.to_string();
                while let Some((_, n)) = chars.next_if(|&(_, n)| is_symbol_char(n)) {
                    text.push(n);
                }
                TokenKind::Ident(text)
            }
            other => return Err(ParseErrorKind::UnexpectedChar { ch: other, pos }),
        };
        tokens.push(Token { kind, pos });
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ParseErrorKind> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(ParseErrorKind::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn expression(&mut self) -> Result<ParsedUnit, ParseErrorKind> {
        let mut acc = self.factor()?;
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Mul) => {
                    self.pos += 1;
                    acc.multiply(&self.factor()?)?;
                }
                Some(TokenKind::Div) => {
                    self.pos += 1;
                    acc.divide(&self.factor()?)?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn factor(&mut self) -> Result<ParsedUnit, ParseErrorKind> {
        let mut base = self.atom()?;
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Pow)) {
            self.pos += 1;
            base.powi(self.exponent()?)?;
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<ParsedUnit, ParseErrorKind> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Ident(name) if name == "dimensionless" => Ok(ParsedUnit::default()),
            TokenKind::Ident(name) => Ok(ParsedUnit::symbol(&name)),
            TokenKind::Number(literal) => match literal.parse::<f64>() {
                Ok(v) if v == 1.0 => Ok(ParsedUnit::default()),
                _ => Err(ParseErrorKind::UnsupportedNumber { literal }),
            },
            TokenKind::LParen => {
                let inner = self.expression()?;
                match self.next() {
                    Ok(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    _ => Err(ParseErrorKind::UnbalancedParen { pos: tok.pos }),
                }
            }
            TokenKind::RParen => Err(ParseErrorKind::UnbalancedParen { pos: tok.pos }),
            other => Err(ParseErrorKind::UnexpectedToken {
                token: other.to_string(),
                pos: tok.pos,
            }),
        }
    }

    /// `[+|-] INT`, optionally wrapped in parentheses: `^-2`, `**(-2)`.
    fn exponent(&mut self) -> Result<i32, ParseErrorKind> {
        let parenthesized = matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen));
        if parenthesized {
            self.pos += 1;
        }

        let mut sign = 1;
        let mut text = String::new();
        let mut tok = self.next()?;
        if matches!(tok.kind, TokenKind::Minus | TokenKind::Plus) {
            if tok.kind == TokenKind::Minus {
                sign = -1;
                text.push('-');
            }
            tok = self.next()?;
        }

        let value = match tok.kind {
            TokenKind::Number(digits) => {
                text.push_str(&digits);
                digits
                    .parse::<i32>()
                    .map_err(|_| ParseErrorKind::InvalidExponent { text: text.clone() })?
            }
            other => {
                text.push_str(&other.to_string());
                return Err(ParseErrorKind::InvalidExponent { text });
            }
        };

        if parenthesized {
            match self.next() {
                Ok(Token { kind: TokenKind::RParen, .. }) => {}
                _ => return Err(ParseErrorKind::UnbalancedParen { pos: tok.pos }),
            }
        }
        Ok(sign * value)
    }
}

// --- Unit Parser Test Suite ---
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("psi", "psi")]
    #[case("m*s", "m*s")]
    #[case("s*m", "m*s")] // Canonical reordering
    #[case("m/s", "m/s")]
    #[case("m/s^2", "m/s^2")]
    #[case("N/m^2", "N/m^2")]
    #[case("kg*m/s^2", "kg*m/s^2")]
    #[case("kg / m / s**2", "kg/(m*s^2)")]
    #[case("m*m", "m^2")] // Aggregation
    #[case("m^2/m", "m")] // Cancellation
    #[case("m/m", "1")] // Full cancellation
    #[case("1/s", "1/s")]
    #[case("s^-1", "1/s")]
    #[case("s**(-2)", "1/s^2")]
    #[case("m/s*s", "m")] // Left-associative
    #[case("m/(s*s)", "m/s^2")]
    #[case("(m/s)^2", "m^2/s^2")]
    #[case("m^1", "m")]
    #[case("dimensionless", "1")]
    fn test_expression_parsing_and_canonicalization(#[case] input: &str, #[case] expected: &str) {
        let parsed = parse_expression(input).unwrap();
        assert_eq!(parsed.to_string(), expected);
    }

    #[rstest]
    #[case("", ParseErrorKind::Empty)]
    #[case("   ", ParseErrorKind::Empty)]
    #[case("m//s", ParseErrorKind::UnexpectedToken { token: "/".into(), pos: 2 })]
    #[case("m^x", ParseErrorKind::InvalidExponent { text: "x".into() })]
    #[case("m^1.5", ParseErrorKind::InvalidExponent { text: "1.5".into() })]
    #[case("m$", ParseErrorKind::UnexpectedChar { ch: '$', pos: 1 })]
    #[case("m*", ParseErrorKind::UnexpectedEnd)]
    #[case("(m/s", ParseErrorKind::UnbalancedParen { pos: 0 })]
    #[case("m/s)", ParseErrorKind::UnbalancedParen { pos: 3 })]
    #[case("1000*m", ParseErrorKind::UnsupportedNumber { literal: "1000".into() })]
    #[case("m^2147483648", ParseErrorKind::InvalidExponent { text: "2147483648".into() })]
    #[case("(m^65536)^65536", ParseErrorKind::ExponentOverflow { symbol: "m".into() })]
    #[case("m^2147483647*m", ParseErrorKind::ExponentOverflow { symbol: "m".into() })]
    #[case("s^-2147483647/s^2", ParseErrorKind::ExponentOverflow { symbol: "s".into() })]
    fn test_expression_rejects_malformed(#[case] input: &str, #[case] expected: ParseErrorKind) {
        let err = parse_expression(input).unwrap_err();
        assert_eq!(err.kind, expected, "input: '{}'", input);
        assert_eq!(err.expr, input);
    }

    #[test]
    fn test_adjacent_symbols_require_operator() {
        let err = parse_expression("kg m").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn test_multiplication_and_division() {
        let mut force = parse_expression("kg*m/s^2").unwrap();
        let time = parse_expression("s").unwrap();
        force.multiply(&time).unwrap();
        assert_eq!(force.to_string(), "kg*m/s");
        force.divide(&parse_expression("kg").unwrap()).unwrap();
        assert_eq!(force.to_string(), "m/s");
    }

    #[test]
    fn test_format_terms_groups_denominator() {
        let terms = vec![("kg".to_string(), 1), ("m".to_string(), -1), ("s".to_string(), -2)];
        assert_eq!(format_terms(terms), "kg/(m*s^2)");
        assert_eq!(format_terms(Vec::new()), "1");
    }
}
