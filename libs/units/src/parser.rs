//! Unit-expression parser.
//!
//! Grammar (whitespace is not allowed inside a unit expression):
//!
//! ```text
//! expr    := factor (('*' | '·' | '/') factor)*
//! factor  := primary ('^' '-'? DIGITS)?
//! primary := SYMBOL | INTEGER | '(' expr ')'
//! ```
//!
//! In [`ScanMode::Strict`] the whole input must be a unit expression and any
//! deviation is an error. In [`ScanMode::Lenient`] the parser reads the longest
//! prefix that forms a unit expression made of known symbols and stops before
//! anything else, which is how unit suffixes after numeric literals are read.

use crate::ast::{Atom, Term, UnitExpr};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Lenient,
    Strict,
}

/// Parses a complete unit expression. Symbols are not checked against a unit
/// system here.
pub fn parse(text: &str) -> Result<UnitExpr> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Syntax {
            pos: 0,
            message: "empty unit expression",
        });
    }
    let mut parser = Parser::new(trimmed, ScanMode::Strict, |_: &str| true);
    let expr = parser.expr()?;
    if parser.pos != trimmed.len() {
        return Err(Error::Syntax {
            pos: parser.pos,
            message: "unexpected trailing input",
        });
    }
    Ok(expr)
}

/// Validates unit-expression syntax without resolving symbols.
pub fn validate(text: &str) -> Result<()> {
    parse(text).map(|_| ())
}

/// Reads the longest unit-expression prefix of `text` whose symbols satisfy
/// `is_known`. Returns the expression and the number of bytes consumed.
pub fn scan<F>(text: &str, is_known: F) -> Option<(UnitExpr, usize)>
where
    F: Fn(&str) -> bool,
{
    if !text.chars().next().is_some_and(is_symbol_start) {
        return None;
    }
    let mut parser = Parser::new(text, ScanMode::Lenient, is_known);
    let expr = parser.expr().ok()?;
    Some((expr, parser.pos))
}

pub(crate) fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || c == '°'
}

fn is_symbol_continue(c: char) -> bool {
    c.is_alphabetic() || c == '°'
}

struct Parser<'a, F> {
    text: &'a str,
    pos: usize,
    mode: ScanMode,
    is_known: F,
}

impl<'a, F> Parser<'a, F>
where
    F: Fn(&str) -> bool,
{
    fn new(text: &'a str, mode: ScanMode, is_known: F) -> Self {
        Self {
            text,
            pos: 0,
            mode,
            is_known,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn syntax(&self, message: &'static str) -> Error {
        Error::Syntax {
            pos: self.pos,
            message,
        }
    }

    fn expr(&mut self) -> Result<UnitExpr> {
        let mut out = UnitExpr::one();
        out.numerator.push(self.factor()?);

        loop {
            let save = self.pos;
            let into_denominator = match self.peek() {
                Some('*') | Some('·') => false,
                Some('/') => true,
                _ => break,
            };
            self.bump();

            if self.mode == ScanMode::Lenient {
                let continues = self
                    .peek()
                    .is_some_and(|c| is_symbol_start(c) || c == '(');
                if !continues {
                    self.pos = save;
                    break;
                }
            }

            match self.factor() {
                Ok(factor) if into_denominator => out.denominator.push(factor),
                Ok(factor) => out.numerator.push(factor),
                Err(_) if self.mode == ScanMode::Lenient => {
                    self.pos = save;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(out)
    }

    fn factor(&mut self) -> Result<(Term, i8)> {
        let term = self.primary()?;
        if self.peek() != Some('^') {
            return Ok((term, 1));
        }

        let save = self.pos;
        self.bump();
        let negative = if self.peek() == Some('-') {
            self.bump();
            true
        } else {
            false
        };

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if start == self.pos {
            if self.mode == ScanMode::Lenient {
                self.pos = save;
                return Ok((term, 1));
            }
            return Err(self.syntax("expected exponent digits after '^'"));
        }

        let magnitude: i8 = self.text[start..self.pos]
            .parse()
            .map_err(|_| self.syntax("exponent out of range"))?;
        let exp = if negative { -magnitude } else { magnitude };
        if exp == 0 {
            return Err(self.syntax("zero exponent"));
        }
        Ok((term, exp))
    }

    fn primary(&mut self) -> Result<Term> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.expr()?;
                if self.peek() != Some(')') {
                    return Err(self.syntax("missing ')' in unit expression"));
                }
                self.bump();
                Ok(Term::Group(Box::new(inner)))
            }
            Some(c) if c.is_ascii_digit() && self.mode == ScanMode::Strict => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                let n: u64 = self.text[start..self.pos]
                    .parse()
                    .map_err(|_| self.syntax("integer out of range"))?;
                if n == 0 {
                    return Err(self.syntax("zero is not a unit factor"));
                }
                Ok(Term::Atom(Atom::Integer(n)))
            }
            Some(c) if is_symbol_start(c) => {
                let start = self.pos;
                self.bump();
                while self.peek().is_some_and(is_symbol_continue) {
                    self.bump();
                }
                let sym = &self.text[start..self.pos];
                if self.mode == ScanMode::Lenient && !(self.is_known)(sym) {
                    self.pos = start;
                    return Err(Error::UnknownUnit(sym.to_string()));
                }
                Ok(Term::Atom(Atom::Symbol(sym.to_string())))
            }
            _ => Err(self.syntax("expected unit symbol")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Term {
        Term::Atom(Atom::Symbol(s.into()))
    }

    #[test]
    fn parses_quotient_with_exponent() {
        let e = parse("m/s^2").unwrap();
        assert_eq!(e.numerator, vec![(sym("m"), 1)]);
        assert_eq!(e.denominator, vec![(sym("s"), 2)]);
    }

    #[test]
    fn parses_groups_and_negative_exponents() {
        let e = parse("Kg/(m*s^-2)").unwrap();
        assert_eq!(e.numerator, vec![(sym("Kg"), 1)]);
        assert!(matches!(e.denominator[0].0, Term::Group(_)));
    }

    #[test]
    fn strict_mode_rejects_trailing_operator() {
        assert!(parse("m/").is_err());
        assert!(parse("m^").is_err());
        assert!(parse("(m").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn lenient_scan_stops_before_non_unit_input() {
        let known = |s: &str| matches!(s, "m" | "s" | "Kg");
        let (e, used) = scan("m/s ^ 2", known).unwrap();
        assert_eq!(used, 3);
        assert_eq!(e.denominator, vec![(sym("s"), 1)]);

        let (_, used) = scan("m/2", known).unwrap();
        assert_eq!(used, 1);

        let (_, used) = scan("m^x", known).unwrap();
        assert_eq!(used, 1);

        assert!(scan("x", known).is_none());
        assert!(scan("(m)", known).is_none());
    }

    #[test]
    fn lenient_scan_backs_off_unknown_second_factor() {
        let known = |s: &str| s == "m";
        let (_, used) = scan("m*q", known).unwrap();
        assert_eq!(used, 1);
    }
}
