//! Token scanner
//!
//! Splits command text into lexical items: parentheses, operator spellings,
//! numeric literals, identifiers and punctuation. Whitespace between items is
//! skipped. Positions are byte offsets into the scanned text.

use crate::error::{Error, Result};
use crate::token::OperatorKind;

/// How the scanner treats input it does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Report `Ok(None)` and leave the position untouched.
    #[default]
    Lenient,
    /// Report a lexical error.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub mode: ScanMode,
    /// Accept `,` as the decimal separator when a digit follows it.
    pub decimal_comma: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mode: ScanMode::Lenient,
            decimal_comma: true,
        }
    }
}

/// A lexical item.
#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme<'a> {
    ParenOpen,
    ParenClose,
    /// Operator in its binary spelling (or `!`).
    Operator(OperatorKind),
    Number(f64),
    /// A numeric literal that could not be converted; carries the text.
    Malformed(&'a str),
    Identifier(&'a str),
    /// One of `, [ ] ; { } .`
    Punct(char),
}

/// Result of scanning one numeric literal.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberScan {
    /// Converted value, or the failing substring.
    pub value: std::result::Result<f64, String>,
    /// Bytes consumed.
    pub len: usize,
}

pub struct Scanner<'a> {
    text: &'a str,
    position: usize,
    options: ScanOptions,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, options: ScanOptions) -> Self {
        Self {
            text,
            position: 0,
            options,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.text.len());
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.text.len()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn advance(&mut self, bytes: usize) {
        self.set_position(self.position + bytes);
    }

    /// Consumes `c` if it is the next character.
    pub fn eat(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.advance(c.len_utf8());
            true
        } else {
            false
        }
    }

    pub fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.position += rest.len() - trimmed.len();
    }

    /// Reads an identifier at the current position without skipping
    /// whitespace first.
    pub fn identifier(&mut self) -> Option<&'a str> {
        let len = identifier_len(self.rest());
        if len == 0 {
            return None;
        }
        let start = self.position;
        self.position += len;
        Some(&self.text[start..self.position])
    }

    /// Skips whitespace and reads the next lexical item.
    ///
    /// `Ok(None)` means end of input, or unrecognized input in lenient mode.
    pub fn next_lexeme(&mut self) -> Result<Option<Lexeme<'a>>> {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Ok(None);
        };

        let lexeme = match c {
            '(' => {
                self.advance(1);
                Lexeme::ParenOpen
            }
            ')' => {
                self.advance(1);
                Lexeme::ParenClose
            }
            ',' | '[' | ']' | ';' | '{' | '}' | '.' => {
                self.advance(1);
                Lexeme::Punct(c)
            }
            '0'..='9' => {
                // A number scan starting on a digit always yields something.
                let Some(scan) = scan_number(rest, self.options.decimal_comma) else {
                    return Err(Error::Internal("digit without number".into()));
                };
                let start = self.position;
                self.advance(scan.len);
                match scan.value {
                    Ok(v) => Lexeme::Number(v),
                    Err(_) => Lexeme::Malformed(&self.text[start..self.position]),
                }
            }
            _ if is_identifier_start(c) => match self.identifier() {
                Some(name) => Lexeme::Identifier(name),
                None => return Err(Error::Internal("identifier start without identifier".into())),
            },
            _ => match operator_at(rest) {
                Some((op, len)) => {
                    self.advance(len);
                    Lexeme::Operator(op)
                }
                None => {
                    return match self.options.mode {
                        ScanMode::Lenient => Ok(None),
                        ScanMode::Strict => Err(Error::Lexical {
                            position: self.position,
                            found: c,
                        }),
                    }
                }
            },
        };
        Ok(Some(lexeme))
    }
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '°'
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '°'
}

pub(crate) fn identifier_len(text: &str) -> usize {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if is_identifier_start(c) => {}
        _ => return 0,
    }
    chars
        .find(|&(_, c)| !is_identifier_char(c))
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Longest operator spelling at the start of `text`.
fn operator_at(text: &str) -> Option<(OperatorKind, usize)> {
    if let Some(two) = text.get(..2) {
        if let Some(op) = OperatorKind::from_symbol(two) {
            return Some((op, 2));
        }
    }
    let one = text.get(..1)?;
    OperatorKind::from_symbol(one).map(|op| (op, 1))
}

/// Scans a numeric literal at the start of `text`.
///
/// Syntax: optional sign, optional `0x`/`0X` hex prefix, mantissa digits with
/// an optional fraction (`.` or, when enabled, `,`), and an optional exponent
/// introduced by `E`/`e` (base 10) or `H`/`h` (base 16). The exponent takes an
/// optional sign and an optional `0x` prefix for hex digits. An exponent
/// marker without digits after it is not consumed.
///
/// Returns `None` when `text` does not start with a number.
pub fn scan_number(text: &str, decimal_comma: bool) -> Option<NumberScan> {
    let bytes = text.as_bytes();
    let mut i = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let hex = has_hex_prefix(&bytes[i..]);
    if hex {
        i += 2;
    }
    let is_digit = |b: u8| {
        if hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        }
    };

    let int_start = i;
    while i < bytes.len() && is_digit(bytes[i]) {
        i += 1;
    }
    let int_digits = &text[int_start..i];

    let mut frac_digits = "";
    if i + 1 < bytes.len()
        && (bytes[i] == b'.' || (decimal_comma && bytes[i] == b','))
        && is_digit(bytes[i + 1])
    {
        let frac_start = i + 1;
        i = frac_start;
        while i < bytes.len() && is_digit(bytes[i]) {
            i += 1;
        }
        frac_digits = &text[frac_start..i];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        if !hex {
            return None;
        }
        return Some(NumberScan {
            value: Err(text[..i].to_string()),
            len: i,
        });
    }

    let mantissa = if hex {
        hex_mantissa(int_digits, frac_digits)
    } else {
        let literal = if frac_digits.is_empty() {
            int_digits.to_string()
        } else {
            format!("{int_digits}.{frac_digits}")
        };
        literal.parse::<f64>().ok()
    };

    let exponent = scan_exponent(&bytes[i..]);
    let mut value = mantissa;
    if let Some((base, exp, len)) = exponent {
        i += len;
        value = match (value, exp) {
            (Some(m), Some(e)) => Some(m * base.powi(e)),
            _ => None,
        };
    }

    let value = match value {
        Some(v) if negative => Ok(-v),
        Some(v) => Ok(v),
        None => Err(text[..i].to_string()),
    };
    Some(NumberScan { value, len: i })
}

fn has_hex_prefix(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == b'0' && (bytes[1] == b'x' || bytes[1] == b'X')
}

fn hex_mantissa(int_digits: &str, frac_digits: &str) -> Option<f64> {
    let int = if int_digits.is_empty() {
        0
    } else {
        u64::from_str_radix(int_digits, 16).ok()?
    };
    let mut value = int as f64;
    if !frac_digits.is_empty() {
        let frac = u64::from_str_radix(frac_digits, 16).ok()?;
        let digits = i32::try_from(frac_digits.len()).ok()?;
        value += frac as f64 / 16f64.powi(digits);
    }
    Some(value)
}

/// Scans an exponent suffix. Returns `(base, exponent, bytes consumed)`;
/// the exponent is `None` when its digits overflow.
fn scan_exponent(bytes: &[u8]) -> Option<(f64, Option<i32>, usize)> {
    let base = match bytes.first()? {
        b'E' | b'e' => 10.0,
        b'H' | b'h' => 16.0,
        _ => return None,
    };
    let mut i = 1;
    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };
    let hex = has_hex_prefix(&bytes[i..]);
    if hex {
        i += 2;
    }
    let start = i;
    while i < bytes.len()
        && (if hex {
            bytes[i].is_ascii_hexdigit()
        } else {
            bytes[i].is_ascii_digit()
        })
    {
        i += 1;
    }
    if i == start {
        return None;
    }
    let digits = std::str::from_utf8(&bytes[start..i]).ok()?;
    let exp = i32::from_str_radix(digits, if hex { 16 } else { 10 })
        .ok()
        .map(|e| if negative { -e } else { e });
    Some((base, exp, i))
}
