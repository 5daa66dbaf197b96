//! Expression entry points
//!
//! Every entry point takes the text to parse and a [`Resolver`], and returns a
//! [`Parsed`]: the outcome plus the unconsumed remainder of the text, so the
//! caller can continue with whatever follows the expression.

use crate::error::{Error, Result};
use crate::evaluator;
use crate::resolver::Resolver;
use crate::tokenizer::{Mode, Tokenizer};
use physcalc_units::Quantity;
use std::path::PathBuf;
use tracing::warn;

/// Default bound on nested function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 32;

/// Default bound on nested argument lists and parentheses.
pub const DEFAULT_MAX_NESTING: usize = 32;

/// Evaluation settings.
///
/// Function calls and argument lists recurse on the host stack, and each
/// level takes tens of kilobytes in unoptimized builds. The default limits
/// fit a 2 MiB thread (the size `std::thread::spawn` and the test harness
/// use). Raise `max_call_depth` or `max_nesting` only on a thread with a
/// proportionally larger stack.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalOptions {
    /// Accept `3,5` as a decimal literal.
    pub decimal_comma: bool,
    /// Label impossible `[unit]` conversions instead of failing.
    pub lenient_conversion: bool,
    pub max_call_depth: usize,
    /// Deepest nesting of argument lists and of parentheses within one
    /// expression.
    pub max_nesting: usize,
    /// Significant digits for printed results; `None` prints the shortest
    /// exact representation.
    pub precision: Option<usize>,
    /// Directories searched by `Read` and by file functions, after the
    /// working directory.
    pub script_dirs: Vec<PathBuf>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            decimal_comma: true,
            lenient_conversion: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            precision: None,
            script_dirs: Vec::new(),
        }
    }
}

/// Outcome of a parse together with the text that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<'a, T> {
    pub value: Result<T>,
    pub rest: &'a str,
}

impl<'a, T> Parsed<'a, T> {
    pub fn new(value: Result<T>, rest: &'a str) -> Self {
        Self { value, rest }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<'a, U> {
        Parsed {
            value: self.value.map(f),
            rest: self.rest,
        }
    }

    pub fn into_result(self) -> Result<(T, &'a str)> {
        let rest = self.rest;
        self.value.map(|v| (v, rest))
    }
}

/// Parses and evaluates one expression.
pub fn parse_expression<'a>(text: &'a str, resolver: &mut dyn Resolver) -> Parsed<'a, Quantity> {
    expression(text, resolver, Mode::TopLevel, 0)
}

/// Parses one expression with an optional `[unit]` conversion suffix.
///
/// Without a suffix, a computed result is relabeled with the named unit of
/// its dimensions when the active system has one.
pub fn parse_converted_expression<'a>(
    text: &'a str,
    resolver: &mut dyn Resolver,
) -> Parsed<'a, Quantity> {
    converted(text, resolver, Mode::TopLevel, 0)
}

/// Parses a comma-separated list of converted expressions.
pub fn parse_expression_list<'a>(
    text: &'a str,
    resolver: &mut dyn Resolver,
) -> Parsed<'a, Vec<Quantity>> {
    list(text, resolver, Mode::TopLevel, 0)
}

/// Argument list of a call. Stops before the closing `)`.
pub(crate) fn parse_arguments<'a>(
    text: &'a str,
    resolver: &mut dyn Resolver,
    depth: usize,
) -> Parsed<'a, Vec<Quantity>> {
    list(text, resolver, Mode::Nested, depth)
}

fn expression<'a>(
    text: &'a str,
    resolver: &mut dyn Resolver,
    mode: Mode,
    depth: usize,
) -> Parsed<'a, Quantity> {
    let mut tokens = Tokenizer::with_mode(text, resolver, mode, depth);
    let value = evaluator::evaluate(&mut tokens).and_then(|v| v.ok_or(Error::EmptyExpression));
    Parsed::new(value, tokens.rest())
}

fn converted<'a>(
    text: &'a str,
    resolver: &mut dyn Resolver,
    mode: Mode,
    depth: usize,
) -> Parsed<'a, Quantity> {
    let Parsed { value, rest } = expression(text, resolver, mode, depth);
    let quantity = match value {
        Ok(q) => q,
        Err(e) => return Parsed::new(Err(e), rest),
    };

    let trimmed = rest.trim_start();
    let Some(inside) = trimmed.strip_prefix('[') else {
        return Parsed::new(Ok(quantity.relabel(resolver.unit_system())), rest);
    };
    let Some(close) = inside.find(']') else {
        let position = text.len() - trimmed.len();
        return Parsed::new(
            Err(Error::syntax(position, "missing ']' after target unit")),
            trimmed,
        );
    };

    let value = convert(&quantity, &inside[..close], resolver);
    Parsed::new(value, &inside[close + 1..])
}

fn convert(quantity: &Quantity, target: &str, resolver: &mut dyn Resolver) -> Result<Quantity> {
    let target = resolver.unit_system().parse_unit(target)?;
    match quantity.convert_to(&target) {
        Ok(q) => Ok(q),
        Err(e) if resolver.options().lenient_conversion => {
            warn!(error = %e, "conversion kept source dimensions");
            Ok(quantity.convert_or_combine(&target))
        }
        Err(e) => Err(e.into()),
    }
}

fn list<'a>(
    text: &'a str,
    resolver: &mut dyn Resolver,
    mode: Mode,
    depth: usize,
) -> Parsed<'a, Vec<Quantity>> {
    let mut values = Vec::new();
    let mut rest = text;
    loop {
        let offset = text.len() - rest.len();
        let parsed = converted(rest, resolver, mode, depth);
        rest = parsed.rest;
        match parsed.value {
            Ok(q) => values.push(q),
            Err(e) => return Parsed::new(Err(e.offset(offset)), rest),
        }
        match rest.trim_start().strip_prefix(',') {
            Some(next) => rest = next,
            None => return Parsed::new(Ok(values), rest),
        }
    }
}
