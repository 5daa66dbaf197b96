//! Shunting-yard tokenizer
//!
//! Converts infix command text into a postfix stream of [`Token`]s. Operands
//! are fully evaluated as they are read: number literals (with an optional
//! unit suffix), variables, units and function calls all become
//! [`Quantity`] values, so the stream only ever contains values and
//! operators.
//!
//! The tokenizer is pull-based: it implements `Iterator` and only scans as
//! far as needed to produce the next postfix token.

use crate::engine;
use crate::error::{Error, Result};
use crate::resolver::{ItemKind, Resolved, Resolver};
use crate::scanner::{Lexeme, ScanMode, ScanOptions, Scanner};
use crate::token::{LastToken, OperatorKind, Token};
use physcalc_units::Quantity;
use smallvec::SmallVec;
use std::collections::VecDeque;
use tracing::trace;

/// Whether a `)` at paren depth 0 ends the expression (argument lists) or
/// is an error (top level).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    TopLevel,
    Nested,
}

pub struct Tokenizer<'a, 'r> {
    scanner: Scanner<'a>,
    resolver: &'r mut dyn Resolver,
    operators: SmallVec<[OperatorKind; 16]>,
    ready: VecDeque<Token>,
    last: LastToken,
    parens: usize,
    mode: Mode,
    depth: usize,
    max_nesting: usize,
    finished: bool,
    pending: Option<Error>,
}

impl<'a, 'r> Tokenizer<'a, 'r> {
    pub fn new(text: &'a str, resolver: &'r mut dyn Resolver) -> Self {
        Self::with_mode(text, resolver, Mode::TopLevel, 0)
    }

    pub(crate) fn with_mode(
        text: &'a str,
        resolver: &'r mut dyn Resolver,
        mode: Mode,
        depth: usize,
    ) -> Self {
        let options = ScanOptions {
            mode: ScanMode::Lenient,
            decimal_comma: resolver.options().decimal_comma,
        };
        let max_nesting = resolver.options().max_nesting;
        Self {
            scanner: Scanner::new(text, options),
            resolver,
            operators: SmallVec::new(),
            ready: VecDeque::new(),
            last: LastToken::None,
            parens: 0,
            mode,
            depth,
            max_nesting,
            finished: false,
            pending: None,
        }
    }

    /// Byte offset of the first unconsumed character.
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a str {
        self.scanner.rest()
    }

    fn step(&mut self) -> Result<()> {
        self.scanner.skip_whitespace();
        let position = self.scanner.position();
        match self.scanner.peek_char() {
            None => return self.finish(position),
            Some(',' | '[' | ']' | ';' | '{' | '}') => return self.finish(position),
            Some('/') if self.scanner.rest().starts_with("//") => return self.finish(position),
            Some(')') if self.parens == 0 => {
                return match self.mode {
                    Mode::Nested => self.finish(position),
                    Mode::TopLevel => Err(Error::syntax(position, "unbalanced ')'")),
                };
            }
            _ => {}
        }

        let Some(lexeme) = self.scanner.next_lexeme()? else {
            let found = self.scanner.peek_char().unwrap_or_default();
            return Err(Error::Lexical { position, found });
        };

        match lexeme {
            Lexeme::ParenOpen => {
                self.expect_operand_slot(position)?;
                if self.parens >= self.max_nesting {
                    return Err(Error::TooDeep(self.max_nesting));
                }
                self.operators.push(OperatorKind::ParenOpen);
                self.parens += 1;
                self.last = LastToken::Operator;
            }
            Lexeme::ParenClose => {
                if self.last != LastToken::Operand {
                    return Err(Error::syntax(position, "expected operand before ')'"));
                }
                while let Some(op) = self.operators.pop() {
                    if op == OperatorKind::ParenOpen {
                        break;
                    }
                    self.emit_operator(op);
                }
                self.parens -= 1;
            }
            Lexeme::Operator(op) => self.push_operator(op, position)?,
            Lexeme::Number(value) => {
                self.expect_operand_slot(position)?;
                let operand = self.number_with_unit(value)?;
                self.emit_operand(operand);
            }
            Lexeme::Malformed(text) => {
                return Err(Error::InvalidNumber {
                    position,
                    text: text.to_string(),
                })
            }
            Lexeme::Identifier(name) => {
                self.expect_operand_slot(position)?;
                let operand = self.identifier(name, position)?;
                self.emit_operand(operand);
            }
            Lexeme::Punct(c) => return Err(Error::Lexical { position, found: c }),
        }
        Ok(())
    }

    fn expect_operand_slot(&self, position: usize) -> Result<()> {
        if self.last == LastToken::Operand {
            return Err(Error::syntax(position, "missing operator between operands"));
        }
        Ok(())
    }

    fn push_operator(&mut self, op: OperatorKind, position: usize) -> Result<()> {
        let op = if self.last == LastToken::Operand {
            if op == OperatorKind::Not {
                return Err(Error::syntax(position, "'!' cannot follow an operand"));
            }
            op
        } else {
            op.as_unary().ok_or_else(|| {
                Error::syntax(
                    position,
                    format!("operator '{}' is missing its left operand", op.symbol()),
                )
            })?
        };

        while let Some(&top) = self.operators.last() {
            if top == OperatorKind::ParenOpen {
                break;
            }
            let reduce = top.precedence() > op.precedence()
                || (top.precedence() == op.precedence() && !op.is_unary());
            if !reduce {
                break;
            }
            self.operators.pop();
            self.emit_operator(top);
        }
        self.operators.push(op);
        self.last = LastToken::Operator;
        Ok(())
    }

    fn emit_operand(&mut self, operand: Quantity) {
        trace!(operand = %operand, "operand");
        self.ready.push_back(Token::Operand(operand));
        self.last = LastToken::Operand;
    }

    fn emit_operator(&mut self, op: OperatorKind) {
        trace!(operator = op.symbol(), "operator");
        self.ready.push_back(Token::Operator(op));
    }

    /// Ends the expression at `position` and drains the operator stack.
    fn finish(&mut self, position: usize) -> Result<()> {
        let incomplete = self.last == LastToken::Operator || self.parens > 0;
        let at_end = self.scanner.at_end() || self.scanner.rest().starts_with("//");
        if incomplete && !at_end {
            return Err(Error::syntax(position, "incomplete expression"));
        }

        self.finished = true;
        while let Some(op) = self.operators.pop() {
            if op != OperatorKind::ParenOpen {
                self.emit_operator(op);
            }
        }
        if incomplete {
            self.pending = Some(Error::Unterminated {
                position,
                partial: None,
            });
        }
        Ok(())
    }

    /// A literal number, plus the unit symbol that follows it, if any.
    fn number_with_unit(&mut self, value: f64) -> Result<Quantity> {
        let save = self.scanner.position();
        self.scanner.skip_whitespace();
        match self.resolver.unit_system().scan_unit(self.scanner.rest()) {
            Some(Ok((unit, used))) => {
                self.scanner.advance(used);
                Ok(Quantity::new(value, unit))
            }
            Some(Err(e)) => Err(e.into()),
            None => {
                self.scanner.set_position(save);
                Ok(Quantity::dimensionless(value))
            }
        }
    }

    /// Resolves an identifier, following `.segment` continuations into
    /// namespaces and unit systems.
    fn identifier(&mut self, name: &'a str, position: usize) -> Result<Quantity> {
        let mut path = name.to_string();
        let mut current = name;
        let mut resolved = self.resolver.lookup(name);

        while let Some(Resolved {
            kind: ItemKind::Namespace | ItemKind::UnitSystem,
            context,
        }) = resolved
        {
            let save = self.scanner.position();
            if !self.scanner.eat('.') {
                break;
            }
            let Some(segment) = self.scanner.identifier() else {
                self.scanner.set_position(save);
                break;
            };
            path.push('.');
            path.push_str(segment);
            current = segment;
            resolved = self.resolver.lookup_qualified(context, segment);
        }

        let Some(Resolved { kind, context }) = resolved else {
            return self.file_function(&path);
        };

        match kind {
            ItemKind::Variable => self
                .resolver
                .variable(context, current)
                .ok_or(Error::UnknownIdentifier(path)),
            ItemKind::Unit => self
                .resolver
                .unit(context, current)
                .map(|unit| Quantity::new(1.0, unit))
                .ok_or(Error::UnknownIdentifier(path)),
            ItemKind::Function => {
                let save = self.scanner.position();
                self.scanner.skip_whitespace();
                if !self.scanner.eat('(') {
                    self.scanner.set_position(save);
                    return Err(Error::syntax(
                        position,
                        format!("function '{path}' requires an argument list"),
                    ));
                }
                let args = self.arguments()?;
                self.resolver.evaluate_function(context, current, &args)
            }
            ItemKind::Namespace | ItemKind::UnitSystem => {
                Err(Error::Evaluation(format!("'{path}' is not a value")))
            }
        }
    }

    /// `name()` for a name nothing in scope declares: try a script file.
    fn file_function(&mut self, path: &str) -> Result<Quantity> {
        if !path.contains('.') && self.scanner.rest().starts_with("()") {
            if let Some(value) = self.resolver.evaluate_file_function(path)? {
                self.scanner.advance(2);
                return Ok(value);
            }
        }
        Err(Error::UnknownIdentifier(path.to_string()))
    }

    /// Parses a call's argument list; the opening `(` is already consumed.
    fn arguments(&mut self) -> Result<Vec<Quantity>> {
        self.scanner.skip_whitespace();
        if self.scanner.eat(')') {
            return Ok(Vec::new());
        }
        if self.depth >= self.max_nesting {
            return Err(Error::TooDeep(self.max_nesting));
        }

        let offset = self.scanner.position();
        let rest = self.scanner.rest();
        let parsed = engine::parse_arguments(rest, &mut *self.resolver, self.depth + 1);
        self.scanner.advance(rest.len() - parsed.rest.len());
        let args = parsed.value.map_err(|e| e.offset(offset))?;

        self.scanner.skip_whitespace();
        if !self.scanner.eat(')') {
            let position = self.scanner.position();
            if self.scanner.at_end() {
                return Err(Error::Unterminated {
                    position,
                    partial: None,
                });
            }
            return Err(Error::syntax(position, "expected ')' after arguments"));
        }
        Ok(args)
    }
}

impl Iterator for Tokenizer<'_, '_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.ready.pop_front() {
                return Some(Ok(token));
            }
            if self.finished {
                return self.pending.take().map(Err);
            }
            if let Err(e) = self.step() {
                self.finished = true;
                self.ready.clear();
                self.operators.clear();
                return Some(Err(e));
            }
        }
    }
}
