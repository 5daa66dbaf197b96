//! Multi-line function declarations
//!
//! ```text
//! Func name ( param [unit]? , ... ) {
//!     command lines...
//! }
//! ```
//!
//! A declaration may span any number of input lines. The state machine keeps
//! its progress between calls; each call consumes as much of the given text
//! as it can and reports the finished definition once the body's closing
//! brace is seen.

use crate::engine::Parsed;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::scanner::{Lexeme, ScanMode, ScanOptions, Scanner};
use tracing::debug;

/// Marker that starts a comment running to the end of the line.
pub const COMMENT: &str = "//";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationState {
    #[default]
    ExecuteCommandLine,
    ReadFunctionParameterList,
    ReadFunctionParameters,
    ReadFunctionParameter,
    ReadFunctionParametersOptional,
    ReadFunctionBlock,
    ReadFunctionBody,
}

/// A formal parameter, optionally constrained to a unit. Arguments are
/// converted to that unit on call.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub unit: Option<String>,
}

/// A declared user function. The body is kept as command lines and
/// interpreted on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionDeclaration {
    state: DeclarationState,
    name: String,
    parameters: Vec<Parameter>,
    body: Vec<String>,
    /// Unmatched `{` seen inside the body.
    depth: usize,
}

impl FunctionDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DeclarationState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once `Func` has been read and the closing brace has not.
    pub fn is_open(&self) -> bool {
        self.state != DeclarationState::ExecuteCommandLine
    }

    /// Feeds one chunk of text. Returns `Some` with the finished function and
    /// the text after its closing brace; `None` while more lines are needed.
    /// On error the declaration is abandoned.
    pub fn feed<'a>(&mut self, text: &'a str) -> Parsed<'a, Option<Function>> {
        let mut scanner = Scanner::new(
            text,
            ScanOptions {
                mode: ScanMode::Strict,
                decimal_comma: false,
            },
        );
        let value = self.run(&mut scanner);
        if value.is_err() {
            *self = Self::new();
        }
        Parsed::new(value, scanner.rest())
    }

    fn run(&mut self, scanner: &mut Scanner<'_>) -> Result<Option<Function>> {
        loop {
            scanner.skip_whitespace();
            if scanner.at_end() || scanner.rest().starts_with(COMMENT) {
                scanner.advance(scanner.rest().len());
                return Ok(None);
            }
            let position = scanner.position();

            match self.state {
                DeclarationState::ExecuteCommandLine => {
                    match scanner.next_lexeme()? {
                        Some(Lexeme::Identifier(kw)) if kw.eq_ignore_ascii_case("func") => {}
                        _ => return Err(Error::syntax(position, "expected 'Func'")),
                    }
                    scanner.skip_whitespace();
                    let position = scanner.position();
                    let Some(name) = scanner.identifier() else {
                        return Err(Error::syntax(position, "expected function name"));
                    };
                    self.name = name.to_string();
                    self.state = DeclarationState::ReadFunctionParameterList;
                }
                DeclarationState::ReadFunctionParameterList => {
                    if !scanner.eat('(') {
                        return Err(Error::syntax(position, "expected '(' after function name"));
                    }
                    self.state = DeclarationState::ReadFunctionParameters;
                }
                DeclarationState::ReadFunctionParameters => {
                    self.state = if scanner.eat(')') {
                        DeclarationState::ReadFunctionBlock
                    } else {
                        DeclarationState::ReadFunctionParameter
                    };
                }
                DeclarationState::ReadFunctionParameter => {
                    let parameter = read_parameter(scanner)?;
                    if self.parameters.iter().any(|p| p.name == parameter.name) {
                        return Err(Error::Declaration(format!(
                            "duplicate parameter '{}' in '{}'",
                            parameter.name, self.name
                        )));
                    }
                    self.parameters.push(parameter);
                    self.state = DeclarationState::ReadFunctionParametersOptional;
                }
                DeclarationState::ReadFunctionParametersOptional => {
                    self.state = if scanner.eat(',') {
                        DeclarationState::ReadFunctionParameter
                    } else if scanner.eat(')') {
                        DeclarationState::ReadFunctionBlock
                    } else {
                        return Err(Error::syntax(position, "expected ',' or ')'"));
                    };
                }
                DeclarationState::ReadFunctionBlock => {
                    if !scanner.eat('{') {
                        return Err(Error::syntax(position, "expected '{' before function body"));
                    }
                    self.state = DeclarationState::ReadFunctionBody;
                    self.depth = 0;
                }
                DeclarationState::ReadFunctionBody => return Ok(self.read_body(scanner)),
            }
        }
    }

    /// Collects body text up to the closing brace, if it is on this line.
    fn read_body(&mut self, scanner: &mut Scanner<'_>) -> Option<Function> {
        let rest = scanner.rest();
        let code_end = rest.find(COMMENT).unwrap_or(rest.len());

        let mut close = None;
        for (i, c) in rest[..code_end].char_indices() {
            match c {
                '{' => self.depth += 1,
                '}' if self.depth == 0 => {
                    close = Some(i);
                    break;
                }
                '}' => self.depth -= 1,
                _ => {}
            }
        }

        let Some(close) = close else {
            self.push_line(rest);
            scanner.advance(rest.len());
            return None;
        };

        self.push_line(&rest[..close]);
        scanner.advance(close + 1);
        let function = Function {
            name: std::mem::take(&mut self.name),
            parameters: std::mem::take(&mut self.parameters),
            body: std::mem::take(&mut self.body),
        };
        *self = Self::new();
        debug!(
            function = %function.name,
            parameters = function.parameters.len(),
            lines = function.body.len(),
            "function declared"
        );
        Some(function)
    }

    fn push_line(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.body.push(line.to_string());
        }
    }
}

fn read_parameter(scanner: &mut Scanner<'_>) -> Result<Parameter> {
    let position = scanner.position();
    let name = match scanner.next_lexeme()? {
        Some(Lexeme::Identifier(name)) => name.to_string(),
        _ => return Err(Error::syntax(position, "expected parameter name")),
    };

    scanner.skip_whitespace();
    if !scanner.eat('[') {
        return Ok(Parameter { name, unit: None });
    }
    let position = scanner.position();
    let rest = scanner.rest();
    let Some(close) = rest.find(']') else {
        return Err(Error::syntax(position, "missing ']' after parameter unit"));
    };
    let unit = rest[..close].trim();
    physcalc_units::validate(unit)?;
    scanner.advance(close + 1);
    Ok(Parameter {
        name,
        unit: Some(unit.to_string()),
    })
}

/// Continues (or starts, on a `Func` line) the declaration pending in the
/// environment's current scope. A finished function is returned, not yet
/// registered; the caller decides where it lives.
pub fn continue_function_declaration<'a>(
    text: &'a str,
    env: &mut Environment,
) -> Parsed<'a, Option<Function>> {
    let mut declaration = env.take_declaration().unwrap_or_default();
    let parsed = declaration.feed(text);
    if declaration.is_open() {
        env.set_declaration(declaration);
    }
    parsed
}
