//! Command interpreter
//!
//! One line holds one or more commands separated by `;`. Keywords are
//! case-insensitive:
//!
//! | Command | Effect |
//! |---|---|
//! | `Print e1, e2, ...` | write the values |
//! | `Var name = expr` | declare a variable in the current scope |
//! | `name = expr` | assign the nearest variable, or declare one |
//! | `Unit sym = expr` | declare a unit in the active system |
//! | `Func name(params) { ... }` | declare a function (may span lines) |
//! | `Return expr` | leave the current function with a value |
//! | `Namespace name` | declare a namespace |
//! | `Remove name` | drop a binding |
//! | `Read file` | run a script in the current scope |
//! | `List` | write the visible bindings |
//! | `expr` | write the value |
//!
//! `//` starts a comment. User function bodies and script files run through
//! the same interpreter.

use crate::declaration::{continue_function_declaration, COMMENT};
use crate::engine::{parse_converted_expression, parse_expression_list, Parsed};
use crate::environment::{Environment, NamedItem};
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::scanner::identifier_len;
use phf::phf_map;
use physcalc_units::Quantity;
use std::path::Path;

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Return(Quantity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Print,
    Var,
    Unit,
    Func,
    Return,
    Namespace,
    Remove,
    Read,
    List,
}

static COMMANDS: phf::Map<&'static str, Command> = phf_map! {
    "print" => Command::Print,
    "var" => Command::Var,
    "unit" => Command::Unit,
    "func" => Command::Func,
    "return" => Command::Return,
    "namespace" => Command::Namespace,
    "remove" => Command::Remove,
    "read" => Command::Read,
    "list" => Command::List,
};

/// Executes every command on `line`. Stops at the first error or `Return`.
pub fn execute_line(env: &mut Environment, line: &str) -> Result<Flow> {
    let mut text = line;
    loop {
        let (flow, rest) = execute_one(env, text)?;
        if let Flow::Return(_) = flow {
            return Ok(flow);
        }
        let rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with(COMMENT) {
            return Ok(Flow::Continue);
        }
        match rest.strip_prefix(';') {
            Some(next) => text = next,
            None => {
                return Err(Error::syntax(
                    line.len() - rest.len(),
                    format!("unexpected input '{rest}'"),
                ))
            }
        }
    }
}

/// Executes lines in order. Returns the value of the first `Return`.
pub fn execute_lines<S: AsRef<str>>(env: &mut Environment, lines: &[S]) -> Result<Option<Quantity>> {
    for line in lines {
        match execute_line(env, line.as_ref()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Return(value)) => {
                env.cancel_declaration();
                return Ok(Some(value));
            }
            Err(e) => {
                env.cancel_declaration();
                return Err(e);
            }
        }
    }
    match env.cancel_declaration() {
        Some(name) => Err(Error::Declaration(format!(
            "declaration of '{name}' is missing its closing '}}'"
        ))),
        None => Ok(None),
    }
}

/// Executes one command and returns the text after it.
fn execute_one<'a>(env: &mut Environment, text: &'a str) -> Result<(Flow, &'a str)> {
    if env.declaration_pending() {
        return declaration(env, text);
    }

    let text = text.trim_start();
    if text.is_empty() || text.starts_with(COMMENT) {
        return Ok((Flow::Continue, ""));
    }

    let word_len = identifier_len(text);
    if word_len > 0 {
        let keyword = text[..word_len].to_ascii_lowercase();
        if let Some(&command) = COMMANDS.get(keyword.as_str()) {
            return run(command, env, text, &text[word_len..]);
        }
        if let Some((path, expr)) = assignment(text) {
            let (value, rest) = parse_converted_expression(expr, env).into_result()?;
            env.assign(path, value)?;
            return Ok((Flow::Continue, rest));
        }
    }

    let (value, rest) = parse_converted_expression(text, env).into_result()?;
    let line = env.format(&value);
    env.write_line(&line)?;
    Ok((Flow::Continue, rest))
}

fn run<'a>(
    command: Command,
    env: &mut Environment,
    text: &'a str,
    args: &'a str,
) -> Result<(Flow, &'a str)> {
    match command {
        Command::Print => {
            let (values, rest) = parse_expression_list(args, env).into_result()?;
            let line = values
                .iter()
                .map(|v| env.format(v))
                .collect::<Vec<_>>()
                .join(", ");
            env.write_line(&line)?;
            Ok((Flow::Continue, rest))
        }
        Command::Var => {
            let (path, expr) = assignment(args)
                .ok_or_else(|| Error::syntax(0, "expected 'Var name = expression'"))?;
            let (value, rest) = parse_converted_expression(expr, env).into_result()?;
            env.define_variable(path, value)?;
            Ok((Flow::Continue, rest))
        }
        Command::Unit => {
            let (symbol, expr) = assignment(args)
                .ok_or_else(|| Error::syntax(0, "expected 'Unit symbol = expression'"))?;
            let (value, rest) = parse_converted_expression(expr, env).into_result()?;
            env.declare_unit(symbol, &value)?;
            Ok((Flow::Continue, rest))
        }
        Command::Func => declaration(env, text),
        Command::Return => {
            if env.depth() == 0 {
                return Err(Error::Evaluation("'Return' outside of a function".into()));
            }
            let (value, rest) = parse_converted_expression(args, env).into_result()?;
            Ok((Flow::Return(value), rest))
        }
        Command::Namespace => {
            let (path, rest) = path(args).ok_or_else(|| Error::syntax(0, "expected namespace name"))?;
            env.declare_namespace(path)?;
            Ok((Flow::Continue, rest))
        }
        Command::Remove => {
            let (path, rest) = path(args).ok_or_else(|| Error::syntax(0, "expected a name to remove"))?;
            env.remove(path)?;
            Ok((Flow::Continue, rest))
        }
        Command::Read => {
            let end = args.find(';').unwrap_or(args.len());
            let name = args[..end].trim();
            if name.is_empty() {
                return Err(Error::syntax(0, "expected a file name"));
            }
            let file = env.find_script(name).ok_or_else(|| Error::Io {
                path: name.to_string(),
                message: "file not found".into(),
            })?;
            let flow = match env.run_script(Path::new(&file))? {
                Some(value) => Flow::Return(value),
                None => Flow::Continue,
            };
            Ok((flow, &args[end..]))
        }
        Command::List => {
            for line in listing(env) {
                env.write_line(&line)?;
            }
            Ok((Flow::Continue, args))
        }
    }
}

/// Feeds text to the pending (or a new) declaration and registers the
/// function once it is complete. Commands after the closing brace run
/// immediately.
fn declaration<'a>(env: &mut Environment, text: &'a str) -> Result<(Flow, &'a str)> {
    let Parsed { value, rest } = continue_function_declaration(text, env);
    match value? {
        Some(function) => {
            env.register_function(function)?;
            let flow = execute_line(env, rest)?;
            Ok((flow, ""))
        }
        None => Ok((Flow::Continue, "")),
    }
}

/// `name` or `outer.inner.name` at the start of `text`.
fn path(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let mut end = identifier_len(text);
    if end == 0 {
        return None;
    }
    while text[end..].starts_with('.') {
        let next = identifier_len(&text[end + 1..]);
        if next == 0 {
            break;
        }
        end += 1 + next;
    }
    Some((&text[..end], &text[end..]))
}

/// `path = expression`, but not `path == expression`.
fn assignment(text: &str) -> Option<(&str, &str)> {
    let (path, rest) = path(text)?;
    let expr = rest.trim_start().strip_prefix('=')?;
    if expr.starts_with('=') {
        return None;
    }
    Some((path, expr))
}

fn listing(env: &Environment) -> Vec<String> {
    env.visible_items()
        .into_iter()
        .map(|(name, item)| match item {
            NamedItem::Variable(value) => format!("{name} = {}", env.format(&value)),
            NamedItem::Function { function, .. } => {
                let params = function
                    .parameters
                    .iter()
                    .map(|p| match &p.unit {
                        Some(unit) => format!("{} [{unit}]", p.name),
                        None => p.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name}({params})")
            }
            NamedItem::Unit { .. } => match env.unit_system().lookup(&name) {
                Some(unit) => format!("{name}: unit of {}", physcalc_units::render_dimensions(unit.dimensions())),
                None => format!("{name}: unit"),
            },
            NamedItem::UnitSystem(_) => format!("{name}: unit system"),
            NamedItem::Namespace(scope) => format!("{name}: namespace {}", env.scope_name(scope)),
        })
        .collect()
}
