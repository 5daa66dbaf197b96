//! PhysCalc evaluation engine
//!
//! Parses and evaluates command lines of an interactive calculator for
//! physical quantities.
//!
//! # Architecture Overview
//!
//! ```text
//! Command line
//!      |
//! Command interpreter (Print, Var, Func, ...)
//!      |
//! Scanner -> lexical items
//!      |
//! Shunting-yard tokenizer -> postfix tokens   (identifiers resolved through Resolver)
//!      |
//! Postfix evaluator -> Quantity
//! ```
//!
//! Function calls re-enter the command interpreter for the function body, so
//! evaluation is recursive; the depth is bounded by
//! [`EvalOptions::max_call_depth`] and [`EvalOptions::max_nesting`]. The
//! defaults fit a 2 MiB thread stack.

pub mod commands;
pub mod declaration;
pub mod engine;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod tokenizer;

// Re-export main types
pub use commands::{execute_line, execute_lines, Flow};
pub use declaration::{continue_function_declaration, DeclarationState, Function, FunctionDeclaration, Parameter};
pub use engine::{
    parse_converted_expression, parse_expression, parse_expression_list, EvalOptions, Parsed,
    DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_NESTING,
};
pub use environment::{Environment, NamedItem, SCRIPT_EXTENSION};
pub use error::{Error, Result};
pub use resolver::{Context, ItemKind, Resolved, Resolver, ScopeId, SystemId};
pub use tokenizer::Tokenizer;

pub use physcalc_units as units;
