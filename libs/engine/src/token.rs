//! Tokens produced by the shunting-yard tokenizer
//!
//! Operators carry a fixed precedence rank (higher binds tighter):
//!
//! | rank | operators |
//! |------|-----------|
//! | 0 | `(` `)` |
//! | 1 | `==` `!=` |
//! | 2 | `<` `<=` `>` `>=` |
//! | 3 | `+` `-` |
//! | 4 | `*` `/` |
//! | 5 | `^` (power) `#` (root) |
//! | 6 | unary `+` `-` `!` |

use phf::phf_map;
use physcalc_units::Quantity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    ParenOpen,
    ParenClose,
    Equals,
    Differs,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Not,
    Add,
    Sub,
    Mult,
    Div,
    Pow,
    Root,
    UnaryPlus,
    UnaryMinus,
}

/// Operator spellings as they appear in source text. `+`/`-` map to their
/// binary forms; the tokenizer reinterprets them as unary by position.
static OPERATORS: phf::Map<&'static str, OperatorKind> = phf_map! {
    "==" => OperatorKind::Equals,
    "!=" => OperatorKind::Differs,
    "<" => OperatorKind::LessThan,
    "<=" => OperatorKind::LessOrEqual,
    ">" => OperatorKind::GreaterThan,
    ">=" => OperatorKind::GreaterOrEqual,
    "!" => OperatorKind::Not,
    "+" => OperatorKind::Add,
    "-" => OperatorKind::Sub,
    "*" => OperatorKind::Mult,
    "/" => OperatorKind::Div,
    "^" => OperatorKind::Pow,
    "#" => OperatorKind::Root,
};

impl OperatorKind {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        OPERATORS.get(symbol).copied()
    }

    pub fn precedence(self) -> u8 {
        match self {
            OperatorKind::ParenOpen | OperatorKind::ParenClose => 0,
            OperatorKind::Equals | OperatorKind::Differs => 1,
            OperatorKind::LessThan
            | OperatorKind::LessOrEqual
            | OperatorKind::GreaterThan
            | OperatorKind::GreaterOrEqual => 2,
            OperatorKind::Add | OperatorKind::Sub => 3,
            OperatorKind::Mult | OperatorKind::Div => 4,
            OperatorKind::Pow | OperatorKind::Root => 5,
            OperatorKind::Not | OperatorKind::UnaryPlus | OperatorKind::UnaryMinus => 6,
        }
    }

    /// Unary operators chain right-to-left: an equal-rank unary operator on
    /// the stack is not reduced when another unary operator arrives.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            OperatorKind::Not | OperatorKind::UnaryPlus | OperatorKind::UnaryMinus
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(self.precedence(), 1 | 2)
    }

    /// Unary reading of a binary spelling, if there is one.
    pub fn as_unary(self) -> Option<Self> {
        match self {
            OperatorKind::Add => Some(OperatorKind::UnaryPlus),
            OperatorKind::Sub => Some(OperatorKind::UnaryMinus),
            OperatorKind::Not => Some(OperatorKind::Not),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::ParenOpen => "(",
            OperatorKind::ParenClose => ")",
            OperatorKind::Equals => "==",
            OperatorKind::Differs => "!=",
            OperatorKind::LessThan => "<",
            OperatorKind::LessOrEqual => "<=",
            OperatorKind::GreaterThan => ">",
            OperatorKind::GreaterOrEqual => ">=",
            OperatorKind::Not => "!",
            OperatorKind::Add | OperatorKind::UnaryPlus => "+",
            OperatorKind::Sub | OperatorKind::UnaryMinus => "-",
            OperatorKind::Mult => "*",
            OperatorKind::Div => "/",
            OperatorKind::Pow => "^",
            OperatorKind::Root => "#",
        }
    }
}

/// A postfix token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Operand(Quantity),
    Operator(OperatorKind),
}

/// Kind of the previously produced token, used to tell unary from binary
/// `+`/`-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastToken {
    #[default]
    None,
    Operand,
    Operator,
}
