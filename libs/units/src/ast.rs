/// A parsed unit expression such as `Kg*m/s^2`, before symbols are resolved
/// against a unit system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitExpr {
    pub numerator: Vec<(Term, i8)>,
    pub denominator: Vec<(Term, i8)>,
}

impl UnitExpr {
    pub fn one() -> Self {
        Self {
            numerator: vec![],
            denominator: vec![],
        }
    }

    /// Returns the symbol when the expression is exactly one symbol with exponent 1.
    pub fn single_symbol(&self) -> Option<&str> {
        match (self.numerator.as_slice(), self.denominator.is_empty()) {
            ([(Term::Atom(Atom::Symbol(sym)), 1)], true) => Some(sym),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Atom(Atom),
    Group(Box<UnitExpr>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Atom {
    /// A unit symbol, possibly prefixed (e.g. `m`, `km`, `°C`).
    Symbol(String),
    /// A positive integer scalar (e.g. the `1` in `1/s`).
    Integer(u64),
}
