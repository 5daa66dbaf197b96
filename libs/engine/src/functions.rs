//! Built-in functions
//!
//! Uses a compile-time perfect hash map (phf) for name lookups. User functions
//! and namespace members shadow these names.

use crate::error::{Error, Result};
use phf::phf_map;
use physcalc_units::Quantity;
use std::cmp::Ordering;

/// Function metadata and implementation.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
    call: fn(&[Quantity]) -> Result<Quantity>,
}

static BUILTINS: phf::Map<&'static str, Builtin> = phf_map! {
    // Unit-preserving
    "sqrt" => Builtin { name: "sqrt", min_args: 1, max_args: Some(1), call: sqrt },
    "abs" => Builtin { name: "abs", min_args: 1, max_args: Some(1), call: abs },
    "round" => Builtin { name: "round", min_args: 1, max_args: Some(1), call: round },
    "floor" => Builtin { name: "floor", min_args: 1, max_args: Some(1), call: floor },
    "ceil" => Builtin { name: "ceil", min_args: 1, max_args: Some(1), call: ceil },
    "min" => Builtin { name: "min", min_args: 1, max_args: None, call: min },
    "max" => Builtin { name: "max", min_args: 1, max_args: None, call: max },

    // Dimensionless only
    "exp" => Builtin { name: "exp", min_args: 1, max_args: Some(1), call: exp },
    "ln" => Builtin { name: "ln", min_args: 1, max_args: Some(1), call: ln },
    "log10" => Builtin { name: "log10", min_args: 1, max_args: Some(1), call: log10 },
    "sin" => Builtin { name: "sin", min_args: 1, max_args: Some(1), call: sin },
    "cos" => Builtin { name: "cos", min_args: 1, max_args: Some(1), call: cos },
    "tan" => Builtin { name: "tan", min_args: 1, max_args: Some(1), call: tan },
    "asin" => Builtin { name: "asin", min_args: 1, max_args: Some(1), call: asin },
    "acos" => Builtin { name: "acos", min_args: 1, max_args: Some(1), call: acos },
    "atan" => Builtin { name: "atan", min_args: 1, max_args: Some(1), call: atan },
};

pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

impl Builtin {
    pub fn validate_args(&self, count: usize) -> Result<()> {
        let too_few = count < self.min_args;
        let too_many = self.max_args.is_some_and(|max| count > max);
        if too_few || too_many {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => max.to_string(),
                Some(max) => format!("{}..{}", self.min_args, max),
                None => format!("at least {}", self.min_args),
            };
            return Err(Error::Arity {
                name: self.name.to_string(),
                expected,
                got: count,
            });
        }
        Ok(())
    }

    pub fn call(&self, args: &[Quantity]) -> Result<Quantity> {
        self.validate_args(args.len())?;
        (self.call)(args)
    }
}

fn sqrt(args: &[Quantity]) -> Result<Quantity> {
    Ok(args[0].root(2)?)
}

fn keep_unit(q: &Quantity, f: fn(f64) -> f64) -> Quantity {
    Quantity::new(f(q.value()), q.unit().clone())
}

fn abs(args: &[Quantity]) -> Result<Quantity> {
    Ok(keep_unit(&args[0], f64::abs))
}

fn round(args: &[Quantity]) -> Result<Quantity> {
    Ok(keep_unit(&args[0], f64::round))
}

fn floor(args: &[Quantity]) -> Result<Quantity> {
    Ok(keep_unit(&args[0], f64::floor))
}

fn ceil(args: &[Quantity]) -> Result<Quantity> {
    Ok(keep_unit(&args[0], f64::ceil))
}

fn extreme(args: &[Quantity], keep: Ordering) -> Result<Quantity> {
    let mut best = &args[0];
    for candidate in &args[1..] {
        if candidate.compare(best)? == keep {
            best = candidate;
        }
    }
    Ok(best.clone())
}

fn min(args: &[Quantity]) -> Result<Quantity> {
    extreme(args, Ordering::Less)
}

fn max(args: &[Quantity]) -> Result<Quantity> {
    extreme(args, Ordering::Greater)
}

fn dimensionless(args: &[Quantity], f: fn(f64) -> f64) -> Result<Quantity> {
    let q = &args[0];
    if !q.is_dimensionless() {
        return Err(Error::Evaluation(format!(
            "expected a dimensionless argument, got '{q}'"
        )));
    }
    Ok(Quantity::dimensionless(f(q.si_value())))
}

fn exp(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::exp)
}

fn ln(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::ln)
}

fn log10(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::log10)
}

fn sin(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::sin)
}

fn cos(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::cos)
}

fn tan(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::tan)
}

fn asin(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::asin)
}

fn acos(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::acos)
}

fn atan(args: &[Quantity]) -> Result<Quantity> {
    dimensionless(args, f64::atan)
}
