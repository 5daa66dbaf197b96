//! Postfix evaluator
//!
//! Consumes a postfix token stream with a single operand stack. Operands are
//! already values, so evaluation is a straight fold over the stream.

use crate::error::{Error, Result};
use crate::token::{OperatorKind, Token};
use physcalc_units::{false_quantity, is_truthy, true_quantity, Quantity};
use smallvec::SmallVec;
use std::cmp::Ordering;

type Stack = SmallVec<[Quantity; 8]>;

/// Evaluates a postfix stream.
///
/// Returns `Ok(None)` for an empty stream. When the stream ends with an
/// [`Error::Unterminated`], its `partial` is filled with the value on top of
/// the stack at that point.
pub fn evaluate<I>(tokens: I) -> Result<Option<Quantity>>
where
    I: Iterator<Item = Result<Token>>,
{
    let mut tokens = tokens;
    let mut stack = Stack::new();

    while let Some(token) = tokens.next() {
        let token = match token {
            Ok(token) => token,
            Err(Error::Unterminated { position, .. }) => {
                return Err(Error::Unterminated {
                    position,
                    partial: stack.pop(),
                })
            }
            Err(e) => return Err(e),
        };

        match token {
            Token::Operand(q) => stack.push(q),
            Token::Operator(op) => {
                let needed = if op.is_unary() { 1 } else { 2 };
                if stack.len() < needed {
                    return Err(underflow(&mut tokens, &mut stack));
                }
                apply(op, &mut stack)?;
            }
        }
    }

    match stack.len() {
        0 => Ok(None),
        1 => Ok(stack.pop()),
        n => Err(Error::Internal(format!(
            "{n} operands left after evaluation"
        ))),
    }
}

/// An operator without enough operands only happens when the input ended
/// early; look for the tokenizer's report of that.
fn underflow<I>(tokens: &mut I, stack: &mut Stack) -> Error
where
    I: Iterator<Item = Result<Token>>,
{
    for token in tokens {
        if let Err(Error::Unterminated { position, .. }) = token {
            return Error::Unterminated {
                position,
                partial: stack.pop(),
            };
        }
    }
    Error::Internal("operand stack underflow".into())
}

fn apply(op: OperatorKind, stack: &mut Stack) -> Result<()> {
    let result = if op.is_unary() {
        let operand = pop(stack)?;
        match op {
            OperatorKind::UnaryPlus => operand,
            OperatorKind::UnaryMinus => operand.neg(),
            _ => truth(!is_truthy(&operand)),
        }
    } else {
        let right = pop(stack)?;
        let left = pop(stack)?;
        binary(op, &left, &right)?
    };
    stack.push(result);
    Ok(())
}

fn pop(stack: &mut Stack) -> Result<Quantity> {
    stack
        .pop()
        .ok_or_else(|| Error::Internal("operand stack underflow".into()))
}

fn binary(op: OperatorKind, left: &Quantity, right: &Quantity) -> Result<Quantity> {
    let value = match op {
        OperatorKind::Add => left.add(right)?,
        OperatorKind::Sub => left.sub(right)?,
        OperatorKind::Mult => left.mul(right)?,
        OperatorKind::Div => left.div(right)?,
        OperatorKind::Pow | OperatorKind::Root => power(op, left, right)?,
        OperatorKind::Equals => truth(left.compare(right)? == Ordering::Equal),
        OperatorKind::Differs => truth(left.compare(right)? != Ordering::Equal),
        OperatorKind::LessThan => truth(left.compare(right)? == Ordering::Less),
        OperatorKind::LessOrEqual => truth(left.compare(right)? != Ordering::Greater),
        OperatorKind::GreaterThan => truth(left.compare(right)? == Ordering::Greater),
        OperatorKind::GreaterOrEqual => truth(left.compare(right)? != Ordering::Less),
        other => {
            return Err(Error::Internal(format!(
                "operator '{}' in postfix stream",
                other.symbol()
            )))
        }
    };
    Ok(value)
}

fn truth(value: bool) -> Quantity {
    if value {
        true_quantity()
    } else {
        false_quantity()
    }
}

/// `base ^ exponent` and `base # exponent`.
///
/// A fractional exponent with magnitude below one swaps the operation
/// (`x ^ 0.5` is `x # 2`). Exponents of dimensioned bases are truncated to
/// whole numbers so the dimension vector stays integral.
fn power(op: OperatorKind, base: &Quantity, exponent: &Quantity) -> Result<Quantity> {
    if !exponent.is_dimensionless() {
        return Err(physcalc_units::Error::DimensionedExponent(
            exponent.unit().symbol().to_string(),
        )
        .into());
    }

    let e = exponent.si_value();
    if e == 0.0 {
        return match op {
            OperatorKind::Root => Err(physcalc_units::Error::Domain("zeroth root").into()),
            _ => Ok(Quantity::dimensionless(1.0)),
        };
    }

    let (op, e) = if e.abs() >= 1.0 {
        (op, e)
    } else {
        let swapped = match op {
            OperatorKind::Pow => OperatorKind::Root,
            _ => OperatorKind::Pow,
        };
        (swapped, 1.0 / e)
    };

    let integral = e.fract() == 0.0 && e.abs() <= f64::from(i8::MAX);
    if base.is_dimensionless() && !integral {
        let exact = match op {
            OperatorKind::Pow => e,
            _ => 1.0 / e,
        };
        return Ok(base.powf(exact)?);
    }
    if e.abs() > f64::from(i8::MAX) {
        return Err(physcalc_units::Error::Overflow.into());
    }

    // In range, so the cast only drops the fraction.
    let n = e.trunc() as i8;
    let value = match op {
        OperatorKind::Pow => base.pow(n)?,
        _ => base.root(n)?,
    };
    Ok(value)
}
