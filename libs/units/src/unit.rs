use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Number of SI base dimensions.
pub const BASE_DIMENSIONS: usize = 7;

/// The seven SI base dimensions, in [`DimensionVector`] index order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseDimension {
    Length,
    Mass,
    Time,
    Current,
    Temperature,
    Amount,
    LuminousIntensity,
}

impl BaseDimension {
    pub const ALL: [BaseDimension; BASE_DIMENSIONS] = [
        BaseDimension::Length,
        BaseDimension::Mass,
        BaseDimension::Time,
        BaseDimension::Current,
        BaseDimension::Temperature,
        BaseDimension::Amount,
        BaseDimension::LuminousIntensity,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Symbol of the coherent SI unit for this dimension.
    pub fn si_symbol(self) -> &'static str {
        match self {
            BaseDimension::Length => "m",
            BaseDimension::Mass => "Kg",
            BaseDimension::Time => "s",
            BaseDimension::Current => "A",
            BaseDimension::Temperature => "K",
            BaseDimension::Amount => "mol",
            BaseDimension::LuminousIntensity => "cd",
        }
    }
}

/// Exponents of the seven base dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionVector(pub [i8; BASE_DIMENSIONS]);

impl DimensionVector {
    pub const ZERO: DimensionVector = DimensionVector([0; BASE_DIMENSIONS]);

    pub fn base(dim: BaseDimension) -> Self {
        let mut v = [0; BASE_DIMENSIONS];
        v[dim.index()] = 1;
        DimensionVector(v)
    }

    /// Builds a vector from `(dimension, exponent)` pairs.
    pub fn from_exponents(parts: &[(BaseDimension, i8)]) -> Self {
        let mut v = [0; BASE_DIMENSIONS];
        for (dim, exp) in parts {
            v[dim.index()] += exp;
        }
        DimensionVector(v)
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn exponent(&self, dim: BaseDimension) -> i8 {
        self.0[dim.index()]
    }

    /// Dimensions of a product.
    pub fn mul(self, other: Self) -> Result<Self> {
        self.zip(other, i8::checked_add)
    }

    /// Dimensions of a quotient.
    pub fn div(self, other: Self) -> Result<Self> {
        self.zip(other, i8::checked_sub)
    }

    pub fn pow(self, n: i8) -> Result<Self> {
        let mut out = [0; BASE_DIMENSIONS];
        for (o, e) in out.iter_mut().zip(self.0) {
            *o = e.checked_mul(n).ok_or(Error::Overflow)?;
        }
        Ok(DimensionVector(out))
    }

    /// Dimensions of the n-th root, if every exponent is divisible by `n`.
    pub fn root(self, n: i8) -> Option<Self> {
        if n == 0 {
            return None;
        }
        let mut out = [0; BASE_DIMENSIONS];
        for (o, e) in out.iter_mut().zip(self.0) {
            if e % n != 0 {
                return None;
            }
            *o = e / n;
        }
        Some(DimensionVector(out))
    }

    fn zip(self, other: Self, op: fn(i8, i8) -> Option<i8>) -> Result<Self> {
        let mut out = [0; BASE_DIMENSIONS];
        for (i, o) in out.iter_mut().enumerate() {
            *o = op(self.0[i], other.0[i]).ok_or(Error::Overflow)?;
        }
        Ok(DimensionVector(out))
    }
}

/// How a [`Unit`] came to be, which decides whether results may be relabeled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitOrigin {
    /// A registered symbol, possibly with a metric prefix.
    Named,
    /// A unit expression written by the user, e.g. `km/h`.
    Expression,
    /// Produced by quantity arithmetic; eligible for relabeling.
    Computed,
}

/// A resolved unit: dimensions plus the affine map to coherent SI,
/// `si = value * factor + offset`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    symbol: Arc<str>,
    dimensions: DimensionVector,
    factor: f64,
    offset: f64,
    origin: UnitOrigin,
}

impl Unit {
    pub fn new(
        symbol: impl Into<Arc<str>>,
        dimensions: DimensionVector,
        factor: f64,
        offset: f64,
        origin: UnitOrigin,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            dimensions,
            factor,
            offset,
            origin,
        }
    }

    /// The unit of plain numbers.
    pub fn dimensionless() -> Self {
        Self::new("", DimensionVector::ZERO, 1.0, 0.0, UnitOrigin::Named)
    }

    /// Coherent SI unit for `dimensions`, labeled with base symbols.
    pub fn coherent(dimensions: DimensionVector) -> Self {
        Self::new(
            render_dimensions(dimensions),
            dimensions,
            1.0,
            0.0,
            UnitOrigin::Computed,
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dimensions(&self) -> DimensionVector {
        self.dimensions
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn origin(&self) -> UnitOrigin {
        self.origin
    }

    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }

    /// True for the plain-number unit (no dimensions, no scaling).
    pub fn is_plain_number(&self) -> bool {
        self.dimensions.is_dimensionless() && self.factor == 1.0 && self.offset == 0.0
    }

    pub fn convertible(&self, other: &Unit) -> bool {
        self.dimensions == other.dimensions
    }

    pub fn to_si(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    pub fn from_si(&self, si: f64) -> f64 {
        (si - self.offset) / self.factor
    }

    pub(crate) fn with_symbol(mut self, symbol: impl Into<Arc<str>>, origin: UnitOrigin) -> Self {
        self.symbol = symbol.into();
        self.origin = origin;
        self
    }

    pub(crate) fn scaled(mut self, by: f64) -> Self {
        self.factor *= by;
        self
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Renders dimensions with SI base symbols in a form the unit parser accepts,
/// e.g. `Kg*m/s^2` or `s^-1`.
pub fn render_dimensions(dim: DimensionVector) -> String {
    let order = [
        BaseDimension::Mass,
        BaseDimension::Length,
        BaseDimension::Time,
        BaseDimension::Current,
        BaseDimension::Temperature,
        BaseDimension::Amount,
        BaseDimension::LuminousIntensity,
    ];
    let positive: Vec<(&str, i8)> = order
        .iter()
        .map(|d| (d.si_symbol(), dim.exponent(*d)))
        .filter(|(_, e)| *e > 0)
        .collect();
    let negative: Vec<(&str, i8)> = order
        .iter()
        .map(|d| (d.si_symbol(), dim.exponent(*d)))
        .filter(|(_, e)| *e < 0)
        .collect();

    let term = |sym: &str, exp: i8| {
        if exp == 1 {
            sym.to_string()
        } else {
            format!("{sym}^{exp}")
        }
    };

    if positive.is_empty() {
        return negative
            .iter()
            .map(|(s, e)| term(s, *e))
            .collect::<Vec<_>>()
            .join("*");
    }

    let mut out = positive
        .iter()
        .map(|(s, e)| term(s, *e))
        .collect::<Vec<_>>()
        .join("*");
    for (s, e) in negative {
        out.push('/');
        out.push_str(&term(s, -e));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_force() {
        let n = DimensionVector::from_exponents(&[
            (BaseDimension::Mass, 1),
            (BaseDimension::Length, 1),
            (BaseDimension::Time, -2),
        ]);
        assert_eq!(render_dimensions(n), "Kg*m/s^2");
    }

    #[test]
    fn renders_pure_reciprocal_with_negative_exponents() {
        let hz = DimensionVector::from_exponents(&[(BaseDimension::Time, -1)]);
        assert_eq!(render_dimensions(hz), "s^-1");
    }

    #[test]
    fn root_requires_divisible_exponents() {
        let area = DimensionVector::from_exponents(&[(BaseDimension::Length, 2)]);
        assert_eq!(
            area.root(2),
            Some(DimensionVector::base(BaseDimension::Length))
        );
        assert_eq!(area.root(3), None);
    }

    #[test]
    fn exponent_overflow_is_an_error() {
        let v = DimensionVector::from_exponents(&[(BaseDimension::Length, 100)]);
        assert_eq!(v.pow(2), Err(Error::Overflow));
    }
}
