use crate::error::{Error, Result};
use crate::system::UnitSystem;
use crate::unit::{DimensionVector, Unit, UnitOrigin};
use std::cmp::Ordering;
use std::fmt;

/// Relative tolerance used when comparing quantities for equality.
pub const EQUALITY_TOLERANCE: f64 = 1e-12;

/// A numeric value paired with a unit. Operations return new quantities.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn dimensionless(value: f64) -> Self {
        Self::new(value, Unit::dimensionless())
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn dimensions(&self) -> DimensionVector {
        self.unit.dimensions()
    }

    /// Value expressed in coherent SI units.
    pub fn si_value(&self) -> f64 {
        self.unit.to_si(self.value)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.unit.dimensions().is_dimensionless()
    }

    pub fn add(&self, rhs: &Quantity) -> Result<Quantity> {
        let r = self.align(rhs)?;
        Ok(Quantity::new(self.value + r, self.unit.clone()))
    }

    pub fn sub(&self, rhs: &Quantity) -> Result<Quantity> {
        let r = self.align(rhs)?;
        Ok(Quantity::new(self.value - r, self.unit.clone()))
    }

    pub fn mul(&self, rhs: &Quantity) -> Result<Quantity> {
        if rhs.unit.is_plain_number() {
            return Ok(self.scale(rhs.value));
        }
        if self.unit.is_plain_number() {
            return Ok(rhs.scale(self.value));
        }
        let dims = self.dimensions().mul(rhs.dimensions())?;
        Ok(Quantity::new(
            self.si_value() * rhs.si_value(),
            Unit::coherent(dims),
        ))
    }

    pub fn div(&self, rhs: &Quantity) -> Result<Quantity> {
        if rhs.unit.is_plain_number() {
            return Ok(self.scale(1.0 / rhs.value));
        }
        let dims = self.dimensions().div(rhs.dimensions())?;
        Ok(Quantity::new(
            self.si_value() / rhs.si_value(),
            Unit::coherent(dims),
        ))
    }

    /// Multiplies the value, keeping the unit.
    pub fn scale(&self, by: f64) -> Quantity {
        Quantity::new(self.value * by, self.unit.clone())
    }

    pub fn neg(&self) -> Quantity {
        self.scale(-1.0)
    }

    /// Integer power.
    pub fn pow(&self, n: i8) -> Result<Quantity> {
        if n == 0 {
            return Ok(Quantity::dimensionless(1.0));
        }
        if n == 1 {
            return Ok(self.clone());
        }
        if self.unit.is_plain_number() {
            return Ok(Quantity::dimensionless(self.value.powi(i32::from(n))));
        }
        if self.unit.is_affine() {
            return Err(Error::AffineExponent(self.unit.symbol().to_string()));
        }
        let dims = self.dimensions().pow(n)?;
        Ok(Quantity::new(
            self.si_value().powi(i32::from(n)),
            Unit::coherent(dims),
        ))
    }

    /// Integer root. Every dimension exponent must be divisible by `n`.
    pub fn root(&self, n: i8) -> Result<Quantity> {
        if n == 0 {
            return Err(Error::Domain("zeroth root"));
        }
        if n < 0 {
            let positive = self.root(n.checked_neg().ok_or(Error::Overflow)?)?;
            return Quantity::dimensionless(1.0).div(&positive);
        }
        if n == 1 {
            return Ok(self.clone());
        }
        if self.unit.is_affine() {
            return Err(Error::AffineExponent(self.unit.symbol().to_string()));
        }
        let dims = self
            .dimensions()
            .root(n)
            .ok_or_else(|| Error::NotRootable {
                unit: self.unit.symbol().to_string(),
                root: n,
            })?;
        let si = self.si_value();
        let value = if si < 0.0 {
            if n % 2 == 0 {
                return Err(Error::Domain("even root of a negative value"));
            }
            -(-si).powf(1.0 / f64::from(n))
        } else {
            si.powf(1.0 / f64::from(n))
        };
        let unit = if dims.is_dimensionless() {
            Unit::dimensionless()
        } else {
            Unit::coherent(dims)
        };
        Ok(Quantity::new(value, unit))
    }

    /// Real power of a dimensionless quantity.
    pub fn powf(&self, exponent: f64) -> Result<Quantity> {
        if !self.is_dimensionless() {
            return Err(Error::DimensionedExponent(self.unit.symbol().to_string()));
        }
        Ok(Quantity::dimensionless(self.si_value().powf(exponent)))
    }

    /// Orders two quantities of the same dimensions by their SI values.
    pub fn compare(&self, other: &Quantity) -> Result<Ordering> {
        if !self.unit.convertible(&other.unit) {
            return Err(self.incompatible(&other.unit));
        }
        let (a, b) = (self.si_value(), other.si_value());
        if (a - b).abs() <= EQUALITY_TOLERANCE * a.abs().max(b.abs()) {
            return Ok(Ordering::Equal);
        }
        a.partial_cmp(&b)
            .ok_or(Error::Domain("comparison with NaN"))
    }

    pub fn convert_to(&self, target: &Unit) -> Result<Quantity> {
        if !self.unit.convertible(target) {
            return Err(self.incompatible(target));
        }
        Ok(Quantity::new(target.from_si(self.si_value()), target.clone()))
    }

    /// Like [`convert_to`](Self::convert_to), but when the dimensions differ
    /// the result is labeled `target*(source/target)` with the source's
    /// dimensions instead of failing.
    pub fn convert_or_combine(&self, target: &Unit) -> Quantity {
        if let Ok(q) = self.convert_to(target) {
            return q;
        }
        let source = match self.unit.symbol() {
            "" => "1",
            s => s,
        };
        let label = format!("{t}*({source}/{t})", t = target.symbol());
        let unit = Unit::new(
            label,
            self.unit.dimensions(),
            self.unit.factor(),
            0.0,
            UnitOrigin::Expression,
        );
        Quantity::new(self.si_value() / self.unit.factor(), unit)
    }

    /// Relabels a computed unit with the named unit of the same dimensions,
    /// if `system` has one. Other quantities are returned unchanged.
    pub fn relabel(&self, system: &UnitSystem) -> Quantity {
        if self.unit.origin() != UnitOrigin::Computed {
            return self.clone();
        }
        if self.is_dimensionless() {
            return Quantity::dimensionless(self.si_value());
        }
        match system.named_unit_for(self.dimensions()) {
            Some(named) => Quantity::new(named.from_si(self.si_value()), named),
            None => self.clone(),
        }
    }

    /// Formats with at most `precision` significant digits.
    pub fn format_with(&self, precision: Option<usize>) -> String {
        let value = match precision {
            Some(p) => format_significant(self.value, p),
            None => self.value.to_string(),
        };
        if self.unit.symbol().is_empty() {
            value
        } else {
            format!("{value} {}", self.unit.symbol())
        }
    }

    /// Value of `rhs` expressed in this quantity's unit.
    fn align(&self, rhs: &Quantity) -> Result<f64> {
        if !self.unit.convertible(&rhs.unit) {
            return Err(self.incompatible(&rhs.unit));
        }
        Ok(self.unit.from_si(rhs.si_value()))
    }

    fn incompatible(&self, other: &Unit) -> Error {
        Error::Incompatible {
            from: display_symbol(&self.unit),
            to: display_symbol(other),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with(None))
    }
}

fn display_symbol(unit: &Unit) -> String {
    match unit.symbol() {
        "" => "1".to_string(),
        s => s.to_string(),
    }
}

/// Rounds to `digits` significant digits, including digits left of the
/// decimal point (`123456` at 2 digits is `120000`).
fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let decimals = digits.max(1) - 1;
    let rounded = format!("{value:.decimals$e}");
    rounded.parse::<f64>().unwrap_or(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn si() -> UnitSystem {
        UnitSystem::si()
    }

    fn q(value: f64, unit: &str) -> Quantity {
        Quantity::new(value, si().parse_unit(unit).unwrap())
    }

    #[test]
    fn addition_converts_into_left_unit() {
        let sum = q(1.0, "km").add(&q(500.0, "m")).unwrap();
        assert_eq!(sum.unit().symbol(), "km");
        assert!((sum.value() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn addition_rejects_mismatched_dimensions() {
        let err = q(1.0, "m").add(&q(1.0, "s")).unwrap_err();
        assert_eq!(
            err,
            Error::Incompatible {
                from: "m".into(),
                to: "s".into()
            }
        );
    }

    #[test]
    fn multiplication_by_plain_number_keeps_unit() {
        let r = q(3.0, "km").mul(&Quantity::dimensionless(2.0)).unwrap();
        assert_eq!(r.unit().symbol(), "km");
        assert_eq!(r.value(), 6.0);
    }

    #[test]
    fn product_relabels_to_named_unit() {
        let p = q(2.0, "N").mul(&q(3.0, "m/s")).unwrap().relabel(&si());
        assert_eq!(p.unit().symbol(), "W");
        assert!((p.value() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn root_checks_dimensions() {
        let r = q(9.0, "m^2").root(2).unwrap().relabel(&si());
        assert_eq!(r.unit().symbol(), "m");
        assert!((r.value() - 3.0).abs() < 1e-12);
        assert!(matches!(q(8.0, "m^3").root(2), Err(Error::NotRootable { .. })));
    }

    #[test]
    fn comparison_converts_units() {
        assert_eq!(q(1.0, "km").compare(&q(1000.0, "m")), Ok(Ordering::Equal));
        assert_eq!(q(1.0, "min").compare(&q(61.0, "s")), Ok(Ordering::Less));
        assert!(q(1.0, "m").compare(&q(1.0, "s")).is_err());
    }

    #[test]
    fn affine_conversion() {
        let c = q(100.0, "°C").convert_to(&si().lookup("°F").unwrap()).unwrap();
        assert!((c.value() - 212.0).abs() < 1e-9);
    }

    #[test]
    fn combine_keeps_value_and_dimensions() {
        let r = q(5.0, "m").convert_or_combine(&si().lookup("s").unwrap());
        assert_eq!(r.unit().symbol(), "s*(m/s)");
        assert_eq!(r.value(), 5.0);
        assert_eq!(r.dimensions(), q(1.0, "m").dimensions());
    }

    #[test]
    fn formats_significant_digits() {
        assert_eq!(q(3.14159, "m").format_with(Some(3)), "3.14 m");
        assert_eq!(Quantity::dimensionless(1500.0).format_with(Some(2)), "1500");
        assert_eq!(Quantity::dimensionless(0.5).to_string(), "0.5");
    }

    #[test]
    fn rounds_integer_digits() {
        let shown = |v: f64, p: usize| Quantity::dimensionless(v).format_with(Some(p));
        assert_eq!(shown(123456.0, 2), "120000");
        assert_eq!(shown(-987654.0, 3), "-988000");
        assert_eq!(shown(9.99, 2), "10");
        assert_eq!(shown(0.000123456, 2), "0.00012");
        assert_eq!(q(2500.4, "m").format_with(Some(1)), "3000 m");
    }
}
