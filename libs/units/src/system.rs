//! Unit-system registry.
//!
//! Units live in an append-only vector and are addressed by [`UnitId`]
//! handles. Convertible units reference their primary unit by handle, so the
//! registry forms a DAG rooted at base and derived units.

use crate::ast::{Atom, Term, UnitExpr};
use crate::error::{Error, Result};
use crate::parser;
use crate::quantity::Quantity;
use crate::unit::{BaseDimension, DimensionVector, Unit, UnitOrigin};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Index handle into a [`UnitSystem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnitId(usize);

impl UnitId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UnitKind {
    /// Coherent unit of one base dimension.
    Base(BaseDimension),
    /// Coherent unit for a dimension combination (e.g. `N`, `W`).
    Derived(DimensionVector),
    /// `primary = value * factor + offset`.
    Convertible {
        primary: UnitId,
        factor: f64,
        offset: f64,
    },
    /// A multiple of the coherent unit for `dimensions` (e.g. `L`).
    Scaled {
        dimensions: DimensionVector,
        factor: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitDef {
    pub symbol: String,
    pub name: String,
    pub kind: UnitKind,
    pub prefixable: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Prefix {
    pub symbol: &'static str,
    pub factor: f64,
}

/// Metric prefixes, two-character symbols first so `da` wins over `d`.
pub static PREFIXES: &[Prefix] = &[
    Prefix { symbol: "da", factor: 1e1 },
    Prefix { symbol: "Y", factor: 1e24 },
    Prefix { symbol: "Z", factor: 1e21 },
    Prefix { symbol: "E", factor: 1e18 },
    Prefix { symbol: "P", factor: 1e15 },
    Prefix { symbol: "T", factor: 1e12 },
    Prefix { symbol: "G", factor: 1e9 },
    Prefix { symbol: "M", factor: 1e6 },
    Prefix { symbol: "k", factor: 1e3 },
    Prefix { symbol: "h", factor: 1e2 },
    Prefix { symbol: "d", factor: 1e-1 },
    Prefix { symbol: "c", factor: 1e-2 },
    Prefix { symbol: "m", factor: 1e-3 },
    Prefix { symbol: "µ", factor: 1e-6 },
    Prefix { symbol: "u", factor: 1e-6 },
    Prefix { symbol: "n", factor: 1e-9 },
    Prefix { symbol: "p", factor: 1e-12 },
    Prefix { symbol: "f", factor: 1e-15 },
    Prefix { symbol: "a", factor: 1e-18 },
    Prefix { symbol: "z", factor: 1e-21 },
    Prefix { symbol: "y", factor: 1e-24 },
];

static SI: Lazy<UnitSystem> = Lazy::new(build_si);

#[derive(Clone, Debug)]
pub struct UnitSystem {
    name: String,
    units: Vec<UnitDef>,
    by_symbol: HashMap<String, UnitId>,
}

impl UnitSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
            by_symbol: HashMap::new(),
        }
    }

    /// A fresh copy of the built-in SI system.
    pub fn si() -> Self {
        SI.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> &UnitDef {
        &self.units[id.0]
    }

    pub fn id_of(&self, symbol: &str) -> Option<UnitId> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn definitions(&self) -> impl Iterator<Item = (UnitId, &UnitDef)> {
        self.units.iter().enumerate().map(|(i, d)| (UnitId(i), d))
    }

    pub fn add_base(&mut self, symbol: &str, name: &str, dim: BaseDimension) -> Result<UnitId> {
        self.push(symbol, name, UnitKind::Base(dim), true)
    }

    pub fn add_derived(
        &mut self,
        symbol: &str,
        name: &str,
        dimensions: DimensionVector,
    ) -> Result<UnitId> {
        self.push(symbol, name, UnitKind::Derived(dimensions), true)
    }

    pub fn add_convertible(
        &mut self,
        symbol: &str,
        name: &str,
        primary: UnitId,
        factor: f64,
        offset: f64,
    ) -> Result<UnitId> {
        let kind = UnitKind::Convertible {
            primary,
            factor,
            offset,
        };
        // Prefixes on affine units are meaningless.
        let prefixable = offset == 0.0 && !self.unit(primary).is_affine();
        self.push(symbol, name, kind, prefixable)
    }

    pub fn add_scaled(
        &mut self,
        symbol: &str,
        name: &str,
        dimensions: DimensionVector,
        factor: f64,
    ) -> Result<UnitId> {
        self.push(
            symbol,
            name,
            UnitKind::Scaled { dimensions, factor },
            true,
        )
    }

    /// Declares `symbol` as equal to `definition`. When the definition's unit is
    /// a registered symbol the new unit becomes convertible to it; otherwise it
    /// is scaled against the coherent unit of its dimensions.
    pub fn declare(&mut self, symbol: &str, definition: &Quantity) -> Result<UnitId> {
        if !symbol.chars().next().is_some_and(parser::is_symbol_start)
            || !symbol.chars().all(|c| c.is_alphabetic() || c == '°')
        {
            return Err(Error::Syntax {
                pos: 0,
                message: "unit symbols consist of letters only",
            });
        }
        let unit = definition.unit();
        match self.id_of(unit.symbol()) {
            Some(primary) if !unit.is_affine() => {
                self.add_convertible(symbol, symbol, primary, definition.value(), 0.0)
            }
            _ => {
                let si = definition.si_value();
                self.add_scaled(symbol, symbol, unit.dimensions(), si)
            }
        }
    }

    /// Resolves a registered unit handle into a [`Unit`].
    pub fn unit(&self, id: UnitId) -> Unit {
        let def = &self.units[id.0];
        match &def.kind {
            UnitKind::Base(dim) => Unit::new(
                def.symbol.as_str(),
                DimensionVector::base(*dim),
                1.0,
                0.0,
                UnitOrigin::Named,
            ),
            UnitKind::Derived(dims) => {
                Unit::new(def.symbol.as_str(), *dims, 1.0, 0.0, UnitOrigin::Named)
            }
            UnitKind::Convertible {
                primary,
                factor,
                offset,
            } => {
                let p = self.unit(*primary);
                Unit::new(
                    def.symbol.as_str(),
                    p.dimensions(),
                    factor * p.factor(),
                    offset * p.factor() + p.offset(),
                    UnitOrigin::Named,
                )
            }
            UnitKind::Scaled { dimensions, factor } => Unit::new(
                def.symbol.as_str(),
                *dimensions,
                *factor,
                0.0,
                UnitOrigin::Named,
            ),
        }
    }

    /// Looks up a symbol, trying an exact match before metric prefixes.
    pub fn lookup(&self, symbol: &str) -> Option<Unit> {
        if let Some(id) = self.id_of(symbol) {
            return Some(self.unit(id));
        }
        PREFIXES.iter().find_map(|p| {
            let rest = symbol.strip_prefix(p.symbol)?;
            let id = self.id_of(rest)?;
            if !self.units[id.0].prefixable {
                return None;
            }
            Some(
                self.unit(id)
                    .scaled(p.factor)
                    .with_symbol(symbol, UnitOrigin::Named),
            )
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.lookup(symbol).is_some()
    }

    /// First coherent (base or derived) unit with exactly these dimensions.
    pub fn named_unit_for(&self, dimensions: DimensionVector) -> Option<Unit> {
        if dimensions.is_dimensionless() {
            return None;
        }
        self.definitions().find_map(|(id, def)| {
            let matches = match &def.kind {
                UnitKind::Base(dim) => DimensionVector::base(*dim) == dimensions,
                UnitKind::Derived(dims) => *dims == dimensions,
                _ => false,
            };
            matches.then(|| self.unit(id))
        })
    }

    /// Parses and resolves a complete unit expression.
    pub fn parse_unit(&self, text: &str) -> Result<Unit> {
        let expr = parser::parse(text)?;
        self.resolve(&expr, text.trim())
    }

    /// Reads a unit suffix at the start of `text`. `None` when `text` does not
    /// start with a known unit symbol.
    pub fn scan_unit(&self, text: &str) -> Option<Result<(Unit, usize)>> {
        let (expr, used) = parser::scan(text, |s| self.contains(s))?;
        Some(self.resolve(&expr, &text[..used]).map(|u| (u, used)))
    }

    /// Resolves a parsed expression. `text` becomes the unit's label.
    pub fn resolve(&self, expr: &UnitExpr, text: &str) -> Result<Unit> {
        if let Some(sym) = expr.single_symbol() {
            return self
                .lookup(sym)
                .ok_or_else(|| Error::UnknownUnit(sym.to_string()));
        }
        let (dims, factor) = self.fold(expr)?;
        Ok(Unit::new(text, dims, factor, 0.0, UnitOrigin::Expression))
    }

    fn fold(&self, expr: &UnitExpr) -> Result<(DimensionVector, f64)> {
        let mut dims = DimensionVector::ZERO;
        let mut factor = 1.0;
        for (term, exp) in &expr.numerator {
            let (d, f) = self.fold_term(term, *exp)?;
            dims = dims.mul(d)?;
            factor *= f;
        }
        for (term, exp) in &expr.denominator {
            let (d, f) = self.fold_term(term, *exp)?;
            dims = dims.div(d)?;
            factor /= f;
        }
        Ok((dims, factor))
    }

    fn fold_term(&self, term: &Term, exp: i8) -> Result<(DimensionVector, f64)> {
        let (dims, factor) = match term {
            Term::Atom(Atom::Symbol(sym)) => {
                let unit = self
                    .lookup(sym)
                    .ok_or_else(|| Error::UnknownUnit(sym.clone()))?;
                if unit.is_affine() {
                    return Err(Error::AffineExponent(sym.clone()));
                }
                (unit.dimensions(), unit.factor())
            }
            Term::Atom(Atom::Integer(n)) => (DimensionVector::ZERO, *n as f64),
            Term::Group(inner) => self.fold(inner)?,
        };
        Ok((dims.pow(exp)?, factor.powi(i32::from(exp))))
    }

    fn push(&mut self, symbol: &str, name: &str, kind: UnitKind, prefixable: bool) -> Result<UnitId> {
        if self.by_symbol.contains_key(symbol) {
            return Err(Error::DuplicateSymbol(symbol.to_string()));
        }
        let id = UnitId(self.units.len());
        self.units.push(UnitDef {
            symbol: symbol.to_string(),
            name: name.to_string(),
            kind,
            prefixable,
        });
        self.by_symbol.insert(symbol.to_string(), id);
        Ok(id)
    }
}

fn build_si() -> UnitSystem {
    use BaseDimension::*;

    let mut si = UnitSystem::new("SI");
    let d = DimensionVector::from_exponents;

    fn add(r: Result<UnitId>) -> UnitId {
        r.unwrap_or_else(|e| panic!("invalid built-in SI table: {e}"))
    }

    let m = add(si.add_base("m", "metre", Length));
    let kg = add(si.add_base("Kg", "kilogram", Mass));
    let s = add(si.add_base("s", "second", Time));
    add(si.add_base("A", "ampere", Current));
    let k = add(si.add_base("K", "kelvin", Temperature));
    add(si.add_base("mol", "mole", Amount));
    add(si.add_base("cd", "candela", LuminousIntensity));
    // `Kg` already carries a prefix; metric prefixes go on `g`.
    si.units[kg.0].prefixable = false;

    let derived: &[(&str, &str, DimensionVector)] = &[
        ("Hz", "hertz", d(&[(Time, -1)])),
        ("N", "newton", d(&[(Mass, 1), (Length, 1), (Time, -2)])),
        ("Pa", "pascal", d(&[(Mass, 1), (Length, -1), (Time, -2)])),
        ("J", "joule", d(&[(Mass, 1), (Length, 2), (Time, -2)])),
        ("W", "watt", d(&[(Mass, 1), (Length, 2), (Time, -3)])),
        ("C", "coulomb", d(&[(Current, 1), (Time, 1)])),
        (
            "V",
            "volt",
            d(&[(Mass, 1), (Length, 2), (Time, -3), (Current, -1)]),
        ),
        (
            "F",
            "farad",
            d(&[(Mass, -1), (Length, -2), (Time, 4), (Current, 2)]),
        ),
        (
            "Ohm",
            "ohm",
            d(&[(Mass, 1), (Length, 2), (Time, -3), (Current, -2)]),
        ),
        (
            "S",
            "siemens",
            d(&[(Mass, -1), (Length, -2), (Time, 3), (Current, 2)]),
        ),
        (
            "Wb",
            "weber",
            d(&[(Mass, 1), (Length, 2), (Time, -2), (Current, -1)]),
        ),
        ("T", "tesla", d(&[(Mass, 1), (Time, -2), (Current, -1)])),
        (
            "H",
            "henry",
            d(&[(Mass, 1), (Length, 2), (Time, -2), (Current, -2)]),
        ),
        ("kat", "katal", d(&[(Amount, 1), (Time, -1)])),
    ];
    for (sym, name, dims) in derived {
        add(si.add_derived(sym, name, *dims));
    }

    let pa = si.id_of("Pa");
    let j = si.id_of("J");

    add(si.add_convertible("g", "gram", kg, 1e-3, 0.0));
    add(si.add_convertible("t", "tonne", kg, 1e3, 0.0));
    add(si.add_convertible("min", "minute", s, 60.0, 0.0));
    add(si.add_convertible("h", "hour", s, 3600.0, 0.0));
    add(si.add_convertible("d", "day", s, 86400.0, 0.0));
    add(si.add_convertible("in", "inch", m, 0.0254, 0.0));
    add(si.add_convertible("ft", "foot", m, 0.3048, 0.0));
    add(si.add_convertible("mi", "mile", m, 1609.344, 0.0));
    add(si.add_convertible("°C", "degree Celsius", k, 1.0, 273.15));
    add(
        si.add_convertible("°F", "degree Fahrenheit", k, 5.0 / 9.0, 459.67 * 5.0 / 9.0),
    );
    if let Some(pa) = pa {
        add(si.add_convertible("bar", "bar", pa, 1e5, 0.0));
        add(si.add_convertible("atm", "atmosphere", pa, 101_325.0, 0.0));
    }
    if let Some(j) = j {
        add(si.add_convertible("cal", "calorie", j, 4.184, 0.0));
        add(si.add_convertible("Wh", "watt hour", j, 3600.0, 0.0));
        add(si.add_convertible("eV", "electronvolt", j, 1.602_176_634e-19, 0.0));
    }
    add(si.add_scaled("L", "litre", d(&[(Length, 3)]), 1e-3));
    add(si.add_scaled("rad", "radian", DimensionVector::ZERO, 1.0));
    add(si.add_scaled("deg", "degree", DimensionVector::ZERO, std::f64::consts::PI / 180.0));

    si
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_symbol_wins_over_prefix() {
        let si = UnitSystem::si();
        assert_eq!(si.lookup("h").unwrap().factor(), 3600.0);
        assert_eq!(si.lookup("T").unwrap().dimensions().exponent(BaseDimension::Mass), 1);
        assert_eq!(si.lookup("m").unwrap().factor(), 1.0);
    }

    #[test]
    fn prefixes_scale_units() {
        let si = UnitSystem::si();
        assert!((si.lookup("km").unwrap().factor() - 1e3).abs() < 1e-9);
        assert!((si.lookup("mg").unwrap().factor() - 1e-6).abs() < 1e-18);
        assert!((si.lookup("dam").unwrap().factor() - 10.0).abs() < 1e-12);
        assert!(si.lookup("kKg").is_none());
        assert!(si.lookup("k°C").is_none());
    }

    #[test]
    fn convertible_units_fold_through_primary() {
        let si = UnitSystem::si();
        let c = si.lookup("°C").unwrap();
        assert_eq!(c.to_si(0.0), 273.15);
        let f = si.lookup("°F").unwrap();
        assert!((f.to_si(32.0) - 273.15).abs() < 1e-9);
    }

    #[test]
    fn parse_unit_folds_expressions() {
        let si = UnitSystem::si();
        let u = si.parse_unit("km/h").unwrap();
        assert!((u.factor() - 1000.0 / 3600.0).abs() < 1e-12);
        assert_eq!(u.symbol(), "km/h");
        assert_eq!(u.origin(), UnitOrigin::Expression);
        assert!(matches!(si.parse_unit("°C/s"), Err(Error::AffineExponent(_))));
        assert!(matches!(si.parse_unit("qq"), Err(Error::UnknownUnit(_))));
    }

    #[test]
    fn named_unit_for_prefers_first_registered() {
        let si = UnitSystem::si();
        let w = d(&[
            (BaseDimension::Mass, 1),
            (BaseDimension::Length, 2),
            (BaseDimension::Time, -3),
        ]);
        assert_eq!(si.named_unit_for(w).unwrap().symbol(), "W");
        assert!(si.named_unit_for(DimensionVector::ZERO).is_none());
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let mut si = UnitSystem::si();
        let r = si.add_base("m", "again", BaseDimension::Length);
        assert_eq!(r, Err(Error::DuplicateSymbol("m".into())));
    }

    #[test]
    fn declare_builds_convertible_or_scaled_units() {
        let mut si = UnitSystem::si();
        let m = si.lookup("m").unwrap();
        let id = si.declare("furlong", &Quantity::new(201.168, m)).unwrap();
        assert!(matches!(si.get(id).kind, UnitKind::Convertible { .. }));

        let acre_dims = si.parse_unit("m^2").unwrap();
        let id = si
            .declare("acre", &Quantity::new(4046.8564224, acre_dims))
            .unwrap();
        assert!(matches!(si.get(id).kind, UnitKind::Scaled { .. }));
        assert!((si.lookup("acre").unwrap().factor() - 4046.8564224).abs() < 1e-9);
    }

    fn d(parts: &[(BaseDimension, i8)]) -> DimensionVector {
        DimensionVector::from_exponents(parts)
    }
}
