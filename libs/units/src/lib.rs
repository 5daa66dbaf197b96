#![forbid(unsafe_code)]
//! Physical quantities and units: dimension vectors, a unit-system registry
//! with SI defaults and metric prefixes, a unit-expression parser, and
//! dimension-checked arithmetic, comparison and conversion.

mod ast;
mod error;
mod parser;
mod quantity;
mod system;
mod unit;

pub use ast::{Atom, Term, UnitExpr};
pub use error::{Error, Result};
pub use parser::{parse, scan, validate, ScanMode};
pub use quantity::{Quantity, EQUALITY_TOLERANCE};
pub use system::{Prefix, UnitDef, UnitId, UnitKind, UnitSystem, PREFIXES};
pub use unit::{render_dimensions, BaseDimension, DimensionVector, Unit, UnitOrigin, BASE_DIMENSIONS};

/// The dimensionless zero used as boolean false.
pub fn false_quantity() -> Quantity {
    Quantity::dimensionless(0.0)
}

/// The dimensionless one used as boolean true.
pub fn true_quantity() -> Quantity {
    Quantity::dimensionless(1.0)
}

/// Any quantity other than dimensionless zero counts as true.
pub fn is_truthy(q: &Quantity) -> bool {
    !(q.is_dimensionless() && q.si_value() == 0.0)
}
