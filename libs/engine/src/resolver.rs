//! Name resolution trait used by the tokenizer
//!
//! The tokenizer never owns any state about variables, functions or units.
//! Every identifier it meets is handed to a [`Resolver`], which classifies
//! it and later produces its value. [`Environment`](crate::Environment) is
//! the production implementation; tests plug in small in-memory resolvers.

use crate::engine::EvalOptions;
use crate::error::Result;
use physcalc_units::{Quantity, Unit, UnitSystem};

/// Handle to a scope in an environment's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

/// Handle to a unit system registered in an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub usize);

/// What a resolved name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Variable,
    Function,
    Unit,
    UnitSystem,
    Namespace,
}

/// Where a resolved name lives. Passed back to the resolver to fetch the
/// item, or to continue a qualified name (`outer.inner`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Scope(ScopeId),
    System(SystemId),
    /// The built-in function table.
    Builtins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub kind: ItemKind,
    pub context: Context,
}

impl Resolved {
    pub fn new(kind: ItemKind, context: Context) -> Self {
        Self { kind, context }
    }
}

/// Identifier resolution and evaluation callbacks.
///
/// # Qualified names
///
/// When [`lookup`](Resolver::lookup) returns a `Namespace` or `UnitSystem`,
/// the tokenizer reads `.segment` and calls
/// [`lookup_qualified`](Resolver::lookup_qualified) with the returned context.
/// For a namespace the context is the namespace's own scope; for a unit
/// system it is the system itself.
///
/// # Example
///
/// A resolver that knows one variable, `c`, in a single flat scope:
///
/// ```rust
/// use physcalc_engine::units::{Quantity, Unit, UnitSystem};
/// use physcalc_engine::{
///     parse_expression, Context, Error, EvalOptions, ItemKind, Resolved, Resolver, Result,
///     ScopeId,
/// };
///
/// struct Constants {
///     si: UnitSystem,
///     options: EvalOptions,
/// }
///
/// const ROOT: Context = Context::Scope(ScopeId(0));
///
/// impl Resolver for Constants {
///     fn lookup(&self, name: &str) -> Option<Resolved> {
///         if name == "c" {
///             return Some(Resolved::new(ItemKind::Variable, ROOT));
///         }
///         self.si.contains(name).then(|| Resolved::new(ItemKind::Unit, ROOT))
///     }
///     fn lookup_qualified(&self, _: Context, _: &str) -> Option<Resolved> {
///         None
///     }
///     fn variable(&self, _: Context, name: &str) -> Option<Quantity> {
///         (name == "c").then(|| Quantity::dimensionless(299_792_458.0))
///     }
///     fn unit(&self, _: Context, name: &str) -> Option<Unit> {
///         self.si.lookup(name)
///     }
///     fn evaluate_function(&mut self, _: Context, name: &str, _: &[Quantity]) -> Result<Quantity> {
///         Err(Error::UnknownIdentifier(name.to_string()))
///     }
///     fn evaluate_file_function(&mut self, _: &str) -> Result<Option<Quantity>> {
///         Ok(None)
///     }
///     fn unit_system(&self) -> &UnitSystem {
///         &self.si
///     }
///     fn options(&self) -> &EvalOptions {
///         &self.options
///     }
/// }
///
/// let mut constants = Constants {
///     si: UnitSystem::si(),
///     options: EvalOptions::default(),
/// };
/// let value = parse_expression("c * 2", &mut constants).value.unwrap();
/// assert_eq!(value.value(), 599_584_916.0);
/// ```
pub trait Resolver {
    /// Classifies an unqualified name as seen from the current scope.
    /// `None` means the name is unknown.
    fn lookup(&self, name: &str) -> Option<Resolved>;

    /// Classifies `name` inside a namespace or unit system.
    fn lookup_qualified(&self, context: Context, name: &str) -> Option<Resolved>;

    /// Value of a variable previously classified by a lookup.
    fn variable(&self, context: Context, name: &str) -> Option<Quantity>;

    /// A unit previously classified by a lookup.
    fn unit(&self, context: Context, name: &str) -> Option<Unit>;

    /// Calls a function with already-evaluated arguments.
    fn evaluate_function(
        &mut self,
        context: Context,
        name: &str,
        args: &[Quantity],
    ) -> Result<Quantity>;

    /// Tries to run `name` as a script file function (`name()` with no
    /// declaration in scope). `Ok(None)` when no such file exists.
    fn evaluate_file_function(&mut self, name: &str) -> Result<Option<Quantity>>;

    /// The unit system used for literal suffixes and conversions.
    fn unit_system(&self) -> &UnitSystem;

    fn options(&self) -> &EvalOptions;
}
