//! Evaluation environment
//!
//! Owns everything a session knows: an arena of scopes (global scope,
//! namespaces, call frames), the unit systems, the pending function
//! declaration of each scope and the output sink. Implements [`Resolver`]
//! so the tokenizer can look names up and call functions.

use crate::commands;
use crate::declaration::{Function, FunctionDeclaration};
use crate::engine::EvalOptions;
use crate::error::{Error, Result};
use crate::functions;
use crate::resolver::{Context, ItemKind, Resolved, Resolver, ScopeId, SystemId};
use physcalc_units::{false_quantity, Quantity, Unit, UnitId, UnitSystem};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Extension of script files used by `Read` and file functions.
pub const SCRIPT_EXTENSION: &str = "cal";

/// The global scope is always the first arena slot.
pub const GLOBAL: ScopeId = ScopeId(0);

/// Anything a name can be bound to.
#[derive(Debug, Clone)]
pub enum NamedItem {
    Variable(Quantity),
    Function {
        function: Rc<Function>,
        /// Scope the function was declared in; its calls see that scope.
        scope: ScopeId,
    },
    Unit {
        system: SystemId,
        id: UnitId,
    },
    UnitSystem(SystemId),
    Namespace(ScopeId),
}

impl NamedItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            NamedItem::Variable(_) => ItemKind::Variable,
            NamedItem::Function { .. } => ItemKind::Function,
            NamedItem::Unit { .. } => ItemKind::Unit,
            NamedItem::UnitSystem(_) => ItemKind::UnitSystem,
            NamedItem::Namespace(_) => ItemKind::Namespace,
        }
    }
}

#[derive(Debug)]
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    items: BTreeMap<String, NamedItem>,
    declaration: Option<FunctionDeclaration>,
}

impl Scope {
    fn new(name: impl Into<String>, parent: Option<ScopeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            items: BTreeMap::new(),
            declaration: None,
        }
    }
}

/// A call frame. Leaving it releases the frame's scope and every scope
/// created after it.
struct Frame {
    scope: ScopeId,
    caller: ScopeId,
    floor: usize,
}

pub struct Environment {
    scopes: Vec<Scope>,
    systems: Vec<UnitSystem>,
    active: SystemId,
    current: ScopeId,
    depth: usize,
    /// First arena slot owned by the innermost call frame. Scopes from here
    /// on are released when that frame returns.
    floor: usize,
    options: EvalOptions,
    output: Box<dyn Write>,
}

impl Environment {
    /// A fresh environment writing to stdout.
    pub fn new(options: EvalOptions) -> Self {
        Self::with_output(options, Box::new(io::stdout()))
    }

    pub fn with_output(options: EvalOptions, output: Box<dyn Write>) -> Self {
        let si = UnitSystem::si();
        let mut global = Scope::new("global", None);
        global
            .items
            .insert(si.name().to_string(), NamedItem::UnitSystem(SystemId(0)));
        Self {
            scopes: vec![global],
            systems: vec![si],
            active: SystemId(0),
            current: GLOBAL,
            depth: 0,
            floor: 0,
            options,
            output,
        }
    }

    pub fn options_mut(&mut self) -> &mut EvalOptions {
        &mut self.options
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    /// Current call depth; 0 outside any function.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Runs one command line. See [`commands`] for the syntax.
    pub fn execute(&mut self, line: &str) -> Result<()> {
        commands::execute_line(self, line).map(|_| ())
    }

    /// True while a function declaration in the current scope awaits more
    /// lines.
    pub fn declaration_pending(&self) -> bool {
        self.scope(self.current)
            .declaration
            .as_ref()
            .is_some_and(FunctionDeclaration::is_open)
    }

    pub(crate) fn take_declaration(&mut self) -> Option<FunctionDeclaration> {
        self.scope_mut(self.current).declaration.take()
    }

    pub(crate) fn set_declaration(&mut self, declaration: FunctionDeclaration) {
        self.scope_mut(self.current).declaration = Some(declaration);
    }

    /// Abandons an unfinished declaration, returning its function name.
    pub fn cancel_declaration(&mut self) -> Option<String> {
        self.take_declaration().map(|d| d.name().to_string())
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    fn classify(scope: ScopeId, item: &NamedItem) -> Resolved {
        let context = match item {
            NamedItem::UnitSystem(system) => Context::System(*system),
            NamedItem::Namespace(inner) => Context::Scope(*inner),
            _ => Context::Scope(scope),
        };
        Resolved::new(item.kind(), context)
    }

    /// Nearest scope, walking outwards from the current one, that binds
    /// `name`.
    fn find(&self, name: &str) -> Option<(ScopeId, &NamedItem)> {
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            let s = self.scope(id);
            if let Some(item) = s.items.get(name) {
                return Some((id, item));
            }
            scope = s.parent;
        }
        None
    }

    fn scope_of(&self, context: Context) -> Option<&Scope> {
        match context {
            Context::Scope(id) => self.scopes.get(id.0),
            _ => None,
        }
    }

    /// Resolves `a.b.c` to the namespace scope `a.b`; a single segment
    /// names the current scope.
    fn target_scope<'n>(&self, path: &'n str) -> Result<(ScopeId, &'n str)> {
        let Some((prefix, name)) = path.rsplit_once('.') else {
            return Ok((self.current, path));
        };
        let mut segments = prefix.split('.');
        let first = segments.next().unwrap_or_default();
        let mut scope = match self.find(first) {
            Some((_, NamedItem::Namespace(id))) => *id,
            _ => return Err(Error::UnknownIdentifier(first.to_string())),
        };
        for segment in segments {
            scope = match self.scope(scope).items.get(segment) {
                Some(NamedItem::Namespace(id)) => *id,
                _ => return Err(Error::UnknownIdentifier(segment.to_string())),
            };
        }
        Ok((scope, name))
    }

    /// Declares a variable in the current scope (or the named namespace),
    /// shadowing outer bindings.
    pub fn define_variable(&mut self, path: &str, value: Quantity) -> Result<()> {
        let (scope, name) = self.target_scope(path)?;
        self.bind(scope, name, NamedItem::Variable(value))
    }

    /// Assigns to the nearest existing variable, or declares one in the
    /// current scope.
    pub fn assign(&mut self, path: &str, value: Quantity) -> Result<()> {
        if path.contains('.') {
            return self.define_variable(path, value);
        }
        let scope = match self.find(path) {
            Some((id, NamedItem::Variable(_))) => id,
            Some((_, item)) => {
                return Err(Error::Evaluation(format!(
                    "cannot assign to {:?} '{path}'",
                    item.kind()
                )))
            }
            None => self.current,
        };
        self.scope_mut(scope)
            .items
            .insert(path.to_string(), NamedItem::Variable(value));
        Ok(())
    }

    fn bind(&mut self, scope: ScopeId, name: &str, item: NamedItem) -> Result<()> {
        let items = &mut self.scope_mut(scope).items;
        if let Some(existing) = items.get(name) {
            if !matches!(existing, NamedItem::Variable(_)) || !matches!(item, NamedItem::Variable(_)) {
                return Err(Error::Declaration(format!("'{name}' is already declared")));
            }
        }
        items.insert(name.to_string(), item);
        Ok(())
    }

    /// Adds a unit to the active system and binds its symbol in the current
    /// scope.
    pub fn declare_unit(&mut self, symbol: &str, definition: &Quantity) -> Result<()> {
        let system = self.active;
        let id = self.systems[system.0].declare(symbol, definition)?;
        debug!(unit = symbol, definition = %definition, "unit declared");
        let scope = self.current;
        self.bind(scope, symbol, NamedItem::Unit { system, id })
    }

    /// Declares a namespace. Inside a function the namespace must live in
    /// the call's own scopes, since those are released on return.
    pub fn declare_namespace(&mut self, path: &str) -> Result<ScopeId> {
        let (parent, name) = self.target_scope(path)?;
        if parent.0 < self.floor {
            return Err(Error::Declaration(format!(
                "namespace '{path}' would outlive the function declaring it"
            )));
        }
        let id = ScopeId(self.scopes.len());
        self.bind(parent, name, NamedItem::Namespace(id))?;
        self.scopes.push(Scope::new(name, Some(parent)));
        Ok(id)
    }

    /// Binds a finished declaration in the current scope. Redeclaring a
    /// function replaces it.
    pub fn register_function(&mut self, function: Function) -> Result<()> {
        let scope = self.current;
        let items = &mut self.scope_mut(scope).items;
        if let Some(existing) = items.get(&function.name) {
            if !matches!(existing, NamedItem::Function { .. }) {
                return Err(Error::Declaration(format!(
                    "'{}' is already declared",
                    function.name
                )));
            }
        }
        items.insert(
            function.name.clone(),
            NamedItem::Function {
                function: Rc::new(function),
                scope,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Result<NamedItem> {
        let scope = if path.contains('.') {
            self.target_scope(path)?.0
        } else {
            self.find(path)
                .map(|(id, _)| id)
                .ok_or_else(|| Error::UnknownIdentifier(path.to_string()))?
        };
        let name = path.rsplit('.').next().unwrap_or(path);
        if let Some(NamedItem::UnitSystem(id)) = self.scope(scope).items.get(name) {
            if *id == self.active {
                return Err(Error::Evaluation(format!(
                    "cannot remove the active unit system '{name}'"
                )));
            }
        }
        self.scope_mut(scope)
            .items
            .remove(name)
            .ok_or_else(|| Error::UnknownIdentifier(path.to_string()))
    }

    /// Bindings visible from the current scope, innermost first. Shadowed
    /// names are listed once.
    pub fn visible_items(&self) -> Vec<(String, NamedItem)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            let s = self.scope(id);
            for (name, item) in &s.items {
                if seen.insert(name.clone()) {
                    out.push((name.clone(), item.clone()));
                }
            }
            scope = s.parent;
        }
        out
    }

    pub fn scope_name(&self, id: ScopeId) -> &str {
        &self.scope(id).name
    }

    pub fn active_system(&self) -> SystemId {
        self.active
    }

    /// Renders a quantity with the configured precision.
    pub fn format(&self, quantity: &Quantity) -> String {
        quantity.format_with(self.options.precision)
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}").map_err(|e| Error::Io {
            path: "<output>".into(),
            message: e.to_string(),
        })
    }

    /// Locates a script: `name` as given, then `name.cal`, first relative
    /// to the working directory and then in each configured script
    /// directory.
    pub fn find_script(&self, name: &str) -> Option<PathBuf> {
        let given = Path::new(name);
        let with_extension = given.with_extension(SCRIPT_EXTENSION);
        let candidates = [given.to_path_buf(), with_extension];

        let roots = std::iter::once(PathBuf::new()).chain(self.options.script_dirs.iter().cloned());
        for root in roots {
            for candidate in &candidates {
                let path = root.join(candidate);
                if path.is_file() {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Runs a script file in the current scope. Returns the value of a
    /// `Return` executed by the script, if any.
    pub fn run_script(&mut self, path: &Path) -> Result<Option<Quantity>> {
        let lines = read_lines(path)?;
        debug!(path = %path.display(), lines = lines.len(), "reading script");
        commands::execute_lines(self, &lines)
    }

    fn enter(&mut self, name: &str, parent: ScopeId) -> Result<Frame> {
        if self.depth >= self.options.max_call_depth {
            return Err(Error::RecursionLimit(self.options.max_call_depth));
        }
        self.depth += 1;
        let scope = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(name, Some(parent)));
        let frame = Frame {
            scope,
            caller: self.current,
            floor: self.floor,
        };
        self.current = scope;
        self.floor = scope.0;
        Ok(frame)
    }

    fn leave(&mut self, frame: Frame) {
        self.scopes.truncate(frame.scope.0);
        self.current = frame.caller;
        self.floor = frame.floor;
        self.depth -= 1;
    }

    fn call_user(&mut self, function: &Function, scope: ScopeId, args: &[Quantity]) -> Result<Quantity> {
        if args.len() != function.parameters.len() {
            return Err(Error::Arity {
                name: function.name.clone(),
                expected: function.parameters.len().to_string(),
                got: args.len(),
            });
        }

        let mut bound = Vec::with_capacity(args.len());
        for (parameter, arg) in function.parameters.iter().zip(args) {
            let value = match &parameter.unit {
                Some(unit) => {
                    let target = self.unit_system().parse_unit(unit)?;
                    arg.convert_to(&target).map_err(|_| Error::ParameterUnit {
                        function: function.name.clone(),
                        param: parameter.name.clone(),
                        unit: unit.clone(),
                    })?
                }
                None => arg.clone(),
            };
            bound.push((parameter.name.clone(), value));
        }

        let frame = self.enter(&function.name, scope)?;
        debug!(function = %function.name, depth = self.depth, "calling function");
        let items = &mut self.scope_mut(frame.scope).items;
        for (name, value) in bound {
            items.insert(name, NamedItem::Variable(value));
        }
        let result = commands::execute_lines(self, &function.body);
        self.leave(frame);
        Ok(result?.unwrap_or_else(false_quantity))
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(text.lines().map(str::to_string).collect())
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EvalOptions::default())
    }
}

impl Resolver for Environment {
    fn lookup(&self, name: &str) -> Option<Resolved> {
        if let Some((scope, item)) = self.find(name) {
            return Some(Self::classify(scope, item));
        }
        if functions::builtin(name).is_some() {
            return Some(Resolved::new(ItemKind::Function, Context::Builtins));
        }
        self.unit_system()
            .contains(name)
            .then(|| Resolved::new(ItemKind::Unit, Context::System(self.active)))
    }

    fn lookup_qualified(&self, context: Context, name: &str) -> Option<Resolved> {
        match context {
            Context::Scope(id) => {
                let item = self.scopes.get(id.0)?.items.get(name)?;
                Some(Self::classify(id, item))
            }
            Context::System(id) => self
                .systems
                .get(id.0)?
                .contains(name)
                .then(|| Resolved::new(ItemKind::Unit, context)),
            Context::Builtins => functions::builtin(name)
                .map(|_| Resolved::new(ItemKind::Function, Context::Builtins)),
        }
    }

    fn variable(&self, context: Context, name: &str) -> Option<Quantity> {
        match self.scope_of(context)?.items.get(name)? {
            NamedItem::Variable(q) => Some(q.clone()),
            _ => None,
        }
    }

    fn unit(&self, context: Context, name: &str) -> Option<Unit> {
        match context {
            Context::System(id) => self.systems.get(id.0)?.lookup(name),
            _ => match self.scope_of(context)?.items.get(name)? {
                NamedItem::Unit { system, id } => Some(self.systems.get(system.0)?.unit(*id)),
                _ => None,
            },
        }
    }

    fn evaluate_function(&mut self, context: Context, name: &str, args: &[Quantity]) -> Result<Quantity> {
        if context == Context::Builtins {
            let builtin = functions::builtin(name)
                .ok_or_else(|| Error::UnknownIdentifier(name.to_string()))?;
            return builtin.call(args);
        }
        let (function, scope) = match self.scope_of(context).and_then(|s| s.items.get(name)) {
            Some(NamedItem::Function { function, scope }) => (Rc::clone(function), *scope),
            _ => return Err(Error::UnknownIdentifier(name.to_string())),
        };
        self.call_user(&function, scope, args)
    }

    fn evaluate_file_function(&mut self, name: &str) -> Result<Option<Quantity>> {
        let Some(path) = self.find_script(&format!("{name}.{SCRIPT_EXTENSION}")) else {
            return Ok(None);
        };
        let lines = read_lines(&path)?;
        let frame = self.enter(name, GLOBAL)?;
        debug!(path = %path.display(), depth = self.depth, "calling file function");
        let result = commands::execute_lines(self, &lines);
        self.leave(frame);
        Ok(Some(result?.unwrap_or_else(false_quantity)))
    }

    fn unit_system(&self) -> &UnitSystem {
        &self.systems[self.active.0]
    }

    fn options(&self) -> &EvalOptions {
        &self.options
    }
}
