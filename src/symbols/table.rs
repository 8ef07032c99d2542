//! Lexically nested symbol tables.
//!
//! [`SymbolTable`] is an arena of scopes addressed by [`ScopeId`]. Each scope keeps
//! one list per symbol kind plus its parent and children, so lookups walk outward
//! through the parent chain and whole-program walks traverse the children.
//!
//! # Literal Interning
//!
//! [`SymbolTable::intern`] returns the existing literal symbol when an equal
//! `(value, type)` pair is visible from the scope, and only allocates otherwise.
//! Passes rely on this: the canonical `true`/`false` literals of the global scope are
//! shared by every function.

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter};

use crate::{
    symbols::{
        data::{DataSymbol, TempSymbol},
        function::FunctionSymbol,
        literal::{LiteralSymbol, LiteralValue},
        types::TypeSymbol,
        LabelSymbol,
    },
    Error, Result,
};

/// Handle to one scope of a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope{}", self.0)
    }
}

/// Discriminates the symbol kinds a scope stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SymbolKind {
    /// [`Symbol::Function`]
    Function,
    /// [`Symbol::Type`]
    Type,
    /// [`Symbol::Literal`]
    Literal,
    /// [`Symbol::Data`]
    Data,
    /// [`Symbol::Label`]
    Label,
}

/// Any symbol a scope can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A function
    Function(Arc<FunctionSymbol>),
    /// A type
    Type(TypeSymbol),
    /// An interned literal
    Literal(Arc<LiteralSymbol>),
    /// A temporary, local or parameter
    Data(DataSymbol),
    /// A jump target
    Label(LabelSymbol),
}

impl Symbol {
    /// Returns the symbol's name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Symbol::Function(f) => f.name.clone(),
            Symbol::Type(t) => t.name(),
            Symbol::Literal(l) => l.to_string(),
            Symbol::Data(d) => d.name(),
            Symbol::Label(l) => l.name.clone(),
        }
    }

    /// Returns the symbol's kind.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Function(_) => SymbolKind::Function,
            Symbol::Type(_) => SymbolKind::Type,
            Symbol::Literal(_) => SymbolKind::Literal,
            Symbol::Data(_) => SymbolKind::Data,
            Symbol::Label(_) => SymbolKind::Label,
        }
    }

    fn same_key(&self, other: &Symbol) -> bool {
        match (self, other) {
            (Symbol::Literal(a), Symbol::Literal(b)) => a.value == b.value && a.ty == b.ty,
            _ => self.kind() == other.kind() && self.name() == other.name(),
        }
    }
}

impl From<Arc<FunctionSymbol>> for Symbol {
    fn from(f: Arc<FunctionSymbol>) -> Self {
        Symbol::Function(f)
    }
}

impl From<TypeSymbol> for Symbol {
    fn from(t: TypeSymbol) -> Self {
        Symbol::Type(t)
    }
}

impl From<Arc<LiteralSymbol>> for Symbol {
    fn from(l: Arc<LiteralSymbol>) -> Self {
        Symbol::Literal(l)
    }
}

impl From<DataSymbol> for Symbol {
    fn from(d: DataSymbol) -> Self {
        match d {
            DataSymbol::Literal(l) => Symbol::Literal(l),
            other => Symbol::Data(other),
        }
    }
}

impl From<LabelSymbol> for Symbol {
    fn from(l: LabelSymbol) -> Self {
        Symbol::Label(l)
    }
}

#[derive(Debug, Default)]
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    functions: Vec<Arc<FunctionSymbol>>,
    types: Vec<TypeSymbol>,
    literals: Vec<Arc<LiteralSymbol>>,
    data: Vec<DataSymbol>,
    labels: Vec<LabelSymbol>,
}

impl Scope {
    fn contains(&self, symbol: &Symbol) -> bool {
        self.all().iter().any(|s| s.same_key(symbol))
    }

    fn all(&self) -> Vec<Symbol> {
        let mut out = Vec::with_capacity(
            self.functions.len()
                + self.types.len()
                + self.literals.len()
                + self.data.len()
                + self.labels.len(),
        );
        out.extend(self.functions.iter().cloned().map(Symbol::Function));
        out.extend(self.types.iter().cloned().map(Symbol::Type));
        out.extend(self.literals.iter().cloned().map(Symbol::Literal));
        out.extend(self.data.iter().cloned().map(Symbol::Data));
        out.extend(self.labels.iter().cloned().map(Symbol::Label));
        out
    }
}

/// Arena of nested scopes.
///
/// Scope 0 is the global scope and always exists. Counters for generated temporary
/// and label names are table-wide, so generated names are unique across functions.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    next_temp: usize,
    next_label: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table holding only an empty global scope.
    #[must_use]
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope {
                name: "global".to_string(),
                ..Scope::default()
            }],
            next_temp: 0,
            next_label: 0,
        }
    }

    /// Returns the global scope.
    #[must_use]
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Opens a new scope nested in `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if `parent` does not exist.
    pub fn create_scope(&mut self, parent: ScopeId, name: impl Into<String>) -> Result<ScopeId> {
        let id = ScopeId(self.scopes.len());
        self.scope_mut(parent)?.children.push(id);
        self.scopes.push(Scope {
            name: name.into(),
            parent: Some(parent),
            ..Scope::default()
        });
        Ok(id)
    }

    /// Returns the number of scopes in the arena.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Returns the name given to `scope` when it was opened.
    #[must_use]
    pub fn scope_name(&self, scope: ScopeId) -> Option<&str> {
        self.scopes.get(scope.0).map(|s| s.name.as_str())
    }

    /// Returns the enclosing scope.
    #[must_use]
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes.get(scope.0).and_then(|s| s.parent)
    }

    /// Returns the directly nested scopes.
    #[must_use]
    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        self.scopes
            .get(scope.0)
            .map_or(&[][..], |s| s.children.as_slice())
    }

    /// Returns `scope` followed by every enclosing scope up to the global scope.
    #[must_use]
    pub fn ancestors(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.scopes.get(scope.0).map(|_| scope);
        while let Some(id) = current {
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }

    /// Returns `scope` and all scopes nested in it, in pre-order.
    #[must_use]
    pub fn traverse(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        if scope.0 >= self.scopes.len() {
            return out;
        }
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Adds `symbol` to `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if the scope does not exist or already holds a
    /// symbol of the same kind and name (for literals: the same value and type).
    pub fn add(&mut self, scope: ScopeId, symbol: impl Into<Symbol>) -> Result<()> {
        let symbol = symbol.into();
        let target = self.scope_mut(scope)?;
        if target.contains(&symbol) {
            return Err(Error::SymbolError(format!(
                "{} {} is already defined in {}",
                symbol.kind(),
                symbol.name(),
                target.name
            )));
        }
        match symbol {
            Symbol::Function(f) => target.functions.push(f),
            Symbol::Type(t) => target.types.push(t),
            Symbol::Literal(l) => target.literals.push(l),
            Symbol::Data(d) => target.data.push(d),
            Symbol::Label(l) => target.labels.push(l),
        }
        Ok(())
    }

    /// Removes `symbol` from `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if the symbol is not defined in that scope.
    pub fn remove(&mut self, scope: ScopeId, symbol: &Symbol) -> Result<()> {
        let target = self.scope_mut(scope)?;
        let removed = match symbol {
            Symbol::Function(f) => remove_first(&mut target.functions, |x| x.name == f.name),
            Symbol::Type(t) => remove_first(&mut target.types, |x| x == t),
            Symbol::Literal(l) => {
                remove_first(&mut target.literals, |x| x.value == l.value && x.ty == l.ty)
            }
            Symbol::Data(d) => remove_first(&mut target.data, |x| x == d),
            Symbol::Label(l) => remove_first(&mut target.labels, |x| x == l),
        };
        if removed {
            Ok(())
        } else {
            Err(Error::SymbolError(format!(
                "{} {} is not defined in {}",
                symbol.kind(),
                symbol.name(),
                target.name
            )))
        }
    }

    /// Removes every symbol of `scope` for which `keep` returns `false`.
    ///
    /// Returns the removed symbols.
    pub fn retain<F>(&mut self, scope: ScopeId, mut keep: F) -> Vec<Symbol>
    where
        F: FnMut(&Symbol) -> bool,
    {
        let Some(target) = self.scopes.get_mut(scope.0) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        let mut check = |symbol: Symbol| {
            if keep(&symbol) {
                true
            } else {
                removed.push(symbol);
                false
            }
        };
        target
            .functions
            .retain(|f| check(Symbol::Function(f.clone())));
        target.types.retain(|t| check(Symbol::Type(t.clone())));
        target
            .literals
            .retain(|l| check(Symbol::Literal(l.clone())));
        target.data.retain(|d| check(Symbol::Data(d.clone())));
        target.labels.retain(|l| check(Symbol::Label(l.clone())));
        removed
    }

    /// Looks `name` up in `scope` and its ancestors.
    ///
    /// Within one scope data symbols shadow labels, which shadow functions, then types,
    /// then literals.
    #[must_use]
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Symbol> {
        self.ancestors(scope).into_iter().find_map(|id| {
            let s = &self.scopes[id.0];
            s.data
                .iter()
                .find(|d| d.name() == name)
                .cloned()
                .map(Symbol::Data)
                .or_else(|| {
                    s.labels
                        .iter()
                        .find(|l| l.name == name)
                        .cloned()
                        .map(Symbol::Label)
                })
                .or_else(|| {
                    s.functions
                        .iter()
                        .find(|f| f.name == name)
                        .cloned()
                        .map(Symbol::Function)
                })
                .or_else(|| {
                    s.types
                        .iter()
                        .find(|t| t.name() == name)
                        .cloned()
                        .map(Symbol::Type)
                })
                .or_else(|| {
                    s.literals
                        .iter()
                        .find(|l| l.to_string() == name)
                        .cloned()
                        .map(Symbol::Literal)
                })
        })
    }

    /// Like [`SymbolTable::lookup`], but a missing name is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if `name` is not visible from `scope`.
    pub fn get(&self, scope: ScopeId, name: &str) -> Result<Symbol> {
        self.lookup(scope, name)
            .ok_or_else(|| Error::SymbolError(format!("Symbol {name} not found")))
    }

    /// Finds a function visible from `scope`.
    #[must_use]
    pub fn find_function(&self, scope: ScopeId, name: &str) -> Option<Arc<FunctionSymbol>> {
        self.ancestors(scope).into_iter().find_map(|id| {
            self.scopes[id.0]
                .functions
                .iter()
                .find(|f| f.name == name)
                .cloned()
        })
    }

    /// Finds a type visible from `scope`.
    #[must_use]
    pub fn find_type(&self, scope: ScopeId, name: &str) -> Option<TypeSymbol> {
        self.ancestors(scope).into_iter().find_map(|id| {
            self.scopes[id.0]
                .types
                .iter()
                .find(|t| t.name() == name)
                .cloned()
        })
    }

    /// Finds a temporary, local or parameter visible from `scope`.
    #[must_use]
    pub fn find_data(&self, scope: ScopeId, name: &str) -> Option<DataSymbol> {
        self.ancestors(scope).into_iter().find_map(|id| {
            self.scopes[id.0]
                .data
                .iter()
                .find(|d| d.name() == name)
                .cloned()
        })
    }

    /// Finds a label visible from `scope`.
    #[must_use]
    pub fn find_label(&self, scope: ScopeId, name: &str) -> Option<LabelSymbol> {
        self.ancestors(scope).into_iter().find_map(|id| {
            self.scopes[id.0]
                .labels
                .iter()
                .find(|l| l.name == name)
                .cloned()
        })
    }

    /// Finds an interned literal with `value`, of any type, visible from `scope`.
    #[must_use]
    pub fn find_literal(&self, scope: ScopeId, value: &LiteralValue) -> Option<Arc<LiteralSymbol>> {
        self.ancestors(scope).into_iter().find_map(|id| {
            self.scopes[id.0]
                .literals
                .iter()
                .find(|l| &l.value == value)
                .cloned()
        })
    }

    /// Returns the literal symbol for `(value, ty)`, creating it in `scope` if no
    /// equal literal is visible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if `scope` does not exist.
    pub fn intern(
        &mut self,
        scope: ScopeId,
        value: LiteralValue,
        ty: TypeSymbol,
    ) -> Result<Arc<LiteralSymbol>> {
        let existing = self.ancestors(scope).into_iter().find_map(|id| {
            self.scopes[id.0]
                .literals
                .iter()
                .find(|l| l.value == value && l.ty == ty)
                .cloned()
        });
        if let Some(literal) = existing {
            return Ok(literal);
        }

        let literal = Arc::new(LiteralSymbol::new(value, ty));
        self.scope_mut(scope)?.literals.push(literal.clone());
        Ok(literal)
    }

    /// Creates a fresh temporary of type `ty` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if `scope` does not exist.
    pub fn new_temp(&mut self, scope: ScopeId, ty: TypeSymbol) -> Result<DataSymbol> {
        let name = format!("_temp_T{}", self.next_temp);
        let temp = DataSymbol::Temp(Arc::new(TempSymbol { name, ty }));
        self.add(scope, temp.clone())?;
        self.next_temp += 1;
        Ok(temp)
    }

    /// Creates a fresh label in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if `scope` does not exist.
    pub fn new_label(&mut self, scope: ScopeId, is_build: bool) -> Result<LabelSymbol> {
        let label = LabelSymbol {
            name: format!("$L{}", self.next_label),
            is_build,
        };
        self.add(scope, label.clone())?;
        self.next_label += 1;
        Ok(label)
    }

    /// Returns every symbol defined directly in `scope`.
    #[must_use]
    pub fn get_all(&self, scope: ScopeId) -> Vec<Symbol> {
        self.scopes.get(scope.0).map(Scope::all).unwrap_or_default()
    }

    /// Returns the functions defined directly in `scope`.
    #[must_use]
    pub fn functions(&self, scope: ScopeId) -> &[Arc<FunctionSymbol>] {
        self.scopes
            .get(scope.0)
            .map_or(&[][..], |s| s.functions.as_slice())
    }

    /// Returns the types defined directly in `scope`.
    #[must_use]
    pub fn types(&self, scope: ScopeId) -> &[TypeSymbol] {
        self.scopes
            .get(scope.0)
            .map_or(&[][..], |s| s.types.as_slice())
    }

    /// Returns the literals interned directly in `scope`.
    #[must_use]
    pub fn literals(&self, scope: ScopeId) -> &[Arc<LiteralSymbol>] {
        self.scopes
            .get(scope.0)
            .map_or(&[][..], |s| s.literals.as_slice())
    }

    /// Returns the data symbols defined directly in `scope`.
    #[must_use]
    pub fn data(&self, scope: ScopeId) -> &[DataSymbol] {
        self.scopes
            .get(scope.0)
            .map_or(&[][..], |s| s.data.as_slice())
    }

    /// Returns the labels defined directly in `scope`.
    #[must_use]
    pub fn labels(&self, scope: ScopeId) -> &[LabelSymbol] {
        self.scopes
            .get(scope.0)
            .map_or(&[][..], |s| s.labels.as_slice())
    }

    /// Finds the scope that directly defines the data symbol `symbol`, searching
    /// from `scope` outward.
    #[must_use]
    pub fn defining_scope(&self, scope: ScopeId, symbol: &DataSymbol) -> Option<ScopeId> {
        self.ancestors(scope)
            .into_iter()
            .find(|id| self.scopes[id.0].data.contains(symbol))
    }

    fn scope_mut(&mut self, scope: ScopeId) -> Result<&mut Scope> {
        self.scopes
            .get_mut(scope.0)
            .ok_or_else(|| Error::SymbolError(format!("Unknown {scope}")))
    }
}

fn remove_first<T, F: FnMut(&T) -> bool>(items: &mut Vec<T>, predicate: F) -> bool {
    match items.iter().position(predicate) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_lookup_remove() {
        let mut table = SymbolTable::new();
        let root = table.root();

        let temp = table.new_temp(root, TypeSymbol::I32).unwrap();
        let named = DataSymbol::local("count", TypeSymbol::I32);
        table.add(root, named.clone()).unwrap();
        let literal = table
            .intern(root, LiteralValue::I32(5), TypeSymbol::I32)
            .unwrap();
        let label = table.new_label(root, false).unwrap();

        assert_eq!(table.get_all(root).len(), 4);
        assert_eq!(table.data(root).len(), 2);
        assert_eq!(table.lookup(root, "count"), Some(Symbol::Data(named.clone())));
        assert_eq!(table.lookup(root, &temp.name()), Some(Symbol::Data(temp.clone())));
        assert_eq!(table.find_label(root, "$L0"), Some(label.clone()));
        assert!(table.get(root, "missing").is_err());

        table.remove(root, &Symbol::Data(named)).unwrap();
        table.remove(root, &Symbol::Data(temp)).unwrap();
        table.remove(root, &Symbol::Label(label)).unwrap();
        assert_eq!(table.get_all(root), vec![Symbol::Literal(literal)]);
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.add(root, DataSymbol::local("x", TypeSymbol::I32)).unwrap();
        assert!(table
            .add(root, DataSymbol::local("x", TypeSymbol::STR))
            .is_err());
        assert!(table
            .remove(root, &Symbol::Data(DataSymbol::local("y", TypeSymbol::I32)))
            .is_err());
    }

    #[test]
    fn test_intern_returns_same_instance() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let inner = table.create_scope(root, "main").unwrap();

        let outer = table
            .intern(root, LiteralValue::Bool(true), TypeSymbol::BOOL)
            .unwrap();
        let again = table
            .intern(inner, LiteralValue::Bool(true), TypeSymbol::BOOL)
            .unwrap();
        assert!(Arc::ptr_eq(&outer, &again));
        assert!(table.literals(inner).is_empty());

        let five = table
            .intern(inner, LiteralValue::I32(5), TypeSymbol::I32)
            .unwrap();
        let five_again = table
            .intern(inner, LiteralValue::I32(5), TypeSymbol::I32)
            .unwrap();
        assert!(Arc::ptr_eq(&five, &five_again));
        assert_eq!(table.literals(inner).len(), 1);
        assert!(Arc::ptr_eq(
            &table.find_literal(inner, &LiteralValue::I32(5)).unwrap(),
            &five
        ));
    }

    #[test]
    fn test_scopes_shadow_and_traverse() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let f = table.create_scope(root, "f").unwrap();
        let block = table.create_scope(f, "f.block").unwrap();
        let g = table.create_scope(root, "g").unwrap();

        table.add(root, DataSymbol::local("x", TypeSymbol::I32)).unwrap();
        table.add(block, DataSymbol::local("x", TypeSymbol::STR)).unwrap();

        assert_eq!(table.find_data(block, "x").unwrap().ty(), &TypeSymbol::STR);
        assert_eq!(table.find_data(g, "x").unwrap().ty(), &TypeSymbol::I32);
        assert_eq!(table.ancestors(block), vec![block, f, root]);
        assert_eq!(table.traverse(root), vec![root, f, block, g]);
        assert_eq!(
            table.defining_scope(block, &DataSymbol::local("x", TypeSymbol::I32)),
            Some(root)
        );
    }

    #[test]
    fn test_retain() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.new_label(root, true).unwrap();
        table.new_label(root, false).unwrap();

        let removed = table.retain(root, |s| !matches!(s, Symbol::Label(l) if l.is_build));
        assert_eq!(removed.len(), 1);
        assert_eq!(table.labels(root).len(), 1);
    }
}
