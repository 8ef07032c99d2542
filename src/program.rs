//! Whole programs.
//!
//! A [`Program`] owns the global [`SymbolTable`] and the instruction streams of all
//! source functions. Function bodies sit in their own vector, next to the table
//! rather than inside it, so a pass can hold a function mutably while it interns
//! literals into the table ([`Program::split_mut`]).
//!
//! [`Program::new`] seeds the global scope with everything the language provides:
//! primitive types and their array types, the host handle types, the canonical
//! `true`/`false` literals and the native intrinsics.

use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::{
    ir::TacList,
    staging::Intrinsic,
    symbols::{
        DataSymbol, FunctionSymbol, HandleType, LiteralSymbol, LiteralValue, ScopeId, Symbol,
        SymbolTable, TypeCode, TypeSymbol,
    },
    Error, Result,
};

/// Name of the program entry function.
pub const ENTRY_FUNCTION: &str = "main";

/// A function with a three-address body.
#[derive(Debug, Clone)]
pub struct SourceFunction {
    /// Signature
    pub symbol: Arc<FunctionSymbol>,
    /// Scope holding the parameters and top-level locals
    pub scope: ScopeId,
    /// Body
    pub tacs: TacList,
}

impl SourceFunction {
    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    /// Returns `true` for build-only functions.
    #[must_use]
    pub fn is_build(&self) -> bool {
        self.symbol.is_build
    }
}

/// A program: global symbols plus source function bodies.
#[derive(Debug)]
pub struct Program {
    /// All scopes of the program
    pub symbols: SymbolTable,
    functions: Vec<SourceFunction>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// Creates a program whose global scope holds the built-in types, literals and
    /// intrinsics.
    #[must_use]
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        seed_global_scope(&mut symbols);
        Program {
            symbols,
            functions: Vec::new(),
        }
    }

    /// Declares a source function with an empty body.
    ///
    /// The signature goes into the global scope; a new scope nested in it receives
    /// the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if a function with that name already exists.
    pub fn declare_function(&mut self, symbol: FunctionSymbol) -> Result<(Arc<FunctionSymbol>, ScopeId)> {
        let root = self.symbols.root();
        let symbol = Arc::new(symbol);
        self.symbols.add(root, symbol.clone())?;

        let scope = self.symbols.create_scope(root, symbol.name.clone())?;
        for param in symbol.parameter_symbols() {
            self.symbols.add(scope, param)?;
        }

        self.functions.push(SourceFunction {
            symbol: symbol.clone(),
            scope,
            tacs: TacList::new(),
        });
        Ok((symbol, scope))
    }

    /// Declares a source function whose body resolves names in an existing scope.
    ///
    /// Used for functions lifted out of another function's body, which keep seeing
    /// the enclosing function's locals. The signature goes into the global scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if a function with that name already exists.
    pub fn declare_function_in(
        &mut self,
        symbol: FunctionSymbol,
        scope: ScopeId,
        tacs: TacList,
    ) -> Result<Arc<FunctionSymbol>> {
        let root = self.symbols.root();
        let symbol = Arc::new(symbol);
        self.symbols.add(root, symbol.clone())?;
        self.functions.push(SourceFunction {
            symbol: symbol.clone(),
            scope,
            tacs,
        });
        Ok(symbol)
    }

    /// Returns the source function called `name`.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&SourceFunction> {
        self.functions.iter().find(|f| f.symbol.name == name)
    }

    /// Returns the source function called `name` for editing.
    pub fn function_mut(&mut self, name: &str) -> Option<&mut SourceFunction> {
        self.functions.iter_mut().find(|f| f.symbol.name == name)
    }

    /// Borrows one function body and the symbol table at the same time.
    pub fn split_mut(&mut self, name: &str) -> Option<(&mut SourceFunction, &mut SymbolTable)> {
        let function = self.functions.iter_mut().find(|f| f.symbol.name == name)?;
        Some((function, &mut self.symbols))
    }

    /// Iterates all source functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &SourceFunction> + '_ {
        self.functions.iter()
    }

    /// Returns the names of all source functions in declaration order.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        self.functions.iter().map(|f| f.symbol.name.clone()).collect()
    }

    /// Removes a source function and its signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if no such function exists.
    pub fn remove_function(&mut self, name: &str) -> Result<SourceFunction> {
        let index = self
            .functions
            .iter()
            .position(|f| f.symbol.name == name)
            .ok_or_else(|| Error::SymbolError(format!("Function {name} not found")))?;
        let function = self.functions.remove(index);
        let root = self.symbols.root();
        // Signatures of nested declarations live elsewhere; a miss here is fine.
        let _ = self
            .symbols
            .remove(root, &Symbol::Function(function.symbol.clone()));
        Ok(function)
    }

    /// Resolves a function signature, source or builtin, from the global scope.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<Arc<FunctionSymbol>> {
        self.symbols.find_function(self.symbols.root(), name)
    }

    /// Interns `value` in `scope`, inferring its type from the value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the type cannot be inferred (struct values,
    /// empty arrays); use [`SymbolTable::intern`] with an explicit type instead.
    pub fn literal(&mut self, scope: ScopeId, value: LiteralValue) -> Result<DataSymbol> {
        let ty = value.infer_type().ok_or_else(|| Error::TypeMismatch {
            expected: "a literal of inferable type".to_string(),
            found: value.to_string(),
        })?;
        Ok(DataSymbol::Literal(self.symbols.intern(scope, value, ty)?))
    }

    /// Defines a local variable in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolError`] if the name is taken in that scope.
    pub fn local(&mut self, scope: ScopeId, name: &str, ty: TypeSymbol) -> Result<DataSymbol> {
        let local = DataSymbol::local(name, ty);
        self.symbols.add(scope, local.clone())?;
        Ok(local)
    }

    /// Returns the canonical literal for `value` from the global scope.
    #[must_use]
    pub fn canonical_bool(&self, value: bool) -> Option<Arc<LiteralSymbol>> {
        self.symbols
            .find_literal(self.symbols.root(), &LiteralValue::Bool(value))
    }
}

fn seed_global_scope(symbols: &mut SymbolTable) {
    let root = symbols.root();
    let mut seeded: Vec<Symbol> = Vec::new();

    for code in TypeCode::iter() {
        seeded.push(Symbol::Type(TypeSymbol::Primitive(code)));
        if code != TypeCode::Void {
            seeded.push(Symbol::Type(TypeSymbol::array_of(TypeSymbol::Primitive(code))));
        }
    }
    for handle in HandleType::iter() {
        seeded.push(Symbol::Type(TypeSymbol::Handle(handle)));
    }
    for value in [true, false] {
        seeded.push(Symbol::Literal(Arc::new(LiteralSymbol::new(
            LiteralValue::Bool(value),
            TypeSymbol::BOOL,
        ))));
    }
    for intrinsic in Intrinsic::iter() {
        seeded.push(Symbol::Function(Arc::new(intrinsic.symbol())));
    }

    for symbol in seeded {
        // Every seeded name is distinct; a fresh table cannot reject them.
        let _ = symbols.add(root, symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{MarkOp, Tac},
        symbols::FunctionKind,
    };

    #[test]
    fn test_global_scope_seeded() {
        let program = Program::new();
        let root = program.symbols.root();

        assert!(program.symbols.find_type(root, "i32").is_some());
        assert!(program.symbols.find_type(root, "u8[]").is_some());
        assert!(program.symbols.find_type(root, "Func").is_some());
        assert!(program.canonical_bool(true).is_some());
        assert!(program.canonical_bool(false).is_some());

        let write_line = program.find_function("WriteLine").unwrap();
        assert_eq!(write_line.kind, FunctionKind::Builtin);
        assert!(program.find_function("Build_AddBody").unwrap().is_build);
    }

    #[test]
    fn test_declare_and_remove_function() {
        let mut program = Program::new();
        let (symbol, scope) = program
            .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
            .unwrap();
        program
            .function_mut("main")
            .unwrap()
            .tacs
            .push_back(Tac::FunctionMark(MarkOp::Start));

        assert_eq!(program.function("main").unwrap().tacs.len(), 1);
        assert_eq!(program.function("main").unwrap().scope, scope);
        assert!(Arc::ptr_eq(&program.find_function("main").unwrap(), &symbol));
        assert!(program
            .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
            .is_err());

        program.remove_function("main").unwrap();
        assert!(program.function("main").is_none());
        assert!(program.find_function("main").is_none());
        assert!(program.remove_function("main").is_err());
    }

    #[test]
    fn test_literal_interning_shares_canonical_bools() {
        let mut program = Program::new();
        let (_, scope) = program
            .declare_function(FunctionSymbol::new("f", TypeSymbol::VOID, vec![], false))
            .unwrap();

        let t = program.literal(scope, LiteralValue::Bool(true)).unwrap();
        let canonical = program.canonical_bool(true).unwrap();
        assert!(Arc::ptr_eq(t.as_literal().unwrap(), &canonical));
        assert!(program
            .literal(scope, LiteralValue::Struct(vec![]))
            .is_err());
    }
}
