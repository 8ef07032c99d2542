//! Fixture builders shared by the unit tests.

use std::sync::Arc;

use crate::{
    compiler::EventLog,
    ir::{Tac, TacId, TacList},
    program::{Program, SourceFunction},
    symbols::{DataSymbol, FunctionSymbol, LabelSymbol, LiteralValue, ScopeId, TypeSymbol},
};

/// A program with one function under construction.
pub(crate) struct Fixture {
    pub program: Program,
    pub name: String,
    pub scope: ScopeId,
    pub events: EventLog,
}

impl Fixture {
    /// Declares `name` as a void, parameterless runtime function.
    pub fn new(name: &str) -> Self {
        Self::with_signature(FunctionSymbol::new(name, TypeSymbol::VOID, vec![], false))
    }

    pub fn with_signature(symbol: FunctionSymbol) -> Self {
        let mut program = Program::new();
        let name = symbol.name.clone();
        let (_, scope) = program.declare_function(symbol).unwrap();
        Fixture {
            program,
            name,
            scope,
            events: EventLog::new(),
        }
    }

    /// Declares another function in the same program and returns its scope.
    pub fn declare(&mut self, symbol: FunctionSymbol) -> (Arc<FunctionSymbol>, ScopeId) {
        self.program.declare_function(symbol).unwrap()
    }

    pub fn local(&mut self, name: &str, ty: TypeSymbol) -> DataSymbol {
        self.program.local(self.scope, name, ty).unwrap()
    }

    pub fn temp(&mut self, ty: TypeSymbol) -> DataSymbol {
        self.program.symbols.new_temp(self.scope, ty).unwrap()
    }

    pub fn int(&mut self, value: i32) -> DataSymbol {
        self.program
            .literal(self.scope, LiteralValue::I32(value))
            .unwrap()
    }

    pub fn boolean(&mut self, value: bool) -> DataSymbol {
        self.program
            .literal(self.scope, LiteralValue::Bool(value))
            .unwrap()
    }

    pub fn string(&mut self, value: &str) -> DataSymbol {
        self.program
            .literal(self.scope, LiteralValue::Str(value.to_string()))
            .unwrap()
    }

    pub fn label(&mut self) -> LabelSymbol {
        self.program.symbols.new_label(self.scope, false).unwrap()
    }

    pub fn push(&mut self, tac: Tac) -> TacId {
        let name = self.name.clone();
        self.push_to(&name, tac)
    }

    pub fn push_to(&mut self, function: &str, tac: Tac) -> TacId {
        self.program
            .function_mut(function)
            .unwrap()
            .tacs
            .push_back(tac)
    }

    pub fn function(&self) -> &SourceFunction {
        self.program.function(&self.name).unwrap()
    }

    pub fn tacs(&self) -> &TacList {
        &self.function().tacs
    }

    pub fn listing(&self) -> Vec<String> {
        self.tacs().tacs().map(ToString::to_string).collect()
    }
}

/// ```text
/// b = <condition>
/// if not b goto $L0
/// r = 1
/// goto $L1
/// $L0:
/// r = 2
/// $L1:
/// ```
///
/// With `Some(value)` the conditional tests the literal directly.
pub(crate) fn if_else_fixture(condition: Option<bool>) -> Fixture {
    let mut f = Fixture::new("main");
    let b = f.local("b", TypeSymbol::BOOL);
    let r = f.local("r", TypeSymbol::I32);
    let t = f.boolean(true);
    let one = f.int(1);
    let two = f.int(2);
    let l0 = f.label();
    let l1 = f.label();

    f.push(Tac::assign(b.clone(), t));
    let tested = match condition {
        Some(value) => f.boolean(value),
        None => b,
    };
    f.push(Tac::Conditional {
        location: l0.clone(),
        condition: tested,
    });
    f.push(Tac::assign(r.clone(), one));
    f.push(Tac::Goto(l1.clone()));
    f.push(Tac::Label(l0));
    f.push(Tac::assign(r, two));
    f.push(Tac::Label(l1));
    f
}

/// ```text
/// b = true
/// goto $L0
/// r = 1        (unreachable)
/// goto $L1     (unreachable)
/// $L0:
/// r = 2
/// $L1:
/// ```
pub(crate) fn unreachable_fixture() -> Fixture {
    let mut f = Fixture::new("main");
    let b = f.local("b", TypeSymbol::BOOL);
    let r = f.local("r", TypeSymbol::I32);
    let t = f.boolean(true);
    let one = f.int(1);
    let two = f.int(2);
    let l0 = f.label();
    let l1 = f.label();

    f.push(Tac::assign(b, t));
    f.push(Tac::Goto(l0.clone()));
    f.push(Tac::assign(r.clone(), one));
    f.push(Tac::Goto(l1.clone()));
    f.push(Tac::Label(l0));
    f.push(Tac::assign(r, two));
    f.push(Tac::Label(l1));
    f
}
