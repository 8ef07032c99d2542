//! Staged execution through the public pipeline.
//!
//! These tests build small programs by hand, the way a front end would lower them,
//! and run them through [`Pipeline::execute_build`] with the built-in interpreter.
//! A toy front end understands just enough source text for injection to re-enter
//! the compiler:
//!
//! - statements of the form `name = 5` or `name = callee()` (the call is staged)
//! - function declarations of the form `void name(...) {...}`, lowered to an empty
//!   runtime body

use std::sync::Arc;

use stagecraft::{prelude::*, symbols::HandleType};

struct ToyFrontend;

impl ToyFrontend {
    fn variable(program: &mut Program, function: &str, name: &str) -> Result<DataSymbol> {
        let scope = program
            .function(function)
            .map(|f| f.scope)
            .ok_or_else(|| Error::Frontend(format!("unknown function {function}")))?;
        match program.symbols.find_data(scope, name) {
            Some(data) => Ok(data),
            None => program.local(scope, name, TypeSymbol::I32),
        }
    }
}

impl Frontend for ToyFrontend {
    fn lower_statements(
        &self,
        source: &str,
        function: &str,
        program: &mut Program,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Tac>> {
        let mut tacs = Vec::new();
        for line in source.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (lhs, rhs) = line
                .split_once('=')
                .ok_or_else(|| Error::Frontend(format!("cannot parse `{line}`")))?;
            let result = Self::variable(program, function, lhs.trim())?;
            let rhs = rhs.trim();

            if let Some(callee) = rhs.strip_suffix("()") {
                let callee = program
                    .find_function(callee)
                    .ok_or_else(|| Error::Frontend(format!("unknown function {callee}")))?;
                tacs.push(Tac::Call {
                    result: Some(result),
                    function: callee,
                    arguments: vec![],
                    is_build: true,
                });
            } else {
                let value: i32 = rhs
                    .parse()
                    .map_err(|_| Error::Frontend(format!("not a number: {rhs}")))?;
                let scope = program.symbols.root();
                let literal = program.literal(scope, LiteralValue::I32(value))?;
                tacs.push(Tac::assign(result, literal));
            }
        }
        Ok(tacs)
    }

    fn lower_function(
        &self,
        source: &str,
        program: &mut Program,
        _diagnostics: &mut Diagnostics,
    ) -> Result<Arc<FunctionSymbol>> {
        let name = source
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.split('(').next())
            .ok_or_else(|| Error::Frontend(format!("cannot parse `{source}`")))?;
        let (symbol, _) =
            program.declare_function(FunctionSymbol::new(name, TypeSymbol::VOID, vec![], false))?;
        if let Some(function) = program.function_mut(name) {
            function.tacs.push_back(Tac::ReturnVoid);
        }
        Ok(symbol)
    }
}

fn listing(program: &Program, name: &str) -> Vec<String> {
    program
        .function(name)
        .map(|f| f.tacs.tacs().map(ToString::to_string).collect())
        .unwrap_or_default()
}

fn string(program: &mut Program, scope: ScopeId, text: &str) -> DataSymbol {
    program
        .literal(scope, LiteralValue::Str(text.to_string()))
        .unwrap()
}

fn call(function: &Arc<FunctionSymbol>, arguments: Vec<DataSymbol>, is_build: bool) -> Tac {
    Tac::Call {
        result: None,
        function: function.clone(),
        arguments,
        is_build,
    }
}

/// `main` stages `gen`, which injects `x = 5` and a staged call of `answer`.
fn injecting_program() -> Program {
    let mut program = Program::new();
    program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
        .unwrap();

    let (answer, answer_scope) = program
        .declare_function(FunctionSymbol::new("answer", TypeSymbol::I32, vec![], true))
        .unwrap();
    let forty_two = program
        .literal(answer_scope, LiteralValue::I32(42))
        .unwrap();
    program
        .function_mut(&answer.name)
        .unwrap()
        .tacs
        .push_back(Tac::Return(forty_two));

    let (gen, gen_scope) = program
        .declare_function(FunctionSymbol::new("gen", TypeSymbol::VOID, vec![], true))
        .unwrap();
    let body = string(&mut program, gen_scope, "x = 5\ny = answer()");
    let add_body = program.find_function("Build_AddBody").unwrap();
    let tacs = &mut program.function_mut("gen").unwrap().tacs;
    tacs.push_back(call(&add_body, vec![body], false));
    tacs.push_back(Tac::ReturnVoid);

    let tacs = &mut program.function_mut("main").unwrap().tacs;
    tacs.push_back(call(&gen, vec![], true));
    tacs.push_back(Tac::ReturnVoid);
    program
}

#[test]
fn test_injected_build_calls_run_in_later_rounds() {
    let mut program = injecting_program();
    let mut pipeline = Pipeline::default();

    let result = pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &ToyFrontend)
        .unwrap();

    assert!(result.success());
    assert_eq!(
        listing(&program, "main"),
        vec![
            "AssignTac: x = \"5\":i32",
            "AssignTac: y = \"42\":i32",
            "ReturnVoidTac",
        ]
    );
    let texts: Vec<&str> = result.messages().iter().map(|m| m.text.as_str()).collect();
    assert!(texts.contains(&"Executed build call gen from main"));
    assert!(texts.contains(&"Executed build call answer from main"));
    assert!(texts.contains(&"answer() -> \"42\""));

    // gen in round one, answer in round two, nothing left in round three
    assert_eq!(pipeline.events().count_kind(EventKind::RoundCompleted), 3);
    assert_eq!(pipeline.events().count_kind(EventKind::BuildCallExecuted), 2);
    assert!(pipeline.events().has(EventKind::SourceInjected));
}

#[test]
fn test_injection_lands_between_argument_setup_and_call_result() {
    // i32 build gen(str body) { Build_AddBody(body); return 7; }
    // void main() { a = 1; r = build gen("x = 5\ny = answer()"); b = 2; }
    let mut program = injecting_program();
    let body_param = Arc::new(ParamSymbol::new("body", TypeSymbol::STR, ParamDirection::In));
    let (gen, gen_scope) = program
        .declare_function(FunctionSymbol::new(
            "gen_with_body",
            TypeSymbol::I32,
            vec![body_param],
            true,
        ))
        .unwrap();
    let seven = program.literal(gen_scope, LiteralValue::I32(7)).unwrap();
    let add_body = program.find_function("Build_AddBody").unwrap();
    let body = DataSymbol::param("body", TypeSymbol::STR, ParamDirection::In);
    let tacs = &mut program.function_mut("gen_with_body").unwrap().tacs;
    tacs.push_back(call(&add_body, vec![body], false));
    tacs.push_back(Tac::Return(seven));

    let main = program.function("main").unwrap().scope;
    let a = program.local(main, "a", TypeSymbol::I32).unwrap();
    let r = program.local(main, "r", TypeSymbol::I32).unwrap();
    let b = program.local(main, "b", TypeSymbol::I32).unwrap();
    let one = program.literal(main, LiteralValue::I32(1)).unwrap();
    let two = program.literal(main, LiteralValue::I32(2)).unwrap();
    let text = string(&mut program, main, "x = 5\ny = answer()");
    let tacs = &mut program.function_mut("main").unwrap().tacs;
    tacs.clear();
    tacs.push_back(Tac::assign(a, one));
    tacs.push_back(Tac::Call {
        result: Some(r),
        function: gen,
        arguments: vec![text],
        is_build: true,
    });
    tacs.push_back(Tac::assign(b, two));
    tacs.push_back(Tac::ReturnVoid);

    let mut pipeline = Pipeline::default();
    let result = pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &ToyFrontend)
        .unwrap();

    assert!(result.success());
    assert_eq!(
        listing(&program, "main"),
        vec![
            "AssignTac: a = \"1\":i32",
            "AssignTac: x = \"5\":i32",
            "AssignTac: y = \"42\":i32",
            "AssignTac: r = \"7\":i32",
            "AssignTac: b = \"2\":i32",
            "ReturnVoidTac",
        ]
    );
}

#[test]
fn test_round_limit_reported() {
    let mut program = injecting_program();
    let mut pipeline = Pipeline::new(CompilerConfig::new().with_max_build_rounds(1));

    let result = pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &ToyFrontend)
        .unwrap();

    assert!(result.success());
    assert_eq!(
        result.of_kind(MessageType::Warning).next().unwrap().text,
        "Build execution stopped after 1 rounds with work remaining"
    );
    assert!(!pipeline.ready_for_backend(&program).unwrap().success());
}

#[test]
fn test_injection_without_frontend_fails() {
    let mut program = injecting_program();
    let mut pipeline = Pipeline::default();

    let err = pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &NoFrontend)
        .unwrap_err();
    assert!(matches!(err, Error::Frontend(_)));
}

#[test]
fn test_created_function_invoked_at_runtime() {
    let mut program = Program::new();
    program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
        .unwrap();
    let (maker, scope) = program
        .declare_function(FunctionSymbol::new("maker", TypeSymbol::VOID, vec![], true))
        .unwrap();

    let handle = program
        .symbols
        .new_temp(scope, TypeSymbol::Handle(HandleType::Func))
        .unwrap();
    let arguments = vec![
        string(&mut program, scope, "hello"),
        string(&mut program, scope, "void"),
        string(&mut program, scope, ""),
        string(&mut program, scope, "WriteLine(\"hi\");"),
    ];
    let build_func = program.find_function("Build_Func").unwrap();
    let invoke = program.find_function("Invoke").unwrap();
    let tacs = &mut program.function_mut("maker").unwrap().tacs;
    tacs.push_back(Tac::Call {
        result: Some(handle.clone()),
        function: build_func,
        arguments,
        is_build: false,
    });
    tacs.push_back(call(&invoke, vec![handle], false));
    tacs.push_back(Tac::ReturnVoid);

    let tacs = &mut program.function_mut("main").unwrap().tacs;
    tacs.push_back(call(&maker, vec![], true));
    tacs.push_back(Tac::ReturnVoid);

    let mut pipeline = Pipeline::default();
    let result = pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &ToyFrontend)
        .unwrap();

    assert!(result.success());
    assert_eq!(
        listing(&program, "main"),
        vec!["CallTac: Void hello()", "ReturnVoidTac"]
    );
    assert!(program.function("hello").is_some());
    assert!(pipeline.events().has(EventKind::FunctionCreated));
    assert!(pipeline.ready_for_backend(&program).unwrap().success());
}

#[test]
fn test_region_output_and_removal() {
    let mut program = Program::new();
    let (_, scope) = program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
        .unwrap();
    let text = string(&mut program, scope, "from region");
    let write_line = program.find_function("WriteLine").unwrap();

    let tacs = &mut program.function_mut("main").unwrap().tacs;
    tacs.push_back(Tac::BuildMark {
        name: "main_region0".to_string(),
        op: MarkOp::Start,
    });
    tacs.push_back(call(&write_line, vec![text], false));
    tacs.push_back(Tac::BuildMark {
        name: "main_region0".to_string(),
        op: MarkOp::End,
    });
    tacs.push_back(Tac::ReturnVoid);

    let mut pipeline = Pipeline::default();
    pipeline.generate_build_regions(&mut program).unwrap();
    assert!(program.function("main_region0").is_some_and(|f| f.is_build()));

    let result = pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &NoFrontend)
        .unwrap();
    assert!(result.success());
    assert_eq!(pipeline.output(), "from region\n");
    assert_eq!(listing(&program, "main"), vec!["ReturnVoidTac"]);

    pipeline.prune_build_symbols(&mut program).unwrap();
    assert!(program.function("main_region0").is_none());
}

#[test]
fn test_runaway_build_function_hits_limit() {
    let mut program = Program::new();
    program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
        .unwrap();
    let (spin, scope) = program
        .declare_function(FunctionSymbol::new("spin", TypeSymbol::VOID, vec![], true))
        .unwrap();
    let top = program.symbols.new_label(scope, true).unwrap();
    let tacs = &mut program.function_mut("spin").unwrap().tacs;
    tacs.push_back(Tac::Label(top.clone()));
    tacs.push_back(Tac::Goto(top));
    program
        .function_mut("main")
        .unwrap()
        .tacs
        .push_back(call(&spin, vec![], true));

    let backend = TacInterpreter::new(StagingLimits::new().with_max_instructions(1_000));
    let err = Pipeline::default()
        .execute_build(&mut program, &backend, &NoFrontend)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InstructionLimitExceeded { limit: 1_000, .. }
    ));
}

#[test]
fn test_static_keeps_value_across_build_calls() {
    // i32 build next() { static i32 n = 0; n = n + 1; return n; }
    let mut program = Program::new();
    let (_, main_scope) = program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
        .unwrap();
    let (next, scope) = program
        .declare_function(FunctionSymbol::new("next", TypeSymbol::I32, vec![], true))
        .unwrap();
    let n = DataSymbol::static_local("n", TypeSymbol::I32);
    assert!(n.is_static());
    program.symbols.add(scope, n.clone()).unwrap();
    let zero = program.literal(scope, LiteralValue::I32(0)).unwrap();
    let one = program.literal(scope, LiteralValue::I32(1)).unwrap();
    let tacs = &mut program.function_mut("next").unwrap().tacs;
    tacs.push_back(Tac::Assign {
        result: n.clone(),
        operand: zero,
        declare: true,
    });
    tacs.push_back(Tac::Binary {
        op: BinaryOp::Add,
        result: n.clone(),
        lhs: n.clone(),
        rhs: one,
    });
    tacs.push_back(Tac::Return(n));

    let a = program.local(main_scope, "a", TypeSymbol::I32).unwrap();
    let b = program.local(main_scope, "b", TypeSymbol::I32).unwrap();
    let tacs = &mut program.function_mut("main").unwrap().tacs;
    for result in [a, b] {
        tacs.push_back(Tac::Call {
            result: Some(result),
            function: next.clone(),
            arguments: vec![],
            is_build: true,
        });
    }

    let mut pipeline = Pipeline::default();
    pipeline
        .execute_build(&mut program, &TacInterpreter::default(), &NoFrontend)
        .unwrap();
    assert_eq!(
        listing(&program, "main"),
        vec!["AssignTac: a = \"1\":i32", "AssignTac: b = \"2\":i32"]
    );
    assert_eq!(
        pipeline.context().static_value("next_n"),
        Some(&LiteralValue::I32(2))
    );
}
