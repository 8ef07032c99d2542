//! Benchmarks for the compilation phases.
//!
//! Measures the two phases that dominate real programs:
//! - Staged execution of a loop-heavy build function in the interpreter
//! - The optimizer fixpoint over a long straight-line function

extern crate stagecraft;

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use stagecraft::prelude::*;

/// `i32 build sum(i32 n) { i32 acc = 0; while (n > 0) { acc = acc + n; n = n - 1; } return acc; }`
/// called as `r = build sum(1000)` from `main`.
fn staged_loop_program() -> Program {
    let mut program = Program::new();
    let (_, main_scope) = program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::VOID, vec![], false))
        .unwrap();
    let n = Arc::new(ParamSymbol::new("n", TypeSymbol::I32, ParamDirection::In));
    let (sum, scope) = program
        .declare_function(FunctionSymbol::new("sum", TypeSymbol::I32, vec![n], true))
        .unwrap();

    let n = DataSymbol::param("n", TypeSymbol::I32, ParamDirection::In);
    let acc = program.local(scope, "acc", TypeSymbol::I32).unwrap();
    let more = program.local(scope, "more", TypeSymbol::BOOL).unwrap();
    let zero = program.literal(scope, LiteralValue::I32(0)).unwrap();
    let one = program.literal(scope, LiteralValue::I32(1)).unwrap();
    let top = program.symbols.new_label(scope, true).unwrap();
    let done = program.symbols.new_label(scope, true).unwrap();

    let tacs = &mut program.function_mut("sum").unwrap().tacs;
    tacs.push_back(Tac::assign(acc.clone(), zero.clone()));
    tacs.push_back(Tac::Label(top.clone()));
    tacs.push_back(Tac::Binary {
        op: BinaryOp::GreaterThan,
        result: more.clone(),
        lhs: n.clone(),
        rhs: zero,
    });
    tacs.push_back(Tac::Conditional {
        location: done.clone(),
        condition: more,
    });
    tacs.push_back(Tac::Binary {
        op: BinaryOp::Add,
        result: acc.clone(),
        lhs: acc.clone(),
        rhs: n.clone(),
    });
    tacs.push_back(Tac::Binary {
        op: BinaryOp::Subtract,
        result: n.clone(),
        lhs: n,
        rhs: one,
    });
    tacs.push_back(Tac::Goto(top));
    tacs.push_back(Tac::Label(done));
    tacs.push_back(Tac::Return(acc));

    let r = program.local(main_scope, "r", TypeSymbol::I32).unwrap();
    let limit = program
        .literal(main_scope, LiteralValue::I32(1000))
        .unwrap();
    let tacs = &mut program.function_mut("main").unwrap().tacs;
    tacs.push_back(Tac::Call {
        result: Some(r),
        function: sum,
        arguments: vec![limit],
        is_build: true,
    });
    tacs.push_back(Tac::ReturnVoid);
    program
}

/// `x0 = 1; x1 = x0 + 1; ...; return x{len-1}` in an `i32 main()`.
fn straight_line_program(len: i32) -> Program {
    let mut program = Program::new();
    let (_, scope) = program
        .declare_function(FunctionSymbol::new("main", TypeSymbol::I32, vec![], false))
        .unwrap();
    let one = program.literal(scope, LiteralValue::I32(1)).unwrap();

    let mut previous = program.local(scope, "x0", TypeSymbol::I32).unwrap();
    let mut tacs = vec![Tac::assign(previous.clone(), one.clone())];
    for i in 1..len {
        let next = program
            .local(scope, &format!("x{i}"), TypeSymbol::I32)
            .unwrap();
        tacs.push(Tac::Binary {
            op: BinaryOp::Add,
            result: next.clone(),
            lhs: previous,
            rhs: one.clone(),
        });
        previous = next;
    }
    tacs.push(Tac::Return(previous));
    program.function_mut("main").unwrap().tacs.extend(tacs);
    program
}

/// Benchmark interpreting ~5000 instructions of a staged loop.
fn bench_execute_build_loop(c: &mut Criterion) {
    c.bench_function("execute_build_loop_1000", |b| {
        b.iter_batched(
            staged_loop_program,
            |mut program| {
                let mut pipeline = Pipeline::default();
                let backend = pipeline.interpreter();
                let result = pipeline
                    .execute_build(&mut program, &backend, &NoFrontend)
                    .unwrap();
                black_box(result)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark folding a 200-step dependency chain down to one return.
fn bench_optimize_chain(c: &mut Criterion) {
    c.bench_function("optimize_chain_200", |b| {
        b.iter_batched(
            || straight_line_program(200),
            |mut program| {
                let mut pipeline =
                    Pipeline::new(CompilerConfig::new().with_optimizer_rounds(8));
                pipeline.optimize(&mut program).unwrap();
                black_box(program)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_execute_build_loop, bench_optimize_chain);
criterion_main!(benches);
