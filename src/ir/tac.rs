//! Three-address instructions.

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter};

use crate::symbols::{DataSymbol, FunctionSymbol, LabelSymbol};

/// Opening or closing half of a bracket mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MarkOp {
    /// Opening mark
    Start,
    /// Closing mark
    End,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum UnaryOp {
    /// `x + 1`
    Increment,
    /// `x - 1`
    Decrement,
    /// `-x`
    Negate,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BinaryOp {
    /// `a + b`, also string concatenation
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
    /// `a % b`
    Mod,
    /// `a < b`
    LessThan,
    /// `a <= b`
    LessThanEqual,
    /// `a > b`
    GreaterThan,
    /// `a >= b`
    GreaterThanEqual,
    /// `a == b`
    Equals,
}

impl BinaryOp {
    /// Returns `true` for the operators producing `bool`.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::LessThanEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEqual
                | BinaryOp::Equals
        )
    }
}

/// A three-address instruction.
///
/// Operands are [`DataSymbol`]s; jumps name a [`LabelSymbol`]. Instructions are
/// plain values, edited by replacing them inside a [`crate::ir::TacList`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tac {
    /// No operation
    Nop,
    /// Function body bracket
    FunctionMark(MarkOp),
    /// Build region bracket; `name` is the region's generated function name
    BuildMark {
        /// Region function name
        name: String,
        /// Opening or closing
        op: MarkOp,
    },
    /// Declares a data symbol
    Data(DataSymbol),
    /// Jump target
    Label(LabelSymbol),
    /// `return value`
    Return(DataSymbol),
    /// Return of several values, produced for targets without out-parameters
    MultiReturn(Vec<DataSymbol>),
    /// `return`
    ReturnVoid,
    /// `result = operand`
    Assign {
        /// Destination
        result: DataSymbol,
        /// Source
        operand: DataSymbol,
        /// Declaration with initializer
        declare: bool,
    },
    /// `result = op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Destination
        result: DataSymbol,
        /// Source
        operand: DataSymbol,
    },
    /// `result = lhs op rhs`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Destination
        result: DataSymbol,
        /// Left operand
        lhs: DataSymbol,
        /// Right operand
        rhs: DataSymbol,
    },
    /// `result = function(arguments)`
    Call {
        /// Destination, absent for discarded or void results
        result: Option<DataSymbol>,
        /// Callee
        function: Arc<FunctionSymbol>,
        /// Arguments in parameter order
        arguments: Vec<DataSymbol>,
        /// Executed at build time
        is_build: bool,
    },
    /// Call whose out-arguments come back as extra return values
    MultiCall {
        /// Destination of the ordinary return value
        result: Option<DataSymbol>,
        /// Caller variables receiving the out-values, in parameter order
        side_effects: Vec<DataSymbol>,
        /// Callee
        function: Arc<FunctionSymbol>,
        /// Arguments in parameter order
        arguments: Vec<DataSymbol>,
    },
    /// Unconditional jump
    Goto(LabelSymbol),
    /// Jump to `location` when `condition` is false
    Conditional {
        /// Jump target
        location: LabelSymbol,
        /// Tested value
        condition: DataSymbol,
    },
    /// Synthetic marker for fall-through control edges
    FallThrough,
}

impl Tac {
    /// Creates a plain assignment.
    #[must_use]
    pub fn assign(result: DataSymbol, operand: DataSymbol) -> Self {
        Tac::Assign {
            result,
            operand,
            declare: false,
        }
    }

    /// Returns the symbols this instruction reads.
    ///
    /// Access paths are expanded with [`DataSymbol::symbols`]. The index of an
    /// element destination is read. For calls, out arguments are writes, not reads.
    #[must_use]
    pub fn reads(&self) -> Vec<DataSymbol> {
        let mut out = Vec::new();
        match self {
            Tac::Return(value) => out.extend(value.symbols()),
            Tac::MultiReturn(values) => values.iter().for_each(|v| out.extend(v.symbols())),
            Tac::Assign {
                result, operand, ..
            }
            | Tac::Unary {
                result, operand, ..
            } => {
                out.extend(operand.symbols());
                destination_reads(result, &mut out);
            }
            Tac::Binary {
                result, lhs, rhs, ..
            } => {
                out.extend(lhs.symbols());
                out.extend(rhs.symbols());
                destination_reads(result, &mut out);
            }
            Tac::Call {
                result,
                function,
                arguments,
                ..
            }
            | Tac::MultiCall {
                result,
                function,
                arguments,
                ..
            } => {
                for (i, arg) in arguments.iter().enumerate() {
                    if function.is_out(i) {
                        destination_reads(arg, &mut out);
                    } else {
                        out.extend(arg.symbols());
                    }
                }
                if let Some(result) = result {
                    destination_reads(result, &mut out);
                }
            }
            Tac::Conditional { condition, .. } => out.extend(condition.symbols()),
            Tac::Nop
            | Tac::FunctionMark(_)
            | Tac::BuildMark { .. }
            | Tac::Data(_)
            | Tac::Label(_)
            | Tac::ReturnVoid
            | Tac::Goto(_)
            | Tac::FallThrough => {}
        }
        out
    }

    /// Returns the symbols this instruction writes.
    ///
    /// A write to `a.x` writes both `a.x` and `a`; a write to `a[i]` writes `a`.
    #[must_use]
    pub fn writes(&self) -> Vec<DataSymbol> {
        let mut out = Vec::new();
        match self {
            Tac::Assign { result, .. } | Tac::Unary { result, .. } | Tac::Binary { result, .. } => {
                destination_writes(result, &mut out);
            }
            Tac::Call {
                result,
                function,
                arguments,
                ..
            } => {
                if let Some(result) = result {
                    destination_writes(result, &mut out);
                }
                for (i, arg) in arguments.iter().enumerate() {
                    if function.is_out(i) {
                        destination_writes(arg, &mut out);
                    }
                }
            }
            Tac::MultiCall {
                result,
                side_effects,
                ..
            } => {
                if let Some(result) = result {
                    destination_writes(result, &mut out);
                }
                side_effects
                    .iter()
                    .for_each(|s| destination_writes(s, &mut out));
            }
            Tac::Nop
            | Tac::FunctionMark(_)
            | Tac::BuildMark { .. }
            | Tac::Data(_)
            | Tac::Label(_)
            | Tac::Return(_)
            | Tac::MultiReturn(_)
            | Tac::ReturnVoid
            | Tac::Goto(_)
            | Tac::Conditional { .. }
            | Tac::FallThrough => {}
        }
        out
    }

    /// Returns the destination operand of a value-producing instruction.
    #[must_use]
    pub fn result(&self) -> Option<&DataSymbol> {
        match self {
            Tac::Assign { result, .. } | Tac::Unary { result, .. } | Tac::Binary { result, .. } => {
                Some(result)
            }
            Tac::Call { result, .. } | Tac::MultiCall { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    /// Returns the symbols written through the destination operand alone, leaving
    /// out the out-arguments of calls.
    #[must_use]
    pub fn result_writes(&self) -> Vec<DataSymbol> {
        let mut out = Vec::new();
        if let Some(result) = self.result() {
            destination_writes(result, &mut out);
        }
        out
    }

    /// Returns the jump target of a `Goto` or `Conditional`.
    #[must_use]
    pub fn jump_target(&self) -> Option<&LabelSymbol> {
        match self {
            Tac::Goto(label) | Tac::Conditional { location: label, .. } => Some(label),
            _ => None,
        }
    }

    /// Returns the label this instruction defines.
    #[must_use]
    pub fn label(&self) -> Option<&LabelSymbol> {
        match self {
            Tac::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Returns `true` for calls marked for build-time execution.
    #[must_use]
    pub fn is_build_call(&self) -> bool {
        matches!(self, Tac::Call { is_build: true, .. })
    }

    /// Returns the callee of a `Call` or `MultiCall`.
    #[must_use]
    pub fn callee(&self) -> Option<&Arc<FunctionSymbol>> {
        match self {
            Tac::Call { function, .. } | Tac::MultiCall { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Returns a copy with every occurrence of `from` replaced by `to`, in read and
    /// write positions alike.
    #[must_use]
    pub fn substitute(&self, from: &DataSymbol, to: &DataSymbol) -> Tac {
        let s = |d: &DataSymbol| d.substitute(from, to);
        match self {
            Tac::Data(d) => Tac::Data(s(d)),
            Tac::Return(d) => Tac::Return(s(d)),
            Tac::MultiReturn(values) => Tac::MultiReturn(values.iter().map(s).collect()),
            Tac::Assign {
                result,
                operand,
                declare,
            } => Tac::Assign {
                result: s(result),
                operand: s(operand),
                declare: *declare,
            },
            Tac::Unary {
                op,
                result,
                operand,
            } => Tac::Unary {
                op: *op,
                result: s(result),
                operand: s(operand),
            },
            Tac::Binary {
                op,
                result,
                lhs,
                rhs,
            } => Tac::Binary {
                op: *op,
                result: s(result),
                lhs: s(lhs),
                rhs: s(rhs),
            },
            Tac::Call {
                result,
                function,
                arguments,
                is_build,
            } => Tac::Call {
                result: result.as_ref().map(s),
                function: function.clone(),
                arguments: arguments.iter().map(s).collect(),
                is_build: *is_build,
            },
            Tac::MultiCall {
                result,
                side_effects,
                function,
                arguments,
            } => Tac::MultiCall {
                result: result.as_ref().map(s),
                side_effects: side_effects.iter().map(s).collect(),
                function: function.clone(),
                arguments: arguments.iter().map(s).collect(),
            },
            Tac::Conditional {
                location,
                condition,
            } => Tac::Conditional {
                location: location.clone(),
                condition: s(condition),
            },
            Tac::Nop
            | Tac::FunctionMark(_)
            | Tac::BuildMark { .. }
            | Tac::Label(_)
            | Tac::ReturnVoid
            | Tac::Goto(_)
            | Tac::FallThrough => self.clone(),
        }
    }
}

fn destination_writes(destination: &DataSymbol, out: &mut Vec<DataSymbol>) {
    match destination {
        DataSymbol::Field(f) => {
            out.push(destination.clone());
            destination_writes(&f.instance, out);
        }
        DataSymbol::Element(e) => destination_writes(&e.array, out),
        _ => out.push(destination.clone()),
    }
}

fn destination_reads(destination: &DataSymbol, out: &mut Vec<DataSymbol>) {
    match destination {
        DataSymbol::Field(f) => destination_reads(&f.instance, out),
        DataSymbol::Element(e) => {
            out.extend(e.index.symbols());
            destination_reads(&e.array, out);
        }
        _ => {}
    }
}

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[DataSymbol]) -> fmt::Result {
    for (i, arg) in arguments.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Tac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tac::Nop => f.write_str("NopTac"),
            Tac::FunctionMark(op) => write!(f, "FunctionMarkTac: {op}"),
            Tac::BuildMark { name, op } => write!(f, "BuildMarkTac: {name} {op}"),
            Tac::Data(d) => write!(f, "DataTac: {d}"),
            Tac::Label(l) => write!(f, "LabelTac: {l}"),
            Tac::Return(d) => write!(f, "ReturnTac: {d}"),
            Tac::MultiReturn(values) => {
                f.write_str("MultiReturnTac: ")?;
                write_arguments(f, values)
            }
            Tac::ReturnVoid => f.write_str("ReturnVoidTac"),
            Tac::Assign {
                result,
                operand,
                declare,
            } => {
                let name = if *declare { "DeclAssignTac" } else { "AssignTac" };
                write!(f, "{name}: {result} = {operand}")
            }
            Tac::Unary {
                op,
                result,
                operand,
            } => write!(f, "UnaryTac: {result} = {op} {operand}"),
            Tac::Binary {
                op,
                result,
                lhs,
                rhs,
            } => write!(f, "BinaryTac: {result} = {lhs} {op} {rhs}"),
            Tac::Call {
                result,
                function,
                arguments,
                is_build,
            } => {
                f.write_str("CallTac: ")?;
                match result {
                    Some(r) => write!(f, "{r} = ")?,
                    None => f.write_str("Void ")?,
                }
                if *is_build {
                    f.write_str("Build ")?;
                }
                write!(f, "{}(", function.name)?;
                write_arguments(f, arguments)?;
                f.write_str(")")
            }
            Tac::MultiCall {
                result,
                side_effects,
                function,
                arguments,
            } => {
                f.write_str("MultiCallTac: ")?;
                match result {
                    Some(r) => write!(f, "{r}")?,
                    None => f.write_str("Void")?,
                }
                for effect in side_effects {
                    write!(f, ", {effect}")?;
                }
                write!(f, " = {}(", function.name)?;
                write_arguments(f, arguments)?;
                f.write_str(")")
            }
            Tac::Goto(label) => write!(f, "GotoTac: {label}"),
            Tac::Conditional {
                location,
                condition,
            } => write!(f, "ConditionalTac: IF NOT {condition} -> {location}"),
            Tac::FallThrough => f.write_str("FallThroughTac"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{FieldDef, ParamDirection, ParamSymbol, TypeSymbol};

    fn out_function() -> Arc<FunctionSymbol> {
        Arc::new(FunctionSymbol::new(
            "parse",
            TypeSymbol::BOOL,
            vec![
                Arc::new(ParamSymbol {
                    name: "text".into(),
                    ty: TypeSymbol::STR,
                    direction: ParamDirection::In,
                }),
                Arc::new(ParamSymbol {
                    name: "value".into(),
                    ty: TypeSymbol::I32,
                    direction: ParamDirection::Out,
                }),
            ],
            false,
        ))
    }

    #[test]
    fn test_call_reads_and_writes() {
        let ok = DataSymbol::local("ok", TypeSymbol::BOOL);
        let text = DataSymbol::local("text", TypeSymbol::STR);
        let value = DataSymbol::local("value", TypeSymbol::I32);
        let call = Tac::Call {
            result: Some(ok.clone()),
            function: out_function(),
            arguments: vec![text.clone(), value.clone()],
            is_build: false,
        };

        assert_eq!(call.reads(), vec![text]);
        assert_eq!(call.writes(), vec![ok, value]);
        assert_eq!(
            call.to_string(),
            "CallTac: ok = parse(text, value)"
        );
    }

    #[test]
    fn test_field_write_touches_instance() {
        let ty = TypeSymbol::new_struct(
            "S",
            vec![FieldDef {
                name: "x".into(),
                ty: TypeSymbol::I32,
            }],
            false,
        );
        let s = DataSymbol::local("s", ty);
        let sx = DataSymbol::field(s.clone(), "x").unwrap();
        let y = DataSymbol::local("y", TypeSymbol::I32);

        let tac = Tac::assign(sx.clone(), y.clone());
        assert_eq!(tac.writes(), vec![sx, s]);
        assert_eq!(tac.reads(), vec![y]);
    }

    #[test]
    fn test_element_write_reads_index() {
        let arr = DataSymbol::local("arr", TypeSymbol::array_of(TypeSymbol::I32));
        let i = DataSymbol::local("i", TypeSymbol::I32);
        let v = DataSymbol::local("v", TypeSymbol::I32);
        let tac = Tac::assign(DataSymbol::element(arr.clone(), i.clone()).unwrap(), v.clone());

        assert_eq!(tac.writes(), vec![arr]);
        assert_eq!(tac.reads(), vec![v, i]);
    }

    #[test]
    fn test_display_forms() {
        let x = DataSymbol::local("x", TypeSymbol::BOOL);
        let label = LabelSymbol::new("$L3");
        assert_eq!(
            Tac::Conditional {
                location: label.clone(),
                condition: x.clone()
            }
            .to_string(),
            "ConditionalTac: IF NOT x -> $L3"
        );
        assert_eq!(Tac::Goto(label).to_string(), "GotoTac: $L3");
        assert_eq!(
            Tac::BuildMark {
                name: "region0".into(),
                op: MarkOp::Start
            }
            .to_string(),
            "BuildMarkTac: region0 Start"
        );
        assert_eq!(
            Tac::Assign {
                result: x.clone(),
                operand: x,
                declare: true
            }
            .to_string(),
            "DeclAssignTac: x = x"
        );
    }

    #[test]
    fn test_substitute_all_positions() {
        let a = DataSymbol::local("a", TypeSymbol::I32);
        let b = DataSymbol::local("b", TypeSymbol::I32);
        let tac = Tac::Binary {
            op: BinaryOp::Add,
            result: a.clone(),
            lhs: a.clone(),
            rhs: b.clone(),
        };
        let renamed = DataSymbol::local("f_a", TypeSymbol::I32);
        assert_eq!(
            tac.substitute(&a, &renamed),
            Tac::Binary {
                op: BinaryOp::Add,
                result: renamed.clone(),
                lhs: renamed,
                rhs: b,
            }
        );
    }

    #[test]
    fn test_control_instructions_write_nothing() {
        let x = DataSymbol::local("x", TypeSymbol::BOOL);
        let label = LabelSymbol::new("$L0");
        let control = [
            Tac::Return(x.clone()),
            Tac::MultiReturn(vec![x.clone()]),
            Tac::Conditional {
                location: label.clone(),
                condition: x.clone(),
            },
            Tac::Goto(label.clone()),
            Tac::Label(label),
            Tac::Data(x.clone()),
        ];
        for tac in &control {
            assert!(tac.writes().is_empty(), "{tac}");
        }

        let renamed = DataSymbol::local("y", TypeSymbol::BOOL);
        assert_eq!(control[2].substitute(&x, &renamed).reads(), vec![renamed.clone()]);
        assert_eq!(control[3].substitute(&x, &renamed), control[3]);
        assert_eq!(control[5].substitute(&x, &renamed), Tac::Data(renamed));
    }

    #[test]
    fn test_comparison_ops() {
        assert!(BinaryOp::Equals.is_comparison());
        assert!(!BinaryOp::Mod.is_comparison());
    }
}
