//! A tree-walking backend for staged code.
//!
//! [`TacInterpreter`] executes three-address code directly. Compiling a function
//! copies its body into a flat vector with a label index, so jumps are a map lookup
//! and the program stays free for source injection while the unit runs.
//!
//! # Execution model
//!
//! - Each call gets a fresh frame mapping variables to values. Field and element
//!   stores write the whole aggregate back into its root variable.
//! - Static locals live in the [`crate::staging::StagingContext`], keyed
//!   `{function}_{name}`, and keep their value across invocations. Their declaring
//!   assignment only runs while the static is uninitialized.
//! - Out-parameters are copied back to the caller's argument variables on return.
//! - A build region reached inside interpreted code runs as a call of its region
//!   function; execution then continues after the region's end mark.
//! - Calls to builtins dispatch to [`Intrinsic::invoke`].
//! - Functions missing from the unit, such as ones declared by `Build_Func` while
//!   the unit runs, are compiled from the program on first call.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use crate::{
    compiler::StagingLimits,
    ir::{eval, MarkOp, Tac},
    program::{Program, SourceFunction},
    staging::{fault, Intrinsic, NativeBackend, StagingHost},
    symbols::{DataSymbol, FunctionSymbol, LiteralValue, TypeSymbol},
    Error, Result,
};

/// One function, ready to run.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    symbol: Arc<FunctionSymbol>,
    code: Vec<Tac>,
    labels: HashMap<String, usize>,
    region_ends: HashMap<String, usize>,
}

impl CompiledFunction {
    fn from_source(function: &SourceFunction) -> Self {
        let code: Vec<Tac> = function.tacs.tacs().cloned().collect();
        let mut labels = HashMap::new();
        let mut region_ends = HashMap::new();
        for (index, tac) in code.iter().enumerate() {
            match tac {
                Tac::Label(label) => {
                    labels.insert(label.name.clone(), index);
                }
                Tac::BuildMark {
                    name,
                    op: MarkOp::End,
                } => {
                    region_ends.insert(name.clone(), index);
                }
                _ => {}
            }
        }

        CompiledFunction {
            symbol: function.symbol.clone(),
            code,
            labels,
            region_ends,
        }
    }

    /// Returns the signature.
    #[must_use]
    pub fn symbol(&self) -> &Arc<FunctionSymbol> {
        &self.symbol
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns `true` for an empty body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    fn callees(&self) -> impl Iterator<Item = &str> + '_ {
        self.code.iter().filter_map(|tac| match tac {
            Tac::Call { function, .. } | Tac::MultiCall { function, .. }
                if !function.is_builtin() =>
            {
                Some(function.name.as_str())
            }
            Tac::BuildMark {
                name,
                op: MarkOp::Start,
            } => Some(name.as_str()),
            _ => None,
        })
    }
}

/// The functions compiled by one [`TacInterpreter::compile`] call.
#[derive(Debug, Clone, Default)]
pub struct CompiledUnit {
    functions: HashMap<String, Arc<CompiledFunction>>,
}

impl CompiledUnit {
    /// Returns the compiled function called `name`.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Arc<CompiledFunction>> {
        self.functions.get(name)
    }

    /// Returns `true` if `name` was compiled into this unit.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the number of compiled functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if nothing was compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Executes staged functions by interpreting their three-address code.
///
/// # Example
///
/// ```rust,ignore
/// use stagecraft::{compiler::StagingLimits, staging::TacInterpreter};
///
/// let backend = TacInterpreter::new(StagingLimits::new().with_max_instructions(1_000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TacInterpreter {
    limits: StagingLimits,
}

impl TacInterpreter {
    /// Creates an interpreter bounded by `limits`.
    #[must_use]
    pub fn new(limits: StagingLimits) -> Self {
        TacInterpreter { limits }
    }

    /// Returns the limits applied to each invocation.
    #[must_use]
    pub fn limits(&self) -> &StagingLimits {
        &self.limits
    }
}

impl NativeBackend for TacInterpreter {
    type Unit = CompiledUnit;

    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn compile(&self, program: &Program, functions: &[String]) -> Result<CompiledUnit> {
        let mut unit = CompiledUnit::default();
        for name in functions {
            if program.function(name).is_none() {
                return Err(Error::SymbolError(format!(
                    "Function {name} has no body to compile"
                )));
            }
        }

        let mut pending: Vec<String> = functions.to_vec();
        while let Some(name) = pending.pop() {
            if unit.contains(&name) {
                continue;
            }
            // Callees may not exist yet; they are compiled when first called.
            let Some(function) = program.function(&name) else {
                continue;
            };
            let compiled = CompiledFunction::from_source(function);
            pending.extend(compiled.callees().map(str::to_string));
            unit.functions.insert(name, Arc::new(compiled));
        }

        Ok(unit)
    }

    fn invoke(
        &self,
        unit: &CompiledUnit,
        function: &str,
        arguments: &[LiteralValue],
        host: &mut StagingHost<'_>,
    ) -> Result<Option<LiteralValue>> {
        let mut machine = Machine {
            unit,
            host,
            limits: &self.limits,
            executed: 0,
            depth: 0,
            late: HashMap::new(),
        };
        let (value, _) = machine.call(function, arguments.to_vec())?;
        Ok(value)
    }
}

type Frame = HashMap<DataSymbol, LiteralValue>;

/// Where control goes after an instruction.
enum Step {
    Next,
    Jump(usize),
    Return(Option<LiteralValue>),
}

/// State of one invocation.
struct Machine<'m, 'a> {
    unit: &'m CompiledUnit,
    host: &'m mut StagingHost<'a>,
    limits: &'m StagingLimits,
    executed: u64,
    depth: usize,
    late: HashMap<String, Arc<CompiledFunction>>,
}

impl Machine<'_, '_> {
    fn resolve(&mut self, name: &str) -> Result<Arc<CompiledFunction>> {
        if let Some(compiled) = self.unit.function(name).or_else(|| self.late.get(name)) {
            return Ok(compiled.clone());
        }
        let function = self
            .host
            .program
            .function(name)
            .ok_or_else(|| fault(name, "no such function"))?;
        let compiled = Arc::new(CompiledFunction::from_source(function));
        self.late.insert(name.to_string(), compiled.clone());
        Ok(compiled)
    }

    fn tick(&mut self) -> Result<()> {
        self.executed += 1;
        let limit = self.limits.max_instructions;
        if limit > 0 && self.executed > limit {
            return Err(Error::InstructionLimitExceeded {
                executed: self.executed,
                limit,
            });
        }
        Ok(())
    }

    /// Calls `name` and returns its value plus the final values of its out
    /// parameters, in parameter order.
    fn call(
        &mut self,
        name: &str,
        arguments: Vec<LiteralValue>,
    ) -> Result<(Option<LiteralValue>, Vec<LiteralValue>)> {
        if let Ok(intrinsic) = Intrinsic::from_str(name) {
            return Ok((intrinsic.invoke(&arguments, self.host)?, Vec::new()));
        }

        let function = self.resolve(name)?;
        let symbol = function.symbol.clone();
        if arguments.len() != symbol.parameters.len() {
            return Err(fault(
                name,
                format!(
                    "expected {} arguments, got {}",
                    symbol.parameters.len(),
                    arguments.len()
                ),
            ));
        }

        self.depth += 1;
        if self.depth > self.limits.max_call_depth {
            return Err(Error::CallDepthExceeded {
                depth: self.depth,
                limit: self.limits.max_call_depth,
            });
        }

        let mut frame: Frame = symbol.parameter_symbols().into_iter().zip(arguments).collect();
        let value = self.run(&function, &mut frame)?;
        self.depth -= 1;

        let outs = symbol
            .parameter_symbols()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| symbol.is_out(*i))
            .map(|(_, param)| {
                frame
                    .remove(&param)
                    .or_else(|| LiteralValue::default_for(param.ty()))
                    .ok_or_else(|| fault(name, format!("out parameter {} never set", param.name())))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((value, outs))
    }

    fn run(&mut self, function: &CompiledFunction, frame: &mut Frame) -> Result<Option<LiteralValue>> {
        let mut pc = 0;
        while pc < function.code.len() {
            self.tick()?;
            match self.step(function, pc, frame)? {
                Step::Next => pc += 1,
                Step::Jump(target) => pc = target,
                Step::Return(value) => return Ok(value),
            }
        }
        Ok(None)
    }

    fn step(&mut self, function: &CompiledFunction, pc: usize, frame: &mut Frame) -> Result<Step> {
        let name = function.symbol.name.as_str();
        let step = match &function.code[pc] {
            Tac::Nop | Tac::FallThrough | Tac::FunctionMark(_) | Tac::Data(_) | Tac::Label(_) => {
                Step::Next
            }
            Tac::BuildMark {
                op: MarkOp::End, ..
            } => Step::Next,
            Tac::BuildMark {
                name: region,
                op: MarkOp::Start,
            } => {
                self.call(region, Vec::new())?;
                let end = function
                    .region_ends
                    .get(region)
                    .ok_or_else(|| fault(name, format!("region {region} has no end mark")))?;
                Step::Jump(*end + 1)
            }
            Tac::Assign {
                result,
                operand,
                declare,
            } => {
                let skip = *declare
                    && result.is_static()
                    && self.host.context.has_static(&static_key(name, result));
                if !skip {
                    let value = self.read(name, operand, frame)?;
                    self.write(name, result, value, frame)?;
                }
                Step::Next
            }
            Tac::Unary {
                op,
                result,
                operand,
            } => {
                let value = self.read(name, operand, frame)?;
                let value = eval::unary(*op, &value).map_err(|e| fault(name, e.to_string()))?;
                self.write(name, result, value, frame)?;
                Step::Next
            }
            Tac::Binary {
                op,
                result,
                lhs,
                rhs,
            } => {
                let a = self.read(name, lhs, frame)?;
                let b = self.read(name, rhs, frame)?;
                let value = eval::binary(*op, &a, &b).map_err(|e| fault(name, e.to_string()))?;
                self.write(name, result, value, frame)?;
                Step::Next
            }
            Tac::Call {
                result,
                function: callee,
                arguments,
                ..
            } => {
                let values = self.read_all(name, arguments, frame)?;
                let (value, outs) = self.call(&callee.name, values)?;
                let out_targets: Vec<&DataSymbol> = arguments
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| callee.is_out(*i))
                    .map(|(_, arg)| arg)
                    .collect();
                self.store_results(name, &callee.name, result.as_ref(), value, &out_targets, outs, frame)?;
                Step::Next
            }
            Tac::MultiCall {
                result,
                side_effects,
                function: callee,
                arguments,
            } => {
                let values = self.read_all(name, arguments, frame)?;
                let (value, outs) = self.call(&callee.name, values)?;
                let out_targets: Vec<&DataSymbol> = side_effects.iter().collect();
                self.store_results(name, &callee.name, result.as_ref(), value, &out_targets, outs, frame)?;
                Step::Next
            }
            Tac::Goto(label) => Step::Jump(self.label(function, &label.name)?),
            Tac::Conditional {
                location,
                condition,
            } => {
                let value = self.read(name, condition, frame)?;
                let holds = eval::is_truthy(&value).map_err(|e| fault(name, e.to_string()))?;
                if holds {
                    Step::Next
                } else {
                    Step::Jump(self.label(function, &location.name)?)
                }
            }
            Tac::Return(value) => Step::Return(Some(self.read(name, value, frame)?)),
            Tac::ReturnVoid => Step::Return(None),
            Tac::MultiReturn(_) => {
                return Err(fault(name, "multi-value return cannot be executed"));
            }
        };
        Ok(step)
    }

    fn label(&self, function: &CompiledFunction, label: &str) -> Result<usize> {
        function
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| fault(&function.symbol.name, format!("unknown label {label}")))
    }

    fn read_all(&mut self, function: &str, operands: &[DataSymbol], frame: &Frame) -> Result<Vec<LiteralValue>> {
        operands
            .iter()
            .map(|operand| self.read(function, operand, frame))
            .collect()
    }

    fn store_results(
        &mut self,
        function: &str,
        callee: &str,
        result: Option<&DataSymbol>,
        value: Option<LiteralValue>,
        out_targets: &[&DataSymbol],
        outs: Vec<LiteralValue>,
        frame: &mut Frame,
    ) -> Result<()> {
        if let Some(result) = result {
            let value =
                value.ok_or_else(|| fault(function, format!("{callee} returned no value")))?;
            self.write(function, result, value, frame)?;
        }
        if out_targets.len() != outs.len() {
            return Err(fault(
                function,
                format!("{callee} produced {} out values for {} targets", outs.len(), out_targets.len()),
            ));
        }
        for (target, value) in out_targets.iter().zip(outs) {
            self.write(function, target, value, frame)?;
        }
        Ok(())
    }

    fn read(&self, function: &str, operand: &DataSymbol, frame: &Frame) -> Result<LiteralValue> {
        match operand {
            DataSymbol::Literal(literal) => Ok(literal.value.clone()),
            DataSymbol::Field(field) => {
                let instance = self.read(function, &field.instance, frame)?;
                match instance {
                    LiteralValue::Array(items) if field.field == "Length" => {
                        let len = i32::try_from(items.len())
                            .map_err(|_| fault(function, "array too long"))?;
                        Ok(LiteralValue::I32(len))
                    }
                    LiteralValue::Struct(mut items) => {
                        let index = field_slot(function, field.instance.ty(), &field.field, items.len())?;
                        Ok(items.swap_remove(index))
                    }
                    other => Err(fault(
                        function,
                        format!("{other} has no field {}", field.field),
                    )),
                }
            }
            DataSymbol::Element(element) => {
                let array = self.read(function, &element.array, frame)?;
                let index = self.read(function, &element.index, frame)?;
                let LiteralValue::Array(mut items) = array else {
                    return Err(fault(function, format!("{} is not an array", element.array.name())));
                };
                let slot = element_slot(function, &index, items.len())?;
                Ok(items.swap_remove(slot))
            }
            variable if variable.is_static() => {
                let key = static_key(function, variable);
                match self.host.context.static_value(&key) {
                    Some(value) => Ok(value.clone()),
                    None => default_value(function, variable),
                }
            }
            variable => match frame.get(variable) {
                Some(value) => Ok(value.clone()),
                None => default_value(function, variable),
            },
        }
    }

    fn write(
        &mut self,
        function: &str,
        target: &DataSymbol,
        value: LiteralValue,
        frame: &mut Frame,
    ) -> Result<()> {
        match target {
            DataSymbol::Literal(literal) => Err(fault(
                function,
                format!("cannot assign to literal {literal}"),
            )),
            DataSymbol::Field(field) => {
                let mut instance = self.read(function, &field.instance, frame)?;
                let LiteralValue::Struct(items) = &mut instance else {
                    return Err(fault(
                        function,
                        format!("cannot set field {} of {instance}", field.field),
                    ));
                };
                let index = field_slot(function, field.instance.ty(), &field.field, items.len())?;
                items[index] = value;
                self.write(function, &field.instance, instance, frame)
            }
            DataSymbol::Element(element) => {
                let mut array = self.read(function, &element.array, frame)?;
                let index = self.read(function, &element.index, frame)?;
                let LiteralValue::Array(items) = &mut array else {
                    return Err(fault(function, format!("{} is not an array", element.array.name())));
                };
                let slot = element_slot(function, &index, items.len())?;
                items[slot] = value;
                self.write(function, &element.array, array, frame)
            }
            variable if variable.is_static() => {
                self.host
                    .context
                    .set_static(static_key(function, variable), value);
                Ok(())
            }
            variable => {
                frame.insert(variable.clone(), value);
                Ok(())
            }
        }
    }
}

fn static_key(function: &str, variable: &DataSymbol) -> String {
    format!("{function}_{}", variable.name())
}

/// Value of a variable that was never written.
fn default_value(function: &str, variable: &DataSymbol) -> Result<LiteralValue> {
    let ty = variable.ty();
    if let (TypeSymbol::Array(element), dimension) = (ty, variable.dimension()) {
        if dimension > 1 {
            let item = LiteralValue::default_for(element)
                .ok_or_else(|| fault(function, format!("{} has no default value", variable.name())))?;
            return Ok(LiteralValue::Array(vec![item; dimension]));
        }
    }
    LiteralValue::default_for(ty)
        .ok_or_else(|| fault(function, format!("read of unset variable {}", variable.name())))
}

fn field_slot(function: &str, ty: &TypeSymbol, field: &str, len: usize) -> Result<usize> {
    ty.field_index(field)
        .filter(|index| *index < len)
        .ok_or_else(|| fault(function, format!("{ty} has no field {field}")))
}

fn element_slot(function: &str, index: &LiteralValue, len: usize) -> Result<usize> {
    index
        .as_integer()
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| *i < len)
        .ok_or_else(|| fault(function, format!("index {index} out of range for length {len}")))
}
