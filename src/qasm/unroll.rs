// src/qasm/unroll.rs

//! Executes the classical part of a parsed program (constants, loops,
//! conditionals, subroutine calls, includes) and records the quantum
//! operations it reaches as a flat list.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use tracing::{debug, trace};

use super::ast::{BinaryOp, Expr, Operand, ParamType, Stmt, StmtKind, Subroutine, UnaryOp};
use super::error::{QasmError, Span};
use super::module::Register;
use super::parse::parse_source;
use crate::circuits::Circuit;
use crate::operations::{Gate, Operation};

/// The one include that never touches the filesystem.
pub(crate) const STDGATES: &str = "stdgates.inc";

/// Deepest allowed nesting of subroutine calls.
const MAX_CALL_DEPTH: usize = 64;

/// Most iterations a single `for` loop may run.
const MAX_LOOP_ITERATIONS: usize = 1 << 20;

/// Widest register that may be declared.
const MAX_REGISTER_SIZE: usize = 1 << 16;

/// Largest shift amount accepted in `<<` and `>>`.
const MAX_SHIFT: usize = 1 << 16;

/// Everything the unroller learned about a program.
#[derive(Debug)]
pub(crate) struct Unrolled {
    pub circuit: Circuit,
    pub qubit_registers: Vec<Register>,
    pub clbit_registers: Vec<Register>,
    pub includes: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
enum Symbol {
    /// A qubit register, a single qubit, or a subroutine parameter aliasing either.
    Qubits { indices: Vec<usize>, single: bool },
    Clbits { indices: Vec<usize>, single: bool },
    Int { value: BigInt, constant: bool },
}

impl Symbol {
    fn kind(&self) -> &'static str {
        match self {
            Symbol::Qubits { .. } => "a qubit",
            Symbol::Clbits { .. } => "a classical bit",
            Symbol::Int { .. } => "an integer",
        }
    }
}

/// Resolved register operand: the flat indices it names, and whether it was
/// a single bit (which broadcasts against registers).
struct Bits {
    indices: Vec<usize>,
    single: bool,
}

pub(crate) struct Unroller<'a> {
    include_paths: &'a [PathBuf],
    operations: Vec<Operation>,
    qubit_registers: Vec<Register>,
    clbit_registers: Vec<Register>,
    num_qubits: usize,
    num_clbits: usize,
    /// Lexical scopes, innermost last. Index 0 is the global scope.
    frames: Vec<HashMap<String, Symbol>>,
    /// First frame belonging to the subroutine call being executed. Frames
    /// below it are hidden, except for global constants.
    call_base: usize,
    call_depth: usize,
    subroutines: HashMap<String, Rc<Subroutine>>,
    stdgates: bool,
    /// Files currently being executed, outermost first.
    include_stack: Vec<PathBuf>,
    included: HashSet<PathBuf>,
    includes: Vec<PathBuf>,
}

impl<'a> Unroller<'a> {
    pub(crate) fn new(include_paths: &'a [PathBuf]) -> Self {
        Self {
            include_paths,
            operations: Vec::new(),
            qubit_registers: Vec::new(),
            clbit_registers: Vec::new(),
            num_qubits: 0,
            num_clbits: 0,
            frames: vec![HashMap::new()],
            call_base: 0,
            call_depth: 0,
            subroutines: HashMap::new(),
            stdgates: false,
            include_stack: Vec::new(),
            included: HashSet::new(),
            includes: Vec::new(),
        }
    }

    /// Runs a top-level program. `origin` is the file it was read from, if
    /// any; relative includes are looked up beside it first.
    pub(crate) fn run(mut self, statements: &[Stmt], origin: Option<&Path>) -> Result<Unrolled, QasmError> {
        if let Some(origin) = origin {
            let canonical = canonical(origin);
            self.included.insert(canonical.clone());
            self.include_stack.push(canonical);
        }
        self.exec_block(statements)?;

        let mut circuit = Circuit::with_width(self.num_qubits, self.num_clbits);
        circuit.add_operations(self.operations);
        debug!(
            qubits = circuit.num_qubits(),
            clbits = circuit.num_clbits(),
            operations = circuit.len(),
            "unrolled program"
        );
        Ok(Unrolled {
            circuit,
            qubit_registers: self.qubit_registers,
            clbit_registers: self.clbit_registers,
            includes: self.includes,
        })
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> Result<(), QasmError> {
        for stmt in statements {
            self.exec(stmt)?;
        }
        Ok(())
    }

    /// Runs `statements` in a fresh nested scope.
    fn exec_scoped(&mut self, statements: &[Stmt], bindings: Vec<(String, Symbol)>) -> Result<(), QasmError> {
        self.frames.push(bindings.into_iter().collect());
        let outcome = self.exec_block(statements);
        self.frames.pop();
        outcome
    }

    fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), QasmError> {
        let span = &stmt.span;
        match &stmt.kind {
            StmtKind::Include { path } => self.include(path, span),
            StmtKind::QubitDecl { name, size } => {
                self.require_global(span, "qubit declarations")?;
                let (size, single) = self.declared_size(size.as_ref())?;
                let start = self.num_qubits;
                self.num_qubits += size;
                self.declare(name, span, Symbol::Qubits { indices: (start..start + size).collect(), single })?;
                self.qubit_registers.push(Register::new(name, start, size, single));
                Ok(())
            }
            StmtKind::BitDecl { name, size } => {
                self.require_global(span, "bit declarations")?;
                let (size, single) = self.declared_size(size.as_ref())?;
                let start = self.num_clbits;
                self.num_clbits += size;
                self.declare(name, span, Symbol::Clbits { indices: (start..start + size).collect(), single })?;
                self.clbit_registers.push(Register::new(name, start, size, single));
                Ok(())
            }
            StmtKind::IntDecl { name, value, constant } => {
                let value = self.eval(value)?;
                self.declare(name, span, Symbol::Int { value, constant: *constant })
            }
            StmtKind::Def(subroutine) => {
                self.require_global(span, "subroutine definitions")?;
                if self.subroutines.contains_key(&subroutine.name) || Gate::from_name(&subroutine.name).is_some() {
                    return Err(QasmError::semantic(
                        span,
                        format!("'{}' is already defined", subroutine.name),
                    ));
                }
                trace!(subroutine = %subroutine.name, "defined subroutine");
                self.subroutines.insert(subroutine.name.clone(), subroutine.clone());
                Ok(())
            }
            StmtKind::Call { name, args } => self.call(name, args, span),
            StmtKind::Gate { name, operands } => self.apply_gate(name, operands, span),
            StmtKind::Measure { source, target } => self.measure(source, target.as_ref()),
            StmtKind::Reset { target } => {
                let qubits = self.resolve_qubits(target)?;
                self.operations
                    .extend(qubits.indices.into_iter().map(|qubit| Operation::Reset { qubit }));
                Ok(())
            }
            StmtKind::Barrier { operands } => {
                let qubits = if operands.is_empty() {
                    (0..self.num_qubits).collect()
                } else {
                    let mut qubits = Vec::new();
                    for operand in operands {
                        qubits.extend(self.resolve_qubits(operand)?.indices);
                    }
                    qubits
                };
                self.operations.push(Operation::Barrier { qubits });
                Ok(())
            }
            StmtKind::For { var, start, step, end, body } => {
                let start = self.eval(start)?;
                let step = match step {
                    Some(step) => {
                        let value = self.eval(step)?;
                        if value.is_zero() {
                            return Err(QasmError::semantic(step.span(), "loop step cannot be zero"));
                        }
                        value
                    }
                    None => BigInt::one(),
                };
                let end = self.eval(end)?;
                let mut current = start;
                let mut iterations = 0usize;
                while (step.is_positive() && current <= end) || (step.is_negative() && current >= end) {
                    iterations += 1;
                    if iterations > MAX_LOOP_ITERATIONS {
                        return Err(QasmError::semantic(
                            span,
                            format!("loop exceeds {} iterations", MAX_LOOP_ITERATIONS),
                        ));
                    }
                    let binding = Symbol::Int { value: current.clone(), constant: false };
                    self.exec_scoped(body, vec![(var.clone(), binding)])?;
                    current += &step;
                }
                Ok(())
            }
            StmtKind::If { condition, then_body, else_body } => {
                if self.eval(condition)?.is_zero() {
                    self.exec_scoped(else_body, Vec::new())
                } else {
                    self.exec_scoped(then_body, Vec::new())
                }
            }
        }
    }

    fn require_global(&self, span: &Span, what: &str) -> Result<(), QasmError> {
        if self.is_global_scope() {
            Ok(())
        } else {
            Err(QasmError::semantic(span, format!("{} are only allowed in the global scope", what)))
        }
    }

    fn declare(&mut self, name: &str, span: &Span, symbol: Symbol) -> Result<(), QasmError> {
        let frame = self.frames.last_mut().ok_or_else(|| QasmError::semantic(span, "no open scope"))?;
        if frame.contains_key(name) {
            return Err(QasmError::semantic(span, format!("'{}' is already defined", name)));
        }
        frame.insert(name.to_string(), symbol);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        for frame in self.frames[self.call_base..].iter().rev() {
            if let Some(symbol) = frame.get(name) {
                return Some(symbol);
            }
        }
        match self.frames[0].get(name) {
            Some(symbol @ Symbol::Int { constant: true, .. }) => Some(symbol),
            _ => None,
        }
    }

    fn lookup_or_err(&self, name: &str, span: &Span) -> Result<&Symbol, QasmError> {
        self.lookup(name)
            .ok_or_else(|| QasmError::semantic(span, format!("'{}' is not defined in this scope", name)))
    }

    /// Size of a register declaration: `(N, false)` for `[N]`, `(1, true)` without one.
    fn declared_size(&self, size: Option<&Expr>) -> Result<(usize, bool), QasmError> {
        match size {
            None => Ok((1, true)),
            Some(expr) => Ok((self.eval_size(expr)?, false)),
        }
    }

    fn eval_size(&self, expr: &Expr) -> Result<usize, QasmError> {
        let value = self.eval(expr)?;
        match value.to_usize() {
            Some(size) if size > 0 && size <= MAX_REGISTER_SIZE => Ok(size),
            _ => Err(QasmError::semantic(
                expr.span(),
                format!("register size must be between 1 and {}, not {}", MAX_REGISTER_SIZE, value),
            )),
        }
    }

    fn include(&mut self, path: &str, span: &Span) -> Result<(), QasmError> {
        self.require_global(span, "includes")?;
        if path == STDGATES {
            self.stdgates = true;
            return Ok(());
        }
        let found = self
            .find_include_path(Path::new(path))
            .ok_or_else(|| {
                QasmError::semantic(span, format!("unable to find '{}' in the include search path", path))
            })?;
        let canonical = canonical(&found);
        if self.include_stack.contains(&canonical) {
            return Err(QasmError::semantic(
                span,
                format!("include cycle: '{}' includes itself", found.display()),
            ));
        }
        if !self.included.insert(canonical.clone()) {
            debug!(path = %found.display(), "skipping repeated include");
            return Ok(());
        }
        let source = fs::read_to_string(&found).map_err(|source| QasmError::Io {
            path: found.clone(),
            source,
        })?;
        let statements = parse_source(&source, Arc::from(found.display().to_string()))?;
        debug!(path = %found.display(), statements = statements.len(), "including file");
        self.includes.push(found);
        self.include_stack.push(canonical);
        let outcome = self.exec_block(&statements);
        self.include_stack.pop();
        outcome
    }

    /// The directory of the including file is searched first, then the
    /// configured include path in order.
    fn find_include_path(&self, filename: &Path) -> Option<PathBuf> {
        if filename.is_absolute() {
            return filename.is_file().then(|| filename.to_path_buf());
        }
        let current_dir = self
            .include_stack
            .last()
            .and_then(|file| file.parent())
            .map(Path::to_path_buf);
        current_dir
            .iter()
            .chain(self.include_paths.iter())
            .map(|directory| directory.join(filename))
            .find(|candidate| candidate.is_file())
    }

    fn call(&mut self, name: &str, args: &[Expr], span: &Span) -> Result<(), QasmError> {
        let subroutine = match self.subroutines.get(name) {
            Some(subroutine) => subroutine.clone(),
            None if Gate::from_name(name).is_some() => {
                return Err(QasmError::semantic(
                    span,
                    format!("'{}' is a gate; parameterised gates are not supported", name),
                ));
            }
            None => {
                return Err(QasmError::semantic(span, format!("'{}' is not a defined subroutine", name)));
            }
        };
        if args.len() != subroutine.params.len() {
            return Err(QasmError::semantic(
                span,
                format!(
                    "'{}' takes {} argument(s), but {} were given",
                    name,
                    subroutine.params.len(),
                    args.len()
                ),
            ));
        }
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(QasmError::semantic(
                span,
                format!("subroutine calls nested deeper than {}", MAX_CALL_DEPTH),
            ));
        }

        let mut bindings = Vec::with_capacity(args.len());
        for (param, arg) in subroutine.params.iter().zip(args) {
            let symbol = match &param.ty {
                ParamType::Int => Symbol::Int { value: self.eval(arg)?, constant: false },
                ParamType::Qubit { size } => {
                    let bits = self.resolve_qubit_arg(arg)?;
                    match size {
                        None if bits.indices.len() != 1 => {
                            return Err(QasmError::semantic(
                                arg.span(),
                                format!("parameter '{}' takes a single qubit", param.name),
                            ));
                        }
                        Some(size) => {
                            let expected = self.eval_size(size)?;
                            if bits.indices.len() != expected {
                                return Err(QasmError::semantic(
                                    arg.span(),
                                    format!(
                                        "parameter '{}' takes {} qubit(s), but {} were given",
                                        param.name,
                                        expected,
                                        bits.indices.len()
                                    ),
                                ));
                            }
                        }
                        None => {}
                    }
                    Symbol::Qubits { indices: bits.indices, single: size.is_none() }
                }
            };
            if bindings.iter().any(|(existing, _)| existing == &param.name) {
                return Err(QasmError::semantic(
                    &param.span,
                    format!("parameter '{}' is declared twice", param.name),
                ));
            }
            bindings.push((param.name.clone(), symbol));
        }

        trace!(subroutine = name, depth = self.call_depth + 1, "calling subroutine");
        let saved_base = self.call_base;
        self.call_base = self.frames.len();
        self.call_depth += 1;
        let outcome = self.exec_scoped(&subroutine.body, bindings);
        self.call_depth -= 1;
        self.call_base = saved_base;
        outcome
    }

    /// A subroutine argument bound to a `qubit` parameter: `q` or `q[i]`.
    fn resolve_qubit_arg(&self, arg: &Expr) -> Result<Bits, QasmError> {
        let operand = match arg {
            Expr::Ident { name, span } => Operand { name: name.clone(), index: None, span: span.clone() },
            Expr::Index { name, index, span } => Operand {
                name: name.clone(),
                index: Some(index.as_ref().clone()),
                span: span.clone(),
            },
            other => return Err(QasmError::semantic(other.span(), "expected a qubit argument")),
        };
        self.resolve_qubits(&operand)
    }

    fn apply_gate(&mut self, name: &str, operands: &[Operand], span: &Span) -> Result<(), QasmError> {
        let gate = match Gate::from_name(name) {
            Some(gate) if self.stdgates => gate,
            Some(_) => {
                return Err(QasmError::semantic(
                    span,
                    format!("'{}' is not defined; did you forget to include \"{}\"?", name, STDGATES),
                ));
            }
            None if self.subroutines.contains_key(name) => {
                return Err(QasmError::semantic(
                    span,
                    format!("'{}' is a subroutine and must be called with parentheses", name),
                ));
            }
            None => return Err(QasmError::semantic(span, format!("'{}' is not a defined gate", name))),
        };
        if operands.len() != gate.num_qubits() {
            return Err(QasmError::semantic(
                span,
                format!(
                    "'{}' takes {} qubit(s), but {} were given",
                    name,
                    gate.num_qubits(),
                    operands.len()
                ),
            ));
        }
        let resolved = operands
            .iter()
            .map(|operand| self.resolve_qubits(operand))
            .collect::<Result<Vec<_>, _>>()?;

        let width = broadcast_width(&resolved, span)?;
        for i in 0..width {
            let qubits: Vec<usize> = resolved
                .iter()
                .map(|bits| if bits.single { bits.indices[0] } else { bits.indices[i] })
                .collect();
            for (a, qubit) in qubits.iter().enumerate() {
                if qubits[..a].contains(qubit) {
                    return Err(QasmError::semantic(
                        span,
                        format!("'{}' applied to the same qubit more than once", name),
                    ));
                }
            }
            self.operations.push(Operation::Gate { gate, qubits });
        }
        Ok(())
    }

    fn measure(&mut self, source: &Operand, target: Option<&Operand>) -> Result<(), QasmError> {
        let qubits = self.resolve_qubits(source)?;
        let Some(target) = target else {
            self.operations.extend(
                qubits
                    .indices
                    .into_iter()
                    .map(|qubit| Operation::Measure { qubit, clbit: None }),
            );
            return Ok(());
        };
        let clbits = self.resolve_clbits(target)?;
        if qubits.indices.len() != clbits.indices.len() {
            return Err(QasmError::semantic(
                &target.span,
                format!(
                    "cannot measure {} qubit(s) into {} bit(s)",
                    qubits.indices.len(),
                    clbits.indices.len()
                ),
            ));
        }
        self.operations.extend(
            qubits
                .indices
                .into_iter()
                .zip(clbits.indices)
                .map(|(qubit, clbit)| Operation::Measure { qubit, clbit: Some(clbit) }),
        );
        Ok(())
    }

    fn resolve_qubits(&self, operand: &Operand) -> Result<Bits, QasmError> {
        match self.lookup_or_err(&operand.name, &operand.span)? {
            Symbol::Qubits { indices, single } => self.select(operand, indices, *single),
            other => Err(QasmError::semantic(
                &operand.span,
                format!("'{}' is {}, not a qubit", operand.name, other.kind()),
            )),
        }
    }

    fn resolve_clbits(&self, operand: &Operand) -> Result<Bits, QasmError> {
        match self.lookup_or_err(&operand.name, &operand.span)? {
            Symbol::Clbits { indices, single } => self.select(operand, indices, *single),
            other => Err(QasmError::semantic(
                &operand.span,
                format!("'{}' is {}, not a classical bit", operand.name, other.kind()),
            )),
        }
    }

    fn select(&self, operand: &Operand, indices: &[usize], single: bool) -> Result<Bits, QasmError> {
        let Some(index) = &operand.index else {
            return Ok(Bits { indices: indices.to_vec(), single });
        };
        if single {
            return Err(QasmError::semantic(
                &operand.span,
                format!("'{}' is a single bit and cannot be indexed", operand.name),
            ));
        }
        let value = self.eval(index)?;
        match value.to_usize().and_then(|i| indices.get(i)) {
            Some(bit) => Ok(Bits { indices: vec![*bit], single: true }),
            None => Err(QasmError::semantic(
                index.span(),
                format!(
                    "index {} is out of range for '{}' of size {}",
                    value,
                    operand.name,
                    indices.len()
                ),
            )),
        }
    }

    /// Evaluates a classical integer expression.
    fn eval(&self, expr: &Expr) -> Result<BigInt, QasmError> {
        match expr {
            Expr::Int { value, .. } => Ok(value.clone()),
            Expr::Ident { name, span } => match self.lookup_or_err(name, span)? {
                Symbol::Int { value, .. } => Ok(value.clone()),
                other => Err(QasmError::semantic(
                    span,
                    format!("'{}' is {}, not an integer", name, other.kind()),
                )),
            },
            Expr::Index { name, span, .. } => Err(QasmError::semantic(
                span,
                format!("indexed '{}' cannot be used as an integer", name),
            )),
            Expr::Unary { op, operand, .. } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => -value,
                    UnaryOp::BitNot => !value,
                    UnaryOp::LogicalNot => truth(value.is_zero()),
                })
            }
            Expr::Binary { op, lhs, rhs, span } => {
                let lhs = self.eval(lhs)?;
                match op {
                    BinaryOp::LogicalAnd if lhs.is_zero() => return Ok(BigInt::zero()),
                    BinaryOp::LogicalOr if !lhs.is_zero() => return Ok(BigInt::one()),
                    _ => {}
                }
                let rhs_span = rhs.span();
                let rhs = self.eval(rhs)?;
                Ok(match op {
                    BinaryOp::LogicalAnd | BinaryOp::LogicalOr => truth(!rhs.is_zero()),
                    BinaryOp::BitOr => lhs | rhs,
                    BinaryOp::BitXor => lhs ^ rhs,
                    BinaryOp::BitAnd => lhs & rhs,
                    BinaryOp::Eq => truth(lhs == rhs),
                    BinaryOp::Ne => truth(lhs != rhs),
                    BinaryOp::Lt => truth(lhs < rhs),
                    BinaryOp::Le => truth(lhs <= rhs),
                    BinaryOp::Gt => truth(lhs > rhs),
                    BinaryOp::Ge => truth(lhs >= rhs),
                    BinaryOp::Shl => lhs << shift_amount(&rhs, rhs_span)?,
                    BinaryOp::Shr => lhs >> shift_amount(&rhs, rhs_span)?,
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div | BinaryOp::Mod if rhs.is_zero() => {
                        return Err(QasmError::semantic(
                            span,
                            format!("'{}' by zero", op.text()),
                        ));
                    }
                    BinaryOp::Div => lhs / rhs,
                    BinaryOp::Mod => lhs % rhs,
                })
            }
        }
    }
}

fn truth(condition: bool) -> BigInt {
    if condition { BigInt::one() } else { BigInt::zero() }
}

fn shift_amount(value: &BigInt, span: &Span) -> Result<usize, QasmError> {
    match value.to_usize() {
        Some(amount) if amount <= MAX_SHIFT => Ok(amount),
        _ => Err(QasmError::semantic(
            span,
            format!("shift amount must be between 0 and {}, not {}", MAX_SHIFT, value),
        )),
    }
}

/// Number of gate applications a broadcast produces. Every register operand
/// must have the same length; single qubits repeat.
fn broadcast_width(operands: &[Bits], span: &Span) -> Result<usize, QasmError> {
    let mut width: Option<usize> = None;
    for bits in operands.iter().filter(|bits| !bits.single) {
        match width {
            None => width = Some(bits.indices.len()),
            Some(w) if w != bits.indices.len() => {
                return Err(QasmError::semantic(
                    span,
                    format!("cannot broadcast registers of sizes {} and {}", w, bits.indices.len()),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(width.unwrap_or(1))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
