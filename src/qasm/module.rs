// src/qasm/module.rs

use std::fmt;
use std::fmt::Write as _;
use std::ops::Range;
use std::path::PathBuf;

use super::unroll::{Unrolled, STDGATES};
use super::error::QasmError;
use crate::circuits::Circuit;
use crate::operations::Operation;
use crate::simulation::{SimulationResult, Simulator};

/// A named, contiguous block of qubits or classical bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    name: String,
    start: usize,
    size: usize,
    /// Declared without a size (`qubit a;`), so it is written without an index.
    single: bool,
}

impl Register {
    pub(crate) fn new(name: &str, start: usize, size: usize, single: bool) -> Self {
        Self {
            name: name.to_string(),
            start,
            size,
            single,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bits in the register.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat circuit indices covered by the register.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    /// True for a bare `qubit a;` or `bit c;` declaration.
    pub fn is_single(&self) -> bool {
        self.single
    }

    fn declaration(&self, keyword: &str) -> String {
        if self.single {
            format!("{} {};", keyword, self.name)
        } else {
            format!("{}[{}] {};", keyword, self.size, self.name)
        }
    }

    fn label(&self, index: usize) -> Option<String> {
        if !self.indices().contains(&index) {
            return None;
        }
        Some(if self.single {
            self.name.clone()
        } else {
            format!("{}[{}]", self.name, index - self.start)
        })
    }
}

/// A loaded OpenQASM program: its flattened circuit plus the register layout
/// needed to talk about it in source terms.
#[derive(Debug, Clone)]
pub struct QasmModule {
    name: String,
    circuit: Circuit,
    qubit_registers: Vec<Register>,
    clbit_registers: Vec<Register>,
    includes: Vec<PathBuf>,
}

impl QasmModule {
    pub(crate) fn from_unrolled(name: String, unrolled: Unrolled) -> Self {
        Self {
            name,
            circuit: unrolled.circuit,
            qubit_registers: unrolled.qubit_registers,
            clbit_registers: unrolled.clbit_registers,
            includes: unrolled.includes,
        }
    }

    /// Program name: the source file's stem, or `<input>` for in-memory text.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn qubit_registers(&self) -> &[Register] {
        &self.qubit_registers
    }

    pub fn clbit_registers(&self) -> &[Register] {
        &self.clbit_registers
    }

    /// Files inlined while loading, in the order they were first reached.
    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    pub fn num_qubits(&self) -> usize {
        self.circuit.num_qubits()
    }

    pub fn num_clbits(&self) -> usize {
        self.circuit.num_clbits()
    }

    pub fn depth(&self) -> usize {
        self.circuit.depth()
    }

    /// Samples the module's circuit with a default simulator.
    pub fn simulate(&self, shots: usize) -> Result<SimulationResult, QasmError> {
        self.simulate_with(&Simulator::new(), shots)
    }

    pub fn simulate_with(&self, simulator: &Simulator, shots: usize) -> Result<SimulationResult, QasmError> {
        simulator.run(&self.circuit, shots)
    }

    /// The program as straight-line OpenQASM 3: declarations followed by one
    /// statement per operation, with every loop, conditional, call and
    /// include expanded.
    pub fn unrolled_qasm(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "OPENQASM 3.0;");
        let _ = writeln!(out, "include \"{}\";", STDGATES);
        for register in &self.qubit_registers {
            let _ = writeln!(out, "{}", register.declaration("qubit"));
        }
        for register in &self.clbit_registers {
            let _ = writeln!(out, "{}", register.declaration("bit"));
        }
        for op in self.circuit.operations() {
            let line = match op {
                Operation::Gate { gate, qubits } => {
                    let operands: Vec<String> = qubits.iter().map(|q| self.qubit_label(*q)).collect();
                    format!("{} {};", gate.name(), operands.join(", "))
                }
                Operation::Measure { qubit, clbit: Some(clbit) } => {
                    format!("{} = measure {};", self.clbit_label(*clbit), self.qubit_label(*qubit))
                }
                Operation::Measure { qubit, clbit: None } => format!("measure {};", self.qubit_label(*qubit)),
                Operation::Reset { qubit } => format!("reset {};", self.qubit_label(*qubit)),
                Operation::Barrier { qubits } if qubits.is_empty() => "barrier;".to_string(),
                Operation::Barrier { qubits } => {
                    let operands: Vec<String> = qubits.iter().map(|q| self.qubit_label(*q)).collect();
                    format!("barrier {};", operands.join(", "))
                }
            };
            let _ = writeln!(out, "{}", line);
        }
        out
    }

    fn qubit_label(&self, index: usize) -> String {
        self.qubit_registers
            .iter()
            .find_map(|r| r.label(index))
            .unwrap_or_else(|| format!("${}", index))
    }

    fn clbit_label(&self, index: usize) -> String {
        self.clbit_registers
            .iter()
            .find_map(|r| r.label(index))
            .unwrap_or_else(|| format!("${}", index))
    }
}

impl fmt::Display for QasmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "QasmModule '{}' ({} qubits, {} clbits, depth {})",
            self.name,
            self.num_qubits(),
            self.num_clbits(),
            self.depth()
        )?;
        write!(f, "{}", self.circuit)
    }
}
