// src/operations/mod.rs

//! Gate-level operations produced by unrolling an OpenQASM 3 program.
//!
//! Qubits and classical bits are addressed by flat indices. The loader maps
//! register names (`q[2]`, `ancilla`) onto these indices in declaration order.

use std::fmt;

/// The standard gates understood by the loader and simulator.
///
/// These are the members of `stdgates.inc` the bundled templates (and small
/// hand-written programs) rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Identity
    I,
    /// Pauli X (bit flip)
    X,
    /// Pauli Y
    Y,
    /// Pauli Z (phase flip)
    Z,
    /// Hadamard
    H,
    /// Phase gate `sqrt(Z)`
    S,
    /// Inverse phase gate
    Sdg,
    /// `sqrt(S)`
    T,
    /// Inverse of `T`
    Tdg,
    /// Controlled X, `[control, target]`
    CX,
    /// Controlled Y, `[control, target]`
    CY,
    /// Controlled Z, `[control, target]`
    CZ,
    /// Swap two qubits
    Swap,
    /// Toffoli, `[control, control, target]`
    CCX,
}

impl Gate {
    /// Looks up a gate by its `stdgates.inc` name.
    pub fn from_name(name: &str) -> Option<Gate> {
        Some(match name {
            "id" => Gate::I,
            "x" => Gate::X,
            "y" => Gate::Y,
            "z" => Gate::Z,
            "h" => Gate::H,
            "s" => Gate::S,
            "sdg" => Gate::Sdg,
            "t" => Gate::T,
            "tdg" => Gate::Tdg,
            "cx" | "CX" => Gate::CX,
            "cy" => Gate::CY,
            "cz" => Gate::CZ,
            "swap" => Gate::Swap,
            "ccx" => Gate::CCX,
            _ => return None,
        })
    }

    /// The `stdgates.inc` name.
    pub fn name(&self) -> &'static str {
        match self {
            Gate::I => "id",
            Gate::X => "x",
            Gate::Y => "y",
            Gate::Z => "z",
            Gate::H => "h",
            Gate::S => "s",
            Gate::Sdg => "sdg",
            Gate::T => "t",
            Gate::Tdg => "tdg",
            Gate::CX => "cx",
            Gate::CY => "cy",
            Gate::CZ => "cz",
            Gate::Swap => "swap",
            Gate::CCX => "ccx",
        }
    }

    /// How many qubit operands the gate takes.
    pub fn num_qubits(&self) -> usize {
        match self {
            Gate::CX | Gate::CY | Gate::CZ | Gate::Swap => 2,
            Gate::CCX => 3,
            _ => 1,
        }
    }

    /// Short symbol used by the circuit diagram for the target wire.
    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            Gate::I => "I",
            Gate::X | Gate::CX | Gate::CCX => "X",
            Gate::Y | Gate::CY => "Y",
            Gate::Z | Gate::CZ => "Z",
            Gate::H => "H",
            Gate::S => "S",
            Gate::Sdg => "S†",
            Gate::T => "T",
            Gate::Tdg => "T†",
            Gate::Swap => "x",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of a flattened circuit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Apply a standard gate. Controls come first, the target last.
    Gate {
        /// Which gate
        gate: Gate,
        /// Operand qubits, `gate.num_qubits()` of them, all distinct
        qubits: Vec<usize>,
    },

    /// Measure a qubit in the computational basis, optionally storing the
    /// outcome in a classical bit.
    Measure {
        /// Measured qubit
        qubit: usize,
        /// Destination classical bit, if any
        clbit: Option<usize>,
    },

    /// Return a qubit to `|0>`.
    Reset {
        /// Qubit to reset
        qubit: usize,
    },

    /// Scheduling barrier. Has no effect on the state.
    Barrier {
        /// Qubits the barrier spans
        qubits: Vec<usize>,
    },
}

impl Operation {
    /// Every qubit index the operation touches.
    pub fn involved_qubits(&self) -> Vec<usize> {
        match self {
            Operation::Gate { qubits, .. } | Operation::Barrier { qubits } => qubits.clone(),
            Operation::Measure { qubit, .. } | Operation::Reset { qubit } => vec![*qubit],
        }
    }

    /// The classical bit written by the operation, if any.
    pub fn written_clbit(&self) -> Option<usize> {
        match self {
            Operation::Measure { clbit, .. } => *clbit,
            _ => None,
        }
    }
}
