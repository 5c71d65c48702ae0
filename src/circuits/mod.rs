// src/circuits/mod.rs

//! Defines structures for representing and building ordered sequences of
//! operations (`djqasm::operations::Operation`).
//!
//! A [`Circuit`] is what the OpenQASM loader produces once includes, loops,
//! conditionals and subroutine calls have been unrolled.

use crate::operations::Operation;
use std::collections::BTreeSet;
use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Seed for [`Circuit::fingerprint`].
const FINGERPRINT_SEED: u64 = 0x646a_7161_736d_0001;

/// An ordered sequence of operations over a fixed number of qubits and
/// classical bits.
///
/// The width is the declared width of the program: qubits that no operation
/// touches still count. Adding an operation that reaches past the current width
/// grows it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Circuit {
    num_qubits: usize,
    num_clbits: usize,
    /// The order is significant.
    operations: Vec<Operation>,
}

impl Circuit {
    /// Creates a new, empty circuit with no qubits.
    pub fn new() -> Self {
        Self::with_width(0, 0)
    }

    /// Creates an empty circuit with `num_qubits` qubits and `num_clbits` bits.
    pub fn with_width(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            operations: Vec::new(),
        }
    }

    /// Adds a single operation to the end of the circuit's sequence.
    ///
    /// The circuit widens to cover every qubit and bit the operation names.
    pub fn add_operation(&mut self, op: Operation) {
        if let Some(max) = op.involved_qubits().into_iter().max() {
            self.num_qubits = self.num_qubits.max(max + 1);
        }
        if let Some(clbit) = op.written_clbit() {
            self.num_clbits = self.num_clbits.max(clbit + 1);
        }
        self.operations.push(op);
    }

    /// Adds multiple operations from an iterator to the end of the circuit's sequence.
    pub fn add_operations<I>(&mut self, ops: I)
    where
        I: IntoIterator<Item = Operation>,
    {
        for op in ops {
            self.add_operation(op);
        }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Qubits touched by at least one operation.
    pub fn active_qubits(&self) -> BTreeSet<usize> {
        self.operations.iter().flat_map(|op| op.involved_qubits()).collect()
    }

    /// Returns a slice containing the ordered sequence of operations in this circuit.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the total number of operations defined in the circuit.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the circuit contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Length of the longest chain of operations sharing a qubit. Barriers
    /// synchronise the qubits they span but do not add a layer.
    pub fn depth(&self) -> usize {
        let mut levels = vec![0usize; self.num_qubits];
        for op in &self.operations {
            let qubits = op.involved_qubits();
            let current = qubits.iter().map(|q| levels[*q]).max().unwrap_or(0);
            let next = match op {
                Operation::Barrier { .. } => current,
                _ => current + 1,
            };
            for q in qubits {
                levels[q] = next;
            }
        }
        levels.into_iter().max().unwrap_or(0)
    }

    /// A 64-bit hash of the width and operations that is stable across builds
    /// and platforms.
    pub fn fingerprint(&self) -> u64 {
        let mut bytes = Vec::with_capacity(16 + self.operations.len() * 24);
        push_indices(&mut bytes, &[self.num_qubits, self.num_clbits]);
        for op in &self.operations {
            match op {
                Operation::Gate { gate, qubits } => {
                    bytes.push(b'g');
                    bytes.extend_from_slice(gate.name().as_bytes());
                    bytes.push(0);
                    push_indices(&mut bytes, qubits);
                }
                Operation::Measure { qubit, clbit } => {
                    bytes.push(b'm');
                    push_indices(&mut bytes, &[*qubit]);
                    // Clbit `None` is encoded as u64::MAX.
                    let target = clbit.map_or(u64::MAX, |c| c as u64);
                    bytes.extend_from_slice(&target.to_le_bytes());
                }
                Operation::Reset { qubit } => {
                    bytes.push(b'r');
                    push_indices(&mut bytes, &[*qubit]);
                }
                Operation::Barrier { qubits } => {
                    bytes.push(b'b');
                    push_indices(&mut bytes, qubits);
                }
            }
        }
        xxh64(&bytes, FINGERPRINT_SEED)
    }

    /// `true` when no gate or reset follows a measurement on the same qubit,
    /// so all measurements can be sampled from one final state.
    pub fn has_terminal_measurements(&self) -> bool {
        let mut measured = vec![false; self.num_qubits];
        for op in &self.operations {
            match op {
                Operation::Measure { qubit, .. } => measured[*qubit] = true,
                Operation::Barrier { .. } => {}
                other => {
                    if other.involved_qubits().iter().any(|q| measured[*q]) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

// Implement Default for convenient creation of empty circuits.
/// Appends a length-prefixed list of little-endian `u64` values.
fn push_indices(bytes: &mut Vec<u8>, indices: &[usize]) {
    bytes.extend_from_slice(&(indices.len() as u64).to_le_bytes());
    for index in indices {
        bytes.extend_from_slice(&(*index as u64).to_le_bytes());
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// A helper struct for programmatically constructing `Circuit` instances using method chaining.
pub struct CircuitBuilder {
    circuit: Circuit,
}

impl CircuitBuilder {
    /// Creates a new, empty CircuitBuilder.
    pub fn new() -> Self {
        Self {
            circuit: Circuit::new(),
        }
    }

    /// Starts from a circuit of the given width.
    pub fn with_width(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            circuit: Circuit::with_width(num_qubits, num_clbits),
        }
    }

    /// Adds a single operation to the circuit being built.
    ///
    /// Returns `self` to allow for continued method chaining.
    pub fn add_op(mut self, op: Operation) -> Self {
        self.circuit.add_operation(op);
        self
    }

    /// Adds multiple operations from an iterator to the circuit being built.
    ///
    /// Returns `self` to allow for continued method chaining.
    pub fn add_ops<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.circuit.add_operations(ops);
        self
    }

    /// Finalizes the construction process and returns the built `Circuit`.
    pub fn build(self) -> Circuit {
        self.circuit
    }
}

// Implement Default for convenient creation of builders.
impl Default for CircuitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operations.is_empty() || self.num_qubits == 0 {
            return writeln!(f, "djqasm::Circuit[0 operations on {} qubits]", self.num_qubits);
        }

        let ops = &self.operations;
        let num_ops = ops.len();
        let num_qubits = self.num_qubits;

        let max_label_width = format!("q{}", num_qubits - 1).len();
        let label_padding = " ".repeat(max_label_width + 2); // Label + ": "

        const GATE_WIDTH: usize = 7; // e.g., "───H───"
        const WIRE: &str = "───────"; // GATE_WIDTH dashes
        const V_WIRE: char = '│';
        const H_WIRE: char = '─';

        // op_grid[row][time] holds the gate/wire segment; v_connect[row][time] the
        // connector drawn below that row.
        let mut op_grid: Vec<Vec<String>> = vec![vec![WIRE.to_string(); num_ops]; num_qubits];
        let mut v_connect: Vec<Vec<char>> = vec![vec![' '; num_ops]; num_qubits];

        fn format_gate(symbol: &str) -> String {
            let slen = symbol.chars().count();
            if slen >= GATE_WIDTH {
                symbol.chars().take(GATE_WIDTH).collect()
            } else {
                let total_dashes = GATE_WIDTH - slen;
                let pre_dashes = total_dashes / 2;
                let post_dashes = total_dashes - pre_dashes;
                format!(
                    "{}{}{}",
                    H_WIRE.to_string().repeat(pre_dashes),
                    symbol,
                    H_WIRE.to_string().repeat(post_dashes)
                )
            }
        }

        fn connect(v_connect: &mut [Vec<char>], rows: &[usize], t: usize) {
            if let (Some(r_min), Some(r_max)) = (rows.iter().min(), rows.iter().max()) {
                for row_vec in v_connect.iter_mut().take(*r_max).skip(*r_min) {
                    row_vec[t] = V_WIRE;
                }
            }
        }

        for (t, op) in ops.iter().enumerate() {
            match op {
                Operation::Gate { gate, qubits } => {
                    let (target, controls) = match qubits.split_last() {
                        Some(split) => split,
                        None => continue,
                    };
                    match gate {
                        crate::operations::Gate::Swap => {
                            for q in qubits {
                                op_grid[*q][t] = format_gate(gate.symbol());
                            }
                        }
                        _ => {
                            for c in controls {
                                op_grid[*c][t] = format_gate("@");
                            }
                            op_grid[*target][t] = format_gate(gate.symbol());
                        }
                    }
                    connect(&mut v_connect, qubits, t);
                }
                Operation::Measure { qubit, .. } => op_grid[*qubit][t] = format_gate("M"),
                Operation::Reset { qubit } => op_grid[*qubit][t] = format_gate("|0>"),
                Operation::Barrier { qubits } => {
                    for q in qubits {
                        op_grid[*q][t] = format_gate("░");
                    }
                }
            }
        }

        writeln!(f, "djqasm::Circuit[{} operations on {} qubits]", num_ops, num_qubits)?;
        for r in 0..num_qubits {
            let label = format!("q{}: ", r);
            write!(f, "{:<width$}", label, width = max_label_width + 2)?;
            writeln!(f, "{}", op_grid[r].join(""))?;

            if r < num_qubits - 1 {
                write!(f, "{}", label_padding)?;
                for t in 0..num_ops {
                    let connector = v_connect[r][t];
                    let padding_needed = GATE_WIDTH.saturating_sub(1);
                    let pre_pad = padding_needed / 2;
                    let post_pad = padding_needed - pre_pad;
                    write!(f, "{}{}{}", " ".repeat(pre_pad), connector, " ".repeat(post_pad))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

// Keep the Debug impl delegating to Display
impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;

    fn gate(gate: Gate, qubits: &[usize]) -> Operation {
        Operation::Gate { gate, qubits: qubits.to_vec() }
    }

    #[test]
    fn test_add_operation_grows_width() {
        let mut circuit = Circuit::new();
        circuit.add_operation(gate(Gate::CX, &[0, 3]));
        circuit.add_operation(Operation::Measure { qubit: 0, clbit: Some(1) });
        assert_eq!(circuit.num_qubits(), 4);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.active_qubits().into_iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_depth_counts_layers() {
        let circuit = CircuitBuilder::with_width(3, 0)
            .add_op(gate(Gate::H, &[0]))
            .add_op(gate(Gate::H, &[1]))
            .add_op(gate(Gate::CX, &[0, 2]))
            .add_op(Operation::Barrier { qubits: vec![0, 1, 2] })
            .add_op(gate(Gate::H, &[1]))
            .build();
        assert_eq!(circuit.depth(), 3);
    }

    #[test]
    fn test_terminal_measurement_detection() {
        let terminal = CircuitBuilder::new()
            .add_op(gate(Gate::H, &[0]))
            .add_op(Operation::Measure { qubit: 0, clbit: Some(0) })
            .add_op(gate(Gate::X, &[1]))
            .build();
        assert!(terminal.has_terminal_measurements());

        let mid_circuit = CircuitBuilder::new()
            .add_op(Operation::Measure { qubit: 0, clbit: Some(0) })
            .add_op(gate(Gate::X, &[0]))
            .build();
        assert!(!mid_circuit.has_terminal_measurements());
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let build = |target: usize, clbit: Option<usize>| {
            CircuitBuilder::with_width(2, 2)
                .add_op(gate(Gate::CX, &[0, target]))
                .add_op(Operation::Measure { qubit: 0, clbit })
                .build()
        };
        assert_eq!(build(1, Some(0)).fingerprint(), build(1, Some(0)).fingerprint());
        assert_ne!(build(1, Some(0)).fingerprint(), build(1, None).fingerprint());
        assert_ne!(build(1, Some(0)).fingerprint(), build(1, Some(1)).fingerprint());

        // Same operations, different declared width.
        let narrow = CircuitBuilder::with_width(1, 0).add_op(gate(Gate::H, &[0])).build();
        let wide = CircuitBuilder::with_width(3, 0).add_op(gate(Gate::H, &[0])).build();
        assert_ne!(narrow.fingerprint(), wide.fingerprint());
    }

    #[test]
    fn test_display_draws_controls() {
        let circuit = CircuitBuilder::new()
            .add_op(gate(Gate::H, &[0]))
            .add_op(gate(Gate::CX, &[0, 1]))
            .build();
        let text = circuit.to_string();
        assert!(text.starts_with("djqasm::Circuit[2 operations on 2 qubits]"));
        assert!(text.contains("H"));
        assert!(text.contains("@"));
        assert!(text.contains('│'));
    }
}
