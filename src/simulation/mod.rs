// src/simulation/mod.rs

//! Runs flattened [`Circuit`]s on a dense state vector.
//!
//! This is how a loaded Deutsch-Jozsa module is inspected: sampling the
//! measurement register of a correctly generated program reproduces the hidden
//! bitstring on every shot.

mod results;
pub(crate) mod engine;

pub use results::{Counts, SimulationResult};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::circuits::Circuit;
use crate::core::StateVector;
use crate::operations::Operation;
use crate::qasm::QasmError;
use crate::validation::check_normalization;
use engine::SimulationEngine;

/// Simulator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Seed for measurement sampling. When `None` the seed is the circuit's
    /// [`fingerprint`](Circuit::fingerprint), so repeated runs of the same
    /// circuit agree across builds and platforms.
    pub seed: Option<u64>,
}

/// The main simulator orchestrating the execution of circuits.
#[derive(Debug, Default)]
pub struct Simulator {
    config: SimulatorConfig,
}

impl Simulator {
    /// Creates a new Simulator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulator with explicit settings.
    pub fn with_config(config: SimulatorConfig) -> Self {
        Self { config }
    }

    /// Shorthand for a simulator with a fixed sampling seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(SimulatorConfig { seed: Some(seed) })
    }

    /// Samples `shots` executions of `circuit`.
    ///
    /// When every measurement is terminal the state is prepared once and the
    /// register is sampled from it; otherwise each shot replays the circuit.
    ///
    /// # Errors
    /// `QasmError::Simulation` for zero shots, oversize circuits, or malformed
    /// operations.
    pub fn run(&self, circuit: &Circuit, shots: usize) -> Result<SimulationResult, QasmError> {
        if shots == 0 {
            return Err(QasmError::Simulation {
                message: "at least one shot is required".to_string(),
            });
        }
        let seed = self.seed_for(circuit);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut result = SimulationResult::new();
        let mut clbits = vec![0u8; circuit.num_clbits()];

        let single_pass = circuit.has_terminal_measurements()
            && !circuit.operations().iter().any(|op| matches!(op, Operation::Reset { .. }));
        debug!(
            qubits = circuit.num_qubits(),
            operations = circuit.len(),
            shots,
            seed,
            single_pass,
            "running circuit"
        );

        if single_pass {
            let mut engine = SimulationEngine::init(circuit.num_qubits())?;
            let mut measurements = Vec::new();
            for op in circuit.operations() {
                match op {
                    Operation::Measure { qubit, clbit } => measurements.push((*qubit, *clbit)),
                    other => Self::step(&mut engine, other, &mut rng, &mut clbits)?,
                }
            }
            for _ in 0..shots {
                let k = engine.sample(&mut rng);
                for (qubit, clbit) in &measurements {
                    if let Some(c) = clbit {
                        clbits[*c] = u8::from((k >> qubit) & 1 == 1);
                    }
                }
                result.record_shot(&clbits);
            }
        } else {
            for _ in 0..shots {
                let mut engine = SimulationEngine::init(circuit.num_qubits())?;
                clbits.iter_mut().for_each(|b| *b = 0);
                for op in circuit.operations() {
                    Self::step(&mut engine, op, &mut rng, &mut clbits)?;
                }
                result.record_shot(&clbits);
            }
        }
        Ok(result)
    }

    /// Final state of one trajectory through `circuit`. Exact for circuits
    /// without measurements or resets.
    pub fn statevector(&self, circuit: &Circuit) -> Result<StateVector, QasmError> {
        let mut rng = StdRng::seed_from_u64(self.seed_for(circuit));
        let mut clbits = vec![0u8; circuit.num_clbits()];
        let mut engine = SimulationEngine::init(circuit.num_qubits())?;
        for op in circuit.operations() {
            Self::step(&mut engine, op, &mut rng, &mut clbits)?;
        }
        Ok(engine.get_state().clone())
    }

    fn step(
        engine: &mut SimulationEngine,
        op: &Operation,
        rng: &mut StdRng,
        clbits: &mut [u8],
    ) -> Result<(), QasmError> {
        engine.apply_operation(op, rng, clbits)?;
        if cfg!(debug_assertions) {
            check_normalization(engine.get_state(), None)?;
        }
        Ok(())
    }

    fn seed_for(&self, circuit: &Circuit) -> u64 {
        self.config.seed.unwrap_or_else(|| circuit.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::engine::SimulationEngine;
    use super::*;
    use crate::circuits::CircuitBuilder;
    use crate::operations::Gate;
    use num_complex::Complex;
    use num_traits::Zero;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TEST_TOLERANCE: f64 = 1e-9;

    fn gate(gate: Gate, qubits: &[usize]) -> Operation {
        Operation::Gate { gate, qubits: qubits.to_vec() }
    }

    /// Asserts that two complex state vectors are approximately equal component-wise.
    fn assert_complex_vec_approx_equal(actual: &[Complex<f64>], expected: &[Complex<f64>], context: &str) {
        assert_eq!(actual.len(), expected.len(), "Vector length mismatch - {}", context);
        for i in 0..actual.len() {
            let dist_sq = (actual[i] - expected[i]).norm_sqr();
            assert!(
                dist_sq < TEST_TOLERANCE * TEST_TOLERANCE,
                "Vector mismatch at index {} - Actual: {}, Expected: {}, Context: {}",
                i, actual[i], expected[i], context
            );
        }
    }

    #[test]
    fn test_bell_state_amplitudes() -> Result<(), QasmError> {
        let circuit = CircuitBuilder::new()
            .add_op(gate(Gate::H, &[0]))
            .add_op(gate(Gate::CX, &[0, 1]))
            .build();
        let state = Simulator::new().statevector(&circuit)?;
        let s = Complex::new(FRAC_1_SQRT_2, 0.0);
        assert_complex_vec_approx_equal(
            state.vector(),
            &[s, Complex::zero(), Complex::zero(), s],
            "H(0) then CX(0,1)",
        );
        Ok(())
    }

    #[test]
    fn test_little_endian_qubit_order() -> Result<(), QasmError> {
        // X on qubit 1 of three -> basis index 0b010.
        let circuit = CircuitBuilder::with_width(3, 0).add_op(gate(Gate::X, &[1])).build();
        let state = Simulator::new().statevector(&circuit)?;
        assert!((state.probability(2) - 1.0).abs() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_swap_and_toffoli() -> Result<(), QasmError> {
        let circuit = CircuitBuilder::with_width(3, 3)
            .add_op(gate(Gate::X, &[0]))
            .add_op(gate(Gate::Swap, &[0, 1]))
            .add_op(gate(Gate::X, &[0]))
            .add_op(gate(Gate::CCX, &[0, 1, 2]))
            .add_ops((0..3).map(|q| Operation::Measure { qubit: q, clbit: Some(q) }))
            .build();
        let result = Simulator::with_seed(7).run(&circuit, 16)?;
        assert_eq!(result.get("111"), 16);
        Ok(())
    }

    #[test]
    fn test_superposition_sampling_is_seeded() -> Result<(), QasmError> {
        let circuit = CircuitBuilder::new()
            .add_op(gate(Gate::H, &[0]))
            .add_op(Operation::Measure { qubit: 0, clbit: Some(0) })
            .build();
        let first = Simulator::with_seed(11).run(&circuit, 400)?;
        let second = Simulator::with_seed(11).run(&circuit, 400)?;
        assert_eq!(first, second);
        assert_eq!(first.shots(), 400);
        assert!(first.get("0") > 100 && first.get("1") > 100, "{}", first);
        Ok(())
    }

    #[test]
    fn test_mid_circuit_measurement_and_reset() -> Result<(), QasmError> {
        // Measure, flip, measure again: the two bits always differ.
        let circuit = CircuitBuilder::new()
            .add_op(gate(Gate::H, &[0]))
            .add_op(Operation::Measure { qubit: 0, clbit: Some(0) })
            .add_op(gate(Gate::X, &[0]))
            .add_op(Operation::Measure { qubit: 0, clbit: Some(1) })
            .add_op(Operation::Reset { qubit: 0 })
            .add_op(Operation::Measure { qubit: 0, clbit: Some(2) })
            .build();
        let result = Simulator::with_seed(3).run(&circuit, 64)?;
        for key in result.counts().keys() {
            assert!(key == "010" || key == "100", "unexpected outcome {}", key);
        }
        Ok(())
    }

    #[test]
    fn test_measure_collapses_state() -> Result<(), QasmError> {
        let mut engine = SimulationEngine::init(1)?;
        engine.set_state(StateVector::new(vec![Complex::zero(), Complex::new(0.0, 1.0)]))?;
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(engine.measure(0, &mut rng)?, 1);
        assert!((engine.get_state().probability(1) - 1.0).abs() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_input() {
        let oversized = CircuitBuilder::with_width(engine::MAX_QUBITS + 1, 0).build();
        assert!(matches!(Simulator::new().run(&oversized, 1), Err(QasmError::Simulation { .. })));

        let repeated = CircuitBuilder::new().add_op(gate(Gate::CX, &[1, 1])).build();
        assert!(matches!(Simulator::new().run(&repeated, 1), Err(QasmError::Simulation { .. })));

        let empty = Circuit::new();
        assert!(matches!(Simulator::new().run(&empty, 0), Err(QasmError::Simulation { .. })));
    }
}
