// src/simulation/engine.rs
use crate::core::StateVector;
use crate::operations::{Gate, Operation};
use crate::qasm::QasmError;
use num_complex::Complex;
use num_traits::Zero;
use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::FRAC_1_SQRT_2;

/// Largest register the dense state vector is allowed to hold.
pub(crate) const MAX_QUBITS: usize = 24;

/// Amplitudes below this are treated as zero when sampling.
const AMPLITUDE_TOLERANCE: f64 = 1e-12;

type Matrix2 = [[Complex<f64>; 2]; 2];

/// Dense state-vector engine. Qubit `i` is bit `i` of the basis index.
/// (Internal visibility)
#[derive(Debug)]
pub(crate) struct SimulationEngine {
    num_qubits: usize,
    state: StateVector,
}

impl SimulationEngine {
    /// Initializes the engine in `|0...0>`.
    pub(crate) fn init(num_qubits: usize) -> Result<Self, QasmError> {
        if num_qubits > MAX_QUBITS {
            return Err(QasmError::Simulation {
                message: format!(
                    "{} qubits exceed the simulator limit of {}",
                    num_qubits, MAX_QUBITS
                ),
            });
        }
        let state = StateVector::zeros(num_qubits).ok_or_else(|| QasmError::Simulation {
            message: "state vector dimension overflows usize".to_string(),
        })?;
        Ok(Self { num_qubits, state })
    }

    pub(crate) fn get_state(&self) -> &StateVector {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: StateVector) -> Result<(), QasmError> {
        if state.dim() != self.state.dim() {
            Err(QasmError::Simulation {
                message: format!(
                    "Cannot set state: provided dimension {} does not match engine dimension {}",
                    state.dim(),
                    self.state.dim()
                ),
            })
        } else {
            self.state = state;
            Ok(())
        }
    }

    /// Applies one operation. Measurement outcomes land in `clbits`.
    pub(crate) fn apply_operation(
        &mut self,
        op: &Operation,
        rng: &mut StdRng,
        clbits: &mut [u8],
    ) -> Result<(), QasmError> {
        match op {
            Operation::Gate { gate, qubits } => self.apply_gate(*gate, qubits)?,
            Operation::Measure { qubit, clbit } => {
                let outcome = self.measure(*qubit, rng)?;
                if let Some(c) = clbit {
                    let slot = clbits.get_mut(*c).ok_or_else(|| QasmError::Simulation {
                        message: format!("classical bit {} out of range", c),
                    })?;
                    *slot = outcome;
                }
            }
            Operation::Reset { qubit } => {
                if self.measure(*qubit, rng)? == 1 {
                    self.apply_single_qubit_gate(*qubit, &gate_matrix(Gate::X))?;
                }
            }
            Operation::Barrier { .. } => {}
        }
        Ok(())
    }

    fn apply_gate(&mut self, gate: Gate, qubits: &[usize]) -> Result<(), QasmError> {
        if qubits.len() != gate.num_qubits() {
            return Err(QasmError::Simulation {
                message: format!(
                    "gate '{}' expects {} qubits, got {}",
                    gate,
                    gate.num_qubits(),
                    qubits.len()
                ),
            });
        }
        for (i, q) in qubits.iter().enumerate() {
            self.check_qubit(*q)?;
            if qubits[..i].contains(q) {
                return Err(QasmError::Simulation {
                    message: format!("gate '{}' applied to qubit {} more than once", gate, q),
                });
            }
        }

        match gate {
            Gate::CX => self.apply_controlled(&qubits[..1], qubits[1], &gate_matrix(Gate::X)),
            Gate::CY => self.apply_controlled(&qubits[..1], qubits[1], &gate_matrix(Gate::Y)),
            Gate::CZ => self.apply_controlled(&qubits[..1], qubits[1], &gate_matrix(Gate::Z)),
            Gate::CCX => self.apply_controlled(&qubits[..2], qubits[2], &gate_matrix(Gate::X)),
            Gate::Swap => {
                self.apply_swap(qubits[0], qubits[1]);
                Ok(())
            }
            single => self.apply_single_qubit_gate(qubits[0], &gate_matrix(single)),
        }
    }

    fn check_qubit(&self, qubit: usize) -> Result<(), QasmError> {
        if qubit >= self.num_qubits {
            Err(QasmError::Simulation {
                message: format!("qubit {} outside a {}-qubit register", qubit, self.num_qubits),
            })
        } else {
            Ok(())
        }
    }

    /// Applies a 2x2 matrix to one qubit of the global state vector.
    fn apply_single_qubit_gate(&mut self, target: usize, matrix: &Matrix2) -> Result<(), QasmError> {
        self.apply_controlled(&[], target, matrix)
    }

    /// Applies `matrix` to `target` on the subspace where every control is `|1>`.
    fn apply_controlled(
        &mut self,
        controls: &[usize],
        target: usize,
        matrix: &Matrix2,
    ) -> Result<(), QasmError> {
        self.check_qubit(target)?;
        let k_mask = 1usize << target; // Mask for the target bit
        let lower_mask = k_mask - 1;
        let upper_mask = !((k_mask << 1) - 1);
        let control_mask = controls.iter().fold(0usize, |mask, c| mask | (1 << c));

        let dim = self.state.dim();
        let amplitudes = self.state.vector_mut();

        // Iterate over pairs of basis states differing only at the target bit.
        for i in 0..dim / 2 {
            let i0 = ((i << 1) & upper_mask) | (i & lower_mask);
            let i1 = i0 | k_mask;
            if i0 & control_mask != control_mask {
                continue;
            }
            let psi_0 = amplitudes[i0];
            let psi_1 = amplitudes[i1];
            amplitudes[i0] = matrix[0][0] * psi_0 + matrix[0][1] * psi_1;
            amplitudes[i1] = matrix[1][0] * psi_0 + matrix[1][1] * psi_1;
        }
        Ok(())
    }

    fn apply_swap(&mut self, a: usize, b: usize) {
        let (mask_a, mask_b) = (1usize << a, 1usize << b);
        let amplitudes = self.state.vector_mut();
        for k in 0..amplitudes.len() {
            if k & mask_a == 0 && k & mask_b != 0 {
                amplitudes.swap(k, k ^ mask_a ^ mask_b);
            }
        }
    }

    /// Measures one qubit, collapsing and renormalising the state.
    pub(crate) fn measure(&mut self, qubit: usize, rng: &mut StdRng) -> Result<u8, QasmError> {
        self.check_qubit(qubit)?;
        let mask = 1usize << qubit;
        let p_one: f64 = (0..self.state.dim())
            .filter(|k| k & mask != 0)
            .map(|k| self.state.probability(k))
            .sum();

        let mut outcome: u8 = if rng.random::<f64>() < p_one { 1 } else { 0 };
        // Rounding can leave a ~1e-16 sliver for the impossible outcome.
        if outcome == 0 && 1.0 - p_one < AMPLITUDE_TOLERANCE {
            outcome = 1;
        } else if outcome == 1 && p_one < AMPLITUDE_TOLERANCE {
            outcome = 0;
        }
        let p_outcome = if outcome == 1 { p_one } else { 1.0 - p_one };
        if p_outcome < AMPLITUDE_TOLERANCE {
            return Err(QasmError::Simulation {
                message: format!("measurement of qubit {} found no probability mass", qubit),
            });
        }

        let scale = 1.0 / p_outcome.sqrt();
        for (k, amp) in self.state.vector_mut().iter_mut().enumerate() {
            let bit = u8::from(k & mask != 0);
            if bit == outcome {
                *amp *= scale;
            } else {
                *amp = Complex::zero();
            }
        }
        Ok(outcome)
    }

    /// Draws a basis index from the current distribution without collapsing.
    pub(crate) fn sample(&self, rng: &mut StdRng) -> usize {
        let p_sample: f64 = rng.random::<f64>();
        let mut cumulative = 0.0;
        let mut last_nonzero = 0;
        for (k, amp) in self.state.vector().iter().enumerate() {
            let p = amp.norm_sqr();
            if p > AMPLITUDE_TOLERANCE {
                cumulative += p;
                last_nonzero = k;
                if p_sample < cumulative {
                    return k;
                }
            }
        }
        // Rounding left p_sample just above the cumulative total.
        last_nonzero
    }
}

/// The 2x2 unitary of a single-qubit gate (or the target action of a controlled one).
fn gate_matrix(gate: Gate) -> Matrix2 {
    let one = Complex::new(1.0, 0.0);
    let zero = Complex::zero();
    let i = Complex::i();
    let h = Complex::new(FRAC_1_SQRT_2, 0.0);
    match gate {
        Gate::I | Gate::Swap => [[one, zero], [zero, one]],
        Gate::X | Gate::CX | Gate::CCX => [[zero, one], [one, zero]],
        Gate::Y | Gate::CY => [[zero, -i], [i, zero]],
        Gate::Z | Gate::CZ => [[one, zero], [zero, -one]],
        Gate::H => [[h, h], [h, -h]],
        Gate::S => [[one, zero], [zero, i]],
        Gate::Sdg => [[one, zero], [zero, -i]],
        Gate::T => [[one, zero], [zero, Complex::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)]],
        Gate::Tdg => [[one, zero], [zero, Complex::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2)]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const TEST_TOLERANCE: f64 = 1e-9;

    fn apply(engine: &mut SimulationEngine, gate: Gate, qubits: &[usize]) -> Result<(), QasmError> {
        let mut rng = StdRng::seed_from_u64(0);
        let op = Operation::Gate { gate, qubits: qubits.to_vec() };
        engine.apply_operation(&op, &mut rng, &mut [])
    }

    fn probabilities(engine: &SimulationEngine) -> Vec<f64> {
        (0..engine.get_state().dim()).map(|k| engine.get_state().probability(k)).collect()
    }

    #[test]
    fn test_hadamard_on_each_target() -> Result<(), QasmError> {
        let h = FRAC_1_SQRT_2;
        for target in 0..3 {
            let mut engine = SimulationEngine::init(3)?;
            apply(&mut engine, Gate::H, &[target])?;
            for (k, amp) in engine.get_state().vector().iter().enumerate() {
                let expected = if k == 0 || k == 1 << target { h } else { 0.0 };
                assert!(
                    (*amp - Complex::new(expected, 0.0)).norm() < TEST_TOLERANCE,
                    "H on qubit {}: amplitude {} is {}, expected {}",
                    target, k, amp, expected
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_hadamard_on_excited_register() -> Result<(), QasmError> {
        // Start from |111> so every pair has its upper bits set.
        let h = FRAC_1_SQRT_2;
        for target in 0..3 {
            let mut engine = SimulationEngine::init(3)?;
            for q in 0..3 {
                apply(&mut engine, Gate::X, &[q])?;
            }
            apply(&mut engine, Gate::H, &[target])?;
            let low = 0b111 & !(1 << target);
            for (k, amp) in engine.get_state().vector().iter().enumerate() {
                let expected = match k {
                    0b111 => -h,
                    k if k == low => h,
                    _ => 0.0,
                };
                assert!(
                    (*amp - Complex::new(expected, 0.0)).norm() < TEST_TOLERANCE,
                    "H on qubit {} of |111>: amplitude {} is {}, expected {}",
                    target, k, amp, expected
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_control_above_target() -> Result<(), QasmError> {
        // |10> (qubit 1 set), CX with control 1 and target 0 gives |11>.
        let mut engine = SimulationEngine::init(2)?;
        apply(&mut engine, Gate::X, &[1])?;
        apply(&mut engine, Gate::CX, &[1, 0])?;
        assert_eq!(probabilities(&engine), vec![0.0, 0.0, 0.0, 1.0]);

        let outside = apply(&mut engine, Gate::CCX, &[0, 1, 2]);
        assert!(matches!(outside, Err(QasmError::Simulation { .. })));
        Ok(())
    }

    #[test]
    fn test_swap_moves_amplitude() -> Result<(), QasmError> {
        let mut engine = SimulationEngine::init(3)?;
        apply(&mut engine, Gate::X, &[0])?;
        apply(&mut engine, Gate::Swap, &[0, 2])?;
        assert!((engine.get_state().probability(0b100) - 1.0).abs() < TEST_TOLERANCE);
        Ok(())
    }
}
