// src/core/state.rs

use num_complex::Complex;
use num_traits::Zero;
use std::fmt;

/// Amplitudes of an `n`-qubit register over the `2^n` computational basis states.
///
/// Basis index `k` encodes qubit `i` in bit `i` of `k` (little-endian), matching
/// the bit order used for hidden bitstrings.
#[derive(Debug, Clone, PartialEq)] // Avoid Eq for floating-point complex numbers
pub struct StateVector {
    amplitudes: Vec<Complex<f64>>,
}

impl StateVector {
    /// The all-zeros state `|0...0>` on `num_qubits` qubits.
    pub(crate) fn zeros(num_qubits: usize) -> Option<Self> {
        let dim = 1usize.checked_shl(u32::try_from(num_qubits).ok()?)?;
        let mut amplitudes = vec![Complex::zero(); dim];
        amplitudes[0] = Complex::new(1.0, 0.0);
        Some(Self { amplitudes })
    }

    /// Wraps raw amplitudes. Validation happens in the simulator.
    pub(crate) fn new(amplitudes: Vec<Complex<f64>>) -> Self {
        Self { amplitudes }
    }

    /// Provides read-only access to the amplitudes.
    pub fn vector(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    pub(crate) fn vector_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.amplitudes
    }

    /// Number of basis states (`2^n`).
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    /// Probability of observing basis state `k`.
    pub fn probability(&self, k: usize) -> f64 {
        self.amplitudes.get(k).map_or(0.0, |c| c.norm_sqr())
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateVector[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}
