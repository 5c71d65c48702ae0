// src/validation/mod.rs

//! Sanity checks on simulator state vectors.

use crate::core::StateVector;
use crate::qasm::QasmError;

/// Default tolerance for normalization checks.
pub const DEFAULT_NORM_TOLERANCE: f64 = 1e-9;

/// Checks if the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `state` - The `StateVector` to check.
/// * `tolerance` - Allowed deviation from 1.0. Falls back to [`DEFAULT_NORM_TOLERANCE`].
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(QasmError::Simulation)` if normalization fails.
pub fn check_normalization(state: &StateVector, tolerance: Option<f64>) -> Result<(), QasmError> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_NORM_TOLERANCE);
    let norm_sq: f64 = state.vector().iter().map(|c| c.norm_sqr()).sum();
    if (norm_sq - 1.0).abs() > effective_tolerance {
        Err(QasmError::Simulation {
            message: format!(
                "State vector normalization failed. Sum(|c_i|^2) = {} (Deviation > {})",
                norm_sq, effective_tolerance
            ),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;
    use std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn test_normalized_state_passes() {
        let state = StateVector::new(vec![Complex::new(FRAC_1_SQRT_2, 0.0), Complex::new(0.0, -FRAC_1_SQRT_2)]);
        assert!(check_normalization(&state, None).is_ok());
    }

    #[test]
    fn test_unnormalized_state_fails() {
        let state = StateVector::new(vec![Complex::new(1.0, 0.0), Complex::new(1.0, 0.0)]);
        assert!(matches!(check_normalization(&state, None), Err(QasmError::Simulation { .. })));
        assert!(check_normalization(&state, Some(1.5)).is_ok());
    }
}
