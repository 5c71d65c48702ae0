// src/lib.rs

//! `djqasm` - Deutsch-Jozsa circuits as OpenQASM 3 programs
//!
//! A hidden bitstring `s` selects the oracle `f(x) = s . x (mod 2)`, constant
//! when `s` is all zeros and balanced otherwise. The bundled templates in
//! `qasm_resources/` are instantiated for `s` and either written out
//! ([`save_to_qasm`], [`generate_oracle`]) or loaded into a [`QasmModule`]
//! ([`generate_program`]) that can be inspected and simulated.

pub mod core;
pub mod operations;
pub mod circuits;
pub mod simulation;
pub mod validation;
pub mod qasm;
pub mod templates;
pub mod deutsch_jozsa;

// Re-export the most common types for easier top-level use
pub use core::{convert_bitstring_decimal, generate_replacements, Bitstring, DjError, IntoBitstring, Replacements};
pub use operations::{Gate, Operation};
pub use circuits::{Circuit, CircuitBuilder};
pub use simulation::{Counts, SimulationResult, Simulator, SimulatorConfig};
pub use validation::check_normalization;
pub use qasm::{ModuleLoader, QasmError, QasmLoader, QasmModule};
pub use templates::{TemplateConfig, TemplateKind};
pub use deutsch_jozsa::{classify, generate_oracle, generate_program, save_to_qasm, DeutschJozsa, Verdict};

// Example 1: Recovering the hidden bitstring
// Generates the program for a balanced oracle, loads it, and samples the
// input register. Every shot reads back `s`.
/// ```
/// use djqasm::{classify, generate_program, Verdict};
///
/// let module = generate_program("1011")?;
/// assert_eq!(module.num_qubits(), 5); // four inputs plus the ancilla
///
/// let result = module.simulate(64)?;
/// println!("{}", result);
/// assert_eq!(result.get("1011"), 64);
/// assert_eq!(classify(result.counts()), Verdict::Balanced);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Placeholder values
// Index i of the bitstring is bit i of the packed value, so the string is
// read back to front.
/// ```
/// use djqasm::{convert_bitstring_decimal, generate_replacements, Bitstring};
/// use num_bigint::BigUint;
///
/// assert_eq!(convert_bitstring_decimal("001")?, BigUint::from(4u32));
/// assert_eq!(convert_bitstring_decimal(vec![1u8, 0])?, BigUint::from(1u32));
///
/// let bits: Bitstring = "110".parse()?;
/// let replacements = generate_replacements(&bits);
/// assert_eq!(replacements["deutsch_jozsa_SIZE"], "3");
/// assert_eq!(replacements["SECRET_BITSTRING"], "3");
/// # Ok::<(), djqasm::DjError>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 3: Writing the oracle next to your own program
/// ```
/// use djqasm::generate_oracle;
///
/// let dir = tempdir::TempDir::new("djqasm-doc")?;
/// let written = generate_oracle("01", true, Some(dir.path()))?;
/// let text = std::fs::read_to_string(&written)?;
/// assert!(text.contains("def oracle(qubit[2] q, qubit ancilla)"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
