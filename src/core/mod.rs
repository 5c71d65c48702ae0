// src/core/mod.rs

//! Core data structures and types

pub mod bitstring;
pub mod error;
pub mod state;

// Re-export public types for convenient access via `djqasm::core::TypeName`
pub use bitstring::{convert_bitstring_decimal, generate_replacements, Bitstring, IntoBitstring, Replacements};
pub use error::DjError;
pub use state::StateVector;

pub mod constants;
pub use constants::dj_constants::{SECRET_PLACEHOLDER, SIZE_PLACEHOLDER};
