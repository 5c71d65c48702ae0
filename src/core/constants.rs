//! Fixed tokens and names shared by the bundled templates.

/// Placeholder tokens and symbol names baked into the `qasm_resources/` templates.
pub mod dj_constants {
    /// Replaced with the number of input qubits (the bitstring length).
    pub const SIZE_PLACEHOLDER: &str = "deutsch_jozsa_SIZE";
    /// Replaced with the little-endian decimal value of the hidden bitstring.
    pub const SECRET_PLACEHOLDER: &str = "SECRET_BITSTRING";
    /// Name of the subroutine defined by `dj_subroutine.qasm`.
    pub const SUBROUTINE_NAME: &str = "deutsch_jozsa";
    /// Name of the subroutine defined by `oracle.qasm`.
    pub const ORACLE_NAME: &str = "oracle";
}
