// src/core/bitstring.rs

//! The hidden bitstring `s` and the placeholder values derived from it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;

use super::constants::dj_constants::{SECRET_PLACEHOLDER, SIZE_PLACEHOLDER};
use super::error::DjError;

/// Placeholder token to replacement text.
pub type Replacements = HashMap<&'static str, String>;

/// An ordered, non-empty sequence of bits.
///
/// Index `i` of the bitstring is bit `i` of the packed integer (see
/// [`Bitstring::to_decimal`]) and addresses input qubit `q[i]` in the templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bitstring {
    bits: Vec<u8>,
}

impl Bitstring {
    /// Validates `bits` and wraps them. Every element must be `0` or `1` and at
    /// least one bit is required.
    pub fn new(bits: Vec<u8>) -> Result<Self, DjError> {
        if bits.is_empty() {
            return Err(DjError::InvalidBitstring {
                message: "bitstring must contain at least one bit".to_string(),
            });
        }
        if let Some((pos, bit)) = bits.iter().enumerate().find(|(_, b)| **b > 1) {
            return Err(DjError::InvalidBitstring {
                message: format!("element {} at position {} is not 0 or 1", bit, pos),
            });
        }
        Ok(Self { bits })
    }

    /// Number of bits, i.e. the number of oracle input qubits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always `false` for a constructed bitstring.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The raw bits in input order.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// `true` when every bit is zero, i.e. the encoded function is constant.
    pub fn is_zero(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }

    /// Reverses the bit order and reads the result as a base-2 integer.
    ///
    /// `"10"` becomes `"01"` which is 1; `"001"` becomes `"100"` which is 4.
    /// The reversal ties bitstring index `i` to qubit index `i` and must not be
    /// "fixed".
    pub fn to_decimal(&self) -> BigUint {
        self.bits
            .iter()
            .rev()
            .fold(BigUint::zero(), |acc, bit| (acc << 1usize) + BigUint::from(*bit))
    }
}

impl fmt::Display for Bitstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

impl FromStr for Bitstring {
    type Err = DjError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .chars()
            .enumerate()
            .map(|(pos, c)| match c {
                '0' => Ok(0),
                '1' => Ok(1),
                other => Err(DjError::InvalidBitstring {
                    message: format!("character {:?} at position {} is not '0' or '1'", other, pos),
                }),
            })
            .collect::<Result<Vec<u8>, DjError>>()?;
        Self::new(bits)
    }
}

/// Conversion into a validated [`Bitstring`].
///
/// Implemented for strings of `'0'`/`'1'` characters, for sequences of `0`/`1`
/// integers, and for `Bitstring` itself, so every public entry point accepts
/// whichever form the caller has at hand.
pub trait IntoBitstring {
    /// Validate and convert.
    fn into_bitstring(self) -> Result<Bitstring, DjError>;
}

impl IntoBitstring for Bitstring {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        Ok(self)
    }
}

impl IntoBitstring for &Bitstring {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        Ok(self.clone())
    }
}

impl IntoBitstring for &str {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        self.parse()
    }
}

impl IntoBitstring for String {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        self.parse()
    }
}

impl IntoBitstring for &String {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        self.parse()
    }
}

impl IntoBitstring for Vec<u8> {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        Bitstring::new(self)
    }
}

impl IntoBitstring for &[u8] {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        Bitstring::new(self.to_vec())
    }
}

impl<const N: usize> IntoBitstring for [u8; N] {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        Bitstring::new(self.to_vec())
    }
}

impl<const N: usize> IntoBitstring for &[u8; N] {
    fn into_bitstring(self) -> Result<Bitstring, DjError> {
        Bitstring::new(self.to_vec())
    }
}

/// Validates `bitstring` and returns its reversed-order decimal value.
pub fn convert_bitstring_decimal(bitstring: impl IntoBitstring) -> Result<BigUint, DjError> {
    Ok(bitstring.into_bitstring()?.to_decimal())
}

/// Builds the two-entry substitution map for the templates.
pub fn generate_replacements(bitstring: &Bitstring) -> Replacements {
    HashMap::from([
        (SIZE_PLACEHOLDER, bitstring.len().to_string()),
        (SECRET_PLACEHOLDER, bitstring.to_decimal().to_string()),
    ])
}
