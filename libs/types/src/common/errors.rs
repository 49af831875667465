//! Error types for fixed-point price conversion
//!
//! Raised when a decimal observation from the counterparty cannot be
//! represented in the relay's unsigned scaled-integer fields.

use thiserror::Error;

/// Errors that can occur while scaling decimal prices to fixed-point
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixedPointError {
    /// Scaled value exceeds the maximum representable value for the target field
    #[error("Overflow: value {value} exceeds maximum representable value")]
    Overflow { value: String },

    /// Value is negative but the target field is unsigned
    #[error("Underflow: value {value} is negative")]
    Negative { value: String },

    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },

    /// Exponent too large for exact decimal arithmetic
    #[error("Unsupported price exponent {exponent} (max {max})")]
    UnsupportedExponent { exponent: u32, max: u32 },
}
