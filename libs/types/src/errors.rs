//! Error types for value parsing
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Unit-string conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Malformed amount: {input}")]
    Malformed { input: String },

    #[error("Negative amount: {input}")]
    Negative { input: String },

    #[error("Amount {input} has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u32 },

    #[error("Amount {input} does not fit in the smallest-unit range")]
    OutOfRange { input: String },

    #[error("Unsupported decimals: {decimals}")]
    UnsupportedDecimals { decimals: u32 },
}
