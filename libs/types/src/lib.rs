//! Types library for the custody programs
//!
//! This library provides the value types shared by the loan escrow and the
//! vesting programs. Accounts and quantities are plain values: they are copied
//! into ledgers and keyed on, never owned by them.
//!
//! # Version
//! v1.0.0
//!
//! # Modules
//! - `ids`: Identifiers (AccountId, LoanId)
//! - `numeric`: Smallest-unit amounts and unit-string conversion
//! - `errors`: Error taxonomy for value parsing

pub mod ids;
pub mod numeric;
pub mod errors;
