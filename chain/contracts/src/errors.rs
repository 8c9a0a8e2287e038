//! Contract-specific error types
//!
//! Error taxonomy for access control, balance ledgers, the loan escrow,
//! the vesting programs and the hosting runtime.

use thiserror::Error;
use types::ids::{AccountId, LoanId};
use types::numeric::Amount;

use crate::escrow::LoanStatus;
use crate::security::Role;

/// Role check failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Unauthorized: {account} does not hold the {role} role")]
    Unauthorized { account: AccountId, role: Role },
}

/// Balance ledger errors, shared by the native bank and the fungible ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: AccountId,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance from {owner} to {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        required: Amount,
        available: Amount,
    },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Loan escrow errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Loan agreement not found: {loan_id}")]
    NotFound { loan_id: LoanId },

    #[error("Loan agreement {loan_id} is {status}, operation requires {required}")]
    InvalidState {
        loan_id: LoanId,
        status: LoanStatus,
        required: LoanStatus,
    },

    #[error("Principal must be positive")]
    InvalidAmount,

    #[error("Attached value {provided} does not match principal {expected}")]
    AmountMismatch { expected: Amount, provided: Amount },

    #[error("Split amount {split} exceeds total {total}")]
    InvalidSplit { split: Amount, total: Amount },

    #[error("Escrow holds {available}, cannot route {required}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Loan id sequence exhausted")]
    IdsExhausted,
}

/// Vesting schedule and claim errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VestingError {
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Vesting schedule not found: {beneficiary} index {index}")]
    NotFound { beneficiary: AccountId, index: usize },

    #[error("Vesting amount must be positive")]
    InvalidAmount,

    #[error("Vesting duration must be positive")]
    InvalidDuration,

    #[error("Vesting schedule {beneficiary} index {index} is not revocable")]
    NotRevocable { beneficiary: AccountId, index: usize },

    #[error("Vesting schedule {beneficiary} index {index} already revoked")]
    AlreadyRevoked { beneficiary: AccountId, index: usize },

    #[error("Nothing to claim for {beneficiary}")]
    NothingToClaim { beneficiary: AccountId },

    #[error("Arithmetic overflow in vesting calculation")]
    Overflow,
}

/// Errors surfaced by runtime entry points. Any of these reverts the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("Vesting error: {0}")]
    Vesting(#[from] VestingError),

    /// `account` is whichever side's hook refused: the recipient of a
    /// credit or the owner of a pulled allowance.
    #[error("Transfer rejected by {account}: {reason}")]
    TransferFailed { account: AccountId, reason: String },

    #[error("Reentrancy detected in {program}")]
    Reentrancy { program: &'static str },
}
