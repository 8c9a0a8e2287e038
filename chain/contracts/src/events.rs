//! Contract events
//!
//! Events are immutable records emitted by committed contract operations.
//! A reverted call emits nothing: its events are discarded with the rest of
//! its effects.

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, LoanId};
use types::numeric::Amount;

use crate::security::Role;
use crate::settlement::SettlementAsset;

/// Owner replaced the holder of a mutable role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGranted {
    pub role: Role,
    pub previous: AccountId,
    pub account: AccountId,
}

/// Lender created a new agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCreated {
    pub loan_id: LoanId,
    pub lender: AccountId,
    pub principal: Amount,
    pub duration_days: u32,
    pub interest_rate_bps: u32,
    pub settlement_asset: SettlementAsset,
}

/// Delegate verified an agreement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanVerified {
    pub loan_id: LoanId,
    pub delegate: AccountId,
}

/// Principal was received and the agreement reached its terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanExecuted {
    pub loan_id: LoanId,
    pub payer: AccountId,
    pub principal: Amount,
}

/// Held funds were disbursed to the three parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsRouted {
    pub loan_id: LoanId,
    pub total: Amount,
    pub delegate_amount: Amount,
    pub lender_amount: Amount,
    pub treasury_amount: Amount,
}

/// Owner appended a vesting schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingScheduleSet {
    pub beneficiary: AccountId,
    pub index: usize,
    pub amount: Amount,
    pub revocable: bool,
    pub start: i64,
    pub duration: u64,
}

/// Owner revoked a vesting schedule; `forfeited` will never vest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingRevoked {
    pub beneficiary: AccountId,
    pub index: usize,
    pub vested: Amount,
    pub forfeited: Amount,
}

/// Beneficiary claimed vested tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensClaimed {
    pub beneficiary: AccountId,
    pub amount: Amount,
    pub claimed_at: i64,
}

/// Fungible balance moved. `from` is `None` for the genesis mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Option<AccountId>,
    pub to: AccountId,
    pub amount: Amount,
}

/// Allowance set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub owner: AccountId,
    pub spender: AccountId,
    pub amount: Amount,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    RoleGranted(RoleGranted),
    LoanCreated(LoanCreated),
    LoanVerified(LoanVerified),
    LoanExecuted(LoanExecuted),
    FundsRouted(FundsRouted),
    VestingScheduleSet(VestingScheduleSet),
    VestingRevoked(VestingRevoked),
    TokensClaimed(TokensClaimed),
    Transfer(Transfer),
    Approval(Approval),
}
