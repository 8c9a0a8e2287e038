//! Loan escrow and token vesting programs
//!
//! Two programs share one host:
//! - a loan escrow: lender-created agreements, delegate verification,
//!   funding at execution, and a three-way disbursement of held funds
//! - a linear vesting ledger with a claim processor paying out the hosted
//!   fungible token
//!
//! # Modules
//! - `errors`: Program and call error types
//! - `events`: Events emitted by the programs
//! - `security`: Reentrancy guard, roles, access control
//! - `native` / `token`: Native currency and the fungible token ledger
//! - `settlement`: Settlement assets and outbound payments
//! - `router`: Delegate / lender / treasury split
//! - `escrow`: Loan agreement lifecycle
//! - `vesting` / `claim`: Vesting schedules and claims
//! - `config`: Deployment configuration
//! - `runtime`: Atomic call execution, payments, account hooks

mod balances;

pub mod claim;
pub mod config;
pub mod errors;
pub mod escrow;
pub mod events;
pub mod native;
pub mod router;
pub mod runtime;
pub mod security;
pub mod settlement;
pub mod token;
pub mod vesting;

/// Contract ABI version: frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
