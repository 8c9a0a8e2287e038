//! Loan escrow: role-gated loan agreement ledger
//!
//! Owns the agreements and their lifecycle:
//! `Created → (delegate verifies) → Verified → (principal received) → Executed`
//!
//! Transitions only move forward and `Executed` is terminal, so each
//! agreement is executed at most once. Value-moving operations commit their
//! state transition first and hand back the `Payment`s still owed; the
//! hosting runtime performs those afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use types::ids::{AccountId, LoanId};
use types::numeric::Amount;

use crate::errors::EscrowError;
use crate::events::{
    ContractEvent, FundsRouted, LoanCreated, LoanExecuted, LoanVerified, RoleGranted,
};
use crate::router::FundRouter;
use crate::security::{AccessControlRegistry, ReentrancyGuard, Role};
use crate::settlement::{Payment, SettlementAsset};

/// Basis-point denominator times days per year, for simple interest.
const BPS_DAYS_PER_YEAR: u128 = 10_000 * 365;

/// Lifecycle state of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Created by the lender, awaiting verification
    Created,
    /// Verified by the delegate, awaiting principal
    Verified,
    /// Principal received (terminal)
    Executed,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoanStatus::Created => "Created",
            LoanStatus::Verified => "Verified",
            LoanStatus::Executed => "Executed",
        };
        f.write_str(name)
    }
}

/// A single loan agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanAgreement {
    pub id: LoanId,
    /// Lender that created the agreement. Recorded only; never gates.
    pub lender: AccountId,
    pub principal: Amount,
    pub duration_days: u32,
    pub interest_rate_bps: u32,
    pub settlement_asset: SettlementAsset,
    pub created_at: i64,
    status: LoanStatus,
}

impl LoanAgreement {
    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn is_verified(&self) -> bool {
        self.status >= LoanStatus::Verified
    }

    pub fn is_executed(&self) -> bool {
        self.status == LoanStatus::Executed
    }

    /// Simple interest over the whole term, floored:
    /// `principal * rate_bps * duration_days / (10_000 * 365)`.
    pub fn interest_due(&self) -> Option<Amount> {
        self.principal
            .checked_mul(Amount::from(self.interest_rate_bps))?
            .checked_mul(Amount::from(self.duration_days))
            .map(|scaled| scaled / BPS_DAYS_PER_YEAR)
    }

    /// Principal plus interest due at the end of the term.
    pub fn repayment_amount(&self) -> Option<Amount> {
        self.principal.checked_add(self.interest_due()?)
    }
}

/// The loan escrow program.
///
/// Holds its funds in its own account (`address`) on whichever ledger the
/// settlement asset lives on. Routing draws on that whole balance rather
/// than a per-loan escrow, so concurrently executed loans in the same asset
/// are not isolated from each other.
#[derive(Debug, Clone)]
pub struct LoanAgreementLedger {
    address: AccountId,
    roles: AccessControlRegistry,
    settlement_asset: SettlementAsset,
    /// Fixed token payer; when `None` the executing caller pays
    payer: Option<AccountId>,
    loans: BTreeMap<LoanId, LoanAgreement>,
    next_id: LoanId,
    reentrancy_guard: ReentrancyGuard,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl LoanAgreementLedger {
    pub fn new(
        address: AccountId,
        roles: AccessControlRegistry,
        settlement_asset: SettlementAsset,
        payer: Option<AccountId>,
    ) -> Self {
        Self {
            address,
            roles,
            settlement_asset,
            payer,
            loans: BTreeMap::new(),
            next_id: LoanId::FIRST,
            reentrancy_guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    // ───────────────────────── Roles ─────────────────────────

    /// Replace the delegate. Owner-only.
    pub fn grant_delegate(&mut self, caller: &AccountId, account: AccountId) -> Result<(), EscrowError> {
        let previous = self.roles.holder(Role::Delegate);
        self.roles.grant_delegate(caller, account)?;
        self.events.push(ContractEvent::RoleGranted(RoleGranted {
            role: Role::Delegate,
            previous,
            account,
        }));
        Ok(())
    }

    /// Replace the lender. Owner-only.
    pub fn grant_lender(&mut self, caller: &AccountId, account: AccountId) -> Result<(), EscrowError> {
        let previous = self.roles.holder(Role::Lender);
        self.roles.grant_lender(caller, account)?;
        self.events.push(ContractEvent::RoleGranted(RoleGranted {
            role: Role::Lender,
            previous,
            account,
        }));
        Ok(())
    }

    pub fn check_access(&self, account: &AccountId, role: Role) -> bool {
        self.roles.check_access(account, role)
    }

    pub fn roles(&self) -> &AccessControlRegistry {
        &self.roles
    }

    // ───────────────────────── Lifecycle ─────────────────────────

    /// Create an agreement in state `Created`. Lender-only.
    pub fn create_loan_agreement(
        &mut self,
        caller: &AccountId,
        principal: Amount,
        duration_days: u32,
        interest_rate_bps: u32,
        now: i64,
    ) -> Result<LoanId, EscrowError> {
        self.roles.require_role(caller, Role::Lender)?;
        if principal == 0 {
            return Err(EscrowError::InvalidAmount);
        }

        let id = self.next_id;
        self.next_id = id.next().ok_or(EscrowError::IdsExhausted)?;

        self.loans.insert(
            id,
            LoanAgreement {
                id,
                lender: *caller,
                principal,
                duration_days,
                interest_rate_bps,
                settlement_asset: self.settlement_asset,
                created_at: now,
                status: LoanStatus::Created,
            },
        );

        debug!(loan_id = %id, principal, duration_days, interest_rate_bps, "Loan agreement created");
        self.events.push(ContractEvent::LoanCreated(LoanCreated {
            loan_id: id,
            lender: *caller,
            principal,
            duration_days,
            interest_rate_bps,
            settlement_asset: self.settlement_asset,
        }));
        Ok(id)
    }

    /// `Created → Verified`. Delegate-only.
    pub fn delegate_verify(&mut self, caller: &AccountId, loan_id: LoanId) -> Result<(), EscrowError> {
        self.roles.require_role(caller, Role::Delegate)?;
        let loan = self.loan_in_state(loan_id, LoanStatus::Created)?;
        loan.status = LoanStatus::Verified;

        debug!(loan_id = %loan_id, "Loan agreement verified");
        self.events.push(ContractEvent::LoanVerified(LoanVerified {
            loan_id,
            delegate: *caller,
        }));
        Ok(())
    }

    /// `Verified → Executed`. Any caller.
    ///
    /// Native settlement: `provided_value` is the value attached to the call
    /// (already credited to the escrow by the host) and must equal the
    /// principal. Token settlement: no value may be attached; the returned
    /// payment pulls the principal from the payer's allowance.
    pub fn execute_loan_agreement(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        provided_value: Amount,
    ) -> Result<Vec<Payment>, EscrowError> {
        let address = self.address;
        let payer = self.payer.unwrap_or(*caller);
        let loan = self.loan_in_state(loan_id, LoanStatus::Verified)?;
        let principal = loan.principal;

        let (payer, payments) = match loan.settlement_asset {
            SettlementAsset::Native => {
                if provided_value != principal {
                    return Err(EscrowError::AmountMismatch {
                        expected: principal,
                        provided: provided_value,
                    });
                }
                (*caller, Vec::new())
            }
            SettlementAsset::Token => {
                if provided_value != 0 {
                    return Err(EscrowError::AmountMismatch {
                        expected: 0,
                        provided: provided_value,
                    });
                }
                (payer, vec![Payment::pull(address, payer, address, principal)])
            }
        };

        loan.status = LoanStatus::Executed;

        debug!(loan_id = %loan_id, %payer, principal, "Loan agreement executed");
        self.events.push(ContractEvent::LoanExecuted(LoanExecuted {
            loan_id,
            payer,
            principal,
        }));
        Ok(payments)
    }

    /// Disburse `total` of the held balance. Delegate-only.
    ///
    /// `loan_id` tags the routing event; the funds come from the escrow's
    /// whole balance (`held`), not from that agreement.
    pub fn route_funds(
        &mut self,
        caller: &AccountId,
        loan_id: LoanId,
        total: Amount,
        split: Amount,
        held: Amount,
    ) -> Result<Vec<Payment>, EscrowError> {
        self.roles.require_role(caller, Role::Delegate)?;
        let disbursement = FundRouter::split(total, split)?;
        if held < total {
            return Err(EscrowError::InsufficientBalance {
                required: total,
                available: held,
            });
        }

        debug!(
            loan_id = %loan_id,
            total,
            delegate = disbursement.delegate,
            lender = disbursement.lender,
            treasury = disbursement.treasury,
            "Routing funds"
        );
        self.events.push(ContractEvent::FundsRouted(FundsRouted {
            loan_id,
            total,
            delegate_amount: disbursement.delegate,
            lender_amount: disbursement.lender,
            treasury_amount: disbursement.treasury,
        }));
        Ok(FundRouter::payments(
            &disbursement,
            self.settlement_asset,
            self.address,
            &self.roles,
        ))
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn settlement_asset(&self) -> SettlementAsset {
        self.settlement_asset
    }

    pub fn payer(&self) -> Option<AccountId> {
        self.payer
    }

    pub fn loan(&self, loan_id: LoanId) -> Option<&LoanAgreement> {
        self.loans.get(&loan_id)
    }

    /// Agreements in id order.
    pub fn loans(&self) -> impl Iterator<Item = &LoanAgreement> {
        self.loans.values()
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Internal ─────────────────────────

    pub(crate) fn reentrancy_guard_mut(&mut self) -> &mut ReentrancyGuard {
        &mut self.reentrancy_guard
    }

    fn loan_in_state(
        &mut self,
        loan_id: LoanId,
        required: LoanStatus,
    ) -> Result<&mut LoanAgreement, EscrowError> {
        let loan = self
            .loans
            .get_mut(&loan_id)
            .ok_or(EscrowError::NotFound { loan_id })?;
        if loan.status != required {
            return Err(EscrowError::InvalidState {
                loan_id,
                status: loan.status,
                required,
            });
        }
        Ok(loan)
    }
}
