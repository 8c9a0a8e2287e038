//! Claim processor: pays out vested tokens
//!
//! The processor holds the token pool in its own account. A claim walks the
//! caller's schedules, books every claimable portion against its schedule,
//! and only then returns the single payment that moves the tokens. A
//! reentrant claim made while that payment is in flight sees the updated
//! `claimed_amount`s and finds nothing left.

use serde::{Deserialize, Serialize};
use tracing::debug;
use types::ids::AccountId;
use types::numeric::Amount;

use crate::errors::VestingError;
use crate::events::{ContractEvent, TokensClaimed};
use crate::security::ReentrancyGuard;
use crate::settlement::{Payment, SettlementAsset};
use crate::vesting::VestingScheduleLedger;

/// Result of a successful claim: the booked quantity and the payment owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub amount: Amount,
    pub payment: Payment,
}

#[derive(Debug, Clone)]
pub struct ClaimProcessor {
    address: AccountId,
    reentrancy_guard: ReentrancyGuard,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl ClaimProcessor {
    pub fn new(address: AccountId) -> Self {
        Self {
            address,
            reentrancy_guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> AccountId {
        self.address
    }

    /// Claim everything vested and unclaimed for `caller` at time `now`.
    ///
    /// Fails with `NothingToClaim` when the total is zero, which is what a
    /// second claim in the same instant always hits.
    pub fn claim_tokens(
        &mut self,
        vesting: &mut VestingScheduleLedger,
        caller: &AccountId,
        now: i64,
    ) -> Result<Claim, VestingError> {
        let portions: Vec<(usize, Amount)> = vesting
            .schedules_of(caller)
            .iter()
            .map(|s| (s.index, s.claimable_at(now)))
            .filter(|(_, amount)| *amount > 0)
            .collect();

        let total = portions
            .iter()
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(VestingError::Overflow)?;
        if total == 0 {
            return Err(VestingError::NothingToClaim {
                beneficiary: *caller,
            });
        }

        for (index, amount) in &portions {
            vesting.record_claim(caller, *index, *amount, now)?;
        }

        debug!(beneficiary = %caller, amount = total, schedules = portions.len(), "Tokens claimed");
        self.events.push(ContractEvent::TokensClaimed(TokensClaimed {
            beneficiary: *caller,
            amount: total,
            claimed_at: now,
        }));

        Ok(Claim {
            amount: total,
            payment: Payment::send(SettlementAsset::Token, self.address, *caller, total),
        })
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn reentrancy_guard_mut(&mut self) -> &mut ReentrancyGuard {
        &mut self.reentrancy_guard
    }
}
