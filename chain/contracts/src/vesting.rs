//! Vesting schedule ledger: per-beneficiary linear release plans
//!
//! Each beneficiary owns an append-only list of schedules indexed from 0.
//! A schedule releases `amount` linearly between `start` and
//! `start + duration`:
//!
//! ```text
//! vested(t) = 0                                  if t < start
//!           = amount * (t - start) / duration    if start <= t < start + duration
//!           = amount                             otherwise
//! ```
//!
//! Invariant: `claimed_amount <= amount`, and `claimed_amount` never
//! decreases.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use types::ids::AccountId;
use types::numeric::Amount;

use crate::errors::{AccessError, VestingError};
use crate::events::{ContractEvent, VestingRevoked, VestingScheduleSet};
use crate::security::Role;

/// A single linear vesting schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub beneficiary: AccountId,
    pub index: usize,
    pub amount: Amount,
    pub revocable: bool,
    /// Unix seconds
    pub start: i64,
    /// Seconds
    pub duration: u64,
    pub claimed_amount: Amount,
    /// Once revoked, `amount` is frozen at what had vested and is fully vested.
    pub revoked: bool,
}

impl VestingSchedule {
    /// Quantity vested at time `t`, floored.
    pub fn vested_at(&self, t: i64) -> Amount {
        if self.revoked {
            return self.amount;
        }
        if t < self.start {
            return 0;
        }

        // Non-negative; i128 cannot overflow on the difference of two i64.
        let elapsed = (i128::from(t) - i128::from(self.start)) as u128;
        let duration = u128::from(self.duration);
        if elapsed >= duration {
            return self.amount;
        }
        linear_fraction(self.amount, elapsed, duration)
    }

    /// Vested but not yet claimed at time `t`; never negative.
    pub fn claimable_at(&self, t: i64) -> Amount {
        self.vested_at(t).saturating_sub(self.claimed_amount)
    }
}

/// `floor(amount * elapsed / duration)` for `elapsed < duration`, computed
/// without overflowing for any `amount`.
fn linear_fraction(amount: Amount, elapsed: u128, duration: u128) -> Amount {
    let whole = amount / duration;
    let rest = amount % duration;
    // rest < duration <= u64::MAX and elapsed < duration, so rest * elapsed fits.
    whole * elapsed + rest * elapsed / duration
}

/// Owner-administered store of vesting schedules.
#[derive(Debug, Clone)]
pub struct VestingScheduleLedger {
    owner: AccountId,
    schedules: HashMap<AccountId, Vec<VestingSchedule>>,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl VestingScheduleLedger {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            schedules: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    // ───────────────────────── Administration ─────────────────────────

    /// Append a schedule for `beneficiary`. Owner-only. Returns its index.
    pub fn set_vesting_schedule(
        &mut self,
        caller: &AccountId,
        beneficiary: AccountId,
        amount: Amount,
        revocable: bool,
        start: i64,
        duration: u64,
    ) -> Result<usize, VestingError> {
        self.require_owner(caller)?;
        if amount == 0 {
            return Err(VestingError::InvalidAmount);
        }
        if duration == 0 {
            return Err(VestingError::InvalidDuration);
        }

        let list = self.schedules.entry(beneficiary).or_default();
        let index = list.len();
        list.push(VestingSchedule {
            beneficiary,
            index,
            amount,
            revocable,
            start,
            duration,
            claimed_amount: 0,
            revoked: false,
        });

        debug!(%beneficiary, index, amount, start, duration, "Vesting schedule set");
        self.events.push(ContractEvent::VestingScheduleSet(VestingScheduleSet {
            beneficiary,
            index,
            amount,
            revocable,
            start,
            duration,
        }));
        Ok(index)
    }

    /// Stop a revocable schedule at `now`. Owner-only.
    ///
    /// The schedule keeps what had vested (never less than what was already
    /// claimed); the rest is forfeited. Returns the forfeited quantity.
    pub fn revoke(
        &mut self,
        caller: &AccountId,
        beneficiary: AccountId,
        index: usize,
        now: i64,
    ) -> Result<Amount, VestingError> {
        self.require_owner(caller)?;
        let schedule = self.schedule_mut(&beneficiary, index)?;
        if !schedule.revocable {
            return Err(VestingError::NotRevocable { beneficiary, index });
        }
        if schedule.revoked {
            return Err(VestingError::AlreadyRevoked { beneficiary, index });
        }

        let vested = schedule.vested_at(now).max(schedule.claimed_amount);
        let forfeited = schedule.amount - vested;
        schedule.amount = vested;
        schedule.revoked = true;

        debug!(%beneficiary, index, vested, forfeited, "Vesting schedule revoked");
        self.events.push(ContractEvent::VestingRevoked(VestingRevoked {
            beneficiary,
            index,
            vested,
            forfeited,
        }));
        Ok(forfeited)
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Snapshot of one schedule.
    pub fn get_vesting(&self, beneficiary: &AccountId, index: usize) -> Result<&VestingSchedule, VestingError> {
        self.schedules_of(beneficiary)
            .get(index)
            .ok_or(VestingError::NotFound {
                beneficiary: *beneficiary,
                index,
            })
    }

    /// All schedules of a beneficiary, in index order.
    pub fn schedules_of(&self, beneficiary: &AccountId) -> &[VestingSchedule] {
        self.schedules
            .get(beneficiary)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn vested_amount(&self, beneficiary: &AccountId, index: usize, t: i64) -> Result<Amount, VestingError> {
        Ok(self.get_vesting(beneficiary, index)?.vested_at(t))
    }

    /// Total claimable across every schedule of a beneficiary.
    pub fn claimable_amount(&self, beneficiary: &AccountId, t: i64) -> Result<Amount, VestingError> {
        self.schedules_of(beneficiary)
            .iter()
            .try_fold(0u128, |acc, s| acc.checked_add(s.claimable_at(t)))
            .ok_or(VestingError::Overflow)
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Internal ─────────────────────────

    /// Add `amount` to a schedule's claimed total, refusing to exceed what
    /// has vested at `t`.
    pub(crate) fn record_claim(
        &mut self,
        beneficiary: &AccountId,
        index: usize,
        amount: Amount,
        t: i64,
    ) -> Result<(), VestingError> {
        let schedule = self.schedule_mut(beneficiary, index)?;
        if amount > schedule.claimable_at(t) {
            return Err(VestingError::NothingToClaim {
                beneficiary: *beneficiary,
            });
        }
        schedule.claimed_amount += amount;
        Ok(())
    }

    fn require_owner(&self, caller: &AccountId) -> Result<(), AccessError> {
        if *caller != self.owner {
            return Err(AccessError::Unauthorized {
                account: *caller,
                role: Role::Owner,
            });
        }
        Ok(())
    }

    fn schedule_mut(&mut self, beneficiary: &AccountId, index: usize) -> Result<&mut VestingSchedule, VestingError> {
        self.schedules
            .get_mut(beneficiary)
            .and_then(|list| list.get_mut(index))
            .ok_or(VestingError::NotFound {
                beneficiary: *beneficiary,
                index,
            })
    }
}
