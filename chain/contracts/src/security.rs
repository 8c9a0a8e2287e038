//! Shared security primitives for contract modules
//!
//! Provides the reentrancy guard and the role registry used by the loan
//! escrow, and the role vocabulary used by every privileged entry point.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use types::ids::AccountId;

use crate::errors::AccessError;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// A value-moving entry point acquires the guard before executing and
/// releases it once its outbound transfers are done. Any nested call
/// attempt made from recipient code in between fails.
#[derive(Debug, Clone)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard. Returns `true` if successfully acquired.
    /// Returns `false` if already locked (reentrancy attempt).
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Release the guard.
    pub fn release(&mut self) {
        self.locked = false;
    }

    /// Check if currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed set of privileged roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Deployer; grants Delegate and Lender. Immutable.
    Owner,
    /// Verifies agreements and routes funds; receives the split share
    Delegate,
    /// Creates agreements; receives half of the remainder
    Lender,
    /// Receives the other half of the remainder plus truncation dust. Immutable.
    Treasury,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "Owner",
            Role::Delegate => "Delegate",
            Role::Lender => "Lender",
            Role::Treasury => "Treasury",
        };
        f.write_str(name)
    }
}

/// Single-holder role table.
///
/// Each role is held by exactly one account. Checks are independent, so one
/// account may hold several roles at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlRegistry {
    owner: AccountId,
    delegate: AccountId,
    lender: AccountId,
    treasury: AccountId,
}

impl AccessControlRegistry {
    pub fn new(
        owner: AccountId,
        delegate: AccountId,
        lender: AccountId,
        treasury: AccountId,
    ) -> Self {
        Self {
            owner,
            delegate,
            lender,
            treasury,
        }
    }

    /// Current holder of a role.
    pub fn holder(&self, role: Role) -> AccountId {
        match role {
            Role::Owner => self.owner,
            Role::Delegate => self.delegate,
            Role::Lender => self.lender,
            Role::Treasury => self.treasury,
        }
    }

    /// Check if an account holds the specified role. No state change.
    pub fn check_access(&self, account: &AccountId, role: Role) -> bool {
        self.holder(role) == *account
    }

    /// Fail with `Unauthorized` unless the account holds the role.
    pub fn require_role(&self, account: &AccountId, role: Role) -> Result<(), AccessError> {
        if !self.check_access(account, role) {
            return Err(AccessError::Unauthorized {
                account: *account,
                role,
            });
        }
        Ok(())
    }

    /// Replace the delegate. Owner-only; the previous holder loses the role.
    pub fn grant_delegate(&mut self, caller: &AccountId, account: AccountId) -> Result<(), AccessError> {
        self.require_role(caller, Role::Owner)?;
        debug!(previous = %self.delegate, next = %account, "Delegate role granted");
        self.delegate = account;
        Ok(())
    }

    /// Replace the lender. Owner-only; the previous holder loses the role.
    pub fn grant_lender(&mut self, caller: &AccountId, account: AccountId) -> Result<(), AccessError> {
        self.require_role(caller, Role::Owner)?;
        debug!(previous = %self.lender, next = %account, "Lender role granted");
        self.lender = account;
        Ok(())
    }
}
