//! Per-account balance book with checked arithmetic
//!
//! Shared by the native bank and the fungible ledger. Every mutation is
//! validated before anything is written, so a failed move leaves both
//! sides untouched.

use std::collections::HashMap;
use types::ids::AccountId;
use types::numeric::Amount;

use crate::errors::BalanceError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BalanceBook {
    balances: HashMap<AccountId, Amount>,
}

impl BalanceBook {
    /// A book holding `amount` for a single account.
    pub(crate) fn with_balance(account: AccountId, amount: Amount) -> Self {
        Self {
            balances: HashMap::from([(account, amount)]),
        }
    }

    pub(crate) fn get(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit with overflow protection.
    pub(crate) fn credit(&mut self, account: AccountId, amount: Amount) -> Result<(), BalanceError> {
        let current = self.get(&account);
        let next = current.checked_add(amount).ok_or(BalanceError::Overflow)?;
        self.balances.insert(account, next);
        Ok(())
    }

    /// Debit with underflow protection.
    pub(crate) fn debit(&mut self, account: AccountId, amount: Amount) -> Result<(), BalanceError> {
        let current = self.get(&account);
        if current < amount {
            return Err(BalanceError::InsufficientBalance {
                account,
                required: amount,
                available: current,
            });
        }
        self.balances.insert(account, current - amount);
        Ok(())
    }

    /// Move `amount` from one account to another, all or nothing.
    pub(crate) fn move_balance(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), BalanceError> {
        let available = self.get(&from);
        if available < amount {
            return Err(BalanceError::InsufficientBalance {
                account: from,
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        self.get(&to).checked_add(amount).ok_or(BalanceError::Overflow)?;

        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Sum of all balances. `None` if the sum itself overflows.
    pub(crate) fn sum(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0u128, |acc, v| acc.checked_add(*v))
    }
}
