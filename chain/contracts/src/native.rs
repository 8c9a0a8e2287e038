//! Native currency bank
//!
//! The platform's built-in value unit. Balances live with the host rather
//! than with any program; programs hold native value in their own account.

use tracing::debug;
use types::ids::AccountId;
use types::numeric::Amount;

use crate::balances::BalanceBook;
use crate::errors::BalanceError;

#[derive(Debug, Clone, Default)]
pub struct NativeBank {
    balances: BalanceBook,
}

impl NativeBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account)
    }

    /// Issue new native value to an account (genesis allocation / faucet).
    pub fn mint(&mut self, account: AccountId, amount: Amount) -> Result<(), BalanceError> {
        self.balances.credit(account, amount)?;
        debug!(%account, amount, "Native value minted");
        Ok(())
    }

    /// Move native value between accounts.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), BalanceError> {
        self.balances.move_balance(from, to, amount)?;
        debug!(%from, %to, amount, "Native value transferred");
        Ok(())
    }

    /// Total native value in existence. `None` if it exceeds `Amount`.
    pub fn total_issued(&self) -> Option<Amount> {
        self.balances.sum()
    }
}
