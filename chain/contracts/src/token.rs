//! Fungible balance ledger
//!
//! A fixed-supply token: the whole supply is minted to one holder at
//! creation and only moves afterwards. Supports direct transfers and
//! allowance-based pulls.
//!
//! Invariant: the sum of all balances equals `total_supply` at all times.

use std::collections::HashMap;
use tracing::debug;
use types::ids::AccountId;
use types::numeric::Amount;

use crate::balances::BalanceBook;
use crate::errors::BalanceError;
use crate::events::{Approval, ContractEvent, Transfer};

/// Allowance value that is never decremented by `transfer_from`.
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

#[derive(Debug, Clone)]
pub struct FungibleBalanceLedger {
    symbol: String,
    decimals: u32,
    total_supply: Amount,
    balances: BalanceBook,
    /// (owner, spender) -> remaining allowance
    allowances: HashMap<(AccountId, AccountId), Amount>,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl FungibleBalanceLedger {
    /// Create the token, minting `initial_supply` to `holder`.
    pub fn new(
        symbol: impl Into<String>,
        decimals: u32,
        initial_supply: Amount,
        holder: AccountId,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            total_supply: initial_supply,
            balances: BalanceBook::with_balance(holder, initial_supply),
            allowances: HashMap::new(),
            events: vec![ContractEvent::Transfer(Transfer {
                from: None,
                to: holder,
                amount: initial_supply,
            })],
        }
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    // ───────────────────────── Mutations ─────────────────────────

    /// Move `amount` from the caller to `to`.
    pub fn transfer(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), BalanceError> {
        self.balances.move_balance(caller, to, amount)?;
        self.record_transfer(caller, to, amount);
        Ok(())
    }

    /// Set the spender's allowance over the caller's balance (overwrites).
    pub fn approve(&mut self, caller: AccountId, spender: AccountId, amount: Amount) {
        self.allowances.insert((caller, spender), amount);
        debug!(owner = %caller, %spender, amount, symbol = %self.symbol, "Allowance set");
        self.events.push(ContractEvent::Approval(Approval {
            owner: caller,
            spender,
            amount,
        }));
    }

    /// Pull `amount` from `owner` to `to` using the spender's allowance.
    ///
    /// Checks allowance first, then balance; nothing is written unless both
    /// pass.
    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        owner: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), BalanceError> {
        let allowed = self.allowance(&owner, &spender);
        if allowed < amount {
            return Err(BalanceError::InsufficientAllowance {
                owner,
                spender,
                required: amount,
                available: allowed,
            });
        }

        self.balances.move_balance(owner, to, amount)?;

        if allowed != UNLIMITED_ALLOWANCE {
            self.allowances.insert((owner, spender), allowed - amount);
        }
        self.record_transfer(owner, to, amount);
        Ok(())
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    fn record_transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) {
        debug!(%from, %to, amount, symbol = %self.symbol, "Token transfer");
        self.events.push(ContractEvent::Transfer(Transfer {
            from: Some(from),
            to,
            amount,
        }));
    }

    /// Sum of balances; equals total supply unless the ledger is corrupt.
    pub(crate) fn circulating(&self) -> Option<Amount> {
        self.balances.sum()
    }
}
