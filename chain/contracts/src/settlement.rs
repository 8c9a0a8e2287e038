//! Settlement assets and outbound payment instructions
//!
//! Programs never move value themselves. A value-moving operation commits
//! its state transition and returns the `Payment`s it owes; the runtime
//! performs them afterwards, as the last step of the call.

use serde::{Deserialize, Serialize};
use std::fmt;
use types::ids::AccountId;
use types::numeric::Amount;

/// The asset a program settles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementAsset {
    /// The platform's built-in currency
    Native,
    /// The hosted fungible token
    Token,
}

impl fmt::Display for SettlementAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementAsset::Native => f.write_str("native"),
            SettlementAsset::Token => f.write_str("token"),
        }
    }
}

/// A single value movement owed by a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub asset: SettlementAsset,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    /// Set for allowance pulls: the program spending `from`'s allowance.
    pub spender: Option<AccountId>,
}

impl Payment {
    /// Direct send from a program-held balance.
    pub fn send(asset: SettlementAsset, from: AccountId, to: AccountId, amount: Amount) -> Self {
        Self {
            asset,
            from,
            to,
            amount,
            spender: None,
        }
    }

    /// Token pull from `owner` through `spender`'s allowance.
    pub fn pull(spender: AccountId, owner: AccountId, to: AccountId, amount: Amount) -> Self {
        Self {
            asset: SettlementAsset::Token,
            from: owner,
            to,
            amount,
            spender: Some(spender),
        }
    }

    pub fn is_pull(&self) -> bool {
        self.spender.is_some()
    }
}
