//! Runtime configuration
//!
//! Describes one deployment: the role holders, how loans settle, and the
//! hosted token. Loadable from JSON:
//!
//! ```json
//! {
//!   "owner": "0190…", "delegate": "0190…", "lender": "0190…", "treasury": "0190…",
//!   "loan_settlement": "token",
//!   "token": { "symbol": "DAO", "decimals": 18, "initial_supply": "1000", "holder": "0190…" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::errors::UnitsError;
use types::ids::AccountId;
use types::numeric::{parse_units, Amount, NATIVE_DECIMALS};

use crate::settlement::SettlementAsset;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(String),

    #[error("Invalid amount in {field}: {source}")]
    Amount {
        field: &'static str,
        #[source]
        source: UnitsError,
    },
}

/// The hosted fungible token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Whole tokens, as a decimal string (e.g. `"1000000"` or `"0.5"`)
    pub initial_supply: String,
    /// Receives the whole initial supply
    pub holder: AccountId,
}

impl TokenConfig {
    pub fn new(symbol: impl Into<String>, initial_supply: impl Into<String>, holder: AccountId) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: default_decimals(),
            initial_supply: initial_supply.into(),
            holder,
        }
    }

    /// Initial supply in smallest units.
    pub fn initial_supply_units(&self) -> Result<Amount, ConfigError> {
        parse_units(&self.initial_supply, self.decimals).map_err(|source| ConfigError::Amount {
            field: "token.initial_supply",
            source,
        })
    }
}

/// One deployment of the escrow and vesting programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    pub owner: AccountId,
    pub delegate: AccountId,
    pub lender: AccountId,
    pub treasury: AccountId,
    #[serde(default = "default_settlement")]
    pub loan_settlement: SettlementAsset,
    /// Fixed payer for token-settled loans; the executing caller otherwise
    #[serde(default)]
    pub loan_payer: Option<AccountId>,
    pub token: TokenConfig,
    /// Initial block time in unix seconds; wall clock when absent
    #[serde(default)]
    pub genesis_time: Option<i64>,
}

impl RuntimeConfig {
    /// Native-settled deployment with the given parties.
    pub fn new(
        owner: AccountId,
        delegate: AccountId,
        lender: AccountId,
        treasury: AccountId,
        token: TokenConfig,
    ) -> Self {
        Self {
            owner,
            delegate,
            lender,
            treasury,
            loan_settlement: default_settlement(),
            loan_payer: None,
            token,
            genesis_time: None,
        }
    }

    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Settle loans in the hosted token instead of native currency.
    pub fn with_token_settlement(mut self, payer: Option<AccountId>) -> Self {
        self.loan_settlement = SettlementAsset::Token;
        self.loan_payer = payer;
        self
    }

    pub fn with_genesis_time(mut self, time: i64) -> Self {
        self.genesis_time = Some(time);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token.initial_supply_units().map(|_| ())
    }
}

fn default_decimals() -> u32 {
    NATIVE_DECIMALS
}

fn default_settlement() -> SettlementAsset {
    SettlementAsset::Native
}
