//! Runtime: the host that executes calls against the programs
//!
//! Every entry point runs as one atomic transition:
//! 1. snapshot all program state
//! 2. acquire the program's reentrancy guard (value-moving calls)
//! 3. checks and effects inside the program
//! 4. outbound payments, with account hooks
//! 5. commit, or restore the snapshot on any error
//!
//! Hooks model code running at an account when value moves. They receive the
//! runtime itself, so they can read state and submit nested calls while a
//! payment is in flight.

use chrono::Utc;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, warn};
use types::ids::{AccountId, LoanId};
use types::numeric::Amount;

use crate::claim::ClaimProcessor;
use crate::config::{ConfigError, RuntimeConfig};
use crate::errors::{CallError, VestingError};
use crate::escrow::{LoanAgreement, LoanAgreementLedger};
use crate::native::NativeBank;
use crate::security::{AccessControlRegistry, Role};
use crate::settlement::{Payment, SettlementAsset};
use crate::token::FungibleBalanceLedger;
use crate::vesting::{VestingSchedule, VestingScheduleLedger};

const ESCROW: &str = "escrow";
const CLAIMS: &str = "claims";

/// A hook's refusal of a payment. Fails the payment with `TransferFailed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Code attached to an account, run when value moves to or from it.
///
/// A hook is not re-entered: payments it causes to its own account while it
/// runs do not trigger it again.
pub trait AccountHook {
    /// Value was credited to the account.
    fn on_receive(&mut self, _runtime: &mut Runtime, _payment: &Payment) -> Result<(), Rejection> {
        Ok(())
    }

    /// A program is about to pull tokens from the account via its allowance.
    fn on_send(&mut self, _runtime: &mut Runtime, _payment: &Payment) -> Result<(), Rejection> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum HookPoint {
    Send,
    Receive,
}

/// Hooks are shared so the registry can be snapshotted with the state.
type SharedHook = Rc<RefCell<Box<dyn AccountHook>>>;

/// All state a call may touch; cloned as the rollback snapshot.
#[derive(Debug, Clone)]
struct RuntimeState {
    native: NativeBank,
    token: FungibleBalanceLedger,
    escrow: LoanAgreementLedger,
    vesting: VestingScheduleLedger,
    claims: ClaimProcessor,
}

pub struct Runtime {
    state: RuntimeState,
    hooks: HashMap<AccountId, SharedHook>,
    block_time: i64,
    depth: usize,
}

impl Runtime {
    /// Deploy the token, the escrow, the vesting ledger and the claim
    /// processor described by `config`.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        let supply = config.token.initial_supply_units()?;
        let token = FungibleBalanceLedger::new(
            config.token.symbol.clone(),
            config.token.decimals,
            supply,
            config.token.holder,
        );
        let roles =
            AccessControlRegistry::new(config.owner, config.delegate, config.lender, config.treasury);
        let escrow = LoanAgreementLedger::new(
            AccountId::new(),
            roles,
            config.loan_settlement,
            config.loan_payer,
        );
        let claims = ClaimProcessor::new(AccountId::new());
        let block_time = config.genesis_time.unwrap_or_else(|| Utc::now().timestamp());

        info!(
            escrow = %escrow.address(),
            claims = %claims.address(),
            settlement = %config.loan_settlement,
            token = %config.token.symbol,
            supply,
            block_time,
            "Runtime initialized"
        );

        Ok(Self {
            state: RuntimeState {
                native: NativeBank::new(),
                token,
                escrow,
                vesting: VestingScheduleLedger::new(config.owner),
                claims,
            },
            hooks: HashMap::new(),
            block_time,
            depth: 0,
        })
    }

    // ───────────────────────── Clock & hooks ─────────────────────────

    pub fn block_time(&self) -> i64 {
        self.block_time
    }

    pub fn set_block_time(&mut self, time: i64) {
        self.block_time = time;
    }

    pub fn advance_time(&mut self, seconds: i64) {
        self.block_time = self.block_time.saturating_add(seconds);
    }

    /// Attach code to an account, replacing any previous hook.
    ///
    /// Registry changes made from inside a call are undone if that call
    /// reverts.
    pub fn register_hook(&mut self, account: AccountId, hook: Box<dyn AccountHook>) {
        self.hooks.insert(account, Rc::new(RefCell::new(hook)));
    }

    /// Detach an account's hook. Returns whether one was registered.
    pub fn remove_hook(&mut self, account: &AccountId) -> bool {
        self.hooks.remove(account).is_some()
    }

    pub fn has_hook(&self, account: &AccountId) -> bool {
        self.hooks.contains_key(account)
    }

    // ───────────────────────── Roles ─────────────────────────

    pub fn grant_delegate(&mut self, caller: AccountId, account: AccountId) -> Result<(), CallError> {
        self.transact("grant_delegate", caller, |rt| {
            Ok(rt.state.escrow.grant_delegate(&caller, account)?)
        })
    }

    pub fn grant_lender(&mut self, caller: AccountId, account: AccountId) -> Result<(), CallError> {
        self.transact("grant_lender", caller, |rt| {
            Ok(rt.state.escrow.grant_lender(&caller, account)?)
        })
    }

    pub fn check_access(&self, account: &AccountId, role: Role) -> bool {
        self.state.escrow.check_access(account, role)
    }

    // ───────────────────────── Loan escrow ─────────────────────────

    pub fn create_loan_agreement(
        &mut self,
        caller: AccountId,
        principal: Amount,
        duration_days: u32,
        interest_rate_bps: u32,
    ) -> Result<LoanId, CallError> {
        self.transact("create_loan_agreement", caller, |rt| {
            let now = rt.block_time;
            Ok(rt.state.escrow.create_loan_agreement(
                &caller,
                principal,
                duration_days,
                interest_rate_bps,
                now,
            )?)
        })
    }

    pub fn delegate_verify(&mut self, caller: AccountId, loan_id: LoanId) -> Result<(), CallError> {
        self.transact("delegate_verify", caller, |rt| {
            Ok(rt.state.escrow.delegate_verify(&caller, loan_id)?)
        })
    }

    /// Execute a verified agreement, attaching `value` native units.
    ///
    /// The attached value moves to the escrow before the program runs and
    /// comes back with the rollback if the call fails.
    pub fn execute_loan_agreement(
        &mut self,
        caller: AccountId,
        loan_id: LoanId,
        value: Amount,
    ) -> Result<(), CallError> {
        self.transact("execute_loan_agreement", caller, |rt| {
            rt.enter(ESCROW)?;
            if value > 0 {
                let escrow = rt.state.escrow.address();
                rt.state.native.transfer(caller, escrow, value)?;
            }
            let payments = rt.state.escrow.execute_loan_agreement(&caller, loan_id, value)?;
            rt.settle(&payments)?;
            rt.exit(ESCROW);
            Ok(())
        })
    }

    /// Disburse `total` of the escrow's held balance; `split` to the
    /// delegate, the remainder to lender and treasury. Returns the payments
    /// made.
    pub fn route_funds(
        &mut self,
        caller: AccountId,
        loan_id: LoanId,
        total: Amount,
        split: Amount,
    ) -> Result<Vec<Payment>, CallError> {
        self.transact("route_funds", caller, |rt| {
            rt.enter(ESCROW)?;
            let held = rt.held_balance();
            let payments = rt.state.escrow.route_funds(&caller, loan_id, total, split, held)?;
            rt.settle(&payments)?;
            rt.exit(ESCROW);
            Ok(payments)
        })
    }

    // ───────────────────────── Vesting ─────────────────────────

    pub fn set_vesting_schedule(
        &mut self,
        caller: AccountId,
        beneficiary: AccountId,
        amount: Amount,
        revocable: bool,
        start: i64,
        duration: u64,
    ) -> Result<usize, CallError> {
        self.transact("set_vesting_schedule", caller, |rt| {
            Ok(rt.state.vesting.set_vesting_schedule(
                &caller,
                beneficiary,
                amount,
                revocable,
                start,
                duration,
            )?)
        })
    }

    /// Revoke a schedule at the current block time. Returns the forfeited
    /// quantity.
    pub fn revoke_vesting(
        &mut self,
        caller: AccountId,
        beneficiary: AccountId,
        index: usize,
    ) -> Result<Amount, CallError> {
        self.transact("revoke_vesting", caller, |rt| {
            let now = rt.block_time;
            Ok(rt.state.vesting.revoke(&caller, beneficiary, index, now)?)
        })
    }

    pub fn get_vesting(&self, beneficiary: &AccountId, index: usize) -> Result<&VestingSchedule, VestingError> {
        self.state.vesting.get_vesting(beneficiary, index)
    }

    /// Claim the caller's vested tokens at the current block time.
    pub fn claim_tokens(&mut self, caller: AccountId) -> Result<Amount, CallError> {
        self.transact("claim_tokens", caller, |rt| {
            rt.enter(CLAIMS)?;
            let now = rt.block_time;
            let state = &mut rt.state;
            let claim = state.claims.claim_tokens(&mut state.vesting, &caller, now)?;
            rt.pay(&claim.payment)?;
            rt.exit(CLAIMS);
            Ok(claim.amount)
        })
    }

    // ───────────────────────── Native currency ─────────────────────────

    /// Issue native value outside any call (genesis allocation / faucet).
    pub fn fund_native(&mut self, account: AccountId, amount: Amount) -> Result<(), CallError> {
        Ok(self.state.native.mint(account, amount)?)
    }

    /// Plain native transfer; runs the recipient's hook.
    pub fn send_native(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<(), CallError> {
        self.transact("send_native", from, |rt| {
            rt.pay(&Payment::send(SettlementAsset::Native, from, to, amount))
        })
    }

    // ───────────────────────── Token ─────────────────────────

    pub fn transfer(&mut self, caller: AccountId, to: AccountId, amount: Amount) -> Result<(), CallError> {
        self.transact("transfer", caller, |rt| {
            rt.pay(&Payment::send(SettlementAsset::Token, caller, to, amount))
        })
    }

    pub fn approve(&mut self, caller: AccountId, spender: AccountId, amount: Amount) -> Result<(), CallError> {
        self.transact("approve", caller, |rt| {
            rt.state.token.approve(caller, spender, amount);
            Ok(())
        })
    }

    pub fn transfer_from(
        &mut self,
        caller: AccountId,
        owner: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), CallError> {
        self.transact("transfer_from", caller, |rt| {
            rt.pay(&Payment::pull(caller, owner, to, amount))
        })
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn native_balance(&self, account: &AccountId) -> Amount {
        self.state.native.balance_of(account)
    }

    pub fn token_balance(&self, account: &AccountId) -> Amount {
        self.state.token.balance_of(account)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.state.token.allowance(owner, spender)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.token.total_supply()
    }

    /// Sum of all token balances still equals the fixed total supply.
    pub fn token_supply_conserved(&self) -> bool {
        self.state.token.circulating() == Some(self.state.token.total_supply())
    }

    pub fn loan(&self, loan_id: LoanId) -> Option<&LoanAgreement> {
        self.state.escrow.loan(loan_id)
    }

    pub fn escrow_address(&self) -> AccountId {
        self.state.escrow.address()
    }

    pub fn claims_address(&self) -> AccountId {
        self.state.claims.address()
    }

    /// The escrow's balance in its settlement asset.
    pub fn held_balance(&self) -> Amount {
        let escrow = self.state.escrow.address();
        match self.state.escrow.settlement_asset() {
            SettlementAsset::Native => self.state.native.balance_of(&escrow),
            SettlementAsset::Token => self.state.token.balance_of(&escrow),
        }
    }

    pub fn escrow(&self) -> &LoanAgreementLedger {
        &self.state.escrow
    }

    pub fn vesting(&self) -> &VestingScheduleLedger {
        &self.state.vesting
    }

    pub fn claims(&self) -> &ClaimProcessor {
        &self.state.claims
    }

    pub fn token(&self) -> &FungibleBalanceLedger {
        &self.state.token
    }

    /// Nesting depth of the call currently executing; 0 between calls.
    pub fn call_depth(&self) -> usize {
        self.depth
    }

    // ───────────────────────── Internal ─────────────────────────

    /// Run `op` as one atomic call: its effects commit only if it succeeds.
    fn transact<T>(
        &mut self,
        call: &'static str,
        caller: AccountId,
        op: impl FnOnce(&mut Self) -> Result<T, CallError>,
    ) -> Result<T, CallError> {
        let snapshot = self.state.clone();
        let hooks = self.hooks.clone();
        self.depth += 1;
        let result = op(self);
        self.depth -= 1;

        match &result {
            Ok(_) => info!(call, %caller, depth = self.depth, "Call committed"),
            Err(err) => {
                self.state = snapshot;
                self.hooks = hooks;
                warn!(call, %caller, depth = self.depth, error = %err, "Call reverted");
            }
        }
        result
    }

    fn enter(&mut self, program: &'static str) -> Result<(), CallError> {
        let guard = match program {
            ESCROW => self.state.escrow.reentrancy_guard_mut(),
            _ => self.state.claims.reentrancy_guard_mut(),
        };
        if !guard.acquire() {
            return Err(CallError::Reentrancy { program });
        }
        Ok(())
    }

    fn exit(&mut self, program: &'static str) {
        match program {
            ESCROW => self.state.escrow.reentrancy_guard_mut().release(),
            _ => self.state.claims.reentrancy_guard_mut().release(),
        }
    }

    fn settle(&mut self, payments: &[Payment]) -> Result<(), CallError> {
        for payment in payments {
            self.pay(payment)?;
        }
        Ok(())
    }

    /// Perform one payment: sender hook (pulls only), balance move,
    /// recipient hook.
    fn pay(&mut self, payment: &Payment) -> Result<(), CallError> {
        if payment.is_pull() {
            self.run_hook(payment.from, payment, HookPoint::Send)?;
        }

        match (payment.asset, payment.spender) {
            (SettlementAsset::Native, _) => {
                self.state
                    .native
                    .transfer(payment.from, payment.to, payment.amount)?
            }
            (SettlementAsset::Token, Some(spender)) => self.state.token.transfer_from(
                spender,
                payment.from,
                payment.to,
                payment.amount,
            )?,
            (SettlementAsset::Token, None) => {
                self.state
                    .token
                    .transfer(payment.from, payment.to, payment.amount)?
            }
        }
        debug!(
            asset = %payment.asset,
            from = %payment.from,
            to = %payment.to,
            amount = payment.amount,
            "Payment settled"
        );

        self.run_hook(payment.to, payment, HookPoint::Receive)
    }

    fn run_hook(&mut self, account: AccountId, payment: &Payment, point: HookPoint) -> Result<(), CallError> {
        let shared = match self.hooks.get(&account) {
            Some(hook) => Rc::clone(hook),
            None => return Ok(()),
        };
        // Already running further up the stack.
        let mut hook = match shared.try_borrow_mut() {
            Ok(hook) => hook,
            Err(_) => return Ok(()),
        };

        let outcome = match point {
            HookPoint::Send => hook.on_send(self, payment),
            HookPoint::Receive => hook.on_receive(self, payment),
        };

        outcome.map_err(|rejection| CallError::TransferFailed {
            account,
            reason: rejection.reason,
        })
    }
}
