//! Security Hardening Tests
//!
//! Adversarial scenarios against the runtime:
//! - Reentrancy from account hooks during payouts
//! - Rejected payments and all-or-nothing rollback
//! - Permission escalation
//! - Fuzz testing (proptest)
//! - Upgrade path (ABI freeze)

use std::cell::RefCell;
use std::rc::Rc;

use contracts::config::{RuntimeConfig, TokenConfig};
use contracts::errors::{CallError, EscrowError};
use contracts::escrow::LoanStatus;
use contracts::runtime::{AccountHook, Rejection, Runtime};
use contracts::security::Role;
use contracts::settlement::Payment;
use contracts::CONTRACT_ABI_VERSION;
use types::ids::{AccountId, LoanId};

struct Parties {
    owner: AccountId,
    delegate: AccountId,
    lender: AccountId,
    treasury: AccountId,
}

fn parties() -> Parties {
    Parties {
        owner: AccountId::new(),
        delegate: AccountId::new(),
        lender: AccountId::new(),
        treasury: AccountId::new(),
    }
}

fn config(p: &Parties) -> RuntimeConfig {
    RuntimeConfig::new(
        p.owner,
        p.delegate,
        p.lender,
        p.treasury,
        TokenConfig {
            symbol: "DAO".to_string(),
            decimals: 0,
            initial_supply: "1000000".to_string(),
            holder: p.owner,
        },
    )
    .with_genesis_time(1_000_000)
}

fn setup(p: &Parties) -> Runtime {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut rt = Runtime::new(config(p)).unwrap();
    rt.fund_native(p.owner, 1_000).unwrap();
    rt
}

type Log<T> = Rc<RefCell<Vec<T>>>;

// ═══════════════════════════════════════════════════════════════════
// Reentrancy Tests
// ═══════════════════════════════════════════════════════════════════

/// Delegate code that tries to route again while receiving its share.
struct RerouteOnReceive {
    delegate: AccountId,
    attempts: Log<Result<Vec<Payment>, CallError>>,
}

impl AccountHook for RerouteOnReceive {
    fn on_receive(&mut self, runtime: &mut Runtime, _payment: &Payment) -> Result<(), Rejection> {
        let outcome = runtime.route_funds(self.delegate, LoanId::new(1), 10, 10);
        self.attempts.borrow_mut().push(outcome);
        Ok(())
    }
}

#[test]
fn test_reentrant_route_blocked() {
    let p = parties();
    let mut rt = setup(&p);
    let escrow = rt.escrow_address();
    rt.send_native(p.owner, escrow, 100).unwrap();

    let attempts: Log<_> = Rc::default();
    rt.register_hook(
        p.delegate,
        Box::new(RerouteOnReceive {
            delegate: p.delegate,
            attempts: attempts.clone(),
        }),
    );

    rt.route_funds(p.delegate, LoanId::new(1), 20, 10).unwrap();

    assert_eq!(
        attempts.borrow().as_slice(),
        &[Err(CallError::Reentrancy { program: "escrow" })]
    );
    assert_eq!(rt.native_balance(&p.delegate), 10);
    assert_eq!(rt.native_balance(&p.lender), 5);
    assert_eq!(rt.native_balance(&p.treasury), 5);
    assert_eq!(rt.held_balance(), 80);

    // Guard released once the outer call completed
    rt.remove_hook(&p.delegate);
    rt.route_funds(p.delegate, LoanId::new(1), 10, 10).unwrap();
    assert_eq!(rt.held_balance(), 70);
}

/// Payer code that tries to execute the same loan again while the
/// principal is being pulled, recording what it saw.
struct ReexecuteOnSend {
    loan_id: LoanId,
    seen: Log<(LoanStatus, Result<(), CallError>)>,
}

impl AccountHook for ReexecuteOnSend {
    fn on_send(&mut self, runtime: &mut Runtime, payment: &Payment) -> Result<(), Rejection> {
        let status = runtime
            .loan(self.loan_id)
            .map(|loan| loan.status())
            .ok_or_else(|| Rejection::new("loan missing"))?;
        let outcome = runtime.execute_loan_agreement(payment.from, self.loan_id, 0);
        self.seen.borrow_mut().push((status, outcome));
        Ok(())
    }
}

#[test]
fn test_state_committed_before_token_pull() {
    let p = parties();
    let mut rt = Runtime::new(config(&p).with_token_settlement(None)).unwrap();
    let escrow = rt.escrow_address();
    rt.approve(p.owner, escrow, 200).unwrap();
    let id = rt.create_loan_agreement(p.lender, 100, 30, 50).unwrap();
    rt.delegate_verify(p.delegate, id).unwrap();

    let seen: Log<_> = Rc::default();
    rt.register_hook(
        p.owner,
        Box::new(ReexecuteOnSend {
            loan_id: id,
            seen: seen.clone(),
        }),
    );
    rt.execute_loan_agreement(p.owner, id, 0).unwrap();

    assert_eq!(
        seen.borrow().as_slice(),
        &[(
            LoanStatus::Executed,
            Err(CallError::Reentrancy { program: "escrow" })
        )]
    );
    // Pulled once
    assert_eq!(rt.token_balance(&escrow), 100);
    assert_eq!(rt.allowance(&p.owner, &escrow), 100);
}

/// Beneficiary code that claims again while receiving a claim.
struct ReclaimOnReceive {
    seen: Log<(u128, Result<u128, CallError>)>,
}

impl AccountHook for ReclaimOnReceive {
    fn on_receive(&mut self, runtime: &mut Runtime, payment: &Payment) -> Result<(), Rejection> {
        let claimed = runtime
            .get_vesting(&payment.to, 0)
            .map(|s| s.claimed_amount)
            .map_err(|e| Rejection::new(e.to_string()))?;
        let outcome = runtime.claim_tokens(payment.to);
        self.seen.borrow_mut().push((claimed, outcome));
        Ok(())
    }
}

#[test]
fn test_reentrant_claim_blocked() {
    let p = parties();
    let mut rt = setup(&p);
    let claims = rt.claims_address();
    rt.transfer(p.owner, claims, 1_000).unwrap();
    let beneficiary = AccountId::new();
    rt.set_vesting_schedule(p.owner, beneficiary, 100, true, 1, 1).unwrap();
    rt.set_vesting_schedule(p.owner, beneficiary, 100, true, 1, 1).unwrap();

    let seen: Log<_> = Rc::default();
    rt.register_hook(beneficiary, Box::new(ReclaimOnReceive { seen: seen.clone() }));

    assert_eq!(rt.claim_tokens(beneficiary).unwrap(), 200);
    assert_eq!(
        seen.borrow().as_slice(),
        &[(100, Err(CallError::Reentrancy { program: "claims" }))]
    );
    assert_eq!(rt.token_balance(&beneficiary), 200);
    assert_eq!(rt.token_balance(&claims), 800);
}

/// Delegate code that calls into the other program mid-payout.
struct ClaimOnReceive {
    outcome: Log<Result<u128, CallError>>,
}

impl AccountHook for ClaimOnReceive {
    fn on_receive(&mut self, runtime: &mut Runtime, payment: &Payment) -> Result<(), Rejection> {
        if runtime.call_depth() == 1 {
            self.outcome.borrow_mut().push(runtime.claim_tokens(payment.to));
        }
        Ok(())
    }
}

#[test]
fn test_cross_program_call_from_hook_allowed() {
    let p = parties();
    let mut rt = setup(&p);
    let escrow = rt.escrow_address();
    let claims = rt.claims_address();
    rt.send_native(p.owner, escrow, 10).unwrap();
    rt.transfer(p.owner, claims, 50).unwrap();
    rt.set_vesting_schedule(p.owner, p.delegate, 50, false, 0, 1).unwrap();

    let outcome: Log<_> = Rc::default();
    rt.register_hook(
        p.delegate,
        Box::new(ClaimOnReceive {
            outcome: outcome.clone(),
        }),
    );
    rt.route_funds(p.delegate, LoanId::new(1), 10, 10).unwrap();

    assert_eq!(outcome.borrow().as_slice(), &[Ok(50)]);
    assert_eq!(rt.token_balance(&p.delegate), 50);
    assert_eq!(rt.native_balance(&p.delegate), 10);
}

// ═══════════════════════════════════════════════════════════════════
// Rejected Payments & Rollback
// ═══════════════════════════════════════════════════════════════════

struct RejectAll;

impl AccountHook for RejectAll {
    fn on_receive(&mut self, _runtime: &mut Runtime, _payment: &Payment) -> Result<(), Rejection> {
        Err(Rejection::new("no thanks"))
    }

    fn on_send(&mut self, _runtime: &mut Runtime, _payment: &Payment) -> Result<(), Rejection> {
        Err(Rejection::new("not paying"))
    }
}

#[test]
fn test_rejecting_treasury_reverts_whole_routing() {
    let p = parties();
    let mut rt = setup(&p);
    let escrow = rt.escrow_address();
    rt.send_native(p.owner, escrow, 100).unwrap();
    rt.register_hook(p.treasury, Box::new(RejectAll));
    let events_before = rt.escrow().events().len();

    let result = rt.route_funds(p.delegate, LoanId::new(1), 100, 50);
    assert_eq!(
        result,
        Err(CallError::TransferFailed {
            account: p.treasury,
            reason: "no thanks".to_string()
        })
    );

    // No partial disbursement, no event
    assert_eq!(rt.native_balance(&p.delegate), 0);
    assert_eq!(rt.native_balance(&p.lender), 0);
    assert_eq!(rt.held_balance(), 100);
    assert_eq!(rt.escrow().events().len(), events_before);

    // Not stuck behind the guard
    rt.remove_hook(&p.treasury);
    rt.route_funds(p.delegate, LoanId::new(1), 100, 50).unwrap();
    assert_eq!(rt.native_balance(&p.treasury), 25);
}

/// Delegate code that edits the hook registry while receiving its share.
enum RegistryEdit {
    Install(AccountId),
    Remove(AccountId),
}

impl AccountHook for RegistryEdit {
    fn on_receive(&mut self, runtime: &mut Runtime, _payment: &Payment) -> Result<(), Rejection> {
        match self {
            RegistryEdit::Install(account) => runtime.register_hook(*account, Box::new(RejectAll)),
            RegistryEdit::Remove(account) => {
                runtime.remove_hook(account);
            }
        }
        Ok(())
    }
}

#[test]
fn test_hook_installed_by_reverted_call_is_discarded() {
    let p = parties();
    let mut rt = setup(&p);
    let escrow = rt.escrow_address();
    let bystander = AccountId::new();
    rt.send_native(p.owner, escrow, 100).unwrap();
    rt.register_hook(p.delegate, Box::new(RegistryEdit::Install(bystander)));
    rt.register_hook(p.treasury, Box::new(RejectAll));

    // Delegate leg runs first and installs the hook; the treasury leg fails
    let result = rt.route_funds(p.delegate, LoanId::new(1), 100, 50);
    assert!(matches!(result, Err(CallError::TransferFailed { account, .. }) if account == p.treasury));

    assert!(!rt.has_hook(&bystander));
    rt.send_native(p.owner, bystander, 5).unwrap();
    assert_eq!(rt.native_balance(&bystander), 5);
}

#[test]
fn test_hook_removed_by_reverted_call_is_restored() {
    let p = parties();
    let mut rt = setup(&p);
    let escrow = rt.escrow_address();
    let guarded = AccountId::new();
    rt.send_native(p.owner, escrow, 100).unwrap();
    rt.register_hook(guarded, Box::new(RejectAll));
    rt.register_hook(p.delegate, Box::new(RegistryEdit::Remove(guarded)));
    rt.register_hook(p.treasury, Box::new(RejectAll));

    assert!(rt.route_funds(p.delegate, LoanId::new(1), 100, 50).is_err());

    assert!(rt.has_hook(&guarded));
    assert!(matches!(
        rt.send_native(p.owner, guarded, 5),
        Err(CallError::TransferFailed { .. })
    ));
}

#[test]
fn test_hook_installed_by_committed_call_is_kept() {
    let p = parties();
    let mut rt = setup(&p);
    let escrow = rt.escrow_address();
    let bystander = AccountId::new();
    rt.send_native(p.owner, escrow, 100).unwrap();
    rt.register_hook(p.delegate, Box::new(RegistryEdit::Install(bystander)));

    rt.route_funds(p.delegate, LoanId::new(1), 100, 50).unwrap();
    assert!(rt.has_hook(&bystander));
}

#[test]
fn test_rejecting_payer_leaves_loan_verified() {
    let p = parties();
    let mut rt = Runtime::new(config(&p).with_token_settlement(Some(p.owner))).unwrap();
    let escrow = rt.escrow_address();
    rt.approve(p.owner, escrow, 100).unwrap();
    let id = rt.create_loan_agreement(p.lender, 100, 30, 50).unwrap();
    rt.delegate_verify(p.delegate, id).unwrap();
    rt.register_hook(p.owner, Box::new(RejectAll));

    let result = rt.execute_loan_agreement(p.lender, id, 0);
    assert_eq!(
        result,
        Err(CallError::TransferFailed {
            account: p.owner,
            reason: "not paying".to_string()
        })
    );
    assert_eq!(rt.loan(id).unwrap().status(), LoanStatus::Verified);
    assert_eq!(rt.token_balance(&escrow), 0);
    assert_eq!(rt.allowance(&p.owner, &escrow), 100);
}

#[test]
fn test_rejecting_beneficiary_keeps_tokens_claimable() {
    let p = parties();
    let mut rt = setup(&p);
    let claims = rt.claims_address();
    rt.transfer(p.owner, claims, 100).unwrap();
    let beneficiary = AccountId::new();
    rt.set_vesting_schedule(p.owner, beneficiary, 100, false, 0, 1).unwrap();
    rt.register_hook(beneficiary, Box::new(RejectAll));

    assert!(rt.claim_tokens(beneficiary).is_err());
    assert_eq!(rt.get_vesting(&beneficiary, 0).unwrap().claimed_amount, 0);

    rt.remove_hook(&beneficiary);
    assert_eq!(rt.claim_tokens(beneficiary).unwrap(), 100);
}

// ═══════════════════════════════════════════════════════════════════
// Permission Tests
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_delegate_cannot_create_loans() {
    let p = parties();
    let mut rt = setup(&p);
    assert!(rt.create_loan_agreement(p.delegate, 1, 1, 1).is_err());
    assert_eq!(rt.escrow().loan_count(), 0);
}

#[test]
fn test_lender_cannot_verify_own_loan() {
    let p = parties();
    let mut rt = setup(&p);
    let id = rt.create_loan_agreement(p.lender, 1, 1, 1).unwrap();
    assert!(matches!(
        rt.delegate_verify(p.lender, id),
        Err(CallError::Escrow(EscrowError::Access(_)))
    ));
    assert_eq!(rt.loan(id).unwrap().status(), LoanStatus::Created);
}

#[test]
fn test_role_holder_cannot_self_promote() {
    let p = parties();
    let mut rt = setup(&p);
    assert!(rt.grant_delegate(p.lender, p.lender).is_err());
    assert!(rt.grant_lender(p.delegate, p.delegate).is_err());
    assert!(!rt.check_access(&p.lender, Role::Delegate));
    assert!(!rt.check_access(&p.delegate, Role::Lender));
    assert!(!rt.check_access(&p.lender, Role::Owner));
}

// ═══════════════════════════════════════════════════════════════════
// Upgrade Path (ABI Freeze)
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_contract_abi_version_is_frozen() {
    assert_eq!(CONTRACT_ABI_VERSION, "1.0.0");
}

// ═══════════════════════════════════════════════════════════════════
// Fuzz Tests (Proptest)
// ═══════════════════════════════════════════════════════════════════

mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Invariant: routing conserves value and follows the split rule.
        #[test]
        fn fuzz_routing_conserves_value(
            total in 0u64..=1_000_000,
            split_fraction in 0u32..=100,
        ) {
            let p = parties();
            let mut rt = setup(&p);
            let total = u128::from(total);
            let split = total * u128::from(split_fraction) / 100;
            let escrow = rt.escrow_address();
            rt.fund_native(escrow, total).unwrap();

            rt.route_funds(p.delegate, LoanId::new(1), total, split).unwrap();

            let delegate = rt.native_balance(&p.delegate);
            let lender = rt.native_balance(&p.lender);
            let treasury = rt.native_balance(&p.treasury);
            prop_assert_eq!(delegate + lender + treasury, total);
            prop_assert_eq!(delegate, split);
            prop_assert_eq!(lender, (total - split) / 2);
            prop_assert!(treasury >= lender && treasury - lender <= 1);
            prop_assert_eq!(rt.held_balance(), 0);
        }

        /// Invariant: repeated claims never exceed the schedule amount and
        /// the claimed total never decreases.
        #[test]
        fn fuzz_claims_bounded_and_monotone(
            amount in 1u64..=1_000_000,
            duration in 1u64..=10_000,
            steps in prop::collection::vec(0i64..=2_000, 1..20),
        ) {
            let p = parties();
            let mut rt = setup(&p);
            let amount = u128::from(amount);
            let claims = rt.claims_address();
            rt.transfer(p.owner, claims, amount).unwrap();
            let start = rt.block_time();
            rt.set_vesting_schedule(p.owner, p.lender, amount, false, start, duration).unwrap();

            let mut last = 0u128;
            for step in steps {
                rt.advance_time(step);
                let _ = rt.claim_tokens(p.lender);
                let claimed = rt.get_vesting(&p.lender, 0).unwrap().claimed_amount;
                prop_assert!(claimed >= last);
                prop_assert!(claimed <= amount);
                prop_assert_eq!(rt.token_balance(&p.lender), claimed);
                last = claimed;
            }
            prop_assert!(rt.token_supply_conserved());
        }

        /// Invariant: token transfers never change total supply.
        #[test]
        fn fuzz_token_supply_conserved(
            transfers in prop::collection::vec((0usize..4, 0usize..4, 0u64..=600_000), 1..30),
        ) {
            let p = parties();
            let mut rt = setup(&p);
            let accounts = [p.owner, p.delegate, p.lender, p.treasury];
            for (from, to, amount) in transfers {
                let _ = rt.transfer(accounts[from], accounts[to], u128::from(amount));
            }
            let sum: u128 = accounts.iter().map(|a| rt.token_balance(a)).sum();
            prop_assert_eq!(sum, rt.total_supply());
            prop_assert!(rt.token_supply_conserved());
        }

        /// Invariant: loan ids are strictly increasing from 1, whatever
        /// fails in between.
        #[test]
        fn fuzz_loan_ids_monotone(principals in prop::collection::vec(0u64..=5, 1..30)) {
            let p = parties();
            let mut rt = setup(&p);
            let mut expected = 1u64;
            for principal in principals {
                match rt.create_loan_agreement(p.lender, u128::from(principal), 30, 10) {
                    Ok(id) => {
                        prop_assert_eq!(id.value(), expected);
                        expected += 1;
                    }
                    Err(err) => prop_assert_eq!(err, CallError::Escrow(EscrowError::InvalidAmount)),
                }
            }
            prop_assert_eq!(rt.escrow().loan_count() as u64, expected - 1);
        }
    }
}
