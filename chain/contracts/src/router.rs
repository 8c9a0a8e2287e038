//! Fund router: three-way disbursement of held funds
//!
//! Stateless. The delegate receives the split amount; the remainder is
//! halved between lender and treasury, with the odd unit (if any) going to
//! the treasury. Integer arithmetic only, so the legs always sum to the
//! total exactly.

use serde::{Deserialize, Serialize};
use types::ids::AccountId;
use types::numeric::Amount;

use crate::errors::EscrowError;
use crate::security::{AccessControlRegistry, Role};
use crate::settlement::{Payment, SettlementAsset};

/// Amounts owed to each party by one routing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    pub delegate: Amount,
    pub lender: Amount,
    pub treasury: Amount,
}

impl Disbursement {
    /// Sum of the three legs.
    pub fn total(&self) -> Amount {
        // Legs are carved out of one total, so this cannot overflow.
        self.delegate + self.lender + self.treasury
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FundRouter;

impl FundRouter {
    /// Compute the disbursement for `total` with `split` going to the delegate.
    pub fn split(total: Amount, split: Amount) -> Result<Disbursement, EscrowError> {
        if split > total {
            return Err(EscrowError::InvalidSplit { split, total });
        }

        let remainder = total - split;
        let lender = remainder / 2;
        Ok(Disbursement {
            delegate: split,
            lender,
            treasury: remainder - lender,
        })
    }

    /// Turn a disbursement into payments from `from` to the current role
    /// holders. Zero-amount legs are skipped.
    pub fn payments(
        disbursement: &Disbursement,
        asset: SettlementAsset,
        from: AccountId,
        roles: &AccessControlRegistry,
    ) -> Vec<Payment> {
        [
            (Role::Delegate, disbursement.delegate),
            (Role::Lender, disbursement.lender),
            (Role::Treasury, disbursement.treasury),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(role, amount)| Payment::send(asset, from, roles.holder(role), amount))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHER: Amount = 1_000_000_000_000_000_000;

    #[test]
    fn test_split_even_remainder() {
        let d = FundRouter::split(110, 100).unwrap();
        assert_eq!(d, Disbursement { delegate: 100, lender: 5, treasury: 5 });
        assert_eq!(d.total(), 110);
    }

    #[test]
    fn test_split_odd_remainder_goes_to_treasury() {
        let d = FundRouter::split(11, 8).unwrap();
        assert_eq!(d, Disbursement { delegate: 8, lender: 1, treasury: 2 });
    }

    #[test]
    fn test_split_full_to_delegate() {
        let d = FundRouter::split(50, 50).unwrap();
        assert_eq!(d, Disbursement { delegate: 50, lender: 0, treasury: 0 });
    }

    #[test]
    fn test_split_exceeds_total() {
        assert_eq!(
            FundRouter::split(10, 11),
            Err(EscrowError::InvalidSplit { split: 11, total: 10 })
        );
    }

    #[test]
    fn test_split_ether_amounts() {
        // 1.1 total, 1.0 to the delegate, 0.05 each to lender and treasury
        let d = FundRouter::split(11 * ETHER / 10, ETHER).unwrap();
        assert_eq!(d.lender, ETHER / 20);
        assert_eq!(d.treasury, ETHER / 20);
    }

    #[test]
    fn test_payments_skip_zero_legs() {
        let owner = AccountId::new();
        let delegate = AccountId::new();
        let roles = AccessControlRegistry::new(owner, delegate, AccountId::new(), AccountId::new());
        let escrow = AccountId::new();

        let d = FundRouter::split(7, 7).unwrap();
        let payments = FundRouter::payments(&d, SettlementAsset::Native, escrow, &roles);
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].to, delegate);
        assert_eq!(payments[0].amount, 7);
    }

    #[test]
    fn test_payments_follow_current_holders() {
        let owner = AccountId::new();
        let lender = AccountId::new();
        let treasury = AccountId::new();
        let roles = AccessControlRegistry::new(owner, owner, lender, treasury);
        let escrow = AccountId::new();

        let d = FundRouter::split(10, 2).unwrap();
        let payments = FundRouter::payments(&d, SettlementAsset::Token, escrow, &roles);
        let recipients: Vec<_> = payments.iter().map(|p| (p.to, p.amount)).collect();
        assert_eq!(recipients, vec![(owner, 2), (lender, 4), (treasury, 4)]);
        assert!(payments.iter().all(|p| p.from == escrow && !p.is_pull()));
    }
}
