use crate::decimal::Money;
use crate::model::{DemandBill, FeeTransaction};

/// session-wide surplus of payments over billed amounts, floored at zero
///
/// `total_billed` sums each bill's pre-advance net, so advance already
/// consumed by an earlier generation stays consumed. Point-in-time
/// snapshot: recompute at every use, never persist.
pub fn advance_balance(bills: &[DemandBill], transactions: &[FeeTransaction]) -> Money {
    let total_paid: Money = transactions.iter().map(|t| t.total_amount).sum();
    let total_billed: Money = bills.iter().map(|b| b.pre_advance_net()).sum();
    (total_paid - total_billed).max(Money::ZERO)
}
