use crate::decimal::Money;
use crate::model::DemandBill;
use crate::types::BillingPeriod;

/// unpaid balance carried forward from periods strictly before `current`
///
/// Raw sum: an overpaid history yields a negative carry that composes
/// directly into the next bill's net amount.
pub fn previous_dues(bills: &[DemandBill], current: BillingPeriod) -> Money {
    bills
        .iter()
        .filter(|b| b.period.is_before(current))
        .map(|b| b.carry_forward())
        .sum()
}

/// count of prior periods still carrying an outstanding balance,
/// independent of magnitude; sizes the late fee
pub fn overdue_months(bills: &[DemandBill], current: BillingPeriod) -> u32 {
    bills
        .iter()
        .filter(|b| b.period.is_before(current) && b.net_amount > b.paid_amount)
        .count() as u32
}
