use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::billing::advance::advance_balance;
use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::model::{DemandBill, FeeTransaction};
use crate::store::{FeeStore, SessionRegistry, StudentDirectory};
use crate::types::{BillStatus, BillingPeriod, FeeTypeId, SessionId, StudentId};

/// statement query; dates bound the transaction listing only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementQuery {
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// billed vs collected for one fee head across the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeHeadSummary {
    pub fee_type_id: FeeTypeId,
    pub name: String,
    pub gross: Money,
    pub discount: Money,
    pub net: Money,
    pub paid: Money,
    pub balance: Money,
}

/// one open bill as the dashboard shows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBill {
    pub bill_no: String,
    pub period: BillingPeriod,
    pub due_date: Option<NaiveDate>,
    pub net_amount: Money,
    pub paid_amount: Money,
    pub balance: Money,
    pub display_status: BillStatus,
}

/// session-wide money position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub billed: Money,
    pub paid: Money,
    pub balance: Money,
    pub advance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentStatement {
    pub student_id: StudentId,
    pub student_name: String,
    pub session_id: SessionId,
    pub heads: Vec<FeeHeadSummary>,
    pub summary: SessionSummary,
    pub pending_bills: Vec<PendingBill>,
    pub recent_transactions: Vec<FeeTransaction>,
}

/// status as the dashboard shows it, recomputed from the current balance
/// and due date; `Overdue` exists only here and is never persisted
pub fn display_status(bill: &DemandBill, today: NaiveDate) -> BillStatus {
    if bill.balance().is_zero() {
        return BillStatus::Paid;
    }
    if bill.due_date.map_or(false, |due| due < today) {
        return BillStatus::Overdue;
    }
    if bill.paid_amount.is_positive() {
        return BillStatus::PartiallyPaid;
    }
    bill.status
}

/// read-only composition of bills, transactions and the catalogue;
/// performs no writes
pub struct StatementBuilder<'a, S: ?Sized> {
    store: &'a S,
    config: &'a BillingConfig,
}

impl<'a, S> StatementBuilder<'a, S>
where
    S: FeeStore + StudentDirectory + SessionRegistry + ?Sized,
{
    pub fn new(store: &'a S, config: &'a BillingConfig) -> Self {
        Self { store, config }
    }

    pub fn build(
        &self,
        query: &StatementQuery,
        time_provider: &SafeTimeProvider,
    ) -> Result<StudentStatement> {
        let student = self
            .store
            .get_student(query.student_id)?
            .ok_or(FeeError::StudentNotFound {
                id: query.student_id,
            })?;
        self.store
            .get_session(query.session_id)?
            .ok_or(FeeError::SessionNotFound {
                id: query.session_id,
            })?;

        let bills = self
            .store
            .bills_for_student(query.student_id, query.session_id)?;
        let transactions = self
            .store
            .transactions_for_student(query.student_id, query.session_id)?;
        debug!(
            student = %query.student_id,
            bills = bills.len(),
            transactions = transactions.len(),
            "building statement"
        );

        let heads = per_head_totals(&bills, &transactions);
        let today = time_provider.now().date_naive();

        let pending_bills: Vec<PendingBill> = bills
            .iter()
            .filter_map(|bill| {
                let status = display_status(bill, today);
                (status != BillStatus::Paid).then(|| PendingBill {
                    bill_no: bill.bill_no.clone(),
                    period: bill.period,
                    due_date: bill.due_date,
                    net_amount: bill.net_amount,
                    paid_amount: bill.paid_amount,
                    balance: bill.balance(),
                    display_status: status,
                })
            })
            .collect();

        let billed: Money = bills.iter().map(|b| b.net_amount).sum();
        let paid: Money = transactions.iter().map(|t| t.total_amount).sum();
        let balance: Money = bills.iter().map(|b| b.balance()).sum();
        let summary = SessionSummary {
            billed,
            paid,
            balance,
            advance: advance_balance(&bills, &transactions),
        };

        let bounded = query.from_date.is_some() || query.to_date.is_some();
        let mut recent_transactions: Vec<FeeTransaction> = transactions
            .into_iter()
            .filter(|t| {
                query.from_date.map_or(true, |from| t.date >= from)
                    && query.to_date.map_or(true, |to| t.date <= to)
            })
            .collect();
        recent_transactions.reverse(); // newest first
        if !bounded {
            recent_transactions.truncate(self.config.recent_transaction_limit);
        }

        Ok(StudentStatement {
            student_id: student.id,
            student_name: student.name,
            session_id: query.session_id,
            heads,
            summary,
            pending_bills,
            recent_transactions,
        })
    }
}

/// fold bill items and payment details into per-head totals, heads
/// ordered by first appearance on a bill
fn per_head_totals(bills: &[DemandBill], transactions: &[FeeTransaction]) -> Vec<FeeHeadSummary> {
    let mut heads: Vec<FeeHeadSummary> = Vec::new();

    let slot = |heads: &mut Vec<FeeHeadSummary>, fee_type_id: FeeTypeId, name: &str| -> usize {
        match heads.iter().position(|h| h.fee_type_id == fee_type_id) {
            Some(i) => i,
            None => {
                heads.push(FeeHeadSummary {
                    fee_type_id,
                    name: name.to_string(),
                    gross: Money::ZERO,
                    discount: Money::ZERO,
                    net: Money::ZERO,
                    paid: Money::ZERO,
                    balance: Money::ZERO,
                });
                heads.len() - 1
            }
        }
    };

    for bill in bills {
        for item in &bill.items {
            let i = slot(&mut heads, item.fee_type_id, &item.name);
            heads[i].gross += item.amount;
            heads[i].discount += item.discount_amount;
        }
    }
    for txn in transactions {
        for detail in &txn.details {
            let i = slot(&mut heads, detail.fee_type_id, &detail.name);
            heads[i].paid += detail.net_amount;
        }
    }
    for head in &mut heads {
        head.net = head.gross - head.discount;
        head.balance = (head.net - head.paid).max(Money::ZERO);
    }
    heads
}
