use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for an academic session
pub type SessionId = Uuid;

/// unique identifier for a fee head
pub type FeeTypeId = Uuid;

/// unique identifier for a demand bill
pub type BillId = Uuid;

/// unique identifier for a fee transaction
pub type TransactionId = Uuid;

/// one billing cycle within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// strictly earlier in session chronology
    pub fn is_before(&self, other: BillingPeriod) -> bool {
        self.year < other.year || (self.year == other.year && self.month < other.month)
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// demand bill status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillStatus {
    /// bill created, nothing received
    Pending,
    /// bill delivered to the guardian
    Sent,
    /// partial payment received
    PartiallyPaid,
    /// settled in full
    Paid,
    /// balance outstanding past the due date (display projection only)
    Overdue,
}

impl BillStatus {
    /// statuses a payment can still be allocated against
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            BillStatus::Pending | BillStatus::Sent | BillStatus::PartiallyPaid | BillStatus::Overdue
        )
    }
}

/// how often a fee head is expected to recur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingFrequency {
    Monthly,
    Quarterly,
    Annually,
    OneTime,
}

/// per-student discount override for one fee head
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Discount {
    /// fixed amount off the base
    Flat(Money),
    /// percent of the base amount (e.g. 10 for 10%)
    Percentage(Decimal),
}

impl Discount {
    /// discount amount for a base item, clamped to the base
    pub fn amount_on(&self, base: Money) -> Money {
        let raw = match self {
            Discount::Flat(amount) => *amount,
            Discount::Percentage(pct) => base.percentage(*pct),
        };
        raw.min(base).max(Money::ZERO)
    }
}

/// how a payment was tendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    Card,
    Online,
    Cheque,
    Other(String),
}

/// which bill a payment should settle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentIntent {
    /// apply against a specific bill number
    Bill(String),
    /// match remarks or fall back to the oldest open bill
    #[default]
    Auto,
    /// record as advance only, never matched to a bill
    Advance,
}
