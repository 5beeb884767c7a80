use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{
    BillId, BillStatus, BillingFrequency, BillingPeriod, Discount, FeeTypeId, PaymentMode,
    SessionId, StudentId, TransactionId,
};

/// student directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub class_name: String,
    pub section: Option<String>,
    pub session_id: SessionId,
}

/// academic session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// a billable fee head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeType {
    pub id: FeeTypeId,
    pub name: String,
    pub frequency: BillingFrequency,
    pub active: bool,
}

impl FeeType {
    pub fn new(name: impl Into<String>, frequency: BillingFrequency) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frequency,
            active: true,
        }
    }
}

/// fee catalogue for one (session, class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: Uuid,
    pub session_id: SessionId,
    pub class_name: String,
    pub name: String,
    pub items: Vec<FeeStructureItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStructureItem {
    pub fee_type_id: FeeTypeId,
    pub amount: Money,
}

impl FeeStructure {
    pub fn new(
        session_id: SessionId,
        class_name: impl Into<String>,
        name: impl Into<String>,
        items: Vec<FeeStructureItem>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            class_name: class_name.into(),
            name: name.into(),
            items,
        }
    }
}

/// per-student discount override for one fee head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentFeeDiscount {
    pub id: Uuid,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub fee_type_id: FeeTypeId,
    pub discount: Discount,
}

impl StudentFeeDiscount {
    pub fn new(
        student_id: StudentId,
        session_id: SessionId,
        fee_type_id: FeeTypeId,
        discount: Discount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            session_id,
            fee_type_id,
            discount,
        }
    }
}

/// one line on a demand bill, immutable after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandBillItem {
    pub fee_type_id: FeeTypeId,
    pub name: String,
    pub amount: Money,
    pub discount_amount: Money,
}

/// the billing unit: one invoice per student per period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandBill {
    pub id: BillId,
    pub bill_no: String,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub period: BillingPeriod,
    pub gross_total: Money,
    pub previous_dues: Money,
    pub advance_applied: Money,
    pub discount_total: Money,
    pub net_amount: Money,
    pub paid_amount: Money,
    pub status: BillStatus,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    /// optimistic concurrency counter, bumped on every payment write
    pub version: u64,
    pub items: Vec<DemandBillItem>,
}

impl DemandBill {
    /// outstanding balance, floored at zero
    pub fn balance(&self) -> Money {
        (self.net_amount - self.paid_amount).max(Money::ZERO)
    }

    /// net amount as the allocator recomputes it: consumed advance
    /// does not re-enter
    pub fn dynamic_net(&self) -> Money {
        self.gross_total + self.previous_dues - self.discount_total
    }

    /// carried-forward balance this bill contributes to later periods
    pub fn carry_forward(&self) -> Money {
        self.net_amount - self.paid_amount
    }

    /// net before advance was offset, for session billed totals
    pub fn pre_advance_net(&self) -> Money {
        self.net_amount + self.advance_applied
    }

    /// apply a payment and return the (old, new) status pair
    pub fn apply_payment(&mut self, amount: Money, date: NaiveDate) -> (BillStatus, BillStatus) {
        let old_status = self.status;
        self.net_amount = self.dynamic_net();
        self.paid_amount += amount;

        let new_status = if self.paid_amount >= self.net_amount {
            BillStatus::Paid
        } else if self.paid_amount.is_positive() {
            BillStatus::PartiallyPaid
        } else {
            old_status
        };

        if new_status == BillStatus::Paid && old_status != BillStatus::Paid {
            self.paid_date = Some(date);
        }
        self.status = new_status;
        self.version += 1;

        (old_status, new_status)
    }
}

/// one line of a payment, immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub fee_type_id: FeeTypeId,
    pub name: String,
    pub amount: Money,
    pub discount_amount: Money,
    pub net_amount: Money,
}

/// one payment event, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeTransaction {
    pub id: TransactionId,
    pub txn_no: String,
    pub receipt_no: String,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub total_amount: Money,
    pub mode: PaymentMode,
    pub date: NaiveDate,
    /// bill the payment was allocated against, if any
    pub bill_no: Option<String>,
    pub remarks: Option<String>,
    pub collected_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub details: Vec<PaymentDetail>,
}
