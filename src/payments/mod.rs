pub mod collector;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::model::PaymentDetail;
use crate::types::{BillStatus, FeeTypeId, PaymentIntent, PaymentMode, SessionId, StudentId};

pub use collector::FeeCollector;

/// one fee head line of an incoming payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeDetailInput {
    pub fee_type_id: FeeTypeId,
    pub amount: Money,
    #[serde(default)]
    pub discount_amount: Money,
}

impl FeeDetailInput {
    pub fn net(&self) -> Money {
        self.amount - self.discount_amount
    }
}

/// payment collection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub details: Vec<FeeDetailInput>,
    pub mode: PaymentMode,
    #[serde(default)]
    pub intent: PaymentIntent,
    pub receipt_no: Option<String>,
    pub remarks: Option<String>,
    pub date: Option<NaiveDate>,
    pub collected_by: Option<String>,
}

/// how the payment landed on a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillApplication {
    pub bill_no: String,
    pub net_amount: Money,
    pub paid_amount: Money,
    pub balance: Money,
    pub status: BillStatus,
}

/// receipt summary returned to the caller (and the PDF collaborator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub txn_no: String,
    pub receipt_no: String,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub total_amount: Money,
    pub lines: Vec<PaymentDetail>,
    /// None when the payment was recorded as pure advance
    pub applied_to: Option<BillApplication>,
}

const REMARKS_BILL_PREFIX: &str = "Payment for Bill:";

/// legacy fallback: extract a bill code from free-text remarks
pub fn bill_no_from_remarks(remarks: &str) -> Option<&str> {
    let start = remarks.find(REMARKS_BILL_PREFIX)? + REMARKS_BILL_PREFIX.len();
    remarks[start..].split_whitespace().next()
}
