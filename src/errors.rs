use thiserror::Error;

use crate::decimal::Money;
use crate::types::{BillingPeriod, FeeTypeId, SessionId, StudentId};

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("student not found: {id}")]
    StudentNotFound {
        id: StudentId,
    },

    #[error("session not found: {id}")]
    SessionNotFound {
        id: SessionId,
    },

    #[error("no fee structure for class {class} in session {session_id}")]
    StructureNotFound {
        session_id: SessionId,
        class: String,
    },

    #[error("fee type not found: {id}")]
    FeeTypeNotFound {
        id: FeeTypeId,
    },

    #[error("bill not found: {bill_no}")]
    BillNotFound {
        bill_no: String,
    },

    #[error("bill already exists for student {student_id} in {period}")]
    DuplicateBill {
        student_id: StudentId,
        period: BillingPeriod,
    },

    #[error("payment has no fee details")]
    EmptyPayment,

    #[error("payment net total must be positive: {total}")]
    NonPositivePayment {
        total: Money,
    },

    #[error("concurrent update on bill {bill_no}: expected version {expected}")]
    VersionConflict {
        bill_no: String,
        expected: u64,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, FeeError>;
