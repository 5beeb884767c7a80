pub mod memory;

use crate::errors::Result;
use crate::model::{
    DemandBill, FeeStructure, FeeTransaction, FeeType, Session, Student, StudentFeeDiscount,
};
use crate::types::{BillingPeriod, FeeTypeId, SessionId, StudentId};

pub use memory::MemoryStore;

/// student directory collaborator, keyed by student id
pub trait StudentDirectory: Send + Sync {
    fn get_student(&self, id: StudentId) -> Result<Option<Student>>;

    /// students of a class (optionally one section) enrolled in a session
    fn students_in_class(
        &self,
        session_id: SessionId,
        class_name: &str,
        section: Option<&str>,
    ) -> Result<Vec<Student>>;
}

/// session registry collaborator, keyed by session id
pub trait SessionRegistry: Send + Sync {
    fn get_session(&self, id: SessionId) -> Result<Option<Session>>;
}

/// persistence for the fee catalogue, bills and transactions
///
/// Implementations must make `insert_bill` an atomic check-and-insert on
/// (student, session, period) and `update_bill_payment` a compare-and-swap
/// on the bill version. Deployments running several engine instances must
/// additionally serialize bill generation per (student, session), or the
/// same advance surplus can be offset against two bills.
pub trait FeeStore: Send + Sync {
    // catalogue
    fn get_fee_type(&self, id: FeeTypeId) -> Result<Option<FeeType>>;
    fn fee_structure(&self, session_id: SessionId, class_name: &str)
        -> Result<Option<FeeStructure>>;
    fn discounts_for_student(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<StudentFeeDiscount>>;

    // bills
    /// fails with `DuplicateBill` when a bill already exists for the
    /// bill's (student, session, period)
    fn insert_bill(&self, bill: DemandBill) -> Result<()>;
    fn get_bill(&self, bill_no: &str) -> Result<Option<DemandBill>>;
    fn bill_for_period(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        period: BillingPeriod,
    ) -> Result<Option<DemandBill>>;
    /// all bills of a student in a session, ordered by period ascending
    fn bills_for_student(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<DemandBill>>;
    /// versioned write of paid/net/status/paid_date; fails with
    /// `VersionConflict` unless `bill.version` is exactly one ahead of
    /// the stored version
    fn update_bill_payment(&self, bill: &DemandBill) -> Result<()>;

    // transactions
    fn insert_transaction(&self, txn: FeeTransaction) -> Result<()>;
    /// all transactions of a student in a session, ordered by date ascending
    fn transactions_for_student(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<FeeTransaction>>;
}
