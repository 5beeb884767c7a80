use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::errors::{FeeError, Result};
use crate::model::{
    DemandBill, FeeStructure, FeeTransaction, FeeType, Session, Student, StudentFeeDiscount,
};
use crate::store::{FeeStore, SessionRegistry, StudentDirectory};
use crate::types::{BillingPeriod, FeeTypeId, SessionId, StudentId};

/// in-memory backend implementing every store trait, for tests and
/// single-process embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    students: HashMap<StudentId, Student>,
    sessions: HashMap<SessionId, Session>,
    fee_types: HashMap<FeeTypeId, FeeType>,
    structures: Vec<FeeStructure>,
    discounts: Vec<StudentFeeDiscount>,
    bills: Vec<DemandBill>,
    transactions: Vec<FeeTransaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|e| FeeError::Store {
            message: format!("store lock poisoned: {e}"),
        })
    }

    // catalogue administration happens against the store directly;
    // the engine only reads

    pub fn add_student(&self, student: Student) -> Result<()> {
        self.lock()?.students.insert(student.id, student);
        Ok(())
    }

    pub fn add_session(&self, session: Session) -> Result<()> {
        self.lock()?.sessions.insert(session.id, session);
        Ok(())
    }

    pub fn add_fee_type(&self, fee_type: FeeType) -> Result<()> {
        self.lock()?.fee_types.insert(fee_type.id, fee_type);
        Ok(())
    }

    /// replaces any existing structure for the same (session, class)
    pub fn put_structure(&self, structure: FeeStructure) -> Result<()> {
        let mut inner = self.lock()?;
        inner.structures.retain(|s| {
            !(s.session_id == structure.session_id && s.class_name == structure.class_name)
        });
        inner.structures.push(structure);
        Ok(())
    }

    /// replaces any existing discount for the same (student, session, fee type)
    pub fn put_discount(&self, discount: StudentFeeDiscount) -> Result<()> {
        let mut inner = self.lock()?;
        inner.discounts.retain(|d| {
            !(d.student_id == discount.student_id
                && d.session_id == discount.session_id
                && d.fee_type_id == discount.fee_type_id)
        });
        inner.discounts.push(discount);
        Ok(())
    }
}

impl StudentDirectory for MemoryStore {
    fn get_student(&self, id: StudentId) -> Result<Option<Student>> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    fn students_in_class(
        &self,
        session_id: SessionId,
        class_name: &str,
        section: Option<&str>,
    ) -> Result<Vec<Student>> {
        let inner = self.lock()?;
        let mut students: Vec<Student> = inner
            .students
            .values()
            .filter(|s| {
                s.session_id == session_id
                    && s.class_name == class_name
                    && section.map_or(true, |sec| s.section.as_deref() == Some(sec))
            })
            .cloned()
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }
}

impl SessionRegistry for MemoryStore {
    fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }
}

impl FeeStore for MemoryStore {
    fn get_fee_type(&self, id: FeeTypeId) -> Result<Option<FeeType>> {
        Ok(self.lock()?.fee_types.get(&id).cloned())
    }

    fn fee_structure(
        &self,
        session_id: SessionId,
        class_name: &str,
    ) -> Result<Option<FeeStructure>> {
        Ok(self
            .lock()?
            .structures
            .iter()
            .find(|s| s.session_id == session_id && s.class_name == class_name)
            .cloned())
    }

    fn discounts_for_student(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<StudentFeeDiscount>> {
        Ok(self
            .lock()?
            .discounts
            .iter()
            .filter(|d| d.student_id == student_id && d.session_id == session_id)
            .cloned()
            .collect())
    }

    fn insert_bill(&self, bill: DemandBill) -> Result<()> {
        let mut inner = self.lock()?;
        let duplicate = inner.bills.iter().any(|b| {
            b.student_id == bill.student_id
                && b.session_id == bill.session_id
                && b.period == bill.period
        });
        if duplicate {
            return Err(FeeError::DuplicateBill {
                student_id: bill.student_id,
                period: bill.period,
            });
        }
        inner.bills.push(bill);
        Ok(())
    }

    fn get_bill(&self, bill_no: &str) -> Result<Option<DemandBill>> {
        Ok(self
            .lock()?
            .bills
            .iter()
            .find(|b| b.bill_no == bill_no)
            .cloned())
    }

    fn bill_for_period(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        period: BillingPeriod,
    ) -> Result<Option<DemandBill>> {
        Ok(self
            .lock()?
            .bills
            .iter()
            .find(|b| {
                b.student_id == student_id && b.session_id == session_id && b.period == period
            })
            .cloned())
    }

    fn bills_for_student(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<DemandBill>> {
        let inner = self.lock()?;
        let mut bills: Vec<DemandBill> = inner
            .bills
            .iter()
            .filter(|b| b.student_id == student_id && b.session_id == session_id)
            .cloned()
            .collect();
        bills.sort_by_key(|b| b.period);
        Ok(bills)
    }

    fn update_bill_payment(&self, bill: &DemandBill) -> Result<()> {
        let mut inner = self.lock()?;
        let stored = inner
            .bills
            .iter_mut()
            .find(|b| b.id == bill.id)
            .ok_or_else(|| FeeError::BillNotFound {
                bill_no: bill.bill_no.clone(),
            })?;
        if bill.version != stored.version + 1 {
            return Err(FeeError::VersionConflict {
                bill_no: bill.bill_no.clone(),
                expected: stored.version + 1,
            });
        }
        stored.paid_amount = bill.paid_amount;
        stored.net_amount = bill.net_amount;
        stored.status = bill.status;
        stored.paid_date = bill.paid_date;
        stored.version = bill.version;
        Ok(())
    }

    fn insert_transaction(&self, txn: FeeTransaction) -> Result<()> {
        self.lock()?.transactions.push(txn);
        Ok(())
    }

    fn transactions_for_student(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<FeeTransaction>> {
        let inner = self.lock()?;
        let mut txns: Vec<FeeTransaction> = inner
            .transactions
            .iter()
            .filter(|t| t.student_id == student_id && t.session_id == session_id)
            .cloned()
            .collect();
        txns.sort_by_key(|t| (t.date, t.created_at));
        Ok(txns)
    }
}


#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::fixtures;
    use super::*;
    use crate::decimal::Money;
    use crate::types::BillStatus;

    fn bill(student_id: StudentId, session_id: SessionId, period: BillingPeriod) -> DemandBill {
        DemandBill {
            id: Uuid::new_v4(),
            bill_no: format!("BILL{}{:02}0", period.year, period.month),
            student_id,
            session_id,
            period,
            gross_total: Money::from_major(100),
            previous_dues: Money::ZERO,
            advance_applied: Money::ZERO,
            discount_total: Money::ZERO,
            net_amount: Money::from_major(100),
            paid_amount: Money::ZERO,
            status: BillStatus::Pending,
            due_date: None,
            paid_date: None,
            created_at: Utc::now(),
            version: 0,
            items: Vec::new(),
        }
    }

    #[test]
    fn test_insert_bill_rejects_period_duplicate() {
        let store = MemoryStore::new();
        let session = fixtures::session(&store);
        let student = fixtures::student(&store, session.id, "5");
        let period = BillingPeriod::new(2024, 6);

        store.insert_bill(bill(student.id, session.id, period)).unwrap();
        let err = store
            .insert_bill(bill(student.id, session.id, period))
            .unwrap_err();
        assert!(matches!(err, FeeError::DuplicateBill { .. }));

        // a different month is fine
        store
            .insert_bill(bill(student.id, session.id, BillingPeriod::new(2024, 7)))
            .unwrap();
    }

    #[test]
    fn test_update_bill_payment_rejects_stale_version() {
        let store = MemoryStore::new();
        let session = fixtures::session(&store);
        let student = fixtures::student(&store, session.id, "5");
        let b = bill(student.id, session.id, BillingPeriod::new(2024, 6));
        store.insert_bill(b.clone()).unwrap();

        let mut fresh = b.clone();
        fresh.paid_amount = Money::from_major(40);
        fresh.version = 1;
        store.update_bill_payment(&fresh).unwrap();

        // a second writer still holding version 0 loses
        let mut stale = b;
        stale.paid_amount = Money::from_major(60);
        stale.version = 1;
        let err = store.update_bill_payment(&stale).unwrap_err();
        assert!(matches!(err, FeeError::VersionConflict { .. }));
    }

    #[test]
    fn test_bills_sorted_by_period() {
        let store = MemoryStore::new();
        let session = fixtures::session(&store);
        let student = fixtures::student(&store, session.id, "5");
        for (y, m) in [(2024, 8), (2024, 6), (2024, 7)] {
            store
                .insert_bill(bill(student.id, session.id, BillingPeriod::new(y, m)))
                .unwrap();
        }
        let months: Vec<u32> = store
            .bills_for_student(student.id, session.id)
            .unwrap()
            .iter()
            .map(|b| b.period.month)
            .collect();
        assert_eq!(months, vec![6, 7, 8]);
    }

    #[test]
    fn test_put_discount_replaces_existing() {
        let store = MemoryStore::new();
        let session = fixtures::session(&store);
        let student = fixtures::student(&store, session.id, "5");
        let tuition = fixtures::fee_type(&store, "Tuition");

        store
            .put_discount(StudentFeeDiscount::new(
                student.id,
                session.id,
                tuition.id,
                crate::types::Discount::Flat(Money::from_major(50)),
            ))
            .unwrap();
        store
            .put_discount(StudentFeeDiscount::new(
                student.id,
                session.id,
                tuition.id,
                crate::types::Discount::Flat(Money::from_major(80)),
            ))
            .unwrap();

        let discounts = store.discounts_for_student(student.id, session.id).unwrap();
        assert_eq!(discounts.len(), 1);
        assert_eq!(
            discounts[0].discount,
            crate::types::Discount::Flat(Money::from_major(80))
        );
    }
}
