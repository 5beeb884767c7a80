use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BillStatus, BillingPeriod, SessionId, StudentId};

/// all events emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // generation events
    BillGenerated {
        student_id: StudentId,
        session_id: SessionId,
        bill_no: String,
        period: BillingPeriod,
        net_amount: Money,
        timestamp: DateTime<Utc>,
    },
    BillSkipped {
        student_id: StudentId,
        period: BillingPeriod,
        reason: String,
    },
    LateFeeAssessed {
        student_id: StudentId,
        bill_no: String,
        overdue_months: u32,
        amount: Money,
    },
    AdvanceApplied {
        student_id: StudentId,
        bill_no: String,
        amount: Money,
    },

    // payment events
    PaymentRecorded {
        student_id: StudentId,
        session_id: SessionId,
        txn_no: String,
        receipt_no: String,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentAllocated {
        txn_no: String,
        bill_no: String,
        new_paid: Money,
        new_status: BillStatus,
    },
    AdvanceRecorded {
        student_id: StudentId,
        session_id: SessionId,
        txn_no: String,
        amount: Money,
    },
    BillSettled {
        bill_no: String,
        paid_date: NaiveDate,
    },

    // status change events
    StatusChanged {
        bill_no: String,
        old_status: BillStatus,
        new_status: BillStatus,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
