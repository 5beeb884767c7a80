use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::billing::{
    dues, resolver, BatchSummary, GenerateRequest, GenerationStatus, StudentOutcome,
    StudentSelector,
};
use crate::billing::advance::advance_balance;
use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::events::{Event, EventStore};
use crate::model::{DemandBill, DemandBillItem, Student};
use crate::numbering;
use crate::store::{FeeStore, SessionRegistry, StudentDirectory};
use crate::types::BillStatus;

use uuid::Uuid;

/// composes structure, discounts, dues, late fee and advance into one
/// demand bill per student per period
pub struct BillGenerator<'a, S: ?Sized> {
    store: &'a S,
    config: &'a BillingConfig,
}

impl<'a, S> BillGenerator<'a, S>
where
    S: FeeStore + StudentDirectory + SessionRegistry + ?Sized,
{
    pub fn new(store: &'a S, config: &'a BillingConfig) -> Self {
        Self { store, config }
    }

    /// run a batch; one student's failure never aborts the rest
    pub fn generate(
        &self,
        request: &GenerateRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<BatchSummary> {
        self.store
            .get_session(request.session_id)?
            .ok_or(FeeError::SessionNotFound {
                id: request.session_id,
            })?;

        let (students, mut results) = self.select_students(request)?;
        info!(
            period = %request.period,
            students = students.len(),
            "starting demand bill generation"
        );

        results.reserve(students.len());
        for student in students {
            let status = match self.generate_for_student(&student, request, time_provider, events) {
                Ok((bill_no, amount)) => GenerationStatus::Generated { bill_no, amount },
                Err(FeeError::DuplicateBill { period, .. }) => {
                    let reason = format!("bill already exists for {period}");
                    debug!(student = %student.id, %reason, "skipping");
                    events.emit(Event::BillSkipped {
                        student_id: student.id,
                        period,
                        reason: reason.clone(),
                    });
                    GenerationStatus::Skipped { reason }
                }
                Err(err) => {
                    debug!(student = %student.id, error = %err, "generation failed");
                    GenerationStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            results.push(StudentOutcome {
                student_id: student.id,
                student_name: student.name.clone(),
                status,
            });
        }

        let summary = BatchSummary::from_outcomes(results);
        info!(
            total = summary.total,
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "generation batch finished"
        );
        Ok(summary)
    }

    /// unknown ids become per-student failed outcomes, never a batch abort
    fn select_students(
        &self,
        request: &GenerateRequest,
    ) -> Result<(Vec<Student>, Vec<StudentOutcome>)> {
        let ids = match &request.selector {
            StudentSelector::One(id) => vec![*id],
            StudentSelector::Many(ids) => ids.clone(),
            StudentSelector::Class {
                class_name,
                section,
            } => {
                let students = self.store.students_in_class(
                    request.session_id,
                    class_name,
                    section.as_deref(),
                )?;
                return Ok((students, Vec::new()));
            }
        };

        let mut students = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            match self.store.get_student(id)? {
                Some(student) => students.push(student),
                None => missing.push(StudentOutcome {
                    student_id: id,
                    student_name: String::new(),
                    status: GenerationStatus::Failed {
                        reason: FeeError::StudentNotFound { id }.to_string(),
                    },
                }),
            }
        }
        Ok((students, missing))
    }

    fn generate_for_student(
        &self,
        student: &Student,
        request: &GenerateRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<(String, Money)> {
        let session_id = request.session_id;
        let period = request.period;

        let bills = self.store.bills_for_student(student.id, session_id)?;
        if bills.iter().any(|b| b.period == period) {
            return Err(FeeError::DuplicateBill {
                student_id: student.id,
                period,
            });
        }

        let structure = resolver::resolve_structure(self.store, session_id, &student.class_name)?;
        let discounts = resolver::resolve_discounts(self.store, student.id, session_id)?;

        let mut items = Vec::new();
        let mut gross_total = Money::ZERO;
        let mut discount_total = Money::ZERO;

        for item in &structure {
            if item.name == self.config.late_fee_head || !item.active {
                continue;
            }
            if let Some(selected) = &request.fee_type_ids {
                if !selected.contains(&item.fee_type_id) {
                    continue;
                }
            }
            let discount_amount = discounts
                .get(&item.fee_type_id)
                .map(|d| d.amount_on(item.amount))
                .unwrap_or(Money::ZERO);
            gross_total += item.amount;
            discount_total += discount_amount;
            items.push(DemandBillItem {
                fee_type_id: item.fee_type_id,
                name: item.name.clone(),
                amount: item.amount,
                discount_amount,
            });
        }

        // late fee: one undiscounted line sized by overdue months
        let auto_late_fees = request.auto_late_fees.unwrap_or(self.config.auto_late_fees);
        let mut late_fee: Option<(Money, u32)> = None;
        if auto_late_fees {
            let overdue = dues::overdue_months(&bills, period);
            if overdue > 0 {
                if let Some(head) = structure
                    .iter()
                    .find(|i| i.name == self.config.late_fee_head && i.active)
                {
                    let amount = head.amount.times(overdue);
                    gross_total += amount;
                    items.push(DemandBillItem {
                        fee_type_id: head.fee_type_id,
                        name: head.name.clone(),
                        amount,
                        discount_amount: Money::ZERO,
                    });
                    late_fee = Some((amount, overdue));
                }
            }
        }

        let previous_dues = dues::previous_dues(&bills, period);
        let preliminary = gross_total - discount_total + previous_dues;

        let transactions = self.store.transactions_for_student(student.id, session_id)?;
        let advance = advance_balance(&bills, &transactions);
        let advance_used = advance.min(preliminary.max(Money::ZERO));
        let net_amount = preliminary - advance_used;

        let now = time_provider.now();
        let bill_no = numbering::bill_number(time_provider, period);
        let bill = DemandBill {
            id: Uuid::new_v4(),
            bill_no: bill_no.clone(),
            student_id: student.id,
            session_id,
            period,
            gross_total,
            previous_dues,
            advance_applied: advance_used,
            discount_total,
            net_amount,
            paid_amount: Money::ZERO,
            status: BillStatus::Pending,
            due_date: request.due_date,
            paid_date: None,
            created_at: now,
            version: 0,
            items,
        };
        // the store re-checks (student, session, period) atomically; a
        // concurrent duplicate surfaces here and becomes a skip
        self.store.insert_bill(bill)?;

        events.emit(Event::BillGenerated {
            student_id: student.id,
            session_id,
            bill_no: bill_no.clone(),
            period,
            net_amount,
            timestamp: now,
        });
        if let Some((amount, overdue_months)) = late_fee {
            events.emit(Event::LateFeeAssessed {
                student_id: student.id,
                bill_no: bill_no.clone(),
                overdue_months,
                amount,
            });
        }
        if advance_used.is_positive() {
            events.emit(Event::AdvanceApplied {
                student_id: student.id,
                bill_no: bill_no.clone(),
                amount: advance_used,
            });
        }
        debug!(student = %student.id, %bill_no, net = %net_amount, "bill generated");

        Ok((bill_no, net_amount))
    }
}
