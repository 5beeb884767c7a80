use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::events::{Event, EventStore};
use crate::model::{FeeTransaction, PaymentDetail};
use crate::numbering;
use crate::payments::{bill_no_from_remarks, BillApplication, PaymentRequest, Receipt};
use crate::store::{FeeStore, SessionRegistry, StudentDirectory};
use crate::types::{BillStatus, PaymentIntent};

/// records a payment and allocates it against the right demand bill
pub struct FeeCollector<'a, S: ?Sized> {
    store: &'a S,
    config: &'a BillingConfig,
}

impl<'a, S> FeeCollector<'a, S>
where
    S: FeeStore + StudentDirectory + SessionRegistry + ?Sized,
{
    pub fn new(store: &'a S, config: &'a BillingConfig) -> Self {
        Self { store, config }
    }

    pub fn collect(
        &self,
        request: &PaymentRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Receipt> {
        if request.details.is_empty() {
            return Err(FeeError::EmptyPayment);
        }
        let total: Money = request.details.iter().map(|d| d.net()).sum();
        if !total.is_positive() {
            return Err(FeeError::NonPositivePayment { total });
        }

        self.store
            .get_student(request.student_id)?
            .ok_or(FeeError::StudentNotFound {
                id: request.student_id,
            })?;
        self.store
            .get_session(request.session_id)?
            .ok_or(FeeError::SessionNotFound {
                id: request.session_id,
            })?;

        let mut lines = Vec::with_capacity(request.details.len());
        for detail in &request.details {
            let fee_type = self
                .store
                .get_fee_type(detail.fee_type_id)?
                .ok_or(FeeError::FeeTypeNotFound {
                    id: detail.fee_type_id,
                })?;
            lines.push(PaymentDetail {
                fee_type_id: detail.fee_type_id,
                name: fee_type.name,
                amount: detail.amount,
                discount_amount: detail.discount_amount,
                net_amount: detail.net(),
            });
        }

        // an explicit bill intent must resolve before anything is written
        let target_bill_no = match &request.intent {
            PaymentIntent::Bill(bill_no) => {
                self.store
                    .get_bill(bill_no)?
                    .ok_or_else(|| FeeError::BillNotFound {
                        bill_no: bill_no.clone(),
                    })?;
                Some(bill_no.clone())
            }
            PaymentIntent::Auto => self.auto_target(request)?,
            PaymentIntent::Advance => None,
        };

        let now = time_provider.now();
        let date = request.date.unwrap_or_else(|| now.date_naive());
        let txn_no = numbering::transaction_number(time_provider);
        let receipt_no = request
            .receipt_no
            .clone()
            .unwrap_or_else(|| numbering::receipt_number(time_provider));

        self.store.insert_transaction(FeeTransaction {
            id: Uuid::new_v4(),
            txn_no: txn_no.clone(),
            receipt_no: receipt_no.clone(),
            student_id: request.student_id,
            session_id: request.session_id,
            total_amount: total,
            mode: request.mode.clone(),
            date,
            bill_no: target_bill_no.clone(),
            remarks: request.remarks.clone(),
            collected_by: request.collected_by.clone(),
            created_at: now,
            details: lines.clone(),
        })?;
        events.emit(Event::PaymentRecorded {
            student_id: request.student_id,
            session_id: request.session_id,
            txn_no: txn_no.clone(),
            receipt_no: receipt_no.clone(),
            amount: total,
            timestamp: now,
        });
        info!(student = %request.student_id, %txn_no, amount = %total, "payment recorded");

        let applied_to = match target_bill_no {
            Some(bill_no) => Some(self.apply_with_retry(&bill_no, &txn_no, total, date, events)?),
            None => {
                debug!(student = %request.student_id, %txn_no, "no open bill, recorded as advance");
                events.emit(Event::AdvanceRecorded {
                    student_id: request.student_id,
                    session_id: request.session_id,
                    txn_no: txn_no.clone(),
                    amount: total,
                });
                None
            }
        };

        Ok(Receipt {
            txn_no,
            receipt_no,
            student_id: request.student_id,
            session_id: request.session_id,
            date,
            total_amount: total,
            lines,
            applied_to,
        })
    }

    /// remarks pattern first, then the chronologically oldest open bill
    fn auto_target(&self, request: &PaymentRequest) -> Result<Option<String>> {
        if let Some(remarks) = &request.remarks {
            if let Some(code) = bill_no_from_remarks(remarks) {
                if let Some(bill) = self.store.get_bill(code)? {
                    return Ok(Some(bill.bill_no));
                }
                debug!(code, "remarks named a bill that does not exist, falling back");
            }
        }
        let bills = self
            .store
            .bills_for_student(request.student_id, request.session_id)?;
        Ok(bills
            .into_iter()
            .find(|b| b.status.is_open())
            .map(|b| b.bill_no))
    }

    fn apply_with_retry(
        &self,
        bill_no: &str,
        txn_no: &str,
        amount: Money,
        date: NaiveDate,
        events: &mut EventStore,
    ) -> Result<BillApplication> {
        let mut attempts = 0;
        loop {
            let mut bill =
                self.store
                    .get_bill(bill_no)?
                    .ok_or_else(|| FeeError::BillNotFound {
                        bill_no: bill_no.to_string(),
                    })?;
            let (old_status, new_status) = bill.apply_payment(amount, date);

            match self.store.update_bill_payment(&bill) {
                Ok(()) => {
                    events.emit(Event::PaymentAllocated {
                        txn_no: txn_no.to_string(),
                        bill_no: bill_no.to_string(),
                        new_paid: bill.paid_amount,
                        new_status,
                    });
                    if old_status != new_status {
                        events.emit(Event::StatusChanged {
                            bill_no: bill_no.to_string(),
                            old_status,
                            new_status,
                        });
                    }
                    if new_status == BillStatus::Paid && old_status != BillStatus::Paid {
                        events.emit(Event::BillSettled {
                            bill_no: bill_no.to_string(),
                            paid_date: date,
                        });
                    }
                    return Ok(BillApplication {
                        bill_no: bill_no.to_string(),
                        net_amount: bill.net_amount,
                        paid_amount: bill.paid_amount,
                        balance: bill.balance(),
                        status: new_status,
                    });
                }
                Err(FeeError::VersionConflict { .. })
                    if attempts < self.config.payment_update_retries =>
                {
                    attempts += 1;
                    warn!(bill_no, attempts, "lost a concurrent bill update, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::advance::advance_balance;
    use crate::payments::FeeDetailInput;
    use crate::store::memory::fixtures;
    use crate::store::MemoryStore;
    use crate::types::{BillingPeriod, PaymentMode};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap(),
        ))
    }

    struct Fixture {
        store: MemoryStore,
        config: BillingConfig,
        session_id: crate::types::SessionId,
        student_id: crate::types::StudentId,
        tuition_id: crate::types::FeeTypeId,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let session = fixtures::session(&store);
        let student = fixtures::student(&store, session.id, "5");
        let tuition = fixtures::fee_type(&store, "Tuition");
        fixtures::structure(&store, session.id, "5", vec![(tuition.id, 1_000)]);
        Fixture {
            store,
            config: BillingConfig::default(),
            session_id: session.id,
            student_id: student.id,
            tuition_id: tuition.id,
        }
    }

    fn generate_bill(fx: &Fixture, month: u32, time: &SafeTimeProvider) -> String {
        use crate::billing::{BillGenerator, GenerateRequest, StudentSelector};
        let generator = BillGenerator::new(&fx.store, &fx.config);
        let mut events = EventStore::new();
        let summary = generator
            .generate(
                &GenerateRequest {
                    selector: StudentSelector::One(fx.student_id),
                    session_id: fx.session_id,
                    period: BillingPeriod::new(2024, month),
                    due_date: None,
                    fee_type_ids: None,
                    auto_late_fees: None,
                },
                time,
                &mut events,
            )
            .unwrap();
        match &summary.results[0].status {
            crate::billing::GenerationStatus::Generated { bill_no, .. } => bill_no.clone(),
            other => panic!("expected a generated bill, got {other:?}"),
        }
    }

    fn payment(fx: &Fixture, amount: i64) -> PaymentRequest {
        PaymentRequest {
            student_id: fx.student_id,
            session_id: fx.session_id,
            details: vec![FeeDetailInput {
                fee_type_id: fx.tuition_id,
                amount: Money::from_major(amount),
                discount_amount: Money::ZERO,
            }],
            mode: PaymentMode::Cash,
            intent: PaymentIntent::Auto,
            receipt_no: None,
            remarks: None,
            date: None,
            collected_by: None,
        }
    }

    #[test]
    fn test_empty_and_non_positive_payments_rejected() {
        let fx = fixture();
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();
        let time = test_time();

        let mut req = payment(&fx, 100);
        req.details.clear();
        assert!(matches!(
            collector.collect(&req, &time, &mut events).unwrap_err(),
            FeeError::EmptyPayment
        ));

        let mut req = payment(&fx, 100);
        req.details[0].discount_amount = Money::from_major(100);
        assert!(matches!(
            collector.collect(&req, &time, &mut events).unwrap_err(),
            FeeError::NonPositivePayment { .. }
        ));
    }

    #[test]
    fn test_unknown_student_rejected() {
        let fx = fixture();
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();
        let time = test_time();

        let mut req = payment(&fx, 100);
        req.student_id = Uuid::new_v4();
        assert!(matches!(
            collector.collect(&req, &time, &mut events).unwrap_err(),
            FeeError::StudentNotFound { .. }
        ));
    }

    #[test]
    fn test_partial_then_full_payment_transitions() {
        let fx = fixture();
        let time = test_time();
        let bill_no = generate_bill(&fx, 6, &time);
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let receipt = collector
            .collect(&payment(&fx, 400), &time, &mut events)
            .unwrap();
        let applied = receipt.applied_to.unwrap();
        assert_eq!(applied.bill_no, bill_no);
        assert_eq!(applied.status, BillStatus::PartiallyPaid);
        assert_eq!(applied.balance, Money::from_major(600));

        let receipt = collector
            .collect(&payment(&fx, 600), &time, &mut events)
            .unwrap();
        let applied = receipt.applied_to.unwrap();
        assert_eq!(applied.status, BillStatus::Paid);
        assert_eq!(applied.balance, Money::ZERO);

        let bill = FeeStore::get_bill(&fx.store, &bill_no).unwrap().unwrap();
        assert_eq!(bill.paid_amount, Money::from_major(1_000));
        assert_eq!(bill.paid_date, Some(time.now().date_naive()));
    }

    #[test]
    fn test_paid_amount_never_decreases() {
        let fx = fixture();
        let time = test_time();
        let bill_no = generate_bill(&fx, 6, &time);
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let mut last = Money::ZERO;
        for amount in [300, 100, 900] {
            collector
                .collect(&payment(&fx, amount), &time, &mut events)
                .unwrap();
            let bill = FeeStore::get_bill(&fx.store, &bill_no).unwrap().unwrap();
            assert!(bill.paid_amount >= last);
            last = bill.paid_amount;
        }
        // overpayment keeps Paid status and floors the balance
        let bill = FeeStore::get_bill(&fx.store, &bill_no).unwrap().unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.balance(), Money::ZERO);
    }

    #[test]
    fn test_auto_targets_oldest_open_bill() {
        let fx = fixture();
        let time = test_time();
        let june = generate_bill(&fx, 6, &time);
        let _july = generate_bill(&fx, 7, &time);
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let receipt = collector
            .collect(&payment(&fx, 500), &time, &mut events)
            .unwrap();
        assert_eq!(receipt.applied_to.unwrap().bill_no, june);
    }

    #[test]
    fn test_remarks_pattern_overrides_oldest() {
        let fx = fixture();
        let time = test_time();
        let _june = generate_bill(&fx, 6, &time);
        let controller = time.test_control().unwrap();
        controller.advance(chrono::Duration::seconds(1));
        let july = generate_bill(&fx, 7, &time);
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let mut req = payment(&fx, 500);
        req.remarks = Some(format!("Payment for Bill: {july}"));
        let receipt = collector.collect(&req, &time, &mut events).unwrap();
        assert_eq!(receipt.applied_to.unwrap().bill_no, july);
    }

    #[test]
    fn test_explicit_missing_bill_fails_before_writing() {
        let fx = fixture();
        let time = test_time();
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let mut req = payment(&fx, 500);
        req.intent = PaymentIntent::Bill("BILL000".to_string());
        assert!(matches!(
            collector.collect(&req, &time, &mut events).unwrap_err(),
            FeeError::BillNotFound { .. }
        ));
        assert!(FeeStore::transactions_for_student(&fx.store, fx.student_id, fx.session_id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_advance_intent_touches_no_bill() {
        let fx = fixture();
        let time = test_time();
        let bill_no = generate_bill(&fx, 6, &time);
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let mut req = payment(&fx, 500);
        req.intent = PaymentIntent::Advance;
        let receipt = collector.collect(&req, &time, &mut events).unwrap();
        assert!(receipt.applied_to.is_none());

        let bill = FeeStore::get_bill(&fx.store, &bill_no).unwrap().unwrap();
        assert_eq!(bill.paid_amount, Money::ZERO);

        let bills = FeeStore::bills_for_student(&fx.store, fx.student_id, fx.session_id).unwrap();
        let txns =
            FeeStore::transactions_for_student(&fx.store, fx.student_id, fx.session_id).unwrap();
        // 500 paid against 1000 billed: no surplus yet, but the payment
        // is visible to the session totals
        assert_eq!(advance_balance(&bills, &txns), Money::ZERO);
        assert_eq!(txns.len(), 1);
        assert!(txns[0].bill_no.is_none());
    }

    #[test]
    fn test_payment_with_no_open_bill_becomes_advance() {
        let fx = fixture();
        let time = test_time();
        let collector = FeeCollector::new(&fx.store, &fx.config);
        let mut events = EventStore::new();

        let receipt = collector
            .collect(&payment(&fx, 200), &time, &mut events)
            .unwrap();
        assert!(receipt.applied_to.is_none());
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::AdvanceRecorded { .. })));

        let bills = FeeStore::bills_for_student(&fx.store, fx.student_id, fx.session_id).unwrap();
        let txns =
            FeeStore::transactions_for_student(&fx.store, fx.student_id, fx.session_id).unwrap();
        assert_eq!(advance_balance(&bills, &txns), Money::from_major(200));
    }
}
