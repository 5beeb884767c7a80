use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;

use crate::billing::{BatchSummary, BillGenerator, GenerateRequest};
use crate::config::BillingConfig;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::payments::{FeeCollector, PaymentRequest, Receipt};
use crate::statement::{StatementBuilder, StatementQuery, StudentStatement};
use crate::store::{FeeStore, SessionRegistry, StudentDirectory};

/// the fee ledger engine: demand-bill generation, payment collection and
/// statements over an injected store
///
/// Operations take `&mut self`, so one engine instance serializes its own
/// read-check-write sequences. Deployments sharing a store between
/// instances rely on the store contract (atomic bill insert, versioned
/// payment writes) for the cross-instance races.
pub struct FeeLedger<S: ?Sized> {
    store: Arc<S>,
    config: BillingConfig,
    events: EventStore,
}

impl<S> FeeLedger<S>
where
    S: FeeStore + StudentDirectory + SessionRegistry + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, BillingConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: BillingConfig) -> Self {
        Self {
            store,
            config,
            events: EventStore::new(),
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// generate one demand bill per targeted student for a period
    pub fn generate_bills(
        &mut self,
        request: &GenerateRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<BatchSummary> {
        BillGenerator::new(self.store.as_ref(), &self.config).generate(
            request,
            time_provider,
            &mut self.events,
        )
    }

    /// record a payment and allocate it against the matching bill
    pub fn collect_fee(
        &mut self,
        request: &PaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Receipt> {
        FeeCollector::new(self.store.as_ref(), &self.config).collect(
            request,
            time_provider,
            &mut self.events,
        )
    }

    /// read-only statement and dashboard projection
    pub fn statement(
        &self,
        query: &StatementQuery,
        time_provider: &SafeTimeProvider,
    ) -> Result<StudentStatement> {
        StatementBuilder::new(self.store.as_ref(), &self.config).build(query, time_provider)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }
}
