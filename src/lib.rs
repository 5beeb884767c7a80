pub mod billing;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod model;
pub mod numbering;
pub mod payments;
pub mod statement;
pub mod store;
pub mod types;

// re-export key types
pub use config::BillingConfig;
pub use decimal::Money;
pub use engine::FeeLedger;
pub use errors::{FeeError, Result};
pub use events::{Event, EventStore};
pub use billing::{
    BatchSummary, BillGenerator, GenerateRequest, GenerationStatus, StudentOutcome,
    StudentSelector,
};
pub use model::{
    DemandBill, DemandBillItem, FeeStructure, FeeStructureItem, FeeTransaction, FeeType,
    PaymentDetail, Session, Student, StudentFeeDiscount,
};
pub use payments::{BillApplication, FeeCollector, FeeDetailInput, PaymentRequest, Receipt};
pub use statement::{
    display_status, FeeHeadSummary, PendingBill, SessionSummary, StatementBuilder,
    StatementQuery, StudentStatement,
};
pub use store::{FeeStore, MemoryStore, SessionRegistry, StudentDirectory};
pub use types::{
    BillStatus, BillingFrequency, BillingPeriod, Discount, FeeTypeId, PaymentIntent,
    PaymentMode, SessionId, StudentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
