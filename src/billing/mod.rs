pub mod advance;
pub mod dues;
pub mod generator;
pub mod resolver;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BillingPeriod, FeeTypeId, SessionId, StudentId};

pub use generator::BillGenerator;
pub use resolver::ResolvedFeeItem;

/// which students a generation run targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentSelector {
    One(StudentId),
    Many(Vec<StudentId>),
    Class {
        class_name: String,
        section: Option<String>,
    },
}

/// batch generation request for one billing period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub selector: StudentSelector,
    pub session_id: SessionId,
    pub period: BillingPeriod,
    pub due_date: Option<NaiveDate>,
    /// bill only these fee heads when given
    pub fee_type_ids: Option<Vec<FeeTypeId>>,
    /// overrides `BillingConfig::auto_late_fees` when given
    pub auto_late_fees: Option<bool>,
}

/// per-student generation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GenerationStatus {
    Generated { bill_no: String, amount: Money },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentOutcome {
    pub student_id: StudentId,
    pub student_name: String,
    pub status: GenerationStatus,
}

/// aggregate of a batch run; partial failure is the normal mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<StudentOutcome>,
}

impl BatchSummary {
    /// fold per-student outcomes into the aggregate counts
    pub fn from_outcomes(results: Vec<StudentOutcome>) -> Self {
        let (generated, skipped, failed) =
            results
                .iter()
                .fold((0, 0, 0), |(g, s, f), outcome| match outcome.status {
                    GenerationStatus::Generated { .. } => (g + 1, s, f),
                    GenerationStatus::Skipped { .. } => (g, s + 1, f),
                    GenerationStatus::Failed { .. } => (g, s, f + 1),
                });
        Self {
            total: results.len(),
            generated,
            skipped,
            failed,
            results,
        }
    }
}
