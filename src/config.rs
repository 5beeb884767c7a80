use serde::{Deserialize, Serialize};

/// billing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// fee head whose structure amount is the late fee per overdue month
    pub late_fee_head: String,
    /// apply late fees during generation unless the request opts out
    pub auto_late_fees: bool,
    /// how many times a versioned bill update is retried before giving up
    pub payment_update_retries: u32,
    /// how many transactions a statement lists when no date range is given
    pub recent_transaction_limit: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            late_fee_head: "Late Fee".to_string(),
            auto_late_fees: true,
            payment_update_retries: 3,
            recent_transaction_limit: 10,
        }
    }
}

impl BillingConfig {
    pub fn with_late_fee_head(mut self, head: impl Into<String>) -> Self {
        self.late_fee_head = head.into();
        self
    }
}
