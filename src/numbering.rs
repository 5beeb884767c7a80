use hourglass_rs::SafeTimeProvider;

use crate::types::BillingPeriod;

/// bill number: BILL{year}{month:02}{unix_millis}, grep-able by period
pub fn bill_number(time_provider: &SafeTimeProvider, period: BillingPeriod) -> String {
    format!(
        "BILL{}{:02}{}",
        period.year,
        period.month,
        time_provider.now().timestamp_millis()
    )
}

/// receipt number, minted when the caller supplies none
pub fn receipt_number(time_provider: &SafeTimeProvider) -> String {
    format!("REC{}", time_provider.now().timestamp_millis())
}

/// transaction number
pub fn transaction_number(time_provider: &SafeTimeProvider) -> String {
    format!("TXN{}", time_provider.now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    #[test]
    fn test_number_formats() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let millis = start.timestamp_millis();

        let period = BillingPeriod::new(2024, 6);
        assert_eq!(bill_number(&time, period), format!("BILL202406{millis}"));
        assert_eq!(receipt_number(&time), format!("REC{millis}"));
        assert_eq!(transaction_number(&time), format!("TXN{millis}"));
    }
}
