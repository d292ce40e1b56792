use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::errors::{LendingError, Result};

/// length of one installment period in days
pub const INSTALLMENT_PERIOD_DAYS: i64 = 30;

/// signed whole days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

fn out_of_range(from: impl std::fmt::Display, days: i64) -> LendingError {
    LendingError::validation(format!("{} shifted by {} days is out of calendar range", from, days))
}

/// shift a date by a signed number of days
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| out_of_range(date, days))
}

/// due date of the zero-based installment `index` for a loan disbursed on `disbursement`
///
/// Intervals roll on fixed day counts, never snapping to month ends.
pub fn installment_due_date(disbursement: NaiveDate, index: u32, period_days: i64) -> Result<NaiveDate> {
    let offset = period_days
        .checked_mul(i64::from(index) + 1)
        .ok_or_else(|| out_of_range(disbursement, i64::MAX))?;
    add_days(disbursement, offset)
}

/// calendar date of an instant, offset by whole days
pub fn date_after(instant: DateTime<Utc>, days: i64) -> Result<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| instant.checked_add_signed(delta))
        .map(|shifted| shifted.date_naive())
        .ok_or_else(|| out_of_range(instant, days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(days_between(date(2024, 1, 1), date(2024, 3, 1)), 60); // leap february
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 1, 1)), -60);
        assert_eq!(days_between(date(2024, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_installments_ignore_month_ends() {
        let disbursed = date(2024, 1, 31);
        assert_eq!(installment_due_date(disbursed, 0, INSTALLMENT_PERIOD_DAYS).unwrap(), date(2024, 3, 1));
        assert_eq!(installment_due_date(disbursed, 1, INSTALLMENT_PERIOD_DAYS).unwrap(), date(2024, 3, 31));
        assert_eq!(installment_due_date(disbursed, 2, INSTALLMENT_PERIOD_DAYS).unwrap(), date(2024, 4, 30));
    }

    #[test]
    fn test_date_after_instant() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        assert_eq!(date_after(created, 30).unwrap(), date(2024, 1, 31));
        assert_eq!(date_after(created, 45).unwrap(), date(2024, 2, 15));
    }

    #[test]
    fn test_out_of_range_dates_are_errors() {
        let err = add_days(NaiveDate::MAX, 1).unwrap_err();
        assert!(matches!(err, LendingError::Validation { .. }));
        assert!(add_days(date(2024, 1, 1), i64::MAX).is_err());

        // zero-APR term of 3,300,000 months runs past the last representable date
        assert!(installment_due_date(date(2024, 1, 1), 3_299_999, INSTALLMENT_PERIOD_DAYS).is_err());
        assert!(installment_due_date(date(2024, 1, 1), u32::MAX, i64::MAX).is_err());

        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(date_after(created, 400_000_000).is_err());
    }
}
