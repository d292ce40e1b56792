use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calendar;
use crate::config::{ScheduleConfig, MAX_APR};
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::DuePayment;

/// equal-installment schedule computed at origination
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub apr: Rate,
    pub term_months: u32,
    pub disbursement_date: NaiveDate,
    /// installment amount before rounding to the currency unit
    pub exact_installment: Money,
    pub installments: Vec<DuePayment>,
}

impl AmortizationSchedule {
    pub fn installment_amount(&self) -> Money {
        self.installments
            .first()
            .map(|due| due.amount_due)
            .unwrap_or(Money::ZERO)
    }

    pub fn total_due(&self) -> Money {
        self.installments.iter().map(|due| due.amount_due).sum()
    }

    /// total due in excess of the principal
    pub fn total_interest(&self) -> Money {
        self.total_due() - self.principal
    }

    pub fn first_due_date(&self) -> Option<NaiveDate> {
        self.installments.first().map(|due| due.due_date)
    }

    pub fn last_due_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|due| due.due_date)
    }

    pub fn into_installments(self) -> Vec<DuePayment> {
        self.installments
    }
}

/// amortization scheduler
pub struct AmortizationScheduler<'a> {
    config: &'a ScheduleConfig,
}

impl<'a> AmortizationScheduler<'a> {
    pub fn new(config: &'a ScheduleConfig) -> Self {
        Self { config }
    }

    /// materialize `term_months` installments of equal amount
    ///
    /// Each installment falls `installment_interval_days` after the previous
    /// one, counting from the disbursement date. Every amount is the EMI
    /// rounded to cents; the residue from rounding stays unreconciled unless
    /// `reconcile_final_installment` is set, in which case the last
    /// installment absorbs it.
    pub fn generate(
        &self,
        principal: Money,
        apr: Rate,
        term_months: u32,
        disbursement_date: NaiveDate,
    ) -> Result<AmortizationSchedule> {
        if term_months == 0 {
            return Err(LendingError::validation("term must be at least one month"));
        }
        if !principal.is_positive() {
            return Err(LendingError::validation("principal must be positive"));
        }
        if apr.is_negative() || apr.as_decimal() > MAX_APR {
            return Err(LendingError::validation(format!("apr {} outside [0, {}]", apr, MAX_APR)));
        }
        if term_months > self.config.max_term_months {
            return Err(LendingError::validation(format!(
                "term of {} months above configured maximum {}",
                term_months, self.config.max_term_months
            )));
        }

        let exact = calculate_emi(principal, apr, term_months)?;
        let installment = exact.to_currency();

        let mut installments = (0..term_months)
            .map(|i| {
                Ok(DuePayment {
                    installment: i + 1,
                    due_date: calendar::installment_due_date(
                        disbursement_date,
                        i,
                        self.config.installment_interval_days,
                    )?,
                    amount_due: installment,
                    amount_paid: Money::ZERO,
                })
            })
            .collect::<Result<Vec<DuePayment>>>()?;

        if self.config.reconcile_final_installment {
            let exact_total = exact
                .as_decimal()
                .checked_mul(Decimal::from(term_months))
                .map(|total| Money::from_decimal(total).to_currency())
                .ok_or_else(overflow)?;
            let scheduled_before_last = installment * Decimal::from(term_months - 1);
            if let Some(last) = installments.last_mut() {
                last.amount_due = exact_total - scheduled_before_last;
            }
        }

        Ok(AmortizationSchedule {
            principal,
            apr,
            term_months,
            disbursement_date,
            exact_installment: exact,
            installments,
        })
    }
}

fn overflow() -> LendingError {
    LendingError::validation("rate and term overflow the installment calculation")
}

/// equal monthly installment before rounding
///
/// `EMI = P * r / (1 - (1 + r)^-n)` with `r = apr / 12`, evaluated as
/// `P * r * (1 + r)^n / ((1 + r)^n - 1)`. A zero APR makes the denominator
/// vanish, so it is handled as straight division of the principal.
pub fn calculate_emi(principal: Money, apr: Rate, months: u32) -> Result<Money> {
    if months == 0 {
        return Err(LendingError::validation("term must be at least one month"));
    }

    let r = apr.monthly_rate().as_decimal();

    if r.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    let base = Decimal::ONE + r;
    let mut compound = Decimal::ONE;
    for _ in 0..months {
        compound = compound
            .checked_mul(base)
            .ok_or_else(overflow)?;
    }

    let denominator = compound - Decimal::ONE;
    principal
        .as_decimal()
        .checked_mul(r)
        .and_then(|scaled| scaled.checked_mul(compound))
        .and_then(|numerator| numerator.checked_div(denominator))
        .map(Money::from_decimal)
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn disbursed() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_emi_twelve_percent_one_year() {
        let emi = calculate_emi(Money::from_major(1_200), Rate::from_percentage(12), 12).unwrap();
        assert_eq!(emi.to_currency(), Money::from_decimal(dec!(106.62)));
    }

    #[test]
    fn test_emi_zero_apr_is_straight_division() {
        let emi = calculate_emi(Money::from_major(1_200), Rate::ZERO, 12).unwrap();
        assert_eq!(emi, Money::from_major(100));

        let emi = calculate_emi(Money::from_major(1_000), Rate::ZERO, 3).unwrap();
        assert_eq!(emi.to_currency(), Money::from_decimal(dec!(333.33)));
    }

    #[test]
    fn test_emi_overflow_is_an_error() {
        let apr = Rate::from_decimal(dec!(100000000000000000000));
        let err = calculate_emi(Money::from_major(1_000), apr, 1).unwrap_err();
        assert!(matches!(err, LendingError::Validation { .. }));

        let err = calculate_emi(Money::from_decimal(Decimal::MAX), Rate::from_percentage(12), 12).unwrap_err();
        assert!(matches!(err, LendingError::Validation { .. }));
    }

    #[test]
    fn test_schedule_rejects_unbounded_terms() {
        let config = ScheduleConfig::default();
        let scheduler = AmortizationScheduler::new(&config);

        let err = scheduler
            .generate(Money::from_major(1_000), Rate::ZERO, 3_300_000, disbursed())
            .unwrap_err();
        assert!(matches!(err, LendingError::Validation { .. }));
        assert!(scheduler
            .generate(Money::from_major(1_000), Rate::from_decimal(dec!(100000000000000000000)), 1, disbursed())
            .is_err());

        // due dates past the calendar's end surface as errors
        let wide = ScheduleConfig {
            installment_interval_days: 1_000_000,
            ..ScheduleConfig::default()
        };
        let err = AmortizationScheduler::new(&wide)
            .generate(Money::from_major(1_000), Rate::ZERO, 360, disbursed())
            .unwrap_err();
        assert!(matches!(err, LendingError::Validation { .. }));
    }

    #[test]
    fn test_emi_rejects_zero_term() {
        assert!(calculate_emi(Money::from_major(1_000), Rate::ZERO, 0).is_err());
    }

    #[test]
    fn test_schedule_shape() {
        let config = ScheduleConfig::default();
        let schedule = AmortizationScheduler::new(&config)
            .generate(Money::from_major(1_200), Rate::from_percentage(12), 12, disbursed())
            .unwrap();

        assert_eq!(schedule.installments.len(), 12);
        assert!(schedule
            .installments
            .iter()
            .all(|due| due.amount_due == Money::from_decimal(dec!(106.62)) && due.amount_paid.is_zero()));
        assert_eq!(schedule.first_due_date(), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(schedule.last_due_date(), NaiveDate::from_ymd_opt(2024, 12, 26));
        for pair in schedule.installments.windows(2) {
            assert!(pair[0].due_date < pair[1].due_date);
            assert_eq!(pair[1].installment, pair[0].installment + 1);
        }

        // 12 x 106.62
        assert_eq!(schedule.total_due(), Money::from_decimal(dec!(1279.44)));
        assert_eq!(schedule.total_interest(), Money::from_decimal(dec!(79.44)));
    }

    #[test]
    fn test_unreconciled_residue_stays() {
        let config = ScheduleConfig::default();
        let schedule = AmortizationScheduler::new(&config)
            .generate(Money::from_major(1_000), Rate::ZERO, 3, disbursed())
            .unwrap();

        assert_eq!(schedule.total_due(), Money::from_decimal(dec!(999.99)));
    }

    #[test]
    fn test_reconciled_final_installment() {
        let config = ScheduleConfig {
            reconcile_final_installment: true,
            ..ScheduleConfig::default()
        };
        let schedule = AmortizationScheduler::new(&config)
            .generate(Money::from_major(1_000), Rate::ZERO, 3, disbursed())
            .unwrap();

        assert_eq!(schedule.installments[0].amount_due, Money::from_decimal(dec!(333.33)));
        assert_eq!(schedule.installments[2].amount_due, Money::from_decimal(dec!(333.34)));
        assert_eq!(schedule.total_due(), Money::from_major(1_000));
    }

    #[test]
    fn test_single_installment() {
        let config = ScheduleConfig::default();
        let schedule = AmortizationScheduler::new(&config)
            .generate(Money::from_major(500), Rate::from_percentage(12), 1, disbursed())
            .unwrap();

        // one month at 1%
        assert_eq!(schedule.installments.len(), 1);
        assert_eq!(schedule.installment_amount(), Money::from_major(505));
    }

    #[test]
    fn test_rejects_bad_terms() {
        let config = ScheduleConfig::default();
        let scheduler = AmortizationScheduler::new(&config);
        assert!(scheduler.generate(Money::ZERO, Rate::ZERO, 12, disbursed()).is_err());
        assert!(scheduler.generate(Money::from_major(100), Rate::ZERO, 0, disbursed()).is_err());
        assert!(scheduler
            .generate(Money::from_major(100), Rate::from_decimal(dec!(-0.1)), 12, disbursed())
            .is_err());
    }
}
