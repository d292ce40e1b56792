use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar::INSTALLMENT_PERIOD_DAYS;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::types::CreditScore;

/// longest term any configuration may allow (50 years)
pub const MAX_TERM_MONTHS: u32 = 600;

/// highest accepted APR as a fraction (999.99%)
pub const MAX_APR: Decimal = dec!(9.9999);

/// lending policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LendingConfig {
    pub eligibility: EligibilityPolicy,
    pub schedule: ScheduleConfig,
    pub billing: BillingConfig,
    pub ad_hoc_bill: AdHocBillConfig,
}

/// origination gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    pub min_credit_score: CreditScore,
    pub min_annual_income: Money,
    pub max_loan_amount: Money,
}

/// installment schedule generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// fixed days between installments (not calendar months)
    pub installment_interval_days: i64,
    /// fold the cumulative rounding residue into the last installment
    pub reconcile_final_installment: bool,
    #[serde(default = "default_max_term_months")]
    pub max_term_months: u32,
}

fn default_max_term_months() -> u32 {
    360
}

/// scheduled billing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// bill date offset from account creation
    pub first_bill_offset_days: i64,
    /// due date offset from bill date
    pub due_offset_days: i64,
    /// fraction of principal balance in the minimum due
    pub principal_share: Decimal,
    /// decimal places the daily rate is rounded to before accruing
    pub daily_rate_dp: u32,
    pub future_disbursement: FutureDisbursementPolicy,
}

/// what the billing cycle does with a loan disbursed after the run date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FutureDisbursementPolicy {
    /// accrue zero days of interest
    Clamp,
    /// fail the user's billing and continue with the batch
    Reject,
}

/// on-demand bill across all of a user's loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdHocBillConfig {
    pub due_offset_days: i64,
    /// fraction of total outstanding balance in the minimum due
    pub balance_share: Decimal,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            min_credit_score: 450,
            min_annual_income: Money::from_major(150_000),
            max_loan_amount: Money::from_major(5_000),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            installment_interval_days: INSTALLMENT_PERIOD_DAYS,
            reconcile_final_installment: false,
            max_term_months: default_max_term_months(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            first_bill_offset_days: 30,
            due_offset_days: 15,
            principal_share: dec!(0.03),
            daily_rate_dp: 3,
            future_disbursement: FutureDisbursementPolicy::Clamp,
        }
    }
}

impl Default for AdHocBillConfig {
    fn default() -> Self {
        Self {
            due_offset_days: 30,
            balance_share: dec!(0.05),
        }
    }
}

impl LendingConfig {
    /// parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LendingConfig = serde_json::from_str(json)
            .map_err(|e| LendingError::validation(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LendingError::validation(format!("unserializable configuration: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.eligibility.max_loan_amount.is_negative() || self.eligibility.min_annual_income.is_negative() {
            return Err(LendingError::validation("eligibility amounts must not be negative"));
        }
        if self.schedule.installment_interval_days <= 0 {
            return Err(LendingError::validation("installment interval must be at least one day"));
        }
        if self.schedule.max_term_months == 0 || self.schedule.max_term_months > MAX_TERM_MONTHS {
            return Err(LendingError::validation(format!(
                "max term must be between 1 and {} months",
                MAX_TERM_MONTHS
            )));
        }
        if self.billing.due_offset_days < 0 || self.ad_hoc_bill.due_offset_days < 0 {
            return Err(LendingError::validation("due offsets must not be negative"));
        }
        for share in [self.billing.principal_share, self.ad_hoc_bill.balance_share] {
            if share < Decimal::ZERO || share > Decimal::ONE {
                return Err(LendingError::validation(format!("share {} outside [0, 1]", share)));
            }
        }
        Ok(())
    }
}
