use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::ledger::LoanTerms;
use crate::types::{LoanId, UserId};

/// loan application as received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLoanApplication {
    pub user_id: Option<String>,
    pub loan_amount: Option<String>,
    pub interest_rate: Option<String>,
    pub term_period: Option<String>,
    pub disbursement_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub user_id: UserId,
    pub terms: LoanTerms,
}

impl LoanApplication {
    pub fn parse(raw: &RawLoanApplication) -> Result<Self> {
        let user_id = parse_uuid("user_id", required("user_id", &raw.user_id)?)?;
        let loan_amount = parse_money("loan_amount", required("loan_amount", &raw.loan_amount)?)?;
        let apr = Rate::from_str(required("interest_rate", &raw.interest_rate)?)
            .map_err(|e| LendingError::validation(format!("interest_rate: {}", e)))?;
        let term_months = required("term_period", &raw.term_period)?
            .parse::<u32>()
            .map_err(|e| LendingError::validation(format!("term_period: {}", e)))?;
        let disbursement_date = parse_date("disbursement_date", required("disbursement_date", &raw.disbursement_date)?)?;

        let terms = LoanTerms {
            loan_amount,
            apr,
            term_months,
            disbursement_date,
        };
        terms.validate()?;

        Ok(Self { user_id, terms })
    }
}

/// installment payment as received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPayment {
    pub loan_id: Option<String>,
    pub amount: Option<String>,
    pub payment_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSubmission {
    pub loan_id: LoanId,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
}

impl PaymentSubmission {
    /// `payment_date` takes either an RFC 3339 instant or a plain date,
    /// the latter read as midnight UTC
    pub fn parse(raw: &RawPayment) -> Result<Self> {
        let loan_id = parse_uuid("loan_id", required("loan_id", &raw.loan_id)?)?;
        let amount = parse_money("amount", required("amount", &raw.amount)?)?;
        if !amount.is_positive() {
            return Err(LendingError::validation("amount must be positive"));
        }
        let paid_at = parse_instant("payment_date", required("payment_date", &raw.payment_date)?)?;

        Ok(Self {
            loan_id,
            amount,
            paid_at,
        })
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LendingError::validation(format!("missing required field {}", field))),
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| LendingError::validation(format!("{}: {}", field, e)))
}

fn parse_money(field: &str, value: &str) -> Result<Money> {
    Money::from_str(value).map_err(|e| LendingError::validation(format!("{}: {}", field, e)))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| LendingError::validation(format!("{}: {}", field, e)))
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = parse_date(field, value)?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| LendingError::validation(format!("{}: invalid date", field)))
}
