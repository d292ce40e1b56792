use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// unique identifier for a user
pub type UserId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a billing record
pub type BillingId = Uuid;

/// unique identifier for a payment record
pub type PaymentId = Uuid;

/// externally computed credit score
pub type CreditScore = i32;

/// borrower identity and eligibility attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub annual_income: Money,
    pub credit_score: CreditScore,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, annual_income: Money, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            annual_income,
            credit_score: 0,
            created_at,
        }
    }

    pub fn with_credit_score(mut self, score: CreditScore) -> Self {
        self.credit_score = score;
        self
    }
}

/// a single credit extension
///
/// `apr` and `term_months` never change after origination and
/// `principal_balance` stays within `0..=loan_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    pub loan_amount: Money,
    pub principal_balance: Money,
    pub apr: Rate,
    pub term_months: u32,
    pub disbursement_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_settled(&self) -> bool {
        self.principal_balance.is_zero()
    }
}

/// one scheduled installment obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuePayment {
    pub installment: u32,
    pub due_date: NaiveDate,
    pub amount_due: Money,
    pub amount_paid: Money,
}

impl DuePayment {
    pub fn is_paid(&self) -> bool {
        !self.amount_paid.is_zero()
    }
}

/// immutable record of one payment event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
    pub kind: PaymentKind,
}

/// how a payment reached the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    /// settled the earliest scheduled installment
    Installment { installment: u32 },
    /// free-form principal repayment outside the schedule
    Repayment,
}

/// periodic billing snapshot for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    pub id: BillingId,
    pub user_id: UserId,
    /// loan the bill was computed for; `None` for ad-hoc bills spanning all loans
    pub loan_id: Option<LoanId>,
    pub bill_date: NaiveDate,
    pub due_date: NaiveDate,
    pub min_due: Money,
    pub paid: bool,
    pub policy: BillingPolicy,
}

/// which billing policy produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingPolicy {
    /// scheduled cycle anchored to account creation
    Cycle,
    /// on-demand bill anchored to the request date
    AdHoc,
}

/// reasons an applicant fails the eligibility gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityFailure {
    CreditScoreTooLow {
        score: CreditScore,
        minimum: CreditScore,
    },
    IncomeTooLow {
        income: Money,
        minimum: Money,
    },
    AmountExceedsLimit {
        requested: Money,
        limit: Money,
    },
}

impl fmt::Display for EligibilityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EligibilityFailure::CreditScoreTooLow { score, minimum } => {
                write!(f, "credit score {} below minimum {}", score, minimum)
            }
            EligibilityFailure::IncomeTooLow { income, minimum } => {
                write!(f, "annual income {} below minimum {}", income, minimum)
            }
            EligibilityFailure::AmountExceedsLimit { requested, limit } => {
                write!(f, "loan amount {} exceeds limit {}", requested, limit)
            }
        }
    }
}
