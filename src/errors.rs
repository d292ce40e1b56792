use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{EligibilityFailure, LoanId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("not eligible: {0}")]
    Eligibility(EligibilityFailure),

    #[error("insufficient balance: outstanding {balance}, requested {requested}")]
    InsufficientBalance {
        balance: Money,
        requested: Money,
    },

    #[error("loan {loan_id} is already settled")]
    AlreadySettled {
        loan_id: LoanId,
    },

    #[error("no unpaid installment on loan {loan_id}")]
    NoObligationDue {
        loan_id: LoanId,
    },

    #[error("payment on {payment_date} precedes installment due {due_date}")]
    TooEarly {
        due_date: NaiveDate,
        payment_date: NaiveDate,
    },

    #[error("payment amount mismatch: expected {expected}, provided {provided}")]
    AmountMismatch {
        expected: Money,
        provided: Money,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },
}

impl LendingError {
    pub fn validation(message: impl Into<String>) -> Self {
        LendingError::Validation {
            message: message.into(),
        }
    }

    pub fn user_not_found(id: impl ToString) -> Self {
        LendingError::NotFound {
            entity: "user",
            id: id.to_string(),
        }
    }

    pub fn loan_not_found(id: impl ToString) -> Self {
        LendingError::NotFound {
            entity: "loan",
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
