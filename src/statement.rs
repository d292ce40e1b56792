use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::store::LoanRecord;
use crate::types::{DuePayment, LoanId, Payment};

/// payment history and open installments of one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub loan_id: LoanId,
    pub principal_balance: Money,
    pub past_payments: Vec<Payment>,
    pub upcoming_obligations: Vec<DuePayment>,
}

impl Statement {
    pub fn total_paid(&self) -> Money {
        self.past_payments.iter().map(|payment| payment.amount).sum()
    }

    pub fn total_upcoming(&self) -> Money {
        self.upcoming_obligations.iter().map(|due| due.amount_due).sum()
    }
}

/// read-only projection of a loan snapshot
pub fn build_statement(record: &LoanRecord) -> Statement {
    let mut upcoming_obligations: Vec<DuePayment> = record.unpaid_installments().cloned().collect();
    upcoming_obligations.sort_by_key(|due| (due.due_date, due.installment));

    Statement {
        loan_id: record.loan().id,
        principal_balance: record.loan().principal_balance,
        past_payments: record.payments().to_vec(),
        upcoming_obligations,
    }
}
