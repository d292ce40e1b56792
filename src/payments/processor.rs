use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::reduce_principal;
use crate::store::{LedgerStore, LoanRecord};
use crate::types::{LoanId, Payment, PaymentKind};

/// outcome of settling one installment
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub payment: Payment,
    pub installment: u32,
    pub due_date: NaiveDate,
    pub principal_balance: Money,
    pub remaining_installments: usize,
}

/// settle the earliest unpaid installment of a working copy
///
/// The installment must already be due on the payment date and the amount
/// must match it exactly. On success the installment is marked paid, the
/// principal drops by the amount, and a payment is appended to the history.
/// Callers run this inside a loan-scoped unit of work so any error discards
/// every change made here.
pub fn settle_next_installment(
    record: &mut LoanRecord,
    amount: Money,
    paid_at: DateTime<Utc>,
) -> Result<Settlement> {
    let loan_id = record.loan.id;
    let payment_date = paid_at.date_naive();

    let index = record
        .schedule
        .iter()
        .enumerate()
        .filter(|(_, due)| !due.is_paid())
        .min_by_key(|(_, due)| (due.due_date, due.installment))
        .map(|(index, _)| index)
        .ok_or(LendingError::NoObligationDue { loan_id })?;

    let due = &mut record.schedule[index];
    if payment_date < due.due_date {
        return Err(LendingError::TooEarly {
            due_date: due.due_date,
            payment_date,
        });
    }
    if amount != due.amount_due {
        return Err(LendingError::AmountMismatch {
            expected: due.amount_due,
            provided: amount,
        });
    }

    due.amount_paid = amount;
    let installment = due.installment;
    let due_date = due.due_date;

    let principal_balance = reduce_principal(&mut record.loan, amount)?;

    let payment = Payment {
        id: Uuid::new_v4(),
        loan_id,
        amount,
        paid_at,
        kind: PaymentKind::Installment { installment },
    };
    record.record_payment(payment.clone());

    Ok(Settlement {
        payment,
        installment,
        due_date,
        principal_balance,
        remaining_installments: record.unpaid_installments().count(),
    })
}

/// applies incoming installment payments against the ledger
pub struct PaymentProcessor<'a, S> {
    store: &'a S,
}

impl<'a, S: LedgerStore> PaymentProcessor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn apply_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        paid_at: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<Settlement> {
        if !amount.is_positive() {
            return Err(LendingError::validation("payment amount must be positive"));
        }

        let settlement = self
            .store
            .update_loan(loan_id, |record| settle_next_installment(record, amount, paid_at))?;

        info!(
            loan_id = %loan_id,
            installment = settlement.installment,
            amount = %amount,
            balance = %settlement.principal_balance,
            "installment settled"
        );

        events.emit(Event::PaymentApplied {
            loan_id,
            installment: settlement.installment,
            amount,
            due_date: settlement.due_date,
            timestamp: paid_at,
        });
        events.emit(Event::PrincipalReduced {
            loan_id,
            amount,
            new_balance: settlement.principal_balance,
            timestamp: paid_at,
        });
        if settlement.principal_balance.is_zero() {
            events.emit(Event::LoanSettled {
                loan_id,
                timestamp: paid_at,
            });
        }

        Ok(settlement)
    }
}
