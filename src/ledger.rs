use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::{EligibilityPolicy, LendingConfig, MAX_APR, MAX_TERM_MONTHS};
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::payments::AmortizationScheduler;
use crate::store::{LedgerStore, LoanRecord};
use crate::types::{CreditScore, EligibilityFailure, Loan, LoanId, Payment, PaymentKind, User};

/// requested terms of a new loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub loan_amount: Money,
    pub apr: Rate,
    pub term_months: u32,
    pub disbursement_date: NaiveDate,
}

impl LoanTerms {
    pub fn validate(&self) -> Result<()> {
        if !self.loan_amount.is_positive() {
            return Err(LendingError::validation("loan amount must be positive"));
        }
        if self.loan_amount != self.loan_amount.to_currency() {
            return Err(LendingError::validation("loan amount has more than two decimal places"));
        }
        if self.apr.is_negative() {
            return Err(LendingError::validation("apr must not be negative"));
        }
        if self.apr.as_decimal() > MAX_APR {
            return Err(LendingError::validation(format!("apr {} above maximum {}", self.apr, MAX_APR)));
        }
        if self.term_months == 0 {
            return Err(LendingError::validation("term must be at least one month"));
        }
        if self.term_months > MAX_TERM_MONTHS {
            return Err(LendingError::validation(format!(
                "term of {} months above maximum {}",
                self.term_months, MAX_TERM_MONTHS
            )));
        }
        Ok(())
    }
}

/// check an applicant against the origination gate
///
/// Checks run in a fixed order (score, income, amount) and the first failure wins.
pub fn check_eligibility(
    policy: &EligibilityPolicy,
    user: &User,
    credit_score: CreditScore,
    loan_amount: Money,
) -> Result<()> {
    if credit_score < policy.min_credit_score {
        return Err(LendingError::Eligibility(EligibilityFailure::CreditScoreTooLow {
            score: credit_score,
            minimum: policy.min_credit_score,
        }));
    }
    if user.annual_income < policy.min_annual_income {
        return Err(LendingError::Eligibility(EligibilityFailure::IncomeTooLow {
            income: user.annual_income,
            minimum: policy.min_annual_income,
        }));
    }
    if loan_amount > policy.max_loan_amount {
        return Err(LendingError::Eligibility(EligibilityFailure::AmountExceedsLimit {
            requested: loan_amount,
            limit: policy.max_loan_amount,
        }));
    }
    Ok(())
}

/// decrement the principal balance of a working copy
///
/// Returns the new balance.
pub fn reduce_principal(loan: &mut Loan, amount: Money) -> Result<Money> {
    if !amount.is_positive() {
        return Err(LendingError::validation("reduction must be positive"));
    }
    if loan.principal_balance.is_zero() {
        return Err(LendingError::AlreadySettled { loan_id: loan.id });
    }
    if amount > loan.principal_balance {
        return Err(LendingError::InsufficientBalance {
            balance: loan.principal_balance,
            requested: amount,
        });
    }

    loan.principal_balance -= amount;
    Ok(loan.principal_balance)
}

pub fn outstanding_balance(loan: &Loan) -> Money {
    loan.principal_balance
}

/// loan ledger over a store
pub struct LoanLedger<'a, S> {
    store: &'a S,
    config: &'a LendingConfig,
}

impl<'a, S: LedgerStore> LoanLedger<'a, S> {
    pub fn new(store: &'a S, config: &'a LendingConfig) -> Self {
        Self { store, config }
    }

    /// originate a loan and its schedule as one unit
    ///
    /// Validation and eligibility are settled before anything is written.
    pub fn originate(
        &self,
        user: &User,
        credit_score: CreditScore,
        terms: &LoanTerms,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<LoanRecord> {
        terms.validate()?;
        check_eligibility(&self.config.eligibility, user, credit_score, terms.loan_amount)?;

        let schedule = AmortizationScheduler::new(&self.config.schedule).generate(
            terms.loan_amount,
            terms.apr,
            terms.term_months,
            terms.disbursement_date,
        )?;

        let loan = Loan {
            id: Uuid::new_v4(),
            user_id: user.id,
            loan_amount: terms.loan_amount,
            principal_balance: terms.loan_amount,
            apr: terms.apr,
            term_months: terms.term_months,
            disbursement_date: terms.disbursement_date,
            created_at: now,
        };

        let installment_amount = schedule.installment_amount();
        let first_due_date = schedule.first_due_date().unwrap_or(terms.disbursement_date);
        let last_due_date = schedule.last_due_date().unwrap_or(terms.disbursement_date);

        let record = LoanRecord::new(loan, schedule.into_installments());
        self.store.insert_loan(record.clone())?;

        info!(
            loan_id = %record.loan.id,
            user_id = %user.id,
            amount = %terms.loan_amount,
            installment = %installment_amount,
            "loan originated"
        );

        events.emit(Event::LoanOriginated {
            loan_id: record.loan.id,
            user_id: user.id,
            amount: terms.loan_amount,
            apr: terms.apr,
            term_months: terms.term_months,
            timestamp: now,
        });
        events.emit(Event::ScheduleGenerated {
            loan_id: record.loan.id,
            installments: terms.term_months,
            installment_amount,
            first_due_date,
            last_due_date,
        });

        Ok(record)
    }

    /// free-form principal reduction recorded as a repayment
    pub fn apply_principal_reduction(
        &self,
        loan_id: LoanId,
        amount: Money,
        paid_at: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<(Loan, Payment)> {
        if !amount.is_positive() {
            return Err(LendingError::validation("repayment amount must be positive"));
        }

        let (loan, payment) = self.store.update_loan(loan_id, |record| {
            reduce_principal(&mut record.loan, amount)?;
            let payment = Payment {
                id: Uuid::new_v4(),
                loan_id,
                amount,
                paid_at,
                kind: PaymentKind::Repayment,
            };
            record.record_payment(payment.clone());
            Ok((record.loan.clone(), payment))
        })?;

        info!(loan_id = %loan_id, amount = %amount, balance = %loan.principal_balance, "principal reduced");

        events.emit(Event::PrincipalReduced {
            loan_id,
            amount,
            new_balance: loan.principal_balance,
            timestamp: paid_at,
        });
        if loan.is_settled() {
            events.emit(Event::LoanSettled {
                loan_id,
                timestamp: paid_at,
            });
        }

        Ok((loan, payment))
    }

    pub fn outstanding_balance(&self, loan_id: LoanId) -> Result<Money> {
        self.store
            .loan_snapshot(loan_id)?
            .map(|record| outstanding_balance(&record.loan))
            .ok_or_else(|| LendingError::loan_not_found(loan_id))
    }
}
