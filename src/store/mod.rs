pub mod memory;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{Billing, CreditScore, DuePayment, Loan, LoanId, Payment, User, UserId};

pub use memory::MemoryStore;

/// a loan together with everything it owns
///
/// The installment schedule is owned outright and goes away with the loan.
/// Payment history is append-only; nothing in the crate edits or removes an
/// entry once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub(crate) loan: Loan,
    pub(crate) schedule: Vec<DuePayment>,
    pub(crate) payments: Vec<Payment>,
}

impl LoanRecord {
    pub(crate) fn new(loan: Loan, schedule: Vec<DuePayment>) -> Self {
        Self {
            loan,
            schedule,
            payments: Vec::new(),
        }
    }

    pub fn loan(&self) -> &Loan {
        &self.loan
    }

    /// installments ordered by due date
    pub fn schedule(&self) -> &[DuePayment] {
        &self.schedule
    }

    /// payment history in the order it was recorded
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// earliest-due installment that is still unpaid
    pub fn next_unpaid(&self) -> Option<&DuePayment> {
        self.schedule
            .iter()
            .filter(|due| !due.is_paid())
            .min_by_key(|due| (due.due_date, due.installment))
    }

    pub fn unpaid_installments(&self) -> impl Iterator<Item = &DuePayment> {
        self.schedule.iter().filter(|due| !due.is_paid())
    }

    pub fn total_scheduled(&self) -> Money {
        self.schedule.iter().map(|due| due.amount_due).sum()
    }

    pub(crate) fn record_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }
}

/// borrower directory and the externally computed credit scores
pub trait IdentityStore: Send + Sync {
    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    fn users(&self) -> Result<Vec<User>>;

    fn insert_user(&self, user: User) -> Result<()>;

    /// latest score snapshot; fails with `NotFound` for unknown users
    fn credit_score(&self, id: UserId) -> Result<CreditScore>;

    /// write path for the scoring collaborator; returns the previous score
    fn record_credit_score(&self, id: UserId, score: CreditScore) -> Result<CreditScore>;
}

/// transactional storage for loans and billing records
pub trait LedgerStore: Send + Sync {
    /// insert a loan and its complete schedule as one unit
    fn insert_loan(&self, record: LoanRecord) -> Result<()>;

    /// consistent point-in-time copy of a loan and what it owns
    fn loan_snapshot(&self, id: LoanId) -> Result<Option<LoanRecord>>;

    /// run `f` against a working copy of the loan while holding the loan's
    /// lock; the copy replaces the stored record only if `f` returns `Ok`
    fn update_loan<T, F>(&self, id: LoanId, f: F) -> Result<T>
    where
        F: FnOnce(&mut LoanRecord) -> Result<T>;

    /// delete a loan together with its schedule
    fn remove_loan(&self, id: LoanId) -> Result<Option<LoanRecord>>;

    fn loans_for_user(&self, user_id: UserId) -> Result<Vec<LoanId>>;

    /// append billing rows for one user as one unit
    fn insert_billings(&self, user_id: UserId, billings: Vec<Billing>) -> Result<()>;

    fn billings_for_user(&self, user_id: UserId) -> Result<Vec<Billing>>;
}
