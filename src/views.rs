use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::billing::UserBilling;
use crate::decimal::{Money, Rate};
use crate::payments::Settlement;
use crate::store::LoanRecord;
use crate::types::{Billing, BillingId, BillingPolicy, Loan, LoanId, Payment, PaymentId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub loan_amount: Money,
    pub principal_balance: Money,
    pub apr: Rate,
    pub term_months: u32,
    pub disbursement_date: NaiveDate,
    pub installment_amount: Money,
    pub first_due_date: Option<NaiveDate>,
    pub final_due_date: Option<NaiveDate>,
    pub unpaid_installments: usize,
}

impl LoanView {
    pub fn from_record(record: &LoanRecord) -> Self {
        let loan = record.loan();
        let schedule = record.schedule();
        LoanView {
            loan_id: loan.id,
            user_id: loan.user_id,
            loan_amount: loan.loan_amount,
            principal_balance: loan.principal_balance,
            apr: loan.apr,
            term_months: loan.term_months,
            disbursement_date: loan.disbursement_date,
            installment_amount: schedule.first().map(|due| due.amount_due).unwrap_or(Money::ZERO),
            first_due_date: schedule.first().map(|due| due.due_date),
            final_due_date: schedule.last().map(|due| due.due_date),
            unpaid_installments: record.unpaid_installments().count(),
        }
    }
}

/// confirmation of an applied payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub payment_id: PaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
    /// settled installment; `None` for free-form repayments
    pub installment: Option<u32>,
    pub due_date: Option<NaiveDate>,
    pub principal_balance: Money,
    pub settled: bool,
}

impl Receipt {
    pub fn from_settlement(settlement: &Settlement) -> Self {
        Receipt {
            payment_id: settlement.payment.id,
            loan_id: settlement.payment.loan_id,
            amount: settlement.payment.amount,
            paid_at: settlement.payment.paid_at,
            installment: Some(settlement.installment),
            due_date: Some(settlement.due_date),
            principal_balance: settlement.principal_balance,
            settled: settlement.principal_balance.is_zero(),
        }
    }

    pub fn from_repayment(loan: &Loan, payment: &Payment) -> Self {
        Receipt {
            payment_id: payment.id,
            loan_id: loan.id,
            amount: payment.amount,
            paid_at: payment.paid_at,
            installment: None,
            due_date: None,
            principal_balance: loan.principal_balance,
            settled: loan.is_settled(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingView {
    pub billing_id: BillingId,
    pub user_id: UserId,
    pub loan_id: Option<LoanId>,
    pub bill_date: NaiveDate,
    pub due_date: NaiveDate,
    pub min_due: Money,
    pub paid: bool,
    pub policy: BillingPolicy,
}

impl From<&Billing> for BillingView {
    fn from(billing: &Billing) -> Self {
        BillingView {
            billing_id: billing.id,
            user_id: billing.user_id,
            loan_id: billing.loan_id,
            bill_date: billing.bill_date,
            due_date: billing.due_date,
            min_due: billing.min_due,
            paid: billing.paid,
            policy: billing.policy,
        }
    }
}

/// per-user line of a billing cycle report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSummary {
    pub user_id: UserId,
    pub outcome: BillingOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BillingOutcome {
    Billed {
        bills: Vec<BillingView>,
        total_min_due: Money,
    },
    Failed {
        reason: String,
    },
}

impl BillingSummary {
    pub fn is_billed(&self) -> bool {
        matches!(self.outcome, BillingOutcome::Billed { .. })
    }

    pub fn bills(&self) -> &[BillingView] {
        match &self.outcome {
            BillingOutcome::Billed { bills, .. } => bills,
            BillingOutcome::Failed { .. } => &[],
        }
    }
}

impl From<&UserBilling> for BillingSummary {
    fn from(result: &UserBilling) -> Self {
        let outcome = match result {
            UserBilling::Billed {
                billings,
                total_min_due,
                ..
            } => BillingOutcome::Billed {
                bills: billings.iter().map(BillingView::from).collect(),
                total_min_due: *total_min_due,
            },
            UserBilling::Failed { error, .. } => BillingOutcome::Failed {
                reason: error.to_string(),
            },
        };

        BillingSummary {
            user_id: result.user_id(),
            outcome,
        }
    }
}
