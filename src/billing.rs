use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar;
use crate::config::{FutureDisbursementPolicy, LendingConfig};
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::store::{IdentityStore, LedgerStore};
use crate::types::{Billing, BillingPolicy, Loan, User, UserId};

fn overflow(what: &str, id: Uuid) -> LendingError {
    LendingError::validation(format!("{} for {} overflows", what, id))
}

/// per-user result of a billing cycle
#[derive(Debug, Clone, PartialEq)]
pub enum UserBilling {
    Billed {
        user_id: UserId,
        billings: Vec<Billing>,
        total_min_due: Money,
    },
    Failed {
        user_id: UserId,
        error: LendingError,
    },
}

impl UserBilling {
    pub fn user_id(&self) -> UserId {
        match self {
            UserBilling::Billed { user_id, .. } | UserBilling::Failed { user_id, .. } => *user_id,
        }
    }
}

/// scheduled cycle and ad-hoc bills, two separate policies
///
/// Neither deduplicates: running the cycle twice appends a second set of
/// rows carrying the same dates.
pub struct BillingEngine<'a, I, S> {
    identity: &'a I,
    store: &'a S,
    config: &'a LendingConfig,
}

impl<'a, I: IdentityStore, S: LedgerStore> BillingEngine<'a, I, S> {
    pub fn new(identity: &'a I, store: &'a S, config: &'a LendingConfig) -> Self {
        Self {
            identity,
            store,
            config,
        }
    }

    /// bill every user; a failing user is reported and the batch moves on
    ///
    /// Only a failure to enumerate users aborts the run.
    pub fn run_cycle(&self, now: DateTime<Utc>, events: &mut EventStore) -> Result<Vec<UserBilling>> {
        let today = now.date_naive();
        let users = self.identity.users()?;
        let mut results = Vec::with_capacity(users.len());

        for user in users {
            match self.bill_user(&user, today) {
                Ok((billings, total_min_due)) => {
                    info!(
                        user_id = %user.id,
                        bills = billings.len(),
                        total_min_due = %total_min_due,
                        "billing created"
                    );
                    for billing in &billings {
                        events.emit(Event::BillingGenerated {
                            billing_id: billing.id,
                            user_id: user.id,
                            loan_id: billing.loan_id.unwrap_or_default(),
                            min_due: billing.min_due,
                            bill_date: billing.bill_date,
                            due_date: billing.due_date,
                        });
                    }
                    results.push(UserBilling::Billed {
                        user_id: user.id,
                        billings,
                        total_min_due,
                    });
                }
                Err(error) => {
                    warn!(user_id = %user.id, error = %error, "billing failed");
                    events.emit(Event::BillingFailed {
                        user_id: user.id,
                        reason: error.to_string(),
                        timestamp: now,
                    });
                    results.push(UserBilling::Failed {
                        user_id: user.id,
                        error,
                    });
                }
            }
        }

        Ok(results)
    }

    fn bill_user(&self, user: &User, today: NaiveDate) -> Result<(Vec<Billing>, Money)> {
        let bill_date = calendar::date_after(user.created_at, self.config.billing.first_bill_offset_days)?;
        let due_date = calendar::add_days(bill_date, self.config.billing.due_offset_days)?;

        let mut billings = Vec::new();
        let mut total_min_due = Money::ZERO;

        for loan_id in self.store.loans_for_user(user.id)? {
            // a loan removed since the listing has nothing left to bill
            let Some(record) = self.store.loan_snapshot(loan_id)? else {
                continue;
            };

            let min_due = self.cycle_min_due(record.loan(), today)?;
            total_min_due = total_min_due
                .checked_add(min_due)
                .ok_or_else(|| overflow("total minimum due", user.id))?;

            billings.push(Billing {
                id: Uuid::new_v4(),
                user_id: user.id,
                loan_id: Some(loan_id),
                bill_date,
                due_date,
                min_due,
                paid: false,
                policy: BillingPolicy::Cycle,
            });
        }

        self.store.insert_billings(user.id, billings.clone())?;
        Ok((billings, total_min_due))
    }

    /// `principal * share + principal * round(apr / 365, dp) * days`
    pub fn cycle_min_due(&self, loan: &Loan, today: NaiveDate) -> Result<Money> {
        let policy = &self.config.billing;

        let elapsed = calendar::days_between(loan.disbursement_date, today);
        let days = if elapsed < 0 {
            match policy.future_disbursement {
                FutureDisbursementPolicy::Clamp => {
                    warn!(
                        loan_id = %loan.id,
                        disbursement_date = %loan.disbursement_date,
                        "disbursement after billing date, accruing no interest"
                    );
                    0
                }
                FutureDisbursementPolicy::Reject => {
                    return Err(LendingError::validation(format!(
                        "loan {} disbursed on {} after billing date {}",
                        loan.id, loan.disbursement_date, today
                    )));
                }
            }
        } else {
            u32::try_from(elapsed)
                .map_err(|_| LendingError::validation(format!("loan {} accrual period too long", loan.id)))?
        };

        let daily_rate = loan.apr.daily_rate_rounded(policy.daily_rate_dp);
        let min_due = loan
            .principal_balance
            .share(policy.principal_share)
            .zip(loan.principal_balance.simple_interest(daily_rate, days))
            .and_then(|(share, interest)| share.checked_add(interest))
            .ok_or_else(|| overflow("minimum due", loan.id))?;

        Ok(min_due.to_currency())
    }

    /// one bill across every loan that still carries a balance
    ///
    /// Returns `Ok(None)` without writing anything when nothing is outstanding.
    pub fn generate_ad_hoc_bill(
        &self,
        user_id: UserId,
        today: NaiveDate,
        events: &mut EventStore,
    ) -> Result<Option<Billing>> {
        let user = self
            .identity
            .get_user(user_id)?
            .ok_or_else(|| LendingError::user_not_found(user_id))?;

        let mut total_balance = Money::ZERO;
        for loan_id in self.store.loans_for_user(user.id)? {
            if let Some(record) = self.store.loan_snapshot(loan_id)? {
                if record.loan().principal_balance.is_positive() {
                    total_balance = total_balance
                        .checked_add(record.loan().principal_balance)
                        .ok_or_else(|| overflow("outstanding balance", user.id))?;
                }
            }
        }

        if !total_balance.is_positive() {
            info!(user_id = %user.id, "no pending loans, ad-hoc bill skipped");
            return Ok(None);
        }

        let policy = &self.config.ad_hoc_bill;
        let min_due = total_balance
            .share(policy.balance_share)
            .ok_or_else(|| overflow("ad-hoc minimum due", user.id))?;
        let billing = Billing {
            id: Uuid::new_v4(),
            user_id: user.id,
            loan_id: None,
            bill_date: today,
            due_date: calendar::add_days(today, policy.due_offset_days)?,
            min_due: min_due.to_currency(),
            paid: false,
            policy: BillingPolicy::AdHoc,
        };

        self.store.insert_billings(user.id, vec![billing.clone()])?;

        info!(user_id = %user.id, billing_id = %billing.id, min_due = %billing.min_due, "ad-hoc bill generated");
        events.emit(Event::AdHocBillGenerated {
            billing_id: billing.id,
            user_id: user.id,
            total_balance,
            min_due: billing.min_due,
            bill_date: billing.bill_date,
        });

        Ok(Some(billing))
    }
}
