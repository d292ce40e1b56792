//! Transport-agnostic entry points.
//!
//! [`Lending`] wires the ledger, scheduler, payment processor, billing engine
//! and statement builder to the external collaborators. It keeps nothing
//! mutable between calls; the stores arbitrate every concurrent write, and
//! events reach the sink only after the unit of work they describe committed.

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;
use tracing::instrument;

use crate::billing::BillingEngine;
use crate::config::LendingConfig;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventSink, EventStore, NullSink};
use crate::ledger::{LoanLedger, LoanTerms};
use crate::payments::PaymentProcessor;
use crate::requests::{LoanApplication, PaymentSubmission};
use crate::scoring::{AccountTransaction, CreditScorer};
use crate::statement::{build_statement, Statement};
use crate::store::{IdentityStore, LedgerStore, MemoryStore};
use crate::types::{CreditScore, LoanId, UserId};
use crate::views::{BillingSummary, BillingView, LoanView, Receipt};

pub struct Lending<I, S> {
    identity: Arc<I>,
    store: Arc<S>,
    config: LendingConfig,
    sink: Arc<dyn EventSink>,
}

impl Lending<MemoryStore, MemoryStore> {
    /// one in-memory store acting as both identity and ledger store
    pub fn in_memory(store: Arc<MemoryStore>, config: LendingConfig) -> Result<Self> {
        Self::new(Arc::clone(&store), store, config)
    }
}

impl<I: IdentityStore, S: LedgerStore> Lending<I, S> {
    pub fn new(identity: Arc<I>, store: Arc<S>, config: LendingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            identity,
            store,
            config,
            sink: Arc::new(NullSink),
        })
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    fn publish(&self, mut events: EventStore) {
        if !events.is_empty() {
            self.sink.publish(events.take_events());
        }
    }

    /// originate a loan with its full installment schedule
    #[instrument(name = "lending.originate_loan", skip(self, time), err)]
    pub fn originate_loan(&self, user_id: UserId, terms: LoanTerms, time: &SafeTimeProvider) -> Result<LoanView> {
        terms.validate()?;

        let user = self
            .identity
            .get_user(user_id)?
            .ok_or_else(|| LendingError::user_not_found(user_id))?;
        let credit_score = self.identity.credit_score(user_id)?;

        let mut events = EventStore::new();
        let record = LoanLedger::new(&*self.store, &self.config).originate(
            &user,
            credit_score,
            &terms,
            time.now(),
            &mut events,
        )?;

        self.publish(events);
        Ok(LoanView::from_record(&record))
    }

    /// originate from an already parsed application
    pub fn submit_application(&self, application: LoanApplication, time: &SafeTimeProvider) -> Result<LoanView> {
        self.originate_loan(application.user_id, application.terms, time)
    }

    /// settle the earliest unpaid installment of a loan
    #[instrument(name = "lending.apply_payment", skip(self), err)]
    pub fn apply_payment(&self, loan_id: LoanId, amount: Money, paid_at: DateTime<Utc>) -> Result<Receipt> {
        let mut events = EventStore::new();
        let settlement = PaymentProcessor::new(&*self.store).apply_payment(loan_id, amount, paid_at, &mut events)?;

        self.publish(events);
        Ok(Receipt::from_settlement(&settlement))
    }

    pub fn submit_payment(&self, submission: PaymentSubmission) -> Result<Receipt> {
        self.apply_payment(submission.loan_id, submission.amount, submission.paid_at)
    }

    /// free-form principal repayment outside the installment schedule
    #[instrument(name = "lending.repay", skip(self, time), err)]
    pub fn repay(&self, loan_id: LoanId, amount: Money, time: &SafeTimeProvider) -> Result<Receipt> {
        let mut events = EventStore::new();
        let (loan, payment) = LoanLedger::new(&*self.store, &self.config).apply_principal_reduction(
            loan_id,
            amount,
            time.now(),
            &mut events,
        )?;

        self.publish(events);
        Ok(Receipt::from_repayment(&loan, &payment))
    }

    #[instrument(name = "lending.get_statement", skip(self), err)]
    pub fn get_statement(&self, loan_id: LoanId) -> Result<Statement> {
        let record = self
            .store
            .loan_snapshot(loan_id)?
            .ok_or_else(|| LendingError::loan_not_found(loan_id))?;
        Ok(build_statement(&record))
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<LoanView> {
        self.store
            .loan_snapshot(loan_id)?
            .map(|record| LoanView::from_record(&record))
            .ok_or_else(|| LendingError::loan_not_found(loan_id))
    }

    pub fn outstanding_balance(&self, loan_id: LoanId) -> Result<Money> {
        LoanLedger::new(&*self.store, &self.config).outstanding_balance(loan_id)
    }

    /// scheduled billing run over every user
    #[instrument(name = "lending.run_billing_cycle", skip(self), err)]
    pub fn run_billing_cycle(&self, now: DateTime<Utc>) -> Result<Vec<BillingSummary>> {
        let mut events = EventStore::new();
        let results = BillingEngine::new(&*self.identity, &*self.store, &self.config).run_cycle(now, &mut events)?;

        self.publish(events);
        Ok(results.iter().map(BillingSummary::from).collect())
    }

    /// on-demand bill across all of a user's loans; `None` when nothing is owed
    #[instrument(name = "lending.generate_ad_hoc_bill", skip(self, time), err)]
    pub fn generate_ad_hoc_bill(&self, user_id: UserId, time: &SafeTimeProvider) -> Result<Option<BillingView>> {
        let mut events = EventStore::new();
        let billing = BillingEngine::new(&*self.identity, &*self.store, &self.config).generate_ad_hoc_bill(
            user_id,
            time.now().date_naive(),
            &mut events,
        )?;

        self.publish(events);
        Ok(billing.as_ref().map(BillingView::from))
    }

    pub fn billings_for_user(&self, user_id: UserId) -> Result<Vec<BillingView>> {
        if self.identity.get_user(user_id)?.is_none() {
            return Err(LendingError::user_not_found(user_id));
        }
        Ok(self
            .store
            .billings_for_user(user_id)?
            .iter()
            .map(BillingView::from)
            .collect())
    }

    /// recompute a user's score through the scoring collaborator
    #[instrument(name = "lending.refresh_credit_score", skip(self, transactions, scorer), err)]
    pub fn refresh_credit_score(
        &self,
        user_id: UserId,
        transactions: &[AccountTransaction],
        scorer: &dyn CreditScorer,
    ) -> Result<CreditScore> {
        let new_score = scorer.score(transactions);
        let old_score = self.identity.record_credit_score(user_id, new_score)?;

        let mut events = EventStore::new();
        events.emit(Event::CreditScoreUpdated {
            user_id,
            old_score,
            new_score,
        });
        self.publish(events);

        Ok(new_score)
    }
}
