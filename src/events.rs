use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{BillingId, CreditScore, LoanId, UserId};

/// all events published by the lending core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // origination events
    LoanOriginated {
        loan_id: LoanId,
        user_id: UserId,
        amount: Money,
        apr: Rate,
        term_months: u32,
        timestamp: DateTime<Utc>,
    },
    ScheduleGenerated {
        loan_id: LoanId,
        installments: u32,
        installment_amount: Money,
        first_due_date: NaiveDate,
        last_due_date: NaiveDate,
    },

    // payment events
    PaymentApplied {
        loan_id: LoanId,
        installment: u32,
        amount: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    PrincipalReduced {
        loan_id: LoanId,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },

    // billing events
    BillingGenerated {
        billing_id: BillingId,
        user_id: UserId,
        loan_id: LoanId,
        min_due: Money,
        bill_date: NaiveDate,
        due_date: NaiveDate,
    },
    BillingFailed {
        user_id: UserId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    AdHocBillGenerated {
        billing_id: BillingId,
        user_id: UserId,
        total_balance: Money,
        min_due: Money,
        bill_date: NaiveDate,
    },

    // scoring events
    CreditScoreUpdated {
        user_id: UserId,
        old_score: CreditScore,
        new_score: CreditScore,
    },
}

/// event store for collecting events during an operation
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// outward notification channel, fed only with committed work
pub trait EventSink: Send + Sync {
    fn publish(&self, events: Vec<Event>);
}

/// sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _events: Vec<Event>) {}
}

/// in-memory sink retaining every published event in order
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn publish(&self, events: Vec<Event>) {
        self.events.lock().extend(events);
    }
}
