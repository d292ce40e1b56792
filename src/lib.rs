pub mod billing;
pub mod calendar;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod payments;
pub mod requests;
pub mod scoring;
pub mod service;
pub mod statement;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use config::{
    AdHocBillConfig, BillingConfig, EligibilityPolicy, FutureDisbursementPolicy, LendingConfig,
    ScheduleConfig,
};
pub use decimal::{Money, Rate};
pub use errors::{LendingError, Result};
pub use events::{Event, EventLog, EventSink, NullSink};
pub use ledger::LoanTerms;
pub use payments::{calculate_emi, AmortizationSchedule, AmortizationScheduler};
pub use requests::{LoanApplication, PaymentSubmission, RawLoanApplication, RawPayment};
pub use scoring::{AccountTransaction, BalanceScorer, CreditScorer};
pub use service::Lending;
pub use statement::Statement;
pub use store::{IdentityStore, LedgerStore, LoanRecord, MemoryStore};
pub use types::{
    Billing, BillingPolicy, CreditScore, DuePayment, EligibilityFailure, Loan, LoanId, Payment,
    PaymentKind, User, UserId,
};
pub use views::{BillingOutcome, BillingSummary, BillingView, LoanView, Receipt};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
