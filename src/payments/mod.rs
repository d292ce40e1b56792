pub mod amortization;
pub mod processor;

pub use amortization::{calculate_emi, AmortizationSchedule, AmortizationScheduler};
pub use processor::{settle_next_installment, PaymentProcessor, Settlement};
