/// credit line lifecycle - origination, installments, billing and statements
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use credit_line_rs::{
    AccountTransaction, BalanceScorer, EventLog, IdentityStore, Lending, LendingConfig, LoanTerms,
    MemoryStore, Money, Rate, SafeTimeProvider, TimeSource, User,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== credit line lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();

    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(EventLog::new());
    let lending = Lending::in_memory(Arc::clone(&store), LendingConfig::default())?.with_event_sink(events.clone());

    // register a borrower and score them from account activity
    let user = User::new("ada", Money::from_major(180_000), time.now());
    store.insert_user(user.clone())?;
    let score = lending.refresh_credit_score(
        user.id,
        &[
            AccountTransaction::credit(Money::from_major(400_000)),
            AccountTransaction::debit(Money::from_major(40_000)),
        ],
        &BalanceScorer,
    )?;
    println!("credit score: {}", score);

    // originate 1200 at 12% over a year
    let loan = lending.originate_loan(
        user.id,
        LoanTerms {
            loan_amount: Money::from_major(1_200),
            apr: Rate::from_percentage(12),
            term_months: 12,
            disbursement_date: time.now().date_naive(),
        },
        &time,
    )?;
    println!(
        "loan {} originated: {} installments of ${}",
        loan.loan_id, loan.unpaid_installments, loan.installment_amount
    );

    // pay the first two installments as they come due
    for _ in 0..2 {
        controller.advance(Duration::days(30));
        let receipt = lending.apply_payment(loan.loan_id, loan.installment_amount, time.now())?;
        println!(
            "{}: paid installment {:?}, balance ${}",
            time.now().format("%Y-%m-%d"),
            receipt.installment,
            receipt.principal_balance
        );
    }

    // billing cycle
    for summary in lending.run_billing_cycle(time.now())? {
        for bill in summary.bills() {
            println!("bill {} due {}: minimum ${}", bill.bill_date, bill.due_date, bill.min_due);
        }
    }

    if let Some(bill) = lending.generate_ad_hoc_bill(user.id, &time)? {
        println!("ad-hoc bill due {}: minimum ${}", bill.due_date, bill.min_due);
    }

    let statement = lending.get_statement(loan.loan_id)?;
    println!("\nstatement:");
    println!("{}", serde_json::to_string_pretty(&statement)?);

    println!("\n{} events published", events.len());

    Ok(())
}
