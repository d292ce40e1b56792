use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use credit_line_rs::{
    Event, EventLog, IdentityStore, Lending, LendingConfig, LendingError, LoanTerms, MemoryStore,
    Money, Rate, SafeTimeProvider, TimeSource, User,
};

fn day0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn setup(installments: u32, amount: i64) -> (Lending<MemoryStore, MemoryStore>, Arc<EventLog>, credit_line_rs::LoanView) {
    let store = Arc::new(MemoryStore::new());
    let log = Arc::new(EventLog::new());
    let lending = Lending::in_memory(Arc::clone(&store), LendingConfig::default())
        .unwrap()
        .with_event_sink(log.clone());

    let user = User::new("borrower", Money::from_major(200_000), day0()).with_credit_score(800);
    store.insert_user(user.clone()).unwrap();

    let time = SafeTimeProvider::new(TimeSource::Test(day0()));
    let loan = lending
        .originate_loan(
            user.id,
            LoanTerms {
                loan_amount: Money::from_major(amount),
                apr: Rate::ZERO,
                term_months: installments,
                disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            },
            &time,
        )
        .unwrap();
    (lending, log, loan)
}

#[test]
fn test_concurrent_payments_settle_each_installment_once() {
    let (lending, log, loan) = setup(6, 1_200);
    let installment = loan.installment_amount;
    let paid_at = day0() + Duration::days(400);

    let outcomes: Vec<Result<credit_line_rs::Receipt, LendingError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..24)
            .map(|_| scope.spawn(|| lending.apply_payment(loan.loan_id, installment, paid_at)))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let mut settled: Vec<u32> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok())
        .filter_map(|receipt| receipt.installment)
        .collect();
    settled.sort_unstable();
    assert_eq!(settled, vec![1, 2, 3, 4, 5, 6]);

    for outcome in outcomes.iter().filter(|outcome| outcome.is_err()) {
        assert!(matches!(outcome, Err(LendingError::NoObligationDue { .. })));
    }

    assert_eq!(lending.outstanding_balance(loan.loan_id).unwrap(), Money::ZERO);
    let statement = lending.get_statement(loan.loan_id).unwrap();
    assert_eq!(statement.past_payments.len(), 6);
    assert!(statement.upcoming_obligations.is_empty());

    let applied = log
        .events()
        .iter()
        .filter(|event| matches!(event, Event::PaymentApplied { .. }))
        .count();
    assert_eq!(applied, 6);
}

#[test]
fn test_concurrent_repayments_never_overdraw() {
    let (lending, _log, loan) = setup(4, 1_000);
    let repaid_at = day0() + Duration::days(5);

    let successes = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                scope.spawn(|| {
                    let time = SafeTimeProvider::new(TimeSource::Test(repaid_at));
                    lending.repay(loan.loan_id, Money::from_major(150), &time)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|outcome| outcome.is_ok())
            .count()
    });

    // 6 * 150 fits in 1000, a seventh would overdraw
    assert_eq!(successes, 6);
    assert_eq!(lending.outstanding_balance(loan.loan_id).unwrap(), Money::from_major(100));
}

#[test]
fn test_payments_on_distinct_loans_proceed_independently() {
    let store = Arc::new(MemoryStore::new());
    let lending = Lending::in_memory(Arc::clone(&store), LendingConfig::default()).unwrap();
    let time = SafeTimeProvider::new(TimeSource::Test(day0()));

    let mut loans = Vec::new();
    for _ in 0..8 {
        let user = User::new("borrower", Money::from_major(200_000), day0()).with_credit_score(800);
        store.insert_user(user.clone()).unwrap();
        let loan = lending
            .originate_loan(
                user.id,
                LoanTerms {
                    loan_amount: Money::from_major(300),
                    apr: Rate::ZERO,
                    term_months: 3,
                    disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                },
                &time,
            )
            .unwrap();
        loans.push(loan.loan_id);
    }

    let paid_at = day0() + Duration::days(100);
    thread::scope(|scope| {
        for loan_id in &loans {
            let lending = &lending;
            scope.spawn(move || {
                for _ in 0..3 {
                    lending.apply_payment(*loan_id, Money::from_major(100), paid_at).unwrap();
                }
            });
        }
    });

    for loan_id in loans {
        assert!(lending.get_loan(loan_id).unwrap().principal_balance.is_zero());
    }
}
