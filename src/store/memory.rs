use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::errors::{LendingError, Result};
use crate::store::{IdentityStore, LedgerStore, LoanRecord};
use crate::types::{Billing, CreditScore, LoanId, User, UserId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    loans: DashMap<LoanId, Arc<Mutex<LoanRecord>>>,
    user_loans: DashMap<UserId, Vec<LoanId>>,
    billings: DashMap<UserId, Vec<Billing>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn loan_cell(&self, id: LoanId) -> Option<Arc<Mutex<LoanRecord>>> {
        self.loans.get(&id).map(|cell| Arc::clone(cell.value()))
    }
}

impl IdentityStore for MemoryStore {
    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    fn users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    fn insert_user(&self, user: User) -> Result<()> {
        match self.users.entry(user.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(LendingError::Store {
                message: format!("duplicate user {}", user.id),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    fn credit_score(&self, id: UserId) -> Result<CreditScore> {
        self.users
            .get(&id)
            .map(|user| user.credit_score)
            .ok_or_else(|| LendingError::user_not_found(id))
    }

    fn record_credit_score(&self, id: UserId, score: CreditScore) -> Result<CreditScore> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| LendingError::user_not_found(id))?;
        Ok(std::mem::replace(&mut user.credit_score, score))
    }
}

impl LedgerStore for MemoryStore {
    fn insert_loan(&self, record: LoanRecord) -> Result<()> {
        let loan_id = record.loan.id;
        let user_id = record.loan.user_id;

        if !self.users.contains_key(&user_id) {
            return Err(LendingError::Store {
                message: format!("loan {} references unknown user {}", loan_id, user_id),
            });
        }

        match self.loans.entry(loan_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(LendingError::Store {
                    message: format!("duplicate loan {}", loan_id),
                });
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(record)));
            }
        }

        self.user_loans.entry(user_id).or_default().push(loan_id);
        Ok(())
    }

    fn loan_snapshot(&self, id: LoanId) -> Result<Option<LoanRecord>> {
        Ok(self.loan_cell(id).map(|cell| cell.lock().clone()))
    }

    fn update_loan<T, F>(&self, id: LoanId, f: F) -> Result<T>
    where
        F: FnOnce(&mut LoanRecord) -> Result<T>,
    {
        let cell = self.loan_cell(id).ok_or_else(|| LendingError::loan_not_found(id))?;
        let mut guard = cell.lock();

        // the cell may have been detached by remove_loan while we waited
        let attached = self
            .loans
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), &cell));
        if !attached {
            return Err(LendingError::loan_not_found(id));
        }

        let mut working = guard.clone();
        let outcome = f(&mut working)?;
        *guard = working;

        Ok(outcome)
    }

    fn remove_loan(&self, id: LoanId) -> Result<Option<LoanRecord>> {
        let Some((_, cell)) = self.loans.remove(&id) else {
            return Ok(None);
        };

        // wait for any writer still holding the loan
        let record = cell.lock().clone();
        if let Some(mut ids) = self.user_loans.get_mut(&record.loan.user_id) {
            ids.retain(|loan_id| *loan_id != id);
        }

        Ok(Some(record))
    }

    fn loans_for_user(&self, user_id: UserId) -> Result<Vec<LoanId>> {
        Ok(self.user_loans.get(&user_id).map(|ids| ids.clone()).unwrap_or_default())
    }

    fn insert_billings(&self, user_id: UserId, billings: Vec<Billing>) -> Result<()> {
        if billings.iter().any(|billing| billing.user_id != user_id) {
            return Err(LendingError::Store {
                message: format!("billing batch for {} contains foreign rows", user_id),
            });
        }
        if billings.is_empty() {
            return Ok(());
        }

        self.billings.entry(user_id).or_default().extend(billings);
        Ok(())
    }

    fn billings_for_user(&self, user_id: UserId) -> Result<Vec<Billing>> {
        Ok(self.billings.get(&user_id).map(|rows| rows.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::types::{DuePayment, Loan};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn seeded() -> (MemoryStore, User, LoanRecord) {
        let store = MemoryStore::new();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let user = User::new("asha", Money::from_major(200_000), created).with_credit_score(600);
        store.insert_user(user.clone()).unwrap();

        let disbursed = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let loan = Loan {
            id: Uuid::new_v4(),
            user_id: user.id,
            loan_amount: Money::from_major(1_000),
            principal_balance: Money::from_major(1_000),
            apr: Rate::ZERO,
            term_months: 2,
            disbursement_date: disbursed,
            created_at: created,
        };
        let schedule = (0..2)
            .map(|i| DuePayment {
                installment: i + 1,
                due_date: disbursed + chrono::Duration::days(30 * (i as i64 + 1)),
                amount_due: Money::from_major(500),
                amount_paid: Money::ZERO,
            })
            .collect();
        (store, user, LoanRecord::new(loan, schedule))
    }

    #[test]
    fn test_insert_and_snapshot() {
        let (store, user, record) = seeded();
        let loan_id = record.loan.id;
        store.insert_loan(record.clone()).unwrap();

        assert_eq!(store.loan_snapshot(loan_id).unwrap(), Some(record));
        assert_eq!(store.loans_for_user(user.id).unwrap(), vec![loan_id]);
    }

    #[test]
    fn test_insert_rejects_unknown_user_and_duplicates() {
        let (store, _, record) = seeded();
        let mut orphan = record.clone();
        orphan.loan.user_id = Uuid::new_v4();
        orphan.loan.id = Uuid::new_v4();
        assert!(matches!(store.insert_loan(orphan), Err(LendingError::Store { .. })));

        store.insert_loan(record.clone()).unwrap();
        assert!(matches!(store.insert_loan(record), Err(LendingError::Store { .. })));
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let (store, _, record) = seeded();
        let loan_id = record.loan.id;
        store.insert_loan(record.clone()).unwrap();

        let result: Result<()> = store.update_loan(loan_id, |working| {
            working.schedule[0].amount_paid = Money::from_major(500);
            working.loan.principal_balance = Money::ZERO;
            Err(LendingError::validation("abort"))
        });
        assert!(result.is_err());
        assert_eq!(store.loan_snapshot(loan_id).unwrap(), Some(record));
    }

    #[test]
    fn test_successful_update_commits() {
        let (store, _, record) = seeded();
        let loan_id = record.loan.id;
        store.insert_loan(record).unwrap();

        let balance = store
            .update_loan(loan_id, |working| {
                working.loan.principal_balance -= Money::from_major(500);
                Ok(working.loan.principal_balance)
            })
            .unwrap();
        assert_eq!(balance, Money::from_major(500));
        assert_eq!(
            store.loan_snapshot(loan_id).unwrap().unwrap().loan.principal_balance,
            Money::from_major(500)
        );
    }

    #[test]
    fn test_update_unknown_loan_is_not_found() {
        let store = MemoryStore::new();
        let result: Result<()> = store.update_loan(Uuid::new_v4(), |_| Ok(()));
        assert!(matches!(result, Err(LendingError::NotFound { entity: "loan", .. })));
    }

    #[test]
    fn test_update_racing_removal_is_not_found() {
        let (store, _, record) = seeded();
        let loan_id = record.loan.id;
        store.insert_loan(record.clone()).unwrap();

        let cell = store.loan_cell(loan_id).unwrap();
        let held = cell.lock();
        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                store.update_loan(loan_id, |working| {
                    working.loan.principal_balance = Money::ZERO;
                    Ok(())
                })
            });

            // let the writer pick up the cell and block on it
            std::thread::sleep(std::time::Duration::from_millis(50));
            store.loans.remove(&loan_id);
            drop(held);

            let result = writer.join().unwrap();
            assert!(matches!(result, Err(LendingError::NotFound { entity: "loan", .. })));
        });

        assert_eq!(*cell.lock(), record);
    }

    #[test]
    fn test_remove_cascades_schedule() {
        let (store, user, record) = seeded();
        let loan_id = record.loan.id;
        store.insert_loan(record).unwrap();

        let removed = store.remove_loan(loan_id).unwrap().unwrap();
        assert_eq!(removed.schedule.len(), 2);
        assert!(store.loan_snapshot(loan_id).unwrap().is_none());
        assert!(store.loans_for_user(user.id).unwrap().is_empty());
        assert!(store.remove_loan(loan_id).unwrap().is_none());
    }

    #[test]
    fn test_credit_score_write_path() {
        let (store, user, _) = seeded();
        assert_eq!(store.credit_score(user.id).unwrap(), 600);
        assert_eq!(store.record_credit_score(user.id, 720).unwrap(), 600);
        assert_eq!(store.credit_score(user.id).unwrap(), 720);
        assert!(store.credit_score(Uuid::new_v4()).is_err());
    }
}
