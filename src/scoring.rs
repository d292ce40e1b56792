use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::CreditScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// one entry of a borrower's account activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTransaction {
    pub kind: TransactionKind,
    pub amount: Money,
}

impl AccountTransaction {
    pub fn credit(amount: Money) -> Self {
        Self {
            kind: TransactionKind::Credit,
            amount,
        }
    }

    pub fn debit(amount: Money) -> Self {
        Self {
            kind: TransactionKind::Debit,
            amount,
        }
    }
}

pub trait CreditScorer: Send + Sync {
    fn score(&self, transactions: &[AccountTransaction]) -> CreditScore;
}

/// scores by net account balance
///
/// 300 at or below 10,000; 900 at or above 1,000,000; in between, 10 points
/// for each full 15,000 above 10,000, capped at 900.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceScorer;

const FLOOR_SCORE: CreditScore = 300;
const CEILING_SCORE: CreditScore = 900;

impl BalanceScorer {
    pub fn net_balance(transactions: &[AccountTransaction]) -> Money {
        transactions.iter().fold(Money::ZERO, |balance, tx| match tx.kind {
            TransactionKind::Credit => balance + tx.amount,
            TransactionKind::Debit => balance - tx.amount,
        })
    }
}

impl CreditScorer for BalanceScorer {
    fn score(&self, transactions: &[AccountTransaction]) -> CreditScore {
        let balance = Self::net_balance(transactions).as_decimal();

        if balance >= dec!(1000000) {
            return CEILING_SCORE;
        }
        if balance <= dec!(10000) {
            return FLOOR_SCORE;
        }

        let steps = ((balance - dec!(10000)) / dec!(15000)).floor();
        let bonus = (steps * Decimal::from(10)).min(Decimal::from(CEILING_SCORE - FLOOR_SCORE));
        FLOOR_SCORE + bonus.to_i32().unwrap_or(0)
    }
}
