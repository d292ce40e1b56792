use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// working precision for intermediate money arithmetic
const WORKING_DP: u32 = 8;

/// minor-unit precision of the currency (cents)
pub const CURRENCY_DP: u32 = 2;

/// Money type with 8 decimal places of working precision.
///
/// Stored amounts (installments, balances, minimum dues) are brought to the
/// currency's minor unit with [`Money::to_currency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(WORKING_DP))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s.trim())?.round_dp(WORKING_DP)))
    }

    /// create from integer amount (dollars, rupees, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (cents)
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, CURRENCY_DP))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    /// round to the currency's minor unit
    pub fn to_currency(&self) -> Self {
        self.round_dp(CURRENCY_DP)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// `None` when the sum leaves the representable range
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Money::from_decimal)
    }

    /// fraction of this amount (e.g., 0.03 for 3%); `None` on overflow
    pub fn share(&self, fraction: Decimal) -> Option<Self> {
        self.0.checked_mul(fraction).map(Money::from_decimal)
    }

    /// simple interest at a daily rate over a number of days; `None` on overflow
    pub fn simple_interest(&self, daily_rate: Rate, days: u32) -> Option<Self> {
        self.0
            .checked_mul(daily_rate.as_decimal())?
            .checked_mul(Decimal::from(days))
            .map(Money::from_decimal)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i64> for Money {
    fn from(i: i64) -> Self {
        Money::from_major(i)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(WORKING_DP))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(WORKING_DP);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(WORKING_DP))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(WORKING_DP);
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(WORKING_DP))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(WORKING_DP))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

/// rate type for APRs and fractional shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from decimal (e.g., 0.12 for 12%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 12 for 12%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// monthly rate from annual rate
    pub fn monthly_rate(&self) -> Rate {
        Rate(self.0 / Decimal::from(12))
    }

    /// daily rate from annual rate over a 365-day year, rounded to `dp` places
    pub fn daily_rate_rounded(&self, dp: u32) -> Rate {
        Rate((self.0 / Decimal::from(365)).round_dp(dp))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

impl FromStr for Rate {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Rate(Decimal::from_str(s.trim())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679"); // rounded to 8 places
        assert_eq!(m.to_currency().to_string(), "100.12");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::from_minor(10653), Money::from_decimal(dec!(106.53)));
        assert_eq!(Money::from_minor(1), Money::CENT);
    }

    #[test]
    fn test_currency_rounding_is_bankers() {
        assert_eq!(Money::from_decimal(dec!(0.125)).to_currency().as_decimal(), dec!(0.12));
        assert_eq!(Money::from_decimal(dec!(0.135)).to_currency().as_decimal(), dec!(0.14));
    }

    #[test]
    fn test_daily_rate_rounding() {
        // 12% / 365 = 0.000328.. which rounds away at three places
        assert_eq!(Rate::from_percentage(12).daily_rate_rounded(3), Rate::ZERO);
        assert_eq!(Rate::from_decimal(dec!(0.365)).daily_rate_rounded(3).as_decimal(), dec!(0.001));
    }

    #[test]
    fn test_simple_interest() {
        let principal = Money::from_major(1_000);
        let interest = principal.simple_interest(Rate::from_decimal(dec!(0.001)), 10);
        assert_eq!(interest, Some(Money::from_major(10)));
    }

    #[test]
    fn test_overflowing_arithmetic_is_none() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(huge.share(dec!(2)), None);
        assert_eq!(huge.simple_interest(Rate::from_decimal(dec!(0.5)), 10), None);
        assert_eq!(huge.checked_add(Money::from_major(1)), None);
        assert_eq!(Money::from_major(1).checked_add(Money::CENT), Some(Money::from_decimal(dec!(1.01))));
    }

    #[test]
    fn test_share_and_sum() {
        let balance = Money::from_major(1_000);
        assert_eq!(balance.share(dec!(0.03)), Some(Money::from_major(30)));

        let total: Money = vec![Money::from_major(1), Money::from_minor(50)].into_iter().sum();
        assert_eq!(total, Money::from_decimal(dec!(1.50)));
    }
}
