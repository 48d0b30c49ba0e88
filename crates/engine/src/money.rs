//! Fixed point numeric types.
//!
//! Monetary amounts and quantities are kept as signed integers with two
//! implied decimals so every computation step lands on a value already
//! rounded to 2 decimal places. Rates (tax, discount, interest) are basis
//! points.

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Divide rounding half away from zero. `None` when the result does not fit
/// in an `i64`.
pub(crate) fn div_round(numerator: i128, denominator: i128) -> Option<i64> {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let rounded = if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    };
    i64::try_from(rounded).ok()
}

/// Writes `value` (hundredths) as a decimal string. The `+` flag is honored.
fn fmt_hundredths(value: i64, trim_zero_fraction: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 {
        "-"
    } else if f.sign_plus() {
        "+"
    } else {
        ""
    };
    let abs = value.unsigned_abs();
    let units = abs / 100;
    let fraction = abs % 100;
    if trim_zero_fraction && fraction == 0 {
        write!(f, "{sign}{units}")
    } else {
        write!(f, "{sign}{units}.{fraction:02}")
    }
}

/// Parses a decimal string with at most 2 fractional digits into hundredths.
///
/// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
fn parse_hundredths(s: &str) -> Result<i64, EngineError> {
    let empty = || EngineError::Validation("empty amount".to_string());
    let invalid = || EngineError::Validation(format!("invalid amount: {s}"));
    let overflow = || EngineError::Validation("amount too large".to_string());

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(empty());
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim().replace(',', ".");
    if rest.is_empty() {
        return Err(empty());
    }

    let mut parts = rest.split('.');
    let units_str = parts.next().ok_or_else(invalid)?;
    let fraction_str = parts.next();
    if parts.next().is_some() {
        return Err(invalid());
    }
    if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let units: i64 = units_str.parse().map_err(|_| overflow())?;

    let fraction: i64 = match fraction_str {
        None | Some("") => 0,
        Some(frac) => {
            if !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            match frac.len() {
                1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                2 => frac.parse::<i64>().map_err(|_| invalid())?,
                _ => return Err(EngineError::Validation("too many decimals".to_string())),
            }
        }
    };

    let total = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(overflow)?;

    if negative {
        total.checked_neg().ok_or_else(overflow)
    } else {
        Ok(total)
    }
}

/// Signed money amount represented as integer **minor units** (cents).
///
/// The sign follows the ledger convention of the field it is stored in: on a
/// party balance positive means receivable and negative means payable.
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "12,5".parse().unwrap();
/// assert_eq!(amount.minor(), 1250);
/// assert_eq!(amount.to_string(), "12.50");
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates a new amount from whole major units.
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Unit price times quantity, rounded to the cent (returns `None` on
    /// overflow).
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Option<Money> {
        div_round(
            i128::from(self.0) * i128::from(quantity.hundredths()),
            100,
        )
        .map(Money)
    }

    /// The given share of this amount, rounded to the cent (returns `None`
    /// on overflow).
    #[must_use]
    pub fn percent(self, rate: Percent) -> Option<Money> {
        div_round(
            i128::from(self.0) * i128::from(rate.basis_points()),
            10_000,
        )
        .map(Money)
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hundredths(self.0, false, f)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Money)
    }
}

/// Signed stock quantity with two implied decimals (e.g. `2.50` kg).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a quantity from hundredths of a unit.
    #[must_use]
    pub const fn new(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Creates a quantity of whole units.
    #[must_use]
    pub const fn units(units: i64) -> Self {
        Self(units * 100)
    }

    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hundredths(self.0, true, f)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity(-self.0)
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s).map(Quantity)
    }
}

/// A rate expressed in basis points (`1250` = 12.50%).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);

    #[must_use]
    pub const fn from_basis_points(basis_points: i64) -> Self {
        Self(basis_points)
    }

    /// Creates a rate from a whole percentage.
    #[must_use]
    pub const fn whole(percent: i64) -> Self {
        Self(percent * 100)
    }

    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hundredths(self.0, true, f)?;
        f.write_str("%")
    }
}

impl FromStr for Percent {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
        parse_hundredths(number).map(Percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
        assert_eq!(format!("{:+}", Money::new(300)), "+3.00");
    }

    #[test]
    fn quantity_display_trims_whole_units() {
        assert_eq!(Quantity::units(5).to_string(), "5");
        assert_eq!(Quantity::new(250).to_string(), "2.50");
        assert_eq!(format!("{:+}", Quantity::units(3)), "+3");
        assert_eq!(format!("{:+}", Quantity::units(-3)), "-3");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("  2.30 ".parse::<Quantity>().unwrap().hundredths(), 230);
        assert_eq!("18%".parse::<Percent>().unwrap().basis_points(), 1800);
    }

    #[test]
    fn parse_rejects_more_than_two_decimals() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Quantity>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(div_round(5, 10), Some(1));
        assert_eq!(div_round(4, 10), Some(0));
        assert_eq!(div_round(-5, 10), Some(-1));
        assert_eq!(div_round(-4, 10), Some(0));
        assert_eq!(div_round(15, 10), Some(2));
        assert_eq!(div_round(i128::from(i64::MAX) * 100, 10), None);
    }

    #[test]
    fn times_and_percent_round_to_the_cent() {
        // 3.33 * 1.50 = 4.995 -> 5.00
        assert_eq!(Money::new(333).times(Quantity::new(150)), Some(Money::new(500)));
        // 18% of 9.99 = 1.7982 -> 1.80
        assert_eq!(Money::new(999).percent(Percent::whole(18)), Some(Money::new(180)));
        assert_eq!(Money::new(-999).percent(Percent::whole(18)), Some(Money::new(-180)));
    }

    #[test]
    fn times_reports_overflow() {
        assert_eq!(Money::new(i64::MAX / 2).times(Quantity::units(100)), None);
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
    }
}
