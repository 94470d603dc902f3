// 💵 Exact fixed-point money and percentages
//
// Money is stored as integer cents (scale 2, precision 12 like the
// `decimal(12,2)` columns the IRS tables are published in).
// Percentages are stored as integer ten-thousandths (scale 4).
// No floating point anywhere: phase-out math has to be cent-exact.

use crate::error::{LimitsError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Cents per whole currency unit
pub const CENTS_PER_UNIT: i64 = 100;

/// Percentage scale (4 decimal places)
pub const PERCENT_SCALE: i64 = 10_000;

/// Largest absolute value representable in decimal(12,2)
pub const MAX_ABS_CENTS: i64 = 999_999_999_999;

// ============================================================================
// MONEY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_units(units: i64) -> Self {
        Money(units * CENTS_PER_UNIT)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether the value fits decimal(12,2)
    pub fn fits_precision(&self) -> bool {
        self.0.abs() <= MAX_ABS_CENTS
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let text = format!(
            "{}{}.{:02}",
            sign,
            abs / CENTS_PER_UNIT as u64,
            abs % CENTS_PER_UNIT as u64
        );
        f.pad(&text)
    }
}

/// Parses "7000", "7000.5", "7,000.00", "$7000.00", "-12.34".
/// More than two fractional digits is rejected rather than rounded.
impl FromStr for Money {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| LimitsError::invalid_input("amount", s, reason);

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let cleaned: String = rest.chars().filter(|c| *c != ',').collect();

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }
        if fraction.len() > 2 {
            return Err(invalid("at most 2 decimal places are allowed"));
        }

        let whole_units: i64 = whole
            .parse()
            .map_err(|_| invalid("value is too large"))?;
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().unwrap_or(0) * 10,
            _ => fraction.parse::<i64>().unwrap_or(0),
        };

        let cents = whole_units
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|c| c.checked_add(fraction_cents))
            .ok_or_else(|| invalid("value is too large"))?;

        let money = Money(if negative { -cents } else { cents });
        if !money.fits_precision() {
            return Err(invalid("value exceeds decimal(12,2) precision"));
        }

        Ok(money)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MoneyVisitor;

        impl<'de> de::Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string like \"7000.00\" or a whole number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Money, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Money, E> {
                v.checked_mul(CENTS_PER_UNIT)
                    .map(Money)
                    .filter(Money::fits_precision)
                    .ok_or_else(|| E::custom("value exceeds decimal(12,2) precision"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Money, E> {
                let v = i64::try_from(v).map_err(|_| E::custom("value is too large"))?;
                self.visit_i64(v)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

// ============================================================================
// PERCENTAGE
// ============================================================================

/// A fraction in [0, 1] with exactly 4 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percentage(i64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const ONE: Percentage = Percentage(PERCENT_SCALE);

    /// From ten-thousandths (5000 = 0.5000)
    pub const fn from_ten_thousandths(value: i64) -> Self {
        Percentage(value)
    }

    pub const fn ten_thousandths(&self) -> i64 {
        self.0
    }

    /// `numerator / denominator` at 4 decimal places, rounding half up.
    ///
    /// Both operands must be non-negative and the denominator non-zero.
    pub(crate) fn ratio_half_up(numerator: i128, denominator: i128) -> Self {
        let scaled = numerator * PERCENT_SCALE as i128;
        let quotient = scaled / denominator;
        let remainder = scaled % denominator;
        let rounded = if remainder * 2 >= denominator {
            quotient + 1
        } else {
            quotient
        };
        Percentage(rounded as i64)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / PERCENT_SCALE, self.0 % PERCENT_SCALE)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Integer division rounding away from zero.
pub(crate) fn div_round_up(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    if numerator % denominator == 0 {
        quotient
    } else if (numerator < 0) == (denominator < 0) {
        quotient + 1
    } else {
        quotient - 1
    }
}

// ============================================================================
// TESTS
// ============================================================================
