// ✅ Input validation - rejects bad input before resolution begins

use crate::error::{LimitsError, Result};
use crate::money::Money;

/// First tax year IRA limits exist for (ERISA, 1974)
pub const MIN_TAX_YEAR: i32 = 1974;

/// Upper bound for plausible published years
pub const MAX_TAX_YEAR: i32 = 2100;

/// Oldest age accepted for eligibility checks
pub const MAX_AGE: u32 = 130;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_year(year: i32) -> Result<()> {
    if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&year) {
        return Err(LimitsError::invalid_input(
            "year",
            year,
            format!("must be between {} and {}", MIN_TAX_YEAR, MAX_TAX_YEAR),
        ));
    }
    Ok(())
}

pub fn validate_magi(magi: Money) -> Result<()> {
    if magi.is_negative() {
        return Err(LimitsError::invalid_input(
            "magi",
            magi,
            "MAGI cannot be negative",
        ));
    }
    Ok(())
}

pub fn validate_age(age: u32) -> Result<()> {
    if age > MAX_AGE {
        return Err(LimitsError::invalid_input(
            "age",
            age,
            format!("must be at most {}", MAX_AGE),
        ));
    }
    Ok(())
}

pub fn validate_not_empty(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LimitsError::Config {
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        assert!(validate_year(2025).is_ok());
        assert!(validate_year(MIN_TAX_YEAR).is_ok());
        assert!(validate_year(MAX_TAX_YEAR).is_ok());
        assert!(validate_year(1973).unwrap_err().is_invalid_input());
        assert!(validate_year(2101).is_err());
    }

    #[test]
    fn test_negative_magi_rejected() {
        assert!(validate_magi(Money::ZERO).is_ok());
        assert!(validate_magi(Money::from_units(150_000)).is_ok());
        assert!(validate_magi(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_age_and_empty_checks() {
        assert!(validate_age(63).is_ok());
        assert!(validate_age(131).is_err());
        assert!(validate_not_empty("database.path", "  ").is_err());
        assert!(validate_not_empty("database.path", "limits.db").is_ok());
    }
}
