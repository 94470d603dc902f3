// 📏 Contribution Limit - one published IRS dollar ceiling
//
// Natural key: (year, account_type, limit_type).
// Published once per year; corrected only through a normal upsert.

use crate::entities::{AccountType, LimitType};
use crate::error::{LimitsError, Result};
use crate::money::Money;
use crate::validation::validate_year;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Natural key of a [`ContributionLimit`]
pub type LimitKey = (i32, AccountType, LimitType);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionLimit {
    /// Stable identity (UUID)
    pub id: String,
    year: i32,
    account_type: AccountType,
    limit_type: LimitType,
    amount: Money,
    pub created_at: DateTime<Utc>,
}

impl ContributionLimit {
    /// Create a new fact, rejecting malformed values at ingestion
    pub fn new(
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
        amount: Money,
    ) -> Result<Self> {
        Self::restore(
            uuid::Uuid::new_v4().to_string(),
            year,
            account_type,
            limit_type,
            amount,
            Utc::now(),
        )
    }

    /// Rebuild a stored fact (same checks as `new`)
    pub fn restore(
        id: String,
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        validate_year(year)?;

        if amount.is_negative() {
            return Err(LimitsError::malformed(
                "contribution limit",
                format!("amount {} is negative", amount),
            ));
        }
        if !amount.fits_precision() {
            return Err(LimitsError::malformed(
                "contribution limit",
                format!("amount {} exceeds decimal(12,2)", amount),
            ));
        }

        Ok(ContributionLimit {
            id,
            year,
            account_type,
            limit_type,
            amount,
            created_at,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn limit_type(&self) -> LimitType {
        self.limit_type
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn key(&self) -> LimitKey {
        (self.year, self.account_type, self.limit_type)
    }

    /// Whether a person of `age` (as of Dec 31 of `year`) qualifies
    pub fn is_eligible_at(&self, age: u32) -> bool {
        self.limit_type.is_eligible(age)
    }
}
