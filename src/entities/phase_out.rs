// 📉 Phase-Out Range - MAGI window over which a limit shrinks to zero
//
// Natural key: (year, filing_status, phase_out_account_type).
// Invariant: magi_start < magi_end. Enforced here, at construction, so the
// resolver never sees a zero or negative-width range.

use crate::entities::{AccountType, FilingStatus};
use crate::error::{LimitsError, Result};
use crate::money::Money;
use crate::validation::validate_year;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PHASE-OUT ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseOutAccountType {
    /// Contribution phase-out based on MAGI
    RothIra,

    /// Deduction phase-out when covered by a workplace plan
    TraditionalIra,

    /// Deduction phase-out when the spouse is covered by a workplace plan
    TraditionalIraSpouseCovered,
}

impl PhaseOutAccountType {
    pub const ALL: [PhaseOutAccountType; 3] = [
        PhaseOutAccountType::RothIra,
        PhaseOutAccountType::TraditionalIra,
        PhaseOutAccountType::TraditionalIraSpouseCovered,
    ];

    pub fn as_token(&self) -> &'static str {
        match self {
            PhaseOutAccountType::RothIra => "ROTH_IRA",
            PhaseOutAccountType::TraditionalIra => "TRADITIONAL_IRA",
            PhaseOutAccountType::TraditionalIraSpouseCovered => "TRADITIONAL_IRA_SPOUSE_COVERED",
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        let normalized = token.trim().to_ascii_uppercase();
        PhaseOutAccountType::ALL
            .iter()
            .copied()
            .find(|t| t.as_token() == normalized)
            .ok_or_else(|| {
                LimitsError::invalid_input(
                    "phase_out_account_type",
                    token,
                    "unknown phase-out account type",
                )
            })
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PhaseOutAccountType::RothIra => "Roth IRA",
            PhaseOutAccountType::TraditionalIra => "Traditional IRA",
            PhaseOutAccountType::TraditionalIraSpouseCovered => "Traditional IRA (Spouse Covered)",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PhaseOutAccountType::RothIra => "Contribution phase-out based on MAGI",
            PhaseOutAccountType::TraditionalIra => {
                "Deduction phase-out when covered by workplace plan"
            }
            PhaseOutAccountType::TraditionalIraSpouseCovered => {
                "Deduction phase-out when spouse is covered by workplace plan"
            }
        }
    }

    /// The phase-out schedule that limits contributions to an account type.
    /// Only Roth IRA contributions phase out; the traditional IRA schedules
    /// reduce the deduction, not the limit, and are only reachable explicitly.
    pub fn for_account_type(account_type: AccountType) -> Option<Self> {
        match account_type {
            AccountType::RothIra => Some(PhaseOutAccountType::RothIra),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseOutAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for PhaseOutAccountType {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self> {
        PhaseOutAccountType::from_token(s)
    }
}

// ============================================================================
// PHASE-OUT RANGE
// ============================================================================

/// Natural key of a [`PhaseOutRange`]
pub type PhaseOutKey = (i32, FilingStatus, PhaseOutAccountType);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseOutRange {
    /// Stable identity (UUID)
    pub id: String,
    year: i32,
    filing_status: FilingStatus,
    account_type: PhaseOutAccountType,
    magi_start: Money,
    magi_end: Money,
    pub created_at: DateTime<Utc>,
}

impl PhaseOutRange {
    pub fn new(
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
        magi_start: Money,
        magi_end: Money,
    ) -> Result<Self> {
        Self::restore(
            uuid::Uuid::new_v4().to_string(),
            year,
            filing_status,
            account_type,
            magi_start,
            magi_end,
            Utc::now(),
        )
    }

    pub fn restore(
        id: String,
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
        magi_start: Money,
        magi_end: Money,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        validate_year(year)?;

        if magi_start.is_negative() {
            return Err(LimitsError::malformed(
                "phase-out range",
                format!("magi_start {} is negative", magi_start),
            ));
        }
        if magi_start >= magi_end {
            return Err(LimitsError::malformed(
                "phase-out range",
                format!(
                    "magi_start {} must be below magi_end {}",
                    magi_start, magi_end
                ),
            ));
        }
        if !magi_end.fits_precision() {
            return Err(LimitsError::malformed(
                "phase-out range",
                format!("magi_end {} exceeds decimal(12,2)", magi_end),
            ));
        }

        Ok(PhaseOutRange {
            id,
            year,
            filing_status,
            account_type,
            magi_start,
            magi_end,
            created_at,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn filing_status(&self) -> FilingStatus {
        self.filing_status
    }

    pub fn account_type(&self) -> PhaseOutAccountType {
        self.account_type
    }

    pub fn magi_start(&self) -> Money {
        self.magi_start
    }

    pub fn magi_end(&self) -> Money {
        self.magi_end
    }

    /// Width of the window; always positive
    pub fn width(&self) -> Money {
        self.magi_end - self.magi_start
    }

    pub fn key(&self) -> PhaseOutKey {
        (self.year, self.filing_status, self.account_type)
    }
}
