// 🎚️ Limit Type - which IRS ceiling a fact describes
//
// Age bounds are static table data, never persisted.
// A catch-up type is only eligible inside its (inclusive) age window.

use crate::error::{LimitsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// LIMIT TYPE RULE
// ============================================================================

/// Inclusive age window. `minimum_age == None` means every age qualifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitTypeRule {
    pub minimum_age: Option<u32>,
    pub maximum_age: Option<u32>,
}

impl LimitTypeRule {
    pub const UNRESTRICTED: LimitTypeRule = LimitTypeRule {
        minimum_age: None,
        maximum_age: None,
    };

    const fn from_age(min: u32) -> Self {
        LimitTypeRule {
            minimum_age: Some(min),
            maximum_age: None,
        }
    }

    const fn between(min: u32, max: u32) -> Self {
        LimitTypeRule {
            minimum_age: Some(min),
            maximum_age: Some(max),
        }
    }

    pub fn is_eligible(&self, age: u32) -> bool {
        match (self.minimum_age, self.maximum_age) {
            (None, _) => true,
            (Some(min), None) => age >= min,
            (Some(min), Some(max)) => age >= min && age <= max,
        }
    }

    /// max set => min set, and min <= max
    pub fn is_well_formed(&self) -> bool {
        match (self.minimum_age, self.maximum_age) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(min), Some(max)) => min <= max,
        }
    }
}

// ============================================================================
// LIMIT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LimitType {
    /// Available to every participant
    #[serde(rename = "BASE")]
    Base,

    #[serde(rename = "CATCHUP_50")]
    Catchup50,

    /// HSA catch-up
    #[serde(rename = "CATCHUP_55")]
    Catchup55,

    /// SECURE 2.0 super catch-up
    #[serde(rename = "CATCHUP_60_63")]
    Catchup60To63,

    /// 415(c) total (employee + employer)
    #[serde(rename = "EMPLOYER_TOTAL")]
    EmployerTotal,

    /// 401(a)(17) compensation cap
    #[serde(rename = "COMPENSATION_LIMIT")]
    CompensationLimit,
}

impl LimitType {
    pub const ALL: [LimitType; 6] = [
        LimitType::Base,
        LimitType::Catchup50,
        LimitType::Catchup55,
        LimitType::Catchup60To63,
        LimitType::EmployerTotal,
        LimitType::CompensationLimit,
    ];

    pub fn as_token(&self) -> &'static str {
        match self {
            LimitType::Base => "BASE",
            LimitType::Catchup50 => "CATCHUP_50",
            LimitType::Catchup55 => "CATCHUP_55",
            LimitType::Catchup60To63 => "CATCHUP_60_63",
            LimitType::EmployerTotal => "EMPLOYER_TOTAL",
            LimitType::CompensationLimit => "COMPENSATION_LIMIT",
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        let normalized = token.trim().to_ascii_uppercase();
        LimitType::ALL
            .iter()
            .copied()
            .find(|t| t.as_token() == normalized)
            .ok_or_else(|| LimitsError::invalid_input("limit_type", token, "unknown limit type"))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LimitType::Base => "Base Limit",
            LimitType::Catchup50 => "Catch-up (50+)",
            LimitType::Catchup55 => "Catch-up (55+)",
            LimitType::Catchup60To63 => "Super Catch-up (60-63)",
            LimitType::EmployerTotal => "Total 415(c) Limit",
            LimitType::CompensationLimit => "Compensation Limit",
        }
    }

    pub fn rule(&self) -> LimitTypeRule {
        match self {
            LimitType::Catchup50 => LimitTypeRule::from_age(50),
            LimitType::Catchup55 => LimitTypeRule::from_age(55),
            LimitType::Catchup60To63 => LimitTypeRule::between(60, 63),
            LimitType::Base | LimitType::EmployerTotal | LimitType::CompensationLimit => {
                LimitTypeRule::UNRESTRICTED
            }
        }
    }

    pub fn has_age_requirement(&self) -> bool {
        self.rule().minimum_age.is_some()
    }

    pub fn is_eligible(&self, age: u32) -> bool {
        self.rule().is_eligible(age)
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for LimitType {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self> {
        LimitType::from_token(s)
    }
}
