// 🧾 Filing Status - IRS tax filing status

use crate::error::{LimitsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingStatus {
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
}

impl FilingStatus {
    pub const ALL: [FilingStatus; 4] = [
        FilingStatus::Single,
        FilingStatus::MarriedFilingJointly,
        FilingStatus::MarriedFilingSeparately,
        FilingStatus::HeadOfHousehold,
    ];

    pub fn as_token(&self) -> &'static str {
        match self {
            FilingStatus::Single => "SINGLE",
            FilingStatus::MarriedFilingJointly => "MARRIED_FILING_JOINTLY",
            FilingStatus::MarriedFilingSeparately => "MARRIED_FILING_SEPARATELY",
            FilingStatus::HeadOfHousehold => "HEAD_OF_HOUSEHOLD",
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        let normalized = token.trim().to_ascii_uppercase();
        FilingStatus::ALL
            .iter()
            .copied()
            .find(|s| s.as_token() == normalized)
            .ok_or_else(|| {
                LimitsError::invalid_input("filing_status", token, "unknown filing status")
            })
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FilingStatus::Single => "Single",
            FilingStatus::MarriedFilingJointly => "Married Filing Jointly",
            FilingStatus::MarriedFilingSeparately => "Married Filing Separately",
            FilingStatus::HeadOfHousehold => "Head of Household",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for FilingStatus {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self> {
        FilingStatus::from_token(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_round_trip() {
        for status in FilingStatus::ALL {
            assert_eq!(FilingStatus::from_token(status.as_token()).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_token()));
        }
    }

    #[test]
    fn test_unknown_status() {
        assert!(FilingStatus::from_token("WIDOWED").unwrap_err().is_invalid_input());
        assert_eq!(
            FilingStatus::from_token(" single ").unwrap(),
            FilingStatus::Single
        );
        assert_eq!(FilingStatus::HeadOfHousehold.display_name(), "Head of Household");
    }
}
