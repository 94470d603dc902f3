// 🏛️ Account Type - closed set of tax-advantaged account kinds
//
// Each variant carries its metadata as constant table data:
// display name, tax treatment, employer-sponsored flag, storage token.
//
// Storage tokens are the enum names, except 403(b)/457(b) which can't
// start an identifier and are stored as "403B"/"457B".

use crate::error::{LimitsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TAX TREATMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxTreatment {
    /// Pre-tax contributions, taxed on withdrawal
    TaxDeferred,

    /// After-tax contributions, qualified withdrawals tax-free
    TaxFree,

    /// No tax advantage
    Taxable,
}

impl TaxTreatment {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaxTreatment::TaxDeferred => "Tax-Deferred",
            TaxTreatment::TaxFree => "Tax-Free",
            TaxTreatment::Taxable => "Taxable",
        }
    }
}

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "TRADITIONAL_401K")]
    Traditional401k,

    #[serde(rename = "ROTH_401K")]
    Roth401k,

    #[serde(rename = "TRADITIONAL_IRA")]
    TraditionalIra,

    #[serde(rename = "ROTH_IRA")]
    RothIra,

    #[serde(rename = "SEP_IRA")]
    SepIra,

    #[serde(rename = "SIMPLE_IRA")]
    SimpleIra,

    #[serde(rename = "HSA_SELF")]
    HsaSelf,

    #[serde(rename = "HSA_FAMILY")]
    HsaFamily,

    #[serde(rename = "403B", alias = "ACCOUNT_403B")]
    Account403b,

    #[serde(rename = "457B", alias = "ACCOUNT_457B")]
    Account457b,
}

impl AccountType {
    pub const ALL: [AccountType; 10] = [
        AccountType::Traditional401k,
        AccountType::Roth401k,
        AccountType::TraditionalIra,
        AccountType::RothIra,
        AccountType::SepIra,
        AccountType::SimpleIra,
        AccountType::HsaSelf,
        AccountType::HsaFamily,
        AccountType::Account403b,
        AccountType::Account457b,
    ];

    /// Storage / wire token
    pub fn as_token(&self) -> &'static str {
        match self {
            AccountType::Traditional401k => "TRADITIONAL_401K",
            AccountType::Roth401k => "ROTH_401K",
            AccountType::TraditionalIra => "TRADITIONAL_IRA",
            AccountType::RothIra => "ROTH_IRA",
            AccountType::SepIra => "SEP_IRA",
            AccountType::SimpleIra => "SIMPLE_IRA",
            AccountType::HsaSelf => "HSA_SELF",
            AccountType::HsaFamily => "HSA_FAMILY",
            AccountType::Account403b => "403B",
            AccountType::Account457b => "457B",
        }
    }

    /// Decode a token. Accepts the storage token, the enum-style name
    /// (`ACCOUNT_403B`) and the display form (`403(b)`), case-insensitively.
    pub fn from_token(token: &str) -> Result<Self> {
        let normalized = token.trim().to_ascii_uppercase();

        let found = match normalized.as_str() {
            "ACCOUNT_403B" | "403(B)" => Some(AccountType::Account403b),
            "ACCOUNT_457B" | "457(B)" => Some(AccountType::Account457b),
            other => AccountType::ALL
                .iter()
                .copied()
                .find(|t| t.as_token() == other),
        };

        found.ok_or_else(|| {
            LimitsError::invalid_input("account_type", token, "unknown account type")
        })
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AccountType::Traditional401k => "Traditional 401(k)",
            AccountType::Roth401k => "Roth 401(k)",
            AccountType::TraditionalIra => "Traditional IRA",
            AccountType::RothIra => "Roth IRA",
            AccountType::SepIra => "SEP IRA",
            AccountType::SimpleIra => "SIMPLE IRA",
            AccountType::HsaSelf => "HSA (Self-only)",
            AccountType::HsaFamily => "HSA (Family)",
            AccountType::Account403b => "403(b)",
            AccountType::Account457b => "457(b)",
        }
    }

    pub fn tax_treatment(&self) -> TaxTreatment {
        match self {
            AccountType::Roth401k
            | AccountType::RothIra
            | AccountType::HsaSelf
            | AccountType::HsaFamily => TaxTreatment::TaxFree,
            _ => TaxTreatment::TaxDeferred,
        }
    }

    pub fn is_employer_sponsored(&self) -> bool {
        matches!(
            self,
            AccountType::Traditional401k
                | AccountType::Roth401k
                | AccountType::SimpleIra
                | AccountType::Account403b
                | AccountType::Account457b
        )
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for AccountType {
    type Err = LimitsError;

    fn from_str(s: &str) -> Result<Self> {
        AccountType::from_token(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_is_total() {
        for account_type in AccountType::ALL {
            let token = account_type.as_token();
            assert_eq!(AccountType::from_token(token).unwrap(), account_type);
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut tokens: Vec<&str> = AccountType::ALL.iter().map(|t| t.as_token()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), AccountType::ALL.len());
    }

    #[test]
    fn test_digit_leading_accounts() {
        assert_eq!(AccountType::Account403b.as_token(), "403B");
        assert_eq!(AccountType::Account457b.as_token(), "457B");
        assert_eq!(AccountType::from_token("ACCOUNT_403B").unwrap(), AccountType::Account403b);
        assert_eq!(AccountType::from_token("403(b)").unwrap(), AccountType::Account403b);
        assert_eq!(AccountType::from_token("457b").unwrap(), AccountType::Account457b);
    }

    #[test]
    fn test_unknown_token_is_invalid_input() {
        let err = AccountType::from_token("ROTH_403B").unwrap_err();
        assert!(err.is_invalid_input());
        assert!(AccountType::from_token("").is_err());
    }

    #[test]
    fn test_serde_uses_storage_tokens() {
        let json = serde_json::to_string(&AccountType::Account403b).unwrap();
        assert_eq!(json, "\"403B\"");

        let parsed: AccountType = serde_json::from_str("\"ACCOUNT_457B\"").unwrap();
        assert_eq!(parsed, AccountType::Account457b);

        for account_type in AccountType::ALL {
            let json = serde_json::to_string(&account_type).unwrap();
            let back: AccountType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, account_type);
        }
    }

    #[test]
    fn test_metadata_table() {
        assert_eq!(AccountType::RothIra.tax_treatment(), TaxTreatment::TaxFree);
        assert_eq!(AccountType::TraditionalIra.tax_treatment(), TaxTreatment::TaxDeferred);
        assert!(AccountType::Account403b.is_employer_sponsored());
        assert!(!AccountType::SepIra.is_employer_sponsored());
        assert_eq!(AccountType::HsaSelf.display_name(), "HSA (Self-only)");
        assert_eq!(TaxTreatment::TaxFree.display_name(), "Tax-Free");
    }
}
