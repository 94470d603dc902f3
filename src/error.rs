// ⚠️ Error taxonomy for the limits library
//
// Absence of data is NOT an error: lookups return Option / empty Vec.
// Everything here is either bad input (caller's fault), a malformed fact
// caught at ingestion, or an infrastructure failure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LimitsError {
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Malformed {entity}: {reason}")]
    MalformedFact { entity: String, reason: String },

    /// A stored row no longer satisfies the fact invariants
    #[error("Corrupt record in {table}: {reason}")]
    CorruptRecord { table: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl LimitsError {
    pub fn invalid_input(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        LimitsError::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(entity: &str, reason: impl Into<String>) -> Self {
        LimitsError::MalformedFact {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(table: &str, reason: impl Into<String>) -> Self {
        LimitsError::CorruptRecord {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors the caller can fix by changing the request
    /// (maps to "bad request" in the HTTP layer). Corrupt stored rows are
    /// not the caller's fault.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            LimitsError::InvalidInput { .. } | LimitsError::MalformedFact { .. }
        )
    }
}

impl From<toml::de::Error> for LimitsError {
    fn from(e: toml::de::Error) -> Self {
        LimitsError::Config {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LimitsError>;
