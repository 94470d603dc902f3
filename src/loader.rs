// 📥 Annual data loader - CSV publications → SQLite catalog
//
// Two file shapes:
//   limits:     year,account_type,limit_type,amount
//   phase-outs: year,filing_status,account_type,magi_start,magi_end
//
// A file is all-or-nothing: any malformed row rejects the whole file and
// nothing is written. Each file's SHA-256 is recorded so loading the same
// publication twice is a no-op.

use crate::db::{self, Publication, SqliteCatalog};
use crate::entities::{
    AccountType, ContributionLimit, FilingStatus, LimitType, PhaseOutAccountType, PhaseOutRange,
};
use crate::error::{LimitsError, Result};
use crate::money::Money;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

// ============================================================================
// RAW CSV RECORDS
// ============================================================================

#[derive(Debug, Deserialize)]
struct LimitRecord {
    year: i32,
    account_type: String,
    limit_type: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct PhaseOutRecord {
    year: i32,
    filing_status: String,
    account_type: String,
    magi_start: String,
    magi_end: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Limits,
    PhaseOuts,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Limits => "limits",
            FactKind::PhaseOuts => "phase_outs",
        }
    }
}

/// Outcome of loading one file
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub source_file: String,
    pub kind: FactKind,
    pub fingerprint: String,
    pub rows: usize,
    /// Identical file was loaded before; nothing written
    pub already_loaded: bool,
}

// ============================================================================
// PARSING
// ============================================================================

/// Row number as a human sees it in the file (header is line 1)
fn row_error(row: usize, err: LimitsError) -> LimitsError {
    LimitsError::malformed(&format!("row {}", row + 2), err.to_string())
}

pub fn parse_limits_csv<R: Read>(reader: R) -> Result<Vec<ContributionLimit>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut limits = Vec::new();
    let mut seen = HashSet::new();

    for (index, result) in rdr.deserialize::<LimitRecord>().enumerate() {
        let record = result?;

        let limit = (|| {
            let account_type = AccountType::from_token(&record.account_type)?;
            let limit_type = LimitType::from_token(&record.limit_type)?;
            let amount: Money = record.amount.parse()?;
            ContributionLimit::new(record.year, account_type, limit_type, amount)
        })()
        .map_err(|e| row_error(index, e))?;

        if !seen.insert(limit.key()) {
            return Err(row_error(
                index,
                LimitsError::malformed(
                    "contribution limit",
                    format!(
                        "duplicate ({}, {}, {})",
                        limit.year(),
                        limit.account_type(),
                        limit.limit_type()
                    ),
                ),
            ));
        }

        limits.push(limit);
    }

    Ok(limits)
}

pub fn parse_phase_outs_csv<R: Read>(reader: R) -> Result<Vec<PhaseOutRange>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut ranges = Vec::new();
    let mut seen = HashSet::new();

    for (index, result) in rdr.deserialize::<PhaseOutRecord>().enumerate() {
        let record = result?;

        let range = (|| {
            let filing_status = FilingStatus::from_token(&record.filing_status)?;
            let account_type = PhaseOutAccountType::from_token(&record.account_type)?;
            let start: Money = record.magi_start.parse()?;
            let end: Money = record.magi_end.parse()?;
            PhaseOutRange::new(record.year, filing_status, account_type, start, end)
        })()
        .map_err(|e| row_error(index, e))?;

        if !seen.insert(range.key()) {
            return Err(row_error(
                index,
                LimitsError::malformed(
                    "phase-out range",
                    format!(
                        "duplicate ({}, {}, {})",
                        range.year(),
                        range.filing_status(),
                        range.account_type()
                    ),
                ),
            ));
        }

        ranges.push(range);
    }

    Ok(ranges)
}

/// SHA-256 of a publication file, hex encoded
pub fn fingerprint(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// LOADING
// ============================================================================

pub fn load_limits_file(catalog: &SqliteCatalog, path: &Path) -> Result<LoadReport> {
    load_file(catalog, path, FactKind::Limits)
}

pub fn load_phase_outs_file(catalog: &SqliteCatalog, path: &Path) -> Result<LoadReport> {
    load_file(catalog, path, FactKind::PhaseOuts)
}

fn load_file(catalog: &SqliteCatalog, path: &Path, kind: FactKind) -> Result<LoadReport> {
    let contents = fs::read(path)?;
    let fingerprint = fingerprint(&contents);
    let source_file = path.display().to_string();

    if catalog.with_connection(|conn| db::is_published(conn, &fingerprint))? {
        tracing::info!(%source_file, kind = kind.as_str(), "publication already loaded, skipping");
        return Ok(LoadReport {
            source_file,
            kind,
            fingerprint,
            rows: 0,
            already_loaded: true,
        });
    }

    // Parse everything before touching the database
    let rows = match kind {
        FactKind::Limits => {
            let limits = parse_limits_csv(contents.as_slice()).map_err(|e| {
                tracing::warn!(%source_file, "rejected limits file: {}", e);
                e
            })?;
            catalog.in_transaction(|conn| {
                for limit in &limits {
                    db::upsert_limit(conn, limit)?;
                }
                record(conn, &fingerprint, &source_file, kind, limits.len())
            })?;
            limits.len()
        }
        FactKind::PhaseOuts => {
            let ranges = parse_phase_outs_csv(contents.as_slice()).map_err(|e| {
                tracing::warn!(%source_file, "rejected phase-out file: {}", e);
                e
            })?;
            catalog.in_transaction(|conn| {
                for range in &ranges {
                    db::upsert_phase_out_range(conn, range)?;
                }
                record(conn, &fingerprint, &source_file, kind, ranges.len())
            })?;
            ranges.len()
        }
    };

    tracing::info!(%source_file, kind = kind.as_str(), rows, "publication loaded");

    Ok(LoadReport {
        source_file,
        kind,
        fingerprint,
        rows,
        already_loaded: false,
    })
}

fn record(
    conn: &rusqlite::Connection,
    fingerprint: &str,
    source_file: &str,
    kind: FactKind,
    rows: usize,
) -> Result<()> {
    db::record_publication(
        conn,
        &Publication {
            fingerprint: fingerprint.to_string(),
            source_file: source_file.to_string(),
            kind: kind.as_str().to_string(),
            row_count: rows as i64,
            loaded_at: Utc::now(),
        },
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LimitCatalog;
    use std::io::Write;

    const LIMITS_2025: &str = "\
year,account_type,limit_type,amount
2025,TRADITIONAL_401K,BASE,23500.00
2025,TRADITIONAL_401K,CATCHUP_50,7500.00
2025,TRADITIONAL_401K,CATCHUP_60_63,11250.00
2025,403B,BASE,23500.00
2025,ROTH_IRA,BASE,7000.00
2025,ROTH_IRA,CATCHUP_50,1000.00
";

    const PHASE_OUTS_2025: &str = "\
year,filing_status,account_type,magi_start,magi_end
2025,SINGLE,ROTH_IRA,150000.00,165000.00
2025,MARRIED_FILING_JOINTLY,ROTH_IRA,236000.00,246000.00
2025,SINGLE,TRADITIONAL_IRA,79000.00,89000.00
";

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_limits() {
        let limits = parse_limits_csv(LIMITS_2025.as_bytes()).unwrap();
        assert_eq!(limits.len(), 6);
        assert_eq!(limits[3].account_type(), AccountType::Account403b);
        assert_eq!(limits[2].limit_type(), LimitType::Catchup60To63);
    }

    #[test]
    fn test_malformed_range_rejected_at_ingestion() {
        let csv = "\
year,filing_status,account_type,magi_start,magi_end
2025,SINGLE,ROTH_IRA,150000.00,165000.00
2025,HEAD_OF_HOUSEHOLD,ROTH_IRA,165000.00,150000.00
";
        let err = parse_phase_outs_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LimitsError::MalformedFact { .. }));
        assert!(err.to_string().contains("row 3"), "{}", err);
    }

    #[test]
    fn test_unknown_token_rejected_with_row() {
        let csv = "year,account_type,limit_type,amount\n2025,ROTH_IRA,CATCHUP_70,1000.00\n";
        let err = parse_limits_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{}", err);
        assert!(err.to_string().contains("CATCHUP_70"), "{}", err);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let csv = "\
year,account_type,limit_type,amount
2025,ROTH_IRA,BASE,7000.00
2025,ROTH_IRA,BASE,7500.00
";
        assert!(parse_limits_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fp = fingerprint(LIMITS_2025.as_bytes());
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint(LIMITS_2025.as_bytes()));
        assert_ne!(fp, fingerprint(PHASE_OUTS_2025.as_bytes()));
    }

    #[test]
    fn test_load_files_into_catalog() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let limits_file = write_temp(LIMITS_2025);
        let ranges_file = write_temp(PHASE_OUTS_2025);

        let report = load_limits_file(&catalog, limits_file.path()).unwrap();
        assert_eq!(report.rows, 6);
        assert!(!report.already_loaded);

        let report = load_phase_outs_file(&catalog, ranges_file.path()).unwrap();
        assert_eq!(report.rows, 3);

        assert_eq!(catalog.years_with_data().unwrap(), vec![2025]);
        assert!(catalog
            .find_phase_out_range(2025, FilingStatus::Single, PhaseOutAccountType::TraditionalIra)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_reloading_same_file_is_noop() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let limits_file = write_temp(LIMITS_2025);

        load_limits_file(&catalog, limits_file.path()).unwrap();
        let second = load_limits_file(&catalog, limits_file.path()).unwrap();

        assert!(second.already_loaded);
        assert_eq!(second.rows, 0);
        assert_eq!(catalog.with_connection(db::count_limits).unwrap(), 6);
    }

    #[test]
    fn test_rejected_file_writes_nothing() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let bad = write_temp(
            "year,account_type,limit_type,amount\n2025,ROTH_IRA,BASE,7000.00\n2025,ROTH_IRA,BASE,-1.00\n",
        );

        assert!(load_limits_file(&catalog, bad.path()).is_err());
        assert_eq!(catalog.with_connection(db::count_limits).unwrap(), 0);
        assert!(catalog
            .with_connection(db::get_publications)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_correction_file_updates_amounts() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        load_limits_file(&catalog, write_temp(LIMITS_2025).path()).unwrap();

        let correction = write_temp("year,account_type,limit_type,amount\n2025,ROTH_IRA,BASE,7500.00\n");
        load_limits_file(&catalog, correction.path()).unwrap();

        let limit = catalog
            .find_limit(2025, AccountType::RothIra, LimitType::Base)
            .unwrap()
            .unwrap();
        assert_eq!(limit.amount(), Money::from_units(7_500));
        assert_eq!(catalog.with_connection(db::count_limits).unwrap(), 6);
    }
}
