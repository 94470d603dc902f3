// 🗄️ SQLite storage for published limit facts
//
// Money is stored as INTEGER cents, enums as their storage tokens
// (403(b) -> "403B"). Natural keys are UNIQUE so a correction is an upsert.

use crate::catalog::LimitCatalog;
use crate::entities::{
    AccountType, ContributionLimit, FilingStatus, LimitType, PhaseOutAccountType, PhaseOutRange,
};
use crate::error::{LimitsError, Result};
use crate::money::Money;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

// ============================================================================
// COLUMN CONVERSIONS
// ============================================================================

fn token_from_sql<T>(value: ValueRef<'_>, decode: fn(&str) -> Result<T>) -> FromSqlResult<T> {
    let token = value.as_str()?;
    decode(token).map_err(|e| FromSqlError::Other(Box::new(e)))
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_token()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        token_from_sql(value, AccountType::from_token)
    }
}

impl ToSql for LimitType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_token()))
    }
}

impl FromSql for LimitType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        token_from_sql(value, LimitType::from_token)
    }
}

impl ToSql for FilingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_token()))
    }
}

impl FromSql for FilingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        token_from_sql(value, FilingStatus::from_token)
    }
}

impl ToSql for PhaseOutAccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_token()))
    }
}

impl FromSql for PhaseOutAccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        token_from_sql(value, PhaseOutAccountType::from_token)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.cents()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_i64().map(Money::from_cents)
    }
}

fn parse_timestamp(table: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LimitsError::corrupt(table, format!("timestamp '{}': {}", raw, e)))
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contribution_limits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            limit_uuid TEXT UNIQUE NOT NULL,
            year INTEGER NOT NULL,
            account_type TEXT NOT NULL,
            limit_type TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT,
            UNIQUE (year, account_type, limit_type)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS phase_out_ranges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            range_uuid TEXT UNIQUE NOT NULL,
            year INTEGER NOT NULL,
            filing_status TEXT NOT NULL,
            account_type TEXT NOT NULL,
            magi_start_cents INTEGER NOT NULL,
            magi_end_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            CHECK (magi_start_cents < magi_end_cents),
            UNIQUE (year, filing_status, account_type)
        )",
        [],
    )?;

    // One row per loaded source file; the fingerprint makes reloads no-ops
    conn.execute(
        "CREATE TABLE IF NOT EXISTS publications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fingerprint TEXT UNIQUE NOT NULL,
            source_file TEXT NOT NULL,
            kind TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            loaded_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_limits_year ON contribution_limits(year)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_phase_outs_year ON phase_out_ranges(year, filing_status)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CONTRIBUTION LIMITS
// ============================================================================

/// Insert a limit, or correct the amount of the existing one
pub fn upsert_limit(conn: &Connection, limit: &ContributionLimit) -> Result<()> {
    conn.execute(
        "INSERT INTO contribution_limits (
            limit_uuid, year, account_type, limit_type, amount_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (year, account_type, limit_type)
        DO UPDATE SET amount_cents = excluded.amount_cents,
                      updated_at = excluded.created_at",
        params![
            limit.id,
            limit.year(),
            limit.account_type(),
            limit.limit_type(),
            limit.amount(),
            limit.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

const LIMIT_COLUMNS: &str =
    "limit_uuid, year, account_type, limit_type, amount_cents, created_at";

type LimitRow = (String, i32, AccountType, LimitType, Money, String);

fn read_limit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LimitRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn limit_from_row(raw: LimitRow) -> Result<ContributionLimit> {
    let (id, year, account_type, limit_type, amount, created_at) = raw;
    ContributionLimit::restore(
        id,
        year,
        account_type,
        limit_type,
        amount,
        parse_timestamp("contribution_limits", &created_at)?,
    )
    .map_err(|e| LimitsError::corrupt("contribution_limits", e.to_string()))
}

fn query_limits(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<ContributionLimit>> {
    let sql = format!(
        "SELECT {} FROM contribution_limits WHERE {} ORDER BY year DESC, account_type, limit_type",
        LIMIT_COLUMNS, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params, read_limit_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut limits: Vec<ContributionLimit> = rows
        .into_iter()
        .map(limit_from_row)
        .collect::<Result<Vec<_>>>()?;

    // token order in SQL differs from declaration order; keep callers stable
    limits.sort_by(|a, b| b.year().cmp(&a.year()).then(a.key().cmp(&b.key())));
    Ok(limits)
}

pub fn get_limit(
    conn: &Connection,
    year: i32,
    account_type: AccountType,
    limit_type: LimitType,
) -> Result<Option<ContributionLimit>> {
    let sql = format!(
        "SELECT {} FROM contribution_limits
         WHERE year = ?1 AND account_type = ?2 AND limit_type = ?3",
        LIMIT_COLUMNS
    );

    let raw = conn
        .query_row(&sql, params![year, account_type, limit_type], read_limit_row)
        .optional()?;

    raw.map(limit_from_row).transpose()
}

pub fn get_limits_for_year_and_account_type(
    conn: &Connection,
    year: i32,
    account_type: AccountType,
) -> Result<Vec<ContributionLimit>> {
    query_limits(conn, "year = ?1 AND account_type = ?2", &[&year, &account_type])
}

pub fn get_limits_for_year(conn: &Connection, year: i32) -> Result<Vec<ContributionLimit>> {
    query_limits(conn, "year = ?1", &[&year])
}

pub fn get_years_with_data(conn: &Connection) -> Result<Vec<i32>> {
    let mut stmt = conn.prepare("SELECT DISTINCT year FROM contribution_limits ORDER BY year DESC")?;
    let years = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i32>>>()?;
    Ok(years)
}

pub fn year_has_data(conn: &Connection, year: i32) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM contribution_limits WHERE year = ?1)",
        [year],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn count_limits(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM contribution_limits", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

// ============================================================================
// PHASE-OUT RANGES
// ============================================================================

/// Insert a range, or correct the thresholds of the existing one
pub fn upsert_phase_out_range(conn: &Connection, range: &PhaseOutRange) -> Result<()> {
    conn.execute(
        "INSERT INTO phase_out_ranges (
            range_uuid, year, filing_status, account_type,
            magi_start_cents, magi_end_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (year, filing_status, account_type)
        DO UPDATE SET magi_start_cents = excluded.magi_start_cents,
                      magi_end_cents = excluded.magi_end_cents,
                      updated_at = excluded.created_at",
        params![
            range.id,
            range.year(),
            range.filing_status(),
            range.account_type(),
            range.magi_start(),
            range.magi_end(),
            range.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

const RANGE_COLUMNS: &str =
    "range_uuid, year, filing_status, account_type, magi_start_cents, magi_end_cents, created_at";

type RangeRow = (String, i32, FilingStatus, PhaseOutAccountType, Money, Money, String);

fn read_range_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RangeRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn range_from_row(raw: RangeRow) -> Result<PhaseOutRange> {
    let (id, year, filing_status, account_type, start, end, created_at) = raw;
    PhaseOutRange::restore(
        id,
        year,
        filing_status,
        account_type,
        start,
        end,
        parse_timestamp("phase_out_ranges", &created_at)?,
    )
    .map_err(|e| LimitsError::corrupt("phase_out_ranges", e.to_string()))
}

fn query_ranges(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<PhaseOutRange>> {
    let sql = format!(
        "SELECT {} FROM phase_out_ranges WHERE {}",
        RANGE_COLUMNS, where_clause
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params, read_range_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut ranges: Vec<PhaseOutRange> = rows
        .into_iter()
        .map(range_from_row)
        .collect::<Result<Vec<_>>>()?;

    ranges.sort_by_key(|r| r.key());
    Ok(ranges)
}

pub fn get_phase_out_range(
    conn: &Connection,
    year: i32,
    filing_status: FilingStatus,
    account_type: PhaseOutAccountType,
) -> Result<Option<PhaseOutRange>> {
    let sql = format!(
        "SELECT {} FROM phase_out_ranges
         WHERE year = ?1 AND filing_status = ?2 AND account_type = ?3",
        RANGE_COLUMNS
    );

    let raw = conn
        .query_row(&sql, params![year, filing_status, account_type], read_range_row)
        .optional()?;

    raw.map(range_from_row).transpose()
}

pub fn get_phase_out_ranges_for_year(conn: &Connection, year: i32) -> Result<Vec<PhaseOutRange>> {
    query_ranges(conn, "year = ?1", &[&year])
}

pub fn get_phase_out_ranges_for_filing_status(
    conn: &Connection,
    year: i32,
    filing_status: FilingStatus,
) -> Result<Vec<PhaseOutRange>> {
    query_ranges(conn, "year = ?1 AND filing_status = ?2", &[&year, &filing_status])
}

// ============================================================================
// PUBLICATIONS (load log)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    pub fingerprint: String,
    pub source_file: String,
    pub kind: String,
    pub row_count: i64,
    pub loaded_at: DateTime<Utc>,
}

pub fn is_published(conn: &Connection, fingerprint: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM publications WHERE fingerprint = ?1)",
        [fingerprint],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn record_publication(conn: &Connection, publication: &Publication) -> Result<()> {
    conn.execute(
        "INSERT INTO publications (fingerprint, source_file, kind, row_count, loaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            publication.fingerprint,
            publication.source_file,
            publication.kind,
            publication.row_count,
            publication.loaded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_publications(conn: &Connection) -> Result<Vec<Publication>> {
    let mut stmt = conn.prepare(
        "SELECT fingerprint, source_file, kind, row_count, loaded_at
         FROM publications
         ORDER BY id DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(fingerprint, source_file, kind, row_count, loaded_at)| {
            Ok(Publication {
                fingerprint,
                source_file,
                kind,
                row_count,
                loaded_at: parse_timestamp("publications", &loaded_at)?,
            })
        })
        .collect()
}

// ============================================================================
// SQLITE CATALOG
// ============================================================================

/// [`LimitCatalog`] backed by a single SQLite connection.
///
/// The connection is serialised behind a `Mutex`; queries are short point
/// lookups so contention is not a concern for this workload.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        setup_database(&conn)?;
        tracing::debug!("opened limits database at {:?}", path.as_ref());
        Ok(SqliteCatalog {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteCatalog {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with the raw connection
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&conn)
    }

    /// Run `f` inside one SQLite transaction; rolled back if `f` fails
    pub fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl LimitCatalog for SqliteCatalog {
    fn find_limit(
        &self,
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
    ) -> Result<Option<ContributionLimit>> {
        self.with_connection(|conn| get_limit(conn, year, account_type, limit_type))
    }

    fn find_limits_for_year_and_account_type(
        &self,
        year: i32,
        account_type: AccountType,
    ) -> Result<Vec<ContributionLimit>> {
        self.with_connection(|conn| get_limits_for_year_and_account_type(conn, year, account_type))
    }

    fn find_limits_for_year(&self, year: i32) -> Result<Vec<ContributionLimit>> {
        self.with_connection(|conn| get_limits_for_year(conn, year))
    }

    fn find_phase_out_range(
        &self,
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
    ) -> Result<Option<PhaseOutRange>> {
        self.with_connection(|conn| get_phase_out_range(conn, year, filing_status, account_type))
    }

    fn find_phase_out_ranges_for_year(&self, year: i32) -> Result<Vec<PhaseOutRange>> {
        self.with_connection(|conn| get_phase_out_ranges_for_year(conn, year))
    }

    fn find_phase_out_ranges_for_filing_status(
        &self,
        year: i32,
        filing_status: FilingStatus,
    ) -> Result<Vec<PhaseOutRange>> {
        self.with_connection(|conn| get_phase_out_ranges_for_filing_status(conn, year, filing_status))
    }

    fn years_with_data(&self) -> Result<Vec<i32>> {
        self.with_connection(get_years_with_data)
    }

    fn has_data_for_year(&self, year: i32) -> Result<bool> {
        self.with_connection(|conn| year_has_data(conn, year))
    }

    fn upsert_limit(&self, limit: &ContributionLimit) -> Result<()> {
        self.with_connection(|conn| upsert_limit(conn, limit))
    }

    fn upsert_phase_out_range(&self, range: &PhaseOutRange) -> Result<()> {
        self.with_connection(|conn| upsert_phase_out_range(conn, range))
    }
}

// ============================================================================
// TESTS
// ============================================================================
