// 📚 Limit Catalog - point lookups and year listings over published facts
//
// Absence is never an error: lookups return Ok(None) / an empty Vec.
// Err is reserved for a backing store that fails (see db::SqliteCatalog).

use crate::entities::{
    AccountType, ContributionLimit, FilingStatus, LimitKey, LimitType, PhaseOutAccountType,
    PhaseOutKey, PhaseOutRange,
};
use crate::error::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

// ============================================================================
// CATALOG TRAIT
// ============================================================================

pub trait LimitCatalog: Send + Sync {
    fn find_limit(
        &self,
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
    ) -> Result<Option<ContributionLimit>>;

    fn find_limits_for_year_and_account_type(
        &self,
        year: i32,
        account_type: AccountType,
    ) -> Result<Vec<ContributionLimit>>;

    fn find_limits_for_year(&self, year: i32) -> Result<Vec<ContributionLimit>>;

    fn find_phase_out_range(
        &self,
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
    ) -> Result<Option<PhaseOutRange>>;

    fn find_phase_out_ranges_for_year(&self, year: i32) -> Result<Vec<PhaseOutRange>>;

    fn find_phase_out_ranges_for_filing_status(
        &self,
        year: i32,
        filing_status: FilingStatus,
    ) -> Result<Vec<PhaseOutRange>>;

    /// Years with at least one contribution limit, newest first
    fn years_with_data(&self) -> Result<Vec<i32>>;

    fn has_data_for_year(&self, year: i32) -> Result<bool> {
        Ok(self.years_with_data()?.contains(&year))
    }

    /// Insert, or correct the amount of, the fact with the same natural key
    fn upsert_limit(&self, limit: &ContributionLimit) -> Result<()>;

    /// Insert, or correct the thresholds of, the range with the same natural key
    fn upsert_phase_out_range(&self, range: &PhaseOutRange) -> Result<()>;
}

impl<C: LimitCatalog + ?Sized> LimitCatalog for Arc<C> {
    fn find_limit(
        &self,
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
    ) -> Result<Option<ContributionLimit>> {
        (**self).find_limit(year, account_type, limit_type)
    }

    fn find_limits_for_year_and_account_type(
        &self,
        year: i32,
        account_type: AccountType,
    ) -> Result<Vec<ContributionLimit>> {
        (**self).find_limits_for_year_and_account_type(year, account_type)
    }

    fn find_limits_for_year(&self, year: i32) -> Result<Vec<ContributionLimit>> {
        (**self).find_limits_for_year(year)
    }

    fn find_phase_out_range(
        &self,
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
    ) -> Result<Option<PhaseOutRange>> {
        (**self).find_phase_out_range(year, filing_status, account_type)
    }

    fn find_phase_out_ranges_for_year(&self, year: i32) -> Result<Vec<PhaseOutRange>> {
        (**self).find_phase_out_ranges_for_year(year)
    }

    fn find_phase_out_ranges_for_filing_status(
        &self,
        year: i32,
        filing_status: FilingStatus,
    ) -> Result<Vec<PhaseOutRange>> {
        (**self).find_phase_out_ranges_for_filing_status(year, filing_status)
    }

    fn years_with_data(&self) -> Result<Vec<i32>> {
        (**self).years_with_data()
    }

    fn has_data_for_year(&self, year: i32) -> Result<bool> {
        (**self).has_data_for_year(year)
    }

    fn upsert_limit(&self, limit: &ContributionLimit) -> Result<()> {
        (**self).upsert_limit(limit)
    }

    fn upsert_phase_out_range(&self, range: &PhaseOutRange) -> Result<()> {
        (**self).upsert_phase_out_range(range)
    }
}

// ============================================================================
// IN-MEMORY CATALOG
// ============================================================================

/// Catalog held entirely in memory, keyed by natural keys.
///
/// Readers share the maps through `RwLock`; a correction replaces the value
/// under the same key, keeping the original identity.
#[derive(Default)]
pub struct InMemoryCatalog {
    limits: Arc<RwLock<HashMap<LimitKey, ContributionLimit>>>,
    phase_outs: Arc<RwLock<HashMap<PhaseOutKey, PhaseOutRange>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-validated facts
    pub fn from_facts(limits: Vec<ContributionLimit>, ranges: Vec<PhaseOutRange>) -> Self {
        let catalog = InMemoryCatalog::new();
        {
            let mut map = catalog.limits.write().unwrap_or_else(|e| e.into_inner());
            for limit in limits {
                map.insert(limit.key(), limit);
            }
        }
        {
            let mut map = catalog.phase_outs.write().unwrap_or_else(|e| e.into_inner());
            for range in ranges {
                map.insert(range.key(), range);
            }
        }
        catalog
    }

    pub fn limit_count(&self) -> usize {
        self.limits.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn phase_out_count(&self) -> usize {
        self.phase_outs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn collect_limits<F>(&self, predicate: F) -> Vec<ContributionLimit>
    where
        F: Fn(&ContributionLimit) -> bool,
    {
        let map = self.limits.read().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<ContributionLimit> =
            map.values().filter(|l| predicate(l)).cloned().collect();
        found.sort_by_key(|l| l.key());
        found
    }

    fn collect_ranges<F>(&self, predicate: F) -> Vec<PhaseOutRange>
    where
        F: Fn(&PhaseOutRange) -> bool,
    {
        let map = self.phase_outs.read().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<PhaseOutRange> =
            map.values().filter(|r| predicate(r)).cloned().collect();
        found.sort_by_key(|r| r.key());
        found
    }
}

impl LimitCatalog for InMemoryCatalog {
    fn find_limit(
        &self,
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
    ) -> Result<Option<ContributionLimit>> {
        let map = self.limits.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(&(year, account_type, limit_type)).cloned())
    }

    fn find_limits_for_year_and_account_type(
        &self,
        year: i32,
        account_type: AccountType,
    ) -> Result<Vec<ContributionLimit>> {
        Ok(self.collect_limits(|l| l.year() == year && l.account_type() == account_type))
    }

    fn find_limits_for_year(&self, year: i32) -> Result<Vec<ContributionLimit>> {
        Ok(self.collect_limits(|l| l.year() == year))
    }

    fn find_phase_out_range(
        &self,
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
    ) -> Result<Option<PhaseOutRange>> {
        let map = self.phase_outs.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(&(year, filing_status, account_type)).cloned())
    }

    fn find_phase_out_ranges_for_year(&self, year: i32) -> Result<Vec<PhaseOutRange>> {
        Ok(self.collect_ranges(|r| r.year() == year))
    }

    fn find_phase_out_ranges_for_filing_status(
        &self,
        year: i32,
        filing_status: FilingStatus,
    ) -> Result<Vec<PhaseOutRange>> {
        Ok(self.collect_ranges(|r| r.year() == year && r.filing_status() == filing_status))
    }

    fn years_with_data(&self) -> Result<Vec<i32>> {
        let map = self.limits.read().unwrap_or_else(|e| e.into_inner());
        let years: BTreeSet<i32> = map.keys().map(|(year, _, _)| *year).collect();
        Ok(years.into_iter().rev().collect())
    }

    fn upsert_limit(&self, limit: &ContributionLimit) -> Result<()> {
        let mut map = self.limits.write().unwrap_or_else(|e| e.into_inner());
        match map.get_mut(&limit.key()) {
            Some(existing) => {
                tracing::debug!(
                    year = limit.year(),
                    account_type = %limit.account_type(),
                    limit_type = %limit.limit_type(),
                    "correcting contribution limit {} -> {}",
                    existing.amount(),
                    limit.amount()
                );
                let id = existing.id.clone();
                *existing = limit.clone();
                existing.id = id;
            }
            None => {
                map.insert(limit.key(), limit.clone());
            }
        }
        Ok(())
    }

    fn upsert_phase_out_range(&self, range: &PhaseOutRange) -> Result<()> {
        let mut map = self.phase_outs.write().unwrap_or_else(|e| e.into_inner());
        match map.get_mut(&range.key()) {
            Some(existing) => {
                let id = existing.id.clone();
                *existing = range.clone();
                existing.id = id;
            }
            None => {
                map.insert(range.key(), range.clone());
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
