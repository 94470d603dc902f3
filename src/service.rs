// 🧭 Limits Service - read API used by the CLI and HTTP layers
//
// Wraps the resolver with year/account listings and the composite
// query flow: validate input → fetch facts → filter by age → apply phase-out.
// `Ok(None)` always means "nothing published", never zero.

use crate::catalog::LimitCatalog;
use crate::entities::{
    AccountType, ContributionLimit, FilingStatus, LimitType, PhaseOutAccountType, PhaseOutRange,
};
use crate::error::Result;
use crate::money::{Money, Percentage};
use crate::resolver::{phase_out_percentage, reduced_limit, LimitResolver};
use crate::validation::{validate_age, validate_magi, validate_year};
use serde::Serialize;

// ============================================================================
// RESPONSE SHAPES
// ============================================================================

/// Everything published for one tax year
#[derive(Debug, Clone, Serialize)]
pub struct YearlyLimits {
    pub year: i32,
    pub contribution_limits: Vec<ContributionLimit>,
    pub phase_out_ranges: Vec<PhaseOutRange>,
}

/// All limit types published for one account type and year
#[derive(Debug, Clone, Serialize)]
pub struct AccountTypeLimits {
    pub year: i32,
    pub account_type: AccountType,
    pub limits: Vec<ContributionLimit>,
}

/// Filing status + MAGI, supplied together or not at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeContext {
    pub filing_status: FilingStatus,
    pub magi: Money,
}

/// Caller input for [`LimitsService::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitQuery {
    pub year: i32,
    pub account_type: AccountType,
    pub limit_type: Option<LimitType>,
    /// Age as of December 31 of `year`, computed by the caller
    pub age_at_year_end: Option<u32>,
    pub income: Option<IncomeContext>,
    /// Override the default phase-out schedule for the account type
    pub phase_out_type: Option<PhaseOutAccountType>,
}

impl LimitQuery {
    pub fn new(year: i32, account_type: AccountType) -> Self {
        LimitQuery {
            year,
            account_type,
            limit_type: None,
            age_at_year_end: None,
            income: None,
            phase_out_type: None,
        }
    }

    pub fn limit_type(mut self, limit_type: LimitType) -> Self {
        self.limit_type = Some(limit_type);
        self
    }

    pub fn age(mut self, age_at_year_end: u32) -> Self {
        self.age_at_year_end = Some(age_at_year_end);
        self
    }

    pub fn income(mut self, filing_status: FilingStatus, magi: Money) -> Self {
        self.income = Some(IncomeContext {
            filing_status,
            magi,
        });
        self
    }

    pub fn phase_out_type(mut self, phase_out_type: PhaseOutAccountType) -> Self {
        self.phase_out_type = Some(phase_out_type);
        self
    }

    fn validate(&self) -> Result<()> {
        validate_year(self.year)?;
        if let Some(age) = self.age_at_year_end {
            validate_age(age)?;
        }
        if let Some(income) = &self.income {
            validate_magi(income.magi)?;
        }
        Ok(())
    }
}

/// One limit row after eligibility and phase-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLimit {
    pub limit_type: LimitType,
    pub base_amount: Money,
    /// Share of the base removed by the phase-out (0 when none applies)
    pub phase_out_percentage: Percentage,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitResolution {
    pub year: i32,
    pub account_type: AccountType,
    /// Schedule that was applied, if any
    pub phase_out_type: Option<PhaseOutAccountType>,
    pub limits: Vec<ResolvedLimit>,
    /// Published limit types the given age does not qualify for
    pub ineligible: Vec<LimitType>,
}

impl LimitResolution {
    /// Sum of the resolved rows. Only meaningful for additive types
    /// (base + catch-ups); the caller decides whether to use it.
    pub fn total(&self) -> Money {
        self.limits.iter().map(|l| l.amount).sum()
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct LimitsService<C: LimitCatalog> {
    resolver: LimitResolver<C>,
}

impl<C: LimitCatalog> LimitsService<C> {
    pub fn new(catalog: C) -> Self {
        LimitsService {
            resolver: LimitResolver::new(catalog),
        }
    }

    pub fn resolver(&self) -> &LimitResolver<C> {
        &self.resolver
    }

    fn catalog(&self) -> &C {
        self.resolver.catalog()
    }

    pub fn limits_by_year(&self, year: i32) -> Result<Option<YearlyLimits>> {
        if !self.has_data_for_year(year)? {
            return Ok(None);
        }

        Ok(Some(YearlyLimits {
            year,
            contribution_limits: self.contribution_limits(year)?,
            phase_out_ranges: self.phase_out_ranges(year)?,
        }))
    }

    pub fn limits_by_year_and_account_type(
        &self,
        year: i32,
        account_type: AccountType,
    ) -> Result<Option<AccountTypeLimits>> {
        let limits = self
            .catalog()
            .find_limits_for_year_and_account_type(year, account_type)?;

        if limits.is_empty() {
            return Ok(None);
        }

        Ok(Some(AccountTypeLimits {
            year,
            account_type,
            limits,
        }))
    }

    pub fn limit(
        &self,
        year: i32,
        account_type: AccountType,
        limit_type: LimitType,
    ) -> Result<Option<ContributionLimit>> {
        self.catalog().find_limit(year, account_type, limit_type)
    }

    pub fn contribution_limits(&self, year: i32) -> Result<Vec<ContributionLimit>> {
        self.catalog().find_limits_for_year(year)
    }

    pub fn phase_out_ranges(&self, year: i32) -> Result<Vec<PhaseOutRange>> {
        self.catalog().find_phase_out_ranges_for_year(year)
    }

    pub fn phase_out_ranges_by_filing_status(
        &self,
        year: i32,
        filing_status: FilingStatus,
    ) -> Result<Vec<PhaseOutRange>> {
        self.catalog()
            .find_phase_out_ranges_for_filing_status(year, filing_status)
    }

    pub fn phase_out_range(
        &self,
        year: i32,
        filing_status: FilingStatus,
        account_type: PhaseOutAccountType,
    ) -> Result<Option<PhaseOutRange>> {
        self.catalog()
            .find_phase_out_range(year, filing_status, account_type)
    }

    /// Roth IRA base limit after the MAGI phase-out
    pub fn calculate_reduced_roth_ira_limit(
        &self,
        year: i32,
        filing_status: FilingStatus,
        magi: Money,
    ) -> Result<Option<Money>> {
        validate_year(year)?;
        validate_magi(magi)?;
        self.resolver.resolve_reduced_limit(
            year,
            filing_status,
            magi,
            AccountType::RothIra,
            LimitType::Base,
        )
    }

    pub fn available_years(&self) -> Result<Vec<i32>> {
        self.catalog().years_with_data()
    }

    pub fn has_data_for_year(&self, year: i32) -> Result<bool> {
        self.catalog().has_data_for_year(year)
    }

    /// Composite resolution.
    ///
    /// - a specific `limit_type` selects that row, otherwise all rows
    /// - an age keeps only the rows the person qualifies for; published rows
    ///   they do not qualify for are reported in `ineligible`
    /// - an income context applies the phase-out to every eligible row
    ///
    /// `Ok(None)` when nothing matching is published.
    pub fn resolve(&self, query: &LimitQuery) -> Result<Option<LimitResolution>> {
        query.validate()?;

        let published: Vec<ContributionLimit> = match query.limit_type {
            Some(limit_type) => self
                .catalog()
                .find_limit(query.year, query.account_type, limit_type)?
                .into_iter()
                .collect(),
            None => self
                .catalog()
                .find_limits_for_year_and_account_type(query.year, query.account_type)?,
        };

        if published.is_empty() {
            return Ok(None);
        }

        let (rows, ineligible): (Vec<ContributionLimit>, Vec<ContributionLimit>) =
            match query.age_at_year_end {
                Some(age) => published
                    .into_iter()
                    .partition(|limit| limit.is_eligible_at(age)),
                None => (published, Vec::new()),
            };
        let ineligible: Vec<LimitType> = ineligible.iter().map(|l| l.limit_type()).collect();

        if !ineligible.is_empty() {
            tracing::debug!(
                year = query.year,
                account_type = %query.account_type,
                "{} published limit types not eligible at age {:?}",
                ineligible.len(),
                query.age_at_year_end
            );
        }

        let phase_out_type = query
            .phase_out_type
            .or_else(|| PhaseOutAccountType::for_account_type(query.account_type));

        let range = match (query.income, phase_out_type) {
            (Some(income), Some(t)) => self
                .catalog()
                .find_phase_out_range(query.year, income.filing_status, t)?
                .map(|range| (range, income.magi)),
            _ => None,
        };

        let limits = rows
            .iter()
            .map(|row| match &range {
                Some((range, magi)) => ResolvedLimit {
                    limit_type: row.limit_type(),
                    base_amount: row.amount(),
                    phase_out_percentage: phase_out_percentage(range, *magi),
                    amount: reduced_limit(row.amount(), range, *magi),
                },
                None => ResolvedLimit {
                    limit_type: row.limit_type(),
                    base_amount: row.amount(),
                    phase_out_percentage: Percentage::ZERO,
                    amount: row.amount(),
                },
            })
            .collect();

        Ok(Some(LimitResolution {
            year: query.year,
            account_type: query.account_type,
            phase_out_type: range.as_ref().map(|(r, _)| r.account_type()),
            limits,
            ineligible,
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::LimitsError;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn limit(account_type: AccountType, limit_type: LimitType, amount: &str) -> ContributionLimit {
        ContributionLimit::new(2025, account_type, limit_type, money(amount)).unwrap()
    }

    fn service() -> LimitsService<InMemoryCatalog> {
        LimitsService::new(InMemoryCatalog::from_facts(
            vec![
                limit(AccountType::RothIra, LimitType::Base, "7000.00"),
                limit(AccountType::RothIra, LimitType::Catchup50, "1000.00"),
                limit(AccountType::Traditional401k, LimitType::Base, "23500.00"),
                limit(AccountType::Traditional401k, LimitType::Catchup50, "7500.00"),
                limit(AccountType::Traditional401k, LimitType::Catchup60To63, "11250.00"),
                limit(AccountType::TraditionalIra, LimitType::Base, "7000.00"),
            ],
            vec![
                PhaseOutRange::new(
                    2025,
                    FilingStatus::Single,
                    PhaseOutAccountType::RothIra,
                    money("150000.00"),
                    money("165000.00"),
                )
                .unwrap(),
                PhaseOutRange::new(
                    2025,
                    FilingStatus::MarriedFilingJointly,
                    PhaseOutAccountType::TraditionalIraSpouseCovered,
                    money("236000.00"),
                    money("246000.00"),
                )
                .unwrap(),
            ],
        ))
    }

    #[test]
    fn test_limits_by_year() {
        let service = service();

        let yearly = service.limits_by_year(2025).unwrap().unwrap();
        assert_eq!(yearly.contribution_limits.len(), 6);
        assert_eq!(yearly.phase_out_ranges.len(), 2);

        assert!(service.limits_by_year(2026).unwrap().is_none());
        assert_eq!(service.available_years().unwrap(), vec![2025]);
    }

    #[test]
    fn test_limits_by_account_type() {
        let service = service();
        let limits = service
            .limits_by_year_and_account_type(2025, AccountType::Traditional401k)
            .unwrap()
            .unwrap();
        assert_eq!(limits.limits.len(), 3);

        assert!(service
            .limits_by_year_and_account_type(2025, AccountType::HsaFamily)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_reduced_roth_ira_limit() {
        let service = service();
        assert_eq!(
            service
                .calculate_reduced_roth_ira_limit(2025, FilingStatus::Single, money("157500.00"))
                .unwrap(),
            Some(money("3500"))
        );
        assert_eq!(
            service
                .calculate_reduced_roth_ira_limit(2025, FilingStatus::HeadOfHousehold, money("900000.00"))
                .unwrap(),
            Some(money("7000.00"))
        );
    }

    #[test]
    fn test_resolve_by_age_without_income() {
        let service = service();
        let resolution = service
            .resolve(&LimitQuery::new(2025, AccountType::Traditional401k).age(62))
            .unwrap()
            .unwrap();

        assert_eq!(resolution.limits.len(), 3);
        assert_eq!(resolution.total(), money("42250.00"));
        assert_eq!(resolution.phase_out_type, None);
    }

    #[test]
    fn test_resolve_with_income_phases_out_each_row() {
        let service = service();
        let resolution = service
            .resolve(
                &LimitQuery::new(2025, AccountType::RothIra)
                    .age(52)
                    .income(FilingStatus::Single, money("157500.00")),
            )
            .unwrap()
            .unwrap();

        let amounts: Vec<Money> = resolution.limits.iter().map(|l| l.amount).collect();
        assert_eq!(amounts, vec![money("3500"), money("500")]);
        assert_eq!(resolution.phase_out_type, Some(PhaseOutAccountType::RothIra));
        assert_eq!(resolution.limits[0].phase_out_percentage.to_string(), "0.5000");
    }

    #[test]
    fn test_resolve_specific_limit_type() {
        let service = service();
        let resolution = service
            .resolve(&LimitQuery::new(2025, AccountType::RothIra).limit_type(LimitType::Base))
            .unwrap()
            .unwrap();
        assert_eq!(resolution.limits.len(), 1);
        assert_eq!(resolution.total(), money("7000.00"));

        let missing = service
            .resolve(&LimitQuery::new(2025, AccountType::RothIra).limit_type(LimitType::Catchup55))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_resolve_specific_limit_type_respects_age() {
        let service = service();
        let query = LimitQuery::new(2025, AccountType::Traditional401k)
            .limit_type(LimitType::Catchup60To63);

        let at_40 = service.resolve(&query.clone().age(40)).unwrap().unwrap();
        assert!(at_40.limits.is_empty());
        assert_eq!(at_40.ineligible, vec![LimitType::Catchup60To63]);
        assert_eq!(at_40.total(), Money::ZERO);

        let at_61 = service.resolve(&query.clone().age(61)).unwrap().unwrap();
        assert_eq!(at_61.total(), money("11250.00"));
        assert!(at_61.ineligible.is_empty());

        let no_age = service.resolve(&query).unwrap().unwrap();
        assert_eq!(no_age.total(), money("11250.00"));
    }

    #[test]
    fn test_resolve_by_age_lists_ineligible_rows() {
        let service = service();
        let resolution = service
            .resolve(&LimitQuery::new(2025, AccountType::Traditional401k).age(45))
            .unwrap()
            .unwrap();

        assert_eq!(resolution.total(), money("23500.00"));
        assert_eq!(
            resolution.ineligible,
            vec![LimitType::Catchup50, LimitType::Catchup60To63]
        );
    }

    #[test]
    fn test_resolve_traditional_ira_ignores_deduction_schedule() {
        let service = LimitsService::new(InMemoryCatalog::from_facts(
            vec![limit(AccountType::TraditionalIra, LimitType::Base, "7000.00")],
            vec![PhaseOutRange::new(
                2025,
                FilingStatus::Single,
                PhaseOutAccountType::TraditionalIra,
                money("79000.00"),
                money("89000.00"),
            )
            .unwrap()],
        ));

        let resolution = service
            .resolve(
                &LimitQuery::new(2025, AccountType::TraditionalIra)
                    .income(FilingStatus::Single, money("100000.00")),
            )
            .unwrap()
            .unwrap();
        assert_eq!(resolution.total(), money("7000.00"));
        assert_eq!(resolution.phase_out_type, None);
    }

    #[test]
    fn test_resolve_with_explicit_spouse_schedule() {
        let service = service();
        let resolution = service
            .resolve(
                &LimitQuery::new(2025, AccountType::TraditionalIra)
                    .income(FilingStatus::MarriedFilingJointly, money("241000.00"))
                    .phase_out_type(PhaseOutAccountType::TraditionalIraSpouseCovered),
            )
            .unwrap()
            .unwrap();
        assert_eq!(resolution.total(), money("3500"));
    }

    #[test]
    fn test_resolve_rejects_bad_input() {
        let service = service();

        let negative = service.resolve(
            &LimitQuery::new(2025, AccountType::RothIra).income(FilingStatus::Single, money("-1.00")),
        );
        assert!(matches!(negative, Err(LimitsError::InvalidInput { .. })));

        let year = service.resolve(&LimitQuery::new(3000, AccountType::RothIra));
        assert!(year.unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_resolve_unpublished_year_is_none() {
        let service = service();
        assert!(service
            .resolve(&LimitQuery::new(2026, AccountType::RothIra).age(40))
            .unwrap()
            .is_none());
    }
}
