// 🧮 Limit Resolver - eligibility and MAGI phase-out math
//
// Pure functions over catalog facts plus caller-supplied age / MAGI.
//
// Rounding happens in two separate stages and must stay that way:
//   1. phase-out percentage: HALF_UP at 4 decimal places
//   2. reduced limit:        UP (away from zero) at 0 decimal places
// Collapsing them into a single rounding changes results for some inputs.

use crate::catalog::LimitCatalog;
use crate::entities::{
    AccountType, ContributionLimit, FilingStatus, LimitType, PhaseOutAccountType, PhaseOutRange,
};
use crate::error::Result;
use crate::money::{div_round_up, Money, Percentage, CENTS_PER_UNIT, PERCENT_SCALE};

// ============================================================================
// PHASE-OUT MATH
// ============================================================================

/// Fraction of the limit that is phased out at `magi`.
///
/// 0 at or below `magi_start`, 1 at or above `magi_end`, linear in between.
pub fn phase_out_percentage(range: &PhaseOutRange, magi: Money) -> Percentage {
    if magi <= range.magi_start() {
        return Percentage::ZERO;
    }
    if magi >= range.magi_end() {
        return Percentage::ONE;
    }

    let over = (magi - range.magi_start()).cents() as i128;
    let width = range.width().cents() as i128;
    Percentage::ratio_half_up(over, width)
}

/// `base - base * pct`, rounded up to a whole currency unit.
pub fn reduced_limit(base_limit: Money, range: &PhaseOutRange, magi: Money) -> Money {
    let pct = phase_out_percentage(range, magi).ten_thousandths() as i128;
    let scale = PERCENT_SCALE as i128;

    // Everything below is in cents * 1e-4, so it is exact.
    let base = base_limit.cents() as i128 * scale;
    let reduction = base_limit.cents() as i128 * pct;
    let remaining = base - reduction;

    let units = div_round_up(remaining, CENTS_PER_UNIT as i128 * scale);
    Money::from_units(units as i64)
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct LimitResolver<C: LimitCatalog> {
    catalog: C,
}

impl<C: LimitCatalog> LimitResolver<C> {
    pub fn new(catalog: C) -> Self {
        LimitResolver { catalog }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Limit rows for (year, account type) a person of `age_at_year_end`
    /// qualifies for. The rows are additive; summing them is up to the caller.
    pub fn eligible_limit_types(
        &self,
        account_type: AccountType,
        year: i32,
        age_at_year_end: u32,
    ) -> Result<Vec<ContributionLimit>> {
        let all = self
            .catalog
            .find_limits_for_year_and_account_type(year, account_type)?;
        let total = all.len();

        let eligible: Vec<ContributionLimit> = all
            .into_iter()
            .filter(|limit| limit.is_eligible_at(age_at_year_end))
            .collect();

        tracing::debug!(
            year,
            account_type = %account_type,
            age = age_at_year_end,
            "{} of {} limit types eligible",
            eligible.len(),
            total
        );

        Ok(eligible)
    }

    /// Phase-out adjusted limit using the schedule that corresponds to
    /// `account_type`. `None` only when no base fact is published.
    pub fn resolve_reduced_limit(
        &self,
        year: i32,
        filing_status: FilingStatus,
        magi: Money,
        account_type: AccountType,
        limit_type: LimitType,
    ) -> Result<Option<Money>> {
        let phase_out_type = PhaseOutAccountType::for_account_type(account_type);
        self.resolve_with_phase_out(
            year,
            filing_status,
            magi,
            account_type,
            limit_type,
            phase_out_type,
        )
    }

    /// Same as [`resolve_reduced_limit`](Self::resolve_reduced_limit) with an
    /// explicit phase-out schedule (e.g. spouse-covered traditional IRA).
    pub fn resolve_with_phase_out(
        &self,
        year: i32,
        filing_status: FilingStatus,
        magi: Money,
        account_type: AccountType,
        limit_type: LimitType,
        phase_out_type: Option<PhaseOutAccountType>,
    ) -> Result<Option<Money>> {
        let base = match self.catalog.find_limit(year, account_type, limit_type)? {
            Some(limit) => limit.amount(),
            None => {
                tracing::debug!(
                    year,
                    account_type = %account_type,
                    limit_type = %limit_type,
                    "no published limit"
                );
                return Ok(None);
            }
        };

        let range = match phase_out_type {
            Some(t) => self.catalog.find_phase_out_range(year, filing_status, t)?,
            None => None,
        };

        match range {
            Some(range) => {
                let reduced = reduced_limit(base, &range, magi);
                tracing::debug!(
                    year,
                    account_type = %account_type,
                    filing_status = %filing_status,
                    %magi,
                    %base,
                    %reduced,
                    "applied phase-out"
                );
                Ok(Some(reduced))
            }
            // No schedule on file: the full base amount applies
            None => Ok(Some(base)),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn roth_range() -> PhaseOutRange {
        PhaseOutRange::new(
            2025,
            FilingStatus::Single,
            PhaseOutAccountType::RothIra,
            money("150000.00"),
            money("165000.00"),
        )
        .unwrap()
    }

    fn limit(year: i32, account_type: AccountType, limit_type: LimitType, amount: &str) -> ContributionLimit {
        ContributionLimit::new(year, account_type, limit_type, money(amount)).unwrap()
    }

    fn resolver() -> LimitResolver<InMemoryCatalog> {
        LimitResolver::new(InMemoryCatalog::from_facts(
            vec![
                limit(2025, AccountType::RothIra, LimitType::Base, "7000.00"),
                limit(2025, AccountType::RothIra, LimitType::Catchup50, "1000.00"),
                limit(2025, AccountType::Traditional401k, LimitType::Base, "23500.00"),
                limit(2025, AccountType::Traditional401k, LimitType::Catchup50, "7500.00"),
                limit(2025, AccountType::Traditional401k, LimitType::Catchup60To63, "11250.00"),
                limit(2025, AccountType::Traditional401k, LimitType::EmployerTotal, "70000.00"),
                limit(2025, AccountType::HsaSelf, LimitType::Base, "4300.00"),
                limit(2025, AccountType::HsaSelf, LimitType::Catchup55, "1000.00"),
                limit(2024, AccountType::RothIra, LimitType::Base, "7000.00"),
            ],
            vec![roth_range()],
        ))
    }

    // ------------------------------------------------------------------------
    // percentage
    // ------------------------------------------------------------------------

    #[test]
    fn test_percentage_at_boundaries() {
        let range = roth_range();
        assert_eq!(phase_out_percentage(&range, range.magi_start()), Percentage::ZERO);
        assert_eq!(phase_out_percentage(&range, range.magi_end()), Percentage::ONE);
    }

    #[test]
    fn test_percentage_clamps_outside_range() {
        let range = roth_range();
        assert_eq!(phase_out_percentage(&range, Money::ZERO), Percentage::ZERO);
        assert_eq!(phase_out_percentage(&range, money("149999.99")), Percentage::ZERO);
        assert_eq!(phase_out_percentage(&range, money("165000.01")), Percentage::ONE);
        assert_eq!(phase_out_percentage(&range, money("9000000.00")), Percentage::ONE);
    }

    #[test]
    fn test_percentage_midpoint() {
        let range = roth_range();
        let pct = phase_out_percentage(&range, money("157500.00"));
        assert_eq!(pct.to_string(), "0.5000");
    }

    #[test]
    fn test_percentage_midpoint_for_odd_ranges() {
        for (start, end) in [("10.00", "10.02"), ("0.00", "0.02"), ("73000.00", "83000.00")] {
            let range = PhaseOutRange::new(
                2025,
                FilingStatus::Single,
                PhaseOutAccountType::TraditionalIra,
                money(start),
                money(end),
            )
            .unwrap();
            let mid = Money::from_cents((range.magi_start().cents() + range.magi_end().cents()) / 2);
            assert_eq!(phase_out_percentage(&range, mid), Percentage::from_ten_thousandths(5_000));
        }
    }

    #[test]
    fn test_percentage_rounds_half_up_at_four_places() {
        // width 15000: 1.00 over = 0.0000666.. -> 0.0001
        let range = roth_range();
        assert_eq!(
            phase_out_percentage(&range, money("150001.00")).ten_thousandths(),
            1
        );
        // 0.75 over = 0.00005 exactly -> rounds up to 0.0001
        assert_eq!(
            phase_out_percentage(&range, money("150000.75")).ten_thousandths(),
            1
        );
        // 0.74 over = 0.0000493.. -> 0.0000
        assert_eq!(
            phase_out_percentage(&range, money("150000.74")).ten_thousandths(),
            0
        );
    }

    // ------------------------------------------------------------------------
    // reduced limit
    // ------------------------------------------------------------------------

    #[test]
    fn test_reduced_limit_scenarios() {
        let range = roth_range();
        let base = money("7000.00");

        assert_eq!(reduced_limit(base, &range, money("140000.00")), money("7000"));
        assert_eq!(reduced_limit(base, &range, money("157500.00")), money("3500"));
        assert_eq!(reduced_limit(base, &range, money("200000.00")), Money::ZERO);
    }

    #[test]
    fn test_reduced_limit_zero_at_end_regardless_of_scale() {
        let range = roth_range();
        for base in ["0.01", "1.00", "7000.00", "69000.00", "9999999999.99"] {
            assert_eq!(reduced_limit(money(base), &range, range.magi_end()), Money::ZERO);
        }
    }

    #[test]
    fn test_reduced_limit_rounds_up_to_whole_units() {
        let range = roth_range();
        // pct at 151000 = 1000/15000 = 0.0667 -> 7000 * 0.9333 = 6533.10 -> 6534
        assert_eq!(reduced_limit(money("7000.00"), &range, money("151000.00")), money("6534"));
        // un-reduced cents still round up
        assert_eq!(reduced_limit(money("7000.01"), &range, money("100000.00")), money("7001"));
    }

    #[test]
    fn test_two_stage_rounding_differs_from_single_stage() {
        let range = roth_range();
        // exact pct = 0.00005 -> 0.0001 after stage one;
        // 10000 * 0.9999 = 9999.00 -> 9999, while the unrounded
        // 10000 * (1 - 0.00005) = 9999.50 would round up to 10000.
        let reduced = reduced_limit(money("10000.00"), &range, money("150000.75"));
        assert_eq!(reduced, money("9999"));
    }

    #[test]
    fn test_reduced_limit_is_monotonic() {
        let range = roth_range();
        let base = money("7000.00");
        let mut previous = reduced_limit(base, &range, money("149000.00"));
        let mut magi = money("149000.00");
        while magi <= money("166000.00") {
            let current = reduced_limit(base, &range, magi);
            assert!(current <= previous, "limit increased at MAGI {}", magi);
            previous = current;
            magi = magi + money("37.13");
        }
    }

    // ------------------------------------------------------------------------
    // eligibility
    // ------------------------------------------------------------------------

    #[test]
    fn test_eligible_limit_types_by_age() {
        let resolver = resolver();

        let types_at = |age: u32| -> Vec<LimitType> {
            resolver
                .eligible_limit_types(AccountType::Traditional401k, 2025, age)
                .unwrap()
                .iter()
                .map(|l| l.limit_type())
                .collect()
        };

        assert_eq!(types_at(35), vec![LimitType::Base, LimitType::EmployerTotal]);
        assert_eq!(
            types_at(55),
            vec![LimitType::Base, LimitType::Catchup50, LimitType::EmployerTotal]
        );
        assert_eq!(
            types_at(61),
            vec![
                LimitType::Base,
                LimitType::Catchup50,
                LimitType::Catchup60To63,
                LimitType::EmployerTotal
            ]
        );
        assert_eq!(
            types_at(64),
            vec![LimitType::Base, LimitType::Catchup50, LimitType::EmployerTotal]
        );
    }

    #[test]
    fn test_eligibility_hsa_catchup() {
        let resolver = resolver();
        let at_54 = resolver.eligible_limit_types(AccountType::HsaSelf, 2025, 54).unwrap();
        let at_55 = resolver.eligible_limit_types(AccountType::HsaSelf, 2025, 55).unwrap();
        assert_eq!(at_54.len(), 1);
        assert_eq!(at_55.len(), 2);
    }

    #[test]
    fn test_eligibility_for_unpublished_year_is_empty() {
        let resolver = resolver();
        assert!(resolver
            .eligible_limit_types(AccountType::Traditional401k, 2030, 61)
            .unwrap()
            .is_empty());
    }

    // ------------------------------------------------------------------------
    // composite resolution
    // ------------------------------------------------------------------------

    #[test]
    fn test_resolve_applies_phase_out() {
        let resolver = resolver();
        let resolved = resolver
            .resolve_reduced_limit(
                2025,
                FilingStatus::Single,
                money("157500.00"),
                AccountType::RothIra,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(resolved, Some(money("3500")));
    }

    #[test]
    fn test_resolve_without_range_returns_base() {
        let resolver = resolver();

        // 2024 has a base limit but no phase-out range on file
        let resolved = resolver
            .resolve_reduced_limit(
                2024,
                FilingStatus::Single,
                money("500000.00"),
                AccountType::RothIra,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(resolved, Some(money("7000.00")));

        // filing status without a range
        let resolved = resolver
            .resolve_reduced_limit(
                2025,
                FilingStatus::MarriedFilingJointly,
                money("500000.00"),
                AccountType::RothIra,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(resolved, Some(money("7000.00")));
    }

    #[test]
    fn test_resolve_account_without_schedule_returns_base() {
        let resolver = resolver();
        let resolved = resolver
            .resolve_reduced_limit(
                2025,
                FilingStatus::Single,
                money("900000.00"),
                AccountType::Traditional401k,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(resolved, Some(money("23500.00")));
    }

    #[test]
    fn test_traditional_ira_deduction_range_does_not_cap_contributions() {
        let resolver = LimitResolver::new(InMemoryCatalog::from_facts(
            vec![limit(2025, AccountType::TraditionalIra, LimitType::Base, "7000.00")],
            vec![PhaseOutRange::new(
                2025,
                FilingStatus::Single,
                PhaseOutAccountType::TraditionalIra,
                money("79000.00"),
                money("89000.00"),
            )
            .unwrap()],
        ));

        let implicit = resolver
            .resolve_reduced_limit(
                2025,
                FilingStatus::Single,
                money("100000.00"),
                AccountType::TraditionalIra,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(implicit, Some(money("7000.00")));

        let explicit = resolver
            .resolve_with_phase_out(
                2025,
                FilingStatus::Single,
                money("100000.00"),
                AccountType::TraditionalIra,
                LimitType::Base,
                Some(PhaseOutAccountType::TraditionalIra),
            )
            .unwrap();
        assert_eq!(explicit, Some(Money::ZERO));
    }

    #[test]
    fn test_resolve_missing_base_is_none_not_zero() {
        let resolver = resolver();
        let resolved = resolver
            .resolve_reduced_limit(
                2026,
                FilingStatus::Single,
                money("100000.00"),
                AccountType::RothIra,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(resolved, None);

        // fully phased out is Some(0), a different answer
        let resolved = resolver
            .resolve_reduced_limit(
                2025,
                FilingStatus::Single,
                money("200000.00"),
                AccountType::RothIra,
                LimitType::Base,
            )
            .unwrap();
        assert_eq!(resolved, Some(Money::ZERO));
    }

    #[test]
    fn test_resolve_with_explicit_schedule() {
        let resolver = resolver();
        let resolved = resolver
            .resolve_with_phase_out(
                2025,
                FilingStatus::Single,
                money("157500.00"),
                AccountType::RothIra,
                LimitType::Catchup50,
                Some(PhaseOutAccountType::RothIra),
            )
            .unwrap();
        assert_eq!(resolved, Some(money("500")));

        let resolved = resolver
            .resolve_with_phase_out(
                2025,
                FilingStatus::Single,
                money("157500.00"),
                AccountType::RothIra,
                LimitType::Base,
                Some(PhaseOutAccountType::TraditionalIraSpouseCovered),
            )
            .unwrap();
        assert_eq!(resolved, Some(money("7000.00")));
    }
}
