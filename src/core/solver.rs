use tracing::debug;

use super::buckets::BucketSet;
use super::coast::ContributionSchedule;
use super::stepper::{YearStepper, is_depleted};
use super::types::{Household, Phase, SolveCandidate, SolveReport};

pub const SAFE_WITHDRAWAL_MULTIPLE: f64 = 25.0;

pub fn required_capital(annual_expenses: f64, state_annual_income: f64) -> f64 {
    (annual_expenses - state_annual_income).max(0.0) * SAFE_WITHDRAWAL_MULTIPLE
}

/// Forward scan for the earliest freedom age.
///
/// Each candidate is evaluated on a copy of the bucket set stepped up to pension age with
/// locked buckets kept apart from `Available`, so the bridge years are funded by the
/// liquid bucket alone. A candidate qualifies when that bridge never falls short and the
/// non-state capital reaching pension age covers the 4% rule net of state income.
/// Candidates run from the current age to pension age, capped at `horizon_years` ahead.
pub fn solve(buckets: &BucketSet, household: &Household, horizon_years: u32) -> SolveReport {
    let first = household.current_age;
    let last = first
        .saturating_add(horizon_years)
        .min(buckets.pension_age().max(first));
    let schedule = ContributionSchedule::new(buckets, household);

    let mut report = SolveReport::default();
    for age in first..=last {
        let candidate = evaluate_candidate(buckets, household, &schedule, age);
        let qualifies =
            candidate.bridge_ok && candidate.capital_at_pension >= candidate.required_capital;
        debug!(
            age,
            bridge_ok = candidate.bridge_ok,
            capital_at_pension = candidate.capital_at_pension,
            required = candidate.required_capital,
            qualifies,
            "freedom candidate"
        );
        report.candidates.push(candidate);
        if qualifies {
            report.freedom_age = Some(age);
            break;
        }
    }

    if report.freedom_age.is_none() {
        debug!(first, last, "no freedom age within horizon");
    }
    report
}

fn evaluate_candidate(
    buckets: &BucketSet,
    household: &Household,
    schedule: &ContributionSchedule,
    freedom_age: u32,
) -> SolveCandidate {
    let mut set = buckets.clone();
    let stepper = YearStepper::new(schedule, household).without_merges();

    let mut bridge_ok = true;
    for age in household.current_age..set.pension_age() {
        let phase = if age >= freedom_age {
            Phase::Retired
        } else {
            Phase::Working
        };
        if is_depleted(&stepper.step(&mut set, age, phase)) {
            bridge_ok = false;
            break;
        }
    }

    SolveCandidate {
        age: freedom_age,
        bridge_ok,
        capital_at_pension: set.capital_excluding_state(),
        required_capital: required_capital(household.annual_expenses(), set.state_annual_income()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BucketKind, BucketSeed, PerBucket};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn household(monthly_expenses: f64, monthly_savings: f64) -> Household {
        Household {
            current_age: 35,
            pension_age: 65,
            monthly_expenses,
            monthly_savings,
            inflation_rate: 0.02,
            income: None,
        }
    }

    fn build(seeds: &[BucketSeed], household: &Household) -> BucketSet {
        let defaults = PerBucket::from_fn(|kind| kind.default_nominal_return());
        BucketSet::from_seeds(seeds, household, &defaults, 20).0
    }

    #[test]
    fn required_capital_nets_out_state_income() {
        assert_approx(required_capital(240_000.0, 0.0), 6_000_000.0);
        assert_approx(required_capital(240_000.0, 40_000.0), 5_000_000.0);
        assert_approx(required_capital(10_000.0, 40_000.0), 0.0);
    }

    #[test]
    fn single_liquid_bucket_finds_freedom_before_pension() {
        let household = household(20_000.0, 10_000.0);
        let set = build(
            &[BucketSeed::new(BucketKind::Available, 300_000.0)
                .with_return(0.07)
                .with_contribution(10_000.0)],
            &household,
        );
        let report = solve(&set, &household, 60);

        let age = report.freedom_age.expect("freedom should be reachable");
        assert!(age > 35 && age < 65, "got {age}");
        let last = report.candidates.last().expect("candidates");
        assert_eq!(last.age, age);
        assert!(last.bridge_ok);
        assert!(last.capital_at_pension >= last.required_capital);
        for candidate in &report.candidates[..report.candidates.len() - 1] {
            assert!(
                !candidate.bridge_ok || candidate.capital_at_pension < candidate.required_capital
            );
        }
    }

    #[test]
    fn unreachable_expenses_return_none() {
        let household = household(500_000.0, 1_000.0);
        let set = build(
            &[BucketSeed::new(BucketKind::Available, 10_000.0).with_contribution(1_000.0)],
            &household,
        );
        let report = solve(&set, &household, 60);
        assert!(report.freedom_age.is_none());
        assert_eq!(report.candidates.first().map(|c| c.age), Some(35));
        assert_eq!(report.candidates.last().map(|c| c.age), Some(65));
    }

    #[test]
    fn zero_expenses_are_free_immediately() {
        let household = household(0.0, 0.0);
        let set = build(&[], &household);
        let report = solve(&set, &household, 60);
        assert_eq!(report.freedom_age, Some(35));
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn locked_capital_does_not_fund_the_bridge() {
        // Plenty of pension capital, no liquid money: freedom must wait until pension age.
        let household = household(10_000.0, 0.0);
        let set = build(
            &[BucketSeed::new(BucketKind::Occupational, 20_000_000.0).with_unlock_age(60)],
            &household,
        );
        let report = solve(&set, &household, 60);
        assert_eq!(report.freedom_age, Some(65));
        assert!(report.candidates[..30].iter().all(|c| !c.bridge_ok));
    }

    #[test]
    fn state_income_lowers_the_target() {
        let household = household(20_000.0, 10_000.0);
        let liquid =
            BucketSeed::new(BucketKind::Available, 300_000.0).with_contribution(10_000.0);
        let without = solve(&build(&[liquid.clone()], &household), &household, 60);
        let with = solve(
            &build(
                &[
                    liquid,
                    BucketSeed::new(BucketKind::State, 2_000_000.0).with_return(0.02),
                ],
                &household,
            ),
            &household,
            60,
        );
        let without = without.freedom_age.expect("reachable");
        let with = with.freedom_age.expect("reachable");
        assert!(with <= without, "state income should not delay freedom");
    }

    #[test]
    fn horizon_caps_the_scan() {
        let household = household(500_000.0, 0.0);
        let set = build(&[], &household);
        let report = solve(&set, &household, 5);
        assert_eq!(report.candidates.len(), 6);
        assert!(report.freedom_age.is_none());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_more_savings_never_delays_freedom(
            balance in 0u32..2_000_000,
            contribution in 0u32..30_000,
            extra in 1u32..20_000,
            expenses in 1_000u32..40_000,
        ) {
            let household = household(expenses as f64, contribution as f64);
            let seed = |monthly: u32| {
                BucketSeed::new(BucketKind::Available, balance as f64)
                    .with_contribution(monthly as f64)
            };
            let base = solve(&build(&[seed(contribution)], &household), &household, 60);
            let more = solve(&build(&[seed(contribution + extra)], &household), &household, 60);

            match (base.freedom_age, more.freedom_age) {
                (Some(base), Some(more)) => prop_assert!(more <= base),
                (Some(_), None) => prop_assert!(false, "extra savings lost freedom"),
                _ => {}
            }
            prop_assert_eq!(base.candidates.first().map(|c| c.age), Some(35));
        }
    }
}
