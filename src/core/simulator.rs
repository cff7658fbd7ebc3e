use super::buckets::BucketSet;
use super::coast::{CoastWindow, ContributionSchedule};
use super::error::MAX_AGE;
use super::stepper::{YearStepper, is_depleted};
use super::types::{CoastConfig, Household, Phase, Trajectory};

pub fn horizon_age(household: &Household, buffer_years: u32) -> u32 {
    household
        .pension_age
        .max(household.current_age)
        .saturating_add(buffer_years.min(MAX_AGE))
}

pub fn phase_for(age: u32, freedom_age: Option<u32>, coast: Option<CoastWindow>) -> Phase {
    match freedom_age {
        Some(freedom) if age >= freedom => {
            if coast.is_some_and(|window| window.contains(age)) {
                Phase::Coast
            } else {
                Phase::Retired
            }
        }
        _ => Phase::Working,
    }
}

pub fn simulate(
    buckets: &BucketSet,
    household: &Household,
    freedom_age: Option<u32>,
    coast: Option<&CoastConfig>,
    horizon_age: u32,
) -> Trajectory {
    let mut set = buckets.clone();
    let schedule = ContributionSchedule::new(&set, household);
    let stepper = YearStepper::new(&schedule, household);
    let window =
        freedom_age.and_then(|freedom| CoastWindow::new(freedom, coast, set.pension_age()));

    let mut trajectory = Trajectory::default();
    for age in household.current_age..=horizon_age {
        let record = stepper.step(&mut set, age, phase_for(age, freedom_age, window));
        if trajectory.capital_depleted_year.is_none() && is_depleted(&record) {
            trajectory.capital_depleted_year = Some(age);
        }
        trajectory.records.push(record);
    }
    trajectory
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

    fn household(current_age: u32, pension_age: u32, monthly_expenses: f64) -> Household {
        Household {
            current_age,
            pension_age,
            monthly_expenses,
            monthly_savings: 5_000.0,
            inflation_rate: 0.02,
            income: None,
        }
    }

    fn build(seeds: &[BucketSeed], household: &Household) -> BucketSet {
        let defaults = PerBucket::from_fn(|kind| kind.default_nominal_return());
        BucketSet::from_seeds(seeds, household, &defaults, 20).0
    }

    fn mixed_seeds() -> Vec<BucketSeed> {
        vec![
            BucketSeed::new(BucketKind::Available, 500_000.0).with_contribution(8_000.0),
            BucketSeed::new(BucketKind::Occupational, 400_000.0)
                .with_contribution(3_000.0)
                .with_unlock_age(58),
            BucketSeed::new(BucketKind::Premium, 200_000.0).with_contribution(1_000.0),
            BucketSeed::new(BucketKind::Private, 50_000.0)
                .with_contribution(500.0)
                .with_unlock_age(60),
            BucketSeed::new(BucketKind::State, 800_000.0).with_contribution(5_000.0),
        ]
    }

    #[test]
    fn phases_follow_freedom_and_coast() {
        let window = Some(CoastWindow { start: 50, end: 53 });
        assert_eq!(phase_for(49, Some(50), window), Phase::Working);
        assert_eq!(phase_for(50, Some(50), window), Phase::Coast);
        assert_eq!(phase_for(53, Some(50), window), Phase::Retired);
        assert_eq!(phase_for(80, None, None), Phase::Working);
    }

    #[test]
    fn horizon_extends_past_pension_age() {
        assert_eq!(horizon_age(&household(40, 65, 0.0), 30), 95);
        assert_eq!(horizon_age(&household(70, 65, 0.0), 30), 100);
    }

    #[test]
    fn horizon_buffer_is_capped() {
        assert_eq!(
            horizon_age(&household(40, 65, 0.0), 4_000_000_000),
            65 + MAX_AGE
        );
    }

    #[test]
    fn no_freedom_age_never_withdraws() {
        let household = household(40, 65, 50_000.0);
        let set = build(&mixed_seeds(), &household);
        let trajectory = simulate(&set, &household, None, None, 95);

        assert_eq!(trajectory.first_age(), Some(40));
        assert_eq!(trajectory.last_age(), Some(95));
        assert!(trajectory.capital_depleted_year.is_none());
        for record in &trajectory.records {
            assert_eq!(record.phase, Phase::Working);
            assert_approx(record.withdrawals(), 0.0);
        }
    }

    #[test]
    fn unlock_happens_in_the_unlock_year() {
        let household = household(50, 65, 20_000.0);
        let set = build(&mixed_seeds(), &household);
        let trajectory = simulate(&set, &household, Some(60), None, 95);

        let at_57 = trajectory.record_at(57).expect("age 57");
        let at_58 = trajectory.record_at(58).expect("age 58");
        assert!(at_57.balance(BucketKind::Occupational) > 0.0);
        assert!(!at_57.unlocked(BucketKind::Occupational));
        assert_approx(at_58.balance(BucketKind::Occupational), 0.0);
        assert!(at_58.unlocked(BucketKind::Occupational));
        assert!(
            at_58.balance(BucketKind::Available)
                > at_57.balance(BucketKind::Available) + at_57.balance(BucketKind::Occupational)
        );
    }

    #[test]
    fn depletion_is_recorded_and_run_continues() {
        let household = household(50, 65, 10_000.0);
        let set = build(
            &[BucketSeed::new(BucketKind::Available, 250_000.0).with_return(0.02)],
            &household,
        );
        let trajectory = simulate(&set, &household, Some(50), None, 95);

        let depleted = trajectory.capital_depleted_year.expect("should deplete");
        assert!(depleted < 65);
        assert_eq!(trajectory.last_age(), Some(95));
        for record in trajectory.records.iter().filter(|r| r.age >= depleted) {
            assert_approx(record.balance(BucketKind::Available), 0.0);
        }
    }

    #[test]
    fn state_annuity_pays_for_payout_years_then_stops() {
        let household = household(60, 65, 1_000.0);
        let set = build(
            &[BucketSeed::new(BucketKind::State, 400_000.0).with_return(0.02)],
            &household,
        );
        let trajectory = simulate(&set, &household, Some(65), None, 95);

        let paying: Vec<u32> = trajectory
            .records
            .iter()
            .filter(|r| r.state_income > 0.0)
            .map(|r| r.age)
            .collect();
        assert_eq!(paying, (65..85).collect::<Vec<_>>());
        assert_approx(trajectory.state_annual_income(), 20_000.0);
        for record in trajectory.records.iter().filter(|r| r.age >= 65) {
            assert_approx(record.balance(BucketKind::State), 0.0);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_trajectory_invariants_hold(
            current_age in 25u32..60,
            pension_offset in 0u32..25,
            freedom_offset in proptest::option::of(0u32..40),
            coast_years in 0u32..8,
            available in 0u32..2_000_000,
            locked in 0u32..1_000_000,
            state in 0u32..1_500_000,
            contribution in 0u32..20_000,
            expenses in 0u32..60_000,
            return_bp in -300i32..1200,
        ) {
            let pension_age = current_age + pension_offset;
            let household = household(current_age, pension_age, expenses as f64);
            let nominal = return_bp as f64 / 10_000.0;
            let unlock_age = current_age + pension_offset / 2;
            let seeds = vec![
                BucketSeed::new(BucketKind::Available, available as f64)
                    .with_return(nominal)
                    .with_contribution(contribution as f64),
                BucketSeed::new(BucketKind::Occupational, locked as f64)
                    .with_return(nominal)
                    .with_contribution(contribution as f64 / 4.0)
                    .with_unlock_age(unlock_age),
                BucketSeed::new(BucketKind::Premium, locked as f64 / 2.0).with_return(nominal),
                BucketSeed::new(BucketKind::Private, locked as f64 / 3.0)
                    .with_return(nominal)
                    .with_unlock_age(unlock_age),
                BucketSeed::new(BucketKind::State, state as f64)
                    .with_return(nominal)
                    .with_contribution(contribution as f64 / 2.0),
            ];
            let set = build(&seeds, &household);
            let freedom_age = freedom_offset.map(|offset| current_age + offset);
            let coast = CoastConfig { enabled: coast_years > 0, years: coast_years };
            let horizon = horizon_age(&household, 30);

            let trajectory = simulate(&set, &household, freedom_age, Some(&coast), horizon);
            let again = simulate(&set, &household, freedom_age, Some(&coast), horizon);
            prop_assert_eq!(&trajectory, &again);

            prop_assert_eq!(trajectory.first_age(), Some(current_age));
            prop_assert_eq!(trajectory.last_age(), Some(horizon));
            for pair in trajectory.records.windows(2) {
                prop_assert_eq!(pair[0].age + 1, pair[1].age);
            }

            let window = freedom_age
                .and_then(|freedom| CoastWindow::new(freedom, Some(&coast), pension_age));
            for record in &trajectory.records {
                for (_, year) in record.buckets.iter() {
                    prop_assert!(year.balance >= 0.0);
                    prop_assert!(year.balance.is_finite());
                }
                prop_assert!(record.total + EPS >= record.capital);
                let coasting = window.is_some_and(|w| w.contains(record.age));
                if let Some(freedom) = freedom_age {
                    if record.age >= freedom && !coasting {
                        prop_assert_eq!(record.contributions(), 0.0);
                    }
                }
                if coasting {
                    prop_assert_eq!(record.withdrawals(), 0.0);
                }
            }

            for kind in [BucketKind::Occupational, BucketKind::Private, BucketKind::Premium] {
                let unlocks: Vec<u32> = trajectory
                    .records
                    .iter()
                    .filter(|r| r.unlocked(kind))
                    .map(|r| r.age)
                    .collect();
                prop_assert!(unlocks.len() <= 1);
                if let Some(first) = unlocks.first() {
                    for record in trajectory.records.iter().filter(|r| r.age >= *first) {
                        prop_assert_eq!(record.balance(kind), 0.0);
                    }
                }
            }
        }
    }
}
