use tracing::{debug, warn};

use super::buckets::BucketSet;
use super::simulator::simulate;
use super::solver::required_capital;
use super::types::{CoastConfig, Household, Trajectory, ValidationAttempt};

#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    pub age: Option<u32>,
    pub safe: bool,
    pub extra_years: u32,
    pub attempts: Vec<ValidationAttempt>,
}

impl Validation {
    fn unreachable() -> Self {
        Self {
            age: None,
            safe: false,
            extra_years: 0,
            attempts: Vec::new(),
        }
    }
}

pub fn validate(
    solved_age: Option<u32>,
    buckets: &BucketSet,
    household: &Household,
    coast: Option<&CoastConfig>,
    horizon_age: u32,
    max_extra_years: u32,
) -> Validation {
    let Some(solved) = solved_age else {
        return Validation::unreachable();
    };

    let max_extra_years = max_extra_years.min(horizon_age.saturating_sub(solved));
    let mut attempts = Vec::new();
    for extra in 0..=max_extra_years {
        let age = solved.saturating_add(extra);
        let trajectory = simulate(buckets, household, Some(age), coast, horizon_age);
        let attempt = assess(&trajectory, age, household, buckets.pension_age());
        debug!(
            age,
            depleted_year = ?attempt.depleted_year,
            capital_at_pension = attempt.capital_at_pension,
            required = attempt.required_capital,
            safe = attempt.safe,
            "validating freedom age"
        );
        let safe = attempt.safe;
        attempts.push(attempt);
        if safe {
            return Validation {
                age: Some(age),
                safe: true,
                extra_years: extra,
                attempts,
            };
        }
    }

    warn!(
        age = solved,
        extra_years = max_extra_years,
        "no safe freedom age found, keeping solver result"
    );
    Validation {
        age: Some(solved),
        safe: false,
        extra_years: max_extra_years,
        attempts,
    }
}

fn assess(
    trajectory: &Trajectory,
    age: u32,
    household: &Household,
    pension_age: u32,
) -> ValidationAttempt {
    let depleted_year = trajectory
        .capital_depleted_year
        .filter(|year| *year < pension_age);
    let capital_at_pension = trajectory
        .record_at(pension_age)
        .or(trajectory.records.first())
        .map(|record| record.capital)
        .unwrap_or(0.0);
    let required_capital =
        required_capital(household.annual_expenses(), trajectory.state_annual_income());

    ValidationAttempt {
        age,
        depleted_year,
        capital_at_pension,
        required_capital,
        safe: depleted_year.is_none() && capital_at_pension >= required_capital,
    }
}
