use tracing::{debug, warn};

use super::buckets::BucketSet;
use super::returns::ReturnEstimator;
use super::simulator::{horizon_age, simulate};
use super::solver::{required_capital, solve};
use super::types::{BucketKind, ProjectionRequest, ProjectionResult, ProjectionWarning};
use super::validator::validate;

pub fn run_projection(request: &ProjectionRequest) -> ProjectionResult {
    let household = &request.household;
    let options = &request.options;

    let estimate = ReturnEstimator::new(&request.holdings, &request.liabilities).estimate();
    let mut warnings: Vec<ProjectionWarning> = estimate
        .warnings
        .into_iter()
        .filter(|warning| match warning {
            ProjectionWarning::DegenerateReturn { kind, .. } => uses_estimate(request, *kind),
            _ => true,
        })
        .collect();
    let (buckets, seed_warnings) = BucketSet::from_seeds(
        &request.buckets,
        household,
        &estimate.nominal,
        options.state_payout_years,
    );
    warnings.extend(seed_warnings);

    let horizon_age = horizon_age(household, options.horizon_buffer_years);
    let coast = options.coast.as_ref();

    let report = solve(
        &buckets,
        household,
        horizon_age.saturating_sub(household.current_age),
    );
    let validation = validate(
        report.freedom_age,
        &buckets,
        household,
        coast,
        horizon_age,
        options.max_validation_years,
    );
    if let (Some(age), false) = (validation.age, validation.safe) {
        warnings.push(ProjectionWarning::UnsafeFreedomAge {
            age,
            extra_years_tried: validation.extra_years,
        });
    }

    let simulated_freedom_age = options.freedom_age_override.or(validation.age);
    let trajectory = simulate(
        &buckets,
        household,
        simulated_freedom_age,
        coast,
        horizon_age,
    );
    if let Some(age) = trajectory.capital_depleted_year {
        warn!(age, "capital depleted");
        warnings.push(ProjectionWarning::CapitalDepleted { age });
    }

    debug!(
        solved = ?report.freedom_age,
        validated = ?validation.age,
        simulated = ?simulated_freedom_age,
        horizon_age,
        "projection complete"
    );

    ProjectionResult {
        freedom_age: validation.age,
        simulated_freedom_age,
        freedom_age_safe: validation.safe,
        horizon_age,
        required_capital_at_pension: required_capital(
            household.annual_expenses(),
            trajectory.state_annual_income(),
        ),
        capital_depleted_year: trajectory.capital_depleted_year,
        trajectory: trajectory.records,
        solve: report,
        validation: validation.attempts,
        warnings,
    }
}

// Seeds that carry their own return never read the estimate for their kind.
fn uses_estimate(request: &ProjectionRequest, kind: BucketKind) -> bool {
    let mut seeds = request.buckets.iter().filter(|seed| seed.kind == kind).peekable();
    seeds.peek().is_none() || seeds.any(|seed| seed.nominal_return.is_none())
}
