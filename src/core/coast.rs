use super::buckets::BucketSet;
use super::types::{BucketKind, CoastConfig, Household, PerBucket, Phase, non_negative};

#[derive(Clone, Debug, PartialEq)]
pub struct ContributionSchedule {
    pub working: PerBucket<f64>,
    pub coast: PerBucket<f64>,
}

impl ContributionSchedule {
    pub fn new(buckets: &BucketSet, household: &Household) -> Self {
        let base = base_income(household);
        let salary_exchange = household
            .income
            .map(|profile| non_negative(profile.salary_exchange))
            .unwrap_or(0.0);

        let working = map_income(buckets, household, base, salary_exchange);
        let coast_income = coast_income(base, non_negative(household.monthly_savings));
        let coast = map_income(buckets, household, coast_income, 0.0).map(|kind, amount| {
            if kind.is_savings_funded() { 0.0 } else { *amount }
        });

        Self { working, coast }
    }

    pub fn monthly(&self, phase: Phase) -> PerBucket<f64> {
        match phase {
            Phase::Working => self.working,
            Phase::Coast => self.coast,
            Phase::Retired => PerBucket::default(),
        }
    }
}

pub fn base_income(household: &Household) -> f64 {
    match household.income {
        Some(profile) => non_negative(profile.monthly_income),
        None => non_negative(household.monthly_expenses) + non_negative(household.monthly_savings),
    }
}

pub fn coast_income(base_income: f64, monthly_savings: f64) -> f64 {
    let denominator = base_income + monthly_savings;
    if denominator <= 0.0 {
        return base_income;
    }
    base_income * (1.0 - monthly_savings / denominator)
}

pub fn map_income(
    buckets: &BucketSet,
    household: &Household,
    monthly_income: f64,
    salary_exchange: f64,
) -> PerBucket<f64> {
    let seeded = |kind: BucketKind| buckets.get(kind).monthly_contribution;

    match household.income {
        Some(profile) => {
            let qualifying = (monthly_income - salary_exchange).max(0.0);
            PerBucket {
                available: seeded(BucketKind::Available),
                occupational: qualifying * non_negative(profile.occupational_rate)
                    + salary_exchange,
                premium: qualifying * non_negative(profile.premium_rate),
                private: seeded(BucketKind::Private),
                state: qualifying * non_negative(profile.state_rate),
            }
        }
        None => {
            let base = base_income(household);
            let scale = if base > 0.0 { monthly_income / base } else { 0.0 };
            PerBucket::from_fn(|kind| {
                if kind.is_savings_funded() {
                    seeded(kind)
                } else {
                    seeded(kind) * scale
                }
            })
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CoastWindow {
    pub start: u32,
    pub end: u32,
}

impl CoastWindow {
    pub fn new(freedom_age: u32, config: Option<&CoastConfig>, pension_age: u32) -> Option<Self> {
        let config = config.filter(|c| c.enabled && c.years > 0)?;
        let end = freedom_age.saturating_add(config.years).min(pension_age);
        (end > freedom_age).then_some(Self {
            start: freedom_age,
            end,
        })
    }

    pub fn contains(&self, age: u32) -> bool {
        (self.start..self.end).contains(&age)
    }
}
