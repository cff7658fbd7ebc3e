use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub const PRIVATE_MIN_UNLOCK_AGE: u32 = 55;
pub const DEFAULT_PRIVATE_UNLOCK_AGE: u32 = 55;
pub const DEFAULT_STATE_PAYOUT_YEARS: u32 = 20;
pub const MAX_STATE_PAYOUT_YEARS: u32 = 100;
pub const DEFAULT_HORIZON_BUFFER_YEARS: u32 = 30;
pub const DEFAULT_MAX_VALIDATION_YEARS: u32 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketKind {
    Available,
    Occupational,
    Premium,
    Private,
    State,
}

impl BucketKind {
    pub const ALL: [BucketKind; 5] = [
        BucketKind::Available,
        BucketKind::Occupational,
        BucketKind::Premium,
        BucketKind::Private,
        BucketKind::State,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BucketKind::Available => "available",
            BucketKind::Occupational => "occupational",
            BucketKind::Premium => "premium",
            BucketKind::Private => "private",
            BucketKind::State => "state",
        }
    }

    pub fn default_nominal_return(self) -> f64 {
        match self {
            BucketKind::Available => 0.07,
            BucketKind::Occupational => 0.05,
            BucketKind::Premium => 0.07,
            BucketKind::Private => 0.06,
            BucketKind::State => 0.03,
        }
    }

    pub fn has_early_unlock(self) -> bool {
        matches!(self, BucketKind::Occupational | BucketKind::Private)
    }

    pub fn is_savings_funded(self) -> bool {
        matches!(self, BucketKind::Available | BucketKind::Private)
    }

    pub fn merges_into_available(self) -> bool {
        matches!(
            self,
            BucketKind::Occupational | BucketKind::Premium | BucketKind::Private
        )
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerBucket<T> {
    pub available: T,
    pub occupational: T,
    pub premium: T,
    pub private: T,
    pub state: T,
}

impl<T> PerBucket<T> {
    pub fn from_fn(mut f: impl FnMut(BucketKind) -> T) -> Self {
        Self {
            available: f(BucketKind::Available),
            occupational: f(BucketKind::Occupational),
            premium: f(BucketKind::Premium),
            private: f(BucketKind::Private),
            state: f(BucketKind::State),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(BucketKind, &T) -> U) -> PerBucket<U> {
        PerBucket::from_fn(|kind| f(kind, &self[kind]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BucketKind, &T)> {
        BucketKind::ALL.into_iter().map(move |kind| (kind, &self[kind]))
    }
}

impl PerBucket<f64> {
    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, value)| *value).sum()
    }
}

impl<T> Index<BucketKind> for PerBucket<T> {
    type Output = T;

    fn index(&self, kind: BucketKind) -> &T {
        match kind {
            BucketKind::Available => &self.available,
            BucketKind::Occupational => &self.occupational,
            BucketKind::Premium => &self.premium,
            BucketKind::Private => &self.private,
            BucketKind::State => &self.state,
        }
    }
}

impl<T> IndexMut<BucketKind> for PerBucket<T> {
    fn index_mut(&mut self, kind: BucketKind) -> &mut T {
        match kind {
            BucketKind::Available => &mut self.available,
            BucketKind::Occupational => &mut self.occupational,
            BucketKind::Premium => &mut self.premium,
            BucketKind::Private => &mut self.private,
            BucketKind::State => &mut self.state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSeed {
    pub kind: BucketKind,
    pub balance: f64,
    #[serde(default)]
    pub nominal_return: Option<f64>,
    #[serde(default)]
    pub monthly_contribution: f64,
    #[serde(default)]
    pub unlock_age: Option<u32>,
}

impl BucketSeed {
    pub fn new(kind: BucketKind, balance: f64) -> Self {
        Self {
            kind,
            balance,
            nominal_return: None,
            monthly_contribution: 0.0,
            unlock_age: None,
        }
    }

    pub fn with_return(mut self, nominal_return: f64) -> Self {
        self.nominal_return = Some(nominal_return);
        self
    }

    pub fn with_contribution(mut self, monthly_contribution: f64) -> Self {
        self.monthly_contribution = monthly_contribution;
        self
    }

    pub fn with_unlock_age(mut self, unlock_age: u32) -> Self {
        self.unlock_age = Some(unlock_age);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeProfile {
    pub monthly_income: f64,
    pub occupational_rate: f64,
    pub premium_rate: f64,
    pub state_rate: f64,
    #[serde(default)]
    pub salary_exchange: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub current_age: u32,
    pub pension_age: u32,
    pub monthly_expenses: f64,
    pub monthly_savings: f64,
    pub inflation_rate: f64,
    #[serde(default)]
    pub income: Option<IncomeProfile>,
}

impl Household {
    pub fn annual_expenses(&self) -> f64 {
        non_negative(self.monthly_expenses) * 12.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: String,
    pub kind: BucketKind,
    pub value: f64,
    pub nominal_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liability {
    pub holding_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoastConfig {
    pub enabled: bool,
    pub years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
    pub state_payout_years: u32,
    pub freedom_age_override: Option<u32>,
    pub coast: Option<CoastConfig>,
    pub horizon_buffer_years: u32,
    pub max_validation_years: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            state_payout_years: DEFAULT_STATE_PAYOUT_YEARS,
            freedom_age_override: None,
            coast: None,
            horizon_buffer_years: DEFAULT_HORIZON_BUFFER_YEARS,
            max_validation_years: DEFAULT_MAX_VALIDATION_YEARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRequest {
    pub household: Household,
    pub buckets: Vec<BucketSeed>,
    #[serde(default)]
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub liabilities: Vec<Liability>,
    #[serde(default)]
    pub options: RunOptions,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Working,
    Coast,
    Retired,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketYear {
    pub balance: f64,
    pub contribution: f64,
    pub growth: f64,
    pub withdrawal: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BucketEvent {
    Unlocked {
        kind: BucketKind,
        amount: f64,
        blended_return: f64,
    },
    Annuitized {
        capital: f64,
        annual_income: f64,
        payout_years: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub age: u32,
    pub phase: Phase,
    pub buckets: PerBucket<BucketYear>,
    pub state_income: f64,
    pub shortfall: f64,
    pub capital: f64,
    pub total: f64,
    pub events: Vec<BucketEvent>,
}

impl YearRecord {
    pub fn balance(&self, kind: BucketKind) -> f64 {
        self.buckets[kind].balance
    }

    pub fn contributions(&self) -> f64 {
        self.buckets.iter().map(|(_, year)| year.contribution).sum()
    }

    pub fn withdrawals(&self) -> f64 {
        self.buckets.iter().map(|(_, year)| year.withdrawal).sum()
    }

    pub fn unlocked(&self, kind: BucketKind) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, BucketEvent::Unlocked { kind: k, .. } if *k == kind))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    pub records: Vec<YearRecord>,
    pub capital_depleted_year: Option<u32>,
}

impl Trajectory {
    pub fn record_at(&self, age: u32) -> Option<&YearRecord> {
        let first = self.records.first()?.age;
        let index = age.checked_sub(first)? as usize;
        self.records.get(index)
    }

    pub fn first_age(&self) -> Option<u32> {
        self.records.first().map(|record| record.age)
    }

    pub fn last_age(&self) -> Option<u32> {
        self.records.last().map(|record| record.age)
    }

    pub fn state_annual_income(&self) -> f64 {
        self.records
            .iter()
            .flat_map(|record| record.events.iter())
            .find_map(|event| match event {
                BucketEvent::Annuitized { annual_income, .. } => Some(*annual_income),
                BucketEvent::Unlocked { .. } => None,
            })
            .unwrap_or(0.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DegenerateReason {
    NoNetValue,
    NonFinite,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProjectionWarning {
    DegenerateReturn {
        kind: BucketKind,
        reason: DegenerateReason,
    },
    UnlockAgeClamped {
        kind: BucketKind,
        requested: u32,
        applied: u32,
    },
    UnlockAgeIgnored {
        kind: BucketKind,
        requested: u32,
    },
    UnsafeFreedomAge {
        age: u32,
        extra_years_tried: u32,
    },
    CapitalDepleted {
        age: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveCandidate {
    pub age: u32,
    pub bridge_ok: bool,
    pub capital_at_pension: f64,
    pub required_capital: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveReport {
    pub freedom_age: Option<u32>,
    pub candidates: Vec<SolveCandidate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationAttempt {
    pub age: u32,
    pub depleted_year: Option<u32>,
    pub capital_at_pension: f64,
    pub required_capital: f64,
    pub safe: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub freedom_age: Option<u32>,
    pub simulated_freedom_age: Option<u32>,
    pub freedom_age_safe: bool,
    pub horizon_age: u32,
    pub trajectory: Vec<YearRecord>,
    pub required_capital_at_pension: f64,
    pub capital_depleted_year: Option<u32>,
    pub solve: SolveReport,
    pub validation: Vec<ValidationAttempt>,
    pub warnings: Vec<ProjectionWarning>,
}

pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
