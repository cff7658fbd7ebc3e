use super::returns::{post_freedom_floor, sanitize_nominal, to_nominal, to_real};
use super::types::{
    BucketEvent, BucketKind, BucketSeed, DEFAULT_PRIVATE_UNLOCK_AGE, Household,
    MAX_STATE_PAYOUT_YEARS, PRIVATE_MIN_UNLOCK_AGE, PerBucket, ProjectionWarning, non_negative,
};

#[derive(Clone, Debug, PartialEq)]
pub enum BucketState {
    Accumulating,
    Merged { age: u32 },
    Annuitizing {
        annual_income: f64,
        payouts_remaining: u32,
    },
    Exhausted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    pub kind: BucketKind,
    pub balance: f64,
    pub nominal_return: f64,
    pub real_return: f64,
    pub monthly_contribution: f64,
    pub unlock_age: Option<u32>,
    pub state: BucketState,
}

impl Bucket {
    pub fn is_accumulating(&self) -> bool {
        self.state == BucketState::Accumulating
    }

    pub fn is_locked(&self, age: u32) -> bool {
        match self.kind {
            BucketKind::Available => false,
            BucketKind::State => self.is_accumulating(),
            _ => self.is_accumulating() && self.unlock_age.is_none_or(|unlock| age < unlock),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BucketSet {
    buckets: PerBucket<Bucket>,
    pension_age: u32,
    payout_years: u32,
    inflation: f64,
    floor_real_return: f64,
}

impl BucketSet {
    pub fn from_seeds(
        seeds: &[BucketSeed],
        household: &Household,
        nominal_defaults: &PerBucket<f64>,
        payout_years: u32,
    ) -> (Self, Vec<ProjectionWarning>) {
        let mut warnings = Vec::new();
        let inflation = household.inflation_rate;
        let pension_age = household.pension_age;

        let buckets = PerBucket::from_fn(|kind| {
            let mut balance = 0.0;
            let mut monthly_contribution = 0.0;
            let mut weighted_return = 0.0;
            let mut requested_unlock = None;
            let mut seeded_return = false;

            for seed in seeds.iter().filter(|s| s.kind == kind) {
                let seed_balance = non_negative(seed.balance);
                let nominal = match seed.nominal_return {
                    Some(value) => {
                        let resolved = sanitize_nominal(kind, value);
                        if let Some(reason) = resolved.degenerate {
                            warnings.push(ProjectionWarning::DegenerateReturn { kind, reason });
                        }
                        seeded_return = true;
                        resolved.nominal
                    }
                    None => nominal_defaults[kind],
                };
                balance += seed_balance;
                weighted_return += seed_balance * nominal;
                monthly_contribution += non_negative(seed.monthly_contribution);
                if seed.unlock_age.is_some() {
                    requested_unlock = seed.unlock_age;
                }
            }

            let nominal_return = if seeded_return && balance > 0.0 {
                weighted_return / balance
            } else {
                seeds
                    .iter()
                    .filter(|s| s.kind == kind)
                    .find_map(|s| s.nominal_return)
                    .map(|value| sanitize_nominal(kind, value).nominal)
                    .unwrap_or(nominal_defaults[kind])
            };

            Bucket {
                kind,
                balance,
                nominal_return,
                real_return: to_real(nominal_return, inflation),
                monthly_contribution,
                unlock_age: resolve_unlock_age(kind, requested_unlock, pension_age, &mut warnings),
                state: BucketState::Accumulating,
            }
        });

        let set = Self {
            buckets,
            pension_age,
            payout_years: payout_years.clamp(1, MAX_STATE_PAYOUT_YEARS),
            inflation,
            floor_real_return: post_freedom_floor(inflation),
        };
        (set, warnings)
    }

    pub fn get(&self, kind: BucketKind) -> &Bucket {
        &self.buckets[kind]
    }

    pub fn get_mut(&mut self, kind: BucketKind) -> &mut Bucket {
        &mut self.buckets[kind]
    }

    pub fn pension_age(&self) -> u32 {
        self.pension_age
    }

    pub fn payout_years(&self) -> u32 {
        self.payout_years
    }

    pub fn balances(&self) -> PerBucket<f64> {
        self.buckets.map(|_, bucket| bucket.balance)
    }

    pub fn capital(&self) -> f64 {
        self.balances().sum()
    }

    pub fn capital_excluding_state(&self) -> f64 {
        self.capital() - self.buckets.state.balance
    }

    pub fn state_annual_income(&self) -> f64 {
        let state = &self.buckets.state;
        match state.state {
            BucketState::Accumulating => state.balance / self.payout_years as f64,
            BucketState::Annuitizing { annual_income, .. } => annual_income,
            BucketState::Merged { .. } | BucketState::Exhausted => 0.0,
        }
    }

    pub fn apply_transitions(&mut self, age: u32, merge_unlocked: bool) -> Vec<BucketEvent> {
        let mut events = Vec::new();

        if merge_unlocked {
            let due: Vec<BucketKind> = BucketKind::ALL
                .into_iter()
                .filter(|kind| kind.merges_into_available())
                .filter(|kind| {
                    let bucket = &self.buckets[*kind];
                    bucket.is_accumulating() && !bucket.is_locked(age)
                })
                .collect();
            if !due.is_empty() {
                events.extend(self.merge_into_available(&due, age));
            }
        }

        if age >= self.pension_age && self.buckets.state.is_accumulating() {
            events.extend(self.annuitize_state());
        }

        events
    }

    /// Moves the full balance of each bucket in `kinds` into `Available` and re-blends
    /// the pool's return by balance, lifting each incoming return to the floor first.
    pub fn merge_into_available(&mut self, kinds: &[BucketKind], age: u32) -> Vec<BucketEvent> {
        let available = &self.buckets.available;
        let mut total = available.balance;
        let mut weighted = available.balance * available.real_return;
        for kind in kinds {
            let bucket = &self.buckets[*kind];
            total += bucket.balance;
            weighted += bucket.balance * bucket.real_return.max(self.floor_real_return);
        }
        let blended = if total > 0.0 && weighted.is_finite() {
            weighted / total
        } else {
            available.real_return
        };

        let mut events = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let bucket = &mut self.buckets[*kind];
            let amount = bucket.balance;
            bucket.balance = 0.0;
            bucket.state = BucketState::Merged { age };
            self.buckets.available.balance += amount;
            if amount > 0.0 {
                events.push(BucketEvent::Unlocked {
                    kind: *kind,
                    amount,
                    blended_return: blended,
                });
            }
        }

        let available = &mut self.buckets.available;
        available.real_return = blended;
        available.nominal_return = to_nominal(blended, self.inflation);
        events
    }

    fn annuitize_state(&mut self) -> Option<BucketEvent> {
        let payout_years = self.payout_years;
        let state = &mut self.buckets.state;
        let capital = state.balance;
        let annual_income = capital / payout_years as f64;
        state.balance = 0.0;
        state.state = BucketState::Annuitizing {
            annual_income,
            payouts_remaining: payout_years,
        };
        (capital > 0.0).then_some(BucketEvent::Annuitized {
            capital,
            annual_income,
            payout_years,
        })
    }

    pub fn pay_state_income(&mut self) -> f64 {
        let state = &mut self.buckets.state;
        let BucketState::Annuitizing {
            annual_income,
            payouts_remaining,
        } = state.state
        else {
            return 0.0;
        };

        let remaining = payouts_remaining.saturating_sub(1);
        state.state = if remaining == 0 {
            BucketState::Exhausted
        } else {
            BucketState::Annuitizing {
                annual_income,
                payouts_remaining: remaining,
            }
        };
        annual_income
    }

    pub fn state_annuity_value(&self) -> f64 {
        let state = &self.buckets.state;
        match state.state {
            BucketState::Annuitizing {
                annual_income,
                payouts_remaining,
            } => annual_income * annuity_factor(payouts_remaining, state.real_return),
            _ => 0.0,
        }
    }
}

fn resolve_unlock_age(
    kind: BucketKind,
    requested: Option<u32>,
    pension_age: u32,
    warnings: &mut Vec<ProjectionWarning>,
) -> Option<u32> {
    match kind {
        BucketKind::Available | BucketKind::State => {
            if let Some(requested) = requested {
                warnings.push(ProjectionWarning::UnlockAgeIgnored { kind, requested });
            }
            None
        }
        BucketKind::Premium => {
            if let Some(requested) = requested.filter(|age| *age != pension_age) {
                warnings.push(ProjectionWarning::UnlockAgeIgnored { kind, requested });
            }
            Some(pension_age)
        }
        BucketKind::Occupational | BucketKind::Private => {
            let default_age = if kind == BucketKind::Private {
                DEFAULT_PRIVATE_UNLOCK_AGE
            } else {
                pension_age
            };
            let wanted = requested.unwrap_or(default_age);
            let mut applied = wanted;
            if kind == BucketKind::Private {
                applied = applied.max(PRIVATE_MIN_UNLOCK_AGE);
            }
            applied = applied.min(pension_age);
            if let Some(requested) = requested.filter(|age| *age != applied) {
                warnings.push(ProjectionWarning::UnlockAgeClamped {
                    kind,
                    requested,
                    applied,
                });
            }
            Some(applied)
        }
    }
}

pub fn annuity_factor(years: u32, rate: f64) -> f64 {
    let rate = rate.max(-0.99);
    if rate.abs() < 1e-12 {
        years as f64
    } else {
        (1.0 - (1.0 + rate).powf(-(years as f64))) / rate
    }
}
