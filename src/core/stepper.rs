use super::buckets::{BucketSet, BucketState};
use super::coast::ContributionSchedule;
use super::types::{BucketKind, BucketYear, Household, PerBucket, Phase, YearRecord};

pub const SHORTFALL_EPS: f64 = 1e-6;

/// Advances a bucket set by one year.
///
/// Order within a tick: contributions, growth on the pre-tick balance, unlock/merge and
/// annuitization transitions, then state income and the withdrawal from `Available`.
pub struct YearStepper<'a> {
    schedule: &'a ContributionSchedule,
    annual_expenses: f64,
    merge_unlocked: bool,
}

impl<'a> YearStepper<'a> {
    pub fn new(schedule: &'a ContributionSchedule, household: &Household) -> Self {
        Self {
            schedule,
            annual_expenses: household.annual_expenses(),
            merge_unlocked: true,
        }
    }

    pub fn without_merges(mut self) -> Self {
        self.merge_unlocked = false;
        self
    }

    pub fn step(&self, set: &mut BucketSet, age: u32, phase: Phase) -> YearRecord {
        let monthly = self.schedule.monthly(phase);
        let pre_tick = set.balances();
        let mut flows = PerBucket::<BucketYear>::default();

        let mut redirected = 0.0;
        for kind in BucketKind::ALL {
            let bucket = set.get_mut(kind);
            let contribution = monthly[kind].max(0.0) * 12.0;
            match bucket.state {
                BucketState::Accumulating => {}
                // Money still paid into a merged pot lands in the liquid pool.
                BucketState::Merged { .. } => {
                    redirected += contribution;
                    continue;
                }
                _ => continue,
            }
            let growth = pre_tick[kind] * bucket.real_return;
            bucket.balance = (bucket.balance + contribution + growth).max(0.0);
            flows[kind].contribution = contribution;
            flows[kind].growth = growth;
        }
        if redirected > 0.0 {
            set.get_mut(BucketKind::Available).balance += redirected;
            flows.available.contribution += redirected;
        }

        let events = set.apply_transitions(age, self.merge_unlocked);
        let state_income = set.pay_state_income();

        let mut shortfall = 0.0;
        if phase == Phase::Retired {
            let need = (self.annual_expenses - state_income).max(0.0);
            let available = set.get_mut(BucketKind::Available);
            let paid = need.min(available.balance);
            available.balance -= paid;
            flows.available.withdrawal = paid;
            shortfall = need - paid;
        }

        for kind in BucketKind::ALL {
            flows[kind].balance = set.get(kind).balance;
        }

        let capital = set.capital();
        YearRecord {
            age,
            phase,
            buckets: flows,
            state_income,
            shortfall,
            capital,
            total: capital + set.state_annuity_value(),
            events,
        }
    }
}

pub fn is_depleted(record: &YearRecord) -> bool {
    record.shortfall > SHORTFALL_EPS
}
