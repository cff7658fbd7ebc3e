use serde::Serialize;

use super::types::{
    BucketKind, DegenerateReason, Holding, Liability, PerBucket, ProjectionWarning, non_negative,
};

pub const POST_FREEDOM_FLOOR_NOMINAL: f64 = 0.07;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReturnSource {
    Holdings,
    Supplied,
    Default,
    Substituted,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolvedReturn {
    pub nominal: f64,
    pub source: ReturnSource,
    pub degenerate: Option<DegenerateReason>,
}

impl ResolvedReturn {
    fn default_for(kind: BucketKind) -> Self {
        Self {
            nominal: kind.default_nominal_return(),
            source: ReturnSource::Default,
            degenerate: None,
        }
    }

    fn substituted(kind: BucketKind, reason: DegenerateReason) -> Self {
        Self {
            nominal: kind.default_nominal_return(),
            source: ReturnSource::Substituted,
            degenerate: Some(reason),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnEstimate {
    pub nominal: PerBucket<f64>,
    pub sources: PerBucket<ReturnSource>,
    pub warnings: Vec<ProjectionWarning>,
}

pub struct ReturnEstimator<'a> {
    holdings: &'a [Holding],
    liabilities: &'a [Liability],
}

impl<'a> ReturnEstimator<'a> {
    pub fn new(holdings: &'a [Holding], liabilities: &'a [Liability]) -> Self {
        Self {
            holdings,
            liabilities,
        }
    }

    pub fn resolve(&self, kind: BucketKind) -> ResolvedReturn {
        let mut seen = false;
        let mut net_total = 0.0;
        let mut weighted = 0.0;
        for holding in self.holdings.iter().filter(|h| h.kind == kind) {
            seen = true;
            let net = self.net_value(holding);
            net_total += net;
            weighted += net * holding.nominal_return;
        }

        if !seen {
            return ResolvedReturn::default_for(kind);
        }
        if !net_total.is_finite() {
            return ResolvedReturn::substituted(kind, DegenerateReason::NonFinite);
        }
        if net_total <= 0.0 {
            return ResolvedReturn::substituted(kind, DegenerateReason::NoNetValue);
        }

        let nominal = weighted / net_total;
        if !nominal.is_finite() {
            return ResolvedReturn::substituted(kind, DegenerateReason::NonFinite);
        }

        ResolvedReturn {
            nominal,
            source: ReturnSource::Holdings,
            degenerate: None,
        }
    }

    pub fn estimate(&self) -> ReturnEstimate {
        let resolved = PerBucket::from_fn(|kind| self.resolve(kind));
        let warnings = resolved
            .iter()
            .filter_map(|(kind, r)| {
                r.degenerate.map(|reason| {
                    tracing::warn!(
                        bucket = kind.label(),
                        ?reason,
                        "substituting default return"
                    );
                    ProjectionWarning::DegenerateReturn { kind, reason }
                })
            })
            .collect();

        ReturnEstimate {
            nominal: resolved.map(|_, r| r.nominal),
            sources: resolved.map(|_, r| r.source),
            warnings,
        }
    }

    fn net_value(&self, holding: &Holding) -> f64 {
        let secured: f64 = self
            .liabilities
            .iter()
            .filter(|l| l.holding_id == holding.id)
            .map(|l| non_negative(l.amount))
            .sum();
        let value = if holding.value.is_nan() {
            0.0
        } else {
            holding.value.max(0.0)
        };
        (value - secured).max(0.0)
    }
}

pub fn sanitize_nominal(kind: BucketKind, nominal: f64) -> ResolvedReturn {
    if nominal.is_finite() && nominal > -1.0 {
        ResolvedReturn {
            nominal,
            source: ReturnSource::Supplied,
            degenerate: None,
        }
    } else {
        ResolvedReturn::substituted(kind, DegenerateReason::NonFinite)
    }
}

pub fn to_real(nominal: f64, inflation: f64) -> f64 {
    let real = (1.0 + nominal) / (1.0 + inflation) - 1.0;
    if real.is_finite() { real } else { nominal }
}

pub fn to_nominal(real: f64, inflation: f64) -> f64 {
    let nominal = (1.0 + real) * (1.0 + inflation) - 1.0;
    if nominal.is_finite() { nominal } else { real }
}

pub fn post_freedom_floor(inflation: f64) -> f64 {
    to_real(POST_FREEDOM_FLOOR_NOMINAL, inflation)
}
