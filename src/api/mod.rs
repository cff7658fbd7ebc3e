use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    BucketKind, BucketSeed, CoastConfig, Holding, Household, IncomeProfile, InputError,
    Liability, ProjectionRequest, ProjectionResult, RunOptions, check_request, run_projection,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_age: Option<u32>,
    pension_age: Option<u32>,
    monthly_expenses: Option<f64>,
    monthly_savings: Option<f64>,
    inflation: Option<f64>,

    available_balance: Option<f64>,
    available_contribution: Option<f64>,
    available_return: Option<f64>,
    occupational_balance: Option<f64>,
    occupational_contribution: Option<f64>,
    occupational_return: Option<f64>,
    occupational_unlock_age: Option<u32>,
    premium_balance: Option<f64>,
    premium_contribution: Option<f64>,
    premium_return: Option<f64>,
    private_balance: Option<f64>,
    private_contribution: Option<f64>,
    private_return: Option<f64>,
    private_unlock_age: Option<u32>,
    state_balance: Option<f64>,
    state_contribution: Option<f64>,
    state_return: Option<f64>,

    monthly_income: Option<f64>,
    occupational_rate: Option<f64>,
    premium_rate: Option<f64>,
    state_rate: Option<f64>,
    salary_exchange: Option<f64>,

    state_payout_years: Option<u32>,
    freedom_age: Option<u32>,
    coast_years: Option<u32>,
    horizon_buffer_years: Option<u32>,
    max_validation_years: Option<u32>,

    buckets: Option<Vec<BucketSeed>>,
    holdings: Option<Vec<Holding>>,
    liabilities: Option<Vec<Liability>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct BucketOverrides {
    balance: Option<f64>,
    contribution: Option<f64>,
    nominal_return: Option<f64>,
    unlock_age: Option<u32>,
}

impl ProjectPayload {
    fn bucket_overrides(&self, kind: BucketKind) -> BucketOverrides {
        match kind {
            BucketKind::Available => BucketOverrides {
                balance: self.available_balance,
                contribution: self.available_contribution,
                nominal_return: self.available_return,
                unlock_age: None,
            },
            BucketKind::Occupational => BucketOverrides {
                balance: self.occupational_balance,
                contribution: self.occupational_contribution,
                nominal_return: self.occupational_return,
                unlock_age: self.occupational_unlock_age,
            },
            BucketKind::Premium => BucketOverrides {
                balance: self.premium_balance,
                contribution: self.premium_contribution,
                nominal_return: self.premium_return,
                unlock_age: None,
            },
            BucketKind::Private => BucketOverrides {
                balance: self.private_balance,
                contribution: self.private_contribution,
                nominal_return: self.private_return,
                unlock_age: self.private_unlock_age,
            },
            BucketKind::State => BucketOverrides {
                balance: self.state_balance,
                contribution: self.state_contribution,
                nominal_return: self.state_return,
                unlock_age: None,
            },
        }
    }

    fn touches_income(&self) -> bool {
        self.monthly_income.is_some()
            || self.occupational_rate.is_some()
            || self.premium_rate.is_some()
            || self.state_rate.is_some()
            || self.salary_exchange.is_some()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse<'a> {
    inputs: &'a ProjectionRequest,
    #[serde(flatten)]
    result: &'a ProjectionResult,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection API listening");
    info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload).await,
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload).await,
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, "rejected projection request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let result = run_projection(&request);
    json_response(
        StatusCode::OK,
        ProjectResponse {
            inputs: &request,
            result: &result,
        },
    )
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<ProjectionRequest, InputError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)?;
    request_from_payload(payload)
}

fn request_from_payload(payload: ProjectPayload) -> Result<ProjectionRequest, InputError> {
    let mut request = default_request_for_api();

    if let Some(v) = payload.current_age {
        request.household.current_age = v;
    }
    if let Some(v) = payload.pension_age {
        request.household.pension_age = v;
    }
    if let Some(v) = payload.monthly_expenses {
        request.household.monthly_expenses = v;
    }
    if let Some(v) = payload.monthly_savings {
        request.household.monthly_savings = v;
    }
    if let Some(v) = payload.inflation {
        request.household.inflation_rate = v / 100.0;
    }

    if payload.touches_income() {
        let mut profile = request.household.income.unwrap_or(IncomeProfile {
            monthly_income: 0.0,
            occupational_rate: 0.045,
            premium_rate: 0.025,
            state_rate: 0.16,
            salary_exchange: 0.0,
        });
        if let Some(v) = payload.monthly_income {
            profile.monthly_income = v;
        }
        if let Some(v) = payload.occupational_rate {
            profile.occupational_rate = v / 100.0;
        }
        if let Some(v) = payload.premium_rate {
            profile.premium_rate = v / 100.0;
        }
        if let Some(v) = payload.state_rate {
            profile.state_rate = v / 100.0;
        }
        if let Some(v) = payload.salary_exchange {
            profile.salary_exchange = v;
        }
        request.household.income = Some(profile);
    }

    if let Some(buckets) = payload.buckets.clone() {
        request.buckets = buckets;
    }
    for kind in BucketKind::ALL {
        let overrides = payload.bucket_overrides(kind);
        if overrides.balance.is_none()
            && overrides.contribution.is_none()
            && overrides.nominal_return.is_none()
            && overrides.unlock_age.is_none()
        {
            continue;
        }
        let seed = seed_mut(&mut request.buckets, kind);
        if let Some(v) = overrides.balance {
            seed.balance = v;
        }
        if let Some(v) = overrides.contribution {
            seed.monthly_contribution = v;
        }
        if let Some(v) = overrides.nominal_return {
            seed.nominal_return = Some(v / 100.0);
        }
        if let Some(v) = overrides.unlock_age {
            seed.unlock_age = Some(v);
        }
    }

    if let Some(holdings) = payload.holdings {
        request.holdings = holdings;
    }
    if let Some(liabilities) = payload.liabilities {
        request.liabilities = liabilities;
    }

    if let Some(v) = payload.state_payout_years {
        request.options.state_payout_years = v;
    }
    if let Some(v) = payload.freedom_age {
        request.options.freedom_age_override = Some(v);
    }
    if let Some(years) = payload.coast_years {
        request.options.coast = Some(CoastConfig {
            enabled: years > 0,
            years,
        });
    }
    if let Some(v) = payload.horizon_buffer_years {
        request.options.horizon_buffer_years = v;
    }
    if let Some(v) = payload.max_validation_years {
        request.options.max_validation_years = v;
    }

    check_request(&request)?;
    Ok(request)
}

fn seed_mut(buckets: &mut Vec<BucketSeed>, kind: BucketKind) -> &mut BucketSeed {
    match buckets.iter().position(|seed| seed.kind == kind) {
        Some(index) => &mut buckets[index],
        None => {
            buckets.push(BucketSeed::new(kind, 0.0));
            let last = buckets.len() - 1;
            &mut buckets[last]
        }
    }
}

pub fn default_request_for_api() -> ProjectionRequest {
    ProjectionRequest {
        household: Household {
            current_age: 35,
            pension_age: 65,
            monthly_expenses: 20_000.0,
            monthly_savings: 10_000.0,
            inflation_rate: 0.02,
            income: None,
        },
        buckets: vec![
            BucketSeed::new(BucketKind::Available, 300_000.0).with_contribution(10_000.0),
            BucketSeed::new(BucketKind::Occupational, 150_000.0)
                .with_contribution(2_000.0)
                .with_unlock_age(55),
            BucketSeed::new(BucketKind::Premium, 50_000.0).with_contribution(500.0),
            BucketSeed::new(BucketKind::Private, 0.0),
            BucketSeed::new(BucketKind::State, 200_000.0).with_contribution(1_500.0),
        ],
        holdings: Vec::new(),
        liabilities: Vec::new(),
        options: RunOptions::default(),
    }
}
