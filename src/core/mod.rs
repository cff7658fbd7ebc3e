pub mod buckets;
pub mod coast;
mod engine;
mod error;
pub mod returns;
pub mod simulator;
pub mod solver;
pub mod stepper;
mod types;
pub mod validator;

pub use engine::run_projection;
pub use error::{InputError, MAX_AGE, check_request};
pub use types::{
    BucketEvent, BucketKind, BucketSeed, BucketYear, CoastConfig, DEFAULT_HORIZON_BUFFER_YEARS,
    DEFAULT_MAX_VALIDATION_YEARS, DEFAULT_PRIVATE_UNLOCK_AGE, DEFAULT_STATE_PAYOUT_YEARS,
    DegenerateReason, Holding, Household, IncomeProfile, Liability, MAX_STATE_PAYOUT_YEARS,
    PRIVATE_MIN_UNLOCK_AGE, PerBucket, Phase, ProjectionRequest, ProjectionResult,
    ProjectionWarning, RunOptions, SolveCandidate, SolveReport, Trajectory, ValidationAttempt,
    YearRecord, non_negative,
};
