use super::types::{MAX_STATE_PAYOUT_YEARS, ProjectionRequest};

pub const MAX_AGE: u32 = 120;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{field} must be a finite number")]
    NonFinite { field: String },

    #[error("{field} must be >= 0")]
    Negative { field: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field} must be <= {max}, got {value}", max = MAX_AGE)]
    AgeTooHigh { field: String, value: u32 },

    #[error("{field} must be <= {max}, got {value}")]
    TooManyYears {
        field: &'static str,
        max: u32,
        value: u32,
    },

    #[error("pensionAge must be >= currentAge ({current_age}), got {pension_age}")]
    PensionBeforeCurrentAge { current_age: u32, pension_age: u32 },

    #[error("statePayoutYears must be >= 1")]
    ZeroPayoutYears,

    #[error("liability references unknown holding {0:?}")]
    UnknownHolding(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn check_request(request: &ProjectionRequest) -> Result<(), InputError> {
    let household = &request.household;
    check_age("currentAge", household.current_age)?;
    check_age("pensionAge", household.pension_age)?;
    if household.pension_age < household.current_age {
        return Err(InputError::PensionBeforeCurrentAge {
            current_age: household.current_age,
            pension_age: household.pension_age,
        });
    }
    check_money("monthlyExpenses", household.monthly_expenses)?;
    check_money("monthlySavings", household.monthly_savings)?;
    check_range("inflationRate", household.inflation_rate, -0.5, 1.0)?;

    if let Some(income) = &household.income {
        check_money("income.monthlyIncome", income.monthly_income)?;
        check_money("income.salaryExchange", income.salary_exchange)?;
        check_range("income.occupationalRate", income.occupational_rate, 0.0, 1.0)?;
        check_range("income.premiumRate", income.premium_rate, 0.0, 1.0)?;
        check_range("income.stateRate", income.state_rate, 0.0, 1.0)?;
    }

    for (index, seed) in request.buckets.iter().enumerate() {
        let field = |name: &str| format!("buckets[{index}].{name}");
        check_money(&field("balance"), seed.balance)?;
        check_money(&field("monthlyContribution"), seed.monthly_contribution)?;
        if let Some(nominal) = seed.nominal_return {
            check_return(&field("nominalReturn"), nominal)?;
        }
        if let Some(unlock_age) = seed.unlock_age {
            check_age(&field("unlockAge"), unlock_age)?;
        }
    }

    for (index, holding) in request.holdings.iter().enumerate() {
        check_finite(&format!("holdings[{index}].value"), holding.value)?;
        check_return(
            &format!("holdings[{index}].nominalReturn"),
            holding.nominal_return,
        )?;
    }

    for (index, liability) in request.liabilities.iter().enumerate() {
        check_money(&format!("liabilities[{index}].amount"), liability.amount)?;
        if !request.holdings.iter().any(|h| h.id == liability.holding_id) {
            return Err(InputError::UnknownHolding(liability.holding_id.clone()));
        }
    }

    let options = &request.options;
    if options.state_payout_years == 0 {
        return Err(InputError::ZeroPayoutYears);
    }
    check_years(
        "statePayoutYears",
        options.state_payout_years,
        MAX_STATE_PAYOUT_YEARS,
    )?;
    check_years("horizonBufferYears", options.horizon_buffer_years, MAX_AGE)?;
    check_years("maxValidationYears", options.max_validation_years, MAX_AGE)?;
    if let Some(age) = options.freedom_age_override {
        check_age("freedomAgeOverride", age)?;
    }
    Ok(())
}

fn check_finite(field: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn check_money(field: &str, value: f64) -> Result<(), InputError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(InputError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), InputError> {
    check_finite(field, value)?;
    if !(min..=max).contains(&value) {
        return Err(InputError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_return(field: &str, value: f64) -> Result<(), InputError> {
    check_range(field, value, -0.99, 1.0)
}

fn check_years(field: &'static str, value: u32, max: u32) -> Result<(), InputError> {
    if value > max {
        return Err(InputError::TooManyYears { field, max, value });
    }
    Ok(())
}

fn check_age(field: &str, value: u32) -> Result<(), InputError> {
    if value > MAX_AGE {
        return Err(InputError::AgeTooHigh {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}
