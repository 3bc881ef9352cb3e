//! Error taxonomy (spec.md §7), grouped by pipeline stage the way
//! `chapaty::error::ChapatyError` groups its own sub-enums, and exposed at
//! the HTTP boundary the way `gianged-shift-scheduler`'s per-service
//! `error.rs` does (`IntoResponse` + structured `tracing` events).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Top-level pipeline error. Only `Input` ever crosses the HTTP boundary
/// as a rejection (spec.md §7: "Exit from the pipeline is always a
/// well-formed RosterResponse unless the request itself was malformed").
#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Fatal input errors (spec.md §7): malformed or inconsistent input data.
/// No roster is produced; the pipeline never starts.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("missing availability for employee '{employee_id}' on day {date}")]
    MissingAvailability { employee_id: String, date: String },

    #[error("shift code '{code}' references unknown station '{station}'")]
    UnknownStation { code: String, station: String },

    #[error("horizon length {weeks} weeks is misaligned with {days} supplied days")]
    HorizonMisaligned { weeks: u32, days: usize },

    #[error("requested horizon of {weeks} weeks is not one of {{1, 2, 4}}")]
    InvalidHorizonWeeks { weeks: u32 },

    #[error("invalid configuration: {0}")]
    MalformedConfig(String),

    #[error("empty employee roster")]
    EmptyEmployeeRoster,
}

/// Solver failures (spec.md §7): infeasibility or timeout-without-solution.
/// These still produce a well-formed `RosterResponse` with `status =
/// "failed"`; they never escape as HTTP errors.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("no feasible assignment satisfies hard constraints: {diagnostic}")]
    Infeasible { diagnostic: String },

    #[error("solver exceeded its time budget without finding a feasible solution")]
    TimedOutInfeasible,
}

/// Cancellation and internal invariant failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("run cancelled during stage '{stage}'")]
    Cancelled { stage: &'static str },

    #[error("global wall-clock budget exceeded before stage '{stage}'")]
    BudgetExceeded { stage: &'static str },

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for InputError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        tracing::warn!(error = %self, %status, "rejecting malformed request");
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl IntoResponse for RosterError {
    fn into_response(self) -> Response {
        match self {
            RosterError::Input(e) => e.into_response(),
            RosterError::Solver(e) => {
                tracing::error!(error = %e, "solver error escaped the pipeline boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() }))
                    .into_response()
            }
            RosterError::Pipeline(e) => {
                tracing::error!(error = %e, "pipeline error escaped the pipeline boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: e.to_string() }))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_messages_are_descriptive() {
        let e = InputError::InvalidHorizonWeeks { weeks: 3 };
        assert!(e.to_string().contains("3 weeks"));
    }

    #[test]
    fn roster_error_wraps_each_sub_enum() {
        let e: RosterError = InputError::EmptyEmployeeRoster.into();
        assert!(matches!(e, RosterError::Input(_)));
        let e: RosterError = SolverError::TimedOutInfeasible.into();
        assert!(matches!(e, RosterError::Solver(_)));
        let e: RosterError = PipelineError::Invariant("x".into()).into();
        assert!(matches!(e, RosterError::Pipeline(_)));
    }
}
