//! REST API handlers, the thin request/response layer spec.md §1
//! explicitly places outside the core: it only converts wire DTOs to/from
//! the pipeline's domain types and tracks in-flight runs, following the
//! teacher's `api.rs` router shape (`AppState` behind a
//! `parking_lot::RwLock`, one route group per resource).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::demo_data;
use crate::dto::{DemoDataDto, GenerateRequestDto, HealthDto, InfoDto, RosterResponseDto};
use crate::error::{InputError, RosterError};
use crate::pipeline::{CancellationToken, Orchestrator, RunContext};

/// One tracked run: its cancellation token (live while `result` is
/// `None`) and, once the Orchestrator returns, its response DTO.
struct RunJob {
    cancel: CancellationToken,
    result: Option<RosterResponseDto>,
}

/// Application state shared across handlers: the run registry plus the
/// immutable configuration every run is built against (spec.md §9:
/// "Configuration... is passed as an immutable value at run start").
pub struct AppState {
    config: Arc<RunConfig>,
    jobs: parking_lot::RwLock<HashMap<Uuid, RunJob>>,
}

impl AppState {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config: Arc::new(config),
            jobs: parking_lot::RwLock::new(HashMap::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        .route("/rosters", post(create_roster))
        .route("/rosters/{id}", get(get_roster))
        .route("/rosters/{id}", delete(cancel_roster))
        .with_state(state)
}

async fn health() -> Json<HealthDto> {
    Json(HealthDto { status: "UP" })
}

async fn info() -> Json<InfoDto> {
    Json(InfoDto {
        name: "roster-engine",
        version: env!("CARGO_PKG_VERSION"),
        demo_scenarios: demo_data::SCENARIO_IDS.to_vec(),
    })
}

async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::SCENARIO_IDS.to_vec())
}

async fn get_demo_data(Path(id): Path<String>) -> Result<Json<DemoDataDto>, StatusCode> {
    let fixture = demo_data::named_scenario(&id).ok_or(StatusCode::NOT_FOUND)?;
    let weeks = fixture_weeks(&fixture);
    Ok(Json(DemoDataDto {
        scenario: id,
        start_date: fixture.start_date,
        weeks,
        store: fixture.store,
        employees: fixture.employees,
        shift_codes: fixture.shift_codes,
    }))
}

fn fixture_weeks(fixture: &demo_data::DemoFixture) -> u32 {
    let num_days = fixture
        .employees
        .first()
        .map(|e| e.availability.len())
        .unwrap_or(7);
    ((num_days as u32) / 7).max(1)
}

/// Builds a `RunContext` from the wire request, validating the horizon
/// and falling back to the canonical shift-code catalog when the
/// request omits one (spec.md §6: "Falls back to the canonical catalog").
fn build_context(
    config: Arc<RunConfig>,
    dto: GenerateRequestDto,
    cancel: CancellationToken,
) -> Result<RunContext, InputError> {
    if !matches!(dto.weeks, 1 | 2 | 4) {
        return Err(InputError::InvalidHorizonWeeks { weeks: dto.weeks });
    }
    let time_limit = config.clamp_time_limit(dto.time_limit_seconds.unwrap_or(config.default_time_limit_seconds));
    let shift_codes = dto.shift_codes.unwrap_or_else(demo_data::canonical_shift_codes);

    Ok(RunContext::new(
        config,
        dto.store,
        Arc::new(dto.employees),
        Arc::new(shift_codes),
        dto.start_date,
        dto.weeks,
        time_limit,
        cancel,
    ))
}

/// POST /rosters - starts a pipeline run and blocks until it completes
/// (or the request's time limit elapses), returning the full
/// `RosterResponse` (spec.md §6). Also registers the run under its id so
/// a concurrent `DELETE /rosters/{id}` can cancel it.
async fn create_roster(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<GenerateRequestDto>,
) -> Result<Json<RosterResponseDto>, RosterError> {
    let run_id = Uuid::new_v4();
    let cancel = CancellationToken::new();

    {
        let mut jobs = state.jobs.write();
        jobs.insert(run_id, RunJob { cancel: cancel.clone(), result: None });
    }

    let weekend_uplift_target_pct = state.config.demand.weekend_uplift_pct * 100.0;
    let ctx = build_context(state.config.clone(), dto, cancel).map_err(RosterError::Input)?;

    let outcome = tokio::task::spawn_blocking(move || Orchestrator::new().generate(ctx))
        .await
        .map_err(|e| RosterError::Pipeline(crate::error::PipelineError::Invariant(e.to_string())))??;

    let response = RosterResponseDto::from_outcome(run_id, outcome, weekend_uplift_target_pct);

    if let Some(job) = state.jobs.write().get_mut(&run_id) {
        job.result = Some(response.clone());
    }

    Ok(Json(response))
}

/// GET /rosters/{id} - fetches a previously computed result by run id.
async fn get_roster(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<RosterResponseDto>, StatusCode> {
    let jobs = state.jobs.read();
    match jobs.get(&id).and_then(|job| job.result.clone()) {
        Some(response) => Ok(Json(response)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// DELETE /rosters/{id} - requests cancellation of an in-flight run
/// (spec.md §5: "A run carries a cancellation token").
async fn cancel_roster(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> StatusCode {
    let jobs = state.jobs.read();
    match jobs.get(&id) {
        Some(job) => {
            job.cancel.cancel();
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}
