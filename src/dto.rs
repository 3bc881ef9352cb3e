//! Wire types (spec.md §6). Consolidated into one module rather than the
//! teacher's split `api.rs`/`dto.rs` duplication (DESIGN.md): `api.rs`
//! keeps router/handlers only, every serializable shape lives here.
//! Domain types that are already `Serialize`/`Deserialize` (`Employee`,
//! `ShiftCode`, `StoreProfile`, `Conflict`, `DemandAnalysis`, `AgentState`)
//! are reused directly rather than duplicated into parallel DTO structs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::demand::DemandAnalysis;
use crate::domain::{Conflict, Employee, Interval, RunStatus, ShiftCode, StoreProfile};
use crate::matcher::EmployeeMatchSummary;
use crate::pipeline::{RunOutcome, WorkflowStep};

/// Request body for `POST /rosters`. Mirrors spec.md §6's `GenerateRequest`:
/// the external employee/management roster and store structure, plus the
/// horizon and an optional time-limit override bounded by
/// `RunConfig.max_time_limit_seconds`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequestDto {
    pub start_date: NaiveDate,
    pub weeks: u32,
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
    pub store: StoreProfile,
    pub employees: Vec<Employee>,
    /// Falls back to the canonical catalog (`demo_data::canonical_shift_codes`)
    /// when omitted, since most callers want the standard retail/fast-food
    /// code set rather than a bespoke one.
    #[serde(default)]
    pub shift_codes: Option<Vec<ShiftCode>>,
}

/// One day/interval's required-vs-covered headcount, used by `RosterDto`
/// for the per-cell detail behind the top-level `PeakCoverageMetricsDto`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakCoverageMetricDto {
    pub date: NaiveDate,
    pub interval: Interval,
    pub required: u32,
    pub covered: u32,
}

/// One day's peak-coverage booleans, the per-day half of spec.md §6's
/// `PeakCoverageMetrics` ("reports, per day and across all days, booleans
/// for lunch_peak_met, dinner_peak_met, opening_covered, closing_covered").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakCoverageDayDto {
    pub date: NaiveDate,
    pub lunch_peak_met: bool,
    pub dinner_peak_met: bool,
    pub opening_covered: bool,
    pub closing_covered: bool,
}

/// `PeakCoverageMetrics` (spec.md §6): per-day booleans, their
/// across-all-days conjunction, and the weekend-vs-weekday staffing
/// uplift percentage against its configured target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakCoverageMetricsDto {
    pub per_day: Vec<PeakCoverageDayDto>,
    pub lunch_peak_met_all_days: bool,
    pub dinner_peak_met_all_days: bool,
    pub opening_covered_all_days: bool,
    pub closing_covered_all_days: bool,
    /// `((weekend avg staffing / weekday avg staffing) - 1) * 100`. `0.0`
    /// when there are no weekday (or no weekend) days to compare against.
    pub weekend_vs_weekday_increase_pct: f64,
    pub weekend_uplift_target_pct: f64,
    pub meets_weekend_target: bool,
}

impl PeakCoverageMetricsDto {
    pub fn from_roster(roster: &crate::domain::Roster, weekend_uplift_target_pct: f64) -> Self {
        let per_day: Vec<PeakCoverageDayDto> = roster
            .days
            .iter()
            .enumerate()
            .map(|(d, day)| PeakCoverageDayDto {
                date: day.date,
                lunch_peak_met: roster.coverage(d, Interval::LunchPeak) >= day.demand.get(Interval::LunchPeak),
                dinner_peak_met: roster.coverage(d, Interval::DinnerPeak) >= day.demand.get(Interval::DinnerPeak),
                opening_covered: roster.coverage(d, Interval::Opening) >= day.demand.get(Interval::Opening),
                closing_covered: roster.coverage(d, Interval::Closing) >= day.demand.get(Interval::Closing),
            })
            .collect();

        let working_count = |d: usize| -> f64 {
            (0..roster.employees.len()).filter(|&e| roster.is_working(e, d)).count() as f64
        };
        let (mut weekday_total, mut weekday_days, mut weekend_total, mut weekend_days) = (0.0, 0.0, 0.0, 0.0);
        for (d, day) in roster.days.iter().enumerate() {
            if day.is_weekend {
                weekend_total += working_count(d);
                weekend_days += 1.0;
            } else {
                weekday_total += working_count(d);
                weekday_days += 1.0;
            }
        }
        let weekend_vs_weekday_increase_pct = if weekday_days > 0.0 && weekend_days > 0.0 && weekday_total > 0.0 {
            let weekday_avg = weekday_total / weekday_days;
            let weekend_avg = weekend_total / weekend_days;
            ((weekend_avg / weekday_avg) - 1.0) * 100.0
        } else {
            0.0
        };

        Self {
            lunch_peak_met_all_days: per_day.iter().all(|d| d.lunch_peak_met),
            dinner_peak_met_all_days: per_day.iter().all(|d| d.dinner_peak_met),
            opening_covered_all_days: per_day.iter().all(|d| d.opening_covered),
            closing_covered_all_days: per_day.iter().all(|d| d.closing_covered),
            meets_weekend_target: weekend_vs_weekday_increase_pct >= weekend_uplift_target_pct,
            weekend_uplift_target_pct,
            weekend_vs_weekday_increase_pct,
            per_day,
        }
    }
}

/// One employee's decoded row: the shift code assigned each horizon day,
/// plus the total hours that implies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRosterRowDto {
    pub employee_id: String,
    pub assignments: Vec<String>,
    pub total_hours: f64,
}

/// The decoded roster, reshaped for JSON (the domain `Roster` holds a
/// flat `AssignmentGrid` plus `Arc`-shared catalogs that aren't directly
/// serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterDto {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<EmployeeRosterRowDto>,
    pub peak_coverage: Vec<PeakCoverageMetricDto>,
}

impl RosterDto {
    pub fn from_roster(roster: &crate::domain::Roster) -> Self {
        let dates: Vec<NaiveDate> = roster.days.iter().map(|d| d.date).collect();
        let rows = roster
            .employees
            .iter()
            .enumerate()
            .map(|(e, employee)| EmployeeRosterRowDto {
                employee_id: employee.id.clone(),
                assignments: (0..roster.days.len()).map(|d| roster.code(e, d).code.clone()).collect(),
                total_hours: roster.total_hours(e),
            })
            .collect();
        let peak_coverage = roster
            .days
            .iter()
            .enumerate()
            .flat_map(|(d, day)| {
                Interval::ALL.into_iter().map(move |interval| PeakCoverageMetricDto {
                    date: day.date,
                    interval,
                    required: day.demand.get(interval),
                    covered: roster.coverage(d, interval),
                })
            })
            .collect();
        Self { dates, rows, peak_coverage }
    }
}

/// Response body for `POST /rosters`, spec.md §6's `RosterResponse`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterResponseDto {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub total_employees: usize,
    pub days: Vec<NaiveDate>,
    pub generation_time_seconds: f64,
    pub roster: Option<RosterDto>,
    /// Critical/High severity conflicts — the ones that drive `status`
    /// away from `success` (spec.md §6).
    pub conflicts: Vec<Conflict>,
    /// Medium/Low severity conflicts (spec.md §6: "warnings... severity ≤
    /// Medium"); reported alongside `conflicts` but never block success.
    pub warnings: Vec<Conflict>,
    pub workflow_log: Vec<WorkflowStep>,
    pub skill_matching: Vec<EmployeeMatchSummary>,
    pub demand_analysis: Option<DemandAnalysis>,
    pub peak_coverage: Option<PeakCoverageMetricsDto>,
    pub resolver_iterations_used: u32,
}

impl RosterResponseDto {
    pub fn from_outcome(run_id: Uuid, outcome: RunOutcome, weekend_uplift_target_pct: f64) -> Self {
        let roster = outcome.roster.as_ref().map(RosterDto::from_roster);
        let total_employees = outcome.roster.as_ref().map(|r| r.employees.len()).unwrap_or(0);
        let days = outcome.roster.as_ref().map(|r| r.days.iter().map(|d| d.date).collect()).unwrap_or_default();
        let peak_coverage = outcome
            .roster
            .as_ref()
            .map(|r| PeakCoverageMetricsDto::from_roster(r, weekend_uplift_target_pct));
        let skill_matching = outcome
            .skill_matching
            .as_ref()
            .map(|m| m.summary(total_employees))
            .unwrap_or_default();
        let (conflicts, warnings): (Vec<Conflict>, Vec<Conflict>) = outcome
            .conflicts
            .into_iter()
            .partition(|c| matches!(c.severity, crate::domain::Severity::Critical | crate::domain::Severity::High));
        Self {
            run_id,
            status: outcome.status,
            total_employees,
            days,
            generation_time_seconds: outcome.generation_time.as_secs_f64(),
            roster,
            conflicts,
            warnings,
            workflow_log: outcome.workflow_log,
            skill_matching,
            demand_analysis: outcome.demand_analysis,
            peak_coverage,
            resolver_iterations_used: outcome.resolver_iterations_used,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoDto {
    pub name: &'static str,
    pub version: &'static str,
    pub demo_scenarios: Vec<&'static str>,
}

/// Response for `GET /demo-data` and `GET /demo-data/{id}`: a ready-to-POST
/// `GenerateRequestDto` plus the scenario id that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct DemoDataDto {
    pub scenario: String,
    pub start_date: NaiveDate,
    pub weeks: u32,
    pub store: StoreProfile,
    pub employees: Vec<Employee>,
    pub shift_codes: Vec<ShiftCode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::demo_data;
    use crate::pipeline::{CancellationToken, PipelineAgent, RunContext};
    use std::sync::Arc;
    use std::time::Duration;

    fn solved_roster(fixture: demo_data::DemoFixture) -> crate::domain::Roster {
        let mut ctx = RunContext::new(
            Arc::new(RunConfig::default()),
            fixture.store,
            Arc::new(fixture.employees),
            Arc::new(fixture.shift_codes),
            fixture.start_date,
            1,
            Duration::from_millis(300),
            CancellationToken::new(),
        );
        crate::demand::DemandAgent.run(&mut ctx).unwrap();
        crate::matcher::MatcherAgent.run(&mut ctx).unwrap();
        crate::solver::SchedulerAgent.run(&mut ctx).unwrap();
        ctx.roster.unwrap()
    }

    #[test]
    fn peak_coverage_metrics_cover_every_horizon_day() {
        let roster = solved_roster(demo_data::minimum_feasible_store());
        let metrics = PeakCoverageMetricsDto::from_roster(&roster, 20.0);
        assert_eq!(metrics.per_day.len(), 7);
        assert_eq!(metrics.weekend_uplift_target_pct, 20.0);
    }

    #[test]
    fn meets_weekend_target_matches_the_threshold_comparison() {
        let roster = solved_roster(demo_data::weekend_uplift_store());
        let metrics = PeakCoverageMetricsDto::from_roster(&roster, 20.0);
        assert_eq!(metrics.meets_weekend_target, metrics.weekend_vs_weekday_increase_pct >= 20.0);
    }

    #[test]
    fn roster_response_dto_splits_conflicts_by_severity() {
        let outcome = crate::pipeline::RunOutcome {
            status: RunStatus::Partial,
            roster: None,
            conflicts: vec![
                Conflict::new(crate::domain::ConflictKind::NoManagerOnDuty, "critical"),
                Conflict::new(crate::domain::ConflictKind::StationSkillMismatch, "medium"),
                Conflict::new(crate::domain::ConflictKind::PreferenceIgnored, "low"),
            ],
            workflow_log: Vec::new(),
            demand_analysis: None,
            skill_matching: None,
            resolver_iterations_used: 0,
            generation_time: Duration::from_secs(1),
        };
        let dto = RosterResponseDto::from_outcome(uuid::Uuid::new_v4(), outcome, 20.0);
        assert_eq!(dto.conflicts.len(), 1);
        assert_eq!(dto.warnings.len(), 2);
        assert_eq!(dto.total_employees, 0);
        assert!(dto.peak_coverage.is_none());
    }
}
