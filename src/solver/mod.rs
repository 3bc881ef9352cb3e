//! Scheduler / CP core (spec.md §4.3): builds the constraint model from
//! the run's employees/days/shift codes/skill matching, solves it within
//! the run's remaining wall-clock budget, and decodes the result into a
//! `Roster`.

pub mod backend;
pub mod model;
pub mod score;

use std::sync::Arc;
use std::time::Instant;

use crate::domain::Roster;
use crate::error::{RosterError, SolverError};
use crate::pipeline::{PipelineAgent, PipelineResult, RunContext};

pub use backend::{rest_gap_hours, LocalSearchModel};
pub use model::{ConstraintModel, Fixing, Freeze, SolveOutcome, VarId};
pub use score::Score;

/// Builds and solves a fresh model against the run's full employee/day
/// set, with no cells frozen. Shared by `SchedulerAgent` and, with a
/// non-empty `freeze`/`fixings`, by the Resolver's repair loop.
///
/// Always decodes and returns the best grid the local search found, even
/// when it never reached hard-feasibility: a deadline-bounded best-effort
/// solution is exactly what spec.md §4.3's solver contract calls for
/// ("On timeout, return best feasible solution found"), and the
/// Validator needs the concrete roster to produce the per-kind
/// diagnostic conflicts spec.md §7 requires for an infeasible run ("a
/// diagnostic Conflict listing the tightest-violated constraint class").
/// The returned `bool` is whether that grid is hard-feasible.
///
/// `deadline` is the caller's wall-clock cutoff for this particular solve
/// — the Scheduler's initial call passes `ctx.scheduler_deadline()` (a
/// fraction of the run's total budget, spec.md §4.5), and the Resolver's
/// repair calls pass a per-iteration deadline carved out of whatever
/// remains, so a stalled local search never consumes the whole run.
pub fn solve(ctx: &RunContext, freeze: Option<&Freeze>, fixings: &[Fixing], seed: u64, deadline: Instant) -> PipelineResult<(Roster, bool)> {
    let skill_matching = ctx
        .skill_matching
        .clone()
        .ok_or_else(|| RosterError::Pipeline(crate::error::PipelineError::Invariant("solver ran before matcher".into())))?;

    if !ctx.shift_codes.iter().any(crate::domain::ShiftCode::is_off) {
        return Err(RosterError::Solver(SolverError::Infeasible {
            diagnostic: "shift code catalog has no off code to fall back to".into(),
        }));
    }

    let mut model = LocalSearchModel::build(
        ctx.employees.as_ref().clone(),
        ctx.days.clone(),
        ctx.shift_codes.as_ref().clone(),
        skill_matching,
        ctx.config.weights,
        ctx.config.labor,
        freeze,
        fixings,
        seed,
    );

    let outcome = model.solve_with_deadline(deadline);
    let feasible = matches!(outcome, SolveOutcome::Feasible);
    let employees = ctx.employees.clone();
    let days = Arc::new(model.days().to_vec());
    let shift_codes = ctx.shift_codes.clone();
    let grid = model.decode_grid();
    Ok((Roster::new(employees, days, shift_codes, grid), feasible))
}

pub struct SchedulerAgent;

impl PipelineAgent for SchedulerAgent {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    fn run(&mut self, ctx: &mut RunContext) -> PipelineResult<String> {
        let (roster, feasible) = solve(ctx, None, &[], 0xC0FF_EE00, ctx.scheduler_deadline())?;
        let num_assigned = (0..roster.employees.len())
            .flat_map(|e| (0..roster.days.len()).map(move |d| (e, d)))
            .filter(|&(e, d)| roster.is_working(e, d))
            .count();
        let summary = format!(
            "scheduled {} employees over {} days ({} working cells, hard-feasible: {feasible})",
            roster.employees.len(),
            roster.days.len(),
            num_assigned
        );
        ctx.roster = Some(roster);
        ctx.scheduler_hard_infeasible = !feasible;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::demo_data;
    use crate::pipeline::CancellationToken;
    use std::time::Duration;

    fn ctx() -> RunContext {
        use crate::pipeline::PipelineAgent;
        let fixture = demo_data::minimum_feasible_store();
        let mut ctx = RunContext::new(
            Arc::new(RunConfig::default()),
            fixture.store,
            Arc::new(fixture.employees),
            Arc::new(fixture.shift_codes),
            fixture.start_date,
            1,
            Duration::from_millis(200),
            CancellationToken::new(),
        );
        crate::demand::DemandAgent.run(&mut ctx).unwrap();
        crate::matcher::MatcherAgent.run(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn scheduler_produces_a_roster_for_the_minimum_feasible_store() {
        let mut c = ctx();
        SchedulerAgent.run(&mut c).unwrap();
        assert!(c.roster.is_some());
    }

    #[test]
    fn every_cell_decodes_to_a_known_shift_code() {
        let mut c = ctx();
        SchedulerAgent.run(&mut c).unwrap();
        let roster = c.roster.unwrap();
        for e in 0..roster.employees.len() {
            for d in 0..roster.days.len() {
                assert!(roster.code_index(e, d) < roster.shift_codes.len());
            }
        }
    }
}
