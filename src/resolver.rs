//! Resolver Agent (spec.md §4.5): repairs the highest-severity unresolved
//! conflict by freezing everything outside its affected window and
//! re-solving, rolling back whenever a repair attempt doesn't actually
//! reduce the conflict count. Gives up after `RunConfig.resolver_max_iterations`
//! attempts, leaving `status = partial` for the Orchestrator to report.

use std::time::Instant;

use chrono::Duration as ChronoDuration;

use crate::domain::Conflict;
use crate::pipeline::{PipelineAgent, PipelineResult, RunContext};
use crate::solver::Freeze;
use crate::validator;

pub struct ResolverAgent;

impl PipelineAgent for ResolverAgent {
    fn name(&self) -> &'static str {
        "resolver"
    }

    fn run(&mut self, ctx: &mut RunContext) -> PipelineResult<String> {
        if ctx.roster.is_none() {
            return Ok("no roster to repair".to_string());
        }
        if ctx.conflicts.is_empty() {
            return Ok("no conflicts to resolve".to_string());
        }

        let max_iterations = ctx.config.resolver_max_iterations;
        let mut used = 0;

        while used < max_iterations {
            if ctx.conflicts.is_empty() {
                break;
            }
            if ctx.budget_exceeded() {
                break;
            }

            let target = ctx.conflicts.iter().min_by_key(|c| c.severity).cloned();
            let Some(target) = target else { break };

            let freeze = build_freeze(ctx, &target);
            let seed = 0xA11CE_0000 ^ used as u64;

            // Split whatever's left of the global budget evenly across the
            // remaining attempts, so one stuck repair can't starve the rest
            // (spec.md §4.5: "re-invoke the Scheduler with a reduced time
            // budget").
            let remaining_attempts = (max_iterations - used).max(1);
            let repair_deadline = Instant::now() + ctx.remaining() / remaining_attempts;

            match crate::solver::solve(ctx, Some(&freeze), &[], seed, repair_deadline) {
                Ok((candidate_roster, feasible)) => {
                    let candidate_conflicts = validator::validate(&candidate_roster, ctx);
                    let has_new_critical = candidate_conflicts
                        .iter()
                        .any(|c| c.severity == crate::domain::Severity::Critical && !ctx.conflicts.iter().any(|e| e.kind == c.kind && e.employee_id == c.employee_id));
                    if candidate_conflicts.len() < ctx.conflicts.len() && !has_new_critical {
                        ctx.roster = Some(candidate_roster);
                        ctx.conflicts = candidate_conflicts;
                        ctx.scheduler_hard_infeasible = !feasible;
                    }
                    // Else: rollback by simply not committing — `ctx.roster`
                    // and `ctx.conflicts` are left untouched.
                }
                Err(_) => {
                    // Repair infeasible under this freeze; leave state as-is
                    // and let the next iteration try a different window.
                }
            }

            used += 1;
        }

        ctx.resolver_iterations_used = used;
        let summary = if ctx.conflicts.is_empty() {
            format!("resolved all conflicts in {used} iterations")
        } else {
            format!("{} conflicts remain after {used} of {max_iterations} iterations", ctx.conflicts.len())
        };
        Ok(summary)
    }
}

/// Freezes every (employee, day) cell except the ones in the conflict's
/// affected window: the conflict's own days (widened by one day on each
/// side so rest-gap repairs have room to move the neighbor), restricted
/// to the conflict's employee if it names one, or left open for every
/// employee if the conflict is store-wide (coverage/manager conflicts).
fn build_freeze(ctx: &RunContext, conflict: &Conflict) -> Freeze {
    let roster = ctx.roster.as_ref().expect("checked by caller");
    let mut freeze = Freeze::new();

    let affected_days: std::collections::HashSet<chrono::NaiveDate> = conflict
        .days
        .iter()
        .flat_map(|&d| [d - ChronoDuration::days(1), d, d + ChronoDuration::days(1)])
        .collect();

    let affected_employee_idx = conflict.employee_id.as_ref().and_then(|id| roster.employee_idx_by_id(id));

    for e in 0..roster.employees.len() {
        let employee_is_affected = affected_employee_idx.map(|idx| idx == e).unwrap_or(true);
        for d in 0..roster.days.len() {
            let day_is_affected = affected_days.is_empty() || affected_days.contains(&roster.days[d].date);
            if !(employee_is_affected && day_is_affected) {
                freeze.pin(e, d, roster.code_index(e, d));
            }
        }
    }

    freeze
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::demo_data;
    use crate::pipeline::{CancellationToken, PipelineAgent};
    use std::sync::Arc;
    use std::time::Duration;

    fn validated_ctx(fixture: demo_data::DemoFixture) -> RunContext {
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
        let _ = crate::solver::SchedulerAgent.run(&mut ctx);
        crate::validator::ValidatorAgent.run(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn resolver_never_increases_conflict_count() {
        let mut ctx = validated_ctx(demo_data::manager_scarcity_store());
        let before = ctx.conflicts.len();
        ResolverAgent.run(&mut ctx).unwrap();
        assert!(ctx.conflicts.len() <= before);
    }

    #[test]
    fn resolver_is_a_no_op_when_there_are_no_conflicts() {
        let mut ctx = validated_ctx(demo_data::minimum_feasible_store());
        ctx.conflicts.clear();
        ResolverAgent.run(&mut ctx).unwrap();
        assert_eq!(ctx.resolver_iterations_used, 0);
    }

    #[test]
    fn resolver_respects_the_iteration_cap() {
        let mut ctx = validated_ctx(demo_data::manager_scarcity_store());
        ResolverAgent.run(&mut ctx).unwrap();
        assert!(ctx.resolver_iterations_used <= ctx.config.resolver_max_iterations);
    }
}
