//! The Orchestrator: a finite-state driver over the five fixed pipeline
//! stages, following the trait-dispatch shape of `chapaty::agent::Agent`
//! ("tagged variants rather than an inheritance hierarchy" — spec.md §9)
//! generalized from `fn act(&mut self, obs) -> Result<Actions>` to
//! `fn run(&mut self, ctx) -> PipelineResult<String>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::demand::DemandAnalysis;
use crate::domain::{
    AgentState, AgentStatus, Conflict, Day, Employee, Roster, RunStatus, ShiftCode, StoreProfile,
};
use crate::error::{PipelineError, RosterError};
use crate::matcher::SkillMatching;
use crate::{demand, matcher, resolver, solver, validator};

pub type PipelineResult<T> = Result<T, RosterError>;

/// Cooperative cancellation: checked between stages and inside the
/// solver's local-search loop, never pre-empted mid-computation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The kind of a workflow step, surfaced distinctly so callers can tell a
/// normal stage transition from a terminal cancellation (spec.md §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Progress,
    Cancelled,
    Failed,
    Completed,
}

/// One append-only entry in the workflow log: `{timestamp, step, message}`
/// per spec.md §6, plus a monotonic sequence number so entries within a
/// stage are totally ordered even if wall-clock resolution is coarse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
    pub step: String,
    pub message: String,
    pub kind: StepKind,
}

/// Shared capability every pipeline stage implements.
pub trait PipelineAgent {
    fn name(&self) -> &'static str;
    fn run(&mut self, ctx: &mut RunContext) -> PipelineResult<String>;
}

/// Per-run context: the only mutable state a run touches. Inputs
/// (`employees`, `shift_codes`, `store`) are immutable and `Arc`-shared;
/// everything else accumulates as stages complete.
pub struct RunContext {
    pub config: Arc<RunConfig>,
    pub store: StoreProfile,
    pub employees: Arc<Vec<Employee>>,
    pub shift_codes: Arc<Vec<ShiftCode>>,
    pub start_date: chrono::NaiveDate,
    pub weeks: u32,
    pub days: Vec<Day>,
    pub demand_analysis: Option<DemandAnalysis>,
    pub skill_matching: Option<SkillMatching>,
    pub roster: Option<Roster>,
    pub conflicts: Vec<Conflict>,
    pub resolver_iterations_used: u32,
    /// Set by the Scheduler (and updated by the Resolver's repair
    /// solves) when the CP model never reached hard-feasibility — every
    /// hard constraint in spec.md §4.3 satisfied. Drives the
    /// `failed`-vs-`partial` distinction in spec.md §6's status codes.
    pub scheduler_hard_infeasible: bool,
    pub deadline: Instant,
    run_started: Instant,
    total_time_budget: Duration,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(
        config: Arc<RunConfig>,
        store: StoreProfile,
        employees: Arc<Vec<Employee>>,
        shift_codes: Arc<Vec<ShiftCode>>,
        start_date: chrono::NaiveDate,
        weeks: u32,
        time_limit: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let run_started = Instant::now();
        Self {
            config,
            store,
            employees,
            shift_codes,
            start_date,
            weeks,
            days: Vec::new(),
            demand_analysis: None,
            skill_matching: None,
            roster: None,
            conflicts: Vec::new(),
            resolver_iterations_used: 0,
            scheduler_hard_infeasible: false,
            deadline: run_started + time_limit,
            run_started,
            total_time_budget: time_limit,
            cancel,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn budget_exceeded(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// The deadline the Scheduler's initial solve must respect: a fixed
    /// fraction of the run's total budget, strictly earlier than the
    /// global deadline whenever that fraction is below 1.0, so the
    /// Resolver's repair loop (spec.md §4.5) always has time left after
    /// the Scheduler returns.
    pub fn scheduler_deadline(&self) -> Instant {
        let fraction = self.config.scheduler_budget_fraction.clamp(0.0, 1.0);
        (self.run_started + self.total_time_budget.mul_f64(fraction)).min(self.deadline)
    }
}

/// The outcome of a full pipeline run.
pub struct RunOutcome {
    pub status: RunStatus,
    pub roster: Option<Roster>,
    pub conflicts: Vec<Conflict>,
    pub workflow_log: Vec<WorkflowStep>,
    pub demand_analysis: Option<DemandAnalysis>,
    pub skill_matching: Option<SkillMatching>,
    pub resolver_iterations_used: u32,
    pub generation_time: Duration,
}

/// Drives the five fixed stages in order, recording a workflow step per
/// stage, enforcing the global wall-clock budget, and honoring
/// cancellation at each stage boundary.
pub struct Orchestrator {
    seq: u64,
    log: Vec<WorkflowStep>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self { seq: 0, log: Vec::new() }
    }

    fn push(&mut self, step: &str, message: impl Into<String>, kind: StepKind) {
        self.seq += 1;
        self.log.push(WorkflowStep {
            timestamp: Utc::now(),
            seq: self.seq,
            step: step.to_string(),
            message: message.into(),
            kind,
        });
    }

    /// Runs the fixed pipeline. Returns `Err` only for a Fatal input error
    /// (spec.md §7); every other outcome — including solver failure,
    /// cancellation, and partial repair — is folded into a well-formed
    /// `RunOutcome`.
    pub fn generate(mut self, mut ctx: RunContext) -> PipelineResult<RunOutcome> {
        let started = Instant::now();
        let mut agent_states: Vec<AgentState> = Vec::new();

        macro_rules! run_stage {
            ($agent:expr) => {{
                let mut agent = $agent;
                let mut state = AgentState::new(agent.name());
                if ctx.cancel.is_cancelled() {
                    self.push(agent.name(), "cancelled before start", StepKind::Cancelled);
                    state.status = AgentStatus::Failed;
                    agent_states.push(state);
                    return Ok(self.finish(ctx, agent_states, started, RunStatus::Partial));
                }
                if ctx.budget_exceeded() {
                    let budget_err = PipelineError::BudgetExceeded { stage: agent.name() };
                    self.push(agent.name(), budget_err.to_string(), StepKind::Failed);
                    state.status = AgentStatus::Failed;
                    agent_states.push(state);
                    return Ok(self.finish(ctx, agent_states, started, RunStatus::Partial));
                }
                state.status = AgentStatus::Running;
                match agent.run(&mut ctx) {
                    Ok(message) => {
                        self.push(agent.name(), message.clone(), StepKind::Progress);
                        state.status = AgentStatus::Succeeded;
                        state.last_action = message;
                        agent_states.push(state);
                    }
                    Err(RosterError::Input(e)) => {
                        self.push(agent.name(), e.to_string(), StepKind::Failed);
                        return Err(RosterError::Input(e));
                    }
                    Err(RosterError::Solver(e)) => {
                        self.push(agent.name(), e.to_string(), StepKind::Failed);
                        state.status = AgentStatus::Failed;
                        state.last_action = e.to_string();
                        agent_states.push(state);
                        return Ok(self.finish(ctx, agent_states, started, RunStatus::Failed));
                    }
                    Err(RosterError::Pipeline(PipelineError::Cancelled { stage })) => {
                        self.push(stage, "cancelled mid-stage", StepKind::Cancelled);
                        state.status = AgentStatus::Failed;
                        agent_states.push(state);
                        return Ok(self.finish(ctx, agent_states, started, RunStatus::Partial));
                    }
                    Err(e) => return Err(e),
                }
            }};
        }

        run_stage!(demand::DemandAgent);
        run_stage!(matcher::MatcherAgent);
        run_stage!(solver::SchedulerAgent);
        run_stage!(validator::ValidatorAgent);
        run_stage!(resolver::ResolverAgent);

        let has_critical = ctx.conflicts.iter().any(|c| c.severity == crate::domain::Severity::Critical);
        let status = if ctx.roster.is_none() || ctx.scheduler_hard_infeasible {
            RunStatus::Failed
        } else if has_critical {
            RunStatus::Partial
        } else {
            RunStatus::Success
        };
        Ok(self.finish(ctx, agent_states, started, status))
    }

    fn finish(
        mut self,
        ctx: RunContext,
        _agent_states: Vec<AgentState>,
        started: Instant,
        status: RunStatus,
    ) -> RunOutcome {
        let kind = match status {
            RunStatus::Success => StepKind::Completed,
            RunStatus::Partial => StepKind::Progress,
            RunStatus::Failed => StepKind::Failed,
        };
        self.push("orchestrator", format!("pipeline finished with status {status}"), kind);
        RunOutcome {
            status,
            roster: ctx.roster,
            conflicts: ctx.conflicts,
            workflow_log: self.log,
            demand_analysis: ctx.demand_analysis,
            skill_matching: ctx.skill_matching,
            resolver_iterations_used: ctx.resolver_iterations_used,
            generation_time: started.elapsed(),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let tok = CancellationToken::new();
        assert!(!tok.is_cancelled());
        tok.cancel();
        assert!(tok.is_cancelled());
    }
}
