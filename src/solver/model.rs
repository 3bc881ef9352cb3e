//! The abstract solver interface boundary named in spec.md §9: the rest
//! of the Scheduler depends only on this capability set, never on
//! `LocalSearchModel` directly, so a different backend could be dropped
//! in without touching model-construction code.

use std::time::Instant;

/// Handle to a single boolean decision variable. Opaque to callers;
/// meaning is tracked by whoever created it (the model builder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

/// The constraint-IR fragments a model builder can register. Kept small
/// deliberately — this is the same technique the teacher's
/// `constraints.rs` uses for its own "hard" constraints
/// (`HardSoftDecimalScore::ONE_HARD`, `of_hard_scaled(...)`): constraints
/// are not algebraically pruned, they are scored as violations, so the
/// IR only needs to describe *what to measure*, not how to propagate.
#[derive(Debug, Clone)]
pub enum HardTerm {
    /// `lo <= sum(coeff * var) <= hi` over the active (1.0) variables.
    Range { terms: Vec<(VarId, f64)>, lo: f64, hi: f64 },
    /// At least one of `vars` must be active.
    BoolOr { vars: Vec<VarId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A hard-feasible solution was found.
    Feasible,
    /// The deadline was reached with an infeasible best-effort solution.
    BestEffort,
}

/// The capability set spec.md §9 names: variable creation, linear and
/// disjunctive constraint registration, a linear objective, and a
/// deadline-bounded solve.
pub trait ConstraintModel {
    fn add_bool_var(&mut self) -> VarId;
    fn add_linear_constraint(&mut self, terms: &[(VarId, f64)], lo: f64, hi: f64);
    fn add_bool_or(&mut self, vars: &[VarId]);
    fn minimize(&mut self, terms: &[(VarId, f64)]);
    fn solve_with_deadline(&mut self, deadline: Instant) -> SolveOutcome;
    fn read_value(&self, var: VarId) -> bool;
}

/// Per-variable bookkeeping the model builder keeps alongside the
/// opaque `VarId`s it hands to the backend, so the decode step can map
/// an active variable back to an (employee, day, shift code) triple.
#[derive(Debug, Clone, Copy)]
pub struct VarMeta {
    pub employee_idx: usize,
    pub day_idx: usize,
    pub code_idx: usize,
}

/// A single assignment the caller wants pinned before solving, used by
/// the Resolver's freeze-and-re-solve repair (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct Fixing {
    pub employee_idx: usize,
    pub day_idx: usize,
    pub code_idx: usize,
}

/// Which (employee, day) cells the Resolver has frozen at their current
/// value; everything not listed remains free for the re-solve.
#[derive(Debug, Clone, Default)]
pub struct Freeze {
    pub frozen: std::collections::HashMap<(usize, usize), usize>,
}

impl Freeze {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&mut self, employee_idx: usize, day_idx: usize, code_idx: usize) {
        self.frozen.insert((employee_idx, day_idx), code_idx);
    }

    pub fn get(&self, employee_idx: usize, day_idx: usize) -> Option<usize> {
        self.frozen.get(&(employee_idx, day_idx)).copied()
    }
}
