//! Matcher Agent (spec.md §4.2): builds, for each (employee, station)
//! pair, a compatibility score and an eligibility flag from declared
//! primary station, cross-trained stations, and managerial status.
//!
//! Generalizes the teacher's `constraints.rs` skill-set check
//! (`emp.skills.contains(&shift.required_skill)`) from a boolean gate into
//! a graded eligibility-and-score table.

use serde::{Deserialize, Serialize};

use crate::domain::Availability;
use crate::pipeline::{PipelineAgent, PipelineResult, RunContext};

/// One (employee, shift code) eligibility/score pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchEntry {
    pub eligible: bool,
    /// Day-independent base score (primary/cross-trained/manager bonus).
    /// The Scheduler adds the day-dependent Preferred bonus at objective
    /// build time via `SkillMatching::score_for_day`.
    pub base_score: i32,
}

/// The full eligibility/score table, one entry per (employee, shift code).
#[derive(Debug, Clone)]
pub struct SkillMatching {
    num_codes: usize,
    entries: Vec<MatchEntry>,
}

impl SkillMatching {
    #[inline]
    fn idx(&self, employee_idx: usize, code_idx: usize) -> usize {
        employee_idx * self.num_codes + code_idx
    }

    pub fn entry(&self, employee_idx: usize, code_idx: usize) -> MatchEntry {
        self.entries[self.idx(employee_idx, code_idx)]
    }

    pub fn eligible(&self, employee_idx: usize, code_idx: usize) -> bool {
        self.entry(employee_idx, code_idx).eligible
    }

    /// Full preference score including the day's Preferred bonus
    /// (spec.md §4.2: "+3 if availability for that day is Preferred").
    pub fn score_for_day(&self, employee_idx: usize, code_idx: usize, availability: Availability) -> i32 {
        let base = self.entry(employee_idx, code_idx).base_score;
        if availability == Availability::Preferred {
            base + 3
        } else {
            base
        }
    }

    /// A JSON-friendly summary for the response's `skill_matching` map:
    /// per-employee counts of eligible stations.
    pub fn summary(&self, num_employees: usize) -> Vec<EmployeeMatchSummary> {
        (0..num_employees)
            .map(|e| {
                let eligible_codes = (0..self.num_codes).filter(|&c| self.eligible(e, c)).count();
                EmployeeMatchSummary { employee_idx: e, eligible_codes }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeMatchSummary {
    pub employee_idx: usize,
    pub eligible_codes: usize,
}

pub struct MatcherAgent;

impl PipelineAgent for MatcherAgent {
    fn name(&self) -> &'static str {
        "matcher"
    }

    fn run(&mut self, ctx: &mut RunContext) -> PipelineResult<String> {
        let num_codes = ctx.shift_codes.len();
        let mut entries = Vec::with_capacity(ctx.employees.len() * num_codes);

        for employee in ctx.employees.iter() {
            for code in ctx.shift_codes.iter() {
                if code.is_off() {
                    entries.push(MatchEntry { eligible: true, base_score: 0 });
                    continue;
                }

                let mut eligible = true;
                if code.requires_manager && !employee.is_manager {
                    eligible = false;
                }
                if let Some(station) = &code.station {
                    if !employee.can_staff(station) {
                        eligible = false;
                    }
                }

                let mut score = 0;
                if let Some(station) = &code.station {
                    if employee.primary_station == *station {
                        score += 10;
                    } else if employee.cross_trained_stations.contains(station) {
                        score += 5;
                    }
                }
                if code.requires_manager && employee.is_manager {
                    score += 2;
                }

                entries.push(MatchEntry { eligible, base_score: score });
            }
        }

        let matching = SkillMatching { num_codes, entries };
        let eligible_pairs = matching.entries.iter().filter(|e| e.eligible).count();
        let summary = format!(
            "matched {} employees against {} shift codes ({} eligible pairs)",
            ctx.employees.len(),
            num_codes,
            eligible_pairs
        );
        ctx.skill_matching = Some(matching);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::demo_data;
    use crate::pipeline::CancellationToken;
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx() -> RunContext {
        let fixture = demo_data::minimum_feasible_store();
        let mut ctx = RunContext::new(
            Arc::new(RunConfig::default()),
            fixture.store,
            Arc::new(fixture.employees),
            Arc::new(fixture.shift_codes),
            fixture.start_date,
            1,
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        crate::demand::DemandAgent.run(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn non_manager_ineligible_for_manager_codes() {
        let mut c = ctx();
        MatcherAgent.run(&mut c).unwrap();
        let matching = c.skill_matching.as_ref().unwrap();
        let manager_code = c.shift_codes.iter().position(|s| s.requires_manager).unwrap();
        let non_manager = c.employees.iter().position(|e| !e.is_manager).unwrap();
        assert!(!matching.eligible(non_manager, manager_code));
    }

    #[test]
    fn off_code_always_eligible() {
        let mut c = ctx();
        MatcherAgent.run(&mut c).unwrap();
        let matching = c.skill_matching.as_ref().unwrap();
        let off_code = c.shift_codes.iter().position(|s| s.is_off()).unwrap();
        for e in 0..c.employees.len() {
            assert!(matching.eligible(e, off_code));
        }
    }

    #[test]
    fn primary_station_scores_higher_than_cross_trained() {
        let mut c = ctx();
        MatcherAgent.run(&mut c).unwrap();
        let matching = c.skill_matching.as_ref().unwrap();
        let station_code = c
            .shift_codes
            .iter()
            .position(|s| !s.requires_manager && s.station.is_some())
            .unwrap();
        let station = c.shift_codes[station_code].station.clone().unwrap();
        let primary = c.employees.iter().position(|e| e.primary_station == station).unwrap();
        let cross = c
            .employees
            .iter()
            .position(|e| e.primary_station != station && e.cross_trained_stations.contains(&station))
            .unwrap();
        assert!(matching.entry(primary, station_code).base_score > matching.entry(cross, station_code).base_score);
    }
}
