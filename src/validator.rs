//! Validator Agent (spec.md §4.4): scans a decoded roster for every
//! conflict kind in the table and emits one `Conflict` per violation
//! found, tagged with severity so the Resolver can triage them.

use std::collections::HashMap;

use crate::domain::{Conflict, ConflictKind, Interval};
use crate::pipeline::{PipelineAgent, PipelineResult, RunContext};

pub struct ValidatorAgent;

impl PipelineAgent for ValidatorAgent {
    fn name(&self) -> &'static str {
        "validator"
    }

    fn run(&mut self, ctx: &mut RunContext) -> PipelineResult<String> {
        let conflicts = match &ctx.roster {
            Some(roster) => validate(roster, ctx),
            None => Vec::new(),
        };
        let summary = format!("found {} conflicts", conflicts.len());
        ctx.conflicts = conflicts;
        Ok(summary)
    }
}

pub fn validate(roster: &crate::domain::Roster, ctx: &RunContext) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let labor = &ctx.config.labor;

    // #4 weekly hours overflow/underflow, grouped by ISO week.
    let weeks = iso_weeks(roster);
    for (e, employee) in roster.employees.iter().enumerate() {
        for week in &weeks {
            let week_hours: f64 = week.iter().map(|&d| roster.code(e, d).hours).sum();
            if week_hours > employee.max_weekly_hours {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::WeeklyHoursOverflow,
                        format!("{} scheduled {:.1}h, above max {:.1}h", employee.id, week_hours, employee.max_weekly_hours),
                    )
                    .with_employee(employee.id.clone())
                    .with_days(week.iter().map(|&d| roster.days[d].date)),
                );
            } else if week_hours < employee.min_weekly_hours {
                conflicts.push(
                    Conflict::new(
                        ConflictKind::WeeklyHoursUnderflow,
                        format!("{} scheduled {:.1}h, below min {:.1}h", employee.id, week_hours, employee.min_weekly_hours),
                    )
                    .with_employee(employee.id.clone())
                    .with_days(week.iter().map(|&d| roster.days[d].date)),
                );
            }
        }
    }

    // #5 insufficient rest between consecutive working days.
    for (e, employee) in roster.employees.iter().enumerate() {
        for d in 0..roster.days.len().saturating_sub(1) {
            let today = roster.code(e, d);
            let tomorrow = roster.code(e, d + 1);
            if today.is_off() || tomorrow.is_off() {
                continue;
            }
            if let Some(gap) = crate::solver::rest_gap_hours(today, tomorrow) {
                if gap < labor.min_rest_hours {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::InsufficientRest,
                            format!("{} has only {:.1}h rest between {} and {}", employee.id, gap, roster.days[d].date, roster.days[d + 1].date),
                        )
                        .with_employee(employee.id.clone())
                        .with_days([roster.days[d].date, roster.days[d + 1].date]),
                    );
                }
            }
        }
    }

    // #6 max consecutive working days, sliding 7-day windows.
    if roster.days.len() >= 7 {
        for (e, employee) in roster.employees.iter().enumerate() {
            for window_start in 0..=(roster.days.len() - 7) {
                let working_days: Vec<chrono::NaiveDate> = (window_start..window_start + 7)
                    .filter(|&d| roster.is_working(e, d))
                    .map(|d| roster.days[d].date)
                    .collect();
                if working_days.len() as u32 > labor.max_consecutive_days {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::ConsecutiveDaysExceeded,
                            format!(
                                "{} works {} days in the window starting {}, above the {}-day cap",
                                employee.id,
                                working_days.len(),
                                roster.days[window_start].date,
                                labor.max_consecutive_days
                            ),
                        )
                        .with_employee(employee.id.clone())
                        .with_days(working_days),
                    );
                }
            }
        }
    }

    // #7 manager coverage, every day and interval.
    for d in 0..roster.days.len() {
        for interval in Interval::ALL {
            if !roster.manager_on_duty(d, interval) {
                conflicts.push(
                    Conflict::new(ConflictKind::NoManagerOnDuty, format!("no manager covering {interval} on {}", roster.days[d].date))
                        .with_days([roster.days[d].date]),
                );
            }
        }
    }

    // Peak undercoverage and opening/closing uncoverage.
    for (d, day) in roster.days.iter().enumerate() {
        for interval in Interval::ALL {
            let required = day.demand.get(interval);
            let coverage = roster.coverage(d, interval);
            if coverage < required {
                let kind = if matches!(interval, Interval::Opening | Interval::Closing) {
                    ConflictKind::OpeningOrClosingUncovered
                } else {
                    ConflictKind::PeakUndercoverage
                };
                conflicts.push(
                    Conflict::new(kind, format!("{interval} on {} covered by {coverage}, needs {required}", day.date)).with_days([day.date]),
                );
            }
        }
    }

    // Station skill mismatch: an employee working a station-bound shift
    // they cannot staff at all (construction should already prevent this
    // by only creating eligible variables; kept as a defense-in-depth
    // scan per spec.md §4.4's table).
    if let Some(skill_matching) = &ctx.skill_matching {
        for (e, employee) in roster.employees.iter().enumerate() {
            for d in 0..roster.days.len() {
                let code_idx = roster.code_index(e, d);
                if !skill_matching.eligible(e, code_idx) {
                    conflicts.push(
                        Conflict::new(
                            ConflictKind::StationSkillMismatch,
                            format!("{} assigned {} without eligibility", employee.id, roster.code(e, d).code),
                        )
                        .with_employee(employee.id.clone())
                        .with_days([roster.days[d].date]),
                    );
                }
            }
        }
    }

    // Weekend uplift missed: a weekend day whose derived demand wasn't
    // actually raised above the weekday baseline (signals a Demand Agent
    // configuration problem rather than a Scheduler failure).
    if let Some(analysis) = &ctx.demand_analysis {
        for day_analysis in &analysis.per_day {
            if day_analysis.is_weekend && day_analysis.weekend_multiplier <= 1.0 {
                conflicts.push(Conflict::new(
                    ConflictKind::WeekendUpliftMissed,
                    format!("{} is a weekend day but no uplift was applied", day_analysis.date),
                ));
            }
        }
    }

    // Preference ignored: an employee marked a day Preferred but was
    // scheduled off anyway despite being eligible for at least one code.
    if let Some(skill_matching) = &ctx.skill_matching {
        for (e, employee) in roster.employees.iter().enumerate() {
            for (d, day) in roster.days.iter().enumerate() {
                if employee.availability_on(day.date) != crate::domain::Availability::Preferred {
                    continue;
                }
                if !roster.is_working(e, d) {
                    let has_eligible_code = (0..roster.shift_codes.len())
                        .any(|c| !roster.shift_codes[c].is_off() && skill_matching.eligible(e, c));
                    if has_eligible_code {
                        conflicts.push(
                            Conflict::new(ConflictKind::PreferenceIgnored, format!("{} preferred to work {} but was scheduled off", employee.id, day.date))
                                .with_employee(employee.id.clone())
                                .with_days([day.date]),
                        );
                    }
                }
            }
        }
    }

    conflicts
}

fn iso_weeks(roster: &crate::domain::Roster) -> Vec<Vec<usize>> {
    use chrono::Datelike;
    let mut weeks: Vec<(u64, Vec<usize>)> = Vec::new();
    for (d, day) in roster.days.iter().enumerate() {
        let iso = day.date.iso_week();
        let key = (iso.year() as u64) * 100 + iso.week() as u64;
        match weeks.iter_mut().find(|(k, _)| *k == key) {
            Some((_, days)) => days.push(d),
            None => weeks.push((key, vec![d])),
        }
    }
    weeks.into_iter().map(|(_, days)| days).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::demo_data;
    use crate::pipeline::{CancellationToken, PipelineAgent};
    use std::sync::Arc;
    use std::time::Duration;

    fn solved_ctx(fixture: demo_data::DemoFixture) -> RunContext {
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
        ctx
    }

    #[test]
    fn manager_scarcity_store_flags_no_manager_on_duty() {
        let mut ctx = solved_ctx(demo_data::manager_scarcity_store());
        ValidatorAgent.run(&mut ctx).unwrap();
        assert!(ctx.conflicts.iter().any(|c| c.kind == ConflictKind::NoManagerOnDuty));
    }

    #[test]
    fn validator_reports_zero_conflicts_when_roster_is_absent() {
        let mut ctx = solved_ctx(demo_data::minimum_feasible_store());
        ctx.roster = None;
        ValidatorAgent.run(&mut ctx).unwrap();
        assert!(ctx.conflicts.is_empty());
    }
}
