//! Demand Agent (spec.md §4.1): derives per-day, per-interval staffing
//! requirements from the store profile, applying weekday/weekend
//! multipliers and meal-peak uplifts. Also performs the Fatal input
//! validation spec.md §7 assigns to the first stage that can detect it:
//! missing per-day availability, unknown shift-code stations, and a
//! horizon that doesn't match the requested week count.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::{Day, DemandProfile, Interval};
use crate::error::{InputError, RosterError};
use crate::pipeline::{PipelineAgent, PipelineResult, RunContext};

/// Per-day bookkeeping of the multipliers actually applied, so the
/// Validator's `weekend_uplift_missed` check and the response's
/// `demand_analysis` map can cite figures without recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandDayAnalysis {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub weekend_multiplier: f64,
    pub peak_multiplier: f64,
    pub required: DemandProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemandAnalysis {
    pub per_day: Vec<DemandDayAnalysis>,
}

pub struct DemandAgent;

impl PipelineAgent for DemandAgent {
    fn name(&self) -> &'static str {
        "demand"
    }

    fn run(&mut self, ctx: &mut RunContext) -> PipelineResult<String> {
        validate_input(ctx)?;

        let num_days = ctx.weeks as i64 * 7;
        let weekend_factor = 1.0 + ctx.config.demand.weekend_uplift_pct;
        let peak_factor = 1.0 + ctx.config.demand.peak_uplift_pct;

        let mut days = Vec::with_capacity(num_days as usize);
        let mut analysis = DemandAnalysis::default();

        for offset in 0..num_days {
            let date = ctx.start_date + ChronoDuration::days(offset);
            let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let weekend_multiplier = if is_weekend { weekend_factor } else { 1.0 };

            let mut required = DemandProfile::default();
            for interval in Interval::ALL {
                let base = ctx.store.base_headcount.get(interval) as f64;
                let peak_multiplier = if matches!(interval, Interval::LunchPeak | Interval::DinnerPeak) {
                    peak_factor
                } else {
                    1.0
                };
                let mut value = (base * weekend_multiplier * peak_multiplier).ceil();
                if matches!(interval, Interval::Opening | Interval::Closing) {
                    value = value.max(1.0);
                }
                required.set(interval, value as u32);
            }

            analysis.per_day.push(DemandDayAnalysis {
                date,
                is_weekend,
                weekend_multiplier,
                peak_multiplier: peak_factor,
                required,
            });

            days.push(Day { date, is_weekend, demand: required });
        }

        let summary = format!(
            "derived demand for {} days ({} weekend days)",
            days.len(),
            days.iter().filter(|d| d.is_weekend).count()
        );
        ctx.days = days;
        ctx.demand_analysis = Some(analysis);
        Ok(summary)
    }
}

fn validate_input(ctx: &RunContext) -> PipelineResult<()> {
    if !matches!(ctx.weeks, 1 | 2 | 4) {
        return Err(RosterError::Input(InputError::InvalidHorizonWeeks { weeks: ctx.weeks }));
    }
    if ctx.employees.is_empty() {
        return Err(RosterError::Input(InputError::EmptyEmployeeRoster));
    }

    let num_days = ctx.weeks as i64 * 7;
    let horizon: Vec<NaiveDate> = (0..num_days)
        .map(|o| ctx.start_date + ChronoDuration::days(o))
        .collect();

    for employee in ctx.employees.iter() {
        if employee.availability.len() != horizon.len() {
            return Err(RosterError::Input(InputError::HorizonMisaligned {
                weeks: ctx.weeks,
                days: employee.availability.len(),
            }));
        }
        for date in &horizon {
            if !employee.availability.contains_key(date) {
                return Err(RosterError::Input(InputError::MissingAvailability {
                    employee_id: employee.id.clone(),
                    date: date.to_string(),
                }));
            }
        }
    }

    let known_stations: std::collections::HashSet<&str> = ctx
        .employees
        .iter()
        .flat_map(|e| std::iter::once(e.primary_station.as_str()).chain(e.cross_trained_stations.iter().map(String::as_str)))
        .collect();

    for code in ctx.shift_codes.iter() {
        if let Some(station) = &code.station {
            if !known_stations.contains(station.as_str()) {
                return Err(RosterError::Input(InputError::UnknownStation {
                    code: code.code.clone(),
                    station: station.clone(),
                }));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::demo_data;
    use crate::pipeline::CancellationToken;
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx_for(weeks: u32) -> RunContext {
        let fixture = demo_data::minimum_feasible_store();
        RunContext::new(
            Arc::new(RunConfig::default()),
            fixture.store,
            Arc::new(fixture.employees),
            Arc::new(fixture.shift_codes),
            fixture.start_date,
            weeks,
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    #[test]
    fn rejects_invalid_horizon_weeks() {
        let mut ctx = ctx_for(3);
        let mut agent = DemandAgent;
        let err = agent.run(&mut ctx).unwrap_err();
        assert!(matches!(err, RosterError::Input(InputError::InvalidHorizonWeeks { weeks: 3 })));
    }

    #[test]
    fn weekend_uplift_raises_required_headcount() {
        let mut ctx = ctx_for(1);
        let mut agent = DemandAgent;
        agent.run(&mut ctx).unwrap();
        let weekday = ctx.days.iter().find(|d| !d.is_weekend).unwrap();
        let weekend = ctx.days.iter().find(|d| d.is_weekend).unwrap();
        assert!(weekend.demand.opening >= weekday.demand.opening);
    }

    #[test]
    fn rejects_horizon_misaligned_availability() {
        let mut fixture = demo_data::minimum_feasible_store();
        fixture.employees[0]
            .availability
            .insert(fixture.start_date + ChronoDuration::days(30), crate::domain::Availability::Available);
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
        let mut agent = DemandAgent;
        let err = agent.run(&mut ctx).unwrap_err();
        assert!(matches!(err, RosterError::Input(InputError::HorizonMisaligned { weeks: 1, .. })));
    }

    #[test]
    fn opening_and_closing_always_at_least_one() {
        let mut ctx = ctx_for(1);
        let mut agent = DemandAgent;
        agent.run(&mut ctx).unwrap();
        for day in &ctx.days {
            assert!(day.demand.opening >= 1);
            assert!(day.demand.closing >= 1);
        }
    }
}
