//! Run configuration: an immutable value constructed once per run (spec.md
//! §9 — "Global state: None; all state lives in a per-run context record.
//! Configuration... is passed as an immutable value at run start").
//!
//! Defaults match the values spec.md fixes explicitly; everything here is
//! overridable via an optional TOML file for the operational tuning spec.md
//! §9's Open Questions call for.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Objective weights for the Scheduler's soft terms (spec.md §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub coverage_shortfall_peak: f64,
    pub skill_preference: f64,
    pub hours_dispersion: f64,
    pub weekend_equity: f64,
    pub preferred_day_bonus: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            coverage_shortfall_peak: 100.0,
            skill_preference: 1.0,
            hours_dispersion: 2.0,
            weekend_equity: 1.0,
            preferred_day_bonus: 2.0,
        }
    }
}

/// Demand-shaping knobs consumed by the Demand Agent (spec.md §4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandKnobs {
    pub weekend_uplift_pct: f64,
    pub peak_uplift_pct: f64,
}

impl Default for DemandKnobs {
    fn default() -> Self {
        Self {
            weekend_uplift_pct: 0.20,
            peak_uplift_pct: 0.30,
        }
    }
}

/// Labor-rule constants (spec.md §4.3 hard constraints #5, #6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborRules {
    pub daily_max_hours: f64,
    pub min_rest_hours: f64,
    pub max_consecutive_days: u32,
}

impl Default for LaborRules {
    fn default() -> Self {
        Self {
            daily_max_hours: 10.0,
            min_rest_hours: 10.0,
            max_consecutive_days: 6,
        }
    }
}

/// The top-level immutable configuration value for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub weights: ObjectiveWeights,
    pub demand: DemandKnobs,
    pub labor: LaborRules,
    /// Default solver time limit in seconds (spec.md §4.3: default 120s).
    pub default_time_limit_seconds: u64,
    /// Hard cap on any requested time limit (spec.md §4.3: 180s).
    pub max_time_limit_seconds: u64,
    /// Resolver iteration cap `R` (spec.md §4.5, default 3).
    pub resolver_max_iterations: u32,
    /// Cap on solver-internal worker threads; `0` means "available cores".
    pub worker_threads: usize,
    /// Share of the run's total wall-clock budget the Scheduler's initial
    /// solve is allowed to consume; the remainder is reserved for the
    /// Resolver's repair loop (spec.md §4.5: "re-invoke the Scheduler with
    /// a reduced time budget"). The Scheduler would otherwise run to the
    /// global deadline and leave the Resolver nothing to work with.
    pub scheduler_budget_fraction: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            weights: ObjectiveWeights::default(),
            demand: DemandKnobs::default(),
            labor: LaborRules::default(),
            default_time_limit_seconds: 120,
            max_time_limit_seconds: 180,
            resolver_max_iterations: 3,
            worker_threads: 0,
            scheduler_budget_fraction: 0.6,
        }
    }
}

impl RunConfig {
    /// Loads overrides from a TOML document, falling back to defaults for
    /// any field the document omits.
    pub fn from_toml_str(text: &str) -> Result<Self, InputError> {
        toml::from_str(text).map_err(|e| InputError::MalformedConfig(e.to_string()))
    }

    /// Clamps a requested time limit to `[0, max_time_limit_seconds]`.
    pub fn clamp_time_limit(&self, requested_seconds: u64) -> Duration {
        Duration::from_secs(requested_seconds.min(self.max_time_limit_seconds))
    }

    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            self.worker_threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.default_time_limit_seconds, 120);
        assert_eq!(cfg.max_time_limit_seconds, 180);
        assert_eq!(cfg.resolver_max_iterations, 3);
        assert_eq!(cfg.labor.min_rest_hours, 10.0);
        assert_eq!(cfg.labor.max_consecutive_days, 6);
        assert_eq!(cfg.demand.weekend_uplift_pct, 0.20);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = RunConfig::from_toml_str("resolver_max_iterations = 5\n").unwrap();
        assert_eq!(cfg.resolver_max_iterations, 5);
        assert_eq!(cfg.default_time_limit_seconds, 120);
    }

    #[test]
    fn clamp_time_limit_respects_hard_cap() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.clamp_time_limit(300).as_secs(), 180);
        assert_eq!(cfg.clamp_time_limit(60).as_secs(), 60);
    }
}
