//! Domain model: employees, shift codes, days, the decoded roster, and
//! the conflicts/agent-state records the pipeline produces along the way.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tensor::AssignmentGrid;

/// How an employee is engaged. Determines the default weekly-hours window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Casual,
}

impl EmploymentType {
    /// Default `(min, max)` weekly hours window for this employment type.
    pub fn default_hours_window(self) -> (f64, f64) {
        match self {
            EmploymentType::FullTime => (38.0, 48.0),
            EmploymentType::PartTime => (15.0, 38.0),
            EmploymentType::Casual => (0.0, 38.0),
        }
    }
}

/// An employee's stated availability for a single day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Unavailable,
    Available,
    Preferred,
}

/// A named staffing interval within the trading day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interval {
    Opening,
    LunchPeak,
    DinnerPeak,
    Closing,
}

impl Interval {
    pub const ALL: [Interval; 4] = [
        Interval::Opening,
        Interval::LunchPeak,
        Interval::DinnerPeak,
        Interval::Closing,
    ];
}

/// A single employee, read-only for the duration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub employment_type: EmploymentType,
    pub is_manager: bool,
    pub primary_station: String,
    #[serde(default)]
    pub cross_trained_stations: HashSet<String>,
    pub max_weekly_hours: f64,
    pub min_weekly_hours: f64,
    #[serde(default)]
    pub availability: HashMap<NaiveDate, Availability>,
}

impl Employee {
    /// Builds an employee with the default weekly-hours window for its
    /// employment type. `min_weekly_hours` is clamped to 0 for casuals
    /// as required by the data model invariant.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        employment_type: EmploymentType,
        is_manager: bool,
        primary_station: impl Into<String>,
    ) -> Self {
        let (min, max) = employment_type.default_hours_window();
        Self {
            id: id.into(),
            name: name.into(),
            employment_type,
            is_manager,
            primary_station: primary_station.into(),
            cross_trained_stations: HashSet::new(),
            max_weekly_hours: max,
            min_weekly_hours: min,
            availability: HashMap::new(),
        }
    }

    pub fn with_cross_trained(mut self, stations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cross_trained_stations.extend(stations.into_iter().map(Into::into));
        self
    }

    pub fn with_availability(mut self, date: NaiveDate, availability: Availability) -> Self {
        self.availability.insert(date, availability);
        self
    }

    /// Availability on `date`, defaulting to `Available` if unspecified
    /// (callers that must enforce the "defined for every horizon day"
    /// invariant check for missing entries explicitly; see `InputError`).
    pub fn availability_on(&self, date: NaiveDate) -> Availability {
        self.availability.get(&date).copied().unwrap_or(Availability::Available)
    }

    /// Whether `station` is a station this employee can staff at all
    /// (primary or cross-trained).
    pub fn can_staff(&self, station: &str) -> bool {
        self.primary_station == station || self.cross_trained_stations.contains(station)
    }
}

/// A canonical shift code: a symbol selecting a (station, hours, clock
/// window, manager-required) tuple. `window = None` marks an off day
/// (`/`, 0 hours).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCode {
    pub code: String,
    pub hours: f64,
    pub station: Option<String>,
    pub window: Option<(NaiveTime, NaiveTime)>,
    pub requires_manager: bool,
    pub is_peak_covering: bool,
    /// Precomputed at catalog-build time: which named intervals this
    /// shift's clock window overlaps.
    #[serde(default)]
    pub covered_intervals: HashSet<Interval>,
}

impl ShiftCode {
    pub fn off(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            hours: 0.0,
            station: None,
            window: None,
            requires_manager: false,
            is_peak_covering: false,
            covered_intervals: HashSet::new(),
        }
    }

    pub fn is_off(&self) -> bool {
        self.window.is_none()
    }

    pub fn covers(&self, interval: Interval) -> bool {
        self.covered_intervals.contains(&interval)
    }
}

/// Base headcount per interval, either the store's raw template or a
/// day's fully-derived requirement (weekday/weekend and peak uplift
/// already applied, rounded up).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DemandProfile {
    pub opening: u32,
    pub lunch_peak: u32,
    pub dinner_peak: u32,
    pub closing: u32,
}

impl DemandProfile {
    pub fn get(&self, interval: Interval) -> u32 {
        match interval {
            Interval::Opening => self.opening,
            Interval::LunchPeak => self.lunch_peak,
            Interval::DinnerPeak => self.dinner_peak,
            Interval::Closing => self.closing,
        }
    }

    pub fn set(&mut self, interval: Interval, value: u32) {
        match interval {
            Interval::Opening => self.opening = value,
            Interval::LunchPeak => self.lunch_peak = value,
            Interval::DinnerPeak => self.dinner_peak = value,
            Interval::Closing => self.closing = value,
        }
    }
}

/// A single day in the planning horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub demand: DemandProfile,
}

/// The store's physical/operational profile: opening/closing clock times
/// and the base (pre-uplift) headcount per interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProfile {
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub base_headcount: DemandProfile,
}

/// A decoded roster: the outcome of the Scheduler, possibly repaired by
/// the Resolver, frozen once the pipeline exits.
#[derive(Debug, Clone)]
pub struct Roster {
    pub employees: Arc<Vec<Employee>>,
    pub days: Arc<Vec<Day>>,
    pub shift_codes: Arc<Vec<ShiftCode>>,
    pub grid: AssignmentGrid,
}

impl Roster {
    pub fn new(
        employees: Arc<Vec<Employee>>,
        days: Arc<Vec<Day>>,
        shift_codes: Arc<Vec<ShiftCode>>,
        grid: AssignmentGrid,
    ) -> Self {
        Self { employees, days, shift_codes, grid }
    }

    #[inline]
    pub fn code_index(&self, employee_idx: usize, day_idx: usize) -> usize {
        self.grid.get(employee_idx, day_idx)
    }

    #[inline]
    pub fn code(&self, employee_idx: usize, day_idx: usize) -> &ShiftCode {
        &self.shift_codes[self.code_index(employee_idx, day_idx)]
    }

    pub fn is_working(&self, employee_idx: usize, day_idx: usize) -> bool {
        !self.code(employee_idx, day_idx).is_off()
    }

    pub fn total_hours(&self, employee_idx: usize) -> f64 {
        (0..self.days.len())
            .map(|d| self.code(employee_idx, d).hours)
            .sum()
    }

    pub fn employee_idx_by_id(&self, id: &str) -> Option<usize> {
        self.employees.iter().position(|e| e.id == id)
    }

    pub fn day_idx_by_date(&self, date: NaiveDate) -> Option<usize> {
        self.days.iter().position(|d| d.date == date)
    }

    /// True if at least one manager is assigned a code covering `interval`
    /// on day `day_idx`.
    pub fn manager_on_duty(&self, day_idx: usize, interval: Interval) -> bool {
        self.employees.iter().enumerate().any(|(e, emp)| {
            emp.is_manager && self.code(e, day_idx).covers(interval)
        })
    }

    /// Headcount actually covering `interval` on `day_idx`.
    pub fn coverage(&self, day_idx: usize, interval: Interval) -> u32 {
        (0..self.employees.len())
            .filter(|&e| self.code(e, day_idx).covers(interval))
            .count() as u32
    }
}

/// Severity of a conflict/violation, ordered so that `Critical` sorts
/// first ("select the highest-severity unresolved conflict").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// Taxonomy of roster violations (spec.md §4.4).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    WeeklyHoursOverflow,
    WeeklyHoursUnderflow,
    ConsecutiveDaysExceeded,
    InsufficientRest,
    NoManagerOnDuty,
    PeakUndercoverage,
    OpeningOrClosingUncovered,
    StationSkillMismatch,
    WeekendUpliftMissed,
    PreferenceIgnored,
}

impl ConflictKind {
    pub fn severity(self) -> Severity {
        use ConflictKind::*;
        match self {
            WeeklyHoursOverflow | ConsecutiveDaysExceeded | InsufficientRest | NoManagerOnDuty => {
                Severity::Critical
            }
            WeeklyHoursUnderflow | PeakUndercoverage | OpeningOrClosingUncovered => Severity::High,
            StationSkillMismatch => Severity::Medium,
            WeekendUpliftMissed | PreferenceIgnored => Severity::Low,
        }
    }
}

/// A single detected violation, tagged by severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub days: Vec<NaiveDate>,
}

impl Conflict {
    pub fn new(kind: ConflictKind, description: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            description: description.into(),
            employee_id: None,
            days: Vec::new(),
        }
    }

    pub fn with_employee(mut self, id: impl Into<String>) -> Self {
        self.employee_id = Some(id.into());
        self
    }

    pub fn with_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.days.extend(days);
        self
    }
}

/// Lifecycle state of a pipeline stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Per-stage state snapshot, appended to the workflow log as each agent
/// finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub name: String,
    pub status: AgentStatus,
    pub last_action: String,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl AgentState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AgentStatus::Idle,
            last_action: String::new(),
            context: HashMap::new(),
        }
    }
}

/// Overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employment_type_defaults() {
        assert_eq!(EmploymentType::FullTime.default_hours_window(), (38.0, 48.0));
        assert_eq!(EmploymentType::PartTime.default_hours_window(), (15.0, 38.0));
        assert_eq!(EmploymentType::Casual.default_hours_window(), (0.0, 38.0));
    }

    #[test]
    fn availability_defaults_to_available() {
        let emp = Employee::new("e1", "Jo", EmploymentType::Casual, false, "Grill");
        let d = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(emp.availability_on(d), Availability::Available);
    }

    #[test]
    fn can_staff_primary_and_cross_trained() {
        let emp = Employee::new("e1", "Jo", EmploymentType::PartTime, false, "Grill")
            .with_cross_trained(["Counter"]);
        assert!(emp.can_staff("Grill"));
        assert!(emp.can_staff("Counter"));
        assert!(!emp.can_staff("Drive-Thru"));
    }

    #[test]
    fn conflict_kind_severity_matches_table() {
        assert_eq!(ConflictKind::WeeklyHoursOverflow.severity(), Severity::Critical);
        assert_eq!(ConflictKind::WeeklyHoursUnderflow.severity(), Severity::High);
        assert_eq!(ConflictKind::StationSkillMismatch.severity(), Severity::Medium);
        assert_eq!(ConflictKind::PreferenceIgnored.severity(), Severity::Low);
    }

    #[test]
    fn severity_orders_critical_first() {
        let mut v = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        v.sort();
        assert_eq!(v, vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]);
    }
}
