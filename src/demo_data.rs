//! Synthetic store/employee/shift-code generators for the `/demo-data`
//! endpoints and the boundary-scenario tests (spec.md §8). Retargeted
//! from the teacher's `demo_data.rs` (seeded `StdRng`, weighted
//! distribution picker, name permutation generator) from hospital shifts
//! to retail/fast-food stations and canonical shift codes.

use std::collections::HashMap;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::{Availability, DemandProfile, Employee, EmploymentType, Interval, ShiftCode, StoreProfile};

pub const STATIONS: [&str; 4] = ["Grill", "Counter", "Drive-Thru", "Prep"];

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn default_start_date() -> NaiveDate {
    // A fixed Monday, so weekday/weekend fixtures are deterministic.
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

/// The catalog every fixture shares: one off code, four time-slot codes
/// per station, and two station-less manager codes (a manager's presence
/// covers an interval regardless of which station they float to).
pub fn canonical_shift_codes() -> Vec<ShiftCode> {
    let mut codes = vec![ShiftCode::off("/")];

    let slots: [(&str, f64, (u32, u32), (u32, u32), &[Interval]); 4] = [
        ("S", 4.0, (11, 0), (15, 0), &[Interval::LunchPeak]),
        ("1F", 8.0, (6, 30), (14, 30), &[Interval::Opening, Interval::LunchPeak]),
        ("2F", 8.0, (11, 0), (19, 0), &[Interval::LunchPeak, Interval::DinnerPeak]),
        ("3F", 8.0, (15, 0), (23, 0), &[Interval::DinnerPeak, Interval::Closing]),
    ];

    for station in STATIONS {
        for (code, hours, start, end, intervals) in &slots {
            codes.push(ShiftCode {
                code: format!("{code}-{station}"),
                hours: *hours,
                station: Some(station.to_string()),
                window: Some((time(start.0, start.1), time(end.0, end.1))),
                requires_manager: false,
                is_peak_covering: intervals
                    .iter()
                    .any(|i| matches!(i, Interval::LunchPeak | Interval::DinnerPeak)),
                covered_intervals: intervals.iter().copied().collect(),
            });
        }
    }

    codes.push(ShiftCode {
        code: "SC".to_string(),
        hours: 8.0,
        station: None,
        window: Some((time(15, 0), time(23, 0))),
        requires_manager: true,
        is_peak_covering: true,
        covered_intervals: [Interval::DinnerPeak, Interval::Closing].into_iter().collect(),
    });
    codes.push(ShiftCode {
        code: "M".to_string(),
        hours: 8.0,
        station: None,
        window: Some((time(6, 30), time(14, 30))),
        requires_manager: true,
        is_peak_covering: true,
        covered_intervals: [Interval::Opening, Interval::LunchPeak].into_iter().collect(),
    });

    codes
}

fn flat_demand(opening: u32, lunch_peak: u32, dinner_peak: u32, closing: u32) -> DemandProfile {
    DemandProfile { opening, lunch_peak, dinner_peak, closing }
}

fn uniform_availability(start: NaiveDate, num_days: i64, availability: Availability) -> HashMap<NaiveDate, Availability> {
    (0..num_days)
        .map(|offset| (start + ChronoDuration::days(offset), availability))
        .collect()
}

/// A fully built scenario: store, employees, shift codes, and the
/// horizon start date they were authored against.
pub struct DemoFixture {
    pub store: StoreProfile,
    pub employees: Vec<Employee>,
    pub shift_codes: Vec<ShiftCode>,
    pub start_date: NaiveDate,
}

/// Boundary scenario 1 (spec.md §8): a 7-day horizon, base demand of 1
/// at every interval — the smallest store a feasible roster can be built
/// for. No single shift code spans both Opening (06:30) and Closing
/// (23:00), and the max-consecutive-days rule (spec.md §4.3 #6) caps any
/// one manager at 6 of the 7 days, so one manager can never keep
/// `manager_on_duty[day, interval] ≥ 1` (spec.md §4.3 #7) satisfied on
/// every day by themselves. Three managers rotate instead: two cover
/// opening-through-lunch and dinner-through-closing respectively on their
/// six working days, and a third (part-time) backfills whichever of the
/// two takes their day off, so every day still has a manager spanning
/// the full Opening..Closing run.
pub fn minimum_feasible_store() -> DemoFixture {
    let start = default_start_date();
    let availability = uniform_availability(start, 7, Availability::Available);

    let mut manager_a = Employee::new("e-mgr-a", "Priya", EmploymentType::FullTime, true, "Grill");
    manager_a.availability = availability.clone();

    let mut manager_b = Employee::new("e-mgr-b", "Morgan", EmploymentType::FullTime, true, "Counter");
    manager_b.availability = availability.clone();

    let mut manager_c = Employee::new("e-mgr-c", "Jordan", EmploymentType::PartTime, true, "Prep");
    manager_c.availability = availability.clone();

    let mut crew_a = Employee::new("e-crew-a", "Sam", EmploymentType::FullTime, false, "Counter")
        .with_cross_trained(["Grill"]);
    crew_a.availability = availability.clone();

    let mut crew_b = Employee::new("e-crew-b", "Alex", EmploymentType::PartTime, false, "Drive-Thru")
        .with_cross_trained(["Prep"]);
    crew_b.availability = availability;

    DemoFixture {
        store: StoreProfile {
            opening_time: time(6, 0),
            closing_time: time(23, 0),
            base_headcount: flat_demand(1, 1, 1, 1),
        },
        employees: vec![manager_a, manager_b, manager_c, crew_a, crew_b],
        shift_codes: canonical_shift_codes(),
        start_date: start,
    }
}

/// Boundary scenario 2: exactly one manager, unavailable mid-horizon —
/// the roster cannot keep `NoManagerOnDuty` from firing on that day
/// without the Resolver's repair pass. Drops the backfill managers
/// `minimum_feasible_store` needs for scenario 1's per-interval coverage
/// so the single remaining manager's absence is genuinely unfillable.
pub fn manager_scarcity_store() -> DemoFixture {
    let start = default_start_date();
    let mut fixture = minimum_feasible_store();
    fixture.employees.retain(|e| !e.is_manager || e.id == "e-mgr-a");
    let unavailable_day = start + ChronoDuration::days(2);
    fixture.employees[0].availability.insert(unavailable_day, Availability::Unavailable);
    fixture
}

/// Boundary scenario 3: three crew members all marking the same two days
/// unavailable, driving base coverage below what remains feasible for
/// Opening/Closing without conflicts.
pub fn unavailability_overload_store() -> DemoFixture {
    let start = default_start_date();
    let mut fixture = minimum_feasible_store();
    for day_offset in [3, 4] {
        let date = start + ChronoDuration::days(day_offset);
        for employee in fixture.employees.iter_mut().filter(|e| !e.is_manager) {
            employee.availability.insert(date, Availability::Unavailable);
        }
    }
    fixture
}

/// Boundary scenario 4: a 14-day horizon whose weekend uplift roughly
/// doubles peak-interval demand relative to weekdays.
pub fn weekend_uplift_store() -> DemoFixture {
    let start = default_start_date();
    let availability = uniform_availability(start, 14, Availability::Available);
    let employees: Vec<Employee> = (0..6)
        .map(|i| {
            let mut e = if i == 0 {
                Employee::new(format!("e-{i}"), format!("Employee {i}"), EmploymentType::FullTime, true, STATIONS[i % STATIONS.len()])
            } else {
                Employee::new(
                    format!("e-{i}"),
                    format!("Employee {i}"),
                    EmploymentType::FullTime,
                    false,
                    STATIONS[i % STATIONS.len()],
                )
            };
            e.availability = availability.clone();
            e
        })
        .collect();

    DemoFixture {
        store: StoreProfile {
            opening_time: time(6, 0),
            closing_time: time(23, 0),
            base_headcount: flat_demand(1, 2, 2, 1),
        },
        employees,
        shift_codes: canonical_shift_codes(),
        start_date: start,
    }
}

/// Boundary scenario 5: a part-time employee whose availability exactly
/// spans their `min_weekly_hours`/`max_weekly_hours` window, so a correct
/// solver must land exactly on the boundary rather than drift past it.
pub fn hours_boundary_store() -> DemoFixture {
    let start = default_start_date();
    let mut fixture = minimum_feasible_store();
    // Part-timer: window is (15.0, 38.0); four 8h shifts across the week
    // plus a 4h shift lands at 36h, inside the window but close to max.
    let crew_b = fixture.employees.iter_mut().find(|e| e.id == "e-crew-b").expect("fixture has e-crew-b");
    crew_b.min_weekly_hours = 15.0;
    crew_b.max_weekly_hours = 16.0;
    fixture
}

/// Boundary scenario 6: an employee preferred to close one day and open
/// the next, which a 10h rest rule must refuse even though both
/// individual shifts are otherwise eligible.
pub fn rest_gap_store() -> DemoFixture {
    let start = default_start_date();
    let mut fixture = minimum_feasible_store();
    let close_day = start + ChronoDuration::days(1);
    let open_day = start + ChronoDuration::days(2);
    for employee in fixture.employees.iter_mut().filter(|e| !e.is_manager) {
        employee.availability.insert(close_day, Availability::Preferred);
        employee.availability.insert(open_day, Availability::Preferred);
    }
    fixture
}

/// Looks up one of the six named boundary scenarios by id, for the
/// `GET /demo-data/{id}` endpoint.
pub fn named_scenario(id: &str) -> Option<DemoFixture> {
    match id {
        "minimum-feasible" => Some(minimum_feasible_store()),
        "manager-scarcity" => Some(manager_scarcity_store()),
        "unavailability-overload" => Some(unavailability_overload_store()),
        "weekend-uplift" => Some(weekend_uplift_store()),
        "hours-boundary" => Some(hours_boundary_store()),
        "rest-gap" => Some(rest_gap_store()),
        _ => None,
    }
}

pub const SCENARIO_IDS: [&str; 6] = [
    "minimum-feasible",
    "manager-scarcity",
    "unavailability-overload",
    "weekend-uplift",
    "hours-boundary",
    "rest-gap",
];

/// A larger, randomized store for manual exploration, mirroring the
/// teacher's own `demo_data.rs` seeded-`StdRng` weighted generator.
pub fn random_demo_store(seed: u64, num_employees: usize, horizon_days: i64) -> DemoFixture {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = default_start_date();
    let availability_weights = [
        (Availability::Unavailable, 0.1),
        (Availability::Available, 0.7),
        (Availability::Preferred, 0.2),
    ];

    let first_names = ["Sam", "Alex", "Priya", "Jordan", "Morgan", "Casey", "Riley", "Taylor"];
    let employment_types = [EmploymentType::FullTime, EmploymentType::PartTime, EmploymentType::Casual];

    let mut employees = Vec::with_capacity(num_employees);
    for i in 0..num_employees {
        let is_manager = i < (num_employees / 5).max(1);
        let name = first_names[i % first_names.len()];
        let primary = STATIONS[rng.gen_range(0..STATIONS.len())];
        let employment_type = if is_manager {
            EmploymentType::FullTime
        } else {
            *employment_types.choose(&mut rng).unwrap()
        };

        let mut employee = Employee::new(format!("e-{i}"), format!("{name} {i}"), employment_type, is_manager, primary);
        let cross_trained: Vec<&str> = STATIONS
            .iter()
            .filter(|s| **s != primary)
            .filter(|_| rng.gen_bool(0.3))
            .copied()
            .collect();
        employee = employee.with_cross_trained(cross_trained);

        for offset in 0..horizon_days {
            let date = start + ChronoDuration::days(offset);
            let roll: f64 = rng.gen();
            let mut cumulative = 0.0;
            let mut chosen = Availability::Available;
            for (availability, weight) in availability_weights {
                cumulative += weight;
                if roll <= cumulative {
                    chosen = availability;
                    break;
                }
            }
            employee.availability.insert(date, chosen);
        }

        employees.push(employee);
    }

    DemoFixture {
        store: StoreProfile {
            opening_time: time(6, 0),
            closing_time: time(23, 0),
            base_headcount: flat_demand(1, 2, 2, 1),
        },
        employees,
        shift_codes: canonical_shift_codes(),
        start_date: start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_feasible_store_has_five_employees_three_managers() {
        let fixture = minimum_feasible_store();
        assert_eq!(fixture.employees.len(), 5);
        assert_eq!(fixture.employees.iter().filter(|e| e.is_manager).count(), 3);
    }

    #[test]
    fn manager_scarcity_store_has_exactly_one_manager() {
        let fixture = manager_scarcity_store();
        assert_eq!(fixture.employees.iter().filter(|e| e.is_manager).count(), 1);
    }

    #[test]
    fn every_named_scenario_resolves() {
        for id in SCENARIO_IDS {
            assert!(named_scenario(id).is_some(), "missing scenario {id}");
        }
        assert!(named_scenario("not-a-scenario").is_none());
    }

    #[test]
    fn manager_scarcity_leaves_manager_unavailable_one_day() {
        let fixture = manager_scarcity_store();
        let unavailable_days = fixture.employees[0]
            .availability
            .values()
            .filter(|a| **a == Availability::Unavailable)
            .count();
        assert_eq!(unavailable_days, 1);
    }

    #[test]
    fn random_demo_store_covers_full_horizon_for_every_employee() {
        let fixture = random_demo_store(7, 10, 7);
        for employee in &fixture.employees {
            assert_eq!(employee.availability.len(), 7);
        }
    }
}
