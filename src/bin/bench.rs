//! Benchmark for the local-search scorer's full-recompute throughput.
//!
//! Run with: cargo run --release --bin bench

use std::sync::Arc;
use std::time::{Duration, Instant};

use roster_engine::config::RunConfig;
use roster_engine::demand::DemandAgent;
use roster_engine::demo_data;
use roster_engine::matcher::MatcherAgent;
use roster_engine::pipeline::{CancellationToken, PipelineAgent, RunContext};
use roster_engine::solver::{ConstraintModel, LocalSearchModel};

fn main() {
    let fixture = demo_data::random_demo_store(1, 120, 28);
    let config = Arc::new(RunConfig::default());

    let mut ctx = RunContext::new(
        config.clone(),
        fixture.store,
        Arc::new(fixture.employees),
        Arc::new(fixture.shift_codes),
        fixture.start_date,
        4,
        Duration::from_secs(300),
        CancellationToken::new(),
    );
    DemandAgent.run(&mut ctx).unwrap();
    MatcherAgent.run(&mut ctx).unwrap();

    println!("Benchmark: Local-Search Full-Recompute Scoring");
    println!("  Employees: {}", ctx.employees.len());
    println!("  Days: {}", ctx.days.len());
    println!();

    let mut model = LocalSearchModel::build(
        ctx.employees.as_ref().clone(),
        ctx.days.clone(),
        ctx.shift_codes.as_ref().clone(),
        ctx.skill_matching.clone().unwrap(),
        config.weights,
        config.labor,
        None,
        &[],
        42,
    );

    let init_start = Instant::now();
    let outcome = model.solve_with_deadline(Instant::now() + Duration::from_secs(2));
    println!("First 2s solve: {:?} score after ({:?})", outcome, init_start.elapsed());
    println!();

    let bench_start = Instant::now();
    let mut recomputes: u64 = 0;
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        let _ = model.current_score();
        recomputes += 1;
    }
    let elapsed = bench_start.elapsed();
    let per_sec = recomputes as f64 / elapsed.as_secs_f64();

    println!("Results:");
    println!("  Full-recomputes: {}", recomputes);
    println!("  Time: {:.2?}", elapsed);
    println!("  Recomputes/sec: {:.0}", per_sec);
    println!("  Final score: {}", model.current_score());
}
