//! Demo, benchmark, and stress-test runners for the dispatch system.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DispatchConfig;
use crate::controller::Controller;
use crate::error::{DispatchError, DispatchResult};
use crate::events::{Event, EventCounts, EventLog, EventSink, Fanout, LogSink};
use crate::types::{Floor, Request, UnitId};
use crate::unit::Unit;

/// Requests issued by the demo, in order.
pub const DEMO_REQUESTS: [(Floor, Floor); 4] = [(10, 12), (1, 7), (2, 5), (1, 9)];

const CSV_HEADER: &str = "units,capacity,producers,requests,accepted,rejected_full,rejected_invalid,completed,elapsed_ms,throughput_req_per_s,cpu_user_s,cpu_sys_s,lost,mismatch";

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: an all-zero rusage is a valid value for getrusage to fill in.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Run the fixed demo scenario and print a summary on stdout.
pub fn run_demo(config: &DispatchConfig) -> DispatchResult<()> {
    info!("[DEMO] start units={} capacity={}", config.units, config.capacity);

    let log = Arc::new(EventLog::new());
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(LogSink), log.clone()];
    let controller = Controller::new(config, Arc::new(Fanout::new(sinks)))?;
    let units: Vec<Arc<Unit>> = controller.units().to_vec();

    let start = Instant::now();
    for (source, destination) in DEMO_REQUESTS {
        match controller.request(source, destination) {
            Ok(unit) => info!("[DEMO] {source} -> {destination} assigned to unit {unit}"),
            Err(err) => warn!("[DEMO] {source} -> {destination} rejected: {err}"),
        }
    }
    let stats = controller.stats();
    controller.shutdown()?;
    info!("[DEMO] finished in {}ms", start.elapsed().as_millis());

    let events = log.snapshot();
    let floors_reached = events
        .iter()
        .filter(|event| matches!(event, Event::FloorReached { .. }))
        .count();
    let completed = events
        .iter()
        .filter(|event| matches!(event, Event::Completed { .. }))
        .count();
    let final_positions: Vec<Floor> = units.iter().map(|unit| unit.position()).collect();

    println!("DEMO SUMMARY");
    println!(
        "units={} capacity={} requests={}",
        config.units,
        config.capacity,
        DEMO_REQUESTS.len()
    );
    println!("accepted={}", stats.accepted);
    println!("rejected={}", stats.rejected());
    println!("completed={completed}");
    println!("floors_reached={floors_reached}");
    println!("final_positions={:?}", final_positions);
    Ok(())
}

/// Parameters of one benchmark run.
#[derive(Clone, Debug)]
pub struct BenchParams {
    pub config: DispatchConfig,
    pub producers: usize,
    pub requests_per_producer: usize,
    pub seed: u64,
    /// Record every event and cross-check accepted against completed requests.
    pub validate: bool,
}

/// Aggregated metrics from a single benchmark run.
struct BenchResult {
    units: usize,
    capacity: usize,
    producers: usize,
    requests: usize,
    accepted: usize,
    rejected_full: usize,
    rejected_invalid: usize,
    completed: usize,
    elapsed_ms: f64,
    throughput: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    mismatch: bool,
}

impl BenchResult {
    fn lost(&self) -> usize {
        self.accepted.saturating_sub(self.completed)
    }

    fn csv_row(&self) -> String {
        let cpu_user = self
            .cpu_user_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        let cpu_sys = self
            .cpu_sys_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        format!(
            "{},{},{},{},{},{},{},{},{:.2},{:.2},{},{},{},{}",
            self.units,
            self.capacity,
            self.producers,
            self.requests,
            self.accepted,
            self.rejected_full,
            self.rejected_invalid,
            self.completed,
            self.elapsed_ms,
            self.throughput,
            cpu_user,
            cpu_sys,
            self.lost(),
            self.mismatch
        )
    }
}

/// Accepted and completed requests per unit must match as multisets.
fn accepted_matches_completed(events: &[Event]) -> bool {
    let mut balance: HashMap<(UnitId, Request), i64> = HashMap::new();
    for event in events {
        match *event {
            Event::Accepted { unit, request } => *balance.entry((unit, request)).or_insert(0) += 1,
            Event::Completed { unit, request } => *balance.entry((unit, request)).or_insert(0) -= 1,
            Event::FloorReached { .. } => {}
        }
    }
    balance.values().all(|&count| count == 0)
}

fn benchmark_once(params: &BenchParams) -> DispatchResult<BenchResult> {
    let config = &params.config;
    let counts = Arc::new(EventCounts::new());
    let log = Arc::new(EventLog::new());
    let sink: Arc<dyn EventSink> = if params.validate {
        let sinks: Vec<Arc<dyn EventSink>> = vec![counts.clone(), log.clone()];
        Arc::new(Fanout::new(sinks))
    } else {
        counts.clone()
    };
    let controller = Controller::new(config, sink)?;
    let floors = controller.floors();
    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    thread::scope(|scope| -> DispatchResult<()> {
        for producer in 0..params.producers {
            let controller = &controller;
            let seed = params.seed.wrapping_add(producer as u64);
            thread::Builder::new()
                .name(format!("producer-{producer}"))
                .spawn_scoped(scope, move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for _ in 0..params.requests_per_producer {
                        let source = rng.random_range(floors.min()..=floors.max());
                        let destination = rng.random_range(floors.min()..=floors.max());
                        // Rejections are counted by the controller.
                        let _ = controller.request(source, destination);
                    }
                })?;
        }
        Ok(())
    })?;
    let stats = controller.stats();
    controller.shutdown()?;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let requests = params.producers * params.requests_per_producer;
    let throughput = if elapsed_ms > 0.0 {
        (requests as f64) / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };
    let mismatch = params.validate && !accepted_matches_completed(&log.snapshot());

    Ok(BenchResult {
        units: config.units,
        capacity: config.capacity,
        producers: params.producers,
        requests,
        accepted: stats.accepted,
        rejected_full: stats.rejected_full,
        rejected_invalid: stats.rejected_invalid,
        completed: counts.completed(),
        elapsed_ms,
        throughput,
        cpu_user_s,
        cpu_sys_s,
        mismatch,
    })
}

fn report(result: &BenchResult, validate: bool) {
    println!("{}", result.csv_row());
    if result.lost() > 0 {
        eprintln!("# warning,lost_requests,{}", result.lost());
    }
    if validate && result.mismatch {
        eprintln!("# violation,accepted_completed_mismatch");
    }
}

/// Run a single benchmark and print one CSV row.
pub fn run_benchmark(params: &BenchParams) -> DispatchResult<()> {
    if params.producers == 0 {
        return Err(DispatchError::Config("producers must be > 0".to_string()));
    }
    let result = benchmark_once(params)?;
    println!("{CSV_HEADER}");
    report(&result, params.validate);
    Ok(())
}

/// Sweep unit and capacity sets and print one CSV row per combination.
pub fn run_stress(
    base: &BenchParams,
    unit_sets: &[usize],
    capacity_sets: &[usize],
) -> DispatchResult<()> {
    if base.producers == 0 {
        return Err(DispatchError::Config("producers must be > 0".to_string()));
    }
    if unit_sets.iter().any(|&units| units == 0) {
        return Err(DispatchError::Config("unit sets must be > 0".to_string()));
    }
    let mut capacity_sets = capacity_sets.to_vec();
    if capacity_sets.iter().any(|&capacity| capacity == 0) {
        let before = capacity_sets.len();
        capacity_sets.retain(|&capacity| capacity > 0);
        eprintln!(
            "stress warning: ignored {} capacity set(s) <= 0",
            before - capacity_sets.len()
        );
        if capacity_sets.is_empty() {
            return Err(DispatchError::Config("capacity must be > 0".to_string()));
        }
    }

    println!("{CSV_HEADER}");
    for &units in unit_sets {
        for &capacity in &capacity_sets {
            let params = BenchParams {
                config: DispatchConfig {
                    units,
                    capacity,
                    ..base.config.clone()
                },
                ..base.clone()
            };
            let result = benchmark_once(&params)?;
            report(&result, params.validate);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quick_params(units: usize, capacity: usize) -> BenchParams {
        BenchParams {
            config: DispatchConfig {
                units,
                capacity,
                floor_delay: Duration::ZERO,
                ..DispatchConfig::default()
            },
            producers: 4,
            requests_per_producer: 10,
            seed: 7,
            validate: true,
        }
    }

    #[test]
    fn benchmark_accounts_for_every_request() {
        let result = benchmark_once(&quick_params(2, 3)).expect("benchmark");
        assert_eq!(result.requests, 40);
        assert_eq!(
            result.accepted + result.rejected_full + result.rejected_invalid,
            result.requests
        );
        assert_eq!(result.rejected_invalid, 0);
        assert_eq!(result.completed, result.accepted);
        assert_eq!(result.lost(), 0);
        assert!(!result.mismatch);
    }

    #[test]
    fn large_capacity_accepts_everything() {
        let result = benchmark_once(&quick_params(1, 40)).expect("benchmark");
        assert_eq!(result.accepted, 40);
        assert_eq!(result.completed, 40);
    }

    #[test]
    fn mismatch_detects_unserviced_request() {
        let request = Request::new(1, 2);
        let events = [
            Event::Accepted { unit: 1, request },
            Event::Accepted { unit: 1, request },
            Event::Completed { unit: 1, request },
        ];
        assert!(!accepted_matches_completed(&events));
        assert!(accepted_matches_completed(&events[1..]));
    }

    #[test]
    fn stress_rejects_zero_units() {
        let result = run_stress(&quick_params(1, 1), &[0], &[1]);
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }
}
