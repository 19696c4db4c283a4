//! ECLSS Headless Simulation Harness
//!
//! Plays scripted anomaly episodes against the engine on a virtual clock and
//! checks the game rules end to end, including the JSON request layer.
//! Runs entirely in-process with no networking.
//!
//! Usage:
//!   cargo run -p eclss-simtest
//!   cargo run -p eclss-simtest -- --verbose
//!   cargo run -p eclss-simtest -- --config eclss.json

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use eclss_core::prelude::*;
use eclss_logic::anomaly::{Constraint, Direction};
use eclss_logic::metrics::{MetricKind, MetricStatus};
use eclss_logic::resolution::NASA_FACTS;
use eclss_server::dispatch;
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ── CLI ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
struct HarnessArgs {
    verbose: bool,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<HarnessArgs, String> {
    let mut parsed = HarnessArgs::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" | "-v" => parsed.verbose = true,
            "--config" => match iter.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => return Err("--config needs a path".into()),
            },
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(parsed)
}

/// Engine logs go through the `log` facade; the fmt subscriber picks them up.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

const SWEEP_SEEDS: u64 = 200;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();

    let base = match &args.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        None => EngineConfig::default(),
    };

    println!("=== ECLSS Anomaly Harness ===\n");

    let mut results = Vec::new();

    // 1. Catalog consistency
    results.extend(validate_catalog(verbose));

    // 2. Lock stability across reads
    results.extend(validate_lock_stability(&base, verbose));

    // 3. Thermal branch / answer agreement
    results.extend(validate_thermal_branches(&base, verbose));

    // 4. Action resolution state machine
    results.extend(validate_action_resolution(&base, verbose));

    // 5. Respawn on the virtual clock
    results.extend(validate_respawn(&base, verbose));

    // 6. JSON request layer
    results.extend(validate_request_layer(&base, verbose));

    // 7. Concurrent first reads
    results.extend(validate_concurrency(&base, verbose));

    // 8. Background ticker
    results.extend(validate_ticker(&base, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn engine_for(
    base: &EngineConfig,
    seed: u64,
    initial: Option<AnomalyKind>,
) -> AnomalyEngine<ManualClock> {
    let config = EngineConfig {
        seed: Some(seed),
        initial_anomaly: initial,
        ..base.clone()
    };
    AnomalyEngine::with_clock(config, ManualClock::new())
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(verbose: bool) -> Vec<TestResult> {
    println!("--- Anomaly Catalog ---");
    let mut results = Vec::new();

    for kind in AnomalyKind::all() {
        let def = kind.definition();
        let ids: Vec<i64> = def.solutions.iter().map(|s| s.id).collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        results.push(TestResult {
            name: format!("catalog_{}_unique_ids", kind.tag().to_lowercase()),
            passed: unique.len() == ids.len() && !ids.is_empty(),
            detail: format!("{} solutions: {:?}", ids.len(), ids),
        });

        let shape_ok = match (kind, &def.constraint) {
            (AnomalyKind::Temp, Constraint::Complex(_)) => true,
            (AnomalyKind::Temp, Constraint::Simple { .. }) => false,
            (_, Constraint::Simple { .. }) => true,
            (_, Constraint::Complex(_)) => false,
        };
        results.push(TestResult {
            name: format!("catalog_{}_constraint_shape", kind.tag().to_lowercase()),
            passed: shape_ok,
            detail: format!("{} affects {}", def.title, def.metric),
        });
    }

    if verbose {
        println!("  {} anomaly kinds checked", AnomalyKind::all().len());
    }
    results
}

// ── 2. Lock stability ───────────────────────────────────────────────────

fn validate_lock_stability(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Lock Stability ---");
    let mut results = Vec::new();

    for kind in AnomalyKind::all() {
        let mut unstable = 0;
        let mut out_of_band = 0;
        for seed in 0..SWEEP_SEEDS {
            let engine = engine_for(base, seed, Some(*kind));
            let metric = kind.definition().metric;
            let first = engine.current_readings();
            let locked = first[&metric].clone();
            if (0..10).any(|_| engine.current_readings()[&metric] != locked) {
                unstable += 1;
            }
            let others_nominal = first.iter().filter(|(m, _)| **m != metric).all(|(m, r)| {
                let spec = m.spec();
                r.status == MetricStatus::Nominal && r.value >= spec.min && r.value <= spec.max
            });
            if !others_nominal {
                out_of_band += 1;
            }
        }
        results.push(TestResult {
            name: format!("lock_{}_stable", kind.tag().to_lowercase()),
            passed: unstable == 0,
            detail: format!("{}/{} seeds drifted", unstable, SWEEP_SEEDS),
        });
        results.push(TestResult {
            name: format!("lock_{}_others_nominal", kind.tag().to_lowercase()),
            passed: out_of_band == 0,
            detail: format!("{}/{} seeds had a stray metric", out_of_band, SWEEP_SEEDS),
        });
    }

    if verbose {
        println!("  {} seeds per kind", SWEEP_SEEDS);
    }
    results
}

// ── 3. Thermal branches ─────────────────────────────────────────────────

fn validate_thermal_branches(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Thermal Branches ---");
    let mut results = Vec::new();

    let mut counts = [0u32; 4]; // crit-low, crit-high, caution-low, caution-high
    let mut mismatched = 0;
    for seed in 0..SWEEP_SEEDS {
        let engine = engine_for(base, seed, Some(AnomalyKind::Temp));
        engine.current_readings();
        let Some(lock) = engine.snapshot().lock else {
            mismatched += 1;
            continue;
        };
        let slot = match (lock.status, lock.direction) {
            (MetricStatus::Critical, Some(Direction::Low)) => 0,
            (MetricStatus::Critical, Some(Direction::High)) => 1,
            (MetricStatus::Caution, Some(Direction::Low)) => 2,
            _ => 3,
        };
        counts[slot] += 1;

        let correct: Vec<i64> = engine
            .recommendations()
            .iter()
            .filter(|s| s.is_correct)
            .map(|s| s.id)
            .collect();
        let expected = match lock.direction {
            Some(Direction::Low) => vec![2],
            _ => vec![1],
        };
        if correct != expected {
            mismatched += 1;
        }
    }

    results.push(TestResult {
        name: "thermal_all_branches_reached".into(),
        passed: counts.iter().all(|c| *c > 0),
        detail: format!(
            "crit-low {} / crit-high {} / caution-low {} / caution-high {}",
            counts[0], counts[1], counts[2], counts[3]
        ),
    });
    results.push(TestResult {
        name: "thermal_answer_matches_direction".into(),
        passed: mismatched == 0,
        detail: format!("{}/{} seeds mismatched", mismatched, SWEEP_SEEDS),
    });

    if verbose {
        println!("  branch histogram: {:?}", counts);
    }
    results
}

// ── 4. Action resolution ────────────────────────────────────────────────

fn validate_action_resolution(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Action Resolution ---");
    let mut results = Vec::new();

    let engine = engine_for(base, 1, Some(AnomalyKind::Co2));
    engine.current_readings();
    let before = engine.snapshot();

    let wrong = engine.submit_action(2);
    results.push(TestResult {
        name: "action_wrong_is_failure".into(),
        passed: matches!(&wrong, Ok(ActionOutcome::Failed { message, .. }) if message.contains("CO2"))
            && engine.snapshot() == before,
        detail: format!("{:?}", wrong),
    });

    let unknown = engine.submit_action(99);
    results.push(TestResult {
        name: "action_unknown_is_error".into(),
        passed: unknown == Err(ActionError::UnknownActionId(99)) && engine.snapshot() == before,
        detail: format!("{:?}", unknown),
    });

    let right = engine.submit_action(1);
    let fact_ok = matches!(&right, Ok(ActionOutcome::Resolved { nasa_fact, .. }) if NASA_FACTS.contains(nasa_fact));
    results.push(TestResult {
        name: "action_correct_resolves".into(),
        passed: fact_ok
            && engine.active_anomaly().is_none()
            && engine.active_anomaly_info().is_none(),
        detail: format!("{:?}", right),
    });

    let again = engine.submit_action(1);
    results.push(TestResult {
        name: "action_resubmit_is_error".into(),
        passed: again == Err(ActionError::NoActiveAnomaly),
        detail: format!("{:?}", again),
    });

    if verbose {
        println!("  CO2 walkthrough complete");
    }
    results
}

// ── 5. Respawn ──────────────────────────────────────────────────────────

fn validate_respawn(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Respawn ---");
    let mut results = Vec::new();

    let delay = base.respawn_delay();
    let half = delay / 2;
    let mut early = 0;
    let mut missing = 0;
    let mut kinds_seen = Vec::new();
    for seed in 0..SWEEP_SEEDS {
        let engine = engine_for(base, seed, Some(AnomalyKind::Pressure));
        engine.current_readings();
        if engine.submit_action(1).is_err() {
            missing += 1;
            continue;
        }
        engine.clock().advance(half);
        if engine.tick().is_some() {
            early += 1;
        }
        engine.clock().advance(delay - half);
        match engine.active_anomaly() {
            Some(kind) if engine.snapshot().lock.is_none() => {
                if !kinds_seen.contains(&kind) {
                    kinds_seen.push(kind);
                }
            }
            _ => missing += 1,
        }
    }

    results.push(TestResult {
        name: "respawn_not_early".into(),
        passed: early == 0 || half.is_zero(),
        detail: format!("{} early respawns", early),
    });
    results.push(TestResult {
        name: "respawn_fires_on_time".into(),
        passed: missing == 0,
        detail: format!("{}/{} seeds did not respawn", missing, SWEEP_SEEDS),
    });
    results.push(TestResult {
        name: "respawn_covers_all_kinds".into(),
        passed: kinds_seen.len() == AnomalyKind::all().len(),
        detail: format!("kinds seen: {:?}", kinds_seen),
    });

    if verbose {
        println!("  respawn delay {:?}", delay);
    }
    results
}

// ── 6. Request layer ────────────────────────────────────────────────────

fn validate_request_layer(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Request Layer ---");
    let mut results = Vec::new();

    let engine = engine_for(base, 5, Some(AnomalyKind::Co2));

    let data = dispatch(&engine, "GET", "/get_data", None);
    let co2 = &data.body[MetricKind::CarbonDioxide.name()];
    results.push(TestResult {
        name: "api_get_data".into(),
        passed: data.status_code == 200 && co2["status"] == "CAUTION",
        detail: format!("CO₂ reading: {}", co2),
    });

    let predictions = dispatch(&engine, "GET", "/get_predictions", None);
    results.push(TestResult {
        name: "api_get_predictions".into(),
        passed: predictions.body["kind"] == "CO2" && predictions.body["priority"] == "HIGH",
        detail: format!("title: {}", predictions.body["title"]),
    });

    let missing = dispatch(&engine, "POST", "/execute_action", Some(r#"{"foo": 1}"#));
    results.push(TestResult {
        name: "api_missing_action_id".into(),
        passed: missing.status_code == 400 && missing.body["status"] == "error",
        detail: missing.body.to_string(),
    });

    let success = dispatch(
        &engine,
        "POST",
        "/execute_action",
        Some(&json!({"action_id": 1}).to_string()),
    );
    results.push(TestResult {
        name: "api_execute_success".into(),
        passed: success.body["status"] == "success" && success.body["nasa_fact"].is_string(),
        detail: success.body.to_string(),
    });

    let after = dispatch(&engine, "GET", "/get_predictions", None);
    results.push(TestResult {
        name: "api_predictions_empty_after_fix".into(),
        passed: after.body == json!({}),
        detail: after.body.to_string(),
    });

    if verbose {
        println!("  GET and POST routes exercised");
    }
    results
}

// ── 7. Concurrency ──────────────────────────────────────────────────────

fn validate_concurrency(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Concurrent Reads ---");
    let mut results = Vec::new();
    let threads = 8;

    let mut diverged = 0;
    for seed in 0..20 {
        let engine = Arc::new(engine_for(base, seed, Some(AnomalyKind::Temp)));
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    engine.current_readings()[&MetricKind::CabinTemperature].clone()
                })
            })
            .collect();
        let seen: Vec<_> = handles.into_iter().filter_map(|h| h.join().ok()).collect();
        if seen.len() != threads || seen.windows(2).any(|w| w[0] != w[1]) {
            diverged += 1;
        }
    }

    results.push(TestResult {
        name: "concurrent_first_reads_agree".into(),
        passed: diverged == 0,
        detail: format!("{}/20 runs diverged across {} threads", diverged, threads),
    });

    if verbose {
        println!("  {} threads per run", threads);
    }
    results
}

// ── 8. Background ticker ────────────────────────────────────────────────

fn validate_ticker(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Background Ticker ---");
    let mut results = Vec::new();

    let config = EngineConfig {
        seed: Some(3),
        initial_anomaly: Some(AnomalyKind::Co2),
        ..base.clone()
    };
    let engine = AnomalyEngine::start_with_clock(config, ManualClock::new());
    let interval = engine.config().ticker_interval();
    engine.current_readings();
    let resolved = engine.submit_action(1).is_ok();
    engine.clock().advance(engine.config().respawn_delay());

    // Snapshots never apply a respawn themselves, so only the ticker can flip this.
    let budget = interval * 20 + Duration::from_millis(500);
    let step = Duration::from_millis(5);
    let mut waited = Duration::ZERO;
    while engine.snapshot().active.is_none() && waited < budget {
        thread::sleep(step);
        waited += step;
    }

    results.push(TestResult {
        name: "ticker_respawns_idle_engine".into(),
        passed: resolved && engine.snapshot().active.is_some(),
        detail: format!("interval {:?}, waited {:?}", interval, waited),
    });

    if verbose {
        println!("  ticker interval {:?}", interval);
    }
    results
}
