/// Playtest - seeded random playthroughs of a scenario.
///
/// Usage: playtest <scenario.json> [--runs <n>] [--seed <n>] [--max-steps <n>] [--json]
///
/// Prints how often each ending was reached and every run that stalled,
/// looped or failed. Exits 1 if any run did not reach an ending.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;
use vn_engine::core::config::SessionConfig;
use vn_engine::core::playtest::{random_playthrough, Outcome, PlaythroughReport};
use vn_engine::core::validator::validate;
use vn_engine::schema::scenario::Scenario;

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let scenario_path = &args[1];
    let mut runs: usize = 100;
    let mut seed: u64 = 42;
    let mut max_steps: usize = 500;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" if i + 1 < args.len() => {
                i += 1;
                runs = args[i].parse().unwrap_or(100);
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--max-steps" if i + 1 < args.len() => {
                i += 1;
                max_steps = args[i].parse().unwrap_or(500);
            }
            "--json" => json = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let scenario = match Scenario::load_from_json(Path::new(scenario_path)) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("ERROR: Failed to load scenario: {}", e);
            process::exit(1);
        }
    };
    let errors = validate(&scenario);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("ERROR: {}", error);
        }
        process::exit(1);
    }

    let config = SessionConfig::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let reports: Vec<PlaythroughReport> = (0..runs)
        .map(|_| {
            random_playthrough(
                &scenario,
                config.initial_variables,
                config.max_chain_steps,
                max_steps,
                &mut rng,
            )
        })
        .collect();

    if json {
        match serde_json::to_string_pretty(&reports) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_summary(&reports, seed);
    }

    let all_ended = reports
        .iter()
        .all(|report| matches!(report.outcome, Outcome::Ending(_)));
    if !all_ended {
        process::exit(1);
    }
}

fn print_summary(reports: &[PlaythroughReport], seed: u64) {
    println!("=== Playtest: {} runs, seed {} ===\n", reports.len(), seed);

    let mut endings: BTreeMap<&str, usize> = BTreeMap::new();
    let mut problems = Vec::new();
    for (run, report) in reports.iter().enumerate() {
        match &report.outcome {
            Outcome::Ending(id) => *endings.entry(id.as_str()).or_insert(0) += 1,
            Outcome::NoChoices { node_id } => {
                problems.push(format!("run {}: no visible choices at '{}'", run, node_id))
            }
            Outcome::Failed(reason) => problems.push(format!("run {}: {}", run, reason)),
            Outcome::ChainLimit { from } => {
                problems.push(format!("run {}: jump/branch loop entered at '{}'", run, from))
            }
            Outcome::StepLimit => {
                problems.push(format!("run {}: no ending after {} steps", run, report.steps))
            }
        }
    }

    println!("Endings:");
    for (id, count) in &endings {
        let share = *count as f64 / reports.len() as f64 * 100.0;
        println!("  {:<8} {:>5}  ({:.1}%)", id, count, share);
    }

    if !reports.is_empty() {
        let avg_steps =
            reports.iter().map(|r| r.steps).sum::<usize>() as f64 / reports.len() as f64;
        let avg_scenes =
            reports.iter().map(|r| r.scenes_seen).sum::<usize>() as f64 / reports.len() as f64;
        println!("\nAverage: {:.1} actions, {:.1} scenes per run", avg_steps, avg_scenes);
    }

    if !problems.is_empty() {
        println!("\nProblems ({}):", problems.len());
        for problem in &problems {
            println!("  {}", problem);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn print_usage() {
    println!(
        "Usage: playtest <scenario.json> [--runs <n>] [--seed <n>] [--max-steps <n>] [--json]"
    );
}
