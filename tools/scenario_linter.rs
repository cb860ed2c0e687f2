/// Scenario Linter - validates node references and flags authoring smells.
///
/// Usage: scenario_linter <scenario.json> [--strict]

use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;
use vn_engine::core::validator::{lint, validate};
use vn_engine::schema::node::NodeKind;
use vn_engine::schema::scenario::Scenario;

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: scenario_linter <scenario.json> [--strict]");
        process::exit(0);
    }

    let scenario_path = &args[1];
    let mut strict = false;

    for arg in &args[2..] {
        match arg.as_str() {
            "--strict" => strict = true,
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(2);
            }
        }
    }

    let scenario = match Scenario::load_from_json(Path::new(scenario_path)) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("ERROR: Failed to load scenario: {}", e);
            process::exit(1);
        }
    };

    print_summary(&scenario);

    let errors = validate(&scenario);
    let warnings = lint(&scenario);

    println!("\n=== Scenario Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() || (strict && !warnings.is_empty()) {
        process::exit(1);
    }
}

fn print_summary(scenario: &Scenario) {
    let title = if scenario.meta.title.is_empty() {
        "(untitled)"
    } else {
        scenario.meta.title.as_str()
    };
    println!("Loaded '{}' ({} nodes, start '{}')", title, scenario.nodes.len(), scenario.start);

    let kinds = [
        NodeKind::Scene,
        NodeKind::Choice,
        NodeKind::Jump,
        NodeKind::Branch,
        NodeKind::End,
    ];
    for kind in kinds {
        let count = scenario
            .nodes
            .values()
            .filter(|node| node.kind() == kind)
            .count();
        println!("  {:<7} {}", kind.name(), count);
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
