// CLI entry point: run a sandbox colony headless.
//
// Builds a starter room in the in-memory `Sandbox` (one spawn, a level-1
// controller and `--sources` sources), then drives the controller for
// `--ticks` ticks, advancing the sandbox between ticks. Prints a short
// population summary every `--report-every` ticks and at the end. Logging
// goes through `tracing`; set `RUST_LOG=hive_sim=debug` to watch task
// transitions.
//
// Usage:
//   hive [OPTIONS]
//     --ticks <N>           Ticks to run (default: 1500)
//     --sources <N>         Sources in the starter room (default: 2)
//     --room <NAME>         Starter room name (default: W1N1)
//     --config <PATH>       HiveConfig JSON; missing fields keep defaults
//     --memory <PATH>       Memory JSON whose colony records (cached levels and
//                           free-form fields) carry over; unit records are
//                           dropped since the starter room has no units
//     --report-every <N>    Summary interval in ticks, 0 for end only (default: 100)
//     --dump-memory         Print the final memory as JSON

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use hive_sim::object::ObjectKind;
use hive_sim::{Find, HiveConfig, Intent, Memory, Role, Sandbox, TaskRegistry, World, run_tick};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a drone colony in the sandbox host", long_about = None)]
struct Args {
    /// Ticks to run
    #[arg(long, default_value_t = 1500)]
    ticks: u64,

    /// Sources in the starter room
    #[arg(long, default_value_t = 2)]
    sources: usize,

    /// Starter room name
    #[arg(long, default_value = "W1N1")]
    room: String,

    /// HiveConfig JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Memory JSON file; only its colony records carry over
    #[arg(long)]
    memory: Option<PathBuf>,

    /// Summary interval in ticks (0: only at the end)
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Print the final memory as JSON
    #[arg(long)]
    dump_memory: bool,
}

/// Running totals over the whole run.
#[derive(Debug, Default)]
struct Totals {
    harvested: u64,
    delivered: u64,
    spawned: u64,
    upgrades: u64,
    built: u64,
}

impl Totals {
    fn record(&mut self, intent: &Intent) {
        match intent {
            Intent::Harvest { amount, .. } => self.harvested += u64::from(*amount),
            Intent::Transfer { amount, .. } => self.delivered += u64::from(*amount),
            Intent::Spawn { .. } => self.spawned += 1,
            Intent::Upgrade { .. } => self.upgrades += 1,
            Intent::Build { .. } => self.built += 1,
            _ => {}
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => HiveConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }),
        None => HiveConfig::default(),
    };
    let mut memory = match &args.memory {
        Some(path) => colony_records_only(load_memory(path)),
        None => Memory::default(),
    };

    let registry = TaskRegistry::standard();
    let mut sandbox = Sandbox::starter(&args.room, args.sources);
    let mut totals = Totals::default();
    info!(room = %args.room, sources = args.sources, ticks = args.ticks, "starting sandbox run");

    for _ in 0..args.ticks {
        let report = run_tick(&mut sandbox, &mut memory, &config, &registry);
        if !report.skipped.is_empty() {
            warn!(tick = report.tick, skipped = ?report.skipped, "rooms skipped");
        }
        for intent in sandbox.take_intents() {
            totals.record(&intent);
        }
        sandbox.advance();
        if args.report_every > 0 && sandbox.time() % args.report_every == 0 {
            print_summary(&sandbox, &memory, &args.room, &totals);
        }
    }
    print_summary(&sandbox, &memory, &args.room, &totals);

    if args.dump_memory {
        match memory.to_json_pretty() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to encode memory: {e}");
                process::exit(1);
            }
        }
    }
}

fn load_memory(path: &Path) -> Memory {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read memory {}: {e}", path.display());
        process::exit(1);
    });
    Memory::from_json(&json).unwrap_or_else(|e| {
        eprintln!("Failed to parse memory {}: {e}", path.display());
        process::exit(1);
    })
}

/// Keep the colony records of a loaded memory. Its unit records name creeps
/// the fresh starter room does not have.
fn colony_records_only(mut memory: Memory) -> Memory {
    if !memory.creeps.is_empty() {
        warn!(dropped = memory.creeps.len(), "unit records do not carry over into a fresh room");
        memory.creeps.clear();
    }
    memory
}

fn print_summary(sandbox: &Sandbox, memory: &Memory, room: &str, totals: &Totals) {
    let mut roles: BTreeMap<Role, usize> = BTreeMap::new();
    for record in memory.creeps.values() {
        *roles.entry(record.role.clone()).or_default() += 1;
    }
    let controller = sandbox
        .find(room, Find::Structures)
        .into_iter()
        .find_map(|s| match s.kind {
            ObjectKind::Controller {
                level,
                progress,
                progress_total,
                ..
            } => Some(format!("RCL {level} ({progress}/{progress_total})")),
            _ => None,
        })
        .unwrap_or_else(|| "no controller".to_string());
    let level = memory.colonies.get(room).map_or(0, |c| c.level);

    println!("=== tick {} ===", sandbox.time());
    println!("  colony {room}: level {level}, {controller}");
    let population: Vec<String> = roles.iter().map(|(role, n)| format!("{role}={n}")).collect();
    println!("  drones: {}", population.join(" "));
    println!(
        "  harvested {} delivered {} upgrades {} build actions {} spawned {}",
        totals.harvested, totals.delivered, totals.upgrades, totals.built, totals.spawned
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_memory_keeps_colony_records() {
        let json = r#"{
            "creeps": {"miner_4": {"colony": "W1N1", "role": "miner", "task": null}},
            "colonies": {"W1N1": {"level": 2, "note": "kept"}}
        }"#;
        let memory = colony_records_only(Memory::from_json(json).unwrap());
        assert!(memory.creeps.is_empty());
        assert_eq!(memory.colonies["W1N1"].level, 2);
        assert_eq!(memory.colonies["W1N1"].extra["note"], "kept");
    }
}
