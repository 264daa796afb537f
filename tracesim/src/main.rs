use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;
use clap::{Parser, Subcommand};
use log::info;
use tracelib::config::{ReplacementPolicyConfig, ScenarioConfig};
use tracelib::io::map_trace;
use tracelib::simulator::Simulator;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Trace-driven cache simulator for array loop nests"))]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Overrides the replacement policy given in the configuration
    #[arg(long, value_enum, global = true)]
    policy: Option<ReplacementPolicyConfig>,

    #[arg(short, long, global = true)]
    performance: bool,

    #[arg(short, long, global = true, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs the program in a scenario file against its cache
    Run {
        scenario: String,

        /// Also writes every access to this file as a trace
        #[arg(short, long)]
        trace_out: Option<String>,
    },
    /// Replays a recorded trace against the cache in a configuration file
    Replay {
        config: String,
        trace: String,
    },
}

fn read_config(path: &str, policy: Option<ReplacementPolicyConfig>) -> Result<ScenarioConfig, String> {
    let config_file = File::open(path).map_err(|e| format!("Couldn't open the config file at path {path}: {e}"))?;
    let mut config: ScenarioConfig = serde_json::from_reader(BufReader::new(config_file))
        .map_err(|e| format!("Couldn't parse the config file: {e}"))?;
    if let Some(policy) = policy {
        config.cache.replacement_policy = policy;
    }
    Ok(config)
}

fn main() -> Result<(), String> {
    env_logger::init();
    let start = Instant::now();
    let args = Args::parse();
    let (config, simulator) = match &args.command {
        Command::Run { scenario, trace_out } => {
            let config = read_config(scenario, args.policy)?;
            let mut simulator = Simulator::new(&config).map_err(|e| format!("Invalid scenario: {e}"))?;
            let outcome = match trace_out {
                Some(path) => {
                    let trace_file = File::create(path).map_err(|e| format!("Couldn't create the trace file at path {path}: {e}"))?;
                    simulator.simulate_with_trace(BufWriter::new(trace_file))
                }
                None => simulator.simulate(),
            };
            outcome.map_err(|e| format!("Simulation failed: {e}"))?;
            (config, simulator)
        }
        Command::Replay { config, trace } => {
            let config = read_config(config, args.policy)?;
            let mut simulator = Simulator::new(&config).map_err(|e| format!("Invalid configuration: {e}"))?;
            let trace_file = File::open(trace).map_err(|e| format!("Couldn't open the trace file at path {trace}: {e}"))?;
            let bytes = map_trace(trace_file)?;
            simulator.replay(&bytes).map_err(|e| format!("Replay failed: {e}"))?;
            (config, simulator)
        }
    };
    info!("{}", simulator.cache());
    println!("{}", serde_json::to_string_pretty(simulator.result()).map_err(|e| format!("Couldn't serialise the output {e}"))?);
    if args.performance {
        let end = Instant::now();
        let simulation_time = simulator.get_execution_time();
        let total_time = end - start;
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        println!("Invalid cache blocks: {}", simulator.get_invalid_block_count());
    }
    Ok(())
}
