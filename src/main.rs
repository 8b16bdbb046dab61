use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use lift_dispatch::config::{
    DEFAULT_CAPACITY, DEFAULT_FLOOR_DELAY_MS, DEFAULT_MAX_FLOOR, DEFAULT_MIN_FLOOR, DEFAULT_UNITS,
};
use lift_dispatch::sim::{self, BenchParams};
use lift_dispatch::{DispatchConfig, DispatchResult, Floor, logging};

#[derive(Parser)]
#[command(name = "lift_dispatch")]
#[command(about = "Multi-elevator dispatch simulation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    system: SystemArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the fixed four-request demo (default)
    Demo,
    /// Hammer one configuration with concurrent producers and print a CSV row
    Bench(BenchArgs),
    /// Sweep unit and capacity sets and print one CSV row per combination
    Stress {
        /// Unit counts to try, comma-separated
        #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 4, 8])]
        unit_sets: Vec<usize>,

        /// Queue capacities to try, comma-separated
        #[arg(long, value_delimiter = ',', default_values_t = [1usize, 4, 16])]
        capacity_sets: Vec<usize>,

        #[command(flatten)]
        bench: BenchArgs,
    },
}

#[derive(Args, Clone)]
struct SystemArgs {
    /// Number of elevator units
    #[arg(long, global = true, default_value_t = DEFAULT_UNITS)]
    units: usize,

    /// Pending-request capacity of each unit
    #[arg(long, global = true, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    #[arg(long, global = true, default_value_t = DEFAULT_MIN_FLOOR, allow_negative_numbers = true)]
    min_floor: Floor,

    #[arg(long, global = true, default_value_t = DEFAULT_MAX_FLOOR, allow_negative_numbers = true)]
    max_floor: Floor,

    /// Starting floor of every unit (defaults to min-floor)
    #[arg(long, global = true, allow_negative_numbers = true)]
    origin_floor: Option<Floor>,

    /// Simulated transit time per floor in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_FLOOR_DELAY_MS)]
    floor_delay_ms: u64,
}

impl SystemArgs {
    fn to_config(&self) -> DispatchConfig {
        DispatchConfig {
            units: self.units,
            capacity: self.capacity,
            min_floor: self.min_floor,
            max_floor: self.max_floor,
            origin_floor: self.origin_floor.unwrap_or(self.min_floor),
            floor_delay: Duration::from_millis(self.floor_delay_ms),
        }
    }
}

#[derive(Args, Clone)]
struct BenchArgs {
    /// Concurrent request producers
    #[arg(long, default_value_t = 4)]
    producers: usize,

    #[arg(long, default_value_t = 25)]
    requests_per_producer: usize,

    /// Seed for the request generator
    #[arg(long, default_value_t = 2432)]
    seed: u64,

    /// Cross-check accepted against completed requests
    #[arg(long)]
    validate: bool,
}

impl BenchArgs {
    fn to_params(&self, config: DispatchConfig) -> BenchParams {
        BenchParams {
            config,
            producers: self.producers,
            requests_per_producer: self.requests_per_producer,
            seed: self.seed,
            validate: self.validate,
        }
    }
}

fn run(cli: Cli) -> DispatchResult<()> {
    let config = cli.system.to_config();
    match cli.command.unwrap_or(Command::Demo) {
        Command::Demo => sim::run_demo(&config),
        Command::Bench(bench) => sim::run_benchmark(&bench.to_params(config)),
        Command::Stress {
            unit_sets,
            capacity_sets,
            bench,
        } => sim::run_stress(&bench.to_params(config), &unit_sets, &capacity_sets),
    }
}

fn main() -> ExitCode {
    logging::init("info");
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
