use clap::Parser;
use colored::Colorize;
use failure::Error;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::config::{format_time, SimulationSettings, SECONDS_IN_DAY};
use crate::discrete_system::Time;
use crate::discrete_system::address::Address;
use crate::simulator::{GasStationSimulator, SimulationResult, StationSystem};
use crate::station::monitor::{JsonDirectorySink, MemorySink, SampleSink};

mod config;
mod discrete_system;
mod sampling;
mod simulator;
mod station;

/// Simulates a gas station: cars queueing for pumps and cashiers while pumps
/// keep breaking down.
#[derive(Parser, Debug)]
#[command(name = "gas-station", version)]
struct Args {
    /// JSON file with simulation settings, built-in defaults otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run for
    #[arg(long, default_value_t = 30 * SECONDS_IN_DAY)]
    horizon: Time,

    /// Overrides the seed from the settings
    #[arg(long)]
    seed: Option<u64>,

    /// Print every delivered event
    #[arg(long)]
    trace: bool,

    /// Print the customer records as JSON
    #[arg(long)]
    json: bool,

    /// Directory receiving hourly resource usage snapshots
    #[arg(long)]
    monitor_dir: Option<PathBuf>,
}

fn describe(system: &StationSystem, address: Address) -> String {
    system
        .components
        .get(&address)
        .map(|component| component.label())
        .unwrap_or_else(|| format!("Departed({})", address))
}

fn describe_message(message: &station::Event) -> String {
    match message {
        station::Event::ResourceGranted(kind, token) => format!("Granted {} {}", kind, token),
        station::Event::Preempted(token) => format!("Preempted {}", token).red().to_string(),
        station::Event::CarDispatcherEvent(event) => match event {
            station::car_dispatcher::Event::CarArrives => "Car arrives".to_string(),
            station::car_dispatcher::Event::CarLeft(record) => format!("Car {} left", record.number),
        },
        station::Event::CustomerEvent(event) => match event {
            station::customer::Event::FuelingFinished(attempt) => format!("Fueling finished (attempt {})", attempt),
            station::customer::Event::InteractionFinished => "Payment finished".to_string(),
            station::customer::Event::FoodPrepared => "Hot-dog prepared".to_string(),
            station::customer::Event::FoodPickedUp => "Hot-dog picked up".to_string(),
        },
        station::Event::PumpBreakerEvent(event) => match event {
            station::pump_breaker::Event::Break => "Pump breaks".yellow().to_string(),
            station::pump_breaker::Event::Repaired => "Pump repaired".green().to_string(),
        },
    }
}

fn print_summary(result: &SimulationResult) {
    let summary = result.summary();

    println!("{}", format!("After {}", format_time(result.horizon, true)).bold());
    println!("  cars arrived:          {}", summary.arrivals);
    println!("  cars served:           {}", summary.departed.to_string().green());
    println!("  cars missed:           {}", summary.rejected.to_string().red());
    println!("  cars still at station: {}", summary.still_at_station);
    println!("  hot-dogs sold:         {}", summary.hot_dogs);
    println!("  fuel sold:             {}", summary.fuel_sold);
    println!("  pump breakdowns:       {}", summary.breakdowns);
    println!("  fueling interruptions: {}", summary.interruptions);

    match summary.mean_wait_for_pump {
        Some(wait) => println!("  mean wait for a pump:  {}", format_time(wait as Time, false)),
        None => println!("  mean wait for a pump:  -"),
    }
}

fn run(args: Args) -> Result<(), Error> {
    let mut settings = match &args.config {
        Some(path) => config::load_settings(path)?,
        None => SimulationSettings::default(),
    };

    if let Some(seed) = args.seed {
        settings.seed = seed;
    }

    let simulator = GasStationSimulator::new(settings)?;

    let result = match (&args.monitor_dir, args.trace) {
        (None, false) => simulator.run(args.horizon),
        (directory, trace) => {
            let sink: Box<dyn SampleSink> = match directory {
                Some(directory) => Box::new(JsonDirectorySink::new(directory.clone())?),
                None => Box::new(MemorySink::new()),
            };

            simulator.run_with(args.horizon, sink, |system, events| {
                if !trace {
                    return;
                }

                for event in events {
                    println!(
                        "In {} - {} sending to {} - {}",
                        format_time(system.current_time, true).dimmed(),
                        describe(system, event.from_address).cyan(),
                        describe(system, event.to_address).cyan(),
                        describe_message(&event.message)
                    );
                }
            })
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.records_by_arrival())?);
    }

    print_summary(&result);

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .without_time()
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("{} {}", "error:".red().bold(), error);
        process::exit(1);
    }
}
