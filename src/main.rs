use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use strum::IntoEnumIterator;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use fair_readers_writers::{run_simulation, sync::GatePolicy, Population, RunReport, SimConfig};

#[derive(Parser)]
#[command(name = "fair-readers-writers")]
#[command(version)]
#[command(about = "Readers-writers simulation with a FIFO gate and wait-time metrics")]
struct Cli {
    /// Number of readers, asked for on stdin when missing
    #[arg(allow_negative_numbers = true)]
    readers: Option<i64>,

    /// Number of writers, asked for on stdin when missing
    #[arg(allow_negative_numbers = true)]
    writers: Option<i64>,

    /// TOML file with simulation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admission gate: semaphore or ticket
    #[arg(long, value_parser = parse_gate)]
    gate: Option<GatePolicy>,

    /// Seed for arrival delays
    #[arg(long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(gate) = cli.gate {
        config.gate = gate;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let readers = match cli.readers {
        Some(n) => n,
        None => prompt_count("number of readers")?,
    };
    let writers = match cli.writers {
        Some(n) => n,
        None => prompt_count("number of writers")?,
    };

    let population = Population::new(readers, writers)?;
    let report = run_simulation(population, &config)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn parse_gate(name: &str) -> Result<GatePolicy, String> {
    GatePolicy::from_str(name).map_err(|_| {
        format!(
            "unknown gate {name:?}, use one of {}",
            GatePolicy::iter()
                .map(|g| g.to_string())
                .collect::<Vec<String>>()
                .join(",")
        )
    })
}

fn prompt_count(label: &str) -> Result<i64> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    line.parse()
        .with_context(|| format!("{label}: expected an integer, got {line:?}"))
}

fn print_report(report: &RunReport) {
    let m = &report.metrics;
    println!();
    println!("=== run metrics ({} gate) ===", report.gate);
    println!("total duration:        {:.3} s", m.total_duration);
    println!("mean wait per actor:   {:.3} s", m.mean_wait);
    println!("throughput:            {:.3} ops/s", m.throughput);
    println!("fairness (std dev):    {:.3} s", m.fairness);
    println!("sync overhead:         {:.6} s", m.overhead);
    for role in &report.roles {
        println!(
            "{:<7} x{:<4} mean wait {:.3} s, max wait {:.3} s",
            role.role, role.actors, role.mean_wait, role.max_wait
        );
    }
    println!(
        "peak concurrent readers: {}, exclusion violations: {}",
        report.occupancy.peak_readers, report.occupancy.violations
    );
    println!();
    println!("final resource value: {}", report.final_value);
}
