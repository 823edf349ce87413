use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use line_control::{CommandSource, EconomyConfig, LineAutopilot};
use line_core::{EventLevel, LineContent, LineState, MetricsFileWriter};
use line_world::{build_initial_state, load_content};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "line_cli", about = "Boba line station coordination CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the line under the autopilot for a fixed number of ticks.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    ticks: u64,
    /// Build a fresh line with this seed. Mutually exclusive with --state.
    #[arg(long, conflicts_with = "state_file")]
    seed: Option<u64>,
    /// Resume from a saved LineState JSON file. Mutually exclusive with --seed.
    #[arg(long = "state", conflicts_with = "seed")]
    state_file: Option<String>,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    print_every: u64,
    #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
    event_level: String,
    /// Sample metrics every N ticks.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    metrics_every: u64,
    /// Skip writing the runs/ directory.
    #[arg(long)]
    no_metrics: bool,
}

impl RunArgs {
    fn event_level(&self) -> EventLevel {
        match self.event_level.as_str() {
            "debug" => EventLevel::Debug,
            _ => EventLevel::Normal,
        }
    }
}

// ---------------------------------------------------------------------------
// Run setup
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunInfo<'a> {
    run_id: &'a str,
    seed: u64,
    started_at_unix: u64,
    content_version: &'a str,
    ticks: u64,
    metrics_every: u64,
    print_every: u64,
    runner: &'static str,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_run_info(dir: &Path, info: &RunInfo<'_>) -> Result<()> {
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// `economy.json` is optional; without it sales carry no modifiers.
fn load_economy(content_dir: &str) -> Result<EconomyConfig> {
    let path = Path::new(content_dir).join("economy.json");
    if !path.exists() {
        warn!(path = %path.display(), "no economy file, using defaults");
        return Ok(EconomyConfig::default());
    }
    let text = std::fs::read_to_string(&path).context("reading economy.json")?;
    serde_json::from_str(&text).context("parsing economy.json")
}

fn initial_line(args: &RunArgs, content: &LineContent) -> Result<(LineState, ChaCha8Rng)> {
    if let Some(path) = &args.state_file {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file: {path}"))?;
        let loaded: LineState =
            serde_json::from_str(&json).with_context(|| format!("parsing state file: {path}"))?;
        let rng = ChaCha8Rng::seed_from_u64(loaded.meta.seed);
        return Ok((loaded, rng));
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let state = build_initial_state(content, seed, &mut rng);
    Ok((state, rng))
}

fn open_metrics(
    args: &RunArgs,
    state: &LineState,
    content: &LineContent,
) -> Result<Option<MetricsFileWriter>> {
    if args.no_metrics {
        return Ok(None);
    }
    let started_at_unix = unix_now();
    let run_id = format!("{started_at_unix}_seed{}", state.meta.seed);
    let run_dir = create_run_dir(&run_id)?;
    write_run_info(
        &run_dir,
        &RunInfo {
            run_id: &run_id,
            seed: state.meta.seed,
            started_at_unix,
            content_version: &content.content_version,
            ticks: args.ticks,
            metrics_every: args.metrics_every,
            print_every: args.print_every,
            runner: "line_cli",
        },
    )?;
    let writer = MetricsFileWriter::new(run_dir.clone())
        .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
    println!("Run directory: {}", run_dir.display());
    Ok(Some(writer))
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn run(args: &RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;
    let economy = load_economy(&args.content_dir)?;
    let (mut state, mut rng) = initial_line(args, &content)?;
    let mut metrics_writer = open_metrics(args, &state, &content)?;
    let event_level = args.event_level();

    let mut autopilot = LineAutopilot::new(&economy);
    let mut next_command_id = state.counters.next_command_id;

    info!(
        ticks = args.ticks,
        seed = state.meta.seed,
        stations = state.stations.len(),
        employees = state.employees.len(),
        "starting run"
    );
    println!(
        "Starting line: ticks={} seed={} stations={} employees={} content_version={}",
        args.ticks,
        state.meta.seed,
        state.stations.len(),
        state.employees.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    for _ in 0..args.ticks {
        let commands = autopilot.generate_commands(&state, &content, &mut next_command_id);
        let events = line_core::tick(&mut state, &commands, &content, &mut rng, event_level);
        autopilot.observe(&events, &mut rng);

        for event in &events {
            print_notable(&event.event, state.meta.tick);
        }

        if state.meta.tick % args.print_every == 0 {
            print_status(&state, &content, &autopilot);
        }

        if let Some(ref mut writer) = metrics_writer {
            if state.meta.tick % args.metrics_every == 0 {
                let snapshot = line_core::compute_metrics(&state);
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", state.meta.tick);
    print_status(&state, &content, &autopilot);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }

    Ok(())
}

fn print_notable(event: &line_core::Event, tick: u64) {
    match event {
        line_core::Event::UpgradeApplied {
            station_id,
            upgrade_id,
            level,
        } => {
            println!("*** UPGRADE: {upgrade_id} lvl {level} on {station_id} at tick={tick:05} ***");
        }
        line_core::Event::EmployeeFellAsleep { employee_id } => {
            println!("*** {employee_id} fell asleep at tick={tick:05} ***");
        }
        _ => {}
    }
}

fn print_status(state: &LineState, content: &LineContent, autopilot: &LineAutopilot) {
    let tick = state.meta.tick;
    let seconds = tick as f32 * content.constants.tick_seconds;
    let metrics = line_core::compute_metrics(state);
    let ledger = autopilot.ledger();

    println!(
        "[tick={tick:05}  t={seconds:7.1}s]  \
         cups={cups:2}  sold={sold:4}  trashed={trashed:3}  \
         balance={balance:5}  crits={crits:3}  \
         asleep={asleep}/{staff}  upgrades={upgrades}",
        cups = metrics.cups_in_flight,
        sold = metrics.cups_sold,
        trashed = metrics.cups_discarded,
        balance = ledger.balance(),
        crits = ledger.crits,
        asleep = metrics.employees_asleep,
        staff = metrics.employees_total,
        upgrades = metrics.total_upgrade_levels,
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(filter))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args)?,
    }
    Ok(())
}
