use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{BufRead, BufReader};
use std::time::Instant;

use sumo_viewer::{
    config::ViewerConfig,
    registry::EntityRegistry,
    scene::{find_busiest_angle, HISTOGRAM_BUCKETS},
    session::{MessageOutcome, Session},
};

#[derive(Parser)]
#[command(name = "sumo-viewer")]
#[command(about = "Replay a captured SUMO viewer stream and report the mirrored state")]
struct Args {
    /// Network metadata file
    #[arg(short, long, default_value = "network.toml")]
    network: String,

    /// Vehicle class catalogue file
    #[arg(short = 'c', long, default_value = "vehicles.toml")]
    vehicles: String,

    /// Newline-delimited JSON capture of the backend stream
    #[arg(short, long)]
    messages: Option<String>,

    /// 360 whitespace-separated content counts, one per degree
    #[arg(long)]
    histogram: Option<String>,

    /// Camera field of view in degrees
    #[arg(long, default_value_t = 75.0)]
    fov: f64,

    /// Enable verbose logging for per-message details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting SUMO viewer (replay mode)");

    // Load configuration
    let config = ViewerConfig::load_from_files(&args.network, &args.vehicles)?;
    info!(
        "Loaded configuration: {} vehicle classes, {} light programs",
        config.vehicles.vehicle_classes.len(),
        config.network.tl_logic.len()
    );

    let mut session = Session::new(&config)?;

    if let Some(path) = &args.messages {
        replay(&mut session, path)?;
        print_summary(&session);
    }

    if let Some(path) = &args.histogram {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading histogram from {}", path))?;
        let histogram = content
            .split_whitespace()
            .map(|v| v.parse::<f64>().with_context(|| format!("bad histogram value '{}'", v)))
            .collect::<Result<Vec<_>>>()?;
        if histogram.len() != HISTOGRAM_BUCKETS {
            anyhow::bail!("Histogram must have {} buckets, got {}", HISTOGRAM_BUCKETS, histogram.len());
        }
        match find_busiest_angle(&histogram, args.fov) {
            Some(angle) => println!("Busiest heading: {}°", angle),
            None => println!("Busiest heading: none"),
        }
    }

    Ok(())
}

fn replay(session: &mut Session, path: &str) -> Result<()> {
    let file = std::fs::File::open(path).with_context(|| format!("opening capture {}", path))?;
    let start_time = Instant::now();
    let mut message_count = 0;
    let mut failures = 0;

    for (line_number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        message_count += 1;

        match session.handle_message(&line) {
            Ok(MessageOutcome::Snapshot { vehicles, lights }) => {
                log::debug!(
                    "t={:.1}s: vehicles +{} ~{} -{}, lights +{} ~{}, {} live",
                    session.stats().time / 1000.0,
                    vehicles.created,
                    vehicles.updated,
                    vehicles.removed,
                    lights.created,
                    lights.updated,
                    session.vehicles().len()
                );
            }
            Ok(MessageOutcome::State(status)) => {
                info!("Simulation is {:?}, delay {}ms", status, session.delay_ms());
            }
            Ok(MessageOutcome::Ignored) => {}
            Err(e) => {
                failures += 1;
                log::error!("Line {}: {}", line_number + 1, e);
            }
        }
    }

    info!(
        "Replayed {} messages ({} rejected) in {:.2}ms",
        message_count,
        failures,
        start_time.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn print_summary(session: &Session) {
    let stats = session.stats();
    println!("Simulation time: {:.1}s", stats.time / 1000.0);
    println!("Slowest step: {:.2}ms", stats.max_simulate_ms);

    println!("Live vehicles: {}", session.vehicles().len());
    for (class, count) in session.vehicles().vehicle_counts() {
        println!("  {:<12} {}", class, count);
    }

    println!("Traffic lights: {}", session.signals().len());
    session.signals().for_each_live(&mut |id, state| {
        println!(
            "  {:<12} program {} phase {}",
            id,
            state.program_id.as_deref().unwrap_or("-"),
            state.phase.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
        );
    });
}
