//! Arcana client - command line tools
//!
//! Replays recorded server event logs through the client core and inspects
//! ability targeting against recorded positions.

use anyhow::{bail, Context, Result};
use arcana_client::{
    config::ClientConfig,
    core::{ArcanaKind, Side},
    game::{
        load_event_log, GameClient, LegalMoveTable, PlacementSnapshot, ServerEvent,
        TargetingSession, VerbosityLevel,
    },
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "arcana")]
#[command(about = "Arcana chess client core - replay and inspection tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event log and print the tracked entities after each snapshot
    Replay {
        /// Newline-delimited JSON event log
        #[arg(value_name = "EVENTS")]
        events: PathBuf,

        /// Side the client plays
        #[arg(long, default_value = "white")]
        side: Side,

        /// Verbosity level (silent/0, minimal/1, normal/2, verbose/3)
        #[arg(long, short = 'v')]
        verbosity: Option<VerbosityLevel>,

        /// Client configuration file (JSON)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
    },

    /// List the valid target squares for an ability in the last recorded position
    Targets {
        #[arg(value_name = "EVENTS")]
        events: PathBuf,

        /// Ability id, e.g. execution or shield_pawn
        #[arg(long)]
        arcana: ArcanaKind,

        #[arg(long, default_value = "white")]
        side: Side,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            events,
            side,
            verbosity,
            config,
        } => run_replay(&events, side, verbosity, config.as_deref()).await?,
        Commands::Targets {
            events,
            arcana,
            side,
        } => run_targets(&events, arcana, side).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>, verbosity: Option<VerbosityLevel>) -> Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(verbosity) = verbosity {
        config.verbosity = verbosity;
    }
    Ok(config)
}

async fn run_replay(
    events_path: &Path,
    side: Side,
    verbosity: Option<VerbosityLevel>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, verbosity)?;
    let events = load_event_log(events_path)
        .await
        .with_context(|| format!("loading events from {}", events_path.display()))?;

    println!(
        "=== Arcana replay: {} ({} events, playing {}) ===\n",
        events_path.display(),
        events.len(),
        side
    );

    let mut client = GameClient::new(side, &config, LegalMoveTable::new());
    let mut snapshots = 0;
    let mut refused = 0;

    for (index, event) in events.iter().enumerate() {
        if let Err(e) = client.apply_event(event) {
            refused += 1;
            eprintln!("event {}: {} refused: {}", index + 1, event.kind(), e);
            continue;
        }
        if let ServerEvent::Snapshot(snapshot) = event {
            snapshots += 1;
            print_cycle(&client, snapshot, snapshots);
        }
    }

    println!("=== Summary ===");
    println!("snapshots applied: {}", snapshots);
    println!("events refused:    {}", refused);
    println!("entities tracked:  {}", client.entities().len());
    println!("opponent draws:    {}", client.opponent_draws());
    match client.outcome() {
        Some(outcome) => match outcome.winner {
            Some(winner) => println!("result:            {} wins ({})", winner, outcome.reason),
            None => println!("result:            draw ({})", outcome.reason),
        },
        None => println!("result:            in progress"),
    }

    Ok(())
}

fn print_cycle(client: &GameClient<LegalMoveTable>, snapshot: &PlacementSnapshot, cycle: usize) {
    println!("--- snapshot {} ({} to move) ---", cycle, snapshot.turn);
    if let Some(report) = client.last_report() {
        println!(
            "retained {}, moved {}, minted {}, dropped {}",
            report.retained,
            report.moved,
            report.minted.len(),
            report.dropped.len()
        );
    }
    for entity in client.entities() {
        println!(
            "  {:<6} {:<5} {:<6} {}  ({:+.1}, {:+.1})",
            entity.id.to_string(),
            entity.side.to_string(),
            entity.kind.to_string(),
            entity.square,
            entity.coordinate.x,
            entity.coordinate.z
        );
    }
    println!();
}

async fn run_targets(events_path: &Path, arcana: ArcanaKind, side: Side) -> Result<()> {
    let events = load_event_log(events_path)
        .await
        .with_context(|| format!("loading events from {}", events_path.display()))?;

    let Some(snapshot) = events.iter().rev().find_map(|event| match event {
        ServerEvent::Snapshot(snapshot) => Some(snapshot),
        _ => None,
    }) else {
        bail!("{} contains no snapshot", events_path.display());
    };

    let mut session = TargetingSession::new();
    let required = session.select_ability(arcana);
    let targets = session
        .valid_targets(snapshot, side)
        .context("evaluating targets")?;

    println!("{} for {} (target: {:?})", arcana, side, required);
    if session.is_complete() {
        println!("takes no target");
    } else if targets.is_empty() {
        println!("no valid targets");
    } else {
        let squares: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
        println!("{}", squares.join(" "));
    }

    Ok(())
}
