//! Bulletin-board agent simulation
//!
//! Runs the agent roster against a JSON feed file, writing replies to a
//! JSON-lines comment log.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use agent_sim::config::{default_config_toml, DEFAULT_CONFIG_PATH};
use agent_sim::{Clock, FileFeed, Orchestrator, SharedRng, SimConfig, SystemClock, TemplateDrafter};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "agent_sim")]
#[command(about = "Bulletin-board agents with drifting personalities")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Random seed for reproducibility (entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many passes (runs until Ctrl-C when omitted)
    #[arg(long)]
    passes: Option<u64>,

    /// JSON feed of content items
    #[arg(long, default_value = "data/feed.json")]
    feed: PathBuf,

    /// JSON-lines log that submitted comments are appended to
    #[arg(long, default_value = "data/comments.jsonl")]
    comments: PathBuf,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.print_default_config {
        match default_config_toml() {
            Ok(toml) => print!("{}", toml),
            Err(e) => {
                eprintln!("Error: Could not render default config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,agent_sim=debug")),
        )
        .init();

    let mut config = if args.config.exists() {
        match SimConfig::from_file(&args.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: Could not load {}: {}", args.config.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        SimConfig::default()
    };
    if let Err(e) = config.apply_env_overrides() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    println!("Bulletin Agent Simulation");
    println!("=========================");
    match args.seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    match args.passes {
        Some(passes) => println!("Passes: {}", passes),
        None => println!("Passes: until interrupted"),
    }
    println!("Feed: {}", args.feed.display());
    println!("Comments: {}", args.comments.display());
    println!("Agents: {}", config.agents.len());
    for agent in &config.agents {
        println!("  {} ({})", agent.display_name, agent.agent_id);
    }
    println!();

    let rng = Arc::new(match args.seed {
        Some(seed) => SharedRng::seeded(seed),
        None => SharedRng::from_entropy(),
    });
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let feed = FileFeed::new(&args.feed, &args.comments)
        .with_active_agents(config.agent_ids())
        .with_clock(clock.clone());
    let drafter = TemplateDrafter::new(rng.clone());

    let orchestrator = match Orchestrator::new(config, Arc::new(feed), Arc::new(drafter), rng, clock) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Starting simulation...");
    println!();
    let summary = orchestrator.run(args.passes).await;

    println!();
    println!(
        "Simulation complete. Ran {} passes ({} failed), posted {} comments.",
        summary.passes, summary.failed_passes, summary.comments
    );
}
