use clap::{Parser, Subcommand};
use std::path::PathBuf;
use statehost_cli::commands::{inspect, timeline, verify};

#[derive(Parser)]
#[command(name = "statehost")]
#[command(about = "statehost offline tool - inspect, list and verify a node data directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise the event log and snapshots in a data directory.
    Inspect {
        /// Node data directory (the one holding `log/` and `snapshots/`).
        dir: PathBuf,
    },
    /// List recorded requests in sequence order
    Timeline {
        dir: PathBuf,

        /// First sequence number to show
        #[arg(long, default_value_t = 1)]
        from: u64,

        /// Maximum number of rows
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Check every checksum, log contiguity, and snapshot readability
    Verify {
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { dir } => inspect::run(&dir),
        Commands::Timeline { dir, from, limit } => timeline::run(&dir, from, limit),
        Commands::Verify { dir } => verify::run(&dir),
    }
}
