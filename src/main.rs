//! Taproot CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "taproot")]
#[command(about = "Content-addressed graph export for lifted binary views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a lifted view into CSV graph tables
    Export {
        /// Serialized view (JSON)
        view: PathBuf,

        /// Directory the tables are written into
        #[arg(short, long, default_value = "graph")]
        out: PathBuf,
    },
    /// Re-run the cross-reference pass over already exported tables
    Xref {
        /// Serialized view (JSON)
        view: PathBuf,

        /// Directory holding the exported tables
        #[arg(short, long, default_value = "graph")]
        out: PathBuf,
    },
    /// Load exported tables into an in-memory graph and verify them
    Check {
        /// Directory holding the exported tables
        #[arg(default_value = "graph")]
        dir: PathBuf,

        /// Rows per commit batch
        #[arg(long, default_value = "100")]
        batch_size: usize,

        /// Relationship batches committed concurrently
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("taproot={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Export { view, out } => commands::export(view, out),
        Commands::Xref { view, out } => commands::xref(view, out),
        Commands::Check { dir, batch_size, concurrency } => {
            commands::check(dir, batch_size, concurrency).await
        }
        Commands::Version => {
            println!("Taproot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
