//! Framepipe CLI: inspect animated scene documents and export them to video.
//!
//! Usage:
//!   framepipe export <SCENE_FILE> -o <OUT>   Render a scene into an encoder
//!   framepipe info <SCENE_FILE>              Show scenes, layers and frame counts
//!   framepipe check                          Check encoder and GPU availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use framepipe_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "framepipe",
    about = "Render animated scenes offscreen and pipe raw frames into an encoder",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene to video
    Export(commands::export::ExportArgs),

    /// Show scene document information
    Info {
        /// Path to the scene document
        path: PathBuf,
    },

    /// Check encoder and GPU availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = framepipe_common::logging::with_bootstrap_logging(|| match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    });
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    framepipe_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export(args) => commands::export::run(args, &config).await,
        Commands::Info { path } => commands::info::run(path, &config),
        Commands::Check => commands::check::run(&config),
    }
}
