use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rollcall_core::{link, OnnxFaceAnalyzer};

mod config;
mod live;
mod loader;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Roster-driven live face recognition")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "rollcall.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the known-face registry from the roster and run live recognition
    Run,
    /// Fetch the roster and report each row's extracted file id (no downloads)
    Roster,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run => run(&config),
        Commands::Roster => roster_report(&config),
    }
}

fn run(config: &Config) -> Result<()> {
    let mut analyzer =
        OnnxFaceAnalyzer::load(&config.detector_model_path(), &config.embedder_model_path())?;

    let session = loader::RosterSession::connect(config)?;
    let (registry, report) = loader::build_known_faces(&session, config, &mut analyzer)?;

    println!(
        "Loaded {} known face(s), skipped {} roster row(s).",
        report.loaded,
        report.skipped()
    );
    if registry.is_empty() {
        tracing::warn!("registry is empty; every detected face will be Unknown");
    }

    live::run(
        analyzer,
        registry,
        live::LiveOptions {
            camera_index: config.camera.index,
            tolerance: config.recognition.tolerance,
            resize_factor: config.recognition.resize_factor,
        },
    )
}

fn roster_report(config: &Config) -> Result<()> {
    let session = loader::RosterSession::connect(config)?;
    let rows = session.fetch_rows(config)?;

    for row in &rows {
        let name = row.name.trim();
        let image_link = row.image_link.trim();
        if name.is_empty() || image_link.is_empty() {
            println!("(skipped) blank name or image link");
            continue;
        }
        match link::extract_file_id(image_link) {
            Some(file_id) => println!("{name}: {file_id}"),
            None => println!("{name}: (skipped) no file id in link"),
        }
    }
    println!("{} roster row(s) total.", rows.len());

    Ok(())
}
