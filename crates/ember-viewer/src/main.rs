//! Ember Viewer binary — parse options, load an optional preset, run the app

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ember_particles::EmitterConfig;
use ember_viewer::{run, ViewerOptions};

#[derive(Parser)]
#[command(name = "ember-viewer")]
#[command(about = "Interactive particle effect playground", long_about = None)]
#[command(version)]
struct Cli {
    /// Particle pool capacity
    #[arg(long, default_value_t = 100_000)]
    capacity: usize,

    /// Jitter generator seed
    #[arg(long, default_value_t = 1)]
    seed: u32,

    /// Path to an emitter preset (TOML)
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Disable the bloom post-process at startup
    #[arg(long)]
    no_bloom: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let preset = match &cli.preset {
        Some(path) => {
            let config = EmitterConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load preset: {}", path.display()))?;
            println!("Loaded preset: {}", path.display());
            Some(config)
        }
        None => None,
    };

    run(ViewerOptions {
        capacity: cli.capacity,
        seed: cli.seed,
        preset,
        bloom: !cli.no_bloom,
    })
}
