mod app;
mod bridge;
mod launcher;
mod synth;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use flashrig_core::{LayoutMode, Ring, RingSelection};
use flashrig_experiment::{SessionConfig, StimulationKind};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Radial,
    Grid,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StimulationArg {
    Speller,
    Trainer,
}

#[derive(Parser)]
#[command(name = "flashrig", version, about = "P300/SSVEP visual stimulation and recording rig")]
struct Cli {
    /// Session config JSON; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the session code
    #[arg(long)]
    code: Option<String>,

    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    #[arg(long, value_enum)]
    stimulation: Option<StimulationArg>,

    /// "all" or a comma list of outer,middle,inner
    #[arg(long)]
    rings: Option<String>,

    /// Block stimulation on the start gate until the recorders are up
    #[arg(long)]
    gated: bool,

    /// Publish synthetic EEG/photocell streams
    #[arg(long)]
    synthetic: bool,

    /// Drive the session without a window
    #[arg(long)]
    headless: bool,

    /// Render one frame to this PNG and exit
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Seed for the word draw
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_rings(arg: &str) -> Result<RingSelection> {
    if arg.eq_ignore_ascii_case("all") {
        return Ok(RingSelection::All);
    }
    let mut rings = Vec::new();
    for part in arg.split(',') {
        rings.push(match part.trim().to_ascii_lowercase().as_str() {
            "outer" => Ring::Outer,
            "middle" => Ring::Middle,
            "inner" => Ring::Inner,
            other => anyhow::bail!("unknown ring {other:?}"),
        });
    }
    Ok(RingSelection::Rings(rings))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(code) = cli.code {
        config.session_code = code;
    }
    if let Some(layout) = cli.layout {
        config.layout = match layout {
            LayoutArg::Radial => LayoutMode::Radial,
            LayoutArg::Grid => LayoutMode::Grid,
        };
    }
    if let Some(kind) = cli.stimulation {
        config.stimulation = match kind {
            StimulationArg::Speller => StimulationKind::Speller,
            StimulationArg::Trainer => StimulationKind::Trainer,
        };
    }
    if let Some(rings) = &cli.rings {
        config.rings = parse_rings(rings)?;
    }
    if cli.gated {
        config.gated = true;
    }
    if let Some(seed) = cli.seed {
        config.sequence_seed = Some(seed);
    }

    if let Some(path) = &cli.screenshot {
        return launcher::take_screenshot(&config, path);
    }
    if cli.headless {
        launcher::run_headless(config, cli.synthetic)
    } else {
        launcher::run_windowed(config, cli.synthetic)
    }
}
