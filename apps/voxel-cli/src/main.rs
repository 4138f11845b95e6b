use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use voxel_common::EngineConfig;
use voxel_engine::{Collaborators, Game, HeadlessDisplay, ManualClock};
use voxel_env::DayCycle;
use voxel_render::FileSource;

#[derive(Parser)]
#[command(name = "voxel-cli", about = "Headless runner for the voxel runtime core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON engine config; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON day cycle replacing the built-in dawn/day/dusk/night
    #[arg(long, global = true)]
    cycle: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, config and day cycle
    Info,
    /// Run the game loop headless until the frame count is reached
    Run {
        /// Frames to run before the display requests close
        #[arg(short, long, default_value = "300")]
        frames: u64,
        /// Override the configured target frame rate
        #[arg(long)]
        fps: Option<u32>,
        /// Skip the frame-rate cap and advance time by a fixed step per frame
        #[arg(long)]
        no_sleep: bool,
        /// Read shader sources from disk instead of the built-in set
        #[arg(long)]
        shaders: Option<PathBuf>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_cycle(path: Option<&PathBuf>) -> anyhow::Result<DayCycle> {
    match path {
        Some(path) => Ok(DayCycle::load(path)?),
        None => Ok(DayCycle::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = load_config(cli.config.as_ref())?;
    let cycle = load_cycle(cli.cycle.as_ref())?;

    match cli.command {
        Commands::Info => {
            println!("voxel-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "display: {}x{} @ {} fps, GL {}",
                config.width, config.height, config.target_fps, config.gl_version
            );
            println!("day cycle: {} phases, {} ms", cycle.len(), cycle.total_ms());
            for phase in cycle.phases() {
                println!(
                    "  {:<8} {:>7} ms  #{:06x} -> #{:06x}",
                    phase.name,
                    phase.duration_ms,
                    phase.start_light.to_packed(),
                    phase.end_light.to_packed()
                );
            }
        }
        Commands::Run {
            frames,
            fps,
            no_sleep,
            shaders,
            json,
        } => {
            if let Some(fps) = fps {
                config.target_fps = fps;
            }
            config.validate()?;

            let mut display = HeadlessDisplay::new().close_after(frames);
            let mut parts = Collaborators {
                day_cycle: cycle,
                ..Collaborators::headless()
            };
            if no_sleep {
                display = display.unlimited();
                let step_ms = (1000 / u64::from(config.target_fps)).max(1);
                parts.clock = Box::new(ManualClock::stepping(step_ms));
            }
            parts.display = Box::new(display);
            if let Some(dir) = shaders.or_else(|| config.shader_dir.clone()) {
                parts.shaders = Box::new(FileSource::new(dir));
            }

            tracing::info!(frames, fps = config.target_fps, no_sleep, "starting headless run");
            let mut game = Game::new(config, parts).context("starting game")?;
            let summary = game.run();
            tracing::info!(
                frames = summary.frames,
                simulated_ms = summary.simulated_ms,
                "run finished"
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
            println!("Game Terminated");
        }
    }

    Ok(())
}
