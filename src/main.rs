use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use music_visualizer::{load_track, Track, VisualizerConfig};

#[derive(Debug, Parser)]
#[command(name = "music-visualizer", about = "Audio-reactive particle visualizer")]
struct Arguments {
    /// Bundled track to play (Reverse, Thunder, or Jubilee)
    #[arg(short, long, default_value = "Reverse")]
    track: Track,
    /// Draw particles only, without the loudness-driven lines
    #[arg(short, long)]
    reduce_intensity: bool,
    /// Directory holding the bundled tracks
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,
    /// Print the bundled tracks and exit
    #[arg(long)]
    list_tracks: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Arguments::parse();

    if args.list_tracks {
        for track in Track::all() {
            println!("{:<8} {}  {}", track.name(), track.file_name(), track.description());
        }
        return Ok(());
    }

    let config = VisualizerConfig {
        track: args.track,
        reduce_intensity: args.reduce_intensity,
        assets_dir: args.assets_dir,
        ..VisualizerConfig::default()
    };

    log::info!("{}: {}", config.track.name(), config.track.description());
    if config.reduce_intensity {
        log::info!("Reduced intensity: lines disabled");
    }

    let audio = load_track(&config)
        .with_context(|| format!("failed to load track {}", config.track.name()))?;

    music_visualizer::run(config, audio)?;
    Ok(())
}
