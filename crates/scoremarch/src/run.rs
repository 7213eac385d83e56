use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use renderer::{Renderer, RendererConfig};
use timeline::{ChannelSet, TimelineConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::{self, Playback};
use crate::cli::{Cli, Command, RunArgs};
use crate::inspect;
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();
    match cli.command {
        Some(Command::Timeline(command)) => inspect::run(command),
        None => run_animation(cli.run),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Channel tables plus the file they came from (`None` for built-ins).
pub struct LoadedTimeline {
    pub channels: ChannelSet,
    pub source: Option<PathBuf>,
}

/// Loads `explicit`, else `timeline.toml` from the config dir, else the built-ins.
pub fn load_timeline(explicit: Option<&Path>, paths: &AppPaths) -> Result<LoadedTimeline> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = paths.timeline_file();
            candidate.is_file().then_some(candidate)
        }
    };

    let Some(path) = source else {
        debug!("using built-in timeline");
        return Ok(LoadedTimeline {
            channels: ChannelSet::builtin()?,
            source: None,
        });
    };

    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read timeline at {}", path.display()))?;
    let config = TimelineConfig::from_toml_str(&text)
        .with_context(|| format!("invalid timeline at {}", path.display()))?;
    let channels = config
        .channel_set()
        .with_context(|| format!("invalid timeline at {}", path.display()))?;
    info!(
        path = %path.display(),
        overrides = config.channels.len(),
        "loaded timeline"
    );
    Ok(LoadedTimeline {
        channels,
        source: Some(path),
    })
}

fn run_animation(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_timeline(args.timeline.as_deref(), &paths)?;

    let mut config = RendererConfig::new(loaded.channels);
    if let Some(size) = args.size {
        config.surface_size = size;
    }
    config.shader_source = args.shader;
    config.antialiasing = args.antialias;
    config.color_space = args.color_space;
    config.time_offset = args.time_offset;

    let player = audio::select_player(
        args.audio.as_deref(),
        args.audio_player.as_deref(),
        args.no_audio,
    )?;

    let mut playback: Option<Playback> = None;
    Renderer::new(config).run(|| match player.start() {
        Ok(started) => playback = Some(started),
        Err(err) => warn!("continuing without audio: {err:#}"),
    })?;

    drop(playback);
    info!("scoremarch exited");
    Ok(())
}
