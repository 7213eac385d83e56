use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::{Antialiasing, ColorSpaceMode};
use timeline::Channel;

#[derive(Parser, Debug)]
#[command(
    name = "scoremarch",
    author,
    version,
    about = "Raymarched animation driven by time-warped soundtrack cues"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Fragment shader to raymarch with; the bundled scene is used when omitted.
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Timeline TOML overriding built-in channel tables (defaults to `timeline.toml`
    /// in the config directory when present).
    #[arg(long, value_name = "PATH")]
    pub timeline: Option<PathBuf>,

    /// Soundtrack played alongside the animation. WAV files play in-process
    /// in builds with the `native-audio` feature.
    #[arg(long, value_name = "PATH", env = "SCOREMARCH_AUDIO")]
    pub audio: Option<PathBuf>,

    /// Command used to play the soundtrack (e.g. `paplay` or `ffplay -nodisp -autoexit`);
    /// takes precedence over in-process playback.
    #[arg(long, value_name = "CMD")]
    pub audio_player: Option<String>,

    /// Render without starting the soundtrack.
    #[arg(long)]
    pub no_audio: bool,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_antialias,
        default_value = "off"
    )]
    pub antialias: Antialiasing,

    /// Output color space handling: `gamma` or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "gamma"
    )]
    pub color_space: ColorSpaceMode,

    /// Seconds added to the animation clock; negative values hold the
    /// visuals back until the soundtrack has caught up.
    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = parse_seconds,
        default_value_t = 0.0,
        allow_hyphen_values = true
    )]
    pub time_offset: f64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and tune timeline tables without opening a window.
    Timeline(TimelineCommand),
}

#[derive(Parser, Debug)]
pub struct TimelineCommand {
    #[command(subcommand)]
    pub action: TimelineAction,
}

#[derive(Subcommand, Debug)]
pub enum TimelineAction {
    /// Print channel phases over a range of raw times as JSON lines.
    Sample(SampleArgs),
    /// Validate a timeline file and summarise every channel table.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct SampleArgs {
    /// Timeline TOML to sample; falls back to the config directory, then built-ins.
    #[arg(long, value_name = "PATH")]
    pub timeline: Option<PathBuf>,

    /// Only print this channel (`raw`, `aux1`, `aux2`, `aux3`, `panel`).
    #[arg(long, value_name = "NAME", value_parser = parse_channel)]
    pub channel: Option<Channel>,

    /// First raw time in seconds.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub from: f64,

    /// Last raw time in seconds (inclusive).
    #[arg(long, default_value_t = 10.0)]
    pub to: f64,

    /// Distance between samples in seconds.
    #[arg(long, default_value_t = 0.5)]
    pub step: f64,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Timeline TOML to validate; falls back to the config directory.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" => Ok(Antialiasing::Auto),
        "off" | "none" | "0" | "1" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;
            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }
            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "gamma" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected gamma or linear"
        )),
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let (width, height) = spec
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

/// Seconds as a finite float; `nan` and `inf` are refused.
pub fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds '{value}'"))?;
    if !seconds.is_finite() {
        return Err(format!("seconds must be finite, got '{value}'"));
    }
    Ok(seconds)
}

pub fn parse_channel(value: &str) -> Result<Channel, String> {
    value.parse()
}
