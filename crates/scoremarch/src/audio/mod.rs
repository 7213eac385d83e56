//! Soundtrack playback.
//!
//! Playback is fire-and-forget: a player is started once, right before the
//! animation clock captures its zero point, and nothing feeds its position
//! back into the clock. WAV tracks play in-process when the `native-audio`
//! feature is enabled; other formats go to an external player process.

mod stream;

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

#[cfg(feature = "native-audio")]
use self::stream::{StreamPlayer, TrackFeed};

/// Players looked up on `PATH`, in order, when none is configured.
const KNOWN_PLAYERS: &[(&str, &[&str])] = &[
    ("paplay", &[]),
    ("pw-play", &[]),
    ("aplay", &["-q"]),
    ("afplay", &[]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
];

pub trait AudioPlayer {
    fn start(&self) -> Result<Playback>;
}

/// A running soundtrack; stopping happens on drop.
#[derive(Default)]
pub struct Playback {
    sink: Sink,
}

#[derive(Default)]
enum Sink {
    #[default]
    Silent,
    Process(Child),
    #[cfg(feature = "native-audio")]
    Stream {
        stream: cpal::Stream,
        feed: std::sync::Arc<TrackFeed>,
    },
}

impl Playback {
    #[cfg(feature = "native-audio")]
    fn stream(stream: cpal::Stream, feed: std::sync::Arc<TrackFeed>) -> Self {
        Self {
            sink: Sink::Stream { stream, feed },
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self.sink, Sink::Silent)
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        match std::mem::take(&mut self.sink) {
            Sink::Silent => {}
            Sink::Process(mut child) => {
                if let Ok(Some(status)) = child.try_wait() {
                    debug!(%status, "audio player already exited");
                    return;
                }
                if let Err(err) = child.kill() {
                    warn!(%err, "failed to stop audio player");
                }
                let _ = child.wait();
            }
            #[cfg(feature = "native-audio")]
            Sink::Stream { stream, feed } => {
                debug!(
                    position = feed.position_seconds(),
                    finished = feed.finished(),
                    "stopping soundtrack"
                );
                drop(stream);
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn start(&self) -> Result<Playback> {
        debug!("audio disabled");
        Ok(Playback::default())
    }
}

/// Plays the track through an external command: `<program> <args..> <track>`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    track: PathBuf,
}

impl CommandPlayer {
    /// Splits `command` on whitespace into a program and its arguments.
    pub fn new(command: &str, track: impl Into<PathBuf>) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("audio player command must not be empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
            track: track.into(),
        })
    }

    /// First known player found on `PATH`.
    pub fn detect(track: impl Into<PathBuf>) -> Option<Self> {
        let path = env::var_os("PATH")?;
        let (program, args) = KNOWN_PLAYERS.iter().find(|(program, _)| {
            env::split_paths(&path).any(|dir| dir.join(program).is_file())
        })?;
        Some(Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            track: track.into(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl AudioPlayer for CommandPlayer {
    fn start(&self) -> Result<Playback> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.track)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch audio player '{}'", self.program))?;
        info!(
            player = %self.program,
            track = %self.track.display(),
            pid = child.id(),
            "soundtrack started"
        );
        Ok(Playback {
            sink: Sink::Process(child),
        })
    }
}

/// Picks a player for `track`, falling back to silence when none is usable.
pub fn select_player(
    track: Option<&Path>,
    command: Option<&str>,
    disabled: bool,
) -> Result<Box<dyn AudioPlayer>> {
    if disabled {
        info!("audio disabled (--no-audio)");
        return Ok(Box::new(SilentPlayer));
    }
    let Some(track) = track else {
        info!("no soundtrack configured; rendering silently");
        return Ok(Box::new(SilentPlayer));
    };
    if !track.is_file() {
        bail!("soundtrack not found at {}", track.display());
    }

    if let Some(command) = command {
        return Ok(Box::new(CommandPlayer::new(command, track)?));
    }
    if let Some(player) = in_process_player(track)? {
        return Ok(player);
    }
    match CommandPlayer::detect(track) {
        Some(player) => {
            debug!(player = player.program(), "detected audio player");
            Ok(Box::new(player))
        }
        None => {
            warn!("no audio player found on PATH; rendering silently (use --audio-player)");
            Ok(Box::new(SilentPlayer))
        }
    }
}

#[cfg(feature = "native-audio")]
fn in_process_player(track: &Path) -> Result<Option<Box<dyn AudioPlayer>>> {
    if !stream::is_wav(track) {
        return Ok(None);
    }
    Ok(Some(Box::new(StreamPlayer::load(track)?)))
}

#[cfg(not(feature = "native-audio"))]
fn in_process_player(_track: &Path) -> Result<Option<Box<dyn AudioPlayer>>> {
    Ok(None)
}
