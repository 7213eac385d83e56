//! In-process WAV playback.
//!
//! The track is decoded up front, so starting playback only has to open the
//! output stream. The audio callback pulls frames from a [`TrackFeed`], which
//! also counts how far playback has got.
#![cfg_attr(not(feature = "native-audio"), allow(dead_code))]

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

/// Decoded interleaved samples in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    channels: usize,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl Track {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open WAV track {}", path.display()))?;
        Self::decode(reader)
            .with_context(|| format!("failed to decode WAV track {}", path.display()))
    }

    fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let full_scale = (1u64 << spec.bits_per_sample.saturating_sub(1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / full_scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Self::from_interleaved(usize::from(spec.channels), spec.sample_rate, samples)
    }

    pub fn from_interleaved(channels: usize, sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            bail!("track has no channels");
        }
        if sample_rate == 0 {
            bail!("track sample rate must be greater than zero");
        }
        Ok(Self {
            channels,
            sample_rate,
            samples,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.channels)?;
        self.samples.get(start..start + self.channels)
    }
}

/// Cursor over a [`Track`] at the output device's rate.
///
/// Rate conversion picks the nearest earlier source frame; channel counts are
/// matched by averaging down to mono or repeating the last source channel.
#[derive(Debug)]
pub struct TrackFeed {
    track: Arc<Track>,
    output_rate: u32,
    frames_played: AtomicU64,
}

impl TrackFeed {
    pub fn new(track: Arc<Track>, output_rate: u32) -> Self {
        Self {
            track,
            output_rate: output_rate.max(1),
            frames_played: AtomicU64::new(0),
        }
    }

    /// Fills `out` with interleaved frames and advances the cursor. Silence
    /// follows the end of the track.
    pub fn fill(&self, out: &mut [f32], out_channels: usize) {
        if out_channels == 0 {
            return;
        }
        let start = self.frames_played.load(Ordering::Relaxed);
        let mut written = 0u64;
        for frame in out.chunks_mut(out_channels) {
            let source = (start + written) * u64::from(self.track.sample_rate)
                / u64::from(self.output_rate);
            match usize::try_from(source).ok().and_then(|index| self.track.frame(index)) {
                Some(input) => mix_frame(input, frame),
                None => frame.fill(0.0),
            }
            written += 1;
        }
        self.frames_played.fetch_add(written, Ordering::Relaxed);
    }

    pub fn position_seconds(&self) -> f64 {
        self.frames_played.load(Ordering::Relaxed) as f64 / f64::from(self.output_rate)
    }

    pub fn finished(&self) -> bool {
        self.position_seconds() >= self.track.duration_seconds()
    }
}

fn mix_frame(input: &[f32], output: &mut [f32]) {
    if let [mono] = output {
        *mono = input.iter().sum::<f32>() / input.len() as f32;
        return;
    }
    let last = input.len() - 1;
    for (channel, sample) in output.iter_mut().enumerate() {
        *sample = input[channel.min(last)];
    }
}

pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

#[cfg(feature = "native-audio")]
pub use device::StreamPlayer;

#[cfg(feature = "native-audio")]
mod device {
    use std::path::Path;
    use std::sync::Arc;

    use anyhow::{bail, Context, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SampleFormat, SizedSample};
    use tracing::{debug, info, warn};

    use super::{Track, TrackFeed};
    use crate::audio::{AudioPlayer, Playback};

    /// Plays a decoded WAV track on the default output device.
    #[derive(Debug, Clone)]
    pub struct StreamPlayer {
        track: Arc<Track>,
    }

    impl StreamPlayer {
        pub fn load(path: &Path) -> Result<Self> {
            let track = Track::open(path)?;
            debug!(
                channels = track.channels(),
                sample_rate = track.sample_rate(),
                seconds = track.duration_seconds(),
                "decoded soundtrack"
            );
            Ok(Self {
                track: Arc::new(track),
            })
        }
    }

    impl AudioPlayer for StreamPlayer {
        fn start(&self) -> Result<Playback> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .context("no default audio output device")?;
            let supported = device
                .default_output_config()
                .context("failed to query audio output config")?;
            let format = supported.sample_format();
            let config: cpal::StreamConfig = supported.into();
            let feed = Arc::new(TrackFeed::new(
                Arc::clone(&self.track),
                config.sample_rate.0,
            ));

            let stream = match format {
                SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&feed)),
                SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&feed)),
                SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&feed)),
                other => bail!("unsupported audio sample format {other:?}"),
            }
            .context("failed to build audio output stream")?;
            stream.play().context("failed to start audio output stream")?;

            info!(
                device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
                rate = config.sample_rate.0,
                channels = config.channels,
                "soundtrack started"
            );
            Ok(Playback::stream(stream, feed))
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        feed: Arc<TrackFeed>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = usize::from(config.channels);
        let mut scratch: Vec<f32> = Vec::new();
        device.build_output_stream(
            config,
            move |data: &mut [T], _| {
                scratch.resize(data.len(), 0.0);
                feed.fill(&mut scratch, channels);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            |err| warn!(%err, "audio stream error"),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    fn stereo_ramp() -> Arc<Track> {
        // Left counts up, right counts down.
        let samples = (0..4).flat_map(|i| [i as f32, -(i as f32)]).collect();
        Arc::new(Track::from_interleaved(2, 4, samples).unwrap())
    }

    #[test]
    fn decodes_integer_wav_to_unit_range() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(file.path(), spec).unwrap();
        for value in [0i16, 16_384, -32_768] {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let track = Track::open(file.path()).unwrap();
        assert_eq!(track.channels(), 1);
        assert_eq!(track.sample_rate(), 8_000);
        assert_eq!(track.frames(), 3);
        assert_eq!(track.samples, vec![0.0, 0.5, -1.0]);
    }

    #[test]
    fn rejects_non_wav_data() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a wav file").unwrap();
        assert!(Track::open(file.path()).is_err());
        assert!(Track::from_interleaved(0, 44_100, Vec::new()).is_err());
        assert!(Track::from_interleaved(2, 0, Vec::new()).is_err());
    }

    #[test]
    fn feed_copies_frames_at_matching_rate() {
        let feed = TrackFeed::new(stereo_ramp(), 4);
        let mut out = [9.0; 4];
        feed.fill(&mut out, 2);
        assert_eq!(out, [0.0, 0.0, 1.0, -1.0]);
        feed.fill(&mut out, 2);
        assert_eq!(out, [2.0, -2.0, 3.0, -3.0]);
        assert_eq!(feed.position_seconds(), 1.0);
        assert!(feed.finished());
    }

    #[test]
    fn feed_pads_with_silence_after_the_end() {
        let feed = TrackFeed::new(stereo_ramp(), 4);
        let mut out = [9.0; 12];
        feed.fill(&mut out, 2);
        assert_eq!(&out[8..], &[0.0; 4]);
    }

    #[test]
    fn feed_matches_channel_counts() {
        let mut mono = [9.0; 2];
        TrackFeed::new(stereo_ramp(), 4).fill(&mut mono, 1);
        assert_eq!(mono, [0.0, 0.0]);

        let single = Arc::new(Track::from_interleaved(1, 4, vec![0.25, 0.75]).unwrap());
        let mut quad = [0.0; 4];
        TrackFeed::new(single, 4).fill(&mut quad, 4);
        assert_eq!(quad, [0.25; 4]);
    }

    #[test]
    fn feed_steps_through_source_at_output_rate() {
        let feed = TrackFeed::new(stereo_ramp(), 8);
        let mut out = [0.0; 8];
        feed.fill(&mut out, 2);
        assert_eq!(out, [0.0, 0.0, 0.0, 0.0, 1.0, -1.0, 1.0, -1.0]);
        assert_eq!(feed.position_seconds(), 0.5);
    }

    #[test]
    fn wav_detection_ignores_case() {
        assert!(is_wav(Path::new("built2scale.WAV")));
        assert!(is_wav(Path::new("track.wav")));
        assert!(!is_wav(Path::new("track.ogg")));
        assert!(!is_wav(Path::new("wav")));
    }
}
