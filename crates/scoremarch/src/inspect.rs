use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use timeline::{Channel, ChannelSet, PhaseSet, TailPolicy};

use crate::cli::{CheckArgs, SampleArgs, TimelineAction, TimelineCommand};
use crate::paths::AppPaths;
use crate::run::{load_timeline, LoadedTimeline};

const MAX_SAMPLES: usize = 1_000_000;
const STEP_TOLERANCE: f64 = 1e-9;

pub fn run(command: TimelineCommand) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command.action {
        TimelineAction::Sample(args) => sample(&args, &mut out),
        TimelineAction::Check(args) => check(&args, &mut out),
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SampleLine {
    All {
        raw_seconds: f64,
        #[serde(flatten)]
        phases: PhaseSet,
    },
    Single {
        raw_seconds: f64,
        channel: Channel,
        phase: f64,
    },
}

fn sample(args: &SampleArgs, out: &mut impl Write) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_timeline(args.timeline.as_deref(), &paths)?;
    for raw_seconds in sample_times(args.from, args.to, args.step)? {
        let phases = loaded
            .channels
            .evaluate(raw_seconds)
            .with_context(|| format!("failed to evaluate raw time {raw_seconds}"))?;
        let line = match args.channel {
            Some(channel) => SampleLine::Single {
                raw_seconds,
                channel,
                phase: phases.get(channel),
            },
            None => SampleLine::All {
                raw_seconds,
                phases,
            },
        };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    Ok(())
}

fn sample_times(from: f64, to: f64, step: f64) -> Result<Vec<f64>> {
    if !(from.is_finite() && to.is_finite() && step.is_finite()) {
        bail!("sample range must be finite");
    }
    if step <= 0.0 {
        bail!("--step must be greater than zero");
    }
    if to < from {
        bail!("--to ({to}) must not be before --from ({from})");
    }
    // A span like 0.3 / 0.1 comes out as 2.999..., which must still count as 3 steps.
    let steps = ((to - from) / step + STEP_TOLERANCE).floor();
    if steps >= MAX_SAMPLES as f64 {
        bail!("{} samples requested; increase --step (limit {MAX_SAMPLES})", steps + 1.0);
    }
    let count = steps as usize + 1;
    Ok((0..count)
        .map(|index| (from + index as f64 * step).min(to))
        .collect())
}

fn check(args: &CheckArgs, out: &mut impl Write) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_timeline(args.path.as_deref(), &paths)?;
    match &loaded.source {
        Some(path) => writeln!(out, "timeline: {}", path.display())?,
        None => writeln!(out, "timeline: built-in")?,
    }
    write_summary(&loaded, out)
}

fn write_summary(loaded: &LoadedTimeline, out: &mut impl Write) -> Result<()> {
    let builtin = ChannelSet::builtin()?;
    for channel in Channel::ALL {
        let table = loaded.channels.table(channel);
        let origin = if table == builtin.table(channel) {
            "built-in"
        } else {
            "override"
        };
        let tail = match table.tail() {
            TailPolicy::Continue => "continue".to_string(),
            TailPolicy::Wrap {
                start,
                period,
                rate,
            } => format!("wrap from {start}s every {period}s at rate {rate}"),
        };
        writeln!(
            out,
            "{channel:<5}  {origin:<8}  {count:>2} segments  {first}s..{last}s  tail {tail}",
            count = table.segments().len(),
            first = table.first_breakpoint(),
            last = table.last_breakpoint(),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_times_include_both_ends() {
        assert_eq!(sample_times(0.0, 1.0, 0.5).unwrap(), vec![0.0, 0.5, 1.0]);
        assert_eq!(sample_times(2.0, 2.0, 1.0).unwrap(), vec![2.0]);
    }

    #[test]
    fn sample_times_keep_end_despite_float_error() {
        let times = sample_times(0.0, 0.3, 0.1).unwrap();
        assert_eq!(times.len(), 4, "{times:?}");
        assert_eq!(times[3], 0.3);

        let times = sample_times(0.0, 0.7, 0.1).unwrap();
        assert_eq!(times.len(), 8, "{times:?}");
        assert_eq!(times.last(), Some(&0.7));

        assert_eq!(sample_times(0.0, 1.0, 0.3).unwrap().len(), 4);
    }

    #[test]
    fn sample_times_reject_bad_ranges() {
        assert!(sample_times(0.0, 1.0, 0.0).is_err());
        assert!(sample_times(5.0, 1.0, 1.0).is_err());
        assert!(sample_times(0.0, f64::INFINITY, 1.0).is_err());
        assert!(sample_times(0.0, 1e9, 1e-3).is_err());
    }

    #[test]
    fn sample_line_shapes() {
        let all = SampleLine::All {
            raw_seconds: 0.0,
            phases: PhaseSet::default(),
        };
        let json = serde_json::to_value(&all).unwrap();
        assert_eq!(json["raw_seconds"], 0.0);
        assert_eq!(json["panel"], 0.0);

        let single = SampleLine::Single {
            raw_seconds: 7.0,
            channel: Channel::Raw,
            phase: 2.91,
        };
        let json = serde_json::to_value(&single).unwrap();
        assert_eq!(json["channel"], "raw");
        assert_eq!(json["phase"], 2.91);
    }

    #[test]
    fn summary_lists_every_channel() {
        let loaded = LoadedTimeline {
            channels: ChannelSet::builtin().unwrap(),
            source: None,
        };
        let mut out = Vec::new();
        write_summary(&loaded, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().all(|line| line.contains("built-in")));
        assert!(text.contains("wrap from 99.999s every 8s at rate 0.5"));
    }
}
