//! Channel data tuned against the soundtrack.
//!
//! Breakpoints line up with musical phrase boundaries in the track; rates set
//! how fast each channel's animation plays through that phrase. The auxiliary
//! channels sample a coarser subset of the raw breakpoints so they drift out of
//! step with it, and the panel channel runs one second late from 10.458s on.

use crate::channels::Channel;
use crate::segment::{Segment, TailPolicy};
use crate::table::SegmentTable;
use crate::TimelineError;

const LOOP_START: f64 = 99.999;
const LOOP_PERIOD: f64 = 8.0;
const LOOP_RATE: f64 = 0.5;

const RAW: &[Segment] = &[
    Segment::hold(0.0),
    Segment::linear(5.545, 2.0),
    Segment::scaled(10.458, 0.6),
    Segment::linear(15.361, 2.0),
    Segment::scaled(20.259, 0.471),
    Segment::scaled(22.546, 0.366),
    Segment::scaled(25.158, 0.506),
    Segment::scaled(30.056, 0.622),
    Segment::scaled(34.954, 0.486),
    Segment::scaled(39.852, 0.471),
    Segment::scaled(42.163, 0.331),
    Segment::scaled(49.182, 0.361),
    Segment::scaled(51.057, 0.431),
    Segment::scaled(52.872, 0.376),
    Segment::scaled(54.481, 0.361),
    Segment::scaled(56.527, 0.371),
    Segment::scaled(58.362, 0.386),
    Segment::scaled(60.167, 0.386),
    Segment::scaled(61.756, 0.256),
    Segment::scaled(63.566, 0.371),
    Segment::scaled(67.206, 0.481),
    Segment::scaled(70.840, 0.366),
    Segment::scaled(74.480, 0.371),
    Segment::scaled(76.195, 0.256),
    Segment::scaled(79.945, 0.356),
    Segment::scaled(81.765, 0.356),
    Segment::scaled(83.580, 0.471),
    Segment::scaled(85.856, 0.256),
    Segment::scaled(87.219, 0.361),
    Segment::scaled(89.029, 0.361),
    Segment::scaled(90.849, 0.361),
    Segment::scaled(92.448, 0.927),
];

const AUX1: &[Segment] = &[
    Segment::hold(0.0),
    Segment::linear(5.545, 2.0),
    Segment::scaled(20.259, 0.471),
    Segment::scaled(30.056, 0.622),
    Segment::scaled(42.163, 0.331),
    Segment::scaled(52.872, 0.376),
    Segment::scaled(58.362, 0.386),
    Segment::scaled(63.566, 0.371),
    Segment::scaled(74.480, 0.371),
    Segment::scaled(81.765, 0.356),
    Segment::scaled(87.219, 0.361),
    Segment::scaled(92.448, 0.927),
];

const AUX2: &[Segment] = &[
    Segment::hold(0.0),
    Segment::scaled(10.458, 0.622),
    Segment::scaled(22.546, 0.366),
    Segment::scaled(34.954, 0.486),
    Segment::scaled(49.182, 0.361),
    Segment::scaled(54.481, 0.361),
    Segment::scaled(60.167, 0.386),
    Segment::scaled(67.206, 0.481),
    Segment::scaled(76.195, 0.256),
    Segment::scaled(83.580, 0.471),
    Segment::scaled(89.029, 0.361),
];

const AUX3: &[Segment] = &[
    Segment::hold(0.0),
    Segment::linear(15.361, 2.0),
    Segment::scaled(25.158, 0.506),
    Segment::scaled(39.852, 0.471),
    Segment::scaled(51.057, 0.431),
    Segment::scaled(56.527, 0.371),
    Segment::scaled(61.756, 0.256),
    Segment::scaled(70.840, 0.366),
    Segment::scaled(79.945, 0.356),
    Segment::scaled(85.856, 0.256),
    Segment::scaled(90.849, 0.361),
];

const PANEL: &[Segment] = &[
    Segment::hold(0.0),
    Segment::linear(5.545, 2.0),
    Segment::scaled(11.458, 0.6),
    Segment::linear(16.361, 2.0),
    Segment::scaled(21.259, 0.471),
    Segment::scaled(23.546, 0.366),
    Segment::scaled(26.158, 0.506),
    Segment::scaled(31.056, 0.622),
    Segment::scaled(35.954, 0.486),
    Segment::scaled(40.852, 0.471),
    Segment::scaled(43.163, 0.331),
    Segment::scaled(50.182, 0.361),
    Segment::scaled(52.057, 0.431),
    Segment::scaled(53.872, 0.376),
    Segment::scaled(55.481, 0.361),
    Segment::scaled(57.527, 0.371),
    Segment::scaled(59.362, 0.386),
    Segment::scaled(61.167, 0.386),
    Segment::scaled(62.756, 0.256),
    Segment::scaled(64.566, 0.371),
    Segment::scaled(68.206, 0.481),
    Segment::scaled(71.840, 0.366),
    Segment::scaled(75.480, 0.371),
    Segment::scaled(77.195, 0.256),
    Segment::scaled(80.945, 0.356),
    Segment::scaled(82.765, 0.356),
    Segment::scaled(84.580, 0.471),
    Segment::scaled(86.856, 0.256),
    Segment::scaled(88.219, 0.361),
    Segment::scaled(90.029, 0.361),
    Segment::scaled(91.849, 0.361),
    Segment::scaled(93.448, 0.927),
];

fn loop_tail() -> TailPolicy {
    TailPolicy::wrap(LOOP_START, LOOP_PERIOD, LOOP_RATE)
}

/// Table shipped for `channel`.
pub fn builtin_table(channel: Channel) -> Result<SegmentTable, TimelineError> {
    let (segments, tail) = match channel {
        Channel::Raw => (RAW, loop_tail()),
        Channel::Aux1 => (AUX1, TailPolicy::Continue),
        Channel::Aux2 => (AUX2, loop_tail()),
        Channel::Aux3 => (AUX3, TailPolicy::Continue),
        Channel::Panel => (PANEL, loop_tail()),
    };
    SegmentTable::new(segments.to_vec(), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_table_validates() {
        for channel in Channel::ALL {
            let table = builtin_table(channel).expect("builtin table");
            assert_eq!(table.first_breakpoint(), 0.0, "{channel}");
        }
    }

    #[test]
    fn builtin_tables_are_continuous_at_segment_boundaries() {
        let epsilon = 1e-9;
        for channel in Channel::ALL {
            let table = builtin_table(channel).unwrap();
            for segment in &table.segments()[1..] {
                let point = segment.start;
                let before = table.evaluate(point - epsilon).unwrap();
                let at = table.evaluate(point).unwrap();
                assert!(
                    (at - before).abs() < 1e-6,
                    "{channel} jumps by {} at {point}s",
                    at - before
                );
            }
        }
    }

    #[test]
    fn builtin_tables_never_decrease_before_their_last_breakpoint() {
        let step = 0.001;
        for channel in Channel::ALL {
            let table = builtin_table(channel).unwrap();
            let end = table.last_breakpoint();
            let mut last = table.evaluate(0.0).unwrap();
            let mut index = 1u32;
            loop {
                let time = f64::from(index) * step;
                if time >= end {
                    break;
                }
                let value = table.evaluate(time).unwrap();
                assert!(value >= last, "{channel} decreased at {time}s ({last} -> {value})");
                last = value;
                index += 1;
            }
        }
    }

    #[test]
    fn raw_ramps_at_double_speed_after_intro() {
        let raw = builtin_table(Channel::Raw).unwrap();
        let value = raw.evaluate(7.0).unwrap();
        assert!((value - 2.91).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn raw_loops_after_outro() {
        let raw = builtin_table(Channel::Raw).unwrap();
        let value = raw.evaluate(103.999).unwrap();
        assert!((value - 8.0).abs() < 1e-9, "got {value}");
        assert!(raw.evaluate(99.999).unwrap().abs() < 1e-12);
    }

    #[test]
    fn continuing_channels_keep_growing_past_loop_start() {
        for channel in [Channel::Aux1, Channel::Aux3] {
            let table = builtin_table(channel).unwrap();
            let before = table.evaluate(99.0).unwrap();
            let after = table.evaluate(120.0).unwrap();
            assert!(after > before, "{channel} should not loop");
        }
    }

    #[test]
    fn aux_channels_start_on_their_own_cue() {
        let aux2 = builtin_table(Channel::Aux2).unwrap();
        let aux3 = builtin_table(Channel::Aux3).unwrap();
        assert_eq!(aux2.evaluate(10.0), Ok(0.0));
        assert!(aux2.evaluate(11.0).unwrap() > 0.0);
        assert_eq!(aux3.evaluate(15.0), Ok(0.0));
        assert!(aux3.evaluate(16.0).unwrap() > 0.0);
    }
}
