use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::presets::builtin_table;
use crate::table::SegmentTable;
use crate::TimelineError;

/// Number of phase channels fed to the shader.
pub const CHANNEL_COUNT: usize = 5;

/// Identifies one phase channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Raw,
    Aux1,
    Aux2,
    Aux3,
    Panel,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Raw,
        Channel::Aux1,
        Channel::Aux2,
        Channel::Aux3,
        Channel::Panel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Raw => "raw",
            Channel::Aux1 => "aux1",
            Channel::Aux2 => "aux2",
            Channel::Aux3 => "aux3",
            Channel::Panel => "panel",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name() == normalized)
            .ok_or_else(|| {
                format!("unknown channel '{value}'; expected raw, aux1, aux2, aux3, or panel")
            })
    }
}

/// Phase values for every channel, all evaluated at the same raw time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PhaseSet {
    pub raw: f64,
    pub aux1: f64,
    pub aux2: f64,
    pub aux3: f64,
    pub panel: f64,
}

impl PhaseSet {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Raw => self.raw,
            Channel::Aux1 => self.aux1,
            Channel::Aux2 => self.aux2,
            Channel::Aux3 => self.aux3,
            Channel::Panel => self.panel,
        }
    }

    /// Values in [`Channel::ALL`] order.
    pub fn to_array(&self) -> [f64; CHANNEL_COUNT] {
        [self.raw, self.aux1, self.aux2, self.aux3, self.panel]
    }
}

/// One immutable table per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet {
    tables: [SegmentTable; CHANNEL_COUNT],
}

impl ChannelSet {
    pub fn new(
        raw: SegmentTable,
        aux1: SegmentTable,
        aux2: SegmentTable,
        aux3: SegmentTable,
        panel: SegmentTable,
    ) -> Self {
        Self {
            tables: [raw, aux1, aux2, aux3, panel],
        }
    }

    /// The tables shipped with the soundtrack.
    pub fn builtin() -> Result<Self, TimelineError> {
        Ok(Self::new(
            builtin_table(Channel::Raw)?,
            builtin_table(Channel::Aux1)?,
            builtin_table(Channel::Aux2)?,
            builtin_table(Channel::Aux3)?,
            builtin_table(Channel::Panel)?,
        ))
    }

    pub fn table(&self, channel: Channel) -> &SegmentTable {
        &self.tables[channel.index()]
    }

    pub fn with_table(mut self, channel: Channel, table: SegmentTable) -> Self {
        self.tables[channel.index()] = table;
        self
    }

    /// Evaluates every channel at `raw_seconds`.
    ///
    /// Fails as a whole if the input is rejected, so callers never see a
    /// partially filled set.
    pub fn evaluate(&self, raw_seconds: f64) -> Result<PhaseSet, TimelineError> {
        let eval = |channel: Channel| self.table(channel).evaluate(raw_seconds);
        Ok(PhaseSet {
            raw: eval(Channel::Raw)?,
            aux1: eval(Channel::Aux1)?,
            aux2: eval(Channel::Aux2)?,
            aux3: eval(Channel::Aux3)?,
            panel: eval(Channel::Panel)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, TailPolicy};

    #[test]
    fn all_channels_start_at_zero() {
        let set = ChannelSet::builtin().unwrap();
        assert_eq!(set.evaluate(0.0), Ok(PhaseSet::default()));
    }

    #[test]
    fn set_matches_individual_tables() {
        let set = ChannelSet::builtin().unwrap();
        for time in [0.0, 7.0, 21.0, 55.5, 98.0, 103.999, 140.0] {
            let phases = set.evaluate(time).unwrap();
            for channel in Channel::ALL {
                let expected = builtin_table(channel).unwrap().evaluate(time).unwrap();
                assert_eq!(phases.get(channel), expected, "{channel} at {time}");
            }
        }
    }

    #[test]
    fn replacing_one_table_leaves_the_others_alone() {
        let constant = SegmentTable::with_initial_phase(
            vec![Segment::hold(0.0)],
            TailPolicy::Continue,
            4.0,
        )
        .unwrap();
        let builtin = ChannelSet::builtin().unwrap();
        let tuned = builtin.clone().with_table(Channel::Aux2, constant);

        let before = builtin.evaluate(30.0).unwrap();
        let after = tuned.evaluate(30.0).unwrap();
        assert_eq!(after.aux2, 4.0);
        assert_eq!(after.raw, before.raw);
        assert_eq!(after.aux1, before.aux1);
        assert_eq!(after.aux3, before.aux3);
        assert_eq!(after.panel, before.panel);
    }

    #[test]
    fn channels_desynchronise_after_the_intro() {
        let phases = ChannelSet::builtin().unwrap().evaluate(45.0).unwrap();
        let values = phases.to_array();
        for (index, value) in values.iter().enumerate() {
            for other in &values[index + 1..] {
                assert_ne!(value, other);
            }
        }
    }

    #[test]
    fn rejects_invalid_time_for_the_whole_set() {
        let set = ChannelSet::builtin().unwrap();
        assert!(set.evaluate(f64::NAN).is_err());
        assert!(set.evaluate(-1.0).is_err());
    }

    #[test]
    fn parses_channel_names() {
        assert_eq!("AUX2".parse::<Channel>(), Ok(Channel::Aux2));
        assert_eq!(" panel ".parse::<Channel>(), Ok(Channel::Panel));
        assert!("aux9".parse::<Channel>().is_err());
    }
}
