use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::channels::{Channel, ChannelSet};
use crate::segment::{Rule, Segment, TailPolicy};
use crate::table::SegmentTable;
use crate::TimelineError;

const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse timeline: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid timeline: {0}")]
    Invalid(String),
    #[error("channel '{channel}': {source}")]
    Table {
        channel: Channel,
        #[source]
        source: TimelineError,
    },
}

/// Per-channel overrides loaded from TOML.
///
/// ```toml
/// version = 1
///
/// [channels.aux2]
/// segments = [
///     { start = 0, rule = "hold" },
///     { start = "10s 458ms", rule = "scaled", rate = 0.622 },
/// ]
/// tail = { mode = "wrap", start = 99.999, period = 8, rate = 0.5 }
/// ```
///
/// Channels that are not listed keep their built-in tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineConfig {
    pub version: u32,
    #[serde(default)]
    pub channels: BTreeMap<Channel, ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub initial_phase: f64,
    pub segments: Vec<SegmentConfig>,
    #[serde(default)]
    pub tail: TailConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentConfig {
    #[serde(deserialize_with = "deserialize_seconds")]
    pub start: f64,
    pub rule: Rule,
    #[serde(default = "default_rate")]
    pub rate: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TailConfig {
    #[default]
    Continue,
    Wrap {
        #[serde(deserialize_with = "deserialize_seconds")]
        start: f64,
        #[serde(deserialize_with = "deserialize_seconds")]
        period: f64,
        rate: f64,
    },
}

fn default_rate() -> f64 {
    1.0
}

impl TimelineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: TimelineConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported timeline version {} (expected {SUPPORTED_VERSION})",
                self.version
            )));
        }
        for (channel, config) in &self.channels {
            config.to_table().map_err(|source| ConfigError::Table {
                channel: *channel,
                source,
            })?;
        }
        Ok(())
    }

    /// Builds the channel set, using built-in tables for unlisted channels.
    pub fn channel_set(&self) -> Result<ChannelSet, ConfigError> {
        let builtin = ChannelSet::builtin().map_err(|source| ConfigError::Table {
            channel: Channel::Raw,
            source,
        })?;
        self.channels
            .iter()
            .try_fold(builtin, |set, (channel, config)| {
                let table = config.to_table().map_err(|source| ConfigError::Table {
                    channel: *channel,
                    source,
                })?;
                Ok(set.with_table(*channel, table))
            })
    }
}

impl ChannelConfig {
    pub fn to_table(&self) -> Result<SegmentTable, TimelineError> {
        let segments = self
            .segments
            .iter()
            .map(|segment| Segment {
                start: segment.start,
                rule: segment.rule,
                rate: segment.rate,
            })
            .collect();
        let tail = match self.tail {
            TailConfig::Continue => TailPolicy::Continue,
            TailConfig::Wrap {
                start,
                period,
                rate,
            } => TailPolicy::wrap(start, period, rate),
        };
        SegmentTable::with_initial_phase(segments, tail, self.initial_phase)
    }
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a time as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(|duration| duration.as_secs_f64())
                .map_err(|err| E::custom(format!("invalid time '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v as f64)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("time must be non-negative"));
            }
            Ok(v as f64)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("time must be non-negative"));
            }
            Ok(v)
        }
    }

    deserializer.deserialize_any(Visitor)
}
