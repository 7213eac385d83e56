use serde::{Deserialize, Serialize};

/// How phase accumulates while a segment is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// Phase stays at the value carried in from the previous segment.
    Hold,
    /// Phase grows by `elapsed * rate`.
    Linear,
    /// Phase grows by `elapsed / rate`.
    Scaled,
}

/// One breakpoint of a [`SegmentTable`](crate::SegmentTable).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Raw time (seconds) at which this segment becomes active.
    pub start: f64,
    pub rule: Rule,
    /// Multiplier for [`Rule::Linear`], divisor for [`Rule::Scaled`]; ignored by [`Rule::Hold`].
    pub rate: f64,
}

impl Segment {
    pub const fn hold(start: f64) -> Self {
        Self {
            start,
            rule: Rule::Hold,
            rate: 1.0,
        }
    }

    pub const fn linear(start: f64, rate: f64) -> Self {
        Self {
            start,
            rule: Rule::Linear,
            rate,
        }
    }

    pub const fn scaled(start: f64, rate: f64) -> Self {
        Self {
            start,
            rule: Rule::Scaled,
            rate,
        }
    }

    /// Phase reached `elapsed` seconds into the segment when it was entered at `anchor`.
    pub fn advance(&self, anchor: f64, elapsed: f64) -> f64 {
        match self.rule {
            Rule::Hold => anchor,
            Rule::Linear => anchor + elapsed * self.rate,
            Rule::Scaled => anchor + elapsed / self.rate,
        }
    }

    pub(crate) fn uses_rate(&self) -> bool {
        !matches!(self.rule, Rule::Hold)
    }
}

/// Behaviour once raw time passes the end of the segment list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TailPolicy {
    /// Keep applying the last segment's rule forever.
    #[default]
    Continue,
    /// From `start` onwards, loop: `((t - start) mod period) / rate`.
    Wrap { start: f64, period: f64, rate: f64 },
}

impl TailPolicy {
    pub const fn wrap(start: f64, period: f64, rate: f64) -> Self {
        Self::Wrap {
            start,
            period,
            rate,
        }
    }

    /// Largest phase a wrapping tail can produce.
    pub fn ceiling(&self) -> Option<f64> {
        match self {
            TailPolicy::Continue => None,
            TailPolicy::Wrap { period, rate, .. } => Some(period / rate),
        }
    }
}
