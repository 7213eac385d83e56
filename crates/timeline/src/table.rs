use crate::segment::{Segment, TailPolicy};
use crate::TimelineError;

/// Ordered breakpoints for one phase channel.
///
/// Each segment is entered at the phase the previous one ended at, so the
/// output is continuous across breakpoints. The anchors are computed once at
/// construction; [`SegmentTable::evaluate`] never mutates the table.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    anchors: Vec<f64>,
    tail: TailPolicy,
}

impl SegmentTable {
    pub fn new(segments: Vec<Segment>, tail: TailPolicy) -> Result<Self, TimelineError> {
        Self::with_initial_phase(segments, tail, 0.0)
    }

    /// Builds a table whose first segment is entered at `initial_phase`.
    pub fn with_initial_phase(
        segments: Vec<Segment>,
        tail: TailPolicy,
        initial_phase: f64,
    ) -> Result<Self, TimelineError> {
        validate(&segments, tail, initial_phase)?;

        let mut anchors = Vec::with_capacity(segments.len());
        anchors.push(initial_phase);
        for pair in segments.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let entered_at = anchors[anchors.len() - 1];
            anchors.push(current.advance(entered_at, next.start - current.start));
        }

        Ok(Self {
            segments,
            anchors,
            tail,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn tail(&self) -> TailPolicy {
        self.tail
    }

    pub fn first_breakpoint(&self) -> f64 {
        self.segments[0].start
    }

    /// Start of the wrapping tail, or of the final segment when the tail continues.
    pub fn last_breakpoint(&self) -> f64 {
        match self.tail {
            TailPolicy::Wrap { start, .. } => start,
            TailPolicy::Continue => self.segments[self.segments.len() - 1].start,
        }
    }

    /// Every time at which the active rule changes, in ascending order.
    pub fn breakpoints(&self) -> Vec<f64> {
        let mut points: Vec<f64> = self.segments.iter().map(|segment| segment.start).collect();
        if let TailPolicy::Wrap { start, .. } = self.tail {
            points.push(start);
        }
        points
    }

    /// Phase at which segment `index` is entered.
    pub fn anchor(&self, index: usize) -> Option<f64> {
        self.anchors.get(index).copied()
    }

    pub fn evaluate(&self, time: f64) -> Result<f64, TimelineError> {
        if !time.is_finite() || time < 0.0 {
            return Err(TimelineError::InvalidInput(time));
        }

        if let TailPolicy::Wrap {
            start,
            period,
            rate,
        } = self.tail
        {
            if time >= start {
                return Ok(((time - start) % period) / rate);
            }
        }

        // Intervals are [start, next_start): a time equal to a breakpoint
        // belongs to the segment starting there.
        let active = self.segments.partition_point(|segment| segment.start <= time);
        if active == 0 {
            return Ok(self.anchors[0]);
        }
        let index = active - 1;
        let segment = &self.segments[index];
        Ok(segment.advance(self.anchors[index], time - segment.start))
    }
}

/// Free-function form of [`SegmentTable::evaluate`].
pub fn evaluate(table: &SegmentTable, time: f64) -> Result<f64, TimelineError> {
    table.evaluate(time)
}

fn validate(segments: &[Segment], tail: TailPolicy, initial_phase: f64) -> Result<(), TimelineError> {
    let invalid = |message: String| Err(TimelineError::InvalidTable(message));

    if segments.is_empty() {
        return invalid("table must contain at least one segment".into());
    }
    if !initial_phase.is_finite() || initial_phase < 0.0 {
        return invalid(format!(
            "initial phase {initial_phase} must be finite and non-negative"
        ));
    }

    for (index, segment) in segments.iter().enumerate() {
        if !segment.start.is_finite() || segment.start < 0.0 {
            return invalid(format!(
                "segment {index} starts at {}, expected a finite non-negative time",
                segment.start
            ));
        }
        if segment.uses_rate() && !(segment.rate.is_finite() && segment.rate > 0.0) {
            return invalid(format!(
                "segment {index} ({:?}) has rate {}, expected a finite positive rate",
                segment.rule, segment.rate
            ));
        }
    }

    for (index, pair) in segments.windows(2).enumerate() {
        if pair[1].start <= pair[0].start {
            return invalid(format!(
                "segment {} starts at {} which is not after segment {index} at {}",
                index + 1,
                pair[1].start,
                pair[0].start
            ));
        }
    }

    if let TailPolicy::Wrap {
        start,
        period,
        rate,
    } = tail
    {
        let last = segments[segments.len() - 1].start;
        if !start.is_finite() || start <= last {
            return invalid(format!(
                "wrap tail starts at {start}, expected a time after the last segment at {last}"
            ));
        }
        if !(period.is_finite() && period > 0.0) {
            return invalid(format!("wrap period {period} must be finite and positive"));
        }
        if !(rate.is_finite() && rate > 0.0) {
            return invalid(format!("wrap rate {rate} must be finite and positive"));
        }
    }

    Ok(())
}
