//! Time-warp tables that turn one wall-clock accumulator into animation phases.
//!
//! ```text
//!   WallClock ──▶ ClockAccumulator::tick ──▶ raw seconds
//!                                               │
//!                       ┌───────────┬───────────┼───────────┬───────────┐
//!                       ▼           ▼           ▼           ▼           ▼
//!                      raw         aux1        aux2        aux3        panel
//!                  (SegmentTable::evaluate, one table per channel)
//!                                               │
//!                                               ▼
//!                                           PhaseSet
//! ```
//!
//! Every channel shares the same evaluator; only the breakpoint data differs.
//! Tables are validated once when built and are immutable afterwards, so
//! evaluation is a pure lookup plus one arithmetic rule.

mod channels;
mod clock;
mod config;
mod presets;
mod segment;
mod table;

pub use channels::{Channel, ChannelSet, PhaseSet, CHANNEL_COUNT};
pub use clock::{ClockAccumulator, ManualClock, SystemWallClock, WallClock};
pub use config::{ChannelConfig, ConfigError, SegmentConfig, TailConfig, TimelineConfig};
pub use presets::builtin_table;
pub use segment::{Rule, Segment, TailPolicy};
pub use table::{evaluate, SegmentTable};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("invalid timeline input {0}: time must be finite and non-negative")]
    InvalidInput(f64),
    #[error("invalid segment table: {0}")]
    InvalidTable(String),
}
