// src/lib.rs
pub use accumulator::{IterationAccumulator, PhaseTotal};
pub use chunk::{ChunkState, TimeChunk};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TimerError;
pub use metrics::{DiscardScope, DiscardStats, IterationSink, IterationStats, PhaseSample};
pub use report::{PhaseSummary, Report, ReportConfig};
pub use single_use::{SingleUseTimer, SpanReport};
pub use timers::TimepointGuard;

mod accumulator;
mod chunk;
mod clock;
mod error;
pub mod metrics;
mod report;
mod single_use;
mod timers;

#[cfg(test)]
mod tests;
