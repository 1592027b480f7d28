//! Scoped timepoints.
//!
//! This module provides an RAII guard that closes a timepoint when dropped,
//! and a closure helper built on the same open/close pair. Both are useful
//! when a phase has early returns that would otherwise skip the close.

use tracing::warn;

use crate::accumulator::IterationAccumulator;
use crate::chunk::TimeChunk;
use crate::clock::Clock;
use crate::error::TimerError;

/// RAII guard that closes its timepoint on Drop.
///
/// The guard borrows the accumulator mutably, so nothing else can touch the
/// current iteration while the phase is running.
///
/// # Example
///
/// ```rust
/// use iteration_timer::IterationAccumulator;
///
/// let mut timer = IterationAccumulator::new();
/// {
///     let _phase = timer.scoped("parse");
///     // ... work being measured ...
/// } // phase closed here
/// timer.commit_iteration()?;
/// # Ok::<(), iteration_timer::TimerError>(())
/// ```
pub struct TimepointGuard<'a, C: Clock> {
    accumulator: &'a mut IterationAccumulator<C>,
    armed: bool,
}

impl<'a, C: Clock> TimepointGuard<'a, C> {
    fn new(accumulator: &'a mut IterationAccumulator<C>, name: String) -> Self {
        accumulator.open_timepoint(name);
        Self {
            accumulator,
            armed: true,
        }
    }

    /// Drop the timepoint instead of closing it.
    pub fn discard(mut self) -> Result<TimeChunk, TimerError> {
        self.armed = false;
        self.accumulator.discard_last_timepoint()
    }
}

impl<C: Clock> Drop for TimepointGuard<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.accumulator.close_timepoint() {
            warn!(
                event = "Timepoint",
                phase = "Close",
                error = %err,
                "scoped timepoint could not be closed"
            );
        }
    }
}

impl<C: Clock> IterationAccumulator<C> {
    /// Open `name` and return a guard that closes it when dropped.
    pub fn scoped(&mut self, name: impl Into<String>) -> TimepointGuard<'_, C> {
        TimepointGuard::new(self, name.into())
    }

    /// Time `f` as the phase `name` and return its result.
    pub fn measure<F, R>(&mut self, name: impl Into<String>, f: F) -> Result<R, TimerError>
    where
        F: FnOnce() -> R,
    {
        self.open_timepoint(name);
        let result = f();
        self.close_timepoint()?;
        Ok(result)
    }
}
