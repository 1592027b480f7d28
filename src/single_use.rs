//! One-shot stopwatch for a single named span.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::TimerError;

/// Measured span produced by [`SingleUseTimer::report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanReport {
    pub name: String,
    pub elapsed: Duration,
}

impl SpanReport {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_nanos() as f64 / 1_000_000.0
    }
}

impl Display for SpanReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {:.3} ms", self.name, self.elapsed_ms())
    }
}

/// Stopwatch for one operation: start, stop, report.
///
/// # Example
///
/// ```rust
/// use iteration_timer::SingleUseTimer;
///
/// let mut timer = SingleUseTimer::new("warmup", true);
/// // ... work being measured ...
/// timer.stop()?;
/// println!("{}", timer.report()?);
/// # Ok::<(), iteration_timer::TimerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SingleUseTimer<C = SystemClock> {
    name: String,
    clock: C,
    begin: Option<Instant>,
    end: Option<Instant>,
}

impl SingleUseTimer<SystemClock> {
    /// Create a timer, starting it immediately if `auto_start` is set.
    pub fn new(name: impl Into<String>, auto_start: bool) -> Self {
        Self::with_clock(name, auto_start, SystemClock)
    }
}

impl<C: Clock> SingleUseTimer<C> {
    pub fn with_clock(name: impl Into<String>, auto_start: bool, clock: C) -> Self {
        let mut timer = Self {
            name: name.into(),
            clock,
            begin: None,
            end: None,
        };
        if auto_start {
            timer.start();
        }
        timer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capture the begin instant. Calling this again restarts the span.
    pub fn start(&mut self) {
        self.begin = Some(self.clock.now());
        self.end = None;
    }

    /// Capture the end instant.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        if self.begin.is_none() {
            return Err(TimerError::InvalidState(format!(
                "timer '{}' was stopped before it was started",
                self.name
            )));
        }
        if self.end.is_some() {
            return Err(TimerError::InvalidState(format!(
                "timer '{}' has already been stopped",
                self.name
            )));
        }
        self.end = Some(self.clock.now());
        Ok(())
    }

    pub fn elapsed(&self) -> Result<Duration, TimerError> {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) => Ok(end.saturating_duration_since(begin)),
            _ => Err(TimerError::InvalidState(format!(
                "timer '{}' has not been stopped",
                self.name
            ))),
        }
    }

    /// The measured span. Only available once the timer has been stopped.
    pub fn report(&self) -> Result<SpanReport, TimerError> {
        let report = SpanReport {
            name: self.name.clone(),
            elapsed: self.elapsed()?,
        };
        info!(
            event = "Timer",
            phase = "Report",
            timer = report.name.as_str(),
            elapsed_ms = report.elapsed_ms()
        );
        Ok(report)
    }

    pub fn print_to_stdout(&self) -> Result<(), TimerError> {
        println!("{}", self.report()?);
        Ok(())
    }
}
