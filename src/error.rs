use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Usage errors raised by the timers.
///
/// Every variant means the instrumentation was wired up incorrectly. None of
/// them are environmental failures, so callers should fix the call site rather
/// than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TimerError {
    #[error("no timepoint in the current iteration")]
    NoOpenTimepoint,

    #[error("the most recent timepoint ({0}) has already been closed")]
    TimepointAlreadyClosed(String),

    #[error(
        "timepoint ({0}) was never closed; close it, or discard the timepoint or iteration to state your intent"
    )]
    IncompleteTimepoint(String),

    #[error("invalid timer state: {0}")]
    InvalidState(String),
}
