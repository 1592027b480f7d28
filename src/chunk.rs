//! A single named phase instance within an iteration.

use std::time::{Duration, Instant};

use strum_macros::{Display, EnumString};

/// Lifecycle of a [`TimeChunk`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ChunkState {
    Open,
    Closed,
}

/// One phase of the current iteration.
///
/// A chunk is created open with its begin instant already captured, and is
/// closed at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeChunk {
    name: String,
    begin: Instant,
    end: Option<Instant>,
}

impl TimeChunk {
    pub(crate) fn open(name: impl Into<String>, begin: Instant) -> Self {
        Self {
            name: name.into(),
            begin,
            end: None,
        }
    }

    pub(crate) fn close(&mut self, end: Instant) {
        debug_assert!(self.end.is_none(), "chunk {} closed twice", self.name);
        self.end = Some(end);
    }

    pub(crate) fn into_name(self) -> String {
        self.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn begin(&self) -> Instant {
        self.begin
    }

    pub fn end(&self) -> Option<Instant> {
        self.end
    }

    pub fn state(&self) -> ChunkState {
        match self.end {
            Some(_) => ChunkState::Closed,
            None => ChunkState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Time between begin and end, or `None` while the chunk is open.
    ///
    /// An end instant earlier than begin yields zero.
    pub fn elapsed(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_duration_since(self.begin))
    }
}
