//! Per-source comparison state.
//!
//! One [`StreamState`] is kept for each input while a comparison runs. The
//! engine is the only writer; comparators receive both states by mutable
//! reference but can only shed already-compared data through
//! [`StreamState::retain_data_from`] and [`StreamState::retain_events_from`].

use std::fmt;

use stream_compare_core::{Chunk, DataShapeError, StreamData, StreamEvent};

/// Which of the two compared inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    First,
    Second,
}

impl Side {
    /// Both sides, in order.
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    /// This side alone.
    pub(crate) const fn as_slice(self) -> &'static [Side] {
        match self {
            Side::First => &[Side::First],
            Side::Second => &[Side::Second],
        }
    }

    /// Position of this side in a pair.
    pub const fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::First => f.write_str("first"),
            Side::Second => f.write_str("second"),
        }
    }
}

/// Data, events and termination observed on one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    /// Set once, when an end-triggering notification is first seen.
    ended: bool,

    /// Watched notifications in observation order.
    events: Vec<StreamEvent>,

    /// Accumulated payload. `None` until the first chunk.
    data: Option<StreamData>,

    /// Units of data accumulated so far, including truncated data.
    total_data_len: usize,
}

impl StreamState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the source has terminated.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Logged notifications not yet truncated.
    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    /// Accumulated payload not yet truncated.
    pub fn data(&self) -> Option<&StreamData> {
        self.data.as_ref()
    }

    /// Length of the retained payload (zero when absent).
    pub fn data_len(&self) -> usize {
        self.data.as_ref().map_or(0, StreamData::len)
    }

    /// Total units of data ever accumulated.
    ///
    /// Not reduced by truncation.
    pub fn total_data_len(&self) -> usize {
        self.total_data_len
    }

    /// Replace the payload with its suffix starting at `start`.
    pub fn retain_data_from(&mut self, start: usize) {
        if let Some(data) = self.data.as_mut() {
            data.advance(start);
        }
    }

    /// Replace the event log with its suffix starting at `start`.
    pub fn retain_events_from(&mut self, start: usize) {
        let start = start.min(self.events.len());
        self.events.drain(..start);
    }

    /// Mark the source as terminated.
    ///
    /// Returns whether this call made the transition.
    pub(crate) fn mark_ended(&mut self) -> bool {
        !std::mem::replace(&mut self.ended, true)
    }

    pub(crate) fn record_event(&mut self, event: StreamEvent) {
        self.events.push(event);
    }

    /// Accumulate a chunk.
    ///
    /// Itemized chunks are appended as elements; plain chunks are
    /// concatenated and must stay within one family.
    pub(crate) fn add_chunk(&mut self, chunk: Chunk, itemized: bool) -> Result<(), DataShapeError> {
        if itemized {
            match self.data.get_or_insert_with(|| StreamData::Items(Vec::new())) {
                StreamData::Items(items) => items.push(chunk),
                other => {
                    return Err(DataShapeError::TypeMismatch {
                        accumulated: other.kind(),
                        chunk: chunk.kind(),
                    })
                }
            }
            self.total_data_len += 1;
            return Ok(());
        }

        let len = chunk.len();
        match self.data.as_mut() {
            Some(data) => data.concat(chunk)?,
            None => self.data = Some(StreamData::plain(chunk)?),
        }
        self.total_data_len += len;
        Ok(())
    }
}
