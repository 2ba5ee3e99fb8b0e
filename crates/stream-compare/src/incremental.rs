//! Incremental comparators built from equality functions.
//!
//! On each call the built comparator compares the prefix both states have
//! reached, and drops that prefix from both states when it is equal. Memory
//! use therefore tracks how far one source runs ahead of the other rather
//! than the total size of the streams.
//!
//! Once a side has ended it cannot catch up, so anything the other side
//! holds beyond it is compared too, and an ended side with no data is
//! compared as empty. A notification a source emits after its end, such as
//! `close`, can therefore show up as an events difference; leave it out of
//! the watched events when checking events incrementally.

use stream_compare_core::{DataSlice, StreamEvent};

use crate::options::CompareFn;
use crate::state::StreamState;

/// Compares two equal-length data prefixes. `Ok(None)` means equal.
pub type DataEqFn<T, E> = Box<dyn FnMut(DataSlice<'_>, DataSlice<'_>) -> Result<Option<T>, E>>;

/// Compares two equal-length event prefixes. `Ok(None)` means equal.
pub type EventsEqFn<T, E> = Box<dyn FnMut(&[StreamEvent], &[StreamEvent]) -> Result<Option<T>, E>>;

/// Build an incremental comparator.
///
/// Data and events are checked independently. When both checks would give
/// a result on the same call, the data result wins.
pub fn make_incremental<T: 'static, E: 'static>(
    mut data_eq: Option<DataEqFn<T, E>>,
    mut events_eq: Option<EventsEqFn<T, E>>,
) -> CompareFn<T, E> {
    Box::new(move |first: &mut StreamState, second: &mut StreamState| -> Result<Option<T>, E> {
        if let Some(eq) = data_eq.as_mut() {
            if let Some(result) = compare_data(eq, first, second)? {
                return Ok(Some(result));
            }
        }
        match events_eq.as_mut() {
            Some(eq) => compare_events(eq, first, second),
            None => Ok(None),
        }
    })
}

fn compare_data<T, E>(
    eq: &mut DataEqFn<T, E>,
    first: &mut StreamState,
    second: &mut StreamState,
) -> Result<Option<T>, E> {
    let (len1, len2) = (first.data_len(), second.data_len());
    if !comparable(first, len1) || !comparable(second, len2) {
        return Ok(None);
    }
    let common = len1.min(len2);
    let (take1, take2) = comparable_lens(first, second, len1, len2);

    let left = first.data().map(|data| data.prefix(take1));
    let right = second.data().map(|data| data.prefix(take2));
    let (left, right) = match (left, right) {
        (Some(left), Some(right)) => (left, right),
        (Some(left), None) => (left, left.empty_like()),
        (None, Some(right)) => (right.empty_like(), right),
        (None, None) => return Ok(None),
    };

    let result = eq(left, right)?;
    if result.is_none() && common != 0 {
        first.retain_data_from(common);
        second.retain_data_from(common);
    }
    Ok(result)
}

fn compare_events<T, E>(
    eq: &mut EventsEqFn<T, E>,
    first: &mut StreamState,
    second: &mut StreamState,
) -> Result<Option<T>, E> {
    let (len1, len2) = (first.events().len(), second.events().len());
    if !comparable(first, len1) || !comparable(second, len2) {
        return Ok(None);
    }
    let common = len1.min(len2);
    let (take1, take2) = comparable_lens(first, second, len1, len2);

    let result = eq(&first.events()[..take1], &second.events()[..take2])?;
    if result.is_none() && common != 0 {
        first.retain_events_from(common);
        second.retain_events_from(common);
    }
    Ok(result)
}

/// A side takes part once it has something retained or has ended.
fn comparable(state: &StreamState, len: usize) -> bool {
    len != 0 || state.ended()
}

/// How much of each side to compare.
///
/// A side's excess over the common length is held back only while the
/// other side can still catch up. Once the shorter side has ended, the
/// longer side is compared in full.
fn comparable_lens(first: &StreamState, second: &StreamState, len1: usize, len2: usize) -> (usize, usize) {
    let common = len1.min(len2);
    let take1 = if len1 > common && !second.ended() { common } else { len1 };
    let take2 = if len2 > common && !first.ended() { common } else { len2 };
    (take1, take2)
}

/// Builder over [`make_incremental`].
///
/// ```
/// use stream_compare::{data_equal, events_equal, IncrementalBuilder};
///
/// let incremental = IncrementalBuilder::new()
///     .data(data_equal)
///     .events(events_equal)
///     .build();
/// # drop(incremental);
/// ```
pub struct IncrementalBuilder<T, E> {
    data: Option<DataEqFn<T, E>>,
    events: Option<EventsEqFn<T, E>>,
}

impl<T, E> Default for IncrementalBuilder<T, E> {
    fn default() -> Self {
        Self {
            data: None,
            events: None,
        }
    }
}

impl<T: 'static, E: 'static> IncrementalBuilder<T, E> {
    /// A builder with neither check set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data equality function.
    pub fn data<F>(mut self, eq: F) -> Self
    where
        F: FnMut(DataSlice<'_>, DataSlice<'_>) -> Result<Option<T>, E> + 'static,
    {
        self.data = Some(Box::new(eq));
        self
    }

    /// Set the events equality function.
    pub fn events<F>(mut self, eq: F) -> Self
    where
        F: FnMut(&[StreamEvent], &[StreamEvent]) -> Result<Option<T>, E> + 'static,
    {
        self.events = Some(Box::new(eq));
        self
    }

    pub fn build(self) -> CompareFn<T, E> {
        make_incremental(self.data, self.events)
    }
}
