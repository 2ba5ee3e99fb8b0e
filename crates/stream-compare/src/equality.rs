//! Stock comparators built on structural equality.
//!
//! Each returns `Ok(None)` when its inputs are equal and `Err(Mismatch)`
//! describing the first difference otherwise, so a mismatch rejects the
//! comparison and equality resolves it with `None`.

use stream_compare_core::{
    data_mismatch, events_mismatch, DataSlice, Mismatch, StreamData, StreamEvent,
};

use crate::state::StreamState;

/// Structural equality over two whole states.
///
/// Checks data, then events, then termination, then total length.
pub fn deep_equal(first: &mut StreamState, second: &mut StreamState) -> Result<Option<()>, Mismatch> {
    let left = first.data().map(StreamData::as_slice);
    let right = second.data().map(StreamData::as_slice);
    if let Some(mismatch) = data_mismatch(left, right) {
        return Err(mismatch);
    }
    if let Some(mismatch) = events_mismatch(first.events(), second.events()) {
        return Err(mismatch);
    }
    if first.ended() != second.ended() {
        return Err(Mismatch::Ended {
            left: first.ended(),
            right: second.ended(),
        });
    }
    if first.total_data_len() != second.total_data_len() {
        return Err(Mismatch::TotalLength {
            left: first.total_data_len(),
            right: second.total_data_len(),
        });
    }
    Ok(None)
}

/// Equality of two data slices, for [`make_incremental`](crate::make_incremental).
pub fn data_equal(first: DataSlice<'_>, second: DataSlice<'_>) -> Result<Option<()>, Mismatch> {
    match data_mismatch(Some(first), Some(second)) {
        Some(mismatch) => Err(mismatch),
        None => Ok(None),
    }
}

/// Equality of two event logs, for [`make_incremental`](crate::make_incremental).
pub fn events_equal(first: &[StreamEvent], second: &[StreamEvent]) -> Result<Option<()>, Mismatch> {
    match events_mismatch(first, second) {
        Some(mismatch) => Err(mismatch),
        None => Ok(None),
    }
}
