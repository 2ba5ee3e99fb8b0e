//! Structural equality checks that explain the first difference found.

use crate::error::Mismatch;
use crate::event::StreamEvent;
use crate::types::DataSlice;

const NONE: &str = "<none>";

/// Compare two (possibly absent) payloads.
///
/// Returns `None` when they are equal.
pub fn data_mismatch(left: Option<DataSlice<'_>>, right: Option<DataSlice<'_>>) -> Option<Mismatch> {
    match (left, right) {
        (None, None) => None,
        (Some(l), Some(r)) if l.kind() != r.kind() => Some(Mismatch::DataKind {
            left: l.kind(),
            right: r.kind(),
        }),
        (l, r) if l == r => None,
        (l, r) => Some(Mismatch::Data {
            left: l.map_or_else(|| NONE.to_string(), |s| s.to_string()),
            right: r.map_or_else(|| NONE.to_string(), |s| s.to_string()),
        }),
    }
}

/// Compare two event logs element by element.
///
/// Returns `None` when they are equal.
pub fn events_mismatch(left: &[StreamEvent], right: &[StreamEvent]) -> Option<Mismatch> {
    let len = left.len().max(right.len());
    (0..len).find_map(|index| {
        let l = left.get(index);
        let r = right.get(index);
        (l != r).then(|| Mismatch::Events {
            index,
            left: render_event(l),
            right: render_event(r),
        })
    })
}

fn render_event(event: Option<&StreamEvent>) -> String {
    match event {
        None => NONE.to_string(),
        Some(event) => {
            let args: Vec<String> = event.args.iter().map(|a| a.to_string()).collect();
            format!("{}({})", event.name, args.join(", "))
        }
    }
}
