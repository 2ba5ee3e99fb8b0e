//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;
use stream_compare::Chunk;

use crate::fixtures::Step;

/// Split `s` into pieces at the given character positions.
///
/// Positions past the end are clamped; empty pieces are dropped.
pub fn split_text(s: &str, cuts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    split_at(&chars, cuts)
        .into_iter()
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Split `b` into pieces at the given byte positions.
pub fn split_bytes(b: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    split_at(b, cuts).into_iter().map(<[u8]>::to_vec).collect()
}

fn split_at<'a, T>(items: &'a [T], cuts: &[usize]) -> Vec<&'a [T]> {
    let mut cuts: Vec<usize> = cuts.iter().map(|&cut| cut.min(items.len())).collect();
    cuts.push(items.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts {
        if cut > start {
            pieces.push(&items[start..cut]);
        }
        start = cut;
    }
    pieces
}

/// Generate short text, including multi-byte characters.
pub fn text() -> impl Strategy<Value = String> {
    "\\PC{0,48}"
}

/// Generate two independent chunkings of the same text.
pub fn text_chunkings() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    text()
        .prop_flat_map(|s| {
            let len = s.chars().count();
            (
                Just(s),
                prop::collection::vec(0..=len, 0..6),
                prop::collection::vec(0..=len, 0..6),
            )
        })
        .prop_map(|(s, a, b)| (split_text(&s, &a), split_text(&s, &b)))
}

/// Generate two independent chunkings of the same bytes.
pub fn byte_chunkings() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Vec<u8>>)> {
    prop::collection::vec(any::<u8>(), 0..64)
        .prop_flat_map(|bytes| {
            let len = bytes.len();
            (
                Just(bytes),
                prop::collection::vec(0..=len, 0..6),
                prop::collection::vec(0..=len, 0..6),
            )
        })
        .prop_map(|(bytes, a, b)| (split_bytes(&bytes, &a), split_bytes(&bytes, &b)))
}

/// Generate a notification name, watched or not.
pub fn event_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("end".to_string()),
        Just("close".to_string()),
        Just("error".to_string()),
        "[a-z]{1,8}",
    ]
}

/// Generate one scripted source action.
pub fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => text().prop_map(|s| Step::Write(Chunk::Text(s))),
        2 => (event_name(), prop::collection::vec(any::<u8>().prop_map(Value::from), 0..2))
            .prop_map(|(name, args)| Step::Emit(name, args)),
        1 => Just(Step::End),
        1 => any::<u8>().prop_map(|n| Step::Fail(Value::from(n))),
    ]
}

/// Generate a script of source actions.
pub fn script() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(step(), 0..12)
}

/// Text writes followed by `End`.
pub fn text_script(chunks: &[String]) -> Vec<Step> {
    chunks
        .iter()
        .map(|chunk| Step::text(chunk))
        .chain(std::iter::once(Step::End))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{block_on, SourcePair};
    use std::cell::Cell;
    use std::rc::Rc;
    use stream_compare::{
        data_equal, deep_equal, CompareOptions, DataSlice, IncrementalBuilder, ReadPolicy,
        StreamState,
    };

    #[test]
    fn test_split_text() {
        assert_eq!(split_text("héllo", &[2, 9, 2, 0]), ["hé", "llo"]);
        assert!(split_text("", &[0, 3]).is_empty());
        assert_eq!(split_bytes(&[1, 2, 3], &[1]), [vec![1], vec![2, 3]]);
    }

    proptest! {
        #[test]
        fn test_rechunked_text_compares_equal((a, b) in text_chunkings()) {
            let pair = SourcePair::new();
            let handle = pair.compare(CompareOptions::new(deep_equal));
            pair.play(&text_script(&a), &text_script(&b));

            prop_assert_eq!(block_on(handle).map_err(|e| e.to_string()), Ok(None));
            prop_assert!(pair.is_detached());
        }

        #[test]
        fn test_rechunked_bytes_compare_equal((a, b) in byte_chunkings()) {
            let pair = SourcePair::new();
            let handle = pair.compare(
                CompareOptions::new(deep_equal).read_policy(ReadPolicy::Flowing),
            );
            let script = |chunks: &[Vec<u8>]| -> Vec<Step> {
                chunks.iter().map(|c| Step::bytes(c)).chain(std::iter::once(Step::End)).collect()
            };
            pair.play(&script(&a), &script(&b));

            prop_assert_eq!(block_on(handle).map_err(|e| e.to_string()), Ok(None));
        }

        #[test]
        fn test_different_text_is_detected(a in text(), b in text()) {
            prop_assume!(a != b);
            let pair = SourcePair::new();
            let handle = pair.compare(CompareOptions::new(deep_equal));
            pair.play(&text_script(&[a]), &text_script(&[b]));

            prop_assert!(block_on(handle).is_err());
        }

        #[test]
        fn test_incremental_truncates_everything((a, b) in text_chunkings()) {
            let total = a.iter().map(|s| s.chars().count()).sum::<usize>();
            let pair = SourcePair::new();
            let handle = pair.compare(
                CompareOptions::new(|a: &mut StreamState, b: &mut StreamState| {
                    Ok(Some((a.data_len(), b.data_len(), a.total_data_len())))
                })
                .incremental(
                    IncrementalBuilder::new()
                        .data(|l: DataSlice<'_>, r: DataSlice<'_>| data_equal(l, r).map(|_| None))
                        .build(),
                ),
            );
            pair.play(&text_script(&a), &text_script(&b));

            prop_assert_eq!(block_on(handle).map_err(|e| e.to_string()), Ok(Some((0, 0, total))));
        }

        #[test]
        fn test_resolves_exactly_once(first in script(), second in script(), after in script()) {
            let calls = Rc::new(Cell::new(0u32));
            let counter = Rc::clone(&calls);
            let pair = SourcePair::new();
            let handle = pair.compare(CompareOptions::new(
                move |_: &mut StreamState, _: &mut StreamState| {
                    counter.set(counter.get() + 1);
                    Ok::<Option<u32>, String>(Some(counter.get()))
                },
            ));

            pair.play(&first, &second);
            handle.end();
            prop_assert!(handle.is_settled());
            prop_assert!(pair.is_detached());

            pair.play(&after, &after);
            handle.checkpoint();
            handle.end();

            prop_assert_eq!(block_on(handle).map_err(|e| e.to_string()), Ok(Some(1)));
            prop_assert_eq!(calls.get(), 1);
        }
    }
}
