//! End-to-end comparisons over in-memory sources.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use stream_compare::{
    data_equal, deep_equal, stream_compare, CompareConfig, CompareError, CompareOptions,
    ConfigError, DataSlice, IncrementalBuilder, MemorySource, Mismatch, ReadPolicy, Side,
    StreamState,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn pair() -> (Rc<MemorySource>, Rc<MemorySource>) {
    init_tracing();
    (MemorySource::new(), MemorySource::new())
}

/// Resolves with a verdict only once both sources ended.
fn when_ended(a: &mut StreamState, b: &mut StreamState) -> Result<Option<bool>, String> {
    if a.ended() && b.ended() {
        Ok(Some(a.total_data_len() == b.total_data_len()))
    } else {
        Ok(None)
    }
}

// =============================================================================
// BASIC SCENARIOS
// =============================================================================

#[tokio::test]
async fn test_empty_sources_are_equal() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    a.end();
    b.end();

    assert_eq!(handle.await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_vs_data_is_a_mismatch() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    a.end();
    b.write("hello");
    b.end();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Data { .. })), "{err}");
}

#[tokio::test]
async fn test_writes_recombine() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    a.write("hello");
    a.end();
    b.write("he");
    b.write("llo");
    b.end();

    assert_eq!(handle.await.unwrap(), None);
}

#[tokio::test]
async fn test_object_mode_keeps_chunks_apart() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).object_mode(true),
    );

    a.write("hello world");
    a.end();
    b.write("hello");
    b.write(" world");
    b.end();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Data { .. })), "{err}");
}

#[tokio::test]
async fn test_incremental_resolves_early() {
    let (a, b) = pair();
    let compared = Rc::new(Cell::new(false));
    let flag = Rc::clone(&compared);

    let incremental = IncrementalBuilder::<bool, String>::new()
        .data(|left: DataSlice<'_>, right: DataSlice<'_>| Ok((left != right).then_some(false)))
        .build();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(move |_: &mut StreamState, _: &mut StreamState| {
            flag.set(true);
            Ok(Some(true))
        })
        .incremental(incremental),
    );

    a.write("abc");
    b.write("abd");

    assert!(handle.is_settled());
    assert_eq!(handle.await.unwrap(), Some(false));
    assert!(!compared.get());
}

#[tokio::test]
async fn test_inconclusive_checkpoint_has_no_effect() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(when_ended));

    a.write("ab");
    b.write("a");
    handle.checkpoint();
    assert!(!handle.is_settled());

    b.write("b");
    a.end();
    b.end();

    assert_eq!(handle.await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_conclusive_checkpoint_resolves() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(|a: &mut StreamState, b: &mut StreamState| {
            Ok::<_, String>(Some((a.total_data_len(), b.total_data_len())))
        }),
    );

    a.write("abc");
    b.write("a");
    handle.checkpoint();

    assert!(handle.is_settled());
    assert_eq!(handle.await.unwrap(), Some((3, 1)));
}

#[tokio::test]
async fn test_end_forces_absent_result() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(when_ended));
    let control = handle.control();

    a.write("x");
    control.end();

    assert!(control.is_settled());
    assert_eq!(handle.await.unwrap(), None);
}

// =============================================================================
// FAILURES
// =============================================================================

#[tokio::test]
async fn test_bytes_vs_text_reports_type_mismatch() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    a.write(vec![0x68u8, 0x69]);
    a.end();
    b.write("hi");
    b.end();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::DataKind { .. })));
    assert!(err.to_string().contains("type mismatch"));
}

#[tokio::test]
async fn test_mixed_chunks_on_one_source_are_fatal() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).read_policy(ReadPolicy::Flowing),
    );

    a.write(vec![1u8]);
    a.write("text");

    let err = handle.await.unwrap_err();
    assert!(
        matches!(err, CompareError::DataShape { side: Side::First, .. }),
        "{err}"
    );
    assert!(err.to_string().contains("type mismatch"));
}

#[tokio::test]
async fn test_value_chunk_needs_object_mode() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).read_policy(ReadPolicy::Flowing),
    );

    b.write(json!({"id": 1}));

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::DataShape { side: Side::Second, .. }));
}

#[tokio::test]
async fn test_falsy_comparator_error_still_rejects() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(|_: &mut StreamState, _: &mut StreamState| Err::<Option<()>, _>(false)),
    );

    a.end();
    b.end();

    let err = handle.await.unwrap_err();
    assert_eq!(err.into_comparator_error(), Some(false));
}

#[tokio::test]
async fn test_abort_on_error_skips_comparators() {
    let (a, b) = pair();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(move |_: &mut StreamState, _: &mut StreamState| {
            counter.set(counter.get() + 1);
            Ok::<_, String>(Some(()))
        })
        .abort_on_error(true),
    );

    b.fail(json!("boom"));

    let err = handle.await.unwrap_err();
    assert!(matches!(
        &err,
        CompareError::SourceFailed { side: Side::Second, args } if args == &[json!("boom")]
    ));
    assert_eq!(err.to_string(), "second source failed: \"boom\"");
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn test_error_without_abort_is_an_event() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    a.fail(json!("boom"));
    b.fail(json!("boom"));

    assert_eq!(handle.await.unwrap(), None);
}

#[tokio::test]
async fn test_different_errors_are_an_event_mismatch() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    a.fail(json!("boom"));
    b.end();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Events { index: 0, .. })));
}

// =============================================================================
// VALIDATION
// =============================================================================

#[tokio::test]
async fn test_least_requires_pullable_sources() {
    init_tracing();
    let a = MemorySource::new();
    let b = MemorySource::push_only();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));

    assert!(handle.is_settled());
    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::InvalidSource { argument: "source2", .. }));
    assert!(err.to_string().contains("source2"));
    assert_eq!(a.listener_count(), 0);
}

#[tokio::test]
async fn test_push_only_sources_can_flow() {
    init_tracing();
    let a = MemorySource::push_only();
    let b = MemorySource::push_only();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).read_policy(ReadPolicy::Flowing),
    );

    a.write("same");
    b.write("sa");
    b.write("me");
    a.end();
    b.end();

    assert_eq!(handle.await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_comparator() {
    let (a, b) = pair();
    let handle = stream_compare(a, b, CompareOptions::<(), String>::default());

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::MissingComparator));
    assert!(err.to_string().contains("compare"));
}

#[tokio::test]
async fn test_empty_event_name_rejected() {
    let (a, b) = pair();
    let handle = stream_compare(
        a,
        b,
        CompareOptions::new(deep_equal).end_events(["end", ""]),
    );

    let err = handle.await.unwrap_err();
    assert!(matches!(
        err,
        CompareError::Config(ConfigError::EmptyEventName { option: "end_events" })
    ));
}

#[tokio::test]
async fn test_config_loaded_from_json() {
    let (a, b) = pair();
    let config: CompareConfig =
        serde_json::from_str(r#"{"read_policy": "flowing", "events": ["end", "end"]}"#).unwrap();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).config(config),
    );

    // Duplicate names collapse: one event listener, one end listener, one
    // error end listener, one data listener.
    assert_eq!(a.listener_count(), 4);
    assert!(a.is_flowing());

    a.end();
    b.end();
    assert_eq!(handle.await.unwrap(), None);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_resolution_removes_every_listener() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));
    assert!(a.listener_count() > 0);

    a.write("abc");
    a.end();
    b.write("abc");
    b.end();
    handle.await.unwrap();

    assert_eq!(a.listener_count(), 0);
    assert_eq!(b.listener_count(), 0);
}

#[tokio::test]
async fn test_dropping_handle_cancels() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));
    let control = handle.control();
    a.write("pending");

    drop(handle);

    assert_eq!(a.listener_count(), 0);
    assert_eq!(b.listener_count(), 0);
    assert!(control.is_settled());
    control.checkpoint();
}

#[tokio::test]
async fn test_resolves_exactly_once() {
    let (a, b) = pair();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::default()
            .incremental(move |_: &mut StreamState, _: &mut StreamState| {
                counter.set(counter.get() + 1);
                Ok::<_, String>(Some(counter.get()))
            })
            .read_policy(ReadPolicy::Flowing),
    );
    let control = handle.control();

    a.write("first");
    b.write("second");
    a.emit("end", vec![]);
    b.fail(json!("late"));
    control.checkpoint();
    control.end();

    assert_eq!(handle.await.unwrap(), Some(1));
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_repeated_end_counts_once() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(when_ended).events(Vec::<String>::new()),
    );

    a.end();
    a.emit("end", vec![]);
    a.emit("end", vec![]);
    assert!(!handle.is_settled());

    b.end();
    assert_eq!(handle.await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_self_comparison() {
    let (a, _) = pair();
    let handle = stream_compare(a.clone(), a.clone(), CompareOptions::new(deep_equal));

    a.write("one");
    a.write("two");
    a.end();

    assert_eq!(handle.await.unwrap(), None);
}

#[tokio::test]
async fn test_flowing_self_comparison_sees_buffered_data() {
    let (a, _) = pair();
    a.write("one");
    a.write("two");

    let handle = stream_compare(
        a.clone(),
        a.clone(),
        CompareOptions::new(deep_equal).read_policy(ReadPolicy::Flowing),
    );
    assert_eq!(a.buffered_len(), 0);
    a.write("three");
    a.end();

    assert_eq!(handle.await.unwrap(), None);
    assert_eq!(a.listener_count(), 0);
}

#[tokio::test]
async fn test_none_policy_reads_nothing() {
    init_tracing();
    let a = MemorySource::push_only();
    let b = MemorySource::push_only();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).read_policy(ReadPolicy::None),
    );
    assert!(!a.is_flowing());

    a.emit("custom", vec![]);
    a.end();
    b.end();

    assert_eq!(handle.await.unwrap(), None);
}

// =============================================================================
// INCREMENTAL ONLY
// =============================================================================

fn prefix_equal() -> CompareOptions<(), Mismatch> {
    CompareOptions::default().incremental(IncrementalBuilder::new().data(data_equal).build())
}

#[tokio::test]
async fn test_incremental_only_rejects_ended_short_source() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), prefix_equal());

    a.write("hello");
    a.end();
    b.write("he");
    b.end();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Data { .. })), "{err}");
}

#[tokio::test]
async fn test_incremental_only_rejects_empty_vs_data() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), prefix_equal());

    a.end();
    b.write("hello");
    b.end();

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Data { .. })), "{err}");
}

#[tokio::test]
async fn test_incremental_only_accepts_rechunked_equal_sources() {
    let (a, b) = pair();
    let handle = stream_compare(a.clone(), b.clone(), prefix_equal());

    a.write("hello");
    a.end();
    b.write("he");
    b.write("llo");
    b.end();

    assert_eq!(handle.await.unwrap(), None);
}

// =============================================================================
// SCHEDULING
// =============================================================================

#[tokio::test]
async fn test_least_policy_drains_the_lagging_source_first() {
    let (a, b) = pair();
    a.write("aaaaaaaaaa");
    a.write("a");
    a.end();
    for _ in 0..5 {
        b.write("bb");
    }
    b.end();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(when_ended).incremental(move |a: &mut StreamState, b: &mut StreamState| {
            log.borrow_mut().push((a.total_data_len(), b.total_data_len()));
            Ok(None)
        }),
    );

    assert_eq!(handle.await.unwrap(), Some(false));

    let seen = seen.borrow();
    let past_parity = seen.iter().position(|&(a, _)| a == 11).unwrap();
    assert_eq!(seen[past_parity], (11, 10));
    assert!(seen[..past_parity].iter().all(|&(a, b)| a <= 10 && b <= 10));
}

#[tokio::test]
async fn test_end_while_waiting_resumes_other_source() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(|a: &mut StreamState, b: &mut StreamState| {
            Ok::<_, String>(Some((a.total_data_len(), b.total_data_len())))
        }),
    );

    // The first source is behind and empty, so the engine waits on it while
    // the second source buffers.
    b.write("x");
    b.write("y");
    b.end();
    assert_eq!(b.buffered_len(), 2);

    a.end();

    assert_eq!(handle.await.unwrap(), Some((0, 2)));
    assert_eq!(b.buffered_len(), 0);
}

#[tokio::test]
async fn test_truncation_leaves_no_data_for_final_compare() {
    let (a, b) = pair();
    a.write("hello world");
    a.end();
    b.write("hello");
    b.write(" world");
    b.end();

    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(|a: &mut StreamState, b: &mut StreamState| {
            Ok(Some((a.data_len(), b.data_len(), a.total_data_len())))
        })
        .incremental(
            IncrementalBuilder::new()
                .data(|l: DataSlice<'_>, r: DataSlice<'_>| data_equal(l, r).map(|_| None))
                .build(),
        ),
    );

    assert_eq!(handle.await.unwrap(), Some((0, 0, 11)));
}

// =============================================================================
// SETTLE PAUSE
// =============================================================================

#[tokio::test]
async fn test_zero_delay_still_waits_a_turn() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal).events(["end", "late"]),
    );

    a.end();
    b.end();
    assert!(!handle.is_settled());

    a.emit("late", vec![json!(1)]);

    let err = handle.await.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Events { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_delay_catches_stragglers() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal)
            .events(["end", "late"])
            .delay(Duration::from_millis(50)),
    );

    a.end();
    b.end();

    let straggler = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        b.emit("late", vec![]);
    };
    let (result, ()) = tokio::join!(handle, straggler);

    let err = result.unwrap_err();
    assert!(matches!(err, CompareError::Comparator(Mismatch::Events { index: 1, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_straggler_after_delay_is_ignored() {
    let (a, b) = pair();
    let handle = stream_compare(
        a.clone(),
        b.clone(),
        CompareOptions::new(deep_equal)
            .events(["end", "late"])
            .delay(Duration::from_millis(5)),
    );

    a.end();
    b.end();

    let straggler = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        b.emit("late", vec![]);
    };
    let (result, ()) = tokio::join!(handle, straggler);

    assert_eq!(result.unwrap(), None);
}
