//! # Stream Compare
//!
//! Compare the output of two asynchronously produced sources with a
//! caller-supplied comparator.
//!
//! ## Overview
//!
//! A comparison subscribes to both sources, accumulates what each one
//! produces into a [`StreamState`] (data, watched notifications, whether it
//! has ended) and asks the caller's comparators for a verdict:
//!
//! - **Incremental**: called after every change. Returning a value or an
//!   error decides the comparison early.
//! - **Final**: called once both sources have ended (after a short settle
//!   pause), or on demand through [`CompareHandle::checkpoint`] and
//!   [`CompareHandle::end`].
//!
//! Every comparison resolves exactly once, after which all listeners are
//! removed from both sources.
//!
//! ## Key Concepts
//!
//! - **Read policy**: `least` pulls from whichever live source has produced
//!   less, `flowing` lets both push, `none` leaves reading to the caller.
//! - **Plain vs. object mode**: chunks are concatenated into one text or
//!   byte payload, or kept as separate elements.
//! - **Truncation**: comparators may drop already-compared data from the
//!   states; [`make_incremental`] does this for equal prefixes.
//!
//! The engine is single-threaded. Sources, handles and comparators are not
//! `Send`; run comparisons on a current-thread runtime or a `LocalSet`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stream_compare::{deep_equal, stream_compare, CompareOptions, MemorySource, ReadPolicy};
//!
//! async fn example() {
//!     let expected = MemorySource::new();
//!     let actual = MemorySource::new();
//!
//!     let handle = stream_compare(
//!         expected.clone(),
//!         actual.clone(),
//!         CompareOptions::new(deep_equal).read_policy(ReadPolicy::Least),
//!     );
//!
//!     expected.write("hello world");
//!     expected.end();
//!     actual.write("hello ");
//!     actual.write("world");
//!     actual.end();
//!
//!     match handle.await {
//!         Ok(_) => println!("streams match"),
//!         Err(err) => println!("streams differ: {err}"),
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `stream_compare::core` - Chunks, payloads, events and the `Source` trait

pub mod compare;
mod engine;
pub mod equality;
pub mod error;
pub mod handle;
pub mod incremental;
pub mod options;
pub mod source;
pub mod state;

pub use stream_compare_core as core;

pub use compare::stream_compare;
pub use equality::{data_equal, deep_equal, events_equal};
pub use error::{CompareError, ConfigError};
pub use handle::{CompareControl, CompareHandle};
pub use incremental::{make_incremental, DataEqFn, EventsEqFn, IncrementalBuilder};
pub use options::{CompareConfig, CompareFn, CompareOptions, ReadPolicy};
pub use source::memory::MemorySource;
pub use source::Source;
pub use state::{Side, StreamState};

// Re-export commonly used core types
pub use stream_compare_core::{Chunk, ChunkKind, DataSlice, Mismatch, StreamData, StreamEvent};
