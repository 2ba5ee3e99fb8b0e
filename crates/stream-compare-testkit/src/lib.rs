//! # Stream Compare Testkit
//!
//! Testing utilities for Stream Compare.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenario vectors**: Scripted source pairs with known verdicts, shared as JSON
//! - **Generators**: Proptest strategies for chunkings and source scripts
//! - **Fixtures**: Paired in-memory sources and runtime/tracing setup
//!
//! ## Scenario Vectors
//!
//! ```rust
//! use stream_compare_testkit::vectors::verify_all_scenarios;
//!
//! for (name, passed, actual) in verify_all_scenarios() {
//!     println!("{name}: {actual:?} ({})", if passed { "ok" } else { "FAILED" });
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use stream_compare::{deep_equal, CompareOptions};
//! use stream_compare_testkit::{block_on, text_chunkings, text_script, SourcePair};
//!
//! proptest! {
//!     #[test]
//!     fn chunking_does_not_matter((a, b) in text_chunkings()) {
//!         let pair = SourcePair::new();
//!         let handle = pair.compare(CompareOptions::new(deep_equal));
//!         pair.play(&text_script(&a), &text_script(&b));
//!         prop_assert!(block_on(handle).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use stream_compare::{deep_equal, CompareOptions};
//! use stream_compare_testkit::fixtures::{block_on, SourcePair, Step};
//!
//! let pair = SourcePair::new();
//! let handle = pair.compare(CompareOptions::new(deep_equal));
//! pair.play(&[Step::text("hi"), Step::End], &[Step::text("hi"), Step::End]);
//! assert!(block_on(handle).is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{block_on, init_tracing, play, SourcePair, Step};
pub use generators::{split_bytes, split_text, text_chunkings, text_script};
pub use vectors::{all_scenarios, run_scenario, verify_all_scenarios, Expected, Scenario};
