//! Test fixtures and helpers.
//!
//! Scripted source feeds, paired sources, and runtime/tracing setup.

use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use stream_compare::{stream_compare, Chunk, CompareHandle, CompareOptions, MemorySource};
use tracing_subscriber::filter::LevelFilter;

/// One scripted action on a [`MemorySource`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Write(Chunk),
    Emit(String, Vec<Value>),
    End,
    Fail(Value),
}

impl Step {
    /// A text write.
    pub fn text(s: &str) -> Self {
        Step::Write(Chunk::from(s))
    }

    /// A byte write.
    pub fn bytes(b: &[u8]) -> Self {
        Step::Write(Chunk::from(b.to_vec()))
    }

    /// An argument-less notification.
    pub fn emit(name: &str) -> Self {
        Step::Emit(name.to_string(), Vec::new())
    }
}

/// Apply `steps` to `source` in order.
pub fn play(source: &MemorySource, steps: &[Step]) {
    for step in steps {
        match step {
            Step::Write(chunk) => source.write(chunk.clone()),
            Step::Emit(name, args) => source.emit(name, args.clone()),
            Step::End => source.end(),
            Step::Fail(error) => source.fail(error.clone()),
        }
    }
}

/// Two sources to compare.
pub struct SourcePair {
    pub first: Rc<MemorySource>,
    pub second: Rc<MemorySource>,
}

impl SourcePair {
    /// Two pullable sources.
    pub fn new() -> Self {
        Self {
            first: MemorySource::new(),
            second: MemorySource::new(),
        }
    }

    /// Two sources without `read()` support.
    pub fn push_only() -> Self {
        Self {
            first: MemorySource::push_only(),
            second: MemorySource::push_only(),
        }
    }

    /// Start comparing the pair.
    pub fn compare<T: 'static, E: 'static>(&self, options: CompareOptions<T, E>) -> CompareHandle<T, E> {
        stream_compare(self.first.clone(), self.second.clone(), options)
    }

    /// Play both scripts, first source first.
    pub fn play(&self, first: &[Step], second: &[Step]) {
        play(&self.first, first);
        play(&self.second, second);
    }

    /// Whether neither source has any listener left.
    pub fn is_detached(&self) -> bool {
        self.first.listener_count() == 0 && self.second.listener_count() == 0
    }
}

impl Default for SourcePair {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a fmt subscriber writing through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Drive a future to completion on a fresh current-thread runtime.
///
/// For synchronous tests (such as proptest bodies) that need to await a
/// comparison.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime")
        .block_on(future)
}
