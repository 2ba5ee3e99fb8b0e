//! Sources: the capability trait and an in-memory implementation.

pub use stream_compare_core::source::{DataListener, Listener, Source, SubscriptionId};

/// A simple in-memory source.
///
/// Chunks written while nobody listens for data are buffered and handed out
/// by `read()`; once a data listener subscribes the buffer is flushed to it
/// and later writes are pushed straight through.
pub mod memory {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use serde_json::Value;
    use stream_compare_core::{names, Chunk};
    use tracing::{trace, warn};

    enum Slot {
        Event(String, Listener),
        Data(DataListener),
    }

    struct MemorySourceInner {
        next_id: u64,
        listeners: Vec<(SubscriptionId, Slot)>,
        /// Chunks written while paused.
        buffer: VecDeque<Chunk>,
        /// `end()` or `fail()` was called.
        ending: bool,
        /// The terminal notification was emitted.
        finished: bool,
    }

    impl MemorySourceInner {
        fn add(&mut self, slot: Slot) -> SubscriptionId {
            self.next_id += 1;
            let id = SubscriptionId(self.next_id);
            self.listeners.push((id, slot));
            id
        }

        fn data_listeners(&self) -> Vec<DataListener> {
            self.listeners
                .iter()
                .filter_map(|(_, slot)| match slot {
                    Slot::Data(listener) => Some(Rc::clone(listener)),
                    Slot::Event(..) => None,
                })
                .collect()
        }
    }

    /// In-memory [`Source`] driven by explicit calls.
    pub struct MemorySource {
        inner: RefCell<MemorySourceInner>,
        pullable: bool,
        emit_close: bool,
    }

    impl MemorySource {
        fn build(pullable: bool, emit_close: bool) -> Rc<Self> {
            Rc::new(Self {
                inner: RefCell::new(MemorySourceInner {
                    next_id: 0,
                    listeners: Vec::new(),
                    buffer: VecDeque::new(),
                    ending: false,
                    finished: false,
                }),
                pullable,
                emit_close,
            })
        }

        /// A pullable source that emits `close` after `end` and `error`.
        pub fn new() -> Rc<Self> {
            Self::build(true, true)
        }

        /// A source without `read()` support.
        pub fn push_only() -> Rc<Self> {
            Self::build(false, true)
        }

        /// A pullable source that never emits `close`.
        pub fn without_close() -> Rc<Self> {
            Self::build(true, false)
        }

        /// Produce a chunk.
        ///
        /// Pushed to data listeners if there are any, otherwise buffered and
        /// announced with `readable`. Ignored after `end()` or `fail()`.
        pub fn write(&self, chunk: impl Into<Chunk>) {
            let chunk = chunk.into();
            let listeners = {
                let mut inner = self.inner.borrow_mut();
                if inner.ending {
                    warn!("write after end ignored");
                    return;
                }
                let listeners = inner.data_listeners();
                if listeners.is_empty() {
                    inner.buffer.push_back(chunk);
                    None
                } else {
                    Some((listeners, chunk))
                }
            };

            match listeners {
                Some((listeners, chunk)) => {
                    for listener in listeners {
                        listener(&chunk);
                    }
                }
                None => self.fire(names::READABLE, &[]),
            }
        }

        /// Finish the source.
        ///
        /// `end` (then `close`) is emitted once the buffer has been drained,
        /// right away if it is empty. Repeated calls are ignored.
        pub fn end(&self) {
            let drained = {
                let mut inner = self.inner.borrow_mut();
                if inner.ending {
                    return;
                }
                inner.ending = true;
                inner.buffer.is_empty()
            };
            if drained {
                self.finish();
            }
        }

        /// Fail the source: emit `error` with `error` as its argument, then
        /// `close`. Buffered chunks are discarded.
        pub fn fail(&self, error: impl Into<Value>) {
            {
                let mut inner = self.inner.borrow_mut();
                if inner.finished {
                    warn!("fail after end ignored");
                    return;
                }
                inner.ending = true;
                inner.finished = true;
                inner.buffer.clear();
            }
            self.fire(names::ERROR, &[error.into()]);
            if self.emit_close {
                self.fire(names::CLOSE, &[]);
            }
        }

        /// Emit an arbitrary notification.
        ///
        /// Bypasses all bookkeeping, so it can emit `end` twice or after
        /// `fail()`.
        pub fn emit(&self, event: &str, args: Vec<Value>) {
            self.fire(event, &args);
        }

        /// Number of live subscriptions of any kind.
        pub fn listener_count(&self) -> usize {
            self.inner.borrow().listeners.len()
        }

        /// Number of chunks waiting to be read.
        pub fn buffered_len(&self) -> usize {
            self.inner.borrow().buffer.len()
        }

        /// Whether a data listener is installed.
        pub fn is_flowing(&self) -> bool {
            self.inner
                .borrow()
                .listeners
                .iter()
                .any(|(_, slot)| matches!(slot, Slot::Data(_)))
        }

        /// Whether `end` or `error` has been emitted.
        pub fn is_finished(&self) -> bool {
            self.inner.borrow().finished
        }

        fn finish(&self) {
            {
                let mut inner = self.inner.borrow_mut();
                if inner.finished {
                    return;
                }
                inner.finished = true;
            }
            self.fire(names::END, &[]);
            if self.emit_close {
                self.fire(names::CLOSE, &[]);
            }
        }

        /// Call every listener for `event`.
        ///
        /// Listeners are collected first, so they may subscribe, unsubscribe
        /// or write while being called.
        fn fire(&self, event: &str, args: &[Value]) {
            let listeners: Vec<Listener> = self
                .inner
                .borrow()
                .listeners
                .iter()
                .filter_map(|(_, slot)| match slot {
                    Slot::Event(name, listener) if name == event => Some(Rc::clone(listener)),
                    _ => None,
                })
                .collect();
            trace!(event, listeners = listeners.len(), "emit");
            for listener in listeners {
                listener(args);
            }
        }
    }

    impl Source for MemorySource {
        fn subscribe(&self, event: &str, listener: Listener) -> SubscriptionId {
            self.inner
                .borrow_mut()
                .add(Slot::Event(event.to_string(), listener))
        }

        fn subscribe_data(&self, listener: DataListener) -> SubscriptionId {
            let (id, pending, finish) = {
                let mut inner = self.inner.borrow_mut();
                let id = inner.add(Slot::Data(Rc::clone(&listener)));
                let pending: Vec<Chunk> = inner.buffer.drain(..).collect();
                (id, pending, inner.ending && !inner.finished)
            };
            for chunk in &pending {
                listener(chunk);
            }
            if finish {
                self.finish();
            }
            id
        }

        fn unsubscribe(&self, id: SubscriptionId) {
            self.inner
                .borrow_mut()
                .listeners
                .retain(|(existing, _)| *existing != id);
        }

        fn can_read(&self) -> bool {
            self.pullable
        }

        fn read(&self) -> Option<Chunk> {
            if !self.pullable {
                return None;
            }
            let (chunk, finish) = {
                let mut inner = self.inner.borrow_mut();
                let chunk = inner.buffer.pop_front();
                let finish = chunk.is_none() && inner.ending && !inner.finished;
                (chunk, finish)
            };
            if finish {
                self.finish();
            }
            chunk
        }
    }

}
