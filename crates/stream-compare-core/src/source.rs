//! The capability set a comparison needs from each input.
//!
//! A source is anything that can deliver named notifications to listeners
//! and, optionally, hand out buffered chunks on demand. Delivery is
//! synchronous and single-threaded: a listener runs on the thread that
//! emitted, before `emit` returns.

use std::rc::Rc;

use serde_json::Value;

use crate::types::Chunk;

/// Callback for a named notification. Receives the positional arguments.
pub type Listener = Rc<dyn Fn(&[Value])>;

/// Callback for pushed data chunks.
pub type DataListener = Rc<dyn Fn(&Chunk)>;

/// Handle returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A source of chunks and notifications.
pub trait Source {
    /// Register a listener for notifications named `event`.
    fn subscribe(&self, event: &str, listener: Listener) -> SubscriptionId;

    /// Register a listener for pushed data.
    ///
    /// Sources that distinguish paused and flowing operation start pushing
    /// once a data listener exists.
    fn subscribe_data(&self, listener: DataListener) -> SubscriptionId;

    /// Remove a subscription. Unknown ids are ignored.
    ///
    /// A notification already being delivered when this is called may
    /// still reach the removed listener.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Whether this source supports [`Source::read`].
    fn can_read(&self) -> bool {
        false
    }

    /// Pull the next buffered chunk.
    ///
    /// `None` means nothing is available right now; the source emits
    /// [`names::READABLE`](crate::event::names::READABLE) when that changes.
    fn read(&self) -> Option<Chunk> {
        None
    }
}
