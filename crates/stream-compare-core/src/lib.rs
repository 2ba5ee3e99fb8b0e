//! # Stream Compare Core
//!
//! Plain data types shared by the comparison engine and by source
//! implementations: chunks and accumulated payloads, notification records,
//! the [`Source`] capability trait, and the errors raised while accumulating
//! or comparing payloads.
//!
//! This crate contains no scheduling and no comparison state machine.
//!
//! ## Key Types
//!
//! - [`Chunk`] - One unit of data produced by a source
//! - [`StreamData`] - Data accumulated from one source
//! - [`DataSlice`] - Borrowed view of accumulated data
//! - [`StreamEvent`] - A logged notification
//! - [`Source`] - Subscribe/unsubscribe/read capability set

pub mod diff;
pub mod error;
pub mod event;
pub mod source;
pub mod types;

pub use diff::{data_mismatch, events_mismatch};
pub use error::{DataShapeError, Mismatch};
pub use event::{names, StreamEvent};
pub use source::{DataListener, Listener, Source, SubscriptionId};
pub use types::{Chunk, ChunkKind, DataSlice, StreamData};
