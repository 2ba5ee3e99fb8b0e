//! Payload types: what a source produces and what a comparison accumulates.
//!
//! Lengths are measured in characters for text, bytes for byte payloads and
//! elements for itemized payloads.

use bytes::{Buf, Bytes, BytesMut};
use serde_json::Value;
use std::fmt;

use crate::error::DataShapeError;

/// A single chunk produced by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// A piece of text.
    Text(String),
    /// A piece of binary data.
    Bytes(Bytes),
    /// An arbitrary value. Only accepted when chunks are itemized.
    Value(Value),
}

impl Chunk {
    /// The family this chunk belongs to.
    pub fn kind(&self) -> ChunkKind {
        match self {
            Chunk::Text(_) => ChunkKind::Text,
            Chunk::Bytes(_) => ChunkKind::Bytes,
            Chunk::Value(_) => ChunkKind::Value,
        }
    }

    /// Length of the chunk in its own unit.
    ///
    /// Values have no intrinsic length and count as one.
    pub fn len(&self) -> usize {
        match self {
            Chunk::Text(s) => s.chars().count(),
            Chunk::Bytes(b) => b.len(),
            Chunk::Value(_) => 1,
        }
    }

    /// Check if the chunk carries no data.
    pub fn is_empty(&self) -> bool {
        match self {
            Chunk::Text(s) => s.is_empty(),
            Chunk::Bytes(b) => b.is_empty(),
            Chunk::Value(_) => false,
        }
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Text(s.to_owned())
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk::Bytes(b)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(b: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(b))
    }
}

impl From<&'static [u8]> for Chunk {
    fn from(b: &'static [u8]) -> Self {
        Chunk::Bytes(Bytes::from_static(b))
    }
}

impl From<Value> for Chunk {
    fn from(v: Value) -> Self {
        Chunk::Value(v)
    }
}

/// Discriminator for chunk and payload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Text,
    Bytes,
    Value,
    Items,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChunkKind::Text => "text",
            ChunkKind::Bytes => "bytes",
            ChunkKind::Value => "value",
            ChunkKind::Items => "items",
        };
        f.write_str(name)
    }
}

/// Payload accumulated from one source.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    /// Concatenated text chunks.
    Text(String),
    /// Concatenated byte chunks.
    Bytes(BytesMut),
    /// One element per chunk, in arrival order.
    Items(Vec<Chunk>),
}

impl StreamData {
    /// Start a plain payload from its first chunk.
    ///
    /// Fails for chunks that cannot be concatenated.
    pub fn plain(chunk: Chunk) -> Result<Self, DataShapeError> {
        match chunk {
            Chunk::Text(s) => Ok(StreamData::Text(s)),
            Chunk::Bytes(b) => Ok(StreamData::Bytes(BytesMut::from(&b[..]))),
            Chunk::Value(_) => Err(DataShapeError::NotPlain {
                found: ChunkKind::Value,
            }),
        }
    }

    /// Concatenate a chunk onto a plain payload.
    ///
    /// Text only extends text and bytes only extend bytes.
    pub fn concat(&mut self, chunk: Chunk) -> Result<(), DataShapeError> {
        match (self, chunk) {
            (_, Chunk::Value(_)) => Err(DataShapeError::NotPlain {
                found: ChunkKind::Value,
            }),
            (StreamData::Text(acc), Chunk::Text(s)) => {
                acc.push_str(&s);
                Ok(())
            }
            (StreamData::Bytes(acc), Chunk::Bytes(b)) => {
                acc.extend_from_slice(&b);
                Ok(())
            }
            (acc, chunk) => Err(DataShapeError::TypeMismatch {
                accumulated: acc.kind(),
                chunk: chunk.kind(),
            }),
        }
    }

    /// The payload family.
    pub fn kind(&self) -> ChunkKind {
        match self {
            StreamData::Text(_) => ChunkKind::Text,
            StreamData::Bytes(_) => ChunkKind::Bytes,
            StreamData::Items(_) => ChunkKind::Items,
        }
    }

    /// Length in the payload's own unit.
    pub fn len(&self) -> usize {
        match self {
            StreamData::Text(s) => s.chars().count(),
            StreamData::Bytes(b) => b.len(),
            StreamData::Items(items) => items.len(),
        }
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            StreamData::Text(s) => s.is_empty(),
            StreamData::Bytes(b) => b.is_empty(),
            StreamData::Items(items) => items.is_empty(),
        }
    }

    /// Borrow the whole payload.
    pub fn as_slice(&self) -> DataSlice<'_> {
        match self {
            StreamData::Text(s) => DataSlice::Text(s),
            StreamData::Bytes(b) => DataSlice::Bytes(b),
            StreamData::Items(items) => DataSlice::Items(items),
        }
    }

    /// Borrow the first `len` units of the payload (clamped to its length).
    pub fn prefix(&self, len: usize) -> DataSlice<'_> {
        match self {
            StreamData::Text(s) => DataSlice::Text(&s[..char_offset(s, len)]),
            StreamData::Bytes(b) => DataSlice::Bytes(&b[..len.min(b.len())]),
            StreamData::Items(items) => DataSlice::Items(&items[..len.min(items.len())]),
        }
    }

    /// Drop the first `len` units, keeping the remainder.
    pub fn advance(&mut self, len: usize) {
        match self {
            StreamData::Text(s) => {
                let offset = char_offset(s, len);
                s.drain(..offset);
            }
            StreamData::Bytes(b) => b.advance(len.min(b.len())),
            StreamData::Items(items) => {
                items.drain(..len.min(items.len()));
            }
        }
    }
}

/// Byte offset of the `chars`-th character, or the string length.
fn char_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(offset, _)| offset)
}

/// A borrowed view of (part of) a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataSlice<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    Items(&'a [Chunk]),
}

impl DataSlice<'_> {
    /// The payload family of the slice.
    pub fn kind(&self) -> ChunkKind {
        match self {
            DataSlice::Text(_) => ChunkKind::Text,
            DataSlice::Bytes(_) => ChunkKind::Bytes,
            DataSlice::Items(_) => ChunkKind::Items,
        }
    }

    /// Length in the slice's own unit.
    pub fn len(&self) -> usize {
        match self {
            DataSlice::Text(s) => s.chars().count(),
            DataSlice::Bytes(b) => b.len(),
            DataSlice::Items(items) => items.len(),
        }
    }

    /// Check if the slice is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty slice of the same family.
    pub fn empty_like(&self) -> DataSlice<'static> {
        match self {
            DataSlice::Text(_) => DataSlice::Text(""),
            DataSlice::Bytes(_) => DataSlice::Bytes(&[]),
            DataSlice::Items(_) => DataSlice::Items(&[]),
        }
    }
}

impl fmt::Display for DataSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSlice::Text(s) => write!(f, "{s:?}"),
            DataSlice::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            DataSlice::Items(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Chunk::Text(s) => write!(f, "{s:?}")?,
                        Chunk::Bytes(b) => write!(f, "0x{}", hex::encode(b))?,
                        Chunk::Value(v) => write!(f, "{v}")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}
