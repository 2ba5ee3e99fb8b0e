//! Error types for the comparison core.

use thiserror::Error;

use crate::types::ChunkKind;

/// A chunk could not be accumulated into a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataShapeError {
    #[error("expected text or bytes chunk, got {found} (is object mode needed?)")]
    NotPlain { found: ChunkKind },

    #[error("type mismatch: got {chunk} chunk after {accumulated} data (is object mode needed?)")]
    TypeMismatch {
        accumulated: ChunkKind,
        chunk: ChunkKind,
    },
}

/// Two stream states (or parts of them) are not equal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("ended state differs: {left} != {right}")]
    Ended { left: bool, right: bool },

    #[error("data type mismatch: {left} != {right}")]
    DataKind { left: ChunkKind, right: ChunkKind },

    #[error("data differs: {left} != {right}")]
    Data { left: String, right: String },

    #[error("events differ at index {index}: {left} != {right}")]
    Events {
        index: usize,
        left: String,
        right: String,
    },

    #[error("total data length differs: {left} != {right}")]
    TotalLength { left: usize, right: usize },
}
