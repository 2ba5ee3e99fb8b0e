//! Error types for stream comparison.

use serde_json::Value;
use stream_compare_core::DataShapeError;
use thiserror::Error;

use crate::state::Side;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Read policy name is not one of `flowing`, `least`, `none`.
    #[error("unknown read policy `{0}` (expected flowing, least, or none)")]
    UnknownReadPolicy(String),

    /// An event list contains an empty name.
    #[error("option `{option}` contains an empty event name")]
    EmptyEventName { option: &'static str },
}

/// Why a comparison did not resolve with a value.
///
/// `E` is the error type of the caller's comparators; comparator errors
/// are carried through unchanged in [`CompareError::Comparator`].
#[derive(Debug, Error)]
pub enum CompareError<E> {
    /// A source lacks a capability the configuration needs.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidSource {
        argument: &'static str,
        reason: String,
    },

    /// Neither `compare` nor `incremental` was supplied.
    #[error("invalid option `compare`: no comparator supplied")]
    MissingComparator,

    /// Configuration error.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A chunk could not be accumulated.
    #[error("bad data from {side} source: {source}")]
    DataShape {
        side: Side,
        #[source]
        source: DataShapeError,
    },

    /// A source reported failure while `abort_on_error` was set.
    #[error("{side} source failed: {}", render_args(.args))]
    SourceFailed { side: Side, args: Vec<Value> },

    /// A comparator returned an error.
    #[error("comparator failed: {0}")]
    Comparator(E),
}

impl<E> CompareError<E> {
    /// The comparator's error, if that is what ended the comparison.
    pub fn comparator_error(&self) -> Option<&E> {
        match self {
            CompareError::Comparator(err) => Some(err),
            _ => None,
        }
    }

    /// Take the comparator's error, if that is what ended the comparison.
    pub fn into_comparator_error(self) -> Option<E> {
        match self {
            CompareError::Comparator(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the comparison was rejected before it started.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CompareError::InvalidSource { .. }
                | CompareError::MissingComparator
                | CompareError::Config(_)
        )
    }
}

fn render_args(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    rendered.join(", ")
}
