//! Notifications observed on a source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known notification names.
pub mod names {
    /// Normal completion.
    pub const END: &str = "end";
    /// Resources released; usually follows `end` or `error`.
    pub const CLOSE: &str = "close";
    /// Failure.
    pub const ERROR: &str = "error";
    /// Data can be pulled with `Source::read`.
    pub const READABLE: &str = "readable";
}

/// A logged notification: its name and positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl StreamEvent {
    /// Create an event record.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// An event without arguments.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}
