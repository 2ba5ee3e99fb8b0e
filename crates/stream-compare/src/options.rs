//! Comparison options.
//!
//! [`CompareConfig`] carries the plain-data settings and can be loaded with
//! serde; [`CompareOptions`] adds the caller's comparator functions.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stream_compare_core::names;

use crate::error::ConfigError;
use crate::state::StreamState;

/// A comparator over the two stream states.
///
/// `Ok(None)` means no conclusion, `Ok(Some(_))` is a result and `Err(_)`
/// fails the comparison.
pub type CompareFn<T, E> = Box<dyn FnMut(&mut StreamState, &mut StreamState) -> Result<Option<T>, E>>;

/// How the engine obtains data from the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Sources push data at their own pace.
    Flowing,
    /// Pull from whichever live source has produced less data.
    #[default]
    Least,
    /// Read nothing; the caller makes data flow.
    None,
}

impl FromStr for ReadPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flowing" => Ok(ReadPolicy::Flowing),
            "least" => Ok(ReadPolicy::Least),
            "none" => Ok(ReadPolicy::None),
            other => Err(ConfigError::UnknownReadPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ReadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPolicy::Flowing => f.write_str("flowing"),
            ReadPolicy::Least => f.write_str("least"),
            ReadPolicy::None => f.write_str("none"),
        }
    }
}

/// Plain-data comparison settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    /// Notifications to log into [`StreamState::events`].
    pub events: Vec<String>,
    /// Notifications that mark a source as terminated.
    pub end_events: Vec<String>,
    /// Fail immediately when either source emits `error`.
    pub abort_on_error: bool,
    /// Keep each chunk as a separate element instead of concatenating.
    pub object_mode: bool,
    /// How data is read from the sources.
    pub read_policy: ReadPolicy,
    /// Pause between both sources terminating and the final comparison.
    pub delay_ms: u64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            events: vec![
                names::CLOSE.to_string(),
                names::END.to_string(),
                names::ERROR.to_string(),
            ],
            end_events: vec![names::END.to_string(), names::ERROR.to_string()],
            abort_on_error: false,
            object_mode: false,
            read_policy: ReadPolicy::Least,
            delay_ms: 0,
        }
    }
}

impl CompareConfig {
    /// The post-termination delay.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Check values and collapse duplicate event names.
    pub(crate) fn normalize(&mut self) -> Result<(), ConfigError> {
        for (option, list) in [("events", &mut self.events), ("end_events", &mut self.end_events)] {
            if list.iter().any(String::is_empty) {
                return Err(ConfigError::EmptyEventName { option });
            }
            let mut seen = HashSet::new();
            list.retain(|name| seen.insert(name.clone()));
        }
        Ok(())
    }
}

/// Comparators plus settings for one comparison.
pub struct CompareOptions<T, E> {
    /// Final (and checkpoint) comparator.
    pub compare: Option<CompareFn<T, E>>,
    /// Comparator run after every state change.
    pub incremental: Option<CompareFn<T, E>>,
    /// Plain-data settings.
    pub config: CompareConfig,
}

impl<T, E> Default for CompareOptions<T, E> {
    fn default() -> Self {
        Self {
            compare: None,
            incremental: None,
            config: CompareConfig::default(),
        }
    }
}

impl<T, E> fmt::Debug for CompareOptions<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareOptions")
            .field("compare", &self.compare.is_some())
            .field("incremental", &self.incremental.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl<T, E> CompareOptions<T, E> {
    /// Options with a final comparator and default settings.
    pub fn new<F>(compare: F) -> Self
    where
        F: FnMut(&mut StreamState, &mut StreamState) -> Result<Option<T>, E> + 'static,
    {
        Self::default().compare(compare)
    }

    /// Set the final comparator.
    pub fn compare<F>(mut self, compare: F) -> Self
    where
        F: FnMut(&mut StreamState, &mut StreamState) -> Result<Option<T>, E> + 'static,
    {
        self.compare = Some(Box::new(compare));
        self
    }

    /// Set the incremental comparator.
    ///
    /// Without a final comparator it is also used for the final comparison.
    pub fn incremental<F>(mut self, incremental: F) -> Self
    where
        F: FnMut(&mut StreamState, &mut StreamState) -> Result<Option<T>, E> + 'static,
    {
        self.incremental = Some(Box::new(incremental));
        self
    }

    /// Replace all plain-data settings.
    pub fn config(mut self, config: CompareConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the notifications to log.
    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Set the notifications that terminate a source.
    pub fn end_events<I, S>(mut self, end_events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.end_events = end_events.into_iter().map(Into::into).collect();
        self
    }

    /// Fail as soon as either source emits `error`.
    pub fn abort_on_error(mut self, abort_on_error: bool) -> Self {
        self.config.abort_on_error = abort_on_error;
        self
    }

    /// Keep chunks as separate elements.
    pub fn object_mode(mut self, object_mode: bool) -> Self {
        self.config.object_mode = object_mode;
        self
    }

    /// Set how data is read from the sources.
    pub fn read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.config.read_policy = read_policy;
        self
    }

    /// Set the post-termination delay (millisecond resolution).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// The comparator set after validation.
pub(crate) enum Comparators<T, E> {
    Final(CompareFn<T, E>),
    Incremental(CompareFn<T, E>),
    Both {
        compare: CompareFn<T, E>,
        incremental: CompareFn<T, E>,
    },
}

impl<T, E> Comparators<T, E> {
    pub(crate) fn new(compare: Option<CompareFn<T, E>>, incremental: Option<CompareFn<T, E>>) -> Option<Self> {
        match (compare, incremental) {
            (Some(compare), Some(incremental)) => Some(Comparators::Both {
                compare,
                incremental,
            }),
            (Some(compare), None) => Some(Comparators::Final(compare)),
            (None, Some(incremental)) => Some(Comparators::Incremental(incremental)),
            (None, None) => None,
        }
    }

    pub(crate) fn incremental(&mut self) -> Option<&mut CompareFn<T, E>> {
        match self {
            Comparators::Final(_) => None,
            Comparators::Incremental(incremental) | Comparators::Both { incremental, .. } => {
                Some(incremental)
            }
        }
    }

    /// The comparator used for checkpoints and the final comparison.
    pub(crate) fn finalizer(&mut self) -> &mut CompareFn<T, E> {
        match self {
            Comparators::Final(compare) | Comparators::Both { compare, .. } => compare,
            Comparators::Incremental(incremental) => incremental,
        }
    }
}
