//! Entry point: validate input and start a comparison.

use std::rc::Rc;

use stream_compare_core::Source;
use tracing::debug;

use crate::engine::Shared;
use crate::error::CompareError;
use crate::handle::CompareHandle;
use crate::options::{CompareConfig, CompareOptions, Comparators, ReadPolicy};

/// Compare two sources.
///
/// Returns immediately with a handle that resolves once the comparison is
/// decided. Invalid input never panics or returns early: the handle resolves
/// with the validation error instead, so there is one failure path.
///
/// The same source may be passed twice.
///
/// ```no_run
/// use std::rc::Rc;
/// use stream_compare::{deep_equal, stream_compare, CompareOptions, MemorySource};
///
/// # async fn example() {
/// let a = MemorySource::new();
/// let b = MemorySource::new();
/// let handle = stream_compare(a.clone(), b.clone(), CompareOptions::new(deep_equal));
///
/// a.write("hello");
/// a.end();
/// b.write("he");
/// b.write("llo");
/// b.end();
///
/// assert!(handle.await.is_ok());
/// # }
/// ```
pub fn stream_compare<T: 'static, E: 'static>(
    source1: Rc<dyn Source>,
    source2: Rc<dyn Source>,
    options: CompareOptions<T, E>,
) -> CompareHandle<T, E> {
    match prepare(&*source1, &*source2, options) {
        Ok((comparators, config)) => {
            CompareHandle::running(Shared::start([source1, source2], comparators, config))
        }
        Err(err) => {
            debug!(invalid_input = err.is_invalid_input(), "comparison rejected");
            CompareHandle::rejected(err)
        }
    }
}

fn prepare<T, E>(
    source1: &dyn Source,
    source2: &dyn Source,
    options: CompareOptions<T, E>,
) -> Result<(Comparators<T, E>, CompareConfig), CompareError<E>> {
    let CompareOptions {
        compare,
        incremental,
        mut config,
    } = options;

    let comparators = Comparators::new(compare, incremental).ok_or(CompareError::MissingComparator)?;
    config.normalize()?;

    if config.read_policy == ReadPolicy::Least {
        for (argument, source) in [("source1", source1), ("source2", source2)] {
            if !source.can_read() {
                return Err(CompareError::InvalidSource {
                    argument,
                    reason: "read policy `least` needs a source that supports read()".to_string(),
                });
            }
        }
    }

    Ok((comparators, config))
}
