//! The deferred result of a comparison.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use crate::engine::Shared;
use crate::error::CompareError;

/// A pending comparison.
///
/// Resolves once with the comparator's value (`Ok(Some(_))` or, when the
/// final comparator returned nothing, `Ok(None)`) or with the error that
/// ended the comparison. Input rejected by [`stream_compare`] resolves with
/// that error on the first poll.
///
/// Dropping the handle before it resolves cancels the comparison and removes
/// its listeners from both sources.
///
/// The settle pause after both sources end is driven by polling this handle,
/// so it must be awaited (or polled) for a naturally ending comparison to
/// resolve.
///
/// [`stream_compare`]: crate::stream_compare
#[must_use = "a comparison is cancelled when its handle is dropped"]
pub struct CompareHandle<T, E> {
    inner: Inner<T, E>,
}

enum Inner<T, E> {
    Rejected(Option<CompareError<E>>),
    Running(Rc<Shared<T, E>>),
}

impl<T, E> CompareHandle<T, E> {
    pub(crate) fn rejected(err: CompareError<E>) -> Self {
        Self {
            inner: Inner::Rejected(Some(err)),
        }
    }

    pub(crate) fn running(shared: Rc<Shared<T, E>>) -> Self {
        Self {
            inner: Inner::Running(shared),
        }
    }
}

impl<T: 'static, E: 'static> CompareHandle<T, E> {
    /// Run the final comparator now and resolve if it gives a value.
    ///
    /// An error from the comparator also resolves. No effect once resolved.
    pub fn checkpoint(&self) {
        if let Inner::Running(shared) = &self.inner {
            shared.checkpoint();
        }
    }

    /// Run the final comparator now and resolve with whatever it returns.
    ///
    /// No effect once resolved.
    pub fn end(&self) {
        if let Inner::Running(shared) = &self.inner {
            shared.end();
        }
    }

    /// Whether the outcome has been decided.
    pub fn is_settled(&self) -> bool {
        match &self.inner {
            Inner::Rejected(_) => true,
            Inner::Running(shared) => shared.is_settled(),
        }
    }

    /// A control that can be used while the handle is being awaited.
    pub fn control(&self) -> CompareControl<T, E> {
        let shared = match &self.inner {
            Inner::Rejected(_) => Weak::new(),
            Inner::Running(shared) => Rc::downgrade(shared),
        };
        CompareControl { shared }
    }
}

impl<T, E> Unpin for CompareHandle<T, E> {}

impl<T: 'static, E: 'static> Future for CompareHandle<T, E> {
    type Output = Result<Option<T>, CompareError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Rejected(err) => match err.take() {
                Some(err) => Poll::Ready(Err(err)),
                None => panic!("CompareHandle polled after completion"),
            },
            Inner::Running(shared) => shared.poll_outcome(cx),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for CompareHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareHandle")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Detached controls for a comparison.
///
/// Does not keep the comparison alive; once the handle is gone every call is
/// a no-op and [`CompareControl::is_settled`] reports `true`.
pub struct CompareControl<T, E> {
    shared: Weak<Shared<T, E>>,
}

impl<T, E> Clone for CompareControl<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: 'static, E: 'static> CompareControl<T, E> {
    /// See [`CompareHandle::checkpoint`].
    pub fn checkpoint(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.checkpoint();
        }
    }

    /// See [`CompareHandle::end`].
    pub fn end(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.end();
        }
    }

    pub fn is_settled(&self) -> bool {
        self.shared.upgrade().map_or(true, |shared| shared.is_settled())
    }
}

impl<T, E> fmt::Debug for CompareControl<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareControl")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}
