//! The comparison state machine.
//!
//! An [`Engine`] owns both [`StreamState`]s and the comparators. Everything
//! that can change it (source notifications, pulled chunks, caller controls,
//! the end of the settle pause) arrives as an [`Input`] through
//! [`Shared::dispatch`]. Inputs raised while another input is being handled
//! (a `read()` that synchronously emits `end`, a comparator calling
//! `checkpoint()`) are queued and handled in order afterwards, so the engine
//! never re-enters itself.
//!
//! Lifecycle:
//!
//! ```text
//! Active ──both ended──▶ Settling ──pause elapsed──▶ final compare ──▶ Resolved
//!   │                       │
//!   └───────────────────────┴── conclusive input ──────────────────▶ Resolved
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use serde_json::Value;
use stream_compare_core::{names, Chunk, Listener, Source, StreamEvent, SubscriptionId};
use tokio::time::{Instant, Sleep};
use tracing::{debug, trace};

use crate::error::CompareError;
use crate::options::{CompareConfig, Comparators, ReadPolicy};
use crate::state::{Side, StreamState};

/// What a comparison produces.
pub(crate) type Outcome<T, E> = Result<Option<T>, CompareError<E>>;

/// Something that happened to the comparison.
enum Input {
    /// Failure notification with `abort_on_error` set.
    Abort { side: Side, args: Vec<Value> },
    /// A watched notification.
    Event {
        side: Side,
        name: Rc<str>,
        args: Vec<Value>,
    },
    /// An end-triggering notification.
    End { side: Side },
    /// A pushed chunk.
    Data { side: Side, chunk: Chunk },
    /// A source we are waiting on has data again.
    Readable { side: Side },
    /// Start pulling.
    Pull,
    Checkpoint,
    ForceEnd,
    /// The settle pause elapsed.
    Finalize,
}

// =============================================================================
// SHARED CELL
// =============================================================================

/// The engine plus its input queue, shared by the handle, the controls and
/// every listener installed on the sources.
///
/// Only the handle holds a strong reference; everything else holds a
/// [`Weak`], so dropping the handle drops the engine and its subscriptions.
pub(crate) struct Shared<T, E> {
    engine: RefCell<Engine<T, E>>,
    queue: RefCell<VecDeque<Input>>,
    pumping: Cell<bool>,
}

impl<T: 'static, E: 'static> Shared<T, E> {
    /// Build an engine, subscribe it to both sources and start reading.
    pub(crate) fn start(
        sources: [Rc<dyn Source>; 2],
        comparators: Comparators<T, E>,
        config: CompareConfig,
    ) -> Rc<Self> {
        let same_source =
            Rc::as_ptr(&sources[0]) as *const () == Rc::as_ptr(&sources[1]) as *const ();
        debug!(
            read_policy = %config.read_policy,
            object_mode = config.object_mode,
            same_source,
            "comparison started"
        );

        let shared = Rc::new_cyclic(|this| Shared {
            engine: RefCell::new(Engine {
                sources: sources.clone(),
                states: [StreamState::new(), StreamState::new()],
                comparators,
                config: config.clone(),
                subscriptions: Vec::new(),
                readable_wait: None,
                ended: 0,
                phase: Phase::Active,
                waker: None,
                this: this.clone(),
                same_source,
            }),
            queue: RefCell::new(VecDeque::new()),
            // Held while subscribing: sources may deliver synchronously.
            pumping: Cell::new(true),
        });
        let this = Rc::downgrade(&shared);

        let mut subscriptions = Vec::new();
        for side in Side::BOTH {
            let source = &sources[side.index()];

            // Ahead of the event listeners so an abort wins over logging.
            if config.abort_on_error {
                let listener = listen(&this, move |args| Input::Abort {
                    side,
                    args: args.to_vec(),
                });
                subscriptions.push((side, source.subscribe(names::ERROR, listener)));
            }

            for name in &config.events {
                let name: Rc<str> = Rc::from(name.as_str());
                let listener = listen(&this, {
                    let name = Rc::clone(&name);
                    move |args| Input::Event {
                        side,
                        name: Rc::clone(&name),
                        args: args.to_vec(),
                    }
                });
                subscriptions.push((side, source.subscribe(&name, listener)));
            }

            for name in &config.end_events {
                let listener = listen(&this, move |_| Input::End { side });
                subscriptions.push((side, source.subscribe(name, listener)));
            }

            // A source compared with itself gets one data listener feeding
            // both states, so chunks it flushes on subscribe reach both.
            if config.read_policy == ReadPolicy::Flowing && !(same_source && side == Side::Second) {
                let this = this.clone();
                let targets: &'static [Side] = if same_source { &Side::BOTH } else { side.as_slice() };
                let id = source.subscribe_data(Rc::new(move |chunk: &Chunk| {
                    for &side in targets {
                        if let Some(shared) = this.upgrade() {
                            shared.dispatch(Input::Data {
                                side,
                                chunk: chunk.clone(),
                            });
                        }
                    }
                }));
                subscriptions.push((side, id));
            }
        }

        shared.engine.borrow_mut().subscriptions = subscriptions;
        shared.pumping.set(false);

        if config.read_policy == ReadPolicy::Least {
            shared.dispatch(Input::Pull);
        } else {
            shared.pump();
        }
        shared
    }

    fn dispatch(&self, input: Input) {
        self.queue.borrow_mut().push_back(input);
        self.pump();
    }

    /// Handle queued inputs until the queue is empty.
    fn pump(&self) {
        if self.pumping.replace(true) {
            return;
        }
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(input) = next else { break };
            self.engine.borrow_mut().handle(input);
        }
        self.pumping.set(false);
    }

    pub(crate) fn checkpoint(&self) {
        self.dispatch(Input::Checkpoint);
    }

    pub(crate) fn end(&self) {
        self.dispatch(Input::ForceEnd);
    }

    /// Whether an outcome has been decided.
    ///
    /// Reports `false` when asked from inside a comparator.
    pub(crate) fn is_settled(&self) -> bool {
        self.engine
            .try_borrow()
            .map_or(false, |engine| !engine.is_live())
    }

    /// Drive the settle pause and hand out the outcome once decided.
    pub(crate) fn poll_outcome(&self, cx: &mut Context<'_>) -> Poll<Outcome<T, E>> {
        loop {
            let step = match self.engine.try_borrow_mut() {
                Ok(mut engine) => engine.poll_phase(cx),
                Err(_) => {
                    cx.waker().wake_by_ref();
                    Step::Pending
                }
            };
            match step {
                Step::Ready(outcome) => return Poll::Ready(outcome),
                Step::Pending => return Poll::Pending,
                Step::Finalize => {
                    self.dispatch(Input::Finalize);
                    if self.pumping.get() {
                        // Polled from inside a handler; finish on the next poll.
                        cx.waker().wake_by_ref();
                        return Poll::Pending;
                    }
                }
            }
        }
    }
}

/// Wrap an input constructor into a source listener.
fn listen<T: 'static, E: 'static>(
    this: &Weak<Shared<T, E>>,
    make: impl Fn(&[Value]) -> Input + 'static,
) -> Listener {
    let this = this.clone();
    Rc::new(move |args: &[Value]| {
        if let Some(shared) = this.upgrade() {
            shared.dispatch(make(args));
        }
    })
}

// =============================================================================
// ENGINE
// =============================================================================

enum Phase<T, E> {
    Active,
    /// Both sources ended; waiting out the settle pause.
    Settling(Settle),
    /// `None` once the outcome was handed out.
    Resolved(Option<Outcome<T, E>>),
}

enum Step<T, E> {
    Ready(Outcome<T, E>),
    Pending,
    Finalize,
}

/// The pause between both sources ending and the final comparison.
///
/// Always lasts at least one scheduler turn.
struct Settle {
    deadline: Option<Instant>,
    yielded: bool,
    timer: Option<Pin<Box<Sleep>>>,
}

impl Settle {
    fn new(delay: Duration) -> Self {
        Self {
            deadline: (!delay.is_zero()).then(|| Instant::now() + delay),
            yielded: false,
            timer: None,
        }
    }

    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if !self.yielded {
            self.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        let Some(deadline) = self.deadline else {
            return Poll::Ready(());
        };
        self.timer
            .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(deadline)))
            .as_mut()
            .poll(cx)
    }
}

struct Engine<T, E> {
    sources: [Rc<dyn Source>; 2],
    states: [StreamState; 2],
    comparators: Comparators<T, E>,
    config: CompareConfig,
    subscriptions: Vec<(Side, SubscriptionId)>,
    /// Readiness subscription while a pull came back empty.
    readable_wait: Option<(Side, SubscriptionId)>,
    /// Sources that have ended, counting first transitions only.
    ended: u8,
    phase: Phase<T, E>,
    waker: Option<Waker>,
    this: Weak<Shared<T, E>>,
    /// Both inputs are the same source; pulled chunks feed both states.
    same_source: bool,
}

impl<T, E> Engine<T, E> {
    fn is_live(&self) -> bool {
        matches!(self.phase, Phase::Active | Phase::Settling(_))
    }

    fn cancel_wait(&mut self) {
        if let Some((side, id)) = self.readable_wait.take() {
            self.sources[side.index()].unsubscribe(id);
        }
    }

    fn teardown(&mut self) {
        self.cancel_wait();
        for (side, id) in self.subscriptions.drain(..) {
            self.sources[side.index()].unsubscribe(id);
        }
    }
}

impl<T: 'static, E: 'static> Engine<T, E> {
    fn handle(&mut self, input: Input) {
        if !self.is_live() {
            match input {
                Input::Checkpoint | Input::ForceEnd => {
                    debug!("control ignored: comparison already resolved")
                }
                _ => trace!("input ignored: comparison already resolved"),
            }
            return;
        }

        match input {
            Input::Abort { side, args } => {
                self.resolve(Err(CompareError::SourceFailed { side, args }), "source error")
            }
            Input::Event { side, name, args } => {
                self.states[side.index()].record_event(StreamEvent::new(&*name, args));
                self.run_incremental();
            }
            Input::End { side } => self.on_end(side),
            Input::Data { side, chunk } => self.accept(side, chunk),
            Input::Readable { side } => {
                if matches!(self.readable_wait, Some((waiting, _)) if waiting == side) {
                    trace!(%side, "source readable");
                    self.cancel_wait();
                    self.read_next();
                }
            }
            Input::Pull => self.read_next(),
            Input::Checkpoint => self.compare_now(false, "checkpoint"),
            Input::ForceEnd => self.compare_now(true, "end"),
            Input::Finalize => {
                if matches!(self.phase, Phase::Settling(_)) {
                    self.compare_now(true, "final")
                }
            }
        }
    }

    fn on_end(&mut self, side: Side) {
        if !self.states[side.index()].mark_ended() {
            trace!(%side, "repeated end ignored");
            return;
        }
        self.ended += 1;
        debug!(%side, ended = self.ended, "source ended");

        self.run_incremental();
        if !self.is_live() {
            return;
        }

        // The ended source will never become readable again.
        if matches!(self.readable_wait, Some((waiting, _)) if waiting == side) {
            self.cancel_wait();
            self.read_next();
        }

        if self.ended == 2 && matches!(self.phase, Phase::Active) {
            trace!(delay_ms = self.config.delay_ms, "both sources ended, settling");
            self.phase = Phase::Settling(Settle::new(self.config.delay()));
            self.wake();
        }
    }

    /// Accumulate a chunk and give the incremental comparator a look.
    fn accept(&mut self, side: Side, chunk: Chunk) {
        if let Err(source) = self.states[side.index()].add_chunk(chunk, self.config.object_mode) {
            self.resolve(Err(CompareError::DataShape { side, source }), "data shape");
            return;
        }
        self.run_incremental();
    }

    /// Pull from the source that is behind until one has nothing to give.
    fn read_next(&mut self) {
        while self.is_live() && self.readable_wait.is_none() {
            let Some(side) = self.next_side() else { return };
            let source = Rc::clone(&self.sources[side.index()]);
            match source.read() {
                Some(chunk) if self.same_source => {
                    self.accept(Side::First, chunk.clone());
                    if self.is_live() {
                        self.accept(Side::Second, chunk);
                    }
                }
                Some(chunk) => self.accept(side, chunk),
                None => self.wait_readable(side),
            }
        }
    }

    /// The live source with the least data, ties to the first.
    fn next_side(&self) -> Option<Side> {
        let [first, second] = &self.states;
        if !first.ended() && (second.ended() || first.total_data_len() <= second.total_data_len()) {
            Some(Side::First)
        } else if !second.ended() {
            Some(Side::Second)
        } else {
            None
        }
    }

    fn wait_readable(&mut self, side: Side) {
        self.cancel_wait();
        trace!(%side, "waiting for source to become readable");
        let listener = listen(&self.this, move |_| Input::Readable { side });
        let id = self.sources[side.index()].subscribe(names::READABLE, listener);
        self.readable_wait = Some((side, id));
    }

    fn run_incremental(&mut self) {
        let [first, second] = &mut self.states;
        let Some(incremental) = self.comparators.incremental() else {
            return;
        };
        match incremental(first, second) {
            Ok(None) => {}
            Ok(Some(value)) => self.resolve(Ok(Some(value)), "incremental"),
            Err(err) => self.resolve(Err(CompareError::Comparator(err)), "incremental"),
        }
    }

    /// Run the final comparator now.
    ///
    /// Without `force` an absent result leaves the comparison running.
    fn compare_now(&mut self, force: bool, via: &'static str) {
        let [first, second] = &mut self.states;
        match (self.comparators.finalizer())(first, second) {
            Ok(None) if !force => debug!(via, "comparison inconclusive"),
            Ok(value) => self.resolve(Ok(value), via),
            Err(err) => self.resolve(Err(CompareError::Comparator(err)), via),
        }
    }

    fn resolve(&mut self, outcome: Outcome<T, E>, via: &'static str) {
        if !self.is_live() {
            return;
        }
        debug!(via, ok = outcome.is_ok(), "comparison resolved");
        self.teardown();
        self.phase = Phase::Resolved(Some(outcome));
        self.wake();
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn poll_phase(&mut self, cx: &mut Context<'_>) -> Step<T, E> {
        match &mut self.phase {
            Phase::Active => {
                self.waker = Some(cx.waker().clone());
                Step::Pending
            }
            Phase::Settling(settle) => match settle.poll(cx) {
                Poll::Ready(()) => Step::Finalize,
                Poll::Pending => {
                    self.waker = Some(cx.waker().clone());
                    Step::Pending
                }
            },
            Phase::Resolved(outcome) => match outcome.take() {
                Some(outcome) => Step::Ready(outcome),
                None => panic!("CompareHandle polled after completion"),
            },
        }
    }
}

impl<T, E> Drop for Engine<T, E> {
    fn drop(&mut self) {
        if self.is_live() {
            trace!("comparison dropped before resolution");
        }
        self.teardown();
    }
}
