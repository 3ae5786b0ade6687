//! Futures and the delivery of their callbacks.
//!
//! Every asynchronous entry point registers an event with the instance's
//! [`EventManager`] and returns its [`FutureId`]. An event is *ready* once the
//! work it waits for has completed, and *fired* once its callback has run.
//! When an event fires depends on the [`CallbackMode`] it was registered
//! with:
//!
//! * [`CallbackMode::AllowSpontaneous`] events fire as soon as they are ready,
//!   on whichever thread made them ready.
//! * [`CallbackMode::AllowProcessEvents`] events fire from
//!   `instance_process_events` or from an `instance_wait_any` naming them.
//! * [`CallbackMode::WaitAnyOnly`] events only fire from an
//!   `instance_wait_any` naming them.
//!
//! Callbacks are never run while the manager's lock is held, so they are free
//! to call back into the procedure table.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use pt::{CallbackMode, WaitStatus};

use crate::FastHashMap;

/// Handle to an asynchronous operation.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FutureId(pub u64);

impl FutureId {
    /// The future that never completes, returned when no event was tracked.
    pub const NULL: FutureId = FutureId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// One entry of an `instance_wait_any` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FutureWaitInfo {
    pub future: FutureId,
    /// Set to `true` when the future has completed.
    pub completed: bool,
}

impl FutureWaitInfo {
    pub fn new(future: FutureId) -> Self {
        Self {
            future,
            completed: false,
        }
    }
}

/// A callback together with how it may be delivered.
pub struct CallbackInfo<F> {
    pub mode: CallbackMode,
    pub callback: F,
}

impl<F> CallbackInfo<F> {
    pub fn new(mode: CallbackMode, callback: F) -> Self {
        Self { mode, callback }
    }
}

impl<F> std::fmt::Debug for CallbackInfo<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackInfo")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// How an event ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EventOutcome {
    /// The work completed and the callback was delivered.
    Ready,
    /// The instance went away before the callback could be delivered.
    Cancelled,
}

type CompleteFn = Box<dyn FnOnce(EventOutcome) + Send>;

struct TrackedEvent {
    mode: CallbackMode,
    ready: bool,
    complete: CompleteFn,
}

#[derive(Default)]
struct EventState {
    next_id: u64,
    events: FastHashMap<u64, TrackedEvent>,
    /// No more events will be delivered, only cancelled.
    closed: bool,
}

impl EventState {
    fn take_ready(&mut self, filter: impl Fn(u64, &TrackedEvent) -> bool) -> Vec<(u64, CompleteFn)> {
        let ids = self
            .events
            .iter()
            .filter(|(&id, event)| event.ready && filter(id, event))
            .map(|(&id, _)| id)
            .collect::<Vec<_>>();

        let mut fired = ids
            .into_iter()
            .filter_map(|id| Some((id, self.events.remove(&id)?.complete)))
            .collect::<Vec<_>>();

        // Deliver in registration order.
        fired.sort_by_key(|(id, _)| *id);
        fired
    }
}

/// Tracks the events of one instance.
pub(crate) struct EventManager {
    state: Mutex<EventState>,
    ready: Condvar,
}

impl EventManager {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(EventState {
                next_id: 1,
                ..EventState::default()
            }),
            ready: Condvar::new(),
        }
    }

    /// Track a new event, returning its future.
    ///
    /// `complete` runs exactly once: with [`EventOutcome::Ready`] when the
    /// event fires, or with [`EventOutcome::Cancelled`] if the manager is
    /// closed first.
    pub(crate) fn track(
        &self,
        mode: CallbackMode,
        ready: bool,
        complete: impl FnOnce(EventOutcome) + Send + 'static,
    ) -> FutureId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        if state.closed {
            drop(state);
            complete(EventOutcome::Cancelled);
            return FutureId(id);
        }

        if ready && mode == CallbackMode::AllowSpontaneous {
            drop(state);
            complete(EventOutcome::Ready);
            return FutureId(id);
        }

        state.events.insert(
            id,
            TrackedEvent {
                mode,
                ready,
                complete: Box::new(complete),
            },
        );

        if ready {
            self.ready.notify_all();
        }

        FutureId(id)
    }

    /// Mark an event as ready, firing it if it is spontaneous.
    pub(crate) fn set_ready(&self, future: FutureId) {
        let mut state = self.state.lock();

        let Some(event) = state.events.get_mut(&future.0) else {
            return;
        };

        if event.mode == CallbackMode::AllowSpontaneous {
            if let Some(event) = state.events.remove(&future.0) {
                drop(state);
                (event.complete)(EventOutcome::Ready);
            }

            return;
        }

        event.ready = true;
        drop(state);
        self.ready.notify_all();
    }

    /// Fire every ready event that allows delivery from `process_events`.
    ///
    /// Returns the number of callbacks that ran.
    pub(crate) fn process_events(&self) -> usize {
        let fired = self
            .state
            .lock()
            .take_ready(|_, event| event.mode != CallbackMode::WaitAnyOnly);

        let count = fired.len();

        for (_, complete) in fired {
            complete(EventOutcome::Ready);
        }

        count
    }

    /// Returns `true` if some ready event has not been delivered yet.
    ///
    /// Events that wait on something outside of the manager, such as a
    /// device being lost, don't count.
    pub(crate) fn has_pending(&self) -> bool {
        self.state.lock().events.values().any(|event| event.ready)
    }

    /// Wait for any of `futures` to complete, firing the ones that are ready.
    ///
    /// Futures that are unknown, because they already fired, count as
    /// completed. A zero timeout only polls.
    pub(crate) fn wait_any(&self, futures: &mut [FutureWaitInfo], timeout: Duration) -> WaitStatus {
        if futures.is_empty() {
            return WaitStatus::Success;
        }

        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();

        loop {
            let mut any = false;

            for info in futures.iter_mut() {
                match state.events.get(&info.future.0) {
                    Some(event) if !event.ready => {}
                    _ => {
                        info.completed = true;
                        any = true;
                    }
                }
            }

            if any {
                let fired = state.take_ready(|id, _| {
                    futures
                        .iter()
                        .any(|info| info.completed && info.future.0 == id)
                });

                drop(state);

                for (_, complete) in fired {
                    complete(EventOutcome::Ready);
                }

                return WaitStatus::Success;
            }

            if timeout.is_zero() {
                return WaitStatus::TimedOut;
            }

            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        return WaitStatus::TimedOut;
                    }
                }
                None => self.ready.wait(&mut state),
            }
        }
    }

    /// Close the manager, cancelling every event that hasn't fired.
    pub(crate) fn cancel_all(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.closed = true;
            let mut pending = state.events.drain().collect::<Vec<_>>();
            pending.sort_by_key(|(id, _)| *id);
            pending
        };

        self.ready.notify_all();

        for (_, event) in pending {
            (event.complete)(EventOutcome::Cancelled);
        }
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventManager")
            .field("pending", &state.events.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(EventOutcome) + Clone + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |outcome| {
            assert_eq!(outcome, EventOutcome::Ready);
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn spontaneous_fires_immediately() {
        let events = EventManager::new();
        let (count, complete) = counter();

        events.track(CallbackMode::AllowSpontaneous, true, complete.clone());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let future = events.track(CallbackMode::AllowSpontaneous, false, complete);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        events.set_ready(future);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!events.has_pending());
    }

    #[test]
    fn wait_any_only_skips_process_events() {
        let events = EventManager::new();
        let (count, complete) = counter();

        let future = events.track(CallbackMode::WaitAnyOnly, true, complete.clone());
        events.track(CallbackMode::AllowProcessEvents, true, complete);

        assert_eq!(events.process_events(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let mut infos = [FutureWaitInfo::new(future)];
        assert_eq!(events.wait_any(&mut infos, Duration::ZERO), WaitStatus::Success);
        assert!(infos[0].completed);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // A future that already fired counts as completed.
        let mut infos = [FutureWaitInfo::new(future)];
        assert_eq!(events.wait_any(&mut infos, Duration::ZERO), WaitStatus::Success);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn wait_any_times_out_on_pending() {
        let events = EventManager::new();
        let future = events.track(CallbackMode::WaitAnyOnly, false, |_| {});

        let mut infos = [FutureWaitInfo::new(future)];
        assert_eq!(events.wait_any(&mut infos, Duration::ZERO), WaitStatus::TimedOut);
        assert_eq!(
            events.wait_any(&mut infos, Duration::from_millis(10)),
            WaitStatus::TimedOut
        );
        assert!(!infos[0].completed);
    }

    #[test]
    fn wait_any_on_nothing_succeeds() {
        let events = EventManager::new();
        events.track(CallbackMode::WaitAnyOnly, false, |_| {});

        assert_eq!(events.wait_any(&mut [], Duration::ZERO), WaitStatus::Success);
        assert_eq!(events.wait_any(&mut [], Duration::MAX), WaitStatus::Success);
    }

    #[test]
    fn wait_any_wakes_up_on_ready() {
        let events = Arc::new(EventManager::new());
        let future = events.track(CallbackMode::WaitAnyOnly, false, |_| {});

        let thread = {
            let events = events.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                events.set_ready(future);
            })
        };

        let mut infos = [FutureWaitInfo::new(future)];
        assert_eq!(
            events.wait_any(&mut infos, Duration::from_secs(10)),
            WaitStatus::Success
        );
        thread.join().unwrap();
    }

    #[test]
    fn drop_cancels_pending() {
        let events = EventManager::new();
        let cancelled = Arc::new(AtomicUsize::new(0));

        for ready in [false, true] {
            let cancelled = cancelled.clone();
            events.track(CallbackMode::AllowProcessEvents, ready, move |outcome| {
                assert_eq!(outcome, EventOutcome::Cancelled);
                cancelled.fetch_add(1, Ordering::SeqCst);
            });
        }

        drop(events);
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
    }
}
