use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::CubitError;
use crate::observable::Observable;
use crate::stream::StateStream;
use crate::subscription::{Subscription, SubscriptionId};

/// Callback type for state change notifications.
pub type StateHandler<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Observable holder of a single current value.
///
/// - `state()` reads the current value (always defined, never blocks on delivery).
/// - `emit(value)` commits a new value and broadcasts it to every subscriber.
/// - `subscribe(handler)` registers a handler for values committed afterwards.
/// - `close()` ends the holder; later emits fail with [`CubitError::Closed`].
///
/// Deliveries go through a FIFO queue drained by one caller at a time, so an
/// `emit` issued from inside a handler is delivered after the current value
/// has reached every subscriber.
///
/// `close`, `unsubscribe` and `Subscription::cancel` wait for a handler that
/// is running on another thread to return, so nothing is delivered after
/// they return.
pub struct StateHolder<S> {
    shared: Arc<Shared<S>>,
}

pub(crate) struct Shared<S> {
    inner: Mutex<Inner<S>>,
    /// Signalled whenever a handler call returns.
    idle: Condvar,
    /// Monotonic counter for subscription IDs.
    next_id: AtomicU64,
}

struct Inner<S> {
    current: S,
    closed: bool,
    /// Active registrations, in subscription order.
    subscribers: Vec<Entry<S>>,
    /// Committed values not yet handed to their subscribers.
    queue: VecDeque<Delivery<S>>,
    /// Set while some caller is draining `queue`.
    draining: bool,
    /// Thread currently inside a handler call, if any.
    dispatching: Option<ThreadId>,
}

struct Entry<S> {
    id: SubscriptionId,
    handler: StateHandler<S>,
    active: Arc<AtomicBool>,
}

impl<S> Clone for Entry<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
            active: Arc::clone(&self.active),
        }
    }
}

/// One committed value plus the subscribers registered at commit time.
struct Delivery<S> {
    value: S,
    targets: Vec<Entry<S>>,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until no handler runs on another thread. A handler running on
    /// the calling thread is the caller itself and is not waited for.
    fn wait_idle<'a>(&'a self, mut inner: MutexGuard<'a, Inner<S>>) -> MutexGuard<'a, Inner<S>> {
        let me = thread::current().id();
        while inner.dispatching.is_some_and(|t| t != me) {
            inner = self.idle.wait(inner).unwrap_or_else(PoisonError::into_inner);
        }
        inner
    }

    /// Remove a registration. Returns `true` if it was still registered.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        match inner.subscribers.iter().position(|e| e.id == id) {
            Some(pos) => {
                let entry = inner.subscribers.remove(pos);
                entry.active.store(false, Ordering::Release);
                drop(self.wait_idle(inner));
                true
            }
            None => false,
        }
    }
}

impl<S: Clone + Send + Sync + 'static> StateHolder<S> {
    /// Create an open holder whose current state is `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    current: initial,
                    closed: false,
                    subscribers: Vec::new(),
                    queue: VecDeque::new(),
                    draining: false,
                    dispatching: None,
                }),
                idle: Condvar::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The most recently committed value.
    ///
    /// Reflects every successful `emit` even if its deliveries are still
    /// queued. Safe to call from inside handlers.
    pub fn state(&self) -> S {
        self.shared.lock().current.clone()
    }

    /// Commit `value` and deliver it to all current subscribers.
    pub fn emit(&self, value: S) -> Result<(), CubitError> {
        self.commit(value)?;
        self.flush();
        Ok(())
    }

    /// Commit `value` as the current state and queue its deliveries without
    /// running any handler.
    pub(crate) fn commit(&self, value: S) -> Result<(), CubitError> {
        let mut inner = self.shared.lock();
        if inner.closed {
            return Err(CubitError::Closed);
        }
        inner.current = value.clone();
        if !inner.subscribers.is_empty() {
            let targets = inner.subscribers.clone();
            trace!(subscribers = targets.len(), "state committed");
            inner.queue.push_back(Delivery { value, targets });
        }
        Ok(())
    }

    /// Drain the delivery queue unless another caller is already draining it.
    pub(crate) fn flush(&self) {
        {
            let mut inner = self.shared.lock();
            if inner.draining {
                return;
            }
            inner.draining = true;
        }
        let me = thread::current().id();
        loop {
            let delivery = {
                let mut inner = self.shared.lock();
                match inner.queue.pop_front() {
                    Some(delivery) => delivery,
                    None => {
                        inner.draining = false;
                        return;
                    }
                }
            };
            for entry in &delivery.targets {
                {
                    // Checked under the lock that close/unsubscribe take, so a
                    // handler either runs before they return or not at all.
                    let mut inner = self.shared.lock();
                    if !entry.active.load(Ordering::Acquire) {
                        continue;
                    }
                    inner.dispatching = Some(me);
                }
                let result = catch_unwind(AssertUnwindSafe(|| (entry.handler)(&delivery.value)));
                self.shared.lock().dispatching = None;
                self.shared.idle.notify_all();
                if result.is_err() {
                    warn!(
                        subscription = entry.id.get(),
                        "state handler panicked, continuing delivery"
                    );
                }
            }
        }
    }

    /// Register a handler for every value committed from now on.
    ///
    /// The current value is not replayed; read `state()` for it. On a closed
    /// holder the returned subscription is already inactive.
    pub fn subscribe<F>(&self, handler: F) -> Subscription<S>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    fn subscribe_handler(&self, handler: StateHandler<S>) -> Subscription<S> {
        let id = SubscriptionId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let active = Arc::new(AtomicBool::new(false));
        {
            let mut inner = self.shared.lock();
            if inner.closed {
                debug!(subscription = id.get(), "subscribe on closed holder");
            } else {
                active.store(true, Ordering::Release);
                inner.subscribers.push(Entry {
                    id,
                    handler,
                    active: Arc::clone(&active),
                });
            }
        }
        Subscription::new(id, Arc::downgrade(&self.shared), active)
    }

    /// Remove a registration by ID. Returns `true` if it was still active.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.remove(id)
    }

    /// Async view of subsequent values. Ends when the holder closes.
    pub fn stream(&self) -> StateStream<S> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |state: &S| {
            // Receiver gone means the stream is being dropped.
            let _ = tx.send(state.clone());
        });
        StateStream::new(rx, subscription)
    }

    /// Close the holder. Idempotent.
    ///
    /// Drops every registration and every queued delivery, then waits for a
    /// handler running on another thread to return. No handler is invoked
    /// after this returns.
    pub fn close(&self) {
        self.seal();
        self.wait_idle();
    }

    /// Mark the holder closed and drop registrations without waiting.
    /// Returns `true` if this call closed it.
    pub(crate) fn seal(&self) -> bool {
        let (subscribers, queue) = {
            let mut inner = self.shared.lock();
            if inner.closed {
                return false;
            }
            inner.closed = true;
            for entry in &inner.subscribers {
                entry.active.store(false, Ordering::Release);
            }
            (
                std::mem::take(&mut inner.subscribers),
                std::mem::take(&mut inner.queue),
            )
        };
        debug!(
            subscribers = subscribers.len(),
            pending = queue.len(),
            "state holder closed"
        );
        // Handlers (and the stream senders they own) drop outside the lock.
        drop(subscribers);
        drop(queue);
        true
    }

    /// Wait for a handler running on another thread to return.
    pub(crate) fn wait_idle(&self) {
        drop(self.shared.wait_idle(self.shared.lock()));
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Number of active registrations.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }
}

impl<S: Clone + Send + Sync + 'static> Observable<S> for StateHolder<S> {
    fn state(&self) -> S {
        StateHolder::state(self)
    }

    fn observe(&self, handler: StateHandler<S>) -> Subscription<S> {
        self.subscribe_handler(handler)
    }
}
