use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::CubitError;
use crate::holder::{StateHandler, StateHolder};
use crate::hook::{NoopHook, TransitionHook};
use crate::observable::Observable;
use crate::stream::StateStream;
use crate::subscription::{Subscription, SubscriptionId};
use crate::transition::Transition;

/// State container: a [`StateHolder`] plus a [`TransitionHook`] run before
/// every change.
///
/// `emit(next)` builds `Transition(state(), next)`, passes it to the hook and
/// only then commits `next`. A hook error aborts the emit with no visible
/// effect.
///
/// # Examples
///
/// ```ignore
/// struct Counter(Cubit<i64>);
///
/// impl Counter {
///     fn increment(&self) -> Result<(), CubitError> {
///         self.0.emit(self.0.state() + 1)
///     }
/// }
///
/// impl AsRef<Cubit<i64>> for Counter {
///     fn as_ref(&self) -> &Cubit<i64> { &self.0 }
/// }
/// ```
pub struct Cubit<S> {
    name: Option<String>,
    holder: StateHolder<S>,
    hook: Box<dyn TransitionHook<S>>,
    /// Serializes read-hook-commit so `previous` is the value being replaced.
    emit_lock: Mutex<()>,
}

impl<S: Clone + Send + Sync + 'static> Cubit<S> {
    /// Create a cubit with a no-op hook.
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    /// Create a cubit that runs `hook` before every change.
    pub fn with_hook<H>(initial: S, hook: H) -> Self
    where
        H: TransitionHook<S> + 'static,
    {
        Self::builder(initial).hook(hook).build()
    }

    /// Start a [`CubitBuilder`] with `initial` as the state.
    pub fn builder(initial: S) -> CubitBuilder<S> {
        CubitBuilder {
            initial,
            name: None,
            hook: Box::new(NoopHook),
        }
    }

    /// Name given through the builder, used as the `cubit` tracing field.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Current state. See [`StateHolder::state`].
    pub fn state(&self) -> S {
        self.holder.state()
    }

    /// Run the hook on `(state(), next)`, then commit `next` and notify.
    ///
    /// Fails with [`CubitError::Closed`] after `close` (the hook is not run)
    /// and with [`CubitError::Transition`] if the hook rejects. Either way
    /// the state is unchanged and the hook's `on_error` is called.
    ///
    /// The hook must not emit on or close the same cubit; subscribers may.
    pub fn emit(&self, next: S) -> Result<(), CubitError> {
        match self.commit(next) {
            Ok(()) => {
                self.holder.flush();
                Ok(())
            }
            Err(err) => {
                debug!(
                    cubit = self.name.as_deref().unwrap_or_default(),
                    error = %err,
                    "emit rejected"
                );
                self.hook.on_error(&err);
                Err(err)
            }
        }
    }

    fn commit(&self, next: S) -> Result<(), CubitError> {
        let _guard = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.holder.is_closed() {
            return Err(CubitError::Closed);
        }
        let transition = Transition::new(self.holder.state(), next);
        self.hook
            .on_transition(&transition)
            .map_err(CubitError::Transition)?;
        let (_, next) = transition.into_parts();
        self.holder.commit(next)
    }

    /// See [`StateHolder::subscribe`].
    pub fn subscribe<F>(&self, handler: F) -> Subscription<S>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.holder.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.holder.unsubscribe(id)
    }

    /// See [`StateHolder::stream`].
    pub fn stream(&self) -> StateStream<S> {
        self.holder.stream()
    }

    /// Close the cubit. Idempotent; later emits fail with [`CubitError::Closed`].
    ///
    /// Waits for an emit in progress on another thread to commit first, and
    /// for a subscriber running on another thread to return.
    pub fn close(&self) {
        {
            let _guard = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if self.holder.seal() {
                debug!(cubit = self.name.as_deref().unwrap_or_default(), "cubit closed");
            }
        }
        // Outside the emit lock: the running subscriber may itself emit.
        self.holder.wait_idle();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.holder.is_closed()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.holder.subscriber_count()
    }
}

impl<S> AsRef<Cubit<S>> for Cubit<S> {
    fn as_ref(&self) -> &Cubit<S> {
        self
    }
}

impl<S: Clone + Send + Sync + 'static> Observable<S> for Cubit<S> {
    fn state(&self) -> S {
        self.holder.state()
    }

    fn observe(&self, handler: StateHandler<S>) -> Subscription<S> {
        Observable::observe(&self.holder, handler)
    }
}

impl<S: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for Cubit<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cubit")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for a [`Cubit`] with a name and/or a hook.
pub struct CubitBuilder<S> {
    initial: S,
    name: Option<String>,
    hook: Box<dyn TransitionHook<S>>,
}

impl<S: Clone + Send + Sync + 'static> CubitBuilder<S> {
    /// Name reported in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the hook. The last call wins; compose with [`TransitionHook::then`].
    pub fn hook<H>(mut self, hook: H) -> Self
    where
        H: TransitionHook<S> + 'static,
    {
        self.hook = Box::new(hook);
        self
    }

    pub fn build(self) -> Cubit<S> {
        Cubit {
            name: self.name,
            holder: StateHolder::new(self.initial),
            hook: self.hook,
            emit_lock: Mutex::new(()),
        }
    }
}
