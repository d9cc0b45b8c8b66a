use crate::holder::StateHandler;
use crate::subscription::Subscription;

/// Read-only view of a state source: the current value and its updates.
///
/// Implemented by [`StateHolder`](crate::StateHolder) and
/// [`Cubit`](crate::Cubit). It has no way to emit, so adapters built on it
/// (listeners, recorders) can never bypass a cubit's transition hook.
pub trait Observable<S> {
    /// Current state.
    fn state(&self) -> S;

    /// Register a type-erased handler for every state committed from now on.
    fn observe(&self, handler: StateHandler<S>) -> Subscription<S>;
}
