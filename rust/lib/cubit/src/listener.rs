use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::observable::Observable;
use crate::subscription::Subscription;

type Condition<S> = Box<dyn Fn(&S, &S) -> bool + Send + Sync>;

/// Builder for a filtered subscription.
///
/// - `skip(n)` discards the first `n` deliveries.
/// - `when(f)` only forwards a delivery when `f(previous, next)` holds, where
///   `previous` is the last delivered value (initially the state at `listen`).
///
/// ```ignore
/// let sub = Listener::new(&cubit)
///     .when(|prev, next| prev.phase != next.phase)
///     .listen(|state| println!("phase changed: {:?}", state.phase));
/// ```
pub struct Listener<'a, S> {
    source: &'a dyn Observable<S>,
    skip: usize,
    when: Option<Condition<S>>,
}

impl<'a, S: Clone + Send + Sync + 'static> Listener<'a, S> {
    /// Listen to a [`Cubit`](crate::Cubit) or a bare [`StateHolder`](crate::StateHolder).
    pub fn new<T: Observable<S>>(source: &'a T) -> Self {
        Self {
            source,
            skip: 0,
            when: None,
        }
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.skip = count;
        self
    }

    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&S, &S) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Box::new(condition));
        self
    }

    /// Register `handler` with the configured filters.
    pub fn listen<F>(self, handler: F) -> Subscription<S>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let remaining = AtomicUsize::new(self.skip);
        let previous = Mutex::new(self.source.state());
        let when = self.when;
        self.source.observe(Arc::new(move |next: &S| {
            let prev = {
                let mut previous = previous.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::replace(&mut *previous, next.clone())
            };
            // Deliveries are serialized, so load-then-store cannot race.
            let left = remaining.load(Ordering::Relaxed);
            if left > 0 {
                remaining.store(left - 1, Ordering::Relaxed);
                return;
            }
            if let Some(when) = &when {
                if !when(&prev, next) {
                    return;
                }
            }
            handler(next);
        }))
    }
}
