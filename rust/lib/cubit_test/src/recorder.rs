use std::sync::{Arc, Mutex, PoisonError};

use cubit::{Observable, Subscription};

/// Records every state delivered after creation.
pub struct StateRecorder<S> {
    states: Arc<Mutex<Vec<S>>>,
    subscription: Subscription<S>,
}

impl<S: Clone + Send + Sync + 'static> StateRecorder<S> {
    /// Start recording from a [`Cubit`](cubit::Cubit) or a bare `StateHolder`.
    pub fn new<T>(source: &T) -> Self
    where
        T: Observable<S> + ?Sized,
    {
        let states = Arc::new(Mutex::new(Vec::new()));
        let states_c = Arc::clone(&states);
        let subscription = source.observe(Arc::new(move |state: &S| {
            states_c
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(state.clone());
        }));
        Self {
            states,
            subscription,
        }
    }

    /// Snapshot of the recorded states, oldest first.
    pub fn states(&self) -> Vec<S> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop recording. Already recorded states are kept.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}
