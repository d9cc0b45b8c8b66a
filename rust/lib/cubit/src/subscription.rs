use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::holder::Shared;

/// Unique ID of one registration, returned inside a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value, unique per holder.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A consumer's registration on a [`StateHolder`](crate::StateHolder).
///
/// Dropping the handle does NOT unsubscribe; call [`cancel`](Self::cancel)
/// when the consumer is torn down. The handle only holds a weak reference,
/// so it never keeps the holder alive.
pub struct Subscription<S> {
    id: SubscriptionId,
    holder: Weak<Shared<S>>,
    active: Arc<AtomicBool>,
}

impl<S> Subscription<S> {
    pub(crate) fn new(id: SubscriptionId, holder: Weak<Shared<S>>, active: Arc<AtomicBool>) -> Self {
        Self { id, holder, active }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the handler can still be invoked.
    ///
    /// Turns false on `cancel`, `unsubscribe` or when the holder closes.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Release the registration. Idempotent, and a no-op once the holder is gone.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::Release);
        if let Some(shared) = self.holder.upgrade() {
            shared.remove(self.id);
        }
    }
}

impl<S> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
