use std::fmt;

/// A single state change: the value being replaced and the value replacing it.
///
/// Built by [`Cubit::emit`](crate::Cubit::emit) right before the new value is
/// committed, handed to the transition hook by reference, then dropped.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Transition<S> {
    previous: S,
    next: S,
}

impl<S> Transition<S> {
    /// Record a change from `previous` to `next`.
    pub fn new(previous: S, next: S) -> Self {
        Self { previous, next }
    }

    /// State immediately before the emit.
    pub fn previous(&self) -> &S {
        &self.previous
    }

    /// State the emit is about to commit.
    pub fn next(&self) -> &S {
        &self.next
    }

    /// Split into `(previous, next)`.
    pub fn into_parts(self) -> (S, S) {
        (self.previous, self.next)
    }
}

impl<S: fmt::Debug> fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("previous", &self.previous)
            .field("next", &self.next)
            .finish()
    }
}

impl<S: fmt::Debug> fmt::Display for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transition {{ previous: {:?}, next: {:?} }}",
            self.previous, self.next
        )
    }
}
