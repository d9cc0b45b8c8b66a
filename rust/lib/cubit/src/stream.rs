use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

use crate::subscription::Subscription;

/// Async sequence of committed states, created by `stream()`.
///
/// Yields every value committed after creation, in order, and ends
/// (`next()` returns `None`) once the holder is closed and the buffered
/// values are consumed. Dropping the stream cancels its subscription.
pub struct StateStream<S> {
    rx: UnboundedReceiver<S>,
    subscription: Subscription<S>,
}

impl<S> StateStream<S> {
    pub(crate) fn new(rx: UnboundedReceiver<S>, subscription: Subscription<S>) -> Self {
        Self { rx, subscription }
    }

    /// Wait for the next state. `None` once the holder has closed.
    pub async fn next(&mut self) -> Option<S> {
        self.rx.recv().await
    }

    /// Take an already-delivered state without waiting.
    pub fn try_next(&mut self) -> Option<S> {
        match self.rx.try_recv() {
            Ok(state) => Some(state),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Whether the holder has closed and every buffered state was consumed.
    pub fn is_terminated(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }

    pub fn subscription(&self) -> &Subscription<S> {
        &self.subscription
    }
}

impl<S> Drop for StateStream<S> {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}
