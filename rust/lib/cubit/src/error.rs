use thiserror::Error;

/// Error returned by a [`TransitionHook`](crate::hook::TransitionHook) to veto a transition.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CubitError {
    #[error("cannot emit new states after calling close")]
    Closed,

    #[error("transition rejected: {0}")]
    Transition(#[source] HookError),
}

impl CubitError {
    /// Whether this error was produced by emitting into a closed instance.
    pub fn is_closed(&self) -> bool {
        matches!(self, CubitError::Closed)
    }
}
