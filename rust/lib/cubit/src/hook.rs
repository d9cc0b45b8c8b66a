use std::fmt;

use tracing::{debug, warn};

use crate::error::{CubitError, HookError};
use crate::transition::Transition;

/// Extension point invoked by [`Cubit::emit`](crate::Cubit::emit) before a
/// new state becomes visible.
///
/// Both methods default to no-ops, so an implementation only overrides what
/// it observes. Returning `Err` from `on_transition` vetoes the emit: the
/// state is left unchanged and no subscriber is notified.
pub trait TransitionHook<S>: Send + Sync {
    /// Called with `(previous, next)` before `next` is committed.
    fn on_transition(&self, transition: &Transition<S>) -> Result<(), HookError> {
        let _ = transition;
        Ok(())
    }

    /// Called after an emit failed, whether closed or vetoed.
    fn on_error(&self, error: &CubitError) {
        let _ = error;
    }

    /// Run `self` first, then `next`. `next` only sees transitions `self` accepted.
    fn then<H>(self, next: H) -> Chain<Self, H>
    where
        Self: Sized,
        H: TransitionHook<S>,
    {
        Chain { first: self, second: next }
    }
}

/// Hook that accepts every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl<S> TransitionHook<S> for NoopHook {}

/// Two hooks run in sequence. Built by [`TransitionHook::then`].
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<S, A, B> TransitionHook<S> for Chain<A, B>
where
    A: TransitionHook<S>,
    B: TransitionHook<S>,
{
    fn on_transition(&self, transition: &Transition<S>) -> Result<(), HookError> {
        self.first.on_transition(transition)?;
        self.second.on_transition(transition)
    }

    fn on_error(&self, error: &CubitError) {
        self.first.on_error(error);
        self.second.on_error(error);
    }
}

/// Closure-backed hook. Built by [`from_fn`].
#[derive(Clone)]
pub struct FnHook<F> {
    f: F,
}

impl<F> fmt::Debug for FnHook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook").finish_non_exhaustive()
    }
}

/// Wrap a closure as the `on_transition` of a hook.
///
/// ```ignore
/// let hook = cubit::from_fn(|t: &Transition<i64>| {
///     if *t.next() < 0 {
///         return Err("balance cannot go negative".into());
///     }
///     Ok(())
/// });
/// ```
pub fn from_fn<S, F>(f: F) -> FnHook<F>
where
    F: Fn(&Transition<S>) -> Result<(), HookError> + Send + Sync,
{
    FnHook { f }
}

impl<S, F> TransitionHook<S> for FnHook<F>
where
    F: Fn(&Transition<S>) -> Result<(), HookError> + Send + Sync,
{
    fn on_transition(&self, transition: &Transition<S>) -> Result<(), HookError> {
        (self.f)(transition)
    }
}

/// Logs every transition at `debug` and every failed emit at `warn`.
#[derive(Debug, Clone)]
pub struct TracingHook {
    name: String,
}

impl TracingHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<S: fmt::Debug> TransitionHook<S> for TracingHook {
    fn on_transition(&self, transition: &Transition<S>) -> Result<(), HookError> {
        debug!(
            cubit = %self.name,
            previous = ?transition.previous(),
            next = ?transition.next(),
            "transition"
        );
        Ok(())
    }

    fn on_error(&self, error: &CubitError) {
        warn!(cubit = %self.name, error = %error, "emit failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, RwLock};

    #[derive(Clone, Default)]
    struct Log(Arc<RwLock<Vec<String>>>);

    impl Log {
        fn push(&self, line: String) {
            self.0.write().unwrap().push(line);
        }

        fn lines(&self) -> Vec<String> {
            self.0.read().unwrap().clone()
        }
    }

    struct Named {
        name: &'static str,
        log: Log,
        reject: bool,
    }

    impl TransitionHook<u32> for Named {
        fn on_transition(&self, t: &Transition<u32>) -> Result<(), HookError> {
            self.log
                .push(format!("{}:{}->{}", self.name, t.previous(), t.next()));
            if self.reject {
                return Err(format!("{} rejected", self.name).into());
            }
            Ok(())
        }

        fn on_error(&self, error: &CubitError) {
            self.log.push(format!("{}:error:{}", self.name, error));
        }
    }

    #[test]
    fn noop_accepts_everything() {
        let hook = NoopHook;
        let t = Transition::new(1u32, 2u32);
        assert!(TransitionHook::<u32>::on_transition(&hook, &t).is_ok());
        TransitionHook::<u32>::on_error(&hook, &CubitError::Closed);
    }

    #[test]
    fn from_fn_runs_closure() {
        let hook = from_fn(|t: &Transition<i64>| {
            if *t.next() < 0 {
                return Err("negative".into());
            }
            Ok(())
        });

        assert!(hook.on_transition(&Transition::new(0, 5)).is_ok());
        let err = hook.on_transition(&Transition::new(0, -1)).unwrap_err();
        assert_eq!(err.to_string(), "negative");
    }

    #[test]
    fn chain_runs_in_order() {
        let log = Log::default();
        let hook = Named { name: "a", log: log.clone(), reject: false }.then(Named {
            name: "b",
            log: log.clone(),
            reject: false,
        });

        hook.on_transition(&Transition::new(1, 2)).unwrap();
        assert_eq!(log.lines(), vec!["a:1->2", "b:1->2"]);
    }

    #[test]
    fn chain_stops_at_first_rejection() {
        let log = Log::default();
        let hook = Named { name: "a", log: log.clone(), reject: true }.then(Named {
            name: "b",
            log: log.clone(),
            reject: false,
        });

        let err = hook.on_transition(&Transition::new(1, 2)).unwrap_err();
        assert_eq!(err.to_string(), "a rejected");
        assert_eq!(log.lines(), vec!["a:1->2"]);
    }

    #[test]
    fn chain_forwards_errors_to_both() {
        let log = Log::default();
        let hook = Named { name: "a", log: log.clone(), reject: false }.then(Named {
            name: "b",
            log: log.clone(),
            reject: false,
        });

        hook.on_error(&CubitError::Closed);
        assert_eq!(
            log.lines(),
            vec![
                "a:error:cannot emit new states after calling close",
                "b:error:cannot emit new states after calling close",
            ]
        );
    }

    /// Shared buffer the fmt subscriber writes into.
    #[derive(Clone, Default)]
    struct Captured(Arc<RwLock<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.read().unwrap()).into_owned()
        }
    }

    #[test]
    fn tracing_hook_logs_transition_and_error_fields() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let hook = TracingHook::new("counter");
        tracing::subscriber::with_default(subscriber, || {
            assert!(hook.on_transition(&Transition::new(1u32, 2u32)).is_ok());
            TransitionHook::<u32>::on_error(&hook, &CubitError::Closed);
        });

        let text = captured.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].contains("DEBUG"), "{text}");
        assert!(lines[0].contains("transition"), "{text}");
        assert!(lines[0].contains("cubit=counter"), "{text}");
        assert!(lines[0].contains("previous=1"), "{text}");
        assert!(lines[0].contains("next=2"), "{text}");
        assert!(lines[1].contains("WARN"), "{text}");
        assert!(lines[1].contains("emit failed"), "{text}");
        assert!(
            lines[1].contains("error=cannot emit new states after calling close"),
            "{text}"
        );
    }
}
