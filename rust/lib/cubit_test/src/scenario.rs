use std::fmt::Debug;
use std::time::Duration;

use cubit::{Cubit, CubitError};
use tracing::debug;

use crate::error::CubitTestError;
use crate::recorder::StateRecorder;

type Act<C> = Box<dyn FnOnce(&C) -> Result<(), CubitError>>;
type Verify<C> = Box<dyn FnOnce(&C)>;

/// One state-sequence scenario against a freshly built cubit.
///
/// `run` performs, in order:
/// 1. `build` the cubit
/// 2. emit the `seed` state, if any (not recorded)
/// 3. start recording
/// 4. run `act`, collecting its error
/// 5. (`run_async` only) sleep for `wait`
/// 6. close the cubit
/// 7. compare recorded states, minus the first `skip`, with `expect`
/// 8. compare `act`'s error with `errors`
/// 9. call `verify`
///
/// States are only compared when `expect` was set. Errors are always
/// compared; an unexpected `act` error fails the scenario.
pub struct CubitTest<C, S> {
    build: Box<dyn FnOnce() -> C>,
    seed: Option<S>,
    act: Option<Act<C>>,
    skip: usize,
    wait: Option<Duration>,
    expect: Option<Vec<S>>,
    errors: Vec<String>,
    verify: Option<Verify<C>>,
}

/// Cubit and recordings after `act` returned.
struct Acted<C, S> {
    cubit: C,
    recorder: StateRecorder<S>,
    errors: Vec<String>,
}

/// Expectations checked once the cubit is closed.
struct Checks<C, S> {
    skip: usize,
    expect: Option<Vec<S>>,
    errors: Vec<String>,
    verify: Option<Verify<C>>,
}

impl<C, S> CubitTest<C, S>
where
    C: AsRef<Cubit<S>> + 'static,
    S: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    pub fn new<B>(build: B) -> Self
    where
        B: FnOnce() -> C + 'static,
    {
        Self {
            build: Box::new(build),
            seed: None,
            act: None,
            skip: 0,
            wait: None,
            expect: None,
            errors: Vec::new(),
            verify: None,
        }
    }

    /// State emitted before recording starts.
    pub fn seed(mut self, state: S) -> Self {
        self.seed = Some(state);
        self
    }

    pub fn act<F>(mut self, act: F) -> Self
    where
        F: FnOnce(&C) -> Result<(), CubitError> + 'static,
    {
        self.act = Some(Box::new(act));
        self
    }

    /// Number of recorded states to ignore before comparing.
    pub fn skip(mut self, count: usize) -> Self {
        self.skip = count;
        self
    }

    /// Delay between `act` and close, honoured by `run_async`.
    pub fn wait(mut self, duration: Duration) -> Self {
        self.wait = Some(duration);
        self
    }

    pub fn expect(mut self, states: Vec<S>) -> Self {
        self.expect = Some(states);
        self
    }

    /// Display strings of the errors `act` is expected to return.
    pub fn errors<I, E>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self
    }

    /// Extra assertions on the closed cubit.
    pub fn verify<F>(mut self, verify: F) -> Self
    where
        F: FnOnce(&C) + 'static,
    {
        self.verify = Some(Box::new(verify));
        self
    }

    pub fn run(self) -> Result<(), CubitTestError> {
        let (acted, checks) = self.start()?;
        checks.finish(acted)
    }

    /// Like [`run`](Self::run), but sleeps for `wait` after `act` so tasks
    /// spawned by `act` can emit before the cubit closes.
    pub async fn run_async(self) -> Result<(), CubitTestError> {
        let wait = self.wait;
        let (acted, checks) = self.start()?;
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
        checks.finish(acted)
    }

    fn start(self) -> Result<(Acted<C, S>, Checks<C, S>), CubitTestError> {
        let cubit = (self.build)();
        if let Some(seed) = self.seed {
            cubit.as_ref().emit(seed).map_err(CubitTestError::Seed)?;
        }
        let view: &Cubit<S> = cubit.as_ref();
        let recorder = StateRecorder::new(view);
        let mut errors = Vec::new();
        if let Some(act) = self.act {
            if let Err(err) = act(&cubit) {
                errors.push(err.to_string());
            }
        }
        let acted = Acted {
            cubit,
            recorder,
            errors,
        };
        let checks = Checks {
            skip: self.skip,
            expect: self.expect,
            errors: self.errors,
            verify: self.verify,
        };
        Ok((acted, checks))
    }
}

impl<C, S> Checks<C, S>
where
    C: AsRef<Cubit<S>>,
    S: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn finish(self, acted: Acted<C, S>) -> Result<(), CubitTestError> {
        let Acted {
            cubit,
            recorder,
            errors,
        } = acted;
        cubit.as_ref().close();

        let actual: Vec<S> = recorder.states().into_iter().skip(self.skip).collect();
        debug!(states = actual.len(), errors = errors.len(), "scenario finished");

        if let Some(expected) = &self.expect {
            if expected != &actual {
                return Err(CubitTestError::States {
                    expected: format!("{:?}", expected),
                    actual: format!("{:?}", actual),
                });
            }
        }
        if self.errors != errors {
            return Err(CubitTestError::Errors {
                expected: self.errors,
                actual: errors,
            });
        }
        if let Some(verify) = self.verify {
            verify(&cubit);
        }
        Ok(())
    }
}
