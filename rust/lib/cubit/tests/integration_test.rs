/// End-to-end behaviour of an application cubit built on the public API.
use std::sync::{Arc, RwLock};

use cubit::{Cubit, CubitError, Listener, TracingHook, Transition, TransitionHook, from_fn};

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Loading,
    Loaded(Vec<String>),
    Failed(String),
}

/// Application cubit wrapping `Cubit<Phase>`, the way UI code would own one.
struct FeedCubit {
    inner: Cubit<Phase>,
}

impl FeedCubit {
    fn new(hook: impl TransitionHook<Phase> + 'static) -> Self {
        Self {
            inner: Cubit::builder(Phase::Idle).name("feed").hook(hook).build(),
        }
    }

    fn load(&self, items: Result<Vec<&str>, &str>) -> Result<(), CubitError> {
        self.inner.emit(Phase::Loading)?;
        match items {
            Ok(items) => self
                .inner
                .emit(Phase::Loaded(items.into_iter().map(String::from).collect())),
            Err(reason) => self.inner.emit(Phase::Failed(reason.to_string())),
        }
    }
}

impl AsRef<Cubit<Phase>> for FeedCubit {
    fn as_ref(&self) -> &Cubit<Phase> {
        &self.inner
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[test]
fn counter_scenario() {
    let cubit = Cubit::new(0u32);
    let seen = Arc::new(RwLock::new(Vec::new()));
    let seen_c = seen.clone();
    cubit.subscribe(move |v| seen_c.write().unwrap().push(*v));

    cubit.emit(1).unwrap();
    cubit.emit(2).unwrap();

    assert_eq!(*seen.read().unwrap(), vec![1, 2]);
    assert_eq!(cubit.state(), 2);
}

#[test]
fn closed_scenario() {
    let cubit = Cubit::new("A");
    let seen = Arc::new(RwLock::new(Vec::new()));
    let seen_c = seen.clone();
    cubit.subscribe(move |v: &&str| seen_c.write().unwrap().push(*v));

    cubit.close();

    assert!(matches!(cubit.emit("B"), Err(CubitError::Closed)));
    assert_eq!(cubit.state(), "A");
    assert!(seen.read().unwrap().is_empty());
    cubit.close();
}

#[test]
fn application_cubit_with_logging_and_validation() {
    init_tracing();

    let audit = Arc::new(RwLock::new(Vec::<String>::new()));
    let audit_c = audit.clone();
    let validation = from_fn(move |t: &Transition<Phase>| {
        audit_c.write().unwrap().push(t.to_string());
        // Loaded is only reachable from Loading.
        if matches!(t.next(), Phase::Loaded(_)) && t.previous() != &Phase::Loading {
            return Err("loaded without loading".into());
        }
        Ok(())
    });
    let feed = FeedCubit::new(TracingHook::new("feed").then(validation));

    let phases = Arc::new(RwLock::new(Vec::new()));
    let phases_c = phases.clone();
    let sub = Listener::new(&feed.inner)
        .when(|prev: &Phase, next: &Phase| prev != next)
        .listen(move |p| phases_c.write().unwrap().push(p.clone()));

    feed.load(Ok(vec!["a", "b"])).unwrap();
    let err = feed
        .inner
        .emit(Phase::Loaded(vec![]))
        .unwrap_err();
    assert_eq!(err.to_string(), "transition rejected: loaded without loading");

    feed.load(Err("offline")).unwrap();
    sub.cancel();
    feed.inner.emit(Phase::Idle).unwrap();

    assert_eq!(
        *phases.read().unwrap(),
        vec![
            Phase::Loading,
            Phase::Loaded(vec!["a".into(), "b".into()]),
            Phase::Loading,
            Phase::Failed("offline".into()),
        ]
    );
    assert_eq!(audit.read().unwrap().len(), 6);
    assert_eq!(
        audit.read().unwrap()[0],
        "Transition { previous: Idle, next: Loading }"
    );
    assert_eq!(feed.inner.state(), Phase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_across_tasks() {
    let cubit = Arc::new(Cubit::new(0u64));
    let mut stream = cubit.stream();

    let producer = {
        let cubit = cubit.clone();
        tokio::spawn(async move {
            for i in 1..=100 {
                cubit.emit(i).unwrap();
                tokio::task::yield_now().await;
            }
            cubit.close();
        })
    };

    let mut received = Vec::new();
    while let Some(v) = stream.next().await {
        received.push(v);
    }
    producer.await.unwrap();

    assert_eq!(received, (1..=100).collect::<Vec<_>>());
    assert!(stream.is_terminated());
}

#[test]
fn late_subscriber_only_sees_later_values() {
    let cubit = Cubit::new(0u32);
    cubit.emit(1).unwrap();

    let seen = Arc::new(RwLock::new(Vec::new()));
    let seen_c = seen.clone();
    cubit.subscribe(move |v| seen_c.write().unwrap().push(*v));

    cubit.emit(2).unwrap();
    cubit.emit(3).unwrap();

    assert_eq!(*seen.read().unwrap(), vec![2, 3]);
}
