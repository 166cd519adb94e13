//! End-to-end dispatch properties of the multicast event list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use diversions::{
    DispatchStrategy, DiversionEvent, HandlerFailure, HandlerFn, StrategyKey, StrategyRegistry,
};

fn wait_for<F: Fn() -> bool>(cond: F) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not met within bounded wait"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn direct_handlers_run_on_the_invoking_thread() {
    let registry = Arc::new(StrategyRegistry::new());
    let event: DiversionEvent<u32> = DiversionEvent::new(registry);

    let observed: Arc<Mutex<Vec<ThreadId>>> = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..3 {
        let observed = Arc::clone(&observed);
        event
            .add_fn(move |_| observed.lock().unwrap().push(thread::current().id()))
            .unwrap();
    }

    event.invoke(&1);
    let first_pass = observed.lock().unwrap().clone();
    assert_eq!(first_pass, vec![thread::current().id(); 3]);

    // And from a different thread, they follow that thread.
    let event = Arc::new(event);
    let remote = Arc::clone(&event);
    let remote_id = thread::spawn(move || {
        remote.invoke(&2);
        thread::current().id()
    })
    .join()
    .unwrap();
    let observed = observed.lock().unwrap();
    assert_eq!(observed[3..], vec![remote_id; 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_handler_neither_blocks_nor_leaks_panics() {
    let failures = Arc::new(Mutex::new(Vec::<HandlerFailure>::new()));
    let sink = Arc::clone(&failures);
    let registry = Arc::new(
        StrategyRegistry::new().with_failure_sink(move |f| sink.lock().unwrap().push(f)),
    );
    let event: DiversionEvent<(String, u32)> = DiversionEvent::new(registry);

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    event
        .add_fn_with_strategy(
            move |(sender, n)| {
                assert_eq!((sender.as_str(), *n), ("model", 1));
                started_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
                seen.fetch_add(1, Ordering::SeqCst);
            },
            StrategyKey::BackgroundTask,
        )
        .unwrap();
    event
        .add_fn_with_strategy(|_| panic!("diverted boom"), StrategyKey::BackgroundTask)
        .unwrap();

    // invoke returns while the first handler is still parked.
    event.invoke(&("model".to_string(), 1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    release_tx.send(()).unwrap();

    wait_for(|| calls.load(Ordering::SeqCst) == 1);
    // The panic stayed inside the thunk and reached the sink instead.
    wait_for(|| !failures.lock().unwrap().is_empty());
    let failure = failures.lock().unwrap().remove(0);
    assert_eq!(failure.strategy, StrategyKey::BackgroundTask);
    assert!(failure.detail.contains("diverted boom"));
}

#[test]
fn remove_makes_the_handler_unreachable() {
    let registry = Arc::new(StrategyRegistry::new());
    let event: DiversionEvent<u32> = DiversionEvent::new(registry);

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let handler: HandlerFn<u32> = Arc::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let len_before = event.len();
    event.add(Arc::clone(&handler)).unwrap();
    event.invoke(&1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(event.remove(&handler).is_some());
    assert_eq!(event.len(), len_before);
    event.invoke(&2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn default_strategy_change_applies_to_later_adds_only() {
    let registry = Arc::new(StrategyRegistry::new());
    let captured: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let relayed = Arc::clone(&captured);
    registry
        .register(
            StrategyKey::from("tagged"),
            DispatchStrategy::scheduler(move |thunk| {
                relayed.lock().unwrap().push("relayed");
                thunk();
            }),
        )
        .unwrap();
    let event: DiversionEvent<u32> = DiversionEvent::new(Arc::clone(&registry));

    let early = event.add_fn(|_| {}).unwrap();
    registry.set_default(StrategyKey::from("tagged")).unwrap();
    let late = event.add_fn(|_| {}).unwrap();

    assert_eq!(early.key(), &StrategyKey::CurrentThread);
    assert_eq!(late.key(), &StrategyKey::from("tagged"));

    event.invoke(&1);
    assert_eq!(*captured.lock().unwrap(), vec!["relayed"]);
}

#[tokio::test]
async fn invoke_async_yields_then_completes_full_fanout() {
    let registry = Arc::new(StrategyRegistry::new());
    let event: DiversionEvent<u32> = DiversionEvent::new(registry);

    let calls = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        let seen = Arc::clone(&calls);
        event
            .add_fn(move |arg| {
                assert_eq!(*arg, 7);
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    event.invoke_async(7).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invoke_parallel_reaches_every_handler_exactly_once() {
    let registry = Arc::new(StrategyRegistry::new());
    let event: DiversionEvent<u32> = DiversionEvent::new(registry);

    let calls = Arc::new(AtomicUsize::new(0));
    for _ in 0..16 {
        let seen = Arc::clone(&calls);
        event
            .add_fn(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    event.invoke_parallel(0).await;
    assert_eq!(calls.load(Ordering::SeqCst), 16);
}

#[test]
fn user_scheduler_strategy_receives_the_thunk() {
    let registry = Arc::new(StrategyRegistry::new());
    let scheduled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&scheduled);
    registry
        .register(
            StrategyKey::from("inline-scheduler"),
            DispatchStrategy::scheduler(move |thunk| {
                counter.fetch_add(1, Ordering::SeqCst);
                thunk();
            }),
        )
        .unwrap();
    let event: DiversionEvent<u32> = DiversionEvent::new(registry);

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    event
        .add_fn_with_strategy(
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
            StrategyKey::from("inline-scheduler"),
        )
        .unwrap();

    event.invoke(&1);
    event.invoke(&2);
    assert_eq!(scheduled.load(Ordering::SeqCst), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
