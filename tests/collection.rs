//! End-to-end properties of the affinity-propagating collection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use diversions::{
    AffinityContext, DispatchStrategy, DivertingCollection, StrategyKey, StrategyRegistry,
    StructureChanged,
};

/// Registry with a `"ui"` affinity strategy backed by a detached pump
/// thread; returns the context for assertions.
fn ui_registry() -> (Arc<StrategyRegistry>, AffinityContext, ThreadId) {
    let (ctx, pump) = AffinityContext::new();
    let (id_tx, id_rx) = mpsc::channel();
    thread::spawn(move || {
        id_tx.send(thread::current().id()).unwrap();
        pump.run();
    });
    let pump_id = id_rx.recv().unwrap();

    let registry = Arc::new(StrategyRegistry::new());
    registry
        .register(StrategyKey::from("ui"), DispatchStrategy::affinity(ctx.clone()))
        .unwrap();
    (registry, ctx, pump_id)
}

#[test]
fn mutation_from_foreign_thread_lands_on_the_affinity_thread() {
    let (registry, _ctx, pump_id) = ui_registry();
    let col: DivertingCollection<u32> = DivertingCollection::new(registry);

    let notified: Arc<Mutex<Vec<(ThreadId, StructureChanged<u32>)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&notified);
    col.on_structure_changed_with(
        Arc::new(move |change: &StructureChanged<u32>| {
            seen.lock().unwrap().push((thread::current().id(), change.clone()));
        }),
        StrategyKey::from("ui"),
    )
    .unwrap();

    // The observer's descriptor carried the context; the collection
    // captured it for mutation relays.
    assert!(col.affinity().is_some());

    // push blocks until the pump has performed the mutation *and* raised
    // the notification, so the result is immediately visible here.
    col.push(42).unwrap();
    assert_eq!(col.snapshot(), vec![42]);

    let notified = notified.lock().unwrap();
    assert_eq!(notified.len(), 1);
    let (ran_on, ref change) = notified[0];
    assert_eq!(ran_on, pump_id, "notification must fire on the pump thread");
    assert_eq!(change, &StructureChanged::Inserted { index: 0, item: 42 });
}

#[test]
fn mutation_completes_before_notification_starts() {
    let (registry, _ctx, _pump_id) = ui_registry();
    let col: DivertingCollection<u32> = DivertingCollection::new(registry);

    // The observer checks the post-condition of the mutation it describes:
    // by the time the notification starts, the item must be in place.
    let checked: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&checked);
    let reader = col.clone();
    col.on_structure_changed_with(
        Arc::new(move |change: &StructureChanged<u32>| {
            if let StructureChanged::Inserted { index, item } = change {
                seen.lock().unwrap().push(reader.get(*index) == Some(*item));
            }
        }),
        StrategyKey::from("ui"),
    )
    .unwrap();

    let col2 = col.clone();
    thread::spawn(move || {
        for n in 0..50 {
            col2.push(n).unwrap();
        }
    })
    .join()
    .unwrap();

    let checked = checked.lock().unwrap();
    assert_eq!(checked.len(), 50);
    assert!(
        checked.iter().all(|ok| *ok),
        "every notification must observe its own mutation as applied"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn observers_with_different_strategies_each_get_their_own_context() {
    let (registry, _ctx, pump_id) = ui_registry();
    let col: DivertingCollection<u32> = DivertingCollection::new(Arc::clone(&registry));

    // Observer 1: wants the raw mutation thread (the pump, once the
    // affinity context is captured).
    let direct_thread: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
    let direct_seen = Arc::clone(&direct_thread);
    col.on_structure_changed_with(
        Arc::new(move |_: &StructureChanged<u32>| {
            *direct_seen.lock().unwrap() = Some(thread::current().id());
        }),
        StrategyKey::from("ui"),
    )
    .unwrap();

    // Observer 2: wants a background task.
    let background_thread: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
    let background_seen = Arc::clone(&background_thread);
    let background_calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&background_calls);
    col.on_structure_changed_with(
        Arc::new(move |_: &StructureChanged<u32>| {
            *background_seen.lock().unwrap() = Some(thread::current().id());
            counted.fetch_add(1, Ordering::SeqCst);
        }),
        StrategyKey::BackgroundTask,
    )
    .unwrap();

    // One mutation, issued off the pump thread.
    let col2 = col.clone();
    tokio::task::spawn_blocking(move || col2.push(7).unwrap())
        .await
        .unwrap();

    // Affinity observer ran inline with the relayed mutation.
    assert_eq!(*direct_thread.lock().unwrap(), Some(pump_id));

    // Background observer got exactly one notification, elsewhere.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while background_calls.load(Ordering::SeqCst) == 0 {
        assert!(std::time::Instant::now() < deadline, "background observer never ran");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(background_calls.load(Ordering::SeqCst), 1);
    let bg = background_thread.lock().unwrap().expect("recorded");
    assert_ne!(bg, pump_id);
}

#[test]
fn no_affinity_means_caller_thread_mutations() {
    let registry = Arc::new(StrategyRegistry::new());
    let col: DivertingCollection<u32> = DivertingCollection::new(registry);

    let notify_thread: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&notify_thread);
    col.on_structure_changed(Arc::new(move |_: &StructureChanged<u32>| {
        *seen.lock().unwrap() = Some(thread::current().id());
    }))
    .unwrap();

    col.push(1).unwrap();
    assert_eq!(*notify_thread.lock().unwrap(), Some(thread::current().id()));
}

#[test]
fn replace_keeps_shape_and_reports_both_values() {
    let registry = Arc::new(StrategyRegistry::new());
    let col: DivertingCollection<String> = DivertingCollection::new(registry);
    col.push("before".to_string()).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);
    col.on_element_changed(Arc::new(move |change: &diversions::ElementChanged<String>| {
        seen.lock().unwrap().push(change.clone());
    }))
    .unwrap();

    let old = col.replace(0, "after".to_string()).unwrap();
    assert_eq!(old, "before");
    assert_eq!(col.len(), 1);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].old, "before");
    assert_eq!(log[0].new, "after");
}
