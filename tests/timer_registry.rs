//! Integration tests for timers on the tokio scheduler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_test::{assert_err, assert_ok};

use remote_robot::error::TimerError;
use remote_robot::timer::{TimerId, TimerRegistry, TokioScheduler};

fn registry_with_log() -> (Arc<Mutex<Vec<TimerId>>>, TimerRegistry) {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fired);
    let scheduler = TokioScheduler::new(Handle::current(), move |id| log.lock().push(id));
    (fired, TimerRegistry::new(Arc::new(scheduler)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_shot_timer_fires_once_and_expires() {
    let (fired, registry) = registry_with_log();

    let id = assert_ok!(registry.add(0.1, 0, 0.1));
    assert!(assert_ok!(registry.is_running(id)));

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(*fired.lock(), vec![id]);
    assert!(!assert_ok!(registry.is_running(id)));
    assert!(!assert_ok!(registry.is_executing(id)));
    // expired timers stay tracked until removed
    assert_eq!(registry.tracked_ids(), vec![id]);
    assert_ok!(registry.remove(id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeating_timer_fires_repeat_count_plus_one_times() {
    let (fired, registry) = registry_with_log();

    let id = assert_ok!(registry.add(0.1, 2, 0.1));
    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(*fired.lock(), vec![id, id, id]);
    assert!(!assert_ok!(registry.is_running(id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_stops_infinite_timer() {
    let (fired, registry) = registry_with_log();

    let id = assert_ok!(registry.add(0.1, -1, 0.1));
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_ok!(registry.remove(id));
    // a fire already in progress may still complete
    tokio::time::sleep(Duration::from_millis(50)).await;

    let count = fired.lock().len();
    assert!(count >= 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fired.lock().len(), count);
    assert_eq!(assert_err!(registry.remove(id)), TimerError::UnknownTimer(id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_is_executing_during_callback() {
    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let release_rx = Mutex::new(release_rx);

    let scheduler = TokioScheduler::new(Handle::current(), move |id| {
        let _ = started_tx.lock().send(id);
        let _ = release_rx.lock().recv_timeout(Duration::from_secs(2));
    });
    let registry = Arc::new(TimerRegistry::new(Arc::new(scheduler)));

    let id = assert_ok!(registry.add(0.1, 0, 0.1));
    let started =
        tokio::task::spawn_blocking(move || started_rx.recv_timeout(Duration::from_secs(2)))
            .await
            .unwrap();
    assert_eq!(started, Ok(id));

    assert!(assert_ok!(registry.is_executing(id)));
    assert!(assert_ok!(registry.is_running(id)));

    release_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!assert_ok!(registry.is_executing(id)));
}

#[tokio::test]
async fn test_remove_all_cancels_every_timer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let scheduler = TokioScheduler::new(Handle::current(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let registry = TimerRegistry::new(Arc::new(scheduler));

    let ids: Vec<_> = (0..5)
        .map(|_| registry.add(0.2, -1, 0.1).unwrap())
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    registry.remove_all();
    assert!(registry.is_empty());
    for id in &ids {
        assert!(!assert_ok!(registry.is_running(*id)));
    }

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ids_unique_across_registries() {
    let (_fired_a, first) = registry_with_log();
    let (_fired_b, second) = registry_with_log();

    let a = assert_ok!(first.add(5.0, 0, 1.0));
    let b = assert_ok!(second.add(5.0, 0, 1.0));
    assert_ne!(a, b);

    // an ID from another registry is unknown here
    assert_eq!(assert_err!(first.remove(b)), TimerError::UnknownTimer(b));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_shot_with_zero_interval_fires_once() {
    let (fired, registry) = registry_with_log();

    let id = assert_ok!(registry.add(0.1, 0, 0.0));
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(*fired.lock(), vec![id]);
    assert!(!assert_ok!(registry.is_running(id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeat_count_below_minus_one_repeats_until_removed() {
    let (fired, registry) = registry_with_log();

    let id = assert_ok!(registry.add(0.1, -2, 0.1));
    tokio::time::sleep(Duration::from_millis(550)).await;

    assert!(assert_ok!(registry.is_running(id)));
    assert!(fired.lock().len() >= 3);
    assert_ok!(registry.remove(id));
}
