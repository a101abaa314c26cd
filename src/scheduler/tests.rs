use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Poll `cond` until it holds or `timeout` elapses.
fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

#[test]
fn test_burst_runs_last_action_once() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(100));
    let ran = Arc::new(Mutex::new(Vec::new()));

    for i in 0..10 {
        let ran = Arc::clone(&ran);
        scheduler
            .schedule("a.brew", move |_| ran.lock().push(i))
            .unwrap();
    }

    assert!(wait_for(Duration::from_secs(2), || !ran.lock().is_empty()));
    thread::sleep(Duration::from_millis(250));
    assert_eq!(*ran.lock(), vec![9]);
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn test_reschedule_resets_timer() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(400));
    let count = Arc::new(AtomicUsize::new(0));

    let c = Arc::clone(&count);
    scheduler
        .schedule(1u32, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    thread::sleep(Duration::from_millis(250));

    let c = Arc::clone(&count);
    scheduler
        .schedule(1u32, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    // Past the first deadline, before the second
    thread::sleep(Duration::from_millis(250));
    assert_eq!(count.load(Ordering::SeqCst), 0);

    assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) == 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_distinct_keys_each_run() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(50));
    let ran = Arc::new(Mutex::new(Vec::new()));

    for key in ["a", "b", "c"] {
        let ran = Arc::clone(&ran);
        scheduler
            .schedule(key.to_string(), move |k| ran.lock().push(k.clone()))
            .unwrap();
    }

    assert!(wait_for(Duration::from_secs(2), || ran.lock().len() == 3));
    let mut keys = ran.lock().clone();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_dispose_cancels_pending() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(100));
    let count = Arc::new(AtomicUsize::new(0));

    let c = Arc::clone(&count);
    scheduler
        .schedule("k", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.dispose();
    scheduler.dispose();
    assert!(scheduler.is_disposed());
    assert_eq!(scheduler.pending_count(), 0);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_schedule_after_dispose_fails() {
    let scheduler = DebouncedScheduler::<&str>::new(Duration::from_millis(10));
    scheduler.dispose();
    let err = scheduler.schedule("k", |_| {}).unwrap_err();
    assert!(err.is_disposed());
}

#[test]
fn test_same_key_never_overlaps() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(20));
    let busy = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let runs = Arc::new(AtomicUsize::new(0));

    let slow_action = |busy: Arc<AtomicBool>, overlapped: Arc<AtomicBool>, runs: Arc<AtomicUsize>| {
        move |_: &&str| {
            if busy.swap(true, Ordering::SeqCst) {
                overlapped.store(true, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(200));
            busy.store(false, Ordering::SeqCst);
            runs.fetch_add(1, Ordering::SeqCst);
        }
    };

    scheduler
        .schedule("k", slow_action(busy.clone(), overlapped.clone(), runs.clone()))
        .unwrap();
    assert!(wait_for(Duration::from_secs(2), || scheduler.is_running(&"k")));

    // Due while the first run is still in progress
    scheduler
        .schedule("k", slow_action(busy.clone(), overlapped.clone(), runs.clone()))
        .unwrap();

    assert!(wait_for(Duration::from_secs(3), || runs.load(Ordering::SeqCst) == 2));
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[test]
fn test_panicking_action_releases_key() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(20));
    scheduler.schedule("k", |_| panic!("boom")).unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    assert!(wait_for(Duration::from_secs(2), || {
        scheduler.pending_count() == 0 && !scheduler.is_running(&"k")
    }));

    let r = Arc::clone(&ran);
    scheduler
        .schedule("k", move |_| r.store(true, Ordering::SeqCst))
        .unwrap();
    assert!(wait_for(Duration::from_secs(2), || ran.load(Ordering::SeqCst)));
}

#[test]
fn test_drop_disposes() {
    let count = Arc::new(AtomicUsize::new(0));
    {
        let scheduler = DebouncedScheduler::new(Duration::from_millis(50));
        let c = Arc::clone(&count);
        scheduler
            .schedule("k", move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    thread::sleep(Duration::from_millis(200));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_schedule_same_key_runs_once() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(100));
    let count = Arc::new(AtomicUsize::new(0));

    thread::scope(|s| {
        for _ in 0..8 {
            let scheduler = &scheduler;
            let count = Arc::clone(&count);
            s.spawn(move || {
                for _ in 0..25 {
                    let count = Arc::clone(&count);
                    scheduler
                        .schedule("shared.brew", move |_| {
                            count.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                }
            });
        }
    });

    assert!(wait_for(Duration::from_secs(2), || count.load(Ordering::SeqCst) > 0));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn test_concurrent_schedule_mixed_keys_each_run_once() {
    let scheduler = DebouncedScheduler::new(Duration::from_millis(100));
    let ran = Arc::new(Mutex::new(Vec::new()));

    thread::scope(|s| {
        for t in 0..8usize {
            let scheduler = &scheduler;
            let ran = Arc::clone(&ran);
            s.spawn(move || {
                for i in 0..20usize {
                    // every thread hits all four keys, in a different order
                    let key = (t + i) % 4;
                    let ran = Arc::clone(&ran);
                    scheduler
                        .schedule(key, move |k| ran.lock().push(*k))
                        .unwrap();
                }
            });
        }
    });

    assert!(wait_for(Duration::from_secs(2), || ran.lock().len() >= 4));
    thread::sleep(Duration::from_millis(300));
    let mut keys = ran.lock().clone();
    keys.sort_unstable();
    assert_eq!(keys, vec![0, 1, 2, 3]);
    assert_eq!(scheduler.pending_count(), 0);
}
