use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fnmemo::{MemoBuilder, Strategy};
use serial_test::serial;

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Generous slack past max_age: one tick interval plus scheduling noise.
const SLACK: Duration = Duration::from_millis(120);

#[test]
#[serial]
fn test_entry_expires_on_flat_path() {
    let calls = counter();
    let c = calls.clone();
    let f = MemoBuilder::new()
        .max_age(Duration::from_millis(80))
        .build(move |&(n,): &(i32,)| {
            c.fetch_add(1, Ordering::SeqCst);
            n * 2
        })
        .unwrap();

    assert_eq!(f.call((1,)), 2);
    // Present immediately after the write.
    thread::sleep(Duration::from_millis(20));
    assert_eq!(f.call((1,)), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    thread::sleep(Duration::from_millis(80) + SLACK);
    // The scheduler deleted the entry without any further call.
    assert!(f.is_empty());
    assert_eq!(f.call((1,)), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn test_entry_expires_on_matched_path() {
    let calls = counter();
    let c = calls.clone();
    let f = MemoBuilder::new()
        .max_age(Duration::from_millis(80))
        .vargs()
        .build(move |&(a, b): &(i32, i32)| {
            c.fetch_add(1, Ordering::SeqCst);
            a + b
        })
        .unwrap();

    assert_eq!(f.strategy(), Strategy::Matched);
    assert_eq!(f.call((1, 2)), 3);
    assert_eq!(f.call((1, 2)), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    thread::sleep(Duration::from_millis(80) + SLACK);
    assert_eq!(f.keys(), Some(vec![]));
    assert_eq!(f.call((1, 2)), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Expiry counts from the write, not the last read: continuous hits do not
/// keep an entry alive.
#[test]
#[serial]
fn test_hits_do_not_extend_lifetime() {
    let calls = counter();
    let c = calls.clone();
    let f = MemoBuilder::new()
        .max_age(Duration::from_millis(100))
        .build(move |&(n,): &(i32,)| {
            c.fetch_add(1, Ordering::SeqCst);
            n
        })
        .unwrap();

    f.call((7,));
    for _ in 0..4 {
        thread::sleep(Duration::from_millis(15));
        assert_eq!(f.call((7,)), 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    thread::sleep(Duration::from_millis(100) + SLACK);
    f.call((7,));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// A stale value is never served in the gap between expiry and the
/// scheduler's deleting tick.
#[test]
#[serial]
fn test_expired_entry_not_served_before_tick() {
    let calls = counter();
    let c = calls.clone();
    let f = MemoBuilder::new()
        .max_age(Duration::from_millis(30))
        .build(move |&(n,): &(i32,)| {
            c.fetch_add(1, Ordering::SeqCst);
            n
        })
        .unwrap();

    f.call((1,));
    // Just past max_age; the background deletion may not have run yet, but
    // the lookup must already treat the entry as gone.
    thread::sleep(Duration::from_millis(35));
    f.call((1,));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
#[serial]
fn test_clear_with_expiration_configured() {
    let calls = counter();
    let c = calls.clone();
    let f = MemoBuilder::new()
        .max_age(Duration::from_millis(200))
        .build(move |&(n,): &(i32,)| {
            c.fetch_add(1, Ordering::SeqCst);
            n
        })
        .unwrap();

    f.call((1,));
    f.call((2,));
    f.clear();
    assert!(f.is_empty());

    // Repopulated entries live their own full max_age.
    f.call((1,));
    thread::sleep(Duration::from_millis(60));
    assert_eq!(f.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Entries without max_age never expire and never start the scheduler's
/// bookkeeping for this memoizer.
#[test]
#[serial]
fn test_no_max_age_never_expires() {
    let calls = counter();
    let c = calls.clone();
    let f = MemoBuilder::new()
        .build(move |&(n,): &(i32,)| {
            c.fetch_add(1, Ordering::SeqCst);
            n
        })
        .unwrap();

    f.call((1,));
    thread::sleep(Duration::from_millis(150));
    assert_eq!(f.call((1,)), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
