mod common;

use ordo::{Error, SpscRing};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[test]
fn test_capacity_must_be_a_power_of_two() {
    for capacity in [0, 3, 6, 100] {
        assert!(matches!(
            SpscRing::<u8>::with_capacity(capacity),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    for capacity in [1, 2, 64] {
        let (tx, rx) = SpscRing::<u8>::with_capacity(capacity).unwrap().split();
        assert_eq!(tx.capacity(), capacity);
        assert_eq!(rx.capacity(), capacity);
    }
}

#[test]
fn test_producer_evicts_oldest_when_full() {
    let (mut tx, mut rx) = SpscRing::with_capacity(4).unwrap().split();

    for i in 0..4 {
        assert_eq!(tx.push(i), None);
    }
    assert_eq!(tx.push(4), Some(0));
    assert_eq!(tx.push(5), Some(1));

    assert_eq!(tx.dropped(), 2);
    assert_eq!(rx.len(), 4);

    let items: Vec<_> = rx.by_ref().collect();
    assert_eq!(items, vec![2, 3, 4, 5]);
    assert!(rx.is_empty());
    assert_eq!(rx.pop(), None);
}

#[test]
fn test_both_endpoints_report_full() {
    let (mut tx, mut rx) = SpscRing::with_capacity(2).unwrap().split();

    assert!(!tx.is_full());
    tx.push(1);
    assert!(!rx.is_full());
    tx.push(2);
    assert!(tx.is_full());
    assert!(rx.is_full());

    assert_eq!(tx.push(3), Some(1));
    assert!(tx.is_full());

    assert_eq!(rx.pop(), Some(2));
    assert!(!rx.is_full());
    assert!(!tx.is_full());
}

#[test]
fn test_capacity_one_always_holds_the_latest() {
    let (mut tx, mut rx) = SpscRing::with_capacity(1).unwrap().split();

    tx.push("a");
    tx.push("b");
    assert_eq!(rx.pop(), Some("b"));
    assert_eq!(rx.pop(), None);

    tx.push("c");
    assert_eq!(rx.pop(), Some("c"));
    assert_eq!(rx.dropped(), 1);
}

#[test]
fn test_concurrent_use_preserves_fifo_order() {
    common::init_tracing();
    const ITEMS: u64 = 200_000;

    let (mut tx, mut rx) = SpscRing::with_capacity(64).unwrap().split();
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..ITEMS {
                tx.push(i);
            }
            done.store(true, Ordering::Release);
            tx.dropped()
        })
    };

    let mut received = Vec::new();
    loop {
        match rx.pop() {
            Some(item) => received.push(item),
            None if done.load(Ordering::Acquire) => {
                received.extend(rx.by_ref());
                break;
            }
            None => thread::yield_now(),
        }
    }

    let dropped = producer.join().unwrap();

    assert!(received.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(received.len() as u64 + dropped as u64, ITEMS);
    assert_eq!(received.last(), Some(&(ITEMS - 1)));
}

#[test]
fn test_unread_items_are_dropped_with_the_ring() {
    let marker = Arc::new(());

    let (mut tx, mut rx) = SpscRing::with_capacity(4).unwrap().split();
    for _ in 0..6 {
        tx.push(marker.clone());
    }
    drop(rx.pop());

    assert_eq!(Arc::strong_count(&marker), 4);

    drop(tx);
    drop(rx);

    assert_eq!(Arc::strong_count(&marker), 1);
}
