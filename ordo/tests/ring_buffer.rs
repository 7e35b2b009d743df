mod common;

use ordo::{Error, RingBuffer};
use std::sync::Arc;
use std::thread;

#[test]
fn test_zero_capacity_is_rejected() {
    assert!(matches!(
        RingBuffer::<u8>::with_capacity(0),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_overflow_keeps_the_newest_items() {
    let ring = RingBuffer::with_capacity(4).unwrap();

    for i in 0..4 {
        assert_eq!(ring.enqueue(i), None);
    }
    assert!(ring.is_full());
    assert_eq!(ring.enqueue(4), Some(0));

    assert_eq!(ring.snapshot(), vec![1, 2, 3, 4]);
    assert_eq!(ring.len(), 4);

    let drained: Vec<_> = std::iter::from_fn(|| ring.dequeue()).collect();
    assert_eq!(drained, vec![1, 2, 3, 4]);
    assert!(ring.is_empty());
    assert_eq!(ring.dequeue(), None);
}

#[test]
fn test_interleaved_use_wraps_around() {
    let ring = RingBuffer::with_capacity(3).unwrap();

    ring.enqueue('a');
    ring.enqueue('b');
    assert_eq!(ring.dequeue(), Some('a'));

    ring.enqueue('c');
    ring.enqueue('d');
    ring.enqueue('e');

    assert_eq!(ring.snapshot(), vec!['c', 'd', 'e']);
    assert_eq!(ring.drain(), vec!['c', 'd', 'e']);
    assert!(ring.is_empty());

    ring.enqueue('f');
    assert_eq!(ring.snapshot(), vec!['f']);
    assert_eq!(ring.capacity(), 3);
}

#[test]
fn test_many_producers_and_consumers() {
    common::init_tracing();
    let ring = Arc::new(RingBuffer::with_capacity(16).unwrap());

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut evicted = 0;
                for i in 0..1000 {
                    if ring.enqueue(p * 1000 + i).is_some() {
                        evicted += 1;
                    }
                }
                evicted
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let ring = ring.clone();
            thread::spawn(move || {
                let mut taken = 0;
                for _ in 0..1000 {
                    if ring.dequeue().is_some() {
                        taken += 1;
                    }
                }
                taken
            })
        })
        .collect();

    let evicted: usize = producers.into_iter().map(|h| h.join().unwrap()).sum();
    let taken: usize = consumers.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(evicted + taken + ring.len(), 4000);
    assert!(ring.len() <= 16);
}
