mod common;

use ordo::{Error, RequestCorrelator, Status, Timer};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn correlator<V: Send + 'static>(default_timeout: Option<Duration>) -> RequestCorrelator<String, V> {
    RequestCorrelator::with_timer(Arc::new(Timer::new().unwrap()), default_timeout)
}

#[test]
fn test_duplicate_pending_id_is_rejected() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);

    let _first = correlator.register("r1".to_string()).unwrap();
    let second = correlator.register("r1".to_string());

    match second {
        Err(Error::DuplicateRequest(id)) => assert_eq!(id, "\"r1\""),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(correlator.len(), 1);
}

#[test]
fn test_id_can_be_reused_once_settled() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);

    let first = correlator.register("r1".to_string()).unwrap();
    assert!(correlator.complete(&"r1".to_string(), 1));

    let second = correlator.register("r1".to_string()).unwrap();
    assert!(correlator.complete(&"r1".to_string(), 2));

    assert_eq!(first.wait().unwrap(), 1);
    assert_eq!(second.wait().unwrap(), 2);
}

#[test]
fn test_request_times_out_without_reply() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);
    let id = "r1".to_string();

    let reply = correlator
        .register_with_timeout(id.clone(), Some(Duration::from_millis(50)))
        .unwrap();

    let error = reply.wait().unwrap_err();
    assert!(error.is_timeout());
    assert!(error.to_string().contains("\"r1\""));

    assert!(!correlator.complete(&id, 42));
    assert_eq!(reply.status(), Status::Failed);
    assert!(correlator.is_empty());
}

#[test]
fn test_reply_before_deadline_wins_over_timer() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);
    let id = "r1".to_string();

    let reply = correlator
        .register_with_timeout(id.clone(), Some(Duration::from_millis(50)))
        .unwrap();

    thread::sleep(Duration::from_millis(10));
    assert!(correlator.complete(&id, 42));

    thread::sleep(Duration::from_millis(80));
    assert_eq!(reply.wait().unwrap(), 42);
}

#[test]
fn test_stale_timer_leaves_new_registration_alone() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);
    let id = "r1".to_string();

    let _first = correlator
        .register_with_timeout(id.clone(), Some(Duration::from_millis(20)))
        .unwrap();
    assert!(correlator.cancel(&id));

    let second = correlator.register_with_timeout(id.clone(), None).unwrap();
    thread::sleep(Duration::from_millis(60));

    assert!(correlator.contains(&id));
    assert_eq!(second.status(), Status::Pending);
}

#[test]
fn test_default_timeout_applies_to_register() {
    common::init_tracing();
    let correlator = correlator::<()>(Some(Duration::from_millis(10)));

    let reply = correlator.register("r1".to_string()).unwrap();

    assert!(reply.wait().unwrap_err().is_timeout());
}

#[test]
fn test_fail_and_cancel_settle_the_request() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);

    let failed = correlator.register("a".to_string()).unwrap();
    let cancelled = correlator.register("b".to_string()).unwrap();

    assert!(correlator.fail(&"a".to_string(), Error::InvalidArgument("bad reply".to_string())));
    assert!(correlator.cancel(&"b".to_string()));
    assert!(!correlator.cancel(&"b".to_string()));

    assert!(matches!(failed.wait(), Err(Error::InvalidArgument(_))));
    assert_eq!(cancelled.status(), Status::Cancelled);
}

#[test]
fn test_cancel_all_cancels_every_pending_request() {
    common::init_tracing();
    let correlator = correlator::<u32>(Some(Duration::from_secs(60)));

    let replies: Vec<_> = (0..25)
        .map(|i| correlator.register(format!("r{i}")).unwrap())
        .collect();

    let mut pending = correlator.pending();
    pending.sort();
    assert_eq!(pending.len(), 25);

    assert_eq!(correlator.cancel_all(), 25);
    assert!(correlator.is_empty());
    assert_eq!(correlator.cancel_all(), 0);

    for reply in &replies {
        assert_eq!(reply.status(), Status::Cancelled);
    }
}

#[test]
fn test_completion_racing_expiry_has_a_single_winner() {
    common::init_tracing();
    let correlator = Arc::new(correlator::<usize>(None));

    for round in 0..200 {
        let id = format!("race-{round}");
        let reply = correlator
            .register_with_timeout(id.clone(), Some(Duration::from_millis(1)))
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let completer = {
            let correlator = correlator.clone();
            let barrier = barrier.clone();
            let id = id.clone();

            thread::spawn(move || {
                barrier.wait();
                thread::sleep(Duration::from_micros(round as u64 % 1500));
                correlator.complete(&id, round)
            })
        };

        barrier.wait();
        let completed = completer.join().unwrap();

        match reply.wait() {
            Ok(value) => {
                assert!(completed, "round {round}: value without a winning completion");
                assert_eq!(value, round);
            }
            Err(error) => {
                assert!(!completed, "round {round}: completion won but promise failed");
                assert!(error.is_timeout());
            }
        }

        assert!(!correlator.contains(&id));
    }
}

#[test]
fn test_dropping_the_correlator_cancels_pending_requests() {
    common::init_tracing();
    let correlator = correlator::<u32>(Some(Duration::from_secs(60)));

    let reply = correlator.register("r1".to_string()).unwrap();
    drop(correlator);

    assert!(reply.wait().unwrap_err().is_cancelled());
}

#[test]
fn test_out_of_range_timeout_never_expires() {
    common::init_tracing();
    let timer = Arc::new(Timer::new().unwrap());
    let correlator = RequestCorrelator::<String, u32>::with_timer(timer.clone(), None);
    let id = "r1".to_string();

    let reply = correlator
        .register_with_timeout(id.clone(), Some(Duration::MAX))
        .unwrap();

    assert_eq!(timer.pending(), 0);
    assert_eq!(reply.status(), Status::Pending);

    assert!(correlator.complete(&id, 7));
    assert_eq!(reply.wait().unwrap(), 7);
}

#[test]
fn test_zero_timeout_expires_every_registration() {
    common::init_tracing();
    let correlator = correlator::<u32>(None);

    for round in 0..100 {
        let id = format!("r{round}");
        let reply = correlator
            .register_with_timeout(id.clone(), Some(Duration::ZERO))
            .unwrap();

        assert!(reply.wait().unwrap_err().is_timeout(), "round {round}");
        assert!(common::eventually(|| !correlator.contains(&id)));
    }

    assert!(correlator.is_empty());
}

#[test]
fn test_complete_fail_and_cancel_race_to_a_single_winner() {
    common::init_tracing();
    let correlator = Arc::new(correlator::<usize>(None));

    for round in 0..200 {
        let id = format!("race-{round}");
        let reply = correlator
            .register_with_timeout(id.clone(), Some(Duration::from_secs(60)))
            .unwrap();

        let barrier = Arc::new(Barrier::new(3));
        let racers: Vec<_> = (0..3)
            .map(|action| {
                let correlator = correlator.clone();
                let barrier = barrier.clone();
                let id = id.clone();

                thread::spawn(move || {
                    barrier.wait();
                    match action {
                        0 => correlator.complete(&id, round),
                        1 => correlator.fail(&id, Error::InvalidArgument(format!("round {round}"))),
                        _ => correlator.cancel(&id),
                    }
                })
            })
            .collect();

        let won: Vec<bool> = racers.into_iter().map(|racer| racer.join().unwrap()).collect();
        assert_eq!(won.iter().filter(|won| **won).count(), 1, "round {round}: {won:?}");

        let expected = match won.iter().position(|won| *won) {
            Some(0) => Status::Succeeded,
            Some(1) => Status::Failed,
            _ => Status::Cancelled,
        };
        assert_eq!(reply.status(), expected, "round {round}");
        assert!(!correlator.contains(&id));
    }
}
