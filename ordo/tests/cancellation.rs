use ordo::{CancellationToken, Error};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_cancel_runs_callbacks_exactly_once() {
    let token = CancellationToken::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let _registration = token.on_cancel(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    token.cancel();
    token.cancel();

    assert!(token.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_registering_on_a_cancelled_token_runs_immediately() {
    let token = CancellationToken::new();
    token.cancel();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registration = token.on_cancel(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(registration.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_clones_share_state() {
    let token = CancellationToken::new();
    let clone = token.clone();

    clone.cancel();

    assert!(token.is_cancelled());
    assert!(matches!(token.error_if_cancelled(), Err(Error::Cancelled)));
}

#[test]
fn test_none_token_is_never_cancelled() {
    let token = CancellationToken::none();

    token.cancel();

    assert!(!token.is_cancelled());
    assert!(!token.can_be_cancelled());
    assert!(token.error_if_cancelled().is_ok());
    assert!(!CancellationToken::default().can_be_cancelled());
}

#[test]
fn test_linked_token_follows_any_parent() {
    let lifetime = CancellationToken::new();
    let request = CancellationToken::new();

    let linked = CancellationToken::linked(&[&lifetime, &request]);
    assert!(!linked.is_cancelled());

    request.cancel();
    assert!(linked.is_cancelled());
    assert!(!lifetime.is_cancelled());

    let other = CancellationToken::linked(&[&lifetime, &CancellationToken::none()]);
    lifetime.cancel();
    assert!(other.is_cancelled());
}

#[test]
fn test_child_cancellation_does_not_reach_parent() {
    let parent = CancellationToken::new();
    let child = parent.child_token();

    child.cancel();

    assert!(child.is_cancelled());
    assert!(!parent.is_cancelled());
}

#[test]
fn test_linking_to_a_cancelled_parent_starts_cancelled() {
    let parent = CancellationToken::new();
    parent.cancel();

    assert!(parent.child_token().is_cancelled());
}
