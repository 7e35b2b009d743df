mod common;

use ordo::promise;
use ordo::{Error, Promise, Status};
use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};
use std::time::Duration;

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);
    let mut future = pin!(future);

    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => thread::park(),
        }
    }
}

#[test]
fn test_first_settlement_wins() {
    let (resolver, promise) = promise::pair();

    assert_eq!(promise.status(), Status::Pending);
    assert!(resolver.succeed(1));
    assert!(!resolver.fail(Error::Cancelled));
    assert!(!resolver.cancel());

    assert_eq!(promise.status(), Status::Succeeded);
    assert_eq!(promise.try_result().unwrap().unwrap(), 1);
}

#[test]
fn test_dropping_the_resolver_cancels() {
    let (resolver, promise) = promise::pair::<u8>();
    drop(resolver);

    assert_eq!(promise.status(), Status::Cancelled);
    assert!(promise.wait().unwrap_err().is_cancelled());
}

#[test]
fn test_failing_with_cancelled_is_a_cancellation() {
    let (resolver, promise) = promise::pair::<u8>();
    resolver.fail(Error::Cancelled);

    assert_eq!(promise.status(), Status::Cancelled);
}

#[test]
fn test_wait_blocks_until_settled_from_another_thread() {
    let (resolver, promise) = promise::pair();

    let settler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        resolver.succeed("done")
    });

    assert_eq!(promise.wait().unwrap(), "done");
    assert!(settler.join().unwrap());
}

#[test]
fn test_wait_timeout_leaves_promise_pending() {
    let (resolver, promise) = promise::pair::<u8>();

    let error = promise.wait_timeout(Duration::from_millis(10)).unwrap_err();
    assert!(error.is_timeout());
    assert_eq!(promise.status(), Status::Pending);

    resolver.succeed(3);
    assert_eq!(promise.wait_timeout(Duration::from_millis(10)).unwrap(), 3);
}

#[test]
fn test_wait_timeout_beyond_instant_range_waits_for_settlement() {
    let (resolver, promise) = promise::pair();

    let settler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        resolver.succeed(5)
    });

    assert_eq!(promise.wait_timeout(Duration::MAX).unwrap(), 5);
    assert!(settler.join().unwrap());
}

#[test]
fn test_continuations_run_once_with_terminal_status() {
    let (resolver, promise) = promise::pair::<u8>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    promise.on_settled(move |status| log.lock().unwrap().push(status));

    resolver.fail(Error::InvalidArgument("nope".to_string()));

    let log = seen.clone();
    promise.on_settled(move |status| log.lock().unwrap().push(status));

    assert_eq!(*seen.lock().unwrap(), vec![Status::Failed, Status::Failed]);
}

#[test]
fn test_every_clone_observes_the_outcome() {
    let (resolver, promise) = promise::pair();
    let clones: Vec<Promise<i32>> = (0..4).map(|_| promise.clone()).collect();
    let observed = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = clones
        .into_iter()
        .map(|clone| {
            let observed = observed.clone();
            thread::spawn(move || {
                assert_eq!(clone.wait().unwrap(), 9);
                observed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    resolver.succeed(9);

    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(observed.load(Ordering::SeqCst), 4);
}

#[test]
fn test_promise_can_be_awaited() {
    let (resolver, promise) = promise::pair();

    let settler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        resolver.succeed(String::from("awaited"));
    });

    assert_eq!(block_on(promise).unwrap(), "awaited");
    settler.join().unwrap();
}

#[test]
fn test_ready_failed_and_cancelled_constructors() {
    assert_eq!(Promise::ready(1).wait().unwrap(), 1);
    assert_eq!(Promise::<u8>::failed(Error::Panicked("x".into())).status(), Status::Failed);
    assert_eq!(Promise::<u8>::cancelled().status(), Status::Cancelled);
    assert!(Promise::<u8>::cancelled().is_settled());
}
