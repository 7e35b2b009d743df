//! Example: matching out-of-band replies to requests

use ordo::{Error, RequestCorrelator};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let correlator = Arc::new(RequestCorrelator::<u64, String>::new(Some(
        Duration::from_millis(200),
    )));

    let answered = correlator.register(1)?;
    let forgotten = correlator.register(2)?;

    // Replies arrive on another thread, e.g. a socket reader
    let replies = correlator.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        replies.complete(&1, "pong".to_string());
    });

    println!("request 1: {:?}", answered.wait());
    println!("request 2: {:?}", forgotten.wait());

    Ok(())
}
