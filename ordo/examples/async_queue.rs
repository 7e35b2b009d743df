//! Example: serializing writes through an AsyncQueue

use ordo::{AsyncQueue, CancellationToken, Error};
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let queue = AsyncQueue::new();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let mut receipts = Vec::new();
    for line in ["open", "write", "flush", "close"] {
        let journal = journal.clone();
        receipts.push(queue.enqueue(move |_| {
            let mut journal = journal.lock().unwrap();
            journal.push(line);
            journal.len()
        })?);
    }

    // A unit can be cancelled on its own without breaking the chain
    let token = CancellationToken::new();
    let skipped = queue.enqueue_with(&token, None, |_| Ok::<_, Error>("never written"))?;
    token.cancel();

    for receipt in &receipts {
        println!("entry #{}", receipt.wait()?);
    }
    println!("skipped unit: {:?}", skipped.wait().err());
    println!("journal: {:?}", journal.lock().unwrap());

    queue.dispose();
    Ok(())
}
