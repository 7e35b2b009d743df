//! Example: fanning work out over a bounded scheduler

use ordo::{BoundedWorkerScheduler, Error, SchedulerExt};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // At most 3 units run at the same time on the global pool
    let scheduler = BoundedWorkerScheduler::new(3)?;

    let parts: Vec<_> = (1..=6u64)
        .map(|part| {
            scheduler.spawn(move |ctx| {
                thread::sleep(Duration::from_millis(50));
                println!("part {part} done on worker {}", ctx.worker());
                Ok::<_, Error>(part * part)
            })
        })
        .collect();

    // A unit waiting on a queued sibling runs it itself instead of idling
    let summary = scheduler.spawn(move |ctx| {
        let mut total = 0;
        for part in &parts {
            total += ctx.wait(part)?;
        }
        Ok::<_, Error>(total)
    });

    println!("sum of squares: {}", summary.wait()?);
    Ok(())
}
