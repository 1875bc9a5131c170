//! A fixed-size worker pool pulling top-level artifacts off a bounded
//! channel, running `workers` threads of execution concurrently.

use crossbeam_channel::bounded;

/// Run `handler` over every item produced by `jobs` using `workers` threads.
/// The inbound channel is closed once every job has been sent; each worker
/// drains it and exits. Blocks until every worker has exited.
pub fn run<T, F>(workers: usize, jobs: impl IntoIterator<Item = T>, handler: F)
where
    T: Send,
    F: Fn(T) + Send + Sync,
{
    let workers = workers.max(1);
    let (tx, rx) = bounded::<T>(workers * 4);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let handler = &handler;
            scope.spawn(move || {
                while let Ok(job) = rx.recv() {
                    handler(job);
                }
            });
        }

        for job in jobs {
            // The channel only disconnects once every worker has exited,
            // which only happens after `tx` is dropped below; a send
            // failure here is therefore unreachable in practice.
            let _ = tx.send(job);
        }
        drop(tx);
    });
}
