//! Fixed-size worker pool for independent runs.
//!
//! Jobs go out on one channel and come back tagged with their index, so the
//! returned vector is in job order whatever the worker count or completion
//! order.

use crate::SimError;
use crossbeam::channel::unbounded;
use std::thread;
use swarm_env::CancellationToken;
use tracing::debug;

/// Worker count used when none is requested.
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Runs `work` over every job on up to `workers` threads.
///
/// `on_complete` runs on the calling thread after each finished job with the
/// number completed so far. The first error stops the remaining jobs and is
/// returned; cancelling `cancel` stops them with [`SimError::Cancelled`].
pub fn execute<J, T, F, C>(
    jobs: Vec<J>,
    workers: usize,
    cancel: &CancellationToken,
    work: F,
    mut on_complete: C,
) -> Result<Vec<T>, SimError>
where
    J: Send,
    T: Send,
    F: Fn(J, &CancellationToken) -> Result<T, SimError> + Sync,
    C: FnMut(usize),
{
    let total = jobs.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, total);
    debug!("Worker pool: {} jobs on {} workers", total, workers);

    let (job_tx, job_rx) = unbounded::<(usize, J)>();
    let (result_tx, result_rx) = unbounded::<(usize, Result<T, SimError>)>();
    for job in jobs.into_iter().enumerate() {
        // Receiver is alive until the scope below ends
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    // Linked to `cancel` by polling; also tripped by the first error
    let abort = CancellationToken::new();
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut first_error = None;

    thread::scope(|s| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let abort = abort.clone();
            let work = &work;
            s.spawn(move || {
                for (index, job) in job_rx.iter() {
                    if abort.is_cancelled() || cancel.is_cancelled() {
                        break;
                    }
                    let result = work(job, cancel);
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut completed = 0;
        for (index, result) in result_rx.iter() {
            match result {
                Ok(value) => {
                    slots[index] = Some(value);
                    completed += 1;
                    on_complete(completed);
                }
                Err(e) => {
                    abort.cancel();
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
    });

    if let Some(e) = first_error {
        return Err(e);
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or(SimError::Cancelled))
        .collect()
}
