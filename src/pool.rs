// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Worker pool running scenario units concurrently.

use std::{
    sync::{mpsc, Arc},
    thread,
};

use parking_lot::Mutex;

/// Unit of work submitted to a [`ScenarioPool`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executor of concurrently dispatched scenario units.
///
/// Supplied externally on an [`ExecutionContext`]; its presence is what turns
/// concurrent dispatch on.
///
/// [`ExecutionContext`]: crate::ExecutionContext
pub trait ScenarioPool: Send + Sync {
    /// Enqueues the given `job` to run on some worker thread.
    fn submit(&self, job: Job);
}

/// Fixed-size pool of worker threads pulling [`Job`]s off a shared channel.
///
/// Dropping the pool closes the channel, drains the outstanding [`Job`]s and
/// joins every worker.
#[derive(Debug)]
pub struct ThreadPool {
    /// Producing side of the [`Job`] channel.
    ///
    /// Wrapped into an [`Option`] to be closable on [`Drop`].
    sender: Option<mpsc::Sender<Job>>,

    /// Handles of the spawned worker threads.
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns a [`ThreadPool`] of `size` worker threads.
    ///
    /// # Panics
    ///
    /// If `size` is zero.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a `ThreadPool` requires at least one worker");

        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                thread::spawn(move || loop {
                    // The guard is dropped right after `recv()` returns, so
                    // workers run their jobs without holding the lock.
                    let job = receiver.lock().recv();
                    match job {
                        Ok(job) => job(),
                        Err(mpsc::RecvError) => break,
                    }
                })
            })
            .collect();

        Self { sender: Some(sender), workers }
    }
}

impl ScenarioPool for ThreadPool {
    fn submit(&self, job: Job) {
        let Some(sender) = &self.sender else {
            // `sender` is only taken on `Drop`, which cannot overlap with a
            // live `&self`.
            return job();
        };
        if let Err(mpsc::SendError(job)) = sender.send(job) {
            // The channel only closes once every worker is gone. Running
            // inline keeps the completion protocol intact rather than losing
            // the job's signal.
            job();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::latch::CountdownLatch;

    use super::*;

    #[test]
    fn runs_every_submitted_job() {
        let pool = ThreadPool::new(4);
        let done = Arc::new(AtomicUsize::new(0));
        let latch = Arc::new(CountdownLatch::new(16));

        for _ in 0..16 {
            let done = Arc::clone(&done);
            let latch = Arc::clone(&latch);
            pool.submit(Box::new(move || {
                done.fetch_add(1, Ordering::SeqCst);
                latch.count_down();
            }));
        }

        latch.wait();
        assert_eq!(done.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn drop_drains_outstanding_jobs() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(2);
            for _ in 0..8 {
                let done = Arc::clone(&done);
                pool.submit(Box::new(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }

        assert_eq!(done.load(Ordering::SeqCst), 8);
    }
}
