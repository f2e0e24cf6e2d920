//! A fixed-size worker pool draining a shared task queue.
//!
//! Grounded on the original server's `ThreadPool`: a mutex-guarded queue, a
//! condition variable workers block on, and a stop flag checked under the
//! same lock so a worker never blocks on an empty queue after shutdown has
//! been requested.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<Job>,
    stop: bool,
}

struct Shared {
    state: Mutex<State>,
    condvar: Condvar,
}

/// Error returned by [`ThreadPool::enqueue`] when the pool has already been
/// asked to stop.
#[derive(Debug, thiserror::Error)]
#[error("enqueue on stopped thread pool")]
pub struct PoolStoppedError;

/// A fixed-size pool of OS threads draining a shared FIFO task queue.
///
/// Dropping the pool sets the stop flag, wakes every worker, and joins them
/// after they drain whatever is left in the queue.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `size` worker threads. `size` is clamped to at least 1.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                stop: false,
            }),
            condvar: Condvar::new(),
        });

        let workers = (0..size)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("keyspace-worker-{id}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task for some worker to run. Returns an error if the pool
    /// has already been stopped.
    pub fn enqueue<F>(&self, job: F) -> Result<(), PoolStoppedError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.stop {
            return Err(PoolStoppedError);
        }
        state.queue.push_back(Box::new(job));
        drop(state);
        self.shared.condvar.notify_one();
        Ok(())
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            let job = loop {
                if let Some(job) = state.queue.pop_front() {
                    break Some(job);
                }
                if state.stop {
                    break None;
                }
                shared.condvar.wait(&mut state);
            };
            job
        };
        match job {
            Some(job) => job(),
            None => break,
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
        }
        self.shared.condvar.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn runs_enqueued_jobs() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.enqueue(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        drop(pool); // joins all workers, draining the queue first
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn enqueue_after_drop_start_is_rejected() {
        let pool = ThreadPool::new(2);
        {
            let mut state = pool.shared.state.lock();
            state.stop = true;
        }
        pool.shared.condvar.notify_all();
        thread::sleep(Duration::from_millis(50));
        assert!(pool.enqueue(|| {}).is_err());
    }

    #[test]
    fn pool_size_matches_requested() {
        let pool = ThreadPool::new(3);
        assert_eq!(pool.size(), 3);
    }
}
