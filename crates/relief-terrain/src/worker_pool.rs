//! Fixed-size pool of named worker threads fed from a shared job channel.

use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};
use tracing::debug;

use crate::error::PipelineError;

/// A unit of work executed on a pool thread.
pub trait Job: Send + 'static {
    fn run(self: Box<Self>);

    /// Called on the submitting thread, instead of [`run`](Self::run), when the
    /// pool no longer accepts work.
    fn abandon(self: Box<Self>);
}

/// Worker count leaving headroom for the consumer and render threads.
pub fn default_worker_count() -> usize {
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}

/// Cloneable handle for submitting jobs to a [`WorkerPool`].
///
/// All clones share one channel sender, so shutting the pool down closes
/// the channel no matter how many handles are still alive.
#[derive(Clone)]
pub struct JobSender {
    inner: Arc<RwLock<Option<Sender<Box<dyn Job>>>>>,
}

impl JobSender {
    /// Queue `job` for a worker, or abandon it if the pool is shut down.
    pub fn submit(&self, job: Box<dyn Job>) {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let refused = match guard.as_ref() {
            Some(sender) => sender.send(job).err().map(|e| e.into_inner()),
            None => Some(job),
        };
        drop(guard);
        if let Some(job) = refused {
            job.abandon();
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn close(&self) {
        let closed = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(closed);
    }
}

/// Owns the worker threads. Dropping the pool closes the job channel and
/// joins every worker once the jobs already queued have run.
pub struct WorkerPool {
    sender: JobSender,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `thread_count` workers; `0` selects [`default_worker_count`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SpawnWorker`] if a thread cannot be started.
    /// Workers already started are shut down before returning.
    pub fn new(thread_count: usize) -> Result<Self, PipelineError> {
        let thread_count = if thread_count == 0 {
            default_worker_count()
        } else {
            thread_count
        };

        let (sender, receiver) = unbounded::<Box<dyn Job>>();
        let mut pool = Self {
            sender: JobSender {
                inner: Arc::new(RwLock::new(Some(sender))),
            },
            handles: Vec::with_capacity(thread_count),
        };

        for index in 0..thread_count {
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("terrain-gen-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job.run();
                    }
                })
                .map_err(PipelineError::SpawnWorker)?;
            pool.handles.push(handle);
        }

        debug!(threads = thread_count, "worker pool started");
        Ok(pool)
    }

    pub fn sender(&self) -> JobSender {
        self.sender.clone()
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop accepting jobs, let queued jobs finish, and join all workers.
    pub fn shutdown(&mut self) {
        self.sender.close();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;

    /// Reports the worker thread name, or `None` when abandoned.
    struct Report(mpsc::Sender<Option<String>>);

    impl Job for Report {
        fn run(self: Box<Self>) {
            let name = std::thread::current().name().map(str::to_owned);
            let _ = self.0.send(name);
        }

        fn abandon(self: Box<Self>) {
            let _ = self.0.send(None);
        }
    }

    #[test]
    fn test_jobs_run_on_named_workers() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.thread_count(), 3);

        let (tx, rx) = mpsc::channel();
        let sender = pool.sender();
        for _ in 0..30 {
            sender.submit(Box::new(Report(tx.clone())));
        }

        let names: HashSet<_> = (0..30)
            .map(|_| rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap())
            .collect();
        assert!(names.iter().all(|n| {
            n.as_deref()
                .is_some_and(|n| n.starts_with("terrain-gen-worker-"))
        }));
    }

    #[test]
    fn test_zero_threads_uses_default() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.thread_count(), default_worker_count());
    }

    #[test]
    fn test_shutdown_runs_queued_jobs_then_abandons_new_ones() {
        let mut pool = WorkerPool::new(1).unwrap();
        let sender = pool.sender();
        let (tx, rx) = mpsc::channel();
        for _ in 0..10 {
            sender.submit(Box::new(Report(tx.clone())));
        }

        pool.shutdown();
        assert!(!sender.is_open());
        let finished: Vec<_> = rx.try_iter().collect();
        assert_eq!(finished.len(), 10);
        assert!(finished.iter().all(Option::is_some));

        sender.submit(Box::new(Report(tx.clone())));
        assert_eq!(rx.try_recv().unwrap(), None, "Job after shutdown is abandoned");
    }
}
