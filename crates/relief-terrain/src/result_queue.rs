//! Lock-guarded FIFO of completed results awaiting delivery on the consumer thread.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::GenerationError;

/// Identifier assigned to every generation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Completion callback for a request producing `T`.
pub type Completion<T> = Box<dyn FnOnce(Result<T, GenerationError>) + Send + 'static>;

/// A finished request: its outcome paired with the callback that receives it.
pub struct PendingResult<T> {
    request: RequestId,
    outcome: Result<T, GenerationError>,
    callback: Completion<T>,
}

impl<T> PendingResult<T> {
    pub fn new(
        request: RequestId,
        outcome: Result<T, GenerationError>,
        callback: Completion<T>,
    ) -> Self {
        Self {
            request,
            outcome,
            callback,
        }
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Hand the outcome to the callback, consuming both.
    pub fn deliver(self) {
        (self.callback)(self.outcome);
    }
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("request", &self.request)
            .field("ok", &self.outcome.is_ok())
            .finish_non_exhaustive()
    }
}

/// Thread-safe queue of [`PendingResult`]s.
///
/// Any thread may [`push`](Self::push); the consumer swaps out the whole
/// queue with [`take_all`](Self::take_all). The lock is held only for the
/// push or the swap, never while callbacks run.
pub struct ResultQueue<T> {
    inner: Mutex<VecDeque<PendingResult<T>>>,
}

impl<T> ResultQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    // A panic can only poison this lock between two plain VecDeque operations,
    // so the queue is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<PendingResult<T>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, result: PendingResult<T>) {
        self.lock().push_back(result);
    }

    /// Remove and return everything queued so far, oldest first.
    pub fn take_all(&self) -> VecDeque<PendingResult<T>> {
        std::mem::take(&mut *self.lock())
    }

    /// Deliver everything queued so far on the calling thread, oldest first.
    ///
    /// Results pushed while callbacks run (including by the callbacks
    /// themselves) wait for the next call. Returns the number delivered.
    ///
    /// If a callback panics, the undelivered rest of the batch goes back to
    /// the front of the queue before the panic resumes, so a later call
    /// still delivers it in order.
    pub fn deliver_all(&self) -> usize {
        let mut batch = self.take_all();
        let mut delivered = 0;
        while let Some(result) = batch.pop_front() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| result.deliver())) {
                self.requeue_front(batch);
                panic::resume_unwind(payload);
            }
            delivered += 1;
        }
        delivered
    }

    fn requeue_front(&self, mut batch: VecDeque<PendingResult<T>>) {
        let mut queue = self.lock();
        batch.append(&mut queue);
        *queue = batch;
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for ResultQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
