//! Async Queue
//!
//! FIFO mutual exclusion for async tasks. At most one waiter is *active* at
//! any instant; everybody else waits in arrival order. The same primitive
//! serves two purposes:
//!
//! - as an async mutex, where the caller keeps its [`QueueTurn`] for as long
//!   as it needs exclusive access (see `Handle::open`/`Handle::close`),
//! - as a job queue, where [`AsyncQueue::enqueue`] runs one async job per
//!   turn and releases immediately afterwards.
//!
//! # Arrival order
//!
//! [`AsyncQueue::acquire`] registers the waiter when it is *called*, not when
//! the returned future is first polled. Two calls made one after the other
//! are therefore served in that order regardless of how the runtime
//! schedules the futures.
//!
//! # Hand-off
//!
//! ```text
//! release(turn)
//!   active := None
//!   loop: pop front waiter
//!         active := waiter
//!         send wake-up; stop if the waiter is still listening
//! ```
//!
//! A waiter whose future was dropped is skipped, and a turn handed to a
//! future that is dropped before noticing it is passed on. The queue itself
//! offers no cancellation and no timeout: a holder that never releases
//! blocks every later waiter.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::idgen::{IdGen, JobId};

/// A registered waiter that has not been given the turn yet
struct Waiter {
    job_id: JobId,
    wake: oneshot::Sender<()>,
}

struct QueueState {
    active: Option<JobId>,
    waiting: VecDeque<Waiter>,
}

struct Inner {
    state: Mutex<QueueState>,
    idgen: IdGen,
    debug_hint: String,
}

/// FIFO async queue; clones share the same queue
#[derive(Clone)]
pub struct AsyncQueue {
    inner: Arc<Inner>,
}

impl fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AsyncQueue")
            .field("debug_hint", &self.inner.debug_hint)
            .field("active", &state.active)
            .field("waiting", &state.waiting.len())
            .finish()
    }
}

impl AsyncQueue {
    #[must_use]
    pub fn new(debug_hint: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    active: None,
                    waiting: VecDeque::new(),
                }),
                idgen: IdGen::new(),
                debug_hint: debug_hint.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn debug_hint(&self) -> &str {
        &self.inner.debug_hint
    }

    /// Number of waiters queued behind the active one
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().waiting.len()
    }

    /// True when nobody holds the turn
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().active.is_none()
    }

    /// Register for the next free turn
    ///
    /// The waiter is queued immediately; the returned future resolves once
    /// all earlier waiters have released. If the queue is idle the future is
    /// ready on first poll.
    pub fn acquire(&self) -> Acquire {
        let job_id = self.inner.idgen.get_next();
        let (tx, rx) = oneshot::channel();

        let mut state = self.inner.state.lock();
        if state.active.is_none() {
            // Invariant: an idle queue has no waiters
            debug_assert!(state.waiting.is_empty());
            state.active = Some(job_id);
            // The receiver is alive: it is moved into the Acquire below
            let _ = tx.send(());
            log::trace!("queue {}: job {job_id} runs immediately", self.inner.debug_hint);
        } else {
            state.waiting.push_back(Waiter { job_id, wake: tx });
            log::trace!(
                "queue {}: job {job_id} waits behind {} job(s)",
                self.inner.debug_hint,
                state.waiting.len()
            );
        }
        drop(state);

        Acquire {
            queue: self.clone(),
            job_id,
            wake: rx,
            granted: false,
        }
    }

    /// Run `job` when its turn comes and resolve with its result
    ///
    /// The job is queued when `enqueue` is called. The turn is released as
    /// soon as the job's future completes.
    pub fn enqueue<F, Fut, R>(&self, job: F) -> impl Future<Output = R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let acquire = self.acquire();
        async move {
            let turn = acquire.await;
            let result = job().await;
            turn.release();
            result
        }
    }

    /// Give the turn held by `job_id` to the next live waiter
    fn release(&self, job_id: JobId) {
        let mut state = self.inner.state.lock();
        if state.active != Some(job_id) {
            log::warn!(
                "queue {}: job {job_id} released a turn it does not hold (active: {:?})",
                self.inner.debug_hint,
                state.active
            );
            return;
        }

        state.active = None;
        while let Some(next) = state.waiting.pop_front() {
            state.active = Some(next.job_id);
            if next.wake.send(()).is_ok() {
                log::debug!(
                    "queue {}: turn passes from job {job_id} to job {}",
                    self.inner.debug_hint,
                    next.job_id
                );
                return;
            }
            log::debug!(
                "queue {}: job {} was abandoned, skipping",
                self.inner.debug_hint,
                next.job_id
            );
            state.active = None;
        }
        log::trace!("queue {}: idle after job {job_id}", self.inner.debug_hint);
    }

    /// Withdraw a waiter whose `Acquire` was dropped
    fn abandon(&self, job_id: JobId) {
        let holds_turn = {
            let mut state = self.inner.state.lock();
            if state.active == Some(job_id) {
                true
            } else {
                state.waiting.retain(|w| w.job_id != job_id);
                false
            }
        };
        if holds_turn {
            // The turn arrived but nobody is left to take it
            self.release(job_id);
        }
    }
}

/// Future returned by [`AsyncQueue::acquire`]
#[must_use = "a queued waiter does nothing unless awaited"]
pub struct Acquire {
    queue: AsyncQueue,
    job_id: JobId,
    wake: oneshot::Receiver<()>,
    granted: bool,
}

impl Acquire {
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl Future for Acquire {
    type Output = QueueTurn;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<QueueTurn> {
        match Pin::new(&mut self.wake).poll(cx) {
            Poll::Ready(Ok(())) => {
                self.granted = true;
                Poll::Ready(QueueTurn {
                    queue: self.queue.clone(),
                    job_id: self.job_id,
                })
            }
            // The sender lives in the queue state, which this future keeps
            // alive, and it is only dropped after a successful send.
            Poll::Ready(Err(_)) => unreachable!("queue dropped a live waiter"),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Acquire {
    fn drop(&mut self) {
        if !self.granted {
            self.queue.abandon(self.job_id);
        }
    }
}

/// Exclusive turn on an [`AsyncQueue`]
///
/// Released on drop; the next waiter becomes active.
#[must_use = "dropping the turn releases it immediately"]
pub struct QueueTurn {
    queue: AsyncQueue,
    job_id: JobId,
}

impl QueueTurn {
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Release explicitly; same as dropping
    pub fn release(self) {}
}

impl fmt::Debug for QueueTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTurn")
            .field("queue", &self.queue.inner.debug_hint)
            .field("job_id", &self.job_id)
            .finish()
    }
}

impl Drop for QueueTurn {
    fn drop(&mut self) {
        self.queue.release(self.job_id);
    }
}
