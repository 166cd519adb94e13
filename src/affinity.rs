//! # Thread-affinity contexts.
//!
//! An [`AffinityContext`] is an opaque, cloneable handle to a single
//! thread-affine execution context — typically a UI-style message pump. The
//! engine never creates that thread: the user obtains a context/pump pair
//! from [`AffinityContext::new`] and runs the [`AffinityPump`] on whatever
//! thread should own the context.
//!
//! ## Architecture
//! ```text
//!  foreign threads                      affinity thread (user-owned)
//!  ───────────────                      ────────────────────────────
//!  ctx.post(job) ──► [job queue] ──►    pump.run():
//!  ctx.send(job) ──►     │                loop { job(); }
//!       │ blocks         │                  │
//!       ◄────────────────┴── result ────────┘
//! ```
//!
//! ## Rules
//! - `send` executes the job on the pump thread and blocks the caller until
//!   it completes; when the caller *is already* the pump thread, the job
//!   runs inline (fast path, avoids self-deadlock).
//! - `post` is fire-and-forget; panics inside posted jobs are caught by the
//!   pump loop and logged, so one bad job cannot kill the shared thread.
//! - Contexts compare by identity: two handles are equal iff they reach the
//!   same pump.
//! - When every context handle is dropped, `run` drains the queue and
//!   returns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use crate::error::DiversionError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct ContextShared {
    /// Recorded by the pump when `run` starts; `is_current` is always false
    /// before that.
    thread: OnceLock<ThreadId>,
}

/// Opaque handle to a thread-affine execution context.
///
/// Cheap to clone; all clones target the same pump. Identity comparison
/// ([`PartialEq`]) answers the "same context?" question used by the
/// fast path.
///
/// Each handle owns its own clone of the queue sender, so the channel
/// closes — and [`AffinityPump::run`] returns — exactly when the last
/// handle is dropped.
#[derive(Clone)]
pub struct AffinityContext {
    tx: mpsc::Sender<Job>,
    shared: Arc<ContextShared>,
}

/// Job loop for an [`AffinityContext`], run by the thread that owns the
/// context.
pub struct AffinityPump {
    rx: mpsc::Receiver<Job>,
    shared: Arc<ContextShared>,
}

impl AffinityContext {
    /// Creates a context/pump pair.
    ///
    /// The caller decides which thread runs the pump:
    ///
    /// ```
    /// use diversions::AffinityContext;
    ///
    /// let (ctx, pump) = AffinityContext::new();
    /// let ui = std::thread::spawn(move || pump.run());
    ///
    /// let answer = ctx.send(|| 6 * 7).unwrap();
    /// assert_eq!(answer, 42);
    ///
    /// drop(ctx); // pump drains and exits once every handle is gone
    /// ui.join().unwrap();
    /// ```
    pub fn new() -> (AffinityContext, AffinityPump) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(ContextShared {
            thread: OnceLock::new(),
        });
        let ctx = AffinityContext {
            tx,
            shared: Arc::clone(&shared),
        };
        (ctx, AffinityPump { rx, shared })
    }

    /// Returns `true` when the calling thread is the pump thread.
    ///
    /// Always `false` until the pump has started running.
    pub fn is_current(&self) -> bool {
        self.shared
            .thread
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Executes `job` on the pump thread and blocks until it completes,
    /// returning its result.
    ///
    /// Runs the job inline when the caller is already on the pump thread.
    ///
    /// # Errors
    /// [`DiversionError::AffinityClosed`] when the pump has stopped (its
    /// `run` returned or the pump was dropped before running), or when the
    /// relayed job panicked on the pump thread.
    pub fn send<R, F>(&self, job: F) -> Result<R, DiversionError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(job());
        }

        let (done_tx, done_rx) = mpsc::channel();
        let wrapped: Job = Box::new(move || {
            let _ = done_tx.send(job());
        });
        self.tx
            .send(wrapped)
            .map_err(|_| DiversionError::AffinityClosed)?;

        // A panicked job drops `done_tx` without sending; surface that the
        // same way as a dead pump rather than hanging the caller.
        done_rx.recv().map_err(|_| DiversionError::AffinityClosed)
    }

    /// Queues `job` on the pump thread without waiting for it.
    ///
    /// If the pump is gone the job is dropped and a warning is logged.
    pub fn post<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            log::warn!("affinity: posted job dropped; pump is gone");
        }
    }
}

impl PartialEq for AffinityContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for AffinityContext {}

impl std::fmt::Debug for AffinityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityContext")
            .field("thread", &self.shared.thread.get())
            .finish()
    }
}

impl AffinityPump {
    /// Runs the job loop on the calling thread until every
    /// [`AffinityContext`] handle has been dropped.
    ///
    /// Records the calling thread so `is_current` and the diverter fast
    /// path work from this point on. Panics inside jobs are caught and
    /// logged; the loop keeps running.
    pub fn run(self) {
        let _ = self.shared.thread.set(thread::current().id());
        while let Ok(job) = self.rx.recv() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                log::error!(
                    "affinity: relayed job panicked on pump thread: {}",
                    crate::diverters::panic_detail(&*panic)
                );
            }
        }
    }

    /// Processes jobs that are already queued, then returns.
    ///
    /// Useful for callers that interleave pumping with their own work
    /// instead of parking a thread in [`run`](Self::run).
    pub fn run_pending(&mut self) {
        let _ = self.shared.thread.set(thread::current().id());
        while let Ok(job) = self.rx.try_recv() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                log::error!(
                    "affinity: relayed job panicked on pump thread: {}",
                    crate::diverters::panic_detail(&*panic)
                );
            }
        }
    }
}
