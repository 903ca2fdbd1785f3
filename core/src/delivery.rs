//! Delivery contexts: where handlers run.
//!
//! # Design
//! Transports complete on arbitrary worker threads. Every handler is instead
//! posted to one `DeliveryContext`, a serialized queue, so callers never
//! need their own locking to update state from a handler. Jobs run one at a
//! time in the order they were posted, which is completion order, not
//! submission order.
//!
//! Two contexts are provided:
//! - `DeliveryQueue` owns a dedicated thread that drains the queue.
//! - `Looper` leaves the draining to a host thread (an event loop or UI
//!   thread) that calls `run_pending` or `run_next`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{error, warn};

use crate::error::Error;

pub type Job = Box<dyn FnOnce() + Send>;

/// A serialized execution context for handlers.
pub trait DeliveryContext: Send + Sync {
    /// Queue `job` to run on this context. Never runs it inline.
    fn post(&self, job: Job);
}

/// Run one job, keeping the queue alive if it panics.
fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("handler panicked on the delivery context");
    }
}

fn send(tx: &UnboundedSender<Job>, job: Job) {
    if tx.send(job).is_err() {
        warn!("delivery context is closed, dropping handler");
    }
}

/// A delivery context backed by its own named thread.
///
/// Clones share the thread. The thread exits once every clone is dropped
/// and the queue is drained.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: UnboundedSender<Job>,
    thread_id: ThreadId,
}

impl DeliveryQueue {
    pub fn spawn(name: &str) -> Result<Self, Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    run_job(job);
                }
            })
            .map_err(|e| Error::Runtime(format!("failed to spawn delivery thread: {e}")))?;
        Ok(Self {
            tx,
            thread_id: handle.thread().id(),
        })
    }

    /// Id of the thread every handler runs on.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl DeliveryContext for DeliveryQueue {
    fn post(&self, job: Job) {
        send(&self.tx, job);
    }
}

/// A delivery queue drained by a thread the host already owns.
#[derive(Debug)]
pub struct Looper {
    tx: UnboundedSender<Job>,
    rx: UnboundedReceiver<Job>,
}

/// Posting side of a `Looper`, handed to clients.
#[derive(Debug, Clone)]
pub struct LooperHandle {
    tx: UnboundedSender<Job>,
}

impl Default for Looper {
    fn default() -> Self {
        Self::new()
    }
}

impl Looper {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn handle(&self) -> LooperHandle {
        LooperHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every job queued so far without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(job) => {
                    run_job(job);
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Block until one job is available and run it.
    ///
    /// Must not be called from inside an async runtime. Never returns
    /// `false` while the looper is alive, since it holds a sender itself.
    pub fn run_next(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(job) => {
                run_job(job);
                true
            }
            None => false,
        }
    }
}

impl DeliveryContext for LooperHandle {
    fn post(&self, job: Job) {
        send(&self.tx, job);
    }
}
