//! Result handlers.
//!
//! An asynchronous call reports back exactly once with an `Outcome`: either
//! `Ok(Reply)` carrying the payload and the response head, or `Err(Error)`.
//! The handler always runs on the client's delivery context.

use tokio::sync::oneshot;

use crate::error::Error;
use crate::http::ResponseHead;

/// Payload of a successful call plus the response it came from.
#[derive(Debug)]
pub struct Reply<T> {
    pub payload: T,
    pub head: ResponseHead,
}

pub type Outcome<T> = Result<Reply<T>, Error>;

/// Consumes the `Outcome` of one call.
pub struct Handler<T> {
    f: Box<dyn FnOnce(Outcome<T>) + Send>,
}

impl<T: Send + 'static> Handler<T> {
    pub fn new(f: impl FnOnce(Outcome<T>) + Send + 'static) -> Self {
        Self { f: Box::new(f) }
    }

    /// Ignores both success and failure.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// A handler that forwards the outcome to the returned receiver.
    ///
    /// The receiver can be awaited or drained with `blocking_recv` from a
    /// thread outside any runtime.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        let handler = Self::new(move |outcome| {
            // Receiver gone means nobody is waiting any more.
            let _ = tx.send(outcome);
        });
        (handler, rx)
    }

    pub fn call(self, outcome: Outcome<T>) {
        (self.f)(outcome)
    }
}

impl<T> std::fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Handler")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn head() -> ResponseHead {
        ResponseHead {
            status: 200,
            headers: Vec::new(),
        }
    }

    #[test]
    fn noop_absorbs_success_and_failure() {
        Handler::<String>::noop().call(Ok(Reply {
            payload: "ok".to_string(),
            head: head(),
        }));
        Handler::<String>::noop().call(Err(Error::Transport("refused".to_string())));
    }

    #[test]
    fn new_forwards_outcome() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let handler = Handler::new(move |outcome: Outcome<u32>| {
            *sink.lock().unwrap() = Some(outcome.map(|r| r.payload).ok());
        });
        handler.call(Ok(Reply {
            payload: 7,
            head: head(),
        }));
        assert_eq!(*seen.lock().unwrap(), Some(Some(7)));
    }

    #[test]
    fn channel_delivers_to_receiver() {
        let (handler, rx) = Handler::<String>::channel();
        handler.call(Err(Error::Decode("bad".to_string())));
        let outcome = rx.blocking_recv().unwrap();
        assert!(matches!(outcome, Err(Error::Decode(_))));
    }

    #[test]
    fn channel_tolerates_dropped_receiver() {
        let (handler, rx) = Handler::<String>::channel();
        drop(rx);
        handler.call(Err(Error::Transport("late".to_string())));
    }
}
