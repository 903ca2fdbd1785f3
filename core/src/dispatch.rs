//! Submits requests and delivers their outcome.
//!
//! # Design
//! The transport completes on one of its worker threads. The dispatcher
//! turns the response into the caller's payload right there (body reads,
//! cipher decode, file writes are all blocking work) and only then posts
//! the handler to the delivery context. The transport's completion is
//! `FnOnce`, so each request produces exactly one `Outcome`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::callback::{Handler, Outcome, Reply};
use crate::cipher::TeaCodec;
use crate::delivery::DeliveryContext;
use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse, ResponseStream};
use crate::transport::Transport;

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    delivery: Arc<dyn DeliveryContext>,
    codec: TeaCodec,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        delivery: Arc<dyn DeliveryContext>,
        codec: TeaCodec,
    ) -> Self {
        Self {
            transport,
            delivery,
            codec,
        }
    }

    pub fn codec(&self) -> &TeaCodec {
        &self.codec
    }

    /// Execute on the calling thread.
    pub fn submit_sync(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.transport.execute_blocking(request)
    }

    /// Execute in the background and deliver the body as text.
    ///
    /// With `decrypt_response` the body is run through the codec first.
    /// A `None` handler discards the outcome.
    pub fn submit(
        &self,
        request: HttpRequest,
        decrypt_response: bool,
        handler: Option<Handler<String>>,
    ) {
        let codec = self.codec;
        self.submit_with(request, handler, move |stream| {
            let mut body = stream.into_bytes()?;
            if decrypt_response {
                codec.decode_in_place(&mut body);
            }
            Ok(String::from_utf8_lossy(&body).into_owned())
        });
    }

    /// Execute in the background, convert the response with `convert` on
    /// the worker thread, and deliver the result.
    pub fn submit_with<T, F>(&self, request: HttpRequest, handler: Option<Handler<T>>, convert: F)
    where
        T: Send + 'static,
        F: FnOnce(ResponseStream) -> Result<T, Error> + Send + 'static,
    {
        let handler = handler.unwrap_or_else(Handler::noop);
        let delivery = Arc::clone(&self.delivery);
        let url = request.url.clone();
        debug!(method = request.method.as_str(), url = %url, "dispatching request");

        self.transport.execute_async(
            request,
            Box::new(move |result| {
                let outcome: Outcome<T> = result.and_then(|stream| {
                    let head = stream.head().clone();
                    convert(stream).map(|payload| Reply { payload, head })
                });
                match &outcome {
                    Ok(reply) => debug!(url = %url, status = reply.head.status, "request completed"),
                    Err(e) => warn!(url = %url, error = %e, "request failed"),
                }
                delivery.post(Box::new(move || handler.call(outcome)));
            }),
        );
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread::{self, ThreadId};
    use std::time::Duration;

    use super::*;
    use crate::delivery::DeliveryQueue;
    use crate::request::RequestBuilder;
    use crate::transport::tests::{Canned, MockTransport};

    fn dispatcher(mock: MockTransport) -> (Dispatcher, DeliveryQueue, Arc<MockTransport>) {
        let queue = DeliveryQueue::spawn("dispatch-test").unwrap();
        let mock = Arc::new(mock);
        let dispatcher = Dispatcher::new(
            Arc::clone(&mock) as Arc<dyn Transport>,
            Arc::new(queue.clone()),
            TeaCodec::default(),
        );
        (dispatcher, queue, mock)
    }

    fn get(url: &str) -> HttpRequest {
        RequestBuilder::default().build_get(url).unwrap()
    }

    /// Handler reporting the outcome together with the thread it ran on.
    fn probe<T: Send + 'static>() -> (Handler<T>, mpsc::Receiver<(Outcome<T>, ThreadId)>) {
        let (tx, rx) = mpsc::channel();
        let handler = Handler::new(move |outcome| {
            tx.send((outcome, thread::current().id())).unwrap();
        });
        (handler, rx)
    }

    #[test]
    fn success_is_delivered_once_on_delivery_thread() {
        let (dispatcher, queue, _) =
            dispatcher(MockTransport::default().route("http://x/a", Canned::ok(b"ok")));
        let (handler, rx) = probe();

        dispatcher.submit(get("http://x/a"), false, Some(handler));

        let (outcome, ran_on) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let reply = outcome.unwrap();
        assert_eq!(reply.payload, "ok");
        assert_eq!(reply.head.status, 200);
        assert_eq!(ran_on, queue.thread_id());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn transport_failure_is_delivered_as_err() {
        let (dispatcher, queue, _) = dispatcher(
            MockTransport::default().route("http://x/down", Canned::Fail("refused".to_string())),
        );
        let (handler, rx) = probe::<String>();

        dispatcher.submit(get("http://x/down"), false, Some(handler));

        let (outcome, ran_on) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome, Err(Error::Transport(ref m)) if m == "refused"));
        assert_eq!(ran_on, queue.thread_id());
    }

    #[test]
    fn decrypt_response_decodes_body() {
        let codec = TeaCodec::default();
        let hidden = codec.encode("secret payload!!".as_bytes());
        let (dispatcher, _, _) =
            dispatcher(MockTransport::default().route("http://x/tea", Canned::ok(&hidden)));
        let (handler, rx) = Handler::channel();

        dispatcher.submit(get("http://x/tea"), true, Some(handler));

        let reply = rx.blocking_recv().unwrap().unwrap();
        assert_eq!(reply.payload, "secret payload!!");
    }

    #[test]
    fn missing_handler_absorbs_success_and_failure() {
        let (dispatcher, queue, mock) = dispatcher(
            MockTransport::default()
                .route("http://x/a", Canned::ok(b"ok"))
                .route("http://x/b", Canned::Fail("boom".to_string())),
        );

        dispatcher.submit(get("http://x/a"), false, None);
        dispatcher.submit(get("http://x/b"), true, None);

        // A job posted after both completions proves the queue is still healthy.
        thread::sleep(Duration::from_millis(100));
        let (tx, rx) = mpsc::channel();
        queue.post(Box::new(move || tx.send(()).unwrap()));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(mock.async_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_submits_deliver_in_completion_order() {
        let (dispatcher, queue, _) = dispatcher(
            MockTransport::default()
                .route(
                    "http://x/slow",
                    Canned::Respond {
                        status: 200,
                        body: b"slow".to_vec(),
                        delay: Duration::from_millis(300),
                    },
                )
                .route("http://x/fast", Canned::ok(b"fast")),
        );
        let (tx, rx) = mpsc::channel();
        let calls = Arc::new(AtomicUsize::new(0));

        for url in ["http://x/slow", "http://x/fast"] {
            let tx = tx.clone();
            let calls = Arc::clone(&calls);
            dispatcher.submit(
                get(url),
                false,
                Some(Handler::new(move |outcome: Outcome<String>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tx.send((outcome.unwrap().payload, thread::current().id())).unwrap();
                })),
            );
        }

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.0, "fast");
        assert_eq!(second.0, "slow");
        assert_eq!(first.1, queue.thread_id());
        assert_eq!(second.1, queue.thread_id());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn conversion_error_is_delivered_as_err() {
        let (dispatcher, _, _) =
            dispatcher(MockTransport::default().route("http://x/a", Canned::ok(b"ok")));
        let (handler, rx) = Handler::<u32>::channel();

        dispatcher.submit_with(get("http://x/a"), Some(handler), |_| {
            Err(Error::Decode("not a number".to_string()))
        });

        assert!(matches!(rx.blocking_recv().unwrap(), Err(Error::Decode(_))));
    }

    #[test]
    fn submit_sync_returns_response() {
        let (dispatcher, _, _) =
            dispatcher(MockTransport::default().route("http://x/a", Canned::ok(b"ok")));
        let response = dispatcher.submit_sync(&get("http://x/a")).unwrap();
        assert_eq!(response.text(), "ok");

        let err = dispatcher.submit_sync(&get("http://x/none")).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
