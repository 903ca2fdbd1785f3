//! The HTTP engine behind the helpers.
//!
//! # Design
//! `Transport` is the seam to whatever actually speaks HTTP: connection
//! reuse, TLS, DNS and timeouts all live behind it. It offers a blocking
//! call and a non-blocking one that completes on a worker thread.
//!
//! `UreqTransport` drives a `ureq::Agent` from the blocking pool of a
//! private tokio runtime. Each in-flight request holds one pool thread; the
//! completion runs on that same thread, so it may do blocking I/O (reading
//! the body, writing a file) before anything is handed to the delivery
//! context.

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;
use ureq::Agent;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseHead, ResponseStream};

/// Called exactly once with the result of an asynchronous request, on the
/// worker thread that executed it.
pub type Completion = Box<dyn FnOnce(Result<ResponseStream, Error>) + Send>;

pub trait Transport: Send + Sync {
    fn execute_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;

    fn execute_async(&self, request: HttpRequest, on_complete: Completion);
}

pub struct UreqTransport {
    agent: Agent,
    handle: Handle,
    // Taken on drop so the pool can be shut down without blocking.
    runtime: Option<Runtime>,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout()))
            .timeout_send_request(Some(config.write_timeout()))
            .timeout_send_body(Some(config.write_timeout()))
            .timeout_recv_response(Some(config.read_timeout()))
            .timeout_recv_body(Some(config.read_timeout()))
            .build()
            .new_agent();

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_blocking_threads.max(1))
            .thread_name("httputils-transport")
            .enable_all()
            .build()
            .map_err(|e| Error::Runtime(format!("failed to start transport pool: {e}")))?;

        Ok(Self {
            agent,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }
}

impl Transport for UreqTransport {
    fn execute_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        Ok(open(&self.agent, request)?.into_response()?)
    }

    fn execute_async(&self, request: HttpRequest, on_complete: Completion) {
        let agent = self.agent.clone();
        self.handle.spawn_blocking(move || on_complete(open(&agent, &request)));
    }
}

impl Drop for UreqTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

/// Send `request` and return the response with its body still unread.
fn open(agent: &Agent, request: &HttpRequest) -> Result<ResponseStream, Error> {
    debug!(method = request.method.as_str(), url = %request.url, "sending request");
    let result = match request.method {
        HttpMethod::Get => {
            let mut call = agent.get(&request.url);
            for (name, value) in &request.headers {
                call = call.header(name.as_str(), value.as_str());
            }
            call.call()
        }
        HttpMethod::Post => {
            let mut call = agent.post(&request.url);
            for (name, value) in &request.headers {
                call = call.header(name.as_str(), value.as_str());
            }
            call.send(request.body.as_slice())
        }
    };
    let response = result.map_err(|e| Error::Transport(e.to_string()))?;

    let head = ResponseHead {
        status: response.status().as_u16(),
        headers: response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
    };
    let body = response.into_body().into_reader();
    Ok(ResponseStream::new(head, Box::new(body)))
}
