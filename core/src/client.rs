//! The `HttpUtils` facade.
//!
//! # Design
//! `HttpUtils` bundles a `RequestBuilder` and a `Dispatcher` behind the
//! familiar call surface: sync GET/POST, async GET and form/raw POST with
//! optional cipher, and downloads. A client is built once with its
//! configuration, transport and delivery context and then shared by
//! reference (or through `shared()`, a lazily created process-wide
//! instance that delivers on its own thread).
//!
//! Every async method validates its URL before returning, so a malformed
//! URL is reported to the caller directly and never reaches a handler.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use image::DynamicImage;
use tracing::{info, warn};

use crate::callback::Handler;
use crate::cipher::TeaCodec;
use crate::config::ClientConfig;
use crate::delivery::{DeliveryContext, DeliveryQueue};
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::http::{HttpResponse, Param};
use crate::request::RequestBuilder;
use crate::transport::{Transport, UreqTransport};

static SHARED: OnceLock<HttpUtils> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct HttpUtils {
    config: ClientConfig,
    builder: RequestBuilder,
    dispatcher: Dispatcher,
}

impl HttpUtils {
    /// A client backed by `ureq` whose handlers run on `delivery`.
    pub fn new(
        config: ClientConfig,
        delivery: impl DeliveryContext + 'static,
    ) -> Result<Self, Error> {
        let transport = UreqTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport), delivery))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        delivery: impl DeliveryContext + 'static,
    ) -> Self {
        Self {
            builder: RequestBuilder::new(config.default_headers.clone()),
            dispatcher: Dispatcher::new(transport, Arc::new(delivery), TeaCodec::default()),
            config,
        }
    }

    /// The process-wide client, created with the default configuration on
    /// first use unless `init_shared` ran earlier.
    pub fn shared() -> Result<&'static HttpUtils, Error> {
        match SHARED.get() {
            Some(client) => Ok(client),
            None => Self::init_shared(ClientConfig::default()),
        }
    }

    /// Create the process-wide client with `config`.
    ///
    /// Only the first successful initialization counts; later calls return
    /// the existing client and leave its configuration unchanged.
    pub fn init_shared(config: ClientConfig) -> Result<&'static HttpUtils, Error> {
        if let Some(client) = SHARED.get() {
            if client.config != config {
                warn!("shared client already initialized, ignoring new configuration");
            }
            return Ok(client);
        }
        let delivery = DeliveryQueue::spawn("httputils-delivery")?;
        let candidate = HttpUtils::new(config, delivery)?;
        // A concurrent initializer may have won; its client is the one kept.
        if SHARED.set(candidate).is_ok() {
            info!("shared http client initialized");
        }
        SHARED
            .get()
            .ok_or_else(|| Error::Runtime("shared client missing after initialization".to_string()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn request_builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ---------------------------------------------------------------------
    // Blocking calls
    // ---------------------------------------------------------------------

    pub fn get(&self, url: &str) -> Result<HttpResponse, Error> {
        let request = self.builder.build_get(url)?;
        self.dispatcher.submit_sync(&request)
    }

    pub fn get_as_string(&self, url: &str) -> Result<String, Error> {
        Ok(self.get(url)?.text())
    }

    pub fn post(&self, url: &str, params: &[Param]) -> Result<HttpResponse, Error> {
        let request = self.builder.build_post(url, params)?;
        self.dispatcher.submit_sync(&request)
    }

    pub fn post_as_string(&self, url: &str, params: &[Param]) -> Result<String, Error> {
        Ok(self.post(url, params)?.text())
    }

    // ---------------------------------------------------------------------
    // Background calls
    // ---------------------------------------------------------------------

    pub fn get_async(
        &self,
        url: &str,
        decrypt: bool,
        handler: Option<Handler<String>>,
    ) -> Result<(), Error> {
        let request = self.builder.build_get(url)?;
        self.dispatcher.submit(request, decrypt, handler);
        Ok(())
    }

    pub fn post_async(
        &self,
        url: &str,
        decrypt: bool,
        params: &[Param],
        handler: Option<Handler<String>>,
    ) -> Result<(), Error> {
        let request = self.builder.build_post(url, params)?;
        self.dispatcher.submit(request, decrypt, handler);
        Ok(())
    }

    pub fn post_map_async<I, K, V>(
        &self,
        url: &str,
        decrypt: bool,
        params: I,
        handler: Option<Handler<String>>,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = self.builder.build_post_map(url, params)?;
        self.dispatcher.submit(request, decrypt, handler);
        Ok(())
    }

    /// POST `body` as is. With `cipher` the body is encoded before sending
    /// and the response decoded before delivery.
    pub fn post_stream_async(
        &self,
        url: &str,
        cipher: bool,
        body: impl Into<Vec<u8>>,
        handler: Option<Handler<String>>,
    ) -> Result<(), Error> {
        let mut body = body.into();
        if cipher {
            self.dispatcher.codec().encode_in_place(&mut body);
        }
        let request = self.builder.build_post_raw(url, body)?;
        self.dispatcher.submit(request, cipher, handler);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Downloads
    // ---------------------------------------------------------------------

    pub fn download_file(
        &self,
        url: &str,
        dest_dir: impl Into<PathBuf>,
        dest_name: impl Into<String>,
        handler: Option<Handler<PathBuf>>,
    ) -> Result<(), Error> {
        let request = self.builder.build_get(url)?;
        self.dispatcher
            .download_file(request, dest_dir, dest_name, handler);
        Ok(())
    }

    pub fn download_image(
        &self,
        url: &str,
        handler: Option<Handler<DynamicImage>>,
    ) -> Result<(), Error> {
        let request = self.builder.build_get(url)?;
        self.dispatcher.download_image(request, handler);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::delivery::Looper;
    use crate::http::HttpMethod;
    use crate::request::MEDIA_TYPE_JSON;
    use crate::transport::tests::{Canned, MockTransport};

    fn client_with(mock: Arc<MockTransport>, looper: &Looper) -> HttpUtils {
        HttpUtils::with_transport(
            ClientConfig::default().header("x-app", "test"),
            mock,
            looper.handle(),
        )
    }

    #[test]
    fn invalid_url_fails_before_dispatch() {
        let mock = Arc::new(MockTransport::default());
        let looper = Looper::new();
        let client = client_with(Arc::clone(&mock), &looper);

        let err = client.get_async("::not-a-url::", false, None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
        let err = client
            .download_file("ftp://x/f", "/tmp", "f", None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
        assert_eq!(mock.async_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handlers_wait_for_the_looper() {
        let mock = Arc::new(MockTransport::default().route("http://x/a", Canned::ok(b"ok")));
        let mut looper = Looper::new();
        let client = client_with(mock, &looper);
        let (handler, mut rx) = Handler::channel();

        client.get_async("http://x/a", false, Some(handler)).unwrap();

        assert!(looper.run_next());
        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(reply.payload, "ok");
    }

    #[test]
    fn post_stream_async_encodes_request_and_decodes_response() {
        let codec = TeaCodec::default();
        let reply_plain = b"{\"ok\":true,\"n\":1}".to_vec();
        let mock = Arc::new(
            MockTransport::default().route("http://x/raw", Canned::ok(&codec.encode(&reply_plain))),
        );
        let mut looper = Looper::new();
        let client = client_with(Arc::clone(&mock), &looper);
        let (handler, mut rx) = Handler::channel();

        client
            .post_stream_async("http://x/raw", true, "{\"query\":\"abc\"}", Some(handler))
            .unwrap();
        assert!(looper.run_next());

        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(reply.payload.as_bytes(), reply_plain.as_slice());

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].header("content-type"), Some(MEDIA_TYPE_JSON));
        assert_eq!(codec.decode(&seen[0].body), b"{\"query\":\"abc\"}");
        assert_ne!(seen[0].body, b"{\"query\":\"abc\"}");
    }

    #[test]
    fn post_stream_async_without_cipher_sends_plain_body() {
        let mock = Arc::new(MockTransport::default().route("http://x/raw", Canned::ok(b"fine")));
        let looper = Looper::new();
        let client = client_with(Arc::clone(&mock), &looper);

        client
            .post_stream_async("http://x/raw", false, "plain", None)
            .unwrap();

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen[0].body, b"plain");
    }

    #[test]
    fn post_map_async_sends_form_and_default_headers() {
        let mock = Arc::new(MockTransport::default().route("http://x/form", Canned::ok(b"")));
        let looper = Looper::new();
        let client = client_with(Arc::clone(&mock), &looper);

        client
            .post_map_async("http://x/form", false, [("k", "v")], None)
            .unwrap();

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen[0].body, b"k=v");
        assert_eq!(seen[0].header("x-app"), Some("test"));
    }

    #[test]
    fn sync_calls_return_text() {
        let mock = Arc::new(
            MockTransport::default()
                .route("http://x/a", Canned::ok(b"got"))
                .route("http://x/p", Canned::ok(b"posted")),
        );
        let looper = Looper::new();
        let client = client_with(mock, &looper);

        assert_eq!(client.get_as_string("http://x/a").unwrap(), "got");
        assert_eq!(
            client
                .post_as_string("http://x/p", &[Param::new("a", "1")])
                .unwrap(),
            "posted"
        );
        assert_eq!(client.get("http://x/a").unwrap().status, 200);
    }
}
