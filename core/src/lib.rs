//! HTTP helpers with serialized result delivery.
//!
//! # Overview
//! Thin convenience layer over an HTTP engine (`ureq`): blocking and
//! background GET/POST, form and raw bodies, optional fixed-key TEA
//! obfuscation of bodies, and downloads to a file or a decoded image.
//! Background results are handed to a `Handler` on one `DeliveryContext`,
//! so callers observe every outcome on a single thread.
//!
//! # Design
//! - `RequestBuilder` produces plain-data `HttpRequest`s and never does I/O.
//! - `Transport` is the seam to the HTTP engine; `UreqTransport` runs
//!   requests on a worker pool.
//! - `Dispatcher` converts responses on the worker, then posts the handler
//!   to the delivery context. Each request yields exactly one `Outcome`.
//! - `HttpUtils` is the facade; build one and pass it around, or use the
//!   lazily created `HttpUtils::shared()`.

pub mod callback;
pub mod cipher;
pub mod client;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;

pub use callback::{Handler, Outcome, Reply};
pub use cipher::TeaCodec;
pub use client::HttpUtils;
pub use config::ClientConfig;
pub use delivery::{DeliveryContext, DeliveryQueue, Looper, LooperHandle};
pub use dispatch::Dispatcher;
pub use error::Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Param, ResponseHead, ResponseStream};
pub use request::RequestBuilder;
pub use transport::{Transport, UreqTransport};

pub use image::DynamicImage;
