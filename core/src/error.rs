//! Error types for the HTTP helpers.
//!
//! # Design
//! Build-time problems (`InvalidRequest`) are returned synchronously from the
//! call that built the request. Everything that happens after submission is
//! handed to the caller's `Handler` as the `Err` side of an `Outcome`, never
//! thrown across the delivery boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The URL could not be parsed or does not use http/https.
    #[error("invalid request for {url:?}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// Connection, TLS, timeout, or protocol failure reported by the transport.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be decoded into the requested payload.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Reading the response body or writing a download to disk failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration value could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The worker pool or the delivery thread could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl Error {
    pub(crate) fn invalid_request(url: &str, reason: impl ToString) -> Self {
        Error::InvalidRequest {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
