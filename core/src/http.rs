//! HTTP request and response types.
//!
//! # Design
//! These types describe requests and responses as plain data. The builder in
//! `request` produces `HttpRequest` values and a `Transport` turns them into
//! `ResponseStream`s; nothing here touches the network.
//!
//! All fields use owned types (`String`, `Vec`) so values can move freely
//! between the caller, the transport's worker threads, and the delivery
//! context.

use std::io::{self, Read, Write};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RequestBuilder`. A GET carries an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// One form field of a POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Param {
    fn from((key, value): (K, V)) -> Self {
        Param::new(key, value)
    }
}

/// Status line and headers of a response whose body has been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The body as text. Invalid UTF-8 sequences are replaced, never rejected.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            headers: self.headers.clone(),
        }
    }
}

/// A response whose body has not been read yet.
///
/// Handed by a `Transport` to its completion on the worker thread that ran
/// the request. The body can be read exactly once.
pub struct ResponseStream {
    head: ResponseHead,
    body: Box<dyn Read>,
}

impl ResponseStream {
    pub fn new(head: ResponseHead, body: Box<dyn Read>) -> Self {
        Self { head, body }
    }

    /// A stream over an in-memory body.
    pub fn from_bytes(head: ResponseHead, body: Vec<u8>) -> Self {
        Self::new(head, Box::new(io::Cursor::new(body)))
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        self.body.read_to_end(&mut body)?;
        Ok(body)
    }

    pub fn into_response(self) -> io::Result<HttpResponse> {
        let head = self.head.clone();
        let body = self.into_bytes()?;
        Ok(HttpResponse {
            status: head.status,
            headers: head.headers,
            body,
        })
    }

    /// Copy the body into `out` through a fixed-size buffer, returning the
    /// number of bytes copied. Peak memory is `buf.len()` whatever the body
    /// size.
    pub fn copy_to<W: Write>(mut self, out: &mut W, buf: &mut [u8]) -> io::Result<u64> {
        let mut total = 0u64;
        loop {
            let n = match self.body.read(buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            out.write_all(&buf[..n])?;
            total += n as u64;
        }
        Ok(total)
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
