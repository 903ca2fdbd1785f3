//! Request builder.
//!
//! # Design
//! `RequestBuilder` holds only the headers every request should carry and
//! has no mutable state between calls. Each `build_*` method validates the
//! URL and returns an `HttpRequest`; none of them performs I/O. A bad URL is
//! the only way to fail.

use url::{form_urlencoded, Url};

use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, Param};

pub const MEDIA_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const MEDIA_TYPE_JSON: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    default_headers: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn new(default_headers: Vec<(String, String)>) -> Self {
        Self { default_headers }
    }

    pub fn build_get(&self, url: &str) -> Result<HttpRequest, Error> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: validate_url(url)?,
            headers: self.default_headers.clone(),
            body: Vec::new(),
        })
    }

    /// Form POST. An empty `params` slice produces an empty form body.
    pub fn build_post(&self, url: &str, params: &[Param]) -> Result<HttpRequest, Error> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|p| (p.key.as_str(), p.value.as_str())))
            .finish();
        self.post_with(url, MEDIA_TYPE_FORM, body.into_bytes())
    }

    pub fn build_post_map<I, K, V>(&self, url: &str, params: I) -> Result<HttpRequest, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<Param> = params.into_iter().map(Param::from).collect();
        self.build_post(url, &params)
    }

    /// POST with a caller-supplied body, sent as JSON.
    pub fn build_post_raw(&self, url: &str, body: Vec<u8>) -> Result<HttpRequest, Error> {
        self.post_with(url, MEDIA_TYPE_JSON, body)
    }

    fn post_with(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpRequest, Error> {
        let mut headers = self.default_headers.clone();
        headers.push(("content-type".to_string(), content_type.to_string()));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: validate_url(url)?,
            headers,
            body,
        })
    }
}

fn validate_url(raw: &str) -> Result<String, Error> {
    let url = Url::parse(raw).map_err(|e| Error::invalid_request(raw, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::invalid_request(
                raw,
                format!("unsupported scheme {other:?}"),
            ))
        }
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(Error::invalid_request(raw, "missing host")),
    }
    Ok(url.into())
}
