//! Client configuration.
//!
//! Timeouts are fixed when a client is built and apply to every request it
//! issues. Configure before the first request; there is no way to change
//! them on a live client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_BLOCKING_THREADS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Upper bound on requests executing at once; each occupies a pool thread.
    pub max_blocking_threads: usize,
    /// Sent with every request.
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_blocking_threads: DEFAULT_MAX_BLOCKING_THREADS,
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Set all three timeouts in milliseconds.
    ///
    /// If every value is `<= 0` the config is returned unchanged. Otherwise
    /// each value `<= 0` falls back to `DEFAULT_TIMEOUT_MS`.
    pub fn timeouts(mut self, read_ms: i64, write_ms: i64, connect_ms: i64) -> Self {
        if read_ms <= 0 && write_ms <= 0 && connect_ms <= 0 {
            return self;
        }
        let or_default = |ms: i64| if ms > 0 { ms as u64 } else { DEFAULT_TIMEOUT_MS };
        self.read_timeout_ms = or_default(read_ms);
        self.write_timeout_ms = or_default(write_ms);
        self.connect_timeout_ms = or_default(connect_ms);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults overlaid with `HTTPUTILS_READ_TIMEOUT_MS`,
    /// `HTTPUTILS_WRITE_TIMEOUT_MS`, `HTTPUTILS_CONNECT_TIMEOUT_MS` and
    /// `HTTPUTILS_MAX_BLOCKING_THREADS` when set.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(ms) = parse_var(&lookup, "HTTPUTILS_READ_TIMEOUT_MS")? {
            config.read_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "HTTPUTILS_WRITE_TIMEOUT_MS")? {
            config.write_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "HTTPUTILS_CONNECT_TIMEOUT_MS")? {
            config.connect_timeout_ms = ms;
        }
        if let Some(n) = parse_var(&lookup, "HTTPUTILS_MAX_BLOCKING_THREADS")? {
            if n == 0 {
                return Err(Error::Config(
                    "HTTPUTILS_MAX_BLOCKING_THREADS must be at least 1".to_string(),
                ));
            }
            config.max_blocking_threads = n;
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, Error>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw:?}: {e}"))),
    }
}
