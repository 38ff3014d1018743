//! HTTP capability used for description fetches and SOAP posts
//!
//! The client never talks to sockets directly. Everything goes through
//! [`HttpTransport`], so deadlines and proxies are a property of the
//! transport, and tests can swap in a canned one.

use crate::settings::TransportSettings;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised by an [`HttpTransport`]
#[derive(Debug, Error)]
pub enum TransportError {
    /// reqwest failed to connect, send or read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure reported by a non-reqwest transport
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Build a response from a status and body
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP client capability
///
/// Each call is one full request/response round trip. Non-2xx statuses are
/// returned as responses, not errors; interpreting them is up to the caller.
pub trait HttpTransport: Send + Sync {
    /// GET `url`
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;

    /// POST `body` to `url` with the given headers, in order
    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }

    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post(url, headers, body)
    }
}

/// [`HttpTransport`] backed by a blocking reqwest client
///
/// Idle connection pooling is disabled so every call opens a fresh
/// connection. Must not be used from inside an async context; wrap calls in
/// `spawn_blocking` there.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Transport with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::from_settings(&TransportSettings::default())
    }

    /// Transport configured from `settings`
    pub fn from_settings(settings: &TransportSettings) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(0)
            .user_agent(settings.user_agent.as_str())
            .timeout(millis(settings.timeout_ms))
            .connect_timeout(millis(settings.connect_timeout_ms))
            .build()?;

        Ok(Self { client })
    }
}

/// Zero disables the deadline
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        debug!("POST {} ({} bytes)", url, body.len());
        let mut request = self.client.post(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.body(body).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?;
        debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
