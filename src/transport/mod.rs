//! The HTTP exchange contract used by login and course operations.
//!
//! Everything above this module sees the portal as a sequence of
//! request/response exchanges. Redirects are resolved inside the transport,
//! which reports the final URL plus every `Set-Cookie` seen along the chain.
//!
//! # Architecture
//!
//! - [`Transport`] - Injected collaborator performing one exchange
//! - [`ExchangeRequest`] / [`ExchangeResponse`] - Plain data crossing the seam
//! - [`ReqwestTransport`] - Production implementation on `reqwest`

mod http_client;

pub use http_client::{
    CONNECT_TIMEOUT_SECS, MAX_REDIRECTS, READ_TIMEOUT_SECS, ReqwestTransport, TransportTimeouts,
};

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportError;

/// HTTP methods used against the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Page fetch.
    Get,
    /// Form submission.
    Post,
}

impl HttpMethod {
    /// Upper-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute request URL.
    pub url: String,
    /// Headers in send order.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<String>,
}

impl ExchangeRequest {
    /// A bodiless GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A POST request carrying `body`.
    #[must_use]
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a `Cookie` header unless `cookie_header` is empty.
    #[must_use]
    pub fn with_cookies(self, cookie_header: &str) -> Self {
        if cookie_header.is_empty() {
            self
        } else {
            self.with_header("Cookie", cookie_header)
        }
    }

    /// Returns the first value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// Header values and bodies may carry cookies, tokens and passwords.
impl fmt::Debug for ExchangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ExchangeRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body_len", &self.body.as_ref().map(String::len))
            .finish()
    }
}

/// The outcome of one exchange, after redirects.
///
/// Page fetches carry a text body; [`Transport::download`] carries raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse<B = String> {
    /// Status of the final response in the redirect chain.
    pub status: u16,
    /// Headers in receive order. `Set-Cookie` entries cover every hop.
    pub headers: Vec<(String, String)>,
    /// URL of the final response.
    pub final_url: String,
    /// Body of the final response.
    pub body: B,
}

impl<B> ExchangeResponse<B> {
    /// All values of header `name` (case-insensitive), in order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All `Set-Cookie` values, in order.
    pub fn set_cookie_values(&self) -> impl Iterator<Item = &str> {
        self.header_values("set-cookie")
    }

    /// The final response's `Content-Type`, if any.
    ///
    /// `Content-Type` is never collected from intermediate hops, so the last
    /// value is the final response's.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_values("content-type").last()
    }

    /// True for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts the body, keeping status, headers and final URL.
    pub fn map_body<T>(self, f: impl FnOnce(B) -> T) -> ExchangeResponse<T> {
        ExchangeResponse {
            status: self.status,
            headers: self.headers,
            final_url: self.final_url,
            body: f(self.body),
        }
    }
}

/// Performs HTTP exchanges on behalf of the session engine.
///
/// Implementations follow redirects, report the final URL, and surface every
/// `Set-Cookie` header from the whole chain. Deadlines are the transport's job:
/// an exceeded one is reported as [`TransportError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the final response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network faults, timeouts, redirect loops
    /// or unparseable URLs. Non-2xx statuses are returned as responses.
    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeResponse, TransportError>;

    /// Like [`Transport::exchange`], but keeps the final body as raw bytes.
    ///
    /// The default goes through `exchange`, which is lossless only for text
    /// bodies. Transports that can serve binary files override it.
    ///
    /// # Errors
    ///
    /// As [`Transport::exchange`].
    async fn download(
        &self,
        request: ExchangeRequest,
    ) -> Result<ExchangeResponse<Vec<u8>>, TransportError> {
        let response = self.exchange(request).await?;
        Ok(response.map_body(String::into_bytes))
    }
}
