//! In-memory transport for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::transport::{ExchangeRequest, ExchangeResponse, Transport};

/// Replays canned responses in order and records every request it receives.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ExchangeResponse, TransportError>>>,
    requests: Mutex<Vec<ExchangeRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        script: impl IntoIterator<Item = Result<ExchangeResponse, TransportError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub(crate) fn requests(&self) -> Vec<ExchangeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network(&url, "script exhausted")))
    }
}

/// A 200 response whose final URL is `final_url`.
pub(crate) fn page(final_url: &str, body: &str) -> ExchangeResponse {
    ExchangeResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "text/html; charset=utf-8".to_string())],
        final_url: final_url.to_string(),
        body: body.to_string(),
    }
}

/// Like [`page`], with `Set-Cookie` headers.
pub(crate) fn page_with_cookies(final_url: &str, body: &str, cookies: &[&str]) -> ExchangeResponse {
    let mut response = page(final_url, body);
    response.headers.extend(
        cookies
            .iter()
            .map(|cookie| ("Set-Cookie".to_string(), (*cookie).to_string())),
    );
    response
}

/// An empty-bodied response with `status`.
pub(crate) fn status(final_url: &str, status: u16) -> ExchangeResponse {
    ExchangeResponse {
        status,
        headers: Vec::new(),
        final_url: final_url.to_string(),
        body: String::new(),
    }
}

/// A 200 file response with `content_type` and an optional `Content-Disposition`.
pub(crate) fn file(
    final_url: &str,
    content_type: &str,
    disposition: Option<&str>,
    body: &str,
) -> ExchangeResponse {
    let mut headers = vec![("content-type".to_string(), content_type.to_string())];
    if let Some(disposition) = disposition {
        headers.push(("content-disposition".to_string(), disposition.to_string()));
    }
    ExchangeResponse {
        status: 200,
        headers,
        final_url: final_url.to_string(),
        body: body.to_string(),
    }
}

pub(crate) const LOGIN_URL: &str = "https://lms.example.edu/login/index.php";
pub(crate) const BASE_URL: &str = "https://lms.example.edu";

/// A minimal Moodle login form carrying `token`.
pub(crate) fn login_form(token: &str) -> String {
    format!(
        r#"<form action="{LOGIN_URL}" method="post" id="login">
             <input type="hidden" name="anchor" value="">
             <input type="hidden" name="logintoken" value="{token}">
             <input type="text" name="username" id="username">
             <input type="password" name="password" id="password">
           </form>"#
    )
}
