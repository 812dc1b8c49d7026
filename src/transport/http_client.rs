//! `reqwest`-backed [`Transport`] with explicit redirect handling.
//!
//! reqwest's built-in redirect policy drops the `Set-Cookie` headers of
//! intermediate responses, and a Moodle login answers with a 303 that carries
//! the fresh session cookie. This client follows redirects itself so every
//! hop's cookies reach the caller. Text pages and binary downloads share the
//! same redirect walk and differ only in how the final body is read.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, ClientBuilder, Method, Proxy, StatusCode, redirect};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ExchangeRequest, ExchangeResponse, HttpMethod, Transport};
use crate::auth::CookieJar;
use crate::error::TransportError;
use crate::user_agent;

/// Default connect timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default whole-request timeout.
pub const READ_TIMEOUT_SECS: u64 = 30;
/// Maximum redirect hops followed for one exchange.
pub const MAX_REDIRECTS: usize = 10;

/// Connect and read deadlines applied to every hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// TCP/TLS connect deadline in seconds.
    pub connect_timeout_secs: u64,
    /// Per-request deadline in seconds.
    pub read_timeout_secs: u64,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Production transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] when client construction fails.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(TransportTimeouts::default())
    }

    /// Builds a transport with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] when client construction fails.
    pub fn with_timeouts(timeouts: TransportTimeouts) -> Result<Self, TransportError> {
        let user_agent = user_agent::default_user_agent();
        match try_build_client(&user_agent, timeouts, false) {
            Ok(client) => Ok(Self { client }),
            Err(BuildClientFailure::Panic) => {
                // Restricted sandboxes can panic while reading system proxy
                // settings; retry with env proxies only.
                warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
                match try_build_client(&user_agent, timeouts, true) {
                    Ok(client) => Ok(Self { client }),
                    Err(BuildClientFailure::Panic) => Err(TransportError::ClientBuild {
                        reason: "client construction panicked".to_string(),
                    }),
                    Err(BuildClientFailure::Build(error)) => Err(TransportError::ClientBuild {
                        reason: error.to_string(),
                    }),
                }
            }
            Err(BuildClientFailure::Build(error)) => Err(TransportError::ClientBuild {
                reason: error.to_string(),
            }),
        }
    }

    async fn send_hop(
        &self,
        method: HttpMethod,
        url: &Url,
        headers: &[(String, String)],
        body: Option<&str>,
    ) -> Result<reqwest::Response, TransportError> {
        let method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self.client.request(method, url.clone());
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }
        builder
            .send()
            .await
            .map_err(|error| map_reqwest_error(url.as_str(), &error))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let (response, headers) = self.follow(request).await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|error| map_reqwest_error(&final_url, &error))?;
        Ok(ExchangeResponse {
            status,
            headers,
            final_url,
            body,
        })
    }

    async fn download(
        &self,
        request: ExchangeRequest,
    ) -> Result<ExchangeResponse<Vec<u8>>, TransportError> {
        let (response, headers) = self.follow(request).await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|error| map_reqwest_error(&final_url, &error))?;
        debug!(bytes = body.len(), "download complete");
        Ok(ExchangeResponse {
            status,
            headers,
            final_url,
            body: body.to_vec(),
        })
    }
}

impl ReqwestTransport {
    /// Walks the redirect chain and returns the final, unread response.
    ///
    /// The returned headers are every hop's `Set-Cookie` followed by all
    /// headers of the final response.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn follow(
        &self,
        request: ExchangeRequest,
    ) -> Result<(reqwest::Response, Vec<(String, String)>), TransportError> {
        let ExchangeRequest {
            mut method,
            url: original_url,
            mut headers,
            mut body,
        } = request;

        let mut current = parse_http_url(&original_url)?;
        let origin = current.origin();
        let mut replay = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("cookie"))
            .map(|(_, value)| CookieJar::from_header(value))
            .unwrap_or_default();
        let mut chain_cookies: Vec<(String, String)> = Vec::new();
        let mut hops = 0;

        loop {
            let response = self
                .send_hop(method, &current, &headers, body.as_deref())
                .await?;
            let status = response.status();
            let response_headers = header_pairs(response.headers());

            let location = status
                .is_redirection()
                .then(|| response.headers().get(LOCATION))
                .flatten()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

            let Some(location) = location else {
                debug!(status = status.as_u16(), hops, "exchange complete");
                chain_cookies.extend(response_headers);
                return Ok((response, chain_cookies));
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(TransportError::TooManyRedirects {
                    url: original_url,
                    count: MAX_REDIRECTS,
                });
            }

            for (name, value) in &response_headers {
                if name.eq_ignore_ascii_case("set-cookie") {
                    replay.record(value);
                    chain_cookies.push((name.clone(), value.clone()));
                }
            }

            let next = current
                .join(&location)
                .map_err(|_| TransportError::InvalidUrl {
                    url: location.clone(),
                })?;
            let next = parse_http_url(next.as_str())?;
            debug!(status = status.as_u16(), to = %next, "following redirect");

            if rewrites_to_get(status) {
                method = HttpMethod::Get;
                body = None;
                headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
            }
            // Cookies only travel back to the origin that was asked for.
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("cookie"));
            if next.origin() == origin && !replay.is_empty() {
                headers.push(("Cookie".to_string(), replay.as_header()));
            }
            current = next;
        }
    }
}

fn rewrites_to_get(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    )
}

fn parse_http_url(raw: &str) -> Result<Url, TransportError> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .ok_or_else(|| TransportError::InvalidUrl {
            url: raw.to_string(),
        })
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn map_reqwest_error(url: &str, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        TransportError::InvalidUrl {
            url: url.to_string(),
        }
    } else {
        TransportError::network(url, error.to_string())
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: &str,
    timeouts: TransportTimeouts,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, timeouts);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String, timeouts: TransportTimeouts) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent)
        .redirect(redirect::Policy::none())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
