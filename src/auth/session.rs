//! The login handshake and the session it produces.
//!
//! An [`AuthSession`] runs `Anonymous -> TokenFetched -> Submitted ->
//! Authenticated | Rejected` exactly once. [`AuthSession::login`] consumes it,
//! so a retry always starts from a fresh instance with an empty cookie jar.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::classifier::LoginClassifier;
use super::cookies::CookieJar;
use super::endpoints::PortalEndpoints;
use super::token::{LOGIN_TOKEN_FIELD, extract_token};
use crate::error::{PortalError, TransportError};
use crate::transport::{ExchangeRequest, ExchangeResponse, Transport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Username and password for one login attempt. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Portal session state: base URL, cookie jar and authentication flag.
///
/// Not `Clone`: authenticated operations take `&mut Session`, so one session
/// is never used by two operations at once.
pub struct Session {
    endpoints: PortalEndpoints,
    jar: CookieJar,
    authenticated: bool,
}

impl Session {
    /// A session that has not logged in.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidBaseUrl`] for a malformed base URL.
    pub fn anonymous(base_url: &str) -> Result<Self, PortalError> {
        Ok(Self {
            endpoints: PortalEndpoints::parse(base_url)?,
            jar: CookieJar::new(),
            authenticated: false,
        })
    }

    /// Rebuilds a session from a cookie header exported by [`Session::cookie_header`].
    ///
    /// The result is not authenticated. Pass it to
    /// [`CourseService::resume`](crate::CourseService::resume), which checks the
    /// cookies against the portal before any course query is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidBaseUrl`] for a malformed base URL.
    pub fn from_cookie_header(base_url: &str, cookie_header: &str) -> Result<Self, PortalError> {
        Ok(Self {
            endpoints: PortalEndpoints::parse(base_url)?,
            jar: CookieJar::from_header(cookie_header),
            authenticated: false,
        })
    }

    pub(crate) fn authenticated(endpoints: PortalEndpoints, jar: CookieJar) -> Self {
        Self {
            endpoints,
            jar,
            authenticated: true,
        }
    }

    /// Flips the flag after the portal accepted the replayed cookies.
    pub(crate) fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// True after a successful login or a checked resume.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The portal base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.endpoints.base_url()
    }

    /// The jar serialized as a `Cookie` header value.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.jar.as_header()
    }

    /// Read access to the cookie jar.
    #[must_use]
    pub fn cookies(&self) -> &CookieJar {
        &self.jar
    }

    pub(crate) fn endpoints(&self) -> &PortalEndpoints {
        &self.endpoints
    }

    /// Merges every `Set-Cookie` from `response` into the jar.
    pub(crate) fn record_cookies<B>(&mut self, response: &ExchangeResponse<B>) -> usize {
        self.jar.record_all(response.set_cookie_values())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.endpoints.base_url())
            .field("jar", &self.jar)
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

/// Login handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No exchange issued yet.
    Anonymous,
    /// Login form fetched and token extracted.
    TokenFetched,
    /// Credentials posted.
    Submitted,
    /// The portal accepted the credentials.
    Authenticated,
    /// The portal declined the credentials.
    Rejected,
}

/// One login attempt against one portal.
pub struct AuthSession {
    transport: Arc<dyn Transport>,
    classifier: Arc<dyn LoginClassifier>,
    endpoints: PortalEndpoints,
    jar: CookieJar,
    state: AuthState,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("base_url", &self.endpoints.base_url())
            .field("jar", &self.jar)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Prepares a login attempt against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::InvalidBaseUrl`] for a malformed base URL.
    pub fn new(
        transport: Arc<dyn Transport>,
        classifier: Arc<dyn LoginClassifier>,
        base_url: &str,
    ) -> Result<Self, PortalError> {
        Ok(Self {
            transport,
            classifier,
            endpoints: PortalEndpoints::parse(base_url)?,
            jar: CookieJar::new(),
            state: AuthState::Anonymous,
        })
    }

    /// Current handshake state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Runs the handshake to a terminal state.
    ///
    /// # Errors
    ///
    /// - [`PortalError::LoginPageUnavailable`] when the form cannot be fetched
    /// - [`PortalError::TokenNotFound`] when the page has no `logintoken` field
    /// - [`PortalError::Transport`] when the submission exchange fails
    /// - [`PortalError::LoginRejected`] when classification fails
    #[instrument(skip(self, credentials), fields(base_url = %self.endpoints.base_url(), username = %credentials.username()))]
    pub async fn login(mut self, credentials: &Credentials) -> Result<Session, PortalError> {
        let login_url = self.endpoints.login_url();

        let token = self.fetch_token(&login_url).await?;
        self.transition(AuthState::TokenFetched);

        let response = self.submit(&login_url, credentials, &token).await?;
        self.transition(AuthState::Submitted);

        if self.classifier.is_login_success(&response, &login_url) {
            self.transition(AuthState::Authenticated);
            info!(cookies = self.jar.len(), "login succeeded");
            Ok(Session::authenticated(self.endpoints, self.jar))
        } else {
            self.transition(AuthState::Rejected);
            let signals = self.classifier.assess(&response, &login_url);
            warn!(%signals, "login rejected");
            Err(PortalError::LoginRejected { signals })
        }
    }

    async fn fetch_token(&mut self, login_url: &str) -> Result<String, PortalError> {
        let request = ExchangeRequest::get(login_url).with_cookies(&self.jar.as_header());
        let response = self
            .transport
            .exchange(request)
            .await
            .map_err(|source| PortalError::LoginPageUnavailable {
                url: login_url.to_string(),
                source,
            })?;
        let recorded = self.jar.record_all(response.set_cookie_values());
        debug!(status = response.status, recorded, "fetched login page");

        if !response.is_success() {
            return Err(PortalError::LoginPageUnavailable {
                url: login_url.to_string(),
                source: TransportError::http_status(&response.final_url, response.status),
            });
        }

        extract_token(&response.body).map_err(|_| PortalError::TokenNotFound {
            url: response.final_url.clone(),
        })
    }

    async fn submit(
        &mut self,
        login_url: &str,
        credentials: &Credentials,
        token: &str,
    ) -> Result<ExchangeResponse, PortalError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", &credentials.username)
            .append_pair("password", &credentials.password)
            .append_pair(LOGIN_TOKEN_FIELD, token)
            .append_pair("anchor", "")
            .finish();
        let request = ExchangeRequest::post(login_url, body)
            .with_header("Content-Type", FORM_CONTENT_TYPE)
            .with_cookies(&self.jar.as_header());

        let response = self.transport.exchange(request).await?;
        let recorded = self.jar.record_all(response.set_cookie_values());
        debug!(
            status = response.status,
            final_url = %response.final_url,
            recorded,
            "submitted credentials"
        );

        if !response.is_success() {
            return Err(TransportError::http_status(login_url, response.status).into());
        }
        Ok(response)
    }

    fn transition(&mut self, next: AuthState) {
        debug!(from = ?self.state, to = ?next, "auth state transition");
        self.state = next;
    }
}
