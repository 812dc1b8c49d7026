//! Error types for portal sessions and record extraction.
//!
//! Errors follow the What/Why/Fix pattern used across the project: every
//! message names what failed, why, and carries a `Suggestion:` line.

use thiserror::Error;

use crate::auth::LoginSignals;

/// Faults raised by the transport layer (network, HTTP status, redirects).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The exchange did not complete before the configured deadline.
    #[error("timeout requesting {url}\n  Suggestion: Check connectivity or raise the read timeout")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection-level failure (DNS, refused connection, TLS, broken body stream).
    #[error("network error requesting {url}: {reason}\n  Suggestion: Check network and try again")]
    Network {
        /// The URL that failed.
        url: String,
        /// Underlying cause, rendered as text.
        reason: String,
    },

    /// The portal answered with a non-success status where a page body was expected.
    #[error("HTTP {status} from {url}\n  Suggestion: The portal may be down or the URL may be wrong")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The redirect chain exceeded the hop limit.
    #[error(
        "too many redirects ({count}) requesting {url}\n  Suggestion: Check for circular redirects on the portal"
    )]
    TooManyRedirects {
        /// The URL of the original request.
        url: String,
        /// Number of hops followed before giving up.
        count: usize,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}\n  Suggestion: Check proxy environment variables and TLS setup")]
    ClientBuild {
        /// Underlying cause, rendered as text.
        reason: String,
    },

    /// A request or redirect target URL could not be parsed.
    #[error("invalid URL: {url}\n  Suggestion: Check the portal base URL")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },
}

impl TransportError {
    /// Creates a `Network` error.
    #[must_use]
    pub fn network(url: &str, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `HttpStatus` error.
    #[must_use]
    pub fn http_status(url: &str, status: u16) -> Self {
        Self::HttpStatus {
            url: url.to_string(),
            status,
        }
    }

    /// Returns the HTTP status code when this is an `HttpStatus` error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcomes of login and authenticated portal operations.
///
/// Each variant is a distinct, inspectable outcome; nothing is swallowed
/// except per-record extraction skips.
#[derive(Debug, Clone, Error)]
pub enum PortalError {
    /// The configured base URL is not an absolute http(s) URL.
    #[error("invalid portal base URL '{url}'\n  Suggestion: Use an absolute URL such as https://elearning.example.edu")]
    InvalidBaseUrl {
        /// The rejected base URL.
        url: String,
    },

    /// The login form could not be fetched.
    #[error("login page unavailable at {url}: {source}")]
    LoginPageUnavailable {
        /// The login endpoint URL.
        url: String,
        /// The transport fault behind the failure.
        #[source]
        source: TransportError,
    },

    /// A transport fault during login submission or an authenticated request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The login page did not contain a `logintoken` hidden field.
    #[error(
        "login token not found in page from {url}\n  Suggestion: The portal markup may have changed, or the page returned was not the login form"
    )]
    TokenNotFound {
        /// URL of the page that was searched.
        url: String,
    },

    /// The portal declined the submitted credentials.
    #[error("login rejected: {signals}\n  Suggestion: Check username and password; repeated failures may lock the account")]
    LoginRejected {
        /// Which classification signals failed.
        signals: LoginSignals,
    },

    /// A course or category identifier was empty.
    #[error("invalid {kind} id '{id}'\n  Suggestion: Pass the numeric id shown in the portal URL")]
    InvalidIdentifier {
        /// What the identifier names (`course`, `category`).
        kind: &'static str,
        /// The rejected identifier.
        id: String,
    },

    /// An authenticated operation was attempted on a session that never logged in.
    #[error("session is not authenticated\n  Suggestion: Log in before requesting course data")]
    NotAuthenticated,

    /// A resource page led to neither a file nor a link to one.
    #[error("no downloadable file behind {url}\n  Suggestion: The resource may be a link or page rather than a file; open it in a browser")]
    FileNotFound {
        /// The resource URL that was resolved.
        url: String,
    },

    /// The portal redirected an authenticated request back to the login form.
    #[error("session expired: {url} redirected to the login page\n  Suggestion: Log in again to obtain a fresh session")]
    SessionExpired {
        /// The URL that was requested.
        url: String,
    },
}

impl PortalError {
    /// Returns the underlying transport fault, if this outcome was caused by one.
    #[must_use]
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(error) | Self::LoginPageUnavailable { source: error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns true when the outcome came from the transport layer.
    ///
    /// Only these outcomes are candidates for a caller-side retry.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        self.transport_error().is_some()
    }
}
