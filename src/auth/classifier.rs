//! Login outcome classification.
//!
//! The portal has no authoritative "logged in" field. A submission counts as
//! accepted only when the response carries neither failure marker and the
//! portal redirected away from the login form.

use std::fmt;

use url::Url;

use crate::transport::ExchangeResponse;

/// Body substring shown when the username/password pair is wrong.
pub const INVALID_LOGIN_MARKER: &str = "Invalid login";
/// Class/id of the container Moodle renders around login errors.
pub const LOGIN_ERRORS_MARKER: &str = "loginerrors";

/// The three signals read from a login submission response.
///
/// Each flag is `true` when that signal indicates failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoginSignals {
    /// The body contains the invalid-credentials marker.
    pub invalid_credentials_marker: bool,
    /// The body contains the login-error container marker.
    pub login_error_marker: bool,
    /// The final URL is still the login endpoint.
    pub stayed_on_login_page: bool,
}

impl LoginSignals {
    /// True when no signal indicates failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !(self.invalid_credentials_marker || self.login_error_marker || self.stayed_on_login_page)
    }
}

impl fmt::Display for LoginSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut failed = Vec::new();
        if self.invalid_credentials_marker {
            failed.push("invalid-credentials marker present");
        }
        if self.login_error_marker {
            failed.push("login-error marker present");
        }
        if self.stayed_on_login_page {
            failed.push("no redirect away from login page");
        }
        if failed.is_empty() {
            f.write_str("no failure signals")
        } else {
            f.write_str(&failed.join(", "))
        }
    }
}

/// Decides whether a login submission was accepted.
///
/// Swap implementations to change the heuristic without touching the login
/// state machine. The state machine decides with
/// [`LoginClassifier::is_login_success`] and only calls
/// [`LoginClassifier::assess`] to describe a rejection.
pub trait LoginClassifier: Send + Sync {
    /// Reads the failure signals from the submission response.
    fn assess(&self, response: &ExchangeResponse, login_url: &str) -> LoginSignals;

    /// True when the submission was accepted. Defaults to "no failure signal".
    fn is_login_success(&self, response: &ExchangeResponse, login_url: &str) -> bool {
        self.assess(response, login_url).is_success()
    }
}

/// Default classifier: body markers plus the redirect check.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    invalid_credentials_marker: String,
    login_error_marker: String,
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(INVALID_LOGIN_MARKER, LOGIN_ERRORS_MARKER)
    }
}

impl MarkerClassifier {
    /// Creates a classifier with custom body markers (e.g. a localized portal).
    #[must_use]
    pub fn new(
        invalid_credentials_marker: impl Into<String>,
        login_error_marker: impl Into<String>,
    ) -> Self {
        Self {
            invalid_credentials_marker: invalid_credentials_marker.into(),
            login_error_marker: login_error_marker.into(),
        }
    }
}

impl LoginClassifier for MarkerClassifier {
    fn assess(&self, response: &ExchangeResponse, login_url: &str) -> LoginSignals {
        LoginSignals {
            invalid_credentials_marker: response.body.contains(&self.invalid_credentials_marker),
            login_error_marker: response.body.contains(&self.login_error_marker),
            stayed_on_login_page: same_page(&response.final_url, login_url),
        }
    }
}

/// Compares two URLs ignoring fragments; falls back to string equality when
/// either side does not parse.
fn same_page(left: &str, right: &str) -> bool {
    match (Url::parse(left), Url::parse(right)) {
        (Ok(mut left), Ok(mut right)) => {
            left.set_fragment(None);
            right.set_fragment(None);
            left == right
        }
        _ => left == right,
    }
}
