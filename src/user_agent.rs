//! Shared User-Agent string for portal traffic.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/moodle-fetch/moodle-fetch";

/// Default User-Agent for every portal exchange.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("moodle-fetch/{version} (course-index; +{PROJECT_UA_URL})")
}
