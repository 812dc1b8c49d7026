//! Session cookie accumulation and replay.
//!
//! Parses raw `Set-Cookie` header values into name/value pairs and serializes
//! the accumulated set into a single `Cookie` request header value.

use std::fmt;

use tracing::{debug, instrument, trace};

/// A single session cookie (attributes such as `Path` or `Expires` are dropped).
///
/// The value is redacted in Debug output to prevent accidental logging of
/// session identifiers.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl SessionCookie {
    /// Creates a new cookie entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Ordered cookie store for one portal session.
///
/// Names keep the position where they were first seen; a later value for the
/// same name overwrites the earlier one in place.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<SessionCookie>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a jar from a `Cookie` request header value (`a=1; b=2`).
    ///
    /// Pairs without a `=` or with an empty name are ignored.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = split_pair(pair) {
                jar.insert(name, value);
            }
        }
        jar
    }

    /// Merges a raw `Set-Cookie` header value into the jar.
    ///
    /// The value may hold several comma-separated cookie directives, as produced
    /// when multiple `Set-Cookie` headers are folded into one. Only the leading
    /// `name=value` pair of each directive is kept; attributes are dropped. A comma
    /// inside an `Expires` date does not start a new directive.
    ///
    /// Returns the number of cookies recorded.
    #[instrument(level = "trace", skip(self, set_cookie))]
    pub fn record(&mut self, set_cookie: &str) -> usize {
        let mut recorded = 0;
        for directive in set_cookie.split(',') {
            let pair = directive.split(';').next().unwrap_or_default();
            let Some((name, value)) = split_pair(pair) else {
                // Continuation of an attribute (e.g. the day part of an Expires date).
                trace!("skipping non-cookie segment in Set-Cookie value");
                continue;
            };
            debug!(name = %name, "recorded cookie");
            self.insert(name, value);
            recorded += 1;
        }
        recorded
    }

    /// Merges every `Set-Cookie` value from one exchange.
    ///
    /// An empty iterator is a no-op.
    pub fn record_all<'a>(&mut self, values: impl IntoIterator<Item = &'a str>) -> usize {
        values.into_iter().map(|value| self.record(value)).sum()
    }

    /// Serializes the jar for replay: `name1=value1; name2=value2`.
    #[must_use]
    pub fn as_header(&self) -> String {
        self.cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|cookie| cookie.name == name)
            .map(SessionCookie::value)
    }

    /// Returns the cookies in first-seen order.
    #[must_use]
    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Number of distinct cookie names held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true when no cookie has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    fn insert(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.cookies.iter_mut().find(|cookie| cookie.name == name) {
            existing.value = value.to_string();
        } else {
            self.cookies.push(SessionCookie::new(name, value));
        }
    }
}

// Lists names only; values stay out of logs.
impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.cookies.iter().map(|cookie| cookie.name.as_str()))
            .finish()
    }
}

/// Splits `name=value`, trimming both sides. Names must be non-empty tokens.
fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_last_write_wins_and_keeps_first_seen_order() {
        let mut jar = CookieJar::new();
        jar.record("a=1, b=2; Path=/");
        jar.record("a=3");
        assert_eq!(jar.as_header(), "a=3; b=2");
    }

    #[test]
    fn test_record_drops_attributes() {
        let mut jar = CookieJar::new();
        let count = jar.record("MoodleSession=abc; path=/; secure; HttpOnly; SameSite=None");
        assert_eq!(count, 1);
        assert_eq!(jar.as_header(), "MoodleSession=abc");
    }

    #[test]
    fn test_record_ignores_comma_inside_expires_date() {
        let mut jar = CookieJar::new();
        jar.record(
            "MOODLEID1_=xyz; expires=Wed, 21 Oct 2026 07:28:00 GMT; path=/, MoodleSession=s1; path=/",
        );
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("MOODLEID1_"), Some("xyz"));
        assert_eq!(jar.get("MoodleSession"), Some("s1"));
    }

    #[test]
    fn test_record_empty_value_is_noop() {
        let mut jar = CookieJar::new();
        assert_eq!(jar.record(""), 0);
        assert!(jar.is_empty());
        assert_eq!(jar.as_header(), "");
    }

    #[test]
    fn test_record_all_accumulates_across_headers() {
        let mut jar = CookieJar::new();
        let total = jar.record_all(["MoodleSession=s1; path=/", "MOODLEID1_=id; path=/"]);
        assert_eq!(total, 2);
        jar.record_all(["MoodleSession=s2; path=/"]);
        assert_eq!(jar.as_header(), "MoodleSession=s2; MOODLEID1_=id");
    }

    #[test]
    fn test_record_value_containing_equals_sign() {
        let mut jar = CookieJar::new();
        jar.record("token=abc==; path=/");
        assert_eq!(jar.get("token"), Some("abc=="));
    }

    #[test]
    fn test_record_rejects_empty_name() {
        let mut jar = CookieJar::new();
        assert_eq!(jar.record("=orphan"), 0);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_from_header_round_trips_as_header() {
        let jar = CookieJar::from_header("MoodleSession=s1; MOODLEID1_=id");
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.as_header(), "MoodleSession=s1; MOODLEID1_=id");
    }

    #[test]
    fn test_debug_redacts_values() {
        let mut jar = CookieJar::new();
        jar.record("MoodleSession=super_secret_session");
        let debug_str = format!("{jar:?}");
        assert!(debug_str.contains("MoodleSession"));
        assert!(!debug_str.contains("super_secret_session"));

        let cookie = SessionCookie::new("MoodleSession", "super_secret_session");
        let debug_str = format!("{cookie:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super_secret_session"));
    }
}
