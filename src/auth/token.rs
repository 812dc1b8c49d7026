//! Login token extraction from the portal's login form.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::extract::markup::{compile_static_regex, html_unescape_basic, tag_attributes};

/// Name of the hidden form field carrying the one-time login token.
pub const LOGIN_TOKEN_FIELD: &str = "logintoken";

static INPUT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<input\b[^>]*>"));

/// The searched page carried no usable `logintoken` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no `logintoken` field found in page")]
pub struct TokenNotFound;

/// Returns the value of the first `<input name="logintoken">` in `html`.
///
/// Attribute order and quoting style do not matter. A field with an empty
/// value counts as missing.
///
/// # Errors
///
/// Returns [`TokenNotFound`] when the page is not the login form (already
/// authenticated redirect, maintenance page, changed markup).
pub fn extract_token(html: &str) -> Result<String, TokenNotFound> {
    INPUT_TAG_RE
        .find_iter(html)
        .find_map(|tag| {
            let attributes = tag_attributes(tag.as_str());
            let is_token_field = attributes
                .iter()
                .any(|(key, value)| key == "name" && value == LOGIN_TOKEN_FIELD);
            if !is_token_field {
                return None;
            }
            attributes
                .into_iter()
                .find(|(key, _)| key == "value")
                .map(|(_, value)| html_unescape_basic(&value))
                .filter(|value| !value.is_empty())
        })
        .ok_or(TokenNotFound)
}
