//! Shared markup helpers: static regex compilation, attribute scanning, entity
//! unescaping and visible-text cleanup.

use std::sync::LazyLock;

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
});
static SCREEN_READER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<span\b[^>]*class\s*=\s*["'][^"']*\b(?:accesshide|sr-only|visually-hidden)\b[^"']*["'][^>]*>.*?</span>"#,
    )
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?s)<[^>]*>"));

/// Returns the quoted attributes of a single start tag as `(lowercase name, value)`.
///
/// Unquoted attribute values are not recognized.
pub(crate) fn tag_attributes(tag: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(tag)
        .map(|attr| {
            let key = attr
                .get(1)
                .map_or("", |m| m.as_str())
                .to_ascii_lowercase();
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map_or("", |m| m.as_str())
                .trim()
                .to_string();
            (key, value)
        })
        .collect()
}

/// Unescapes the handful of entities Moodle themes emit in names and hrefs.
///
/// `&amp;` goes last so an escaped entity such as `&amp;lt;` stays literal.
pub(crate) fn html_unescape_basic(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&ndash;", "\u{2013}")
        .replace("&mdash;", "\u{2014}")
        .replace("&nbsp;", "\u{00a0}")
        .replace("&#8211;", "\u{2013}")
        .replace("&#8212;", "\u{2014}")
        .replace("&#160;", "\u{00a0}")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Converts an element's inner markup to its visible text.
///
/// Screen-reader-only spans (`accesshide`, `sr-only`, `visually-hidden`) are
/// dropped before the remaining tags are stripped. Entities are unescaped and
/// whitespace runs collapsed.
pub(crate) fn visible_text(inner_html: &str) -> String {
    let without_hidden = SCREEN_READER_RE.replace_all(inner_html, " ");
    let without_tags = TAG_RE.replace_all(&without_hidden, " ");
    html_unescape_basic(&without_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
