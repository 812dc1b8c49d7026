//! File links on resource view pages.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::markup::{compile_static_regex, html_unescape_basic};

static ANCHOR_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<a\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#)
});
static IFRAME_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<iframe\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#)
});
static OBJECT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<object\b[^>]*\bdata\s*=\s*["']([^"']+)["']"#)
});

/// Markers of a file-serving endpoint.
const FILE_ENDPOINTS: &[&str] = &["pluginfile.php", "webservice"];
/// Document extensions accepted on plain anchors.
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".xlsx", ".pptx"];

/// Returns the first file URL on a resource page, entities unescaped.
///
/// Anchors are searched first and match either a file endpoint or a common
/// document extension. Then `<iframe src>` and `<object data>` are searched,
/// matching file endpoints only. The URL is returned as written, possibly
/// relative.
#[must_use]
pub fn extract_file_link(html: &str) -> Option<String> {
    let anchor = first_match(&ANCHOR_HREF_RE, html, |href| {
        let lower = href.to_ascii_lowercase();
        is_file_endpoint(&lower) || DOCUMENT_EXTENSIONS.iter().any(|ext| lower.contains(ext))
    });
    let link = anchor
        .or_else(|| first_match(&IFRAME_SRC_RE, html, is_file_endpoint))
        .or_else(|| first_match(&OBJECT_DATA_RE, html, is_file_endpoint));
    debug!(found = link.is_some(), "scanned resource page for file link");
    link
}

fn is_file_endpoint(url: &str) -> bool {
    FILE_ENDPOINTS.iter().any(|marker| url.contains(marker))
}

fn first_match(pattern: &Regex, html: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
    pattern
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|m| html_unescape_basic(m.as_str()))
        .find(|url| accept(url.as_str()))
}
