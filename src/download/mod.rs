//! Retrieval of the files behind course resources.
//!
//! A Moodle `resource` link points at a view page, not the file. With
//! `forcedownload=1` the portal usually redirects straight to
//! `pluginfile.php`; some themes instead render an embedding page whose
//! anchor, `<iframe>` or `<object>` carries the file URL.
//!
//! # Architecture
//!
//! - [`DownloadedFile`] - Bytes plus the name and type the portal reported
//! - [`filename`] - Local naming and collision-free output paths
//! - [`is_direct_file_url`] / [`with_force_download`] - URL classification and rewriting

pub mod filename;

pub use filename::{file_name_for, parse_content_disposition, resolve_unique_path, sanitize_filename};

use serde::Serialize;
use url::Url;

/// Path fragments that mark a URL as serving file content directly.
const DIRECT_FILE_MARKERS: &[&str] = &["pluginfile.php", "/webservice/"];

/// A file fetched from the portal.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    /// The URL that was resolved (resource view page or file URL).
    pub source_url: String,
    /// The URL that served the bytes, after redirects.
    pub final_url: String,
    /// Suggested local file name, already sanitized.
    pub file_name: String,
    /// `Content-Type` of the file response, if any.
    pub content_type: Option<String>,
    /// File content.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    /// Size of the content in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for an empty file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("source_url", &self.source_url)
            .field("final_url", &self.final_url)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// True when `url` serves file content rather than a view page.
#[must_use]
pub fn is_direct_file_url(url: &str) -> bool {
    DIRECT_FILE_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Returns `url` with `forcedownload=1` set, replacing any existing value.
///
/// Unparseable URLs are returned unchanged.
#[must_use]
pub fn with_force_download(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "forcedownload")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("forcedownload", "1");
    parsed.to_string()
}

/// True when the content type announces an HTML page.
pub(crate) fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| {
        value
            .split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
    })
}
