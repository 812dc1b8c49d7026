//! Local names for downloaded portal files.
//!
//! Moodle serves files from `pluginfile.php/<context>/<component>/.../<name>`,
//! usually with a `Content-Disposition` header. The header wins; the decoded
//! last path segment is the fallback.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

/// Used when neither the header nor the URL yields a usable name.
const FALLBACK_STEM: &str = "download";

/// Highest numeric suffix tried before giving up on a unique name.
const MAX_SUFFIX: usize = 1000;

/// Extracts the file name from a `Content-Disposition` value.
///
/// `filename*=` (RFC 5987, percent-encoded) takes precedence over `filename=`,
/// which may be quoted or bare.
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = find_param(header, "filename*=") {
        let value = header[pos..].trim_start();
        if let Some(charset_end) = value.find("''") {
            let encoded = &value[charset_end + 2..];
            let encoded = encoded[..encoded.find(';').unwrap_or(encoded.len())].trim();
            let encoded = encoded.trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded)
                && !decoded.trim().is_empty()
            {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = find_param(header, "filename=")?;
    let value = header[pos..].trim_start();
    let name = match value.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"').unwrap_or(quoted.len())],
        None => value[..value.find(';').unwrap_or(value.len())].trim(),
    };
    (!name.trim().is_empty()).then(|| name.to_string())
}

/// Byte offset just past `param` (case-insensitive), if present.
fn find_param(header: &str, param: &str) -> Option<usize> {
    header
        .to_ascii_lowercase()
        .find(param)
        .map(|start| start + param.len())
}

/// Replaces characters that are unsafe in a file name on common filesystems.
///
/// Names that would still resolve to a directory (`.`, `..`) have their
/// dots replaced as well.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }
    let escapes = Path::new(&sanitized).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        sanitized.replace('.', "_")
    } else {
        sanitized
    }
}

/// File extension (with dot) for common course-material MIME types.
#[must_use]
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let extension = match mime.as_str() {
        "application/pdf" => ".pdf",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.ms-powerpoint" => ".ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => ".pptx",
        "application/zip" => ".zip",
        "text/plain" => ".txt",
        "text/html" => ".html",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "video/mp4" => ".mp4",
        "audio/mpeg" => ".mp3",
        _ => return None,
    };
    Some(extension)
}

/// Chooses the local file name for a downloaded file.
///
/// Order: `Content-Disposition`, then the percent-decoded last segment of
/// `final_url`, then `download`. A name without an extension gets one from
/// `content_type` when the type is known.
#[must_use]
pub fn file_name_for(
    final_url: &str,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> String {
    let name = content_disposition
        .and_then(parse_content_disposition)
        .or_else(|| last_segment(final_url))
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    let mut name = sanitize_filename(&name);

    if !name.contains('.')
        && let Some(extension) = content_type.and_then(extension_from_content_type)
    {
        name.push_str(extension);
    }
    name
}

fn last_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(
        |error| {
            debug!(segment = %last, %error, "segment is not valid UTF-8 once decoded");
            last.to_string()
        },
        std::borrow::Cow::into_owned,
    );
    Some(decoded)
}

/// Returns a path under `dir` for `name` that does not exist yet.
///
/// Collisions get a numeric suffix before the extension: `notes.pdf`,
/// `notes_1.pdf`, `notes_2.pdf`. The result never leaves `dir`.
#[must_use]
pub fn resolve_unique_path(dir: &Path, name: &str) -> PathBuf {
    let name = sanitize_filename(name);
    let name = if name.trim_matches('_').is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        name
    };

    let candidate = dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name.as_str(), ""),
    };
    (1..MAX_SUFFIX)
        .map(|suffix| dir.join(format!("{stem}_{suffix}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or_else(|| dir.join(format!("{stem}_{MAX_SUFFIX}{extension}")))
}
