//! Course page extraction: heading, sections and resources.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use super::collect_records;
use super::markup::{compile_static_regex, html_unescape_basic, visible_text};
use crate::model::{Course, CourseDetails, PLUGINFILE_MODULE, Resource, Section};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<h1\b[^>]*>(.*?)</h1>"));
static SECTION_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<(?:li|section|div)\b[^>]*\bid\s*=\s*["']section-(\d+)["'][^>]*>"#,
    )
});
static SECTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<h3\b[^>]*>(.*?)</h3>"));
static RESOURCE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<a\b[^>]*\bhref\s*=\s*["']([^"']*/(?:mod/([a-z0-9_]+)/view\.php\?id=(\d+)|pluginfile\.php/[^"']+))["'][^>]*>(.*?)</a>"#,
    )
});

/// Byte span of one section container inside the page.
struct SectionBounds {
    id: String,
    tag_start: usize,
    content_start: usize,
}

/// Returns the visible text of the first `<h1>`, if it has any.
#[must_use]
pub fn extract_heading(html: &str) -> Option<String> {
    HEADING_RE
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| visible_text(m.as_str()))
        .filter(|text| !text.is_empty())
}

/// Extracts the course name and its sections from a course page.
///
/// A section's content runs from its container (`id="section-N"`) to the next
/// section container or the end of the page. Missing headings fall back to
/// `Course <id>` and `Section <id>`. Returns `None` only when `course_id` is empty.
#[instrument(level = "debug", skip(html), fields(bytes = html.len()))]
pub fn extract_course_details(html: &str, course_id: &str) -> Option<CourseDetails> {
    let name = extract_heading(html).unwrap_or_else(|| format!("Course {course_id}"));
    let course = Course::new(course_id, name)?;

    let bounds = collect_records(&SECTION_OPEN_RE, html, "section", |captures| {
        let whole = captures.get(0)?;
        Some(SectionBounds {
            id: captures.get(1)?.as_str().to_string(),
            tag_start: whole.start(),
            content_start: whole.end(),
        })
    });

    let sections = bounds
        .iter()
        .enumerate()
        .filter_map(|(index, section)| {
            let end = bounds.get(index + 1).map_or(html.len(), |next| next.tag_start);
            extract_section(&section.id, &html[section.content_start..end])
        })
        .collect::<Vec<_>>();

    debug!(sections = sections.len(), "extracted course sections");
    Some(CourseDetails { course, sections })
}

fn extract_section(id: &str, scope: &str) -> Option<Section> {
    let name = SECTION_NAME_RE
        .captures(scope)
        .and_then(|captures| captures.get(1))
        .map(|m| visible_text(m.as_str()))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| format!("Section {id}"));
    Section::new(id, name, extract_resources(scope))
}

/// Returns every resource anchor in `scope`, in order.
///
/// Module links are `/mod/<module>/view.php?id=<n>`; direct file links point
/// into `pluginfile.php` and get the [`PLUGINFILE_MODULE`] module.
fn extract_resources(scope: &str) -> Vec<Resource> {
    collect_records(&RESOURCE_LINK_RE, scope, "resource", |captures| {
        let url = html_unescape_basic(captures.get(1)?.as_str());
        let text = captures
            .get(4)
            .map(|m| visible_text(m.as_str()))
            .filter(|text| !text.is_empty());
        match (captures.get(2), captures.get(3)) {
            (Some(module), Some(cmid)) => {
                let module = module.as_str();
                let name = text.unwrap_or_else(|| format!("{module} {}", cmid.as_str()));
                Resource::new(url, name, module)
            }
            _ => {
                let name = text
                    .or_else(|| Resource::from_url(&url).map(|r| r.name().to_string()))
                    .unwrap_or_else(|| PLUGINFILE_MODULE.to_string());
                Resource::new(url, name, PLUGINFILE_MODULE)
            }
        }
    })
}
